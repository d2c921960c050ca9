// Building signed value transfers out of spendable outputs

use crate::core::{Transaction, TxInput, TxOutput};
use crate::error::{Error, Result};
use crate::storage::ChainStore;
use crate::wallet::Wallet;

/// Builds and signs a transfer of `amount` from `from` to the holder of
/// `to_pub_key_hash`. Selected outputs are consumed wholly; any excess
/// comes back to the sender as a change output. Fails with
/// `InsufficientFunds` when the sender's unspent outputs cannot cover the
/// amount - no partial spend is ever constructed.
pub fn build_transfer(
    chain: &ChainStore,
    from: &Wallet,
    to_pub_key_hash: &[u8; 20],
    amount: u64,
) -> Result<Transaction> {
    let sender_hash = from.pub_key_hash();
    let (accumulated, selected) = chain.find_spendable_outputs(&sender_hash, amount)?;

    if accumulated < amount {
        return Err(Error::InsufficientFunds {
            available: accumulated,
            required: amount,
        });
    }

    let mut inputs = Vec::new();
    for (txid, indices) in selected {
        for index in indices {
            inputs.push(TxInput::new(txid, index as i64, from.public_key().to_vec()));
        }
    }

    let mut outputs = vec![TxOutput::new(amount, *to_pub_key_hash)];
    if accumulated > amount {
        outputs.push(TxOutput::new(accumulated - amount, sender_hash));
    }

    let mut tx = Transaction::new(inputs, outputs)?;
    chain.sign_transaction(&mut tx, from.signing_key())?;
    Ok(tx)
}

// Spendable-output discovery. No persistent index: every query walks the
// chain backward from the tip, so spending transactions are seen before
// the transactions whose outputs they spend.

use std::collections::HashMap;

use crate::core::{Hash256, TxOutput};
use crate::error::Result;
use crate::storage::ChainStore;

/// One unspent output located during a scan.
#[derive(Debug, Clone)]
pub struct UnspentOutput {
    pub txid: Hash256,
    pub index: usize,
    pub output: TxOutput,
}

impl ChainStore {
    /// All outputs locked to `pub_key_hash` that no later input spends,
    /// in scan encounter order. A transaction contributes at most one
    /// output per scan: scanning its outputs stops at the first qualifying
    /// match, so multiple outputs to the same address never produce
    /// duplicate inclusions.
    pub fn find_unspent_outputs(&self, pub_key_hash: &[u8; 20]) -> Result<Vec<UnspentOutput>> {
        let mut unspent = Vec::new();
        let mut spent: HashMap<Hash256, Vec<usize>> = HashMap::new();

        let mut iter = self.iter();
        while let Some(block) = iter.next_block()? {
            for tx in &block.transactions {
                for (idx, output) in tx.outputs.iter().enumerate() {
                    if spent.get(&tx.id).is_some_and(|outs| outs.contains(&idx)) {
                        continue;
                    }
                    if output.is_locked_with(pub_key_hash) {
                        unspent.push(UnspentOutput {
                            txid: tx.id,
                            index: idx,
                            output: output.clone(),
                        });
                        break;
                    }
                }

                if !tx.is_coinbase() {
                    for input in &tx.inputs {
                        if input.uses_key(pub_key_hash) {
                            if let Ok(idx) = usize::try_from(input.ref_out_index) {
                                spent.entry(input.ref_txid).or_default().push(idx);
                            }
                        }
                    }
                }
            }
        }

        Ok(unspent)
    }

    /// Accumulates unspent outputs in encounter order until their total
    /// reaches `amount`, stopping at the first sufficient prefix. Returns
    /// the accumulated total and the selected `{txid -> [out index]}` map;
    /// a total below `amount` means insufficient funds and is the caller's
    /// signal, never an error here.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8; 20],
        amount: u64,
    ) -> Result<(u64, HashMap<Hash256, Vec<usize>>)> {
        let mut accumulated = 0u64;
        let mut selected: HashMap<Hash256, Vec<usize>> = HashMap::new();

        for utxo in self.find_unspent_outputs(pub_key_hash)? {
            if accumulated >= amount {
                break;
            }
            accumulated += utxo.output.value;
            selected.entry(utxo.txid).or_default().push(utxo.index);
        }

        Ok((accumulated, selected))
    }

    /// Sum of all unspent outputs locked to `pub_key_hash`.
    pub fn balance_of(&self, pub_key_hash: &[u8; 20]) -> Result<u64> {
        let unspent = self.find_unspent_outputs(pub_key_hash)?;
        Ok(unspent.iter().map(|utxo| utxo.output.value).sum())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Transaction, SUBSIDY};
    use crate::storage::ChainStore;

    const OWNER: [u8; 20] = [0x11; 20];
    const OTHER: [u8; 20] = [0x22; 20];

    #[test]
    fn test_fresh_chain_balance_is_subsidy() {
        let chain = ChainStore::memory(&OWNER).unwrap();
        assert_eq!(chain.balance_of(&OWNER).unwrap(), SUBSIDY);
        assert_eq!(chain.balance_of(&OTHER).unwrap(), 0);
    }

    #[test]
    fn test_unspent_outputs_locate_coinbase() {
        let chain = ChainStore::memory(&OWNER).unwrap();
        let genesis = chain.get_block(&chain.tip()).unwrap();

        let unspent = chain.find_unspent_outputs(&OWNER).unwrap();
        assert_eq!(unspent.len(), 1);
        assert_eq!(unspent[0].txid, genesis.transactions[0].id);
        assert_eq!(unspent[0].index, 0);
        assert_eq!(unspent[0].output.value, SUBSIDY);
    }

    #[test]
    fn test_spendable_outputs_report_shortfall() {
        let chain = ChainStore::memory(&OWNER).unwrap();

        let (accumulated, selected) = chain
            .find_spendable_outputs(&OWNER, SUBSIDY * 10)
            .unwrap();
        assert!(accumulated < SUBSIDY * 10);
        assert_eq!(accumulated, SUBSIDY);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_spendable_outputs_stop_at_sufficient_prefix() {
        let mut chain = ChainStore::memory(&OWNER).unwrap();

        // Two more coinbase grants to OTHER, one per block.
        for memo in ["grant one", "grant two"] {
            let coinbase = Transaction::coinbase(&OTHER, memo).unwrap();
            chain.append(vec![coinbase]).unwrap();
        }

        // 60 needs only the first of OTHER's 100-unit outputs.
        let (accumulated, selected) = chain.find_spendable_outputs(&OTHER, 60).unwrap();
        assert_eq!(accumulated, SUBSIDY);
        assert_eq!(selected.values().map(Vec::len).sum::<usize>(), 1);

        // 150 needs both.
        let (accumulated, selected) = chain.find_spendable_outputs(&OTHER, 150).unwrap();
        assert_eq!(accumulated, SUBSIDY * 2);
        assert_eq!(selected.values().map(Vec::len).sum::<usize>(), 2);
    }
}

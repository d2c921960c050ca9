// UTXO transaction model: construction, id derivation, per-input
// ECDSA (P-256) signing and verification.

use std::collections::HashMap;
use std::fmt;

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::generic_array::GenericArray;
use p256::EncodedPoint;
use serde::{Deserialize, Serialize};

use crate::core::{hash160, sha256, Hash256};
use crate::error::{Error, Result};

/// Value minted by a coinbase transaction.
pub const SUBSIDY: u64 = 100;

/// Transaction input - spends one output of a previous transaction,
/// identified by `(ref_txid, ref_out_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction whose output is being spent.
    pub ref_txid: Hash256,
    /// Index of the spent output; -1 marks a coinbase input.
    pub ref_out_index: i64,
    /// 64-byte `r || s` signature, empty until signed.
    pub signature: Vec<u8>,
    /// 64-byte `X || Y` public key of the spender. Coinbase inputs carry
    /// arbitrary memo bytes here instead, unchecked.
    pub pub_key: Vec<u8>,
}

impl TxInput {
    pub fn new(ref_txid: Hash256, ref_out_index: i64, pub_key: Vec<u8>) -> Self {
        Self {
            ref_txid,
            ref_out_index,
            signature: Vec::new(),
            pub_key,
        }
    }

    /// Whether the carried public key hashes to `pub_key_hash`.
    pub fn uses_key(&self, pub_key_hash: &[u8; 20]) -> bool {
        hash160(&self.pub_key) == *pub_key_hash
    }
}

/// Transaction output - an indivisible amount locked to a public key hash.
/// Spending consumes it wholly; change comes back as a new output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub pub_key_hash: [u8; 20],
}

impl TxOutput {
    pub fn new(value: u64, pub_key_hash: [u8; 20]) -> Self {
        Self {
            value,
            pub_key_hash,
        }
    }

    pub fn is_locked_with(&self, pub_key_hash: &[u8; 20]) -> bool {
        self.pub_key_hash == *pub_key_hash
    }
}

/// Transaction: ordered inputs and outputs under a content-derived id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 over the serialized transaction with `id` zeroed.
    pub id: Hash256,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Assembles a transaction and freezes its id. Inputs and outputs must
    /// be final; the id never changes afterwards.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Result<Self> {
        let mut tx = Self {
            id: Hash256::zero(),
            inputs,
            outputs,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Coinbase (minting) transaction: one predecessor-less input carrying
    /// `memo` bytes, one `SUBSIDY` output locked to `to`.
    pub fn coinbase(to: &[u8; 20], memo: &str) -> Result<Self> {
        let input = TxInput {
            ref_txid: Hash256::zero(),
            ref_out_index: -1,
            signature: Vec::new(),
            pub_key: memo.as_bytes().to_vec(),
        };
        let output = TxOutput::new(SUBSIDY, *to);
        Self::new(vec![input], vec![output])
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].ref_txid.is_zero()
            && self.inputs[0].ref_out_index == -1
    }

    /// Digest of the transaction with its id zeroed.
    pub fn hash(&self) -> Result<Hash256> {
        let mut copy = self.clone();
        copy.id = Hash256::zero();
        let encoded = bincode::serialize(&copy)?;
        Ok(Hash256::new(sha256(&encoded)))
    }

    /// Structural clone with every input's signature and public key cleared:
    /// the canonical signing payload. Keeps a signature from covering itself.
    pub fn trimmed_copy(&self) -> Self {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput {
                ref_txid: input.ref_txid,
                ref_out_index: input.ref_out_index,
                signature: Vec::new(),
                pub_key: Vec::new(),
            })
            .collect();

        Self {
            id: self.id,
            inputs,
            outputs: self.outputs.clone(),
        }
    }

    /// The digest each input signs: the trimmed copy's id with that one
    /// input's `pub_key` temporarily set to the referenced output's lock.
    /// Binding the digest to the referenced output prevents cross-input
    /// signature substitution in multi-input transactions.
    fn signing_digest(
        trimmed: &mut Transaction,
        idx: usize,
        referenced: &TxOutput,
    ) -> Result<Hash256> {
        trimmed.inputs[idx].signature.clear();
        trimmed.inputs[idx].pub_key = referenced.pub_key_hash.to_vec();
        trimmed.id = trimmed.hash()?;
        trimmed.inputs[idx].pub_key.clear();
        Ok(trimmed.id)
    }

    fn referenced_output<'a>(
        prev_txs: &'a HashMap<Hash256, Transaction>,
        input: &TxInput,
    ) -> Result<&'a TxOutput> {
        let prev = prev_txs
            .get(&input.ref_txid)
            .ok_or_else(|| Error::Signature("previous transaction is not correct".into()))?;
        let out_idx = usize::try_from(input.ref_out_index)
            .map_err(|_| Error::Signature("referenced output index is negative".into()))?;
        prev.outputs
            .get(out_idx)
            .ok_or_else(|| Error::Signature("referenced output does not exist".into()))
    }

    /// Signs every input with `key`. `prev_txs` must resolve each input's
    /// referenced transaction; a missing one aborts the whole signing.
    /// No-op for coinbase transactions.
    pub fn sign(&mut self, key: &SigningKey, prev_txs: &HashMap<Hash256, Transaction>) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        for input in &self.inputs {
            if !prev_txs.contains_key(&input.ref_txid) {
                return Err(Error::Signature("previous transaction is not correct".into()));
            }
        }

        let mut trimmed = self.trimmed_copy();
        for idx in 0..self.inputs.len() {
            let referenced = Self::referenced_output(prev_txs, &self.inputs[idx])?;
            let digest = Self::signing_digest(&mut trimmed, idx, referenced)?;

            // Sign the raw digest; the two scalars come back zero-padded to
            // the curve-order width, so the signature is always 64 bytes.
            let signature: Signature = key.sign_prehash(digest.as_bytes())?;
            self.inputs[idx].signature = signature.to_bytes().to_vec();
        }

        Ok(())
    }

    /// Verifies every input's signature against its carried public key over
    /// the same per-input digest used at signing time. Coinbase transactions
    /// verify trivially. An unresolved referenced transaction is an error;
    /// an ill-formed key, signature, or failing ECDSA check yields `false`.
    pub fn verify(&self, prev_txs: &HashMap<Hash256, Transaction>) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }

        for input in &self.inputs {
            if !prev_txs.contains_key(&input.ref_txid) {
                return Err(Error::Signature("previous transaction does not exist".into()));
            }
        }

        let mut trimmed = self.trimmed_copy();
        for idx in 0..self.inputs.len() {
            let input = &self.inputs[idx];
            let referenced = Self::referenced_output(prev_txs, input)?;
            let digest = Self::signing_digest(&mut trimmed, idx, referenced)?;

            if input.pub_key.len() != 64 {
                return Ok(false);
            }
            let point = EncodedPoint::from_untagged_bytes(GenericArray::from_slice(&input.pub_key));
            let Ok(verifying_key) = VerifyingKey::from_encoded_point(&point) else {
                return Ok(false);
            };
            let Ok(signature) = Signature::from_slice(&input.signature) else {
                return Ok(false);
            };
            if verifying_key
                .verify_prehash(digest.as_bytes(), &signature)
                .is_err()
            {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "--- Transaction {}:", self.id)?;
        for (i, input) in self.inputs.iter().enumerate() {
            writeln!(f, "     Input {}:", i)?;
            writeln!(f, "       TXID:      {}", input.ref_txid)?;
            writeln!(f, "       Out:       {}", input.ref_out_index)?;
            writeln!(f, "       Signature: {}", hex::encode(&input.signature))?;
            writeln!(f, "       PubKey:    {}", hex::encode(&input.pub_key))?;
        }
        for (i, output) in self.outputs.iter().enumerate() {
            writeln!(f, "     Output {}:", i)?;
            writeln!(f, "       Value:  {}", output.value)?;
            writeln!(f, "       Script: {}", hex::encode(output.pub_key_hash))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn test_key() -> (SigningKey, Vec<u8>) {
        let key = SigningKey::random(&mut OsRng);
        let pub_key = key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()[1..]
            .to_vec();
        (key, pub_key)
    }

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::coinbase(&[7u8; 20], "genesis memo").unwrap();
        assert!(tx.is_coinbase());
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value, SUBSIDY);
        assert!(tx.inputs[0].signature.is_empty());
        assert!(tx.inputs[0].ref_txid.is_zero());
        assert_eq!(tx.inputs[0].ref_out_index, -1);
    }

    #[test]
    fn test_coinbase_verifies_without_resolution() {
        let tx = Transaction::coinbase(&[7u8; 20], "memo").unwrap();
        assert!(tx.verify(&HashMap::new()).unwrap());
    }

    #[test]
    fn test_id_ignores_existing_id() {
        let mut tx = Transaction::coinbase(&[1u8; 20], "memo").unwrap();
        let expected = tx.hash().unwrap();
        tx.id = Hash256::new([0xab; 32]);
        assert_eq!(tx.hash().unwrap(), expected);
    }

    #[test]
    fn test_trimmed_copy_clears_inputs() {
        let input = TxInput {
            ref_txid: Hash256::new([3u8; 32]),
            ref_out_index: 0,
            signature: vec![1, 2, 3],
            pub_key: vec![4, 5, 6],
        };
        let tx = Transaction {
            id: Hash256::new([9u8; 32]),
            inputs: vec![input],
            outputs: vec![TxOutput::new(5, [4u8; 20])],
        };

        let trimmed = tx.trimmed_copy();
        assert_eq!(trimmed.id, tx.id);
        assert!(trimmed.inputs[0].signature.is_empty());
        assert!(trimmed.inputs[0].pub_key.is_empty());
        assert_eq!(trimmed.outputs, tx.outputs);
    }

    #[test]
    fn test_sign_then_verify() {
        let (key, pub_key) = test_key();
        let owner_hash = hash160(&pub_key);

        let coinbase = Transaction::coinbase(&owner_hash, "reward").unwrap();
        let mut prev_txs = HashMap::new();
        prev_txs.insert(coinbase.id, coinbase.clone());

        let input = TxInput::new(coinbase.id, 0, pub_key);
        let outputs = vec![
            TxOutput::new(40, [2u8; 20]),
            TxOutput::new(60, owner_hash),
        ];
        let mut tx = Transaction::new(vec![input], outputs).unwrap();

        tx.sign(&key, &prev_txs).unwrap();
        assert_eq!(tx.inputs[0].signature.len(), 64);
        assert!(tx.verify(&prev_txs).unwrap());
    }

    #[test]
    fn test_verify_rejects_mutated_output() {
        let (key, pub_key) = test_key();
        let owner_hash = hash160(&pub_key);

        let coinbase = Transaction::coinbase(&owner_hash, "reward").unwrap();
        let mut prev_txs = HashMap::new();
        prev_txs.insert(coinbase.id, coinbase.clone());

        let input = TxInput::new(coinbase.id, 0, pub_key);
        let mut tx =
            Transaction::new(vec![input], vec![TxOutput::new(40, [2u8; 20])]).unwrap();
        tx.sign(&key, &prev_txs).unwrap();

        tx.outputs[0].value = 99;
        assert!(!tx.verify(&prev_txs).unwrap());
    }

    #[test]
    fn test_sign_fails_on_unresolved_previous() {
        let (key, pub_key) = test_key();
        let input = TxInput::new(Hash256::new([5u8; 32]), 0, pub_key);
        let mut tx =
            Transaction::new(vec![input], vec![TxOutput::new(1, [0u8; 20])]).unwrap();

        let result = tx.sign(&key, &HashMap::new());
        assert!(matches!(result, Err(Error::Signature(_))));
    }
}

// Block: an immutable, proof-of-work-sealed bundle of transactions

use serde::{Deserialize, Serialize};

use crate::consensus::{ProofOfWork, DIFFICULTY};
use crate::core::{sha256, Hash256, Transaction};
use crate::error::Result;

/// A mined block. Created once by mining, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Puzzle-input digest; satisfies `hash < 2^(256 - difficulty)`.
    pub hash: Hash256,
    pub transactions: Vec<Transaction>,
    /// Hash of the predecessor; all-zero only for genesis.
    pub prev_hash: Hash256,
    /// Nonce found by the proof-of-work search.
    pub nonce: u64,
    /// Required leading zero bits of `hash`.
    pub difficulty: u64,
}

impl Block {
    /// Mines a block linking to `prev_hash` under the fixed chain policy
    /// difficulty. Blocks until a valid nonce is found.
    pub fn mine(transactions: Vec<Transaction>, prev_hash: Hash256) -> Result<Self> {
        Self::mine_with(transactions, prev_hash, DIFFICULTY)
    }

    /// Mines with an explicit difficulty.
    pub fn mine_with(
        transactions: Vec<Transaction>,
        prev_hash: Hash256,
        difficulty: u64,
    ) -> Result<Self> {
        let mut block = Self {
            hash: Hash256::zero(),
            transactions,
            prev_hash,
            nonce: 0,
            difficulty,
        };

        let (nonce, hash) = ProofOfWork::new(&block).run()?;
        block.nonce = nonce;
        block.hash = hash;
        Ok(block)
    }

    /// The chain's first block: zero predecessor, exactly one coinbase.
    pub fn genesis(coinbase: Transaction) -> Result<Self> {
        Self::mine(vec![coinbase], Hash256::zero())
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_zero()
    }

    /// Order-sensitive digest of the transaction set: SHA-256 over the
    /// concatenated transaction ids. A simplified stand-in for a Merkle
    /// root; any transaction change invalidates the puzzle input.
    pub fn hash_transactions(&self) -> Hash256 {
        let mut data = Vec::with_capacity(self.transactions.len() * 32);
        for tx in &self.transactions {
            data.extend_from_slice(tx.id.as_bytes());
        }
        Hash256::new(sha256(&data))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

// Durable chain storage: one sled entry per block keyed by hash, plus a
// fixed tip key. Tip-key presence is the sole bootstrap discriminator.

use std::collections::HashMap;
use std::path::Path;

use p256::ecdsa::SigningKey;
use sled::transaction::{ConflictableTransactionResult, TransactionError, TransactionalTree};
use sled::Db;

use crate::core::{Block, Hash256, Transaction};
use crate::error::{Error, Result};

const TIP_KEY: &[u8] = b"tip";
const GENESIS_MEMO: &str = "First Transaction from Genesis";

fn block_key(hash: &Hash256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(b'b');
    key.extend_from_slice(hash.as_bytes());
    key
}

/// Stores the block under its hash key and moves the tip to it, in one
/// atomic durable transaction. No recovery state can observe a tip
/// pointing at an unwritten block.
fn write_block_and_tip(db: &Db, block: &Block) -> Result<()> {
    let encoded = block.encode()?;
    let key = block_key(&block.hash);

    db.transaction(
        |txn: &TransactionalTree| -> ConflictableTransactionResult<(), Error> {
            txn.insert(key.as_slice(), encoded.as_slice())?;
            txn.insert(TIP_KEY, block.hash.as_bytes().as_slice())?;
            Ok(())
        },
    )
    .map_err(|err| match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => Error::Store(e),
    })
}

/// The blockchain: a sled handle plus an in-memory mirror of the tip hash.
/// The handle is owned for the store's lifetime and released on drop.
pub struct ChainStore {
    db: Db,
    tip: Hash256,
}

impl ChainStore {
    /// Creates a brand-new chain at `path`: mines a genesis block wrapping
    /// a coinbase paying `reward_to`. Fails if a chain already exists here.
    pub fn initialize<P: AsRef<Path>>(path: P, reward_to: &[u8; 20]) -> Result<Self> {
        let db = sled::open(path)?;
        Self::bootstrap(db, reward_to)
    }

    /// In-memory chain for tests.
    pub fn memory(reward_to: &[u8; 20]) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::bootstrap(db, reward_to)
    }

    fn bootstrap(db: Db, reward_to: &[u8; 20]) -> Result<Self> {
        if db.contains_key(TIP_KEY)? {
            return Err(Error::AlreadyInitialized);
        }

        let coinbase = Transaction::coinbase(reward_to, GENESIS_MEMO)?;
        let genesis = Block::genesis(coinbase)?;
        write_block_and_tip(&db, &genesis)?;
        db.flush()?;

        log::info!("genesis created: {}", genesis.hash);
        Ok(Self {
            tip: genesis.hash,
            db,
        })
    }

    /// Opens an existing chain at `path` and loads its persisted tip.
    pub fn resume<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let tip = match db.get(TIP_KEY)? {
            Some(bytes) => Hash256::from_slice(&bytes)?,
            None => return Err(Error::NoExistingChain),
        };

        log::info!("resumed chain at tip {}", tip);
        Ok(Self { db, tip })
    }

    /// Hash of the most recently appended block.
    pub fn tip(&self) -> Hash256 {
        self.tip
    }

    /// Verifies the transactions, mines a block on top of the current tip
    /// and persists it. Block write and tip update land atomically; the
    /// in-memory tip mirror advances only after the durable write.
    pub fn append(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        for tx in &transactions {
            if !self.verify_transaction(tx)? {
                return Err(Error::InvalidTransaction);
            }
        }

        let tip_bytes = self.db.get(TIP_KEY)?.ok_or(Error::NoExistingChain)?;
        let tip = Hash256::from_slice(&tip_bytes)?;

        let block = Block::mine(transactions, tip)?;
        write_block_and_tip(&self.db, &block)?;
        self.db.flush()?;
        self.tip = block.hash;

        log::info!("appended block {} (nonce {})", block.hash, block.nonce);
        Ok(block)
    }

    /// Loads the block stored under `hash`. A missing key is fatal for the
    /// requesting operation; the store is assumed internally consistent.
    pub fn get_block(&self, hash: &Hash256) -> Result<Block> {
        let bytes = self
            .db
            .get(block_key(hash))?
            .ok_or_else(|| Error::BlockNotFound(hash.to_hex()))?;
        Block::decode(&bytes)
    }

    /// Cursor over the chain from the tip back to genesis. A fresh cursor
    /// starts from the stored tip, so iteration is restartable.
    pub fn iter(&self) -> ChainIterator {
        ChainIterator {
            db: self.db.clone(),
            current: Some(self.tip),
        }
    }

    /// Backward scan for the transaction with the given id.
    pub fn find_transaction(&self, id: &Hash256) -> Result<Transaction> {
        let mut iter = self.iter();
        while let Some(block) = iter.next_block()? {
            for tx in &block.transactions {
                if tx.id == *id {
                    return Ok(tx.clone());
                }
            }
        }
        Err(Error::TxNotFound(id.to_hex()))
    }

    /// Resolves every transaction referenced by `tx`'s inputs.
    fn previous_transactions(&self, tx: &Transaction) -> Result<HashMap<Hash256, Transaction>> {
        let mut prev_txs = HashMap::new();
        for input in &tx.inputs {
            let prev = self.find_transaction(&input.ref_txid)?;
            prev_txs.insert(prev.id, prev);
        }
        Ok(prev_txs)
    }

    /// Signs `tx` against the chain's record of its referenced outputs.
    pub fn sign_transaction(&self, tx: &mut Transaction, key: &SigningKey) -> Result<()> {
        if tx.is_coinbase() {
            return Ok(());
        }
        let prev_txs = self.previous_transactions(tx)?;
        tx.sign(key, &prev_txs)
    }

    /// Verifies `tx` against the chain's record of its referenced outputs.
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool> {
        if tx.is_coinbase() {
            return Ok(true);
        }
        let prev_txs = self.previous_transactions(tx)?;
        tx.verify(&prev_txs)
    }
}

/// Backward cursor: yields the block at the current hash, then advances to
/// its predecessor. Yields `None` once genesis has been returned.
pub struct ChainIterator {
    db: Db,
    current: Option<Hash256>,
}

impl ChainIterator {
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        let Some(hash) = self.current else {
            return Ok(None);
        };

        let bytes = self
            .db
            .get(block_key(&hash))?
            .ok_or_else(|| Error::BlockNotFound(hash.to_hex()))?;
        let block = Block::decode(&bytes)?;

        self.current = if block.is_genesis() {
            None
        } else {
            Some(block.prev_hash)
        };
        Ok(Some(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REWARD_TO: [u8; 20] = [0x11; 20];

    #[test]
    fn test_initialize_creates_genesis() {
        let chain = ChainStore::memory(&REWARD_TO).unwrap();

        let genesis = chain.get_block(&chain.tip()).unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.transactions.len(), 1);
        assert!(genesis.transactions[0].is_coinbase());
    }

    #[test]
    fn test_initialize_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        {
            ChainStore::initialize(dir.path(), &REWARD_TO).unwrap();
        }
        let second = ChainStore::initialize(dir.path(), &REWARD_TO);
        assert!(matches!(second, Err(Error::AlreadyInitialized)));
    }

    #[test]
    fn test_resume_without_chain_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ChainStore::resume(dir.path());
        assert!(matches!(result, Err(Error::NoExistingChain)));
    }

    #[test]
    fn test_resume_restores_tip() {
        let dir = tempfile::tempdir().unwrap();
        let tip = {
            let chain = ChainStore::initialize(dir.path(), &REWARD_TO).unwrap();
            chain.tip()
        };

        let chain = ChainStore::resume(dir.path()).unwrap();
        assert_eq!(chain.tip(), tip);
    }

    #[test]
    fn test_append_advances_tip_and_links() {
        let mut chain = ChainStore::memory(&REWARD_TO).unwrap();
        let genesis_hash = chain.tip();

        let coinbase = Transaction::coinbase(&[0x22; 20], "next reward").unwrap();
        let block = chain.append(vec![coinbase]).unwrap();

        assert_eq!(chain.tip(), block.hash);
        assert_eq!(block.prev_hash, genesis_hash);
    }

    #[test]
    fn test_iteration_newest_first() {
        let mut chain = ChainStore::memory(&REWARD_TO).unwrap();
        let genesis_hash = chain.tip();
        let coinbase = Transaction::coinbase(&[0x22; 20], "next reward").unwrap();
        let appended = chain.append(vec![coinbase]).unwrap();

        let mut iter = chain.iter();
        let first = iter.next_block().unwrap().unwrap();
        let second = iter.next_block().unwrap().unwrap();
        assert_eq!(first.hash, appended.hash);
        assert_eq!(second.hash, genesis_hash);
        assert!(second.is_genesis());
        assert!(iter.next_block().unwrap().is_none());
    }

    #[test]
    fn test_find_transaction() {
        let chain = ChainStore::memory(&REWARD_TO).unwrap();
        let genesis = chain.get_block(&chain.tip()).unwrap();
        let coinbase_id = genesis.transactions[0].id;

        let found = chain.find_transaction(&coinbase_id).unwrap();
        assert_eq!(found.id, coinbase_id);

        let missing = chain.find_transaction(&Hash256::new([0xee; 32]));
        assert!(matches!(missing, Err(Error::TxNotFound(_))));
    }
}

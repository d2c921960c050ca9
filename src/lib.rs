// tinychain: a persistent single-node proof-of-work UTXO ledger

pub mod cli;
pub mod consensus;
pub mod core;
pub mod error;
pub mod storage;
pub mod wallet;

// Re-exports for convenience
pub use crate::consensus::{ProofOfWork, DIFFICULTY};
pub use crate::core::{Block, Hash256, Transaction, TxInput, TxOutput, SUBSIDY};
pub use crate::error::{Error, Result};
pub use crate::storage::{ChainIterator, ChainStore, UnspentOutput};
pub use crate::wallet::{Wallet, Wallets};

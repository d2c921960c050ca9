// Crate-wide error taxonomy

use thiserror::Error;

/// Everything that can go wrong while operating the chain.
#[derive(Debug, Error)]
pub enum Error {
    /// `initialize` was called on a store that already holds a chain.
    #[error("blockchain already exists")]
    AlreadyInitialized,

    /// `resume` was called but no chain has ever been initialized here.
    #[error("no existing blockchain found, create one first")]
    NoExistingChain,

    /// A block hash the store is expected to hold is missing. The store is
    /// assumed internally consistent, so this signals corruption.
    #[error("block {0} not found")]
    BlockNotFound(String),

    /// A referenced transaction could not be located in the chain.
    #[error("transaction {0} not found")]
    TxNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: u64, required: u64 },

    /// A previous transaction required for signing or verification is
    /// unresolved or structurally wrong.
    #[error("signature error: {0}")]
    Signature(String),

    #[error("signing failed: {0}")]
    Crypto(#[from] p256::ecdsa::Error),

    /// The nonce space ran out before a hash below the target was found.
    #[error("proof-of-work nonce space exhausted at difficulty {0}")]
    PowExhausted(u64),

    /// A transaction submitted for appending failed signature verification.
    #[error("invalid transaction")]
    InvalidTransaction,

    #[error("invalid address")]
    InvalidAddress,

    #[error("address {0} not found in wallet file")]
    WalletNotFound(String),

    #[error("invalid hash length: expected 32, got {0}")]
    InvalidHash(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wallet file error: {0}")]
    WalletFile(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

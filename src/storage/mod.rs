// Durable chain storage and on-demand UTXO resolution

mod chain_store;
mod resolver;

pub use chain_store::{ChainIterator, ChainStore};
pub use resolver::UnspentOutput;

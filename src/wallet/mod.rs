// Key management and transfer construction

mod keys;
mod keystore;
mod tx_builder;

pub use keys::{pub_key_hash_of, validate_address, Wallet};
pub use keystore::Wallets;
pub use tx_builder::build_transfer;

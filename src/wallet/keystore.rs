// Wallet file: address -> secret key, persisted as JSON

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::wallet::Wallet;

#[derive(Serialize, Deserialize)]
struct StoredKey {
    secret: [u8; 32],
}

/// Collection of owned key pairs, keyed by address.
pub struct Wallets {
    path: PathBuf,
    keys: HashMap<String, StoredKey>,
}

impl Wallets {
    /// Loads the wallet file at `path`, or starts an empty collection if
    /// none exists yet.
    pub fn load_or_create<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let keys = if path.exists() {
            log::debug!("loading wallet file {}", path.display());
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, keys })
    }

    /// Generates a key pair, stores it, and returns its address.
    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new();
        let address = wallet.address();
        self.keys.insert(
            address.clone(),
            StoredKey {
                secret: wallet.secret_bytes(),
            },
        );
        self.save()?;
        Ok(address)
    }

    pub fn get_wallet(&self, address: &str) -> Result<Wallet> {
        let stored = self
            .keys
            .get(address)
            .ok_or_else(|| Error::WalletNotFound(address.to_string()))?;
        Wallet::from_secret_bytes(&stored.secret)
    }

    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.keys.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.keys)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

// Key pairs and Base58Check addresses

use p256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::core::{hash160, sha256};
use crate::error::{Error, Result};

/// Leading version byte of every address.
const VERSION: u8 = 0x00;
const CHECKSUM_LEN: usize = 4;
/// version (1) + public key hash (20) + checksum (4)
const ADDRESS_PAYLOAD_LEN: usize = 25;

/// A P-256 key pair. The public key travels as the 64-byte `X || Y`
/// concatenation of the curve point coordinates.
pub struct Wallet {
    signing_key: SigningKey,
    public_key: Vec<u8>,
}

impl Wallet {
    /// Generates a fresh random key pair.
    pub fn new() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let point = signing_key.verifying_key().to_encoded_point(false);
        // Drop the SEC1 0x04 tag, keeping the raw X || Y coordinates.
        let public_key = point.as_bytes()[1..].to_vec();
        Self {
            signing_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(bytes)?;
        Ok(Self::from_signing_key(signing_key))
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// HASH160 of the public key: the lock carried by outputs.
    pub fn pub_key_hash(&self) -> [u8; 20] {
        hash160(&self.public_key)
    }

    /// Base58Check address: `version || pub_key_hash || checksum`.
    pub fn address(&self) -> String {
        let mut payload = Vec::with_capacity(ADDRESS_PAYLOAD_LEN);
        payload.push(VERSION);
        payload.extend_from_slice(&self.pub_key_hash());
        let checksum = checksum(&payload);
        payload.extend_from_slice(&checksum);
        bs58::encode(payload).into_string()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// First four bytes of SHA256(SHA256(payload)).
fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha256(&sha256(payload));
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Checks structure and checksum of an address.
pub fn validate_address(address: &str) -> bool {
    let Ok(payload) = bs58::decode(address).into_vec() else {
        return false;
    };
    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return false;
    }

    let (body, actual) = payload.split_at(payload.len() - CHECKSUM_LEN);
    checksum(body) == actual
}

/// Extracts the 20-byte public key hash from a checksum-valid address.
pub fn pub_key_hash_of(address: &str) -> Result<[u8; 20]> {
    if !validate_address(address) {
        return Err(Error::InvalidAddress);
    }

    let payload = bs58::decode(address)
        .into_vec()
        .map_err(|_| Error::InvalidAddress)?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..payload.len() - CHECKSUM_LEN]);
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_shape() {
        let wallet = Wallet::new();
        assert_eq!(wallet.public_key().len(), 64);
        assert_eq!(wallet.pub_key_hash().len(), 20);
    }

    #[test]
    fn test_address_round_trip() {
        let wallet = Wallet::new();
        let address = wallet.address();

        assert!(validate_address(&address));
        assert_eq!(pub_key_hash_of(&address).unwrap(), wallet.pub_key_hash());
    }

    #[test]
    fn test_corrupted_address_fails_validation() {
        let wallet = Wallet::new();
        let mut address = wallet.address();

        // Flip the leading character to break the checksum.
        let replacement = if address.starts_with('2') { '3' } else { '2' };
        address.replace_range(0..1, &replacement.to_string());
        assert!(!validate_address(&address));
        assert!(matches!(
            pub_key_hash_of(&address),
            Err(Error::InvalidAddress)
        ));
    }

    #[test]
    fn test_garbage_address_rejected() {
        assert!(!validate_address("not-an-address-0OIl"));
        assert!(!validate_address(""));
    }

    #[test]
    fn test_secret_round_trip() {
        let wallet = Wallet::new();
        let restored = Wallet::from_secret_bytes(&wallet.secret_bytes()).unwrap();
        assert_eq!(restored.address(), wallet.address());
        assert_eq!(restored.public_key(), wallet.public_key());
    }
}

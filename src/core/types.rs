// Basic types shared across the chain

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 256-bit digest (32 bytes).
/// Used for block hashes and transaction ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != 32 {
            return Err(Error::InvalidHash(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The all-zero digest. Stands in for the "empty" hash: the genesis
    /// block's predecessor and the coinbase input's referenced id.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_creation() {
        let hash = Hash256::new([1u8; 32]);
        assert_eq!(hash.as_bytes(), &[1u8; 32]);
    }

    #[test]
    fn test_hash256_zero() {
        let zero = Hash256::zero();
        assert!(zero.is_zero());
        assert!(!Hash256::new([1u8; 32]).is_zero());
    }

    #[test]
    fn test_hash256_from_slice_rejects_bad_length() {
        assert!(Hash256::from_slice(&[0u8; 31]).is_err());
        assert!(Hash256::from_slice(&[0u8; 32]).is_ok());
    }
}

// Hashing utilities

use sha2::{Digest, Sha256};

/// Single SHA-256 hash.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// RIPEMD160(SHA256(data)) - used for public key hashes and addresses.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    use ripemd::{Digest as RipemdDigest, Ripemd160};
    let sha = Sha256::digest(data);
    let ripemd = Ripemd160::digest(sha);
    let mut result = [0u8; 20];
    result.copy_from_slice(&ripemd);
    result
}

// Proof-of-work consensus

pub mod pow;

pub use pow::{compute_target, ProofOfWork, DIFFICULTY, MAX_NONCE};

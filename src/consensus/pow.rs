// Proof-of-work engine: nonce search and cheap validation

use std::time::Instant;

use crate::core::{sha256, Block, Hash256};
use crate::error::{Error, Result};

/// Fixed chain policy: required leading zero bits of a block hash.
pub const DIFFICULTY: u64 = 12;

/// Search bound. Exhausting it without success is a defined failure,
/// not an infinite loop.
pub const MAX_NONCE: u64 = i64::MAX as u64;

/// Puzzle state for one block: the difficulty-derived target plus the
/// transaction digest, both cached across nonce attempts.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: [u8; 32],
    tx_digest: Hash256,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(block: &'a Block) -> Self {
        Self {
            block,
            target: compute_target(block.difficulty),
            tx_digest: block.hash_transactions(),
        }
    }

    /// Deterministic puzzle input:
    /// `prev_hash || tx_digest || be64(nonce) || be64(difficulty)`.
    fn puzzle_input(&self, nonce: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(32 + 32 + 8 + 8);
        data.extend_from_slice(self.block.prev_hash.as_bytes());
        data.extend_from_slice(self.tx_digest.as_bytes());
        data.extend_from_slice(&nonce.to_be_bytes());
        data.extend_from_slice(&self.block.difficulty.to_be_bytes());
        data
    }

    /// Treating both as big-endian 256-bit integers: `hash < target`.
    fn meets_target(&self, hash: &[u8; 32]) -> bool {
        for i in 0..32 {
            if hash[i] < self.target[i] {
                return true;
            } else if hash[i] > self.target[i] {
                return false;
            }
        }
        false
    }

    /// Searches nonces from 0 upward, one SHA-256 per step, until the hash
    /// falls below the target. Blocks the calling thread.
    pub fn run(&self) -> Result<(u64, Hash256)> {
        let start = Instant::now();

        for nonce in 0..=MAX_NONCE {
            let hash = sha256(&self.puzzle_input(nonce));
            if self.meets_target(&hash) {
                log::debug!(
                    "mined nonce {} at difficulty {} in {:?}",
                    nonce,
                    self.block.difficulty,
                    start.elapsed()
                );
                return Ok((nonce, Hash256::new(hash)));
            }

            if nonce > 0 && nonce % 1_000_000 == 0 {
                let elapsed = start.elapsed().as_secs_f64();
                log::debug!(
                    "mining attempts: {} ({:.1} KH/s)",
                    nonce,
                    nonce as f64 / elapsed / 1000.0
                );
            }
        }

        Err(Error::PowExhausted(self.block.difficulty))
    }

    /// Recomputes the puzzle from the block's stored nonce and difficulty
    /// and rechecks the target inequality. O(1) hash evaluations, the cheap
    /// side of the puzzle's asymmetry.
    pub fn validate(&self) -> bool {
        let hash = sha256(&self.puzzle_input(self.block.nonce));
        self.meets_target(&hash)
    }
}

/// 32-byte big-endian representation of `2^(256 - difficulty)`.
/// Valid for difficulties in `1..=255`.
pub fn compute_target(difficulty: u64) -> [u8; 32] {
    debug_assert!((1..=255).contains(&difficulty));

    let mut target = [0u8; 32];
    let bit = 256 - difficulty as usize;
    target[31 - bit / 8] = 1 << (bit % 8);
    target
}

// Core chain data structures

mod block;
mod hash;
mod transaction;
mod types;

pub use block::*;
pub use hash::*;
pub use transaction::*;
pub use types::*;

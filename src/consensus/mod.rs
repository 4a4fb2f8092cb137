//! Consensus module - block structure, genesis, difficulty, and chain validity

mod block;
mod difficulty;
mod genesis;
mod validation;

pub use block::*;
pub use difficulty::*;
pub use genesis::*;
pub use validation::*;

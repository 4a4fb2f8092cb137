//! Genesis block
//!
//! The fixed first block every node starts from. Candidate chains received
//! from peers must carry this exact block at index 0.

use crate::constants::{GENESIS_ADDRESS, GENESIS_TIMESTAMP};
use crate::crypto::{Address, Hash};
use crate::validation::Transaction;

use super::Block;

/// Build the genesis block. Deterministic: every call yields a structurally
/// identical block with the same hash.
pub fn genesis_block() -> Block {
    let address = Address::parse(GENESIS_ADDRESS).expect("genesis address constant is well-formed");
    let coinbase = Transaction::coinbase(address, 0);
    Block::new(0, Hash::zero(), GENESIS_TIMESTAMP, vec![coinbase], 0, 0)
}

/// The genesis block's hash.
pub fn genesis_hash() -> Hash {
    genesis_block().hash
}

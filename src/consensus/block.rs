//! Block structure
//!
//! A block commits to its position, its parent, its transaction batch, and
//! the proof-of-work parameters. The hash is SHA-256 over the canonical
//! string concatenation of all of those fields, so changing any single one
//! invalidates the block.

use serde::{Deserialize, Serialize};

use crate::crypto::{sha256_str, Hash};
use crate::validation::Transaction;

/// An immutable block. Once constructed its only lifecycle event is chain
/// membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub hash: Hash,
    pub previous_hash: Hash,
    pub timestamp: u64,
    pub data: Vec<Transaction>,
    pub difficulty: u32,
    pub nonce: u64,
}

impl Block {
    /// Assemble a block, computing its hash from the other fields.
    pub fn new(
        index: u64,
        previous_hash: Hash,
        timestamp: u64,
        data: Vec<Transaction>,
        difficulty: u32,
        nonce: u64,
    ) -> Self {
        let hash = compute_block_hash(index, &previous_hash, timestamp, &data, difficulty, nonce);
        Block {
            index,
            hash,
            previous_hash,
            timestamp,
            data,
            difficulty,
            nonce,
        }
    }

    /// Recompute the hash from the block's current contents.
    pub fn compute_hash(&self) -> Hash {
        compute_block_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.data,
            self.difficulty,
            self.nonce,
        )
    }

    /// Does the hash carry the required number of leading zero bits?
    pub fn meets_difficulty(&self) -> bool {
        self.hash.leading_zero_bits() >= self.difficulty
    }
}

/// Canonical block hash: SHA-256 over
/// `index ∥ previousHash ∥ timestamp ∥ serialized(data) ∥ difficulty ∥ nonce`.
/// The transaction batch is rendered as its canonical JSON, which is
/// deterministic for these types.
pub fn compute_block_hash(
    index: u64,
    previous_hash: &Hash,
    timestamp: u64,
    data: &[Transaction],
    difficulty: u32,
    nonce: u64,
) -> Hash {
    let data_json = serde_json::to_string(data).unwrap_or_default();
    let preimage = format!(
        "{}{}{}{}{}{}",
        index,
        previous_hash.to_hex(),
        timestamp,
        data_json,
        difficulty,
        nonce
    );
    sha256_str(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn sample_block() -> Block {
        let coinbase = Transaction::coinbase(KeyPair::generate().address(), 1);
        Block::new(1, sha256_str("parent"), 1718000100, vec![coinbase], 0, 0)
    }

    #[test]
    fn test_hash_matches_contents() {
        let block = sample_block();
        assert_eq!(block.hash, block.compute_hash());
    }

    #[test]
    fn test_any_field_change_breaks_hash() {
        let block = sample_block();

        let mut tampered = block.clone();
        tampered.nonce += 1;
        assert_ne!(tampered.compute_hash(), tampered.hash);

        let mut tampered = block.clone();
        tampered.index += 1;
        assert_ne!(tampered.compute_hash(), tampered.hash);

        let mut tampered = block.clone();
        tampered.difficulty += 1;
        assert_ne!(tampered.compute_hash(), tampered.hash);

        let mut tampered = block.clone();
        tampered.previous_hash = sha256_str("other parent");
        assert_ne!(tampered.compute_hash(), tampered.hash);

        let mut tampered = block;
        tampered.data[0].tx_outs[0].amount += 1;
        assert_ne!(tampered.compute_hash(), tampered.hash);
    }

    #[test]
    fn test_difficulty_zero_always_met() {
        assert!(sample_block().meets_difficulty());
    }

    #[test]
    fn test_wire_uses_camel_case() {
        let json = serde_json::to_value(sample_block()).unwrap();
        assert!(json.get("previousHash").is_some());
        assert!(json.get("previous_hash").is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let block = sample_block();
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }
}

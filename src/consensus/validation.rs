//! Block and chain validity
//!
//! Pure validation: blocks against their predecessor, whole chains against
//! genesis plus a full transaction replay. Peer-received data goes through
//! exactly these paths; there is no privileged fast path.

use thiserror::Error;

use crate::constants::TIMESTAMP_GRACE_SECS;
use crate::storage::UtxoSet;
use crate::validation::{apply_transactions, TxError};

use super::{cumulative_work, genesis_block, Block};

/// Chain-level validation errors
#[derive(Debug, Error)]
pub enum ChainError {
    /// Hash does not recompute from contents, or proof of work is unmet.
    #[error("invalid block structure")]
    InvalidBlockStructure,
    /// Index or previous-hash linkage to the predecessor is broken.
    #[error("block does not link to its predecessor")]
    ChainLinkageError,
    #[error("block timestamp outside the allowed window")]
    TimestampOutOfRange,
    #[error("chain does not start with the genesis block")]
    InvalidGenesis,
    #[error(transparent)]
    Transaction(#[from] TxError),
    /// Candidate chain does not carry strictly more cumulative work.
    #[error("candidate chain has insufficient cumulative work")]
    InsufficientWork,
}

/// Validate a single candidate block against its predecessor.
///
/// Field types and digest shapes are already guaranteed by parsing; what
/// is checked here is linkage, hash integrity, proof of work, and the
/// timestamp window: the candidate may lag its predecessor and lead the
/// validator's clock by at most `TIMESTAMP_GRACE_SECS`.
pub fn is_block_valid(candidate: &Block, predecessor: &Block, now: u64) -> Result<(), ChainError> {
    if candidate.index != predecessor.index + 1 {
        return Err(ChainError::ChainLinkageError);
    }
    if candidate.previous_hash != predecessor.hash {
        return Err(ChainError::ChainLinkageError);
    }
    if candidate.compute_hash() != candidate.hash {
        return Err(ChainError::InvalidBlockStructure);
    }
    if !candidate.meets_difficulty() {
        return Err(ChainError::InvalidBlockStructure);
    }
    // No arithmetic on the untrusted timestamp: a peer value near u64::MAX
    // must come out as a rejection, not an overflow.
    if candidate.timestamp <= predecessor.timestamp.saturating_sub(TIMESTAMP_GRACE_SECS) {
        return Err(ChainError::TimestampOutOfRange);
    }
    if candidate.timestamp >= now.saturating_add(TIMESTAMP_GRACE_SECS) {
        return Err(ChainError::TimestampOutOfRange);
    }
    Ok(())
}

/// Validate an entire candidate chain.
///
/// The first block must equal the hard-coded genesis exactly; every
/// adjacent pair must pass `is_block_valid`; and the transaction batches
/// must replay cleanly from an empty UTXO set. Returns the replayed set,
/// which a successful replacement adopts wholesale.
pub fn is_chain_valid(chain: &[Block], now: u64) -> Result<UtxoSet, ChainError> {
    if chain.first() != Some(&genesis_block()) {
        return Err(ChainError::InvalidGenesis);
    }

    for pair in chain.windows(2) {
        is_block_valid(&pair[1], &pair[0], now)?;
    }

    let mut utxo_set = UtxoSet::new();
    for block in chain {
        utxo_set = apply_transactions(&block.data, &utxo_set, block.index)?;
    }
    Ok(utxo_set)
}

/// Fork choice: does `candidate` carry strictly more work than `current`?
pub fn has_more_work(candidate: &[Block], current: &[Block]) -> bool {
    cumulative_work(candidate) > cumulative_work(current)
}

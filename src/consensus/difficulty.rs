//! Difficulty retargeting and cumulative work
//!
//! Difficulty is the number of leading zero bits a block hash must carry.
//! It is recalculated every `DIFFICULTY_ADJUSTMENT_INTERVAL` blocks from
//! the real time the last interval took, and the chain-selection metric is
//! cumulative work (Σ 2^difficulty), not length.

use crate::constants::{BLOCK_INTERVAL_SECS, DIFFICULTY_ADJUSTMENT_INTERVAL};

use super::Block;

/// Difficulty the next block must be mined at, given the current chain.
///
/// At a retarget boundary, compare the elapsed time over the last interval
/// against the expected `BLOCK_INTERVAL_SECS * DIFFICULTY_ADJUSTMENT_INTERVAL`:
/// twice as fast raises difficulty by one, twice as slow lowers it by one,
/// floored at zero. Everywhere else the tip's difficulty carries forward.
pub fn compute_difficulty(chain: &[Block]) -> u32 {
    let latest = match chain.last() {
        Some(block) => block,
        None => return 0,
    };
    if latest.index == 0 || latest.index % DIFFICULTY_ADJUSTMENT_INTERVAL != 0 {
        return latest.difficulty;
    }

    let interval = DIFFICULTY_ADJUSTMENT_INTERVAL as usize;
    let period_start = &chain[chain.len() - interval];
    let expected = BLOCK_INTERVAL_SECS * DIFFICULTY_ADJUSTMENT_INTERVAL;
    let taken = latest.timestamp.saturating_sub(period_start.timestamp);

    if taken < expected / 2 {
        latest.difficulty + 1
    } else if taken > expected * 2 {
        // Floored at zero: difficulty zero trivially accepts any hash, but
        // it never goes negative.
        latest.difficulty.saturating_sub(1)
    } else {
        latest.difficulty
    }
}

/// Chain-selection metric: the summed expected work of every block.
pub fn cumulative_work(chain: &[Block]) -> u128 {
    chain
        .iter()
        .map(|block| {
            if block.difficulty >= 127 {
                u128::MAX
            } else {
                1u128 << block.difficulty
            }
        })
        .fold(0u128, u128::saturating_add)
}

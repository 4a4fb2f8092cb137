//! Block miner
//!
//! Assembles candidate blocks from the mempool and searches for a nonce
//! whose hash meets the difficulty. The search is CPU-bound and unbounded,
//! so it runs on a dedicated blocking task and checks a stop signal so a
//! competing accepted block can cancel it. A stale winner is harmless
//! either way: `extend` re-validates under the ledger lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::consensus::{compute_block_hash, Block};
use crate::crypto::{Address, Hash};
use crate::storage::LedgerState;
use crate::validation::Transaction;

/// Nonces tried between stop-signal checks.
const STOP_CHECK_BATCH: u64 = 1024;

/// Outcome of a proof-of-work search.
#[derive(Debug)]
pub enum MiningResult {
    /// A valid nonce was found.
    Success(Block),
    /// The search was cancelled before finding one.
    Cancelled,
}

/// Candidate block parameters, captured under the ledger lock so the
/// search itself runs lock-free.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub index: u64,
    pub previous_hash: Hash,
    pub timestamp: u64,
    pub data: Vec<Transaction>,
    pub difficulty: u32,
}

/// Block miner with a shared cancellation flag.
#[derive(Clone)]
pub struct Miner {
    address: Address,
    stop_signal: Arc<AtomicBool>,
}

impl Miner {
    pub fn new(address: Address) -> Self {
        Miner {
            address,
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Cancel an in-progress search.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Clear the cancellation flag before a new search.
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Capture a candidate: coinbase to this miner plus the mempool
    /// snapshot, at the ledger's next index and difficulty.
    pub fn assemble_candidate(&self, ledger: &LedgerState, timestamp: u64) -> BlockTemplate {
        let tip = ledger.latest_block();
        let index = tip.index + 1;
        let mut data = vec![Transaction::coinbase(self.address.clone(), index)];
        data.extend(ledger.mempool_snapshot());
        BlockTemplate {
            index,
            previous_hash: tip.hash,
            timestamp,
            data,
            difficulty: ledger.next_difficulty(),
        }
    }

    /// Exhaustive nonce search from 0 upward. Checks the stop flag every
    /// `STOP_CHECK_BATCH` nonces in addition to the difficulty condition.
    pub fn find_nonce(&self, template: BlockTemplate) -> MiningResult {
        let BlockTemplate {
            index,
            previous_hash,
            timestamp,
            data,
            difficulty,
        } = template;

        let mut nonce: u64 = 0;
        loop {
            let hash = compute_block_hash(index, &previous_hash, timestamp, &data, difficulty, nonce);
            if hash.leading_zero_bits() >= difficulty {
                return MiningResult::Success(Block {
                    index,
                    hash,
                    previous_hash,
                    timestamp,
                    data,
                    difficulty,
                    nonce,
                });
            }
            nonce = nonce.wrapping_add(1);
            if nonce % STOP_CHECK_BATCH == 0 && self.stop_signal.load(Ordering::SeqCst) {
                return MiningResult::Cancelled;
            }
        }
    }
}

//! Ledger state
//!
//! The chain, UTXO set, and mempool as one owned value. The node wraps one
//! `LedgerState` in a single mutex for its whole lifetime; every mutation
//! (extend, replace, mempool admission) happens under that lock, so block
//! acceptance is atomic with respect to UTXO-set and mempool updates.
//!
//! Acceptance never broadcasts: operations return their outcome and the
//! caller decides what to tell the network.

use log::info;

use crate::consensus::{
    compute_difficulty, cumulative_work, genesis_block, has_more_work, is_block_valid,
    is_chain_valid, Block, ChainError,
};
use crate::crypto::Address;
use crate::validation::{apply_transactions, Transaction};

use super::{Mempool, PoolError, UtxoSet};

/// The node's single source of truth for ledger state.
#[derive(Debug)]
pub struct LedgerState {
    chain: Vec<Block>,
    utxo_set: UtxoSet,
    mempool: Mempool,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerState {
    /// A fresh ledger holding only the genesis block, its UTXO set derived
    /// by replaying genesis.
    pub fn new() -> Self {
        let genesis = genesis_block();
        let utxo_set = apply_transactions(&genesis.data, &UtxoSet::new(), 0)
            .expect("genesis replays cleanly");
        LedgerState {
            chain: vec![genesis],
            utxo_set,
            mempool: Mempool::new(),
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn latest_block(&self) -> &Block {
        self.chain.last().expect("chain always holds genesis")
    }

    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.utxo_set.balance(address)
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn mempool_snapshot(&self) -> Vec<Transaction> {
        self.mempool.snapshot()
    }

    /// Difficulty the next block must meet.
    pub fn next_difficulty(&self) -> u32 {
        compute_difficulty(&self.chain)
    }

    pub fn cumulative_work(&self) -> u128 {
        cumulative_work(&self.chain)
    }

    /// Accept a single new block on top of the current tip.
    ///
    /// Validate-then-commit: the block is checked against the tip and its
    /// transactions applied to a copy of the UTXO set before anything is
    /// stored. On success the mempool is reconciled against the new set.
    pub fn extend(&mut self, block: Block, now: u64) -> Result<(), ChainError> {
        is_block_valid(&block, self.latest_block(), now)?;
        let next_utxo = apply_transactions(&block.data, &self.utxo_set, block.index)?;

        info!(
            "chain extended to height {} ({} tx)",
            block.index,
            block.data.len()
        );
        self.chain.push(block);
        self.utxo_set = next_utxo;
        self.mempool.reconcile(&self.utxo_set);
        Ok(())
    }

    /// Replace the whole chain with a peer's candidate.
    ///
    /// The candidate must be fully valid from genesis and carry strictly
    /// more cumulative work; the UTXO set produced by its replay is adopted
    /// wholesale and the mempool reconciled against it.
    pub fn replace(&mut self, candidate: Vec<Block>, now: u64) -> Result<(), ChainError> {
        let replayed = is_chain_valid(&candidate, now)?;
        if !has_more_work(&candidate, &self.chain) {
            return Err(ChainError::InsufficientWork);
        }

        info!(
            "chain replaced: height {} -> {}",
            self.latest_block().index,
            candidate.len().saturating_sub(1)
        );
        self.chain = candidate;
        self.utxo_set = replayed;
        self.mempool.reconcile(&self.utxo_set);
        Ok(())
    }

    /// Offer a transaction to the mempool, validated against the current
    /// confirmed UTXO set.
    pub fn admit_transaction(&mut self, tx: Transaction) -> Result<(), PoolError> {
        self.mempool.admit(tx, &self.utxo_set)
    }
}

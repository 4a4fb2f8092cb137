//! Mempool
//!
//! Valid, unconfirmed transactions awaiting inclusion in a block. Admission
//! enforces double-spend exclusion against the pool itself on top of full
//! transaction validation, so no two pooled entries ever contend for the
//! same outpoint.

use std::collections::HashSet;

use thiserror::Error;

use crate::validation::{validate_transaction, OutPoint, Transaction, TxError};

use super::UtxoSet;

/// Mempool admission errors
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("transaction invalid: {0}")]
    Invalid(#[from] TxError),
    #[error("transaction conflicts with a pooled transaction")]
    ConflictsWithPool,
}

/// Ordered pool of pending transactions. Insertion order is kept and used
/// as the inclusion order when a block is assembled, but peers are promised
/// nothing stronger.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a transaction: it must validate against the confirmed UTXO
    /// set and must not reference any outpoint a pooled transaction
    /// already spends.
    pub fn admit(&mut self, tx: Transaction, utxo_set: &UtxoSet) -> Result<(), PoolError> {
        validate_transaction(&tx, utxo_set)?;
        let pooled = self.spent_out_points();
        if tx.out_points().any(|op| pooled.contains(&op)) {
            return Err(PoolError::ConflictsWithPool);
        }
        self.pending.push(tx);
        Ok(())
    }

    /// Drop every pooled transaction whose inputs are no longer all
    /// unspent. Called after each chain extension or replacement; this is
    /// how confirmed transactions leave the pool and how transactions
    /// conflicting with the new chain are evicted.
    pub fn reconcile(&mut self, utxo_set: &UtxoSet) {
        self.pending
            .retain(|tx| tx.out_points().all(|op| utxo_set.contains(&op)));
    }

    /// Every outpoint referenced by a pooled transaction.
    pub fn spent_out_points(&self) -> HashSet<OutPoint> {
        self.pending
            .iter()
            .flat_map(|tx| tx.out_points())
            .collect()
    }

    /// Owned copy of the pool contents, for blocks and peer replies.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

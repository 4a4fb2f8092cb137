//! Sync reducer
//!
//! Reconciles the local ledger against data received from a peer. Pure
//! with respect to the transport: each handler returns what the caller
//! should do next instead of reaching into the network itself. Peer data
//! is never trusted - it flows through the same validation as locally
//! produced blocks and transactions.

use log::{debug, warn};

use crate::consensus::Block;
use crate::storage::LedgerState;
use crate::validation::Transaction;

/// What the transport should do after a payload was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The local chain advanced: announce the new tip to all peers.
    BroadcastLatest,
    /// A longer fork was announced with too little context: ask peers for
    /// their full chains.
    QueryAll,
    /// Nothing changed.
    NoOp,
}

/// Reconcile against a peer's block payload: a single latest block or a
/// whole chain.
pub fn handle_blockchain_response(
    ledger: &mut LedgerState,
    received: Vec<Block>,
    now: u64,
) -> SyncOutcome {
    let newest_received = match received.last() {
        Some(block) => block.clone(),
        None => {
            debug!("peer sent an empty block payload");
            return SyncOutcome::NoOp;
        }
    };

    if newest_received.index <= ledger.latest_block().index {
        // Nothing ahead of us; nothing to do.
        return SyncOutcome::NoOp;
    }

    if newest_received.previous_hash == ledger.latest_block().hash {
        // Exactly one block ahead and directly linkable.
        match ledger.extend(newest_received, now) {
            Ok(()) => SyncOutcome::BroadcastLatest,
            Err(err) => {
                warn!("peer block rejected: {err}");
                SyncOutcome::NoOp
            }
        }
    } else if received.len() == 1 {
        // A longer fork, but one block is not enough context to verify it.
        SyncOutcome::QueryAll
    } else {
        match ledger.replace(received, now) {
            Ok(()) => SyncOutcome::BroadcastLatest,
            Err(err) => {
                warn!("peer chain rejected: {err}");
                SyncOutcome::NoOp
            }
        }
    }
}

/// Offer each transaction of a peer's mempool to the local pool. One
/// rejection never blocks the rest.
pub fn handle_mempool_response(ledger: &mut LedgerState, txs: Vec<Transaction>) {
    for tx in txs {
        let id = tx.id;
        if let Err(err) = ledger.admit_transaction(tx) {
            debug!("peer transaction {id} not admitted: {err}");
        }
    }
}

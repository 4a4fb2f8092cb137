//! Peer protocol messages
//!
//! JSON envelopes with a `type` tag and a `data` payload, one per line on
//! the wire. Parsing is typed and fails closed: anything that does not
//! decode into a known message is dropped at the boundary, before any
//! domain validation runs.

use serde::{Deserialize, Serialize};

use crate::consensus::Block;
use crate::validation::Transaction;

/// Peer messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Ask a peer for its newest block.
    GetLatest,
    /// Ask a peer for its full chain.
    GetAll,
    /// One block (reply to GetLatest) or a full chain (reply to GetAll).
    BlockchainResponse(Vec<Block>),
    /// Ask a peer for its pending transactions.
    RequestMempool,
    /// A peer's pending transactions, each offered independently to the
    /// local mempool.
    MempoolResponse(Vec<Transaction>),
}

impl Message {
    /// Render as a single JSON line for the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a received line. `None` means the message is dropped.
    pub fn parse(line: &str) -> Option<Message> {
        serde_json::from_str(line).ok()
    }
}

//! UTXO set
//!
//! The ledger's authoritative balance state: one entry per still-spendable
//! output. Entries are never mutated in place; applying a block removes the
//! spent outpoints and inserts the newly created ones, and that transition
//! happens only through `validation::apply_transactions`.

use std::collections::HashMap;

use crate::crypto::Address;
use crate::validation::{OutPoint, TxOut};

/// Map of unspent outputs keyed by (txOutId, txOutIndex).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    entries: HashMap<OutPoint, TxOut>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, out_point: &OutPoint) -> bool {
        self.entries.contains_key(out_point)
    }

    pub fn get(&self, out_point: &OutPoint) -> Option<&TxOut> {
        self.entries.get(out_point)
    }

    pub fn insert(&mut self, out_point: OutPoint, tx_out: TxOut) {
        self.entries.insert(out_point, tx_out);
    }

    pub fn remove(&mut self, out_point: &OutPoint) -> Option<TxOut> {
        self.entries.remove(out_point)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOut)> {
        self.entries.iter()
    }

    /// Outpoints spendable by one address.
    pub fn owned_by<'a>(
        &'a self,
        address: &'a Address,
    ) -> impl Iterator<Item = (&'a OutPoint, &'a TxOut)> {
        self.entries
            .iter()
            .filter(move |(_, tx_out)| &tx_out.address == address)
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.owned_by(address)
            .fold(0u64, |total, (_, tx_out)| {
                total.saturating_add(tx_out.amount)
            })
    }

    /// Sum of every unspent output, the circulating supply. Saturates
    /// rather than wrapping; a valid chain can never get near the cap.
    pub fn total_value(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |total, tx_out| total.saturating_add(tx_out.amount))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

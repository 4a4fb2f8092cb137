//! Transaction validation and UTXO transition
//!
//! Pure rules: nothing here touches shared state. `apply_transactions` is
//! the only way a UTXO set advances, and it is all-or-nothing - any invalid
//! transaction in the batch rejects the whole batch.

use std::collections::HashSet;

use thiserror::Error;

use crate::constants::COINBASE_AMOUNT;
use crate::crypto::{verify_signature, Address};
use crate::storage::UtxoSet;

use super::{validate_structure, OutPoint, Transaction};

/// Transaction validation errors. All recoverable: a failing transaction
/// or block is rejected and prior state stands.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("malformed transaction")]
    MalformedTransaction,
    #[error("malformed address")]
    MalformedAddress,
    #[error("transaction id does not match contents")]
    IdMismatch,
    #[error("input signature invalid for referenced output")]
    InvalidSignature,
    #[error("input total {inputs} does not equal output total {outputs}")]
    AmountMismatch { inputs: u64, outputs: u64 },
    #[error("amount sum overflows")]
    AmountOverflow,
    #[error("referenced output {0:?} not in UTXO set")]
    ReferenceNotFound(OutPoint),
    #[error("outpoint {0:?} spent twice in one block")]
    DoubleSpendInBlock(OutPoint),
    #[error("invalid coinbase transaction: {0}")]
    InvalidCoinbase(&'static str),
    #[error("key does not own the referenced output")]
    OwnershipMismatch,
}

/// Parse and shape-check an address string.
pub fn validate_address(s: &str) -> Result<Address, TxError> {
    Address::parse(s).map_err(|_| TxError::MalformedAddress)
}

/// Full validation of a non-coinbase transaction against a UTXO set:
/// structure, id integrity, per-input existence and signature, and exact
/// input/output amount equality (no fees are modeled).
pub fn validate_transaction(tx: &Transaction, utxo_set: &UtxoSet) -> Result<(), TxError> {
    validate_structure(tx)?;

    if tx.compute_id() != tx.id {
        return Err(TxError::IdMismatch);
    }

    let mut input_total: u64 = 0;
    for tx_in in &tx.tx_ins {
        let out_point = tx_in.out_point();
        // An already-spent or nonexistent reference is an error, never
        // silently skipped.
        let referenced = utxo_set
            .get(&out_point)
            .ok_or(TxError::ReferenceNotFound(out_point))?;
        if !verify_signature(&referenced.address, &tx.id, &tx_in.signature) {
            return Err(TxError::InvalidSignature);
        }
        input_total = input_total
            .checked_add(referenced.amount)
            .ok_or(TxError::AmountOverflow)?;
    }

    let output_total = tx.total_output_value().ok_or(TxError::AmountOverflow)?;
    if input_total != output_total {
        return Err(TxError::AmountMismatch {
            inputs: input_total,
            outputs: output_total,
        });
    }

    Ok(())
}

/// Validate the reward-minting transaction of the block at `block_index`.
pub fn validate_coinbase(tx: &Transaction, block_index: u64) -> Result<(), TxError> {
    if tx.compute_id() != tx.id {
        return Err(TxError::InvalidCoinbase("id mismatch"));
    }
    if tx.tx_ins.len() != 1 {
        return Err(TxError::InvalidCoinbase("must have exactly one input"));
    }
    if tx.tx_ins[0].tx_out_index != block_index {
        return Err(TxError::InvalidCoinbase("input index must be block index"));
    }
    if tx.tx_outs.len() != 1 {
        return Err(TxError::InvalidCoinbase("must have exactly one output"));
    }
    if tx.tx_outs[0].amount != COINBASE_AMOUNT {
        return Err(TxError::InvalidCoinbase("output must be the fixed reward"));
    }
    Ok(())
}

/// Validate a block's transaction batch and produce the successor UTXO set.
///
/// The first entry must be the coinbase for `block_index`; no outpoint may
/// be referenced twice across the batch; every other transaction must pass
/// `validate_transaction` against the pre-block set. On any failure the
/// input set is untouched.
pub fn apply_transactions(
    txs: &[Transaction],
    utxo_set: &UtxoSet,
    block_index: u64,
) -> Result<UtxoSet, TxError> {
    let coinbase = txs
        .first()
        .ok_or(TxError::InvalidCoinbase("block has no transactions"))?;
    validate_coinbase(coinbase, block_index)?;

    let mut seen = HashSet::new();
    for tx in txs {
        for out_point in tx.out_points() {
            if !seen.insert(out_point) {
                return Err(TxError::DoubleSpendInBlock(out_point));
            }
        }
    }

    for tx in &txs[1..] {
        validate_transaction(tx, utxo_set)?;
    }

    let mut next = utxo_set.clone();
    for tx in txs {
        if !tx.is_coinbase() {
            for out_point in tx.out_points() {
                next.remove(&out_point);
            }
        }
        for (index, tx_out) in tx.tx_outs.iter().enumerate() {
            next.insert(
                OutPoint {
                    tx_out_id: tx.id,
                    tx_out_index: index as u64,
                },
                tx_out.clone(),
            );
        }
    }
    Ok(next)
}

//! Wallet
//!
//! Holds the node's keypair and builds signed transactions. The wallet is
//! outside consensus: nothing here can mint or double-spend, because every
//! transaction it produces still passes through mempool admission.

use thiserror::Error;

use crate::crypto::{Address, KeyPair};
use crate::storage::{Mempool, UtxoSet};
use crate::validation::{sign_input, Transaction, TxError, TxIn, TxOut};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error(transparent)]
    Signing(#[from] TxError),
}

/// A single-key in-memory wallet.
pub struct Wallet {
    key: KeyPair,
}

impl Wallet {
    pub fn new() -> Self {
        Wallet {
            key: KeyPair::generate(),
        }
    }

    pub fn from_key(key: KeyPair) -> Self {
        Wallet { key }
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }

    pub fn balance(&self, utxo_set: &UtxoSet) -> u64 {
        utxo_set.balance(&self.address())
    }

    /// Build a signed transaction paying `amount` to `destination`.
    ///
    /// Selects from the wallet's own UTXOs, skipping any outpoint a pooled
    /// transaction already spends (the mempool would reject the conflict
    /// anyway). Any surplus over `amount` comes back as a change output to
    /// the wallet's address. Exact input/output equality is preserved, so
    /// the result passes `validate_transaction` as-is.
    pub fn create_transaction(
        &self,
        destination: Address,
        amount: u64,
        utxo_set: &UtxoSet,
        mempool: &Mempool,
    ) -> Result<Transaction, WalletError> {
        let reserved = mempool.spent_out_points();
        let mut selected = Vec::new();
        let mut selected_total: u64 = 0;
        for (out_point, tx_out) in utxo_set.owned_by(&self.address()) {
            if reserved.contains(out_point) {
                continue;
            }
            selected.push(*out_point);
            selected_total += tx_out.amount;
            if selected_total >= amount {
                break;
            }
        }
        if selected_total < amount {
            return Err(WalletError::InsufficientFunds {
                have: selected_total,
                need: amount,
            });
        }

        let tx_ins = selected
            .iter()
            .map(|out_point| TxIn {
                tx_out_id: out_point.tx_out_id,
                tx_out_index: out_point.tx_out_index,
                signature: String::new(),
            })
            .collect();

        let mut tx_outs = vec![TxOut {
            address: destination,
            amount,
        }];
        let change = selected_total - amount;
        if change > 0 {
            tx_outs.push(TxOut {
                address: self.address(),
                amount: change,
            });
        }

        // Id first, then signatures: every input signs the same digest.
        let mut tx = Transaction::new(tx_ins, tx_outs);
        for index in 0..tx.tx_ins.len() {
            let signature = sign_input(&tx, index, &self.key, utxo_set)?;
            tx.tx_ins[index].signature = signature;
        }
        Ok(tx)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

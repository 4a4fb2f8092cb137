//! Transaction structure
//!
//! UTXO-model transactions: inputs reference prior outputs by
//! (txOutId, txOutIndex) and prove ownership with an ECDSA signature over
//! the transaction id; outputs assign amounts to addresses.

use serde::{Deserialize, Serialize};

use crate::constants::COINBASE_AMOUNT;
use crate::crypto::{sha256_str, Address, Hash, KeyPair};
use crate::storage::UtxoSet;

use super::TxError;

/// Reference to a prior transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    pub tx_out_id: Hash,
    pub tx_out_index: u64,
}

/// A transaction input. The signature is DER hex over the transaction id,
/// empty for the coinbase input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    pub tx_out_id: Hash,
    pub tx_out_index: u64,
    pub signature: String,
}

impl TxIn {
    pub fn out_point(&self) -> OutPoint {
        OutPoint {
            tx_out_id: self.tx_out_id,
            tx_out_index: self.tx_out_index,
        }
    }
}

/// A transaction output: an amount locked to an address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxOut {
    pub address: Address,
    pub amount: u64,
}

/// A complete transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Hash,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
}

impl Transaction {
    /// Build a transaction and stamp it with its computed id. Inputs are
    /// expected to be signed afterwards, since signatures cover the id.
    pub fn new(tx_ins: Vec<TxIn>, tx_outs: Vec<TxOut>) -> Self {
        let mut tx = Transaction {
            id: Hash::zero(),
            tx_ins,
            tx_outs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// The coinbase transaction minting a block's reward. Its single input
    /// references the zero digest with index = the minting block's index,
    /// which makes every block's coinbase id unique.
    pub fn coinbase(address: Address, block_index: u64) -> Self {
        Transaction::new(
            vec![TxIn {
                tx_out_id: Hash::zero(),
                tx_out_index: block_index,
                signature: String::new(),
            }],
            vec![TxOut {
                address,
                amount: COINBASE_AMOUNT,
            }],
        )
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx_ins.len() == 1 && self.tx_ins[0].tx_out_id == Hash::zero()
    }

    /// Deterministic id: SHA-256 over the concatenated input references
    /// followed by the concatenated output contents. Signatures are not
    /// part of the preimage, so all inputs sign the same digest.
    pub fn compute_id(&self) -> Hash {
        let mut preimage = String::new();
        for tx_in in &self.tx_ins {
            preimage.push_str(&tx_in.tx_out_id.to_hex());
            preimage.push_str(&tx_in.tx_out_index.to_string());
        }
        for tx_out in &self.tx_outs {
            preimage.push_str(tx_out.address.as_str());
            preimage.push_str(&tx_out.amount.to_string());
        }
        sha256_str(&preimage)
    }

    /// Every referenced outpoint, in input order.
    pub fn out_points(&self) -> impl Iterator<Item = OutPoint> + '_ {
        self.tx_ins.iter().map(TxIn::out_point)
    }

    /// Sum of all output amounts, or `None` if the sum overflows. Amounts
    /// arrive from peers, so the overflow case is reachable and must be a
    /// rejection, not a wrap.
    pub fn total_output_value(&self) -> Option<u64> {
        self.tx_outs
            .iter()
            .try_fold(0u64, |total, o| total.checked_add(o.amount))
    }
}

/// Shape check on a parsed transaction. Typed parsing already guarantees
/// field types and address shape; what remains is emptiness and that each
/// signature is hex (possibly empty, for coinbase inputs).
pub fn validate_structure(tx: &Transaction) -> Result<(), TxError> {
    if tx.tx_ins.is_empty() || tx.tx_outs.is_empty() {
        return Err(TxError::MalformedTransaction);
    }
    for tx_in in &tx.tx_ins {
        if !tx_in.signature.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TxError::MalformedTransaction);
        }
    }
    Ok(())
}

/// Sign one input of a transaction whose id is already computed.
///
/// Fails if the referenced UTXO does not exist or the key does not own it.
/// Returns the signature; the caller places it into the input.
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    key: &KeyPair,
    utxo_set: &UtxoSet,
) -> Result<String, TxError> {
    let tx_in = tx
        .tx_ins
        .get(input_index)
        .ok_or(TxError::MalformedTransaction)?;
    let referenced = utxo_set
        .get(&tx_in.out_point())
        .ok_or(TxError::ReferenceNotFound(tx_in.out_point()))?;
    if referenced.address != key.address() {
        return Err(TxError::OwnershipMismatch);
    }
    Ok(key.sign_digest(&tx.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        KeyPair::generate().address()
    }

    #[test]
    fn test_coinbase_shape() {
        let cb = Transaction::coinbase(addr(), 7);
        assert!(cb.is_coinbase());
        assert_eq!(cb.tx_ins.len(), 1);
        assert_eq!(cb.tx_ins[0].tx_out_index, 7);
        assert!(cb.tx_ins[0].signature.is_empty());
        assert_eq!(cb.tx_outs.len(), 1);
        assert_eq!(cb.tx_outs[0].amount, COINBASE_AMOUNT);
    }

    #[test]
    fn test_coinbase_ids_differ_per_block() {
        let a = addr();
        let cb1 = Transaction::coinbase(a.clone(), 1);
        let cb2 = Transaction::coinbase(a, 2);
        assert_ne!(cb1.id, cb2.id);
    }

    #[test]
    fn test_id_ignores_signatures() {
        let mut tx = Transaction::coinbase(addr(), 3);
        let unsigned_id = tx.compute_id();
        tx.tx_ins[0].signature = "deadbeef".to_string();
        assert_eq!(tx.compute_id(), unsigned_id);
    }

    #[test]
    fn test_id_covers_outputs() {
        let a = addr();
        let tx1 = Transaction::new(
            vec![TxIn {
                tx_out_id: sha256_str("prev"),
                tx_out_index: 0,
                signature: String::new(),
            }],
            vec![TxOut {
                address: a.clone(),
                amount: 10,
            }],
        );
        let tx2 = Transaction::new(
            vec![tx1.tx_ins[0].clone()],
            vec![TxOut {
                address: a,
                amount: 11,
            }],
        );
        assert_ne!(tx1.id, tx2.id);
    }

    #[test]
    fn test_structure_rejects_empty() {
        let tx = Transaction::new(vec![], vec![]);
        assert!(matches!(
            validate_structure(&tx),
            Err(TxError::MalformedTransaction)
        ));
    }

    #[test]
    fn test_structure_rejects_non_hex_signature() {
        let mut tx = Transaction::coinbase(addr(), 0);
        tx.tx_ins[0].signature = "not hex!".to_string();
        assert!(validate_structure(&tx).is_err());
    }

    #[test]
    fn test_wire_field_names() {
        let tx = Transaction::coinbase(addr(), 0);
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("txIns").is_some());
        assert!(json.get("txOuts").is_some());
        assert!(json["txIns"][0].get("txOutId").is_some());
        assert!(json["txIns"][0].get("txOutIndex").is_some());
    }

    #[test]
    fn test_sign_input_errors() {
        let key = KeyPair::generate();
        let utxo_set = UtxoSet::new();
        let tx = Transaction::new(
            vec![TxIn {
                tx_out_id: sha256_str("missing"),
                tx_out_index: 0,
                signature: String::new(),
            }],
            vec![TxOut {
                address: key.address(),
                amount: 1,
            }],
        );
        assert!(matches!(
            sign_input(&tx, 0, &key, &utxo_set),
            Err(TxError::ReferenceNotFound(_))
        ));
        assert!(matches!(
            sign_input(&tx, 5, &key, &utxo_set),
            Err(TxError::MalformedTransaction)
        ));
    }
}

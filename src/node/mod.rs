//! Node wiring
//!
//! Owns the shared ledger handle, the wallet, and the miner, and publishes
//! ledger events on a broadcast channel. Acceptance and broadcast are
//! decoupled: `extend`/`replace` only report their outcome, and whoever
//! subscribes to the event channel (the p2p hub in `main`) decides what to
//! announce.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::consensus::Block;
use crate::crypto::Address;
use crate::mining::{Miner, MiningResult};
use crate::storage::{LedgerState, PoolError};
use crate::validation::Transaction;
use crate::wallet::{Wallet, WalletError};

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Ledger events observers may react to.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// A block was accepted locally (mined here, not received).
    BlockAccepted(Block),
    /// A locally submitted transaction entered the mempool.
    TransactionAdmitted(Transaction),
}

/// Errors surfaced to the submit path.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// A running node's core state and services.
pub struct Node {
    pub ledger: Arc<Mutex<LedgerState>>,
    pub wallet: Mutex<Wallet>,
    pub miner: Miner,
    events: broadcast::Sender<NodeEvent>,
}

impl Node {
    pub fn new() -> Arc<Self> {
        Self::with_wallet(Wallet::new())
    }

    /// Build a node around an existing wallet, e.g. one restored from a
    /// configured private key.
    pub fn with_wallet(wallet: Wallet) -> Arc<Self> {
        let miner = Miner::new(wallet.address());
        let (events, _) = broadcast::channel(64);
        Arc::new(Node {
            ledger: Arc::new(Mutex::new(LedgerState::new())),
            wallet: Mutex::new(wallet),
            miner,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.events.subscribe()
    }

    pub fn address(&self) -> Address {
        self.wallet.lock().expect("wallet lock").address()
    }

    /// Build, sign, and admit a payment from the local wallet.
    pub fn submit_payment(
        &self,
        destination: Address,
        amount: u64,
    ) -> Result<Transaction, NodeError> {
        let mut ledger = self.ledger.lock().expect("ledger lock");
        let tx = {
            let wallet = self.wallet.lock().expect("wallet lock");
            wallet.create_transaction(destination, amount, ledger.utxo_set(), ledger.mempool())?
        };
        ledger.admit_transaction(tx.clone())?;
        info!("transaction {} admitted to mempool", tx.id);
        let _ = self.events.send(NodeEvent::TransactionAdmitted(tx.clone()));
        Ok(tx)
    }

    /// One full mining round: assemble a candidate under the lock, search
    /// for a nonce off the lock, then re-validate and append under the
    /// lock. Returns the accepted block, or `None` if the search was
    /// cancelled or the chain moved underneath the candidate.
    pub fn mine_once(&self) -> Option<Block> {
        self.miner.reset();
        let template = {
            let ledger = self.ledger.lock().expect("ledger lock");
            self.miner.assemble_candidate(&ledger, unix_now())
        };

        match self.miner.find_nonce(template) {
            MiningResult::Success(block) => {
                let accepted = {
                    let mut ledger = self.ledger.lock().expect("ledger lock");
                    ledger.extend(block.clone(), unix_now())
                };
                match accepted {
                    Ok(()) => {
                        info!("mined block {} at difficulty {}", block.index, block.difficulty);
                        let _ = self.events.send(NodeEvent::BlockAccepted(block.clone()));
                        Some(block)
                    }
                    Err(err) => {
                        // The chain advanced while we searched; the stale
                        // candidate is discarded, no state was touched.
                        debug!("discarding stale mined block: {err}");
                        None
                    }
                }
            }
            MiningResult::Cancelled => None,
        }
    }
}

/// Continuous mining driver: runs rounds on the blocking pool forever.
pub async fn run_miner(node: Arc<Node>) {
    loop {
        let worker = Arc::clone(&node);
        let result = tokio::task::spawn_blocking(move || worker.mine_once()).await;
        match result {
            Ok(Some(_)) => {}
            // Cancelled or stale: back off briefly before retrying.
            Ok(None) => tokio::time::sleep(std::time::Duration::from_millis(200)).await,
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COINBASE_AMOUNT;

    #[test]
    fn test_mine_once_extends_chain() {
        let node = Node::new();
        let block = node.mine_once().expect("difficulty 0 always succeeds");
        assert_eq!(block.index, 1);
        let ledger = node.ledger.lock().unwrap();
        assert_eq!(ledger.latest_block().index, 1);
        assert_eq!(ledger.balance(&node.address()), COINBASE_AMOUNT);
    }

    #[test]
    fn test_with_wallet_keeps_imported_address() {
        let key = crate::crypto::KeyPair::from_bytes(&[9u8; 32]).unwrap();
        let expected = key.address();
        let node = Node::with_wallet(Wallet::from_key(key));
        assert_eq!(node.address(), expected);
        assert_eq!(node.miner.address(), &expected);
    }

    #[test]
    fn test_submit_payment_admits_and_reports() {
        let node = Node::new();
        node.mine_once().unwrap();
        let dest = Wallet::new().address();
        let mut events = node.subscribe();

        let tx = node.submit_payment(dest, 10).unwrap();
        assert_eq!(node.ledger.lock().unwrap().mempool().len(), 1);
        match events.try_recv() {
            Ok(NodeEvent::TransactionAdmitted(seen)) => assert_eq!(seen.id, tx.id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_submit_payment_insufficient_funds() {
        let node = Node::new();
        let dest = Wallet::new().address();
        assert!(matches!(
            node.submit_payment(dest, 10),
            Err(NodeError::Wallet(WalletError::InsufficientFunds { .. }))
        ));
    }

    #[test]
    fn test_mined_transaction_leaves_mempool() {
        let node = Node::new();
        node.mine_once().unwrap();
        let dest = Wallet::new().address();
        node.submit_payment(dest.clone(), 10).unwrap();

        node.mine_once().unwrap();
        let ledger = node.ledger.lock().unwrap();
        assert!(ledger.mempool().is_empty());
        assert_eq!(ledger.balance(&dest), 10);
    }
}

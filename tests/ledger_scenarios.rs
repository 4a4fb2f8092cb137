//! End-to-end ledger scenarios
//!
//! Drives full node workflows: mining, payments through the mempool,
//! fork resolution, and the peer sync reducer.

use ember_core::constants::COINBASE_AMOUNT;
use ember_core::crypto::{Hash, KeyPair};
use ember_core::mining::{Miner, MiningResult};
use ember_core::p2p::{handle_blockchain_response, SyncOutcome};
use ember_core::storage::{LedgerState, PoolError};
use ember_core::validation::{Transaction, TxIn, TxOut};
use ember_core::wallet::Wallet;

/// Mine and commit the next block, carrying the whole mempool.
fn mine_next(ledger: &mut LedgerState, miner: &Miner) -> ember_core::consensus::Block {
    let timestamp = ledger.latest_block().timestamp + 10;
    let template = miner.assemble_candidate(ledger, timestamp);
    match miner.find_nonce(template) {
        MiningResult::Success(block) => {
            ledger
                .extend(block.clone(), timestamp + 1)
                .expect("own block extends cleanly");
            block
        }
        MiningResult::Cancelled => panic!("no stop was requested"),
    }
}

#[test]
fn test_first_block_pays_the_miner() {
    let mut ledger = LedgerState::new();
    let wallet = Wallet::new();
    let miner = Miner::new(wallet.address());

    let block = mine_next(&mut ledger, &miner);

    assert_eq!(block.index, 1);
    assert_eq!(ledger.chain().len(), 2);
    assert_eq!(wallet.balance(ledger.utxo_set()), COINBASE_AMOUNT);
    // Genesis allocation plus one subsidy.
    assert_eq!(ledger.utxo_set().total_value(), 2 * COINBASE_AMOUNT);
}

#[test]
fn test_payment_lifecycle() {
    let mut ledger = LedgerState::new();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let miner = Miner::new(alice.address());

    mine_next(&mut ledger, &miner);
    let supply_before = ledger.utxo_set().total_value();

    let payment = alice
        .create_transaction(bob.address(), 20, ledger.utxo_set(), ledger.mempool())
        .expect("alice is funded");
    ledger
        .admit_transaction(payment)
        .expect("fresh payment enters the pool");
    assert_eq!(ledger.mempool().len(), 1);

    // The next block carries the payment plus its own subsidy.
    let block = mine_next(&mut ledger, &miner);
    assert_eq!(block.data.len(), 2);
    assert!(ledger.mempool().is_empty());

    assert_eq!(bob.balance(ledger.utxo_set()), 20);
    // Alice spent her single 50 output: 30 change plus the new subsidy.
    assert_eq!(alice.balance(ledger.utxo_set()), 80);
    assert_eq!(
        ledger.utxo_set().total_value(),
        supply_before + COINBASE_AMOUNT
    );
}

#[test]
fn test_conflicting_spend_rejected_by_pool() {
    let mut ledger = LedgerState::new();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let carol = Wallet::new();
    let miner = Miner::new(alice.address());

    mine_next(&mut ledger, &miner);

    // Both payments built against the same confirmed output, before
    // either reaches the pool.
    let to_bob = alice
        .create_transaction(bob.address(), 10, ledger.utxo_set(), ledger.mempool())
        .expect("alice is funded");
    let to_carol = alice
        .create_transaction(carol.address(), 15, ledger.utxo_set(), ledger.mempool())
        .expect("alice is funded");

    ledger.admit_transaction(to_bob).expect("first spend admits");
    match ledger.admit_transaction(to_carol) {
        Err(PoolError::ConflictsWithPool) => {}
        other => panic!("expected a pool conflict, got {other:?}"),
    }
    assert_eq!(ledger.mempool().len(), 1);
}

#[test]
fn test_wallet_respects_pool_reservations() {
    let mut ledger = LedgerState::new();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let miner = Miner::new(alice.address());

    mine_next(&mut ledger, &miner);
    let payment = alice
        .create_transaction(bob.address(), 10, ledger.utxo_set(), ledger.mempool())
        .expect("alice is funded");
    ledger.admit_transaction(payment).expect("first spend admits");

    // Alice's only output is now reserved by the pool, so the wallet
    // refuses to build a conflicting spend rather than produce one.
    assert!(alice
        .create_transaction(bob.address(), 10, ledger.utxo_set(), ledger.mempool())
        .is_err());
}

#[test]
fn test_overpaying_coinbase_rejected() {
    use ember_core::consensus::Block;

    let mut ledger = LedgerState::new();
    let tip = ledger.latest_block().clone();

    let greedy = Transaction::new(
        vec![TxIn {
            tx_out_id: Hash::zero(),
            tx_out_index: tip.index + 1,
            signature: String::new(),
        }],
        vec![TxOut {
            address: KeyPair::generate().address(),
            amount: COINBASE_AMOUNT + 1,
        }],
    );
    let block = Block::new(
        tip.index + 1,
        tip.hash,
        tip.timestamp + 10,
        vec![greedy],
        0,
        0,
    );

    assert!(ledger.extend(block, tip.timestamp + 11).is_err());
    assert_eq!(ledger.chain().len(), 1);
}

#[test]
fn test_heavier_fork_replaces_local_chain() {
    let mut local = LedgerState::new();
    let mut remote = LedgerState::new();
    let local_miner = Miner::new(Wallet::new().address());
    let remote_miner = Miner::new(Wallet::new().address());

    mine_next(&mut local, &local_miner);
    mine_next(&mut remote, &remote_miner);
    mine_next(&mut remote, &remote_miner);

    let now = remote.latest_block().timestamp + 1;
    local
        .replace(remote.chain().to_vec(), now)
        .expect("heavier chain adopted");

    assert_eq!(local.chain(), remote.chain());
    assert_eq!(local.utxo_set(), remote.utxo_set());
    assert_eq!(local.latest_block().index, 2);
}

#[test]
fn test_lighter_fork_rejected() {
    let mut local = LedgerState::new();
    let mut remote = LedgerState::new();
    let local_miner = Miner::new(Wallet::new().address());
    let remote_miner = Miner::new(Wallet::new().address());

    mine_next(&mut local, &local_miner);
    mine_next(&mut local, &local_miner);
    mine_next(&mut remote, &remote_miner);

    let now = local.latest_block().timestamp + 1;
    let before = local.chain().to_vec();
    assert!(local.replace(remote.chain().to_vec(), now).is_err());
    assert_eq!(local.chain(), &before[..]);
}

#[test]
fn test_sync_reducer_extends_from_single_block() {
    let mut local = LedgerState::new();
    let mut remote = LedgerState::new();
    let remote_miner = Miner::new(Wallet::new().address());

    let block = mine_next(&mut remote, &remote_miner);
    let now = block.timestamp + 1;

    let outcome = handle_blockchain_response(&mut local, vec![block], now);
    assert_eq!(outcome, SyncOutcome::BroadcastLatest);
    assert_eq!(local.latest_block().index, 1);
}

#[test]
fn test_sync_reducer_queries_on_gap() {
    let mut local = LedgerState::new();
    let mut remote = LedgerState::new();
    let remote_miner = Miner::new(Wallet::new().address());

    mine_next(&mut remote, &remote_miner);
    let tip = mine_next(&mut remote, &remote_miner);
    let now = tip.timestamp + 1;

    // The remote tip alone cannot be linked; the reducer asks for the
    // full chain, then adopts it.
    let outcome = handle_blockchain_response(&mut local, vec![tip], now);
    assert_eq!(outcome, SyncOutcome::QueryAll);
    assert_eq!(local.latest_block().index, 0);

    let outcome = handle_blockchain_response(&mut local, remote.chain().to_vec(), now);
    assert_eq!(outcome, SyncOutcome::BroadcastLatest);
    assert_eq!(local.latest_block().index, 2);
}

#[test]
fn test_sync_reducer_ignores_stale_tip() {
    let mut local = LedgerState::new();
    let miner = Miner::new(Wallet::new().address());

    let block = mine_next(&mut local, &miner);
    let now = block.timestamp + 1;

    let outcome = handle_blockchain_response(&mut local, vec![block], now);
    assert_eq!(outcome, SyncOutcome::NoOp);
    assert_eq!(local.chain().len(), 2);
}

#[test]
fn test_mining_cancellation() {
    let ledger = LedgerState::new();
    let miner = Miner::new(Wallet::new().address());

    let mut template = miner.assemble_candidate(&ledger, ledger.latest_block().timestamp + 10);
    // Hard enough that the search cannot finish before the first
    // stop-flag check.
    template.difficulty = 64;
    miner.stop();
    assert!(matches!(miner.find_nonce(template), MiningResult::Cancelled));
}

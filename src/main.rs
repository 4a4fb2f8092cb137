//! Ember Node
//!
//! Entry point for running an ember node: p2p listener, JSON-RPC server,
//! and an optional continuous miner, all sharing one ledger.

use std::sync::Arc;

use log::{error, info, warn};

use ember_core::crypto::KeyPair;
use ember_core::node::{run_miner, Node, NodeEvent};
use ember_core::p2p::{self, Message, PeerHub};
use ember_core::rpc::{start_rpc_server, RpcState};
use ember_core::wallet::Wallet;

struct Config {
    p2p_port: u16,
    rpc_port: u16,
    peers: Vec<String>,
    mine: bool,
    wallet_key: Option<KeyPair>,
}

impl Config {
    fn from_env() -> Self {
        Config {
            p2p_port: env_port("EMBER_P2P_PORT", 6001),
            rpc_port: env_port("EMBER_RPC_PORT", 3001),
            peers: std::env::var("EMBER_PEERS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            mine: std::env::var("EMBER_MINE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            wallet_key: env_wallet_key("EMBER_WALLET_KEY"),
        }
    }
}

/// An optional 64-hex private key keeping the node's address stable across
/// restarts. A value that does not decode to a usable key aborts startup
/// rather than silently minting to a fresh address.
fn env_wallet_key(name: &str) -> Option<KeyPair> {
    let value = std::env::var(name).ok()?;
    let decoded = match hex::decode(&value) {
        Ok(bytes) => bytes,
        Err(_) => {
            error!("{name} is not valid hex");
            std::process::exit(1);
        }
    };
    let bytes: [u8; 32] = match decoded.try_into() {
        Ok(b) => b,
        Err(_) => {
            error!("{name} must be exactly 32 bytes of hex");
            std::process::exit(1);
        }
    };
    match KeyPair::from_bytes(&bytes) {
        Ok(key) => Some(key),
        Err(err) => {
            error!("{name} rejected: {err}");
            std::process::exit(1);
        }
    }
}

fn env_port(name: &str, default: u16) -> u16 {
    match std::env::var(name) {
        Ok(value) => match value.parse() {
            Ok(port) => port,
            Err(_) => {
                warn!("ignoring invalid {name}={value}, using {default}");
                default
            }
        },
        Err(_) => default,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env();
    let node = match config.wallet_key {
        Some(key) => Node::with_wallet(Wallet::from_key(key)),
        None => Node::new(),
    };
    let hub = PeerHub::new(Arc::clone(&node.ledger));

    info!("node address: {}", node.address());

    // A peer block that advances the tip makes the template under search
    // stale; stop the search so the next round rebuilds from the new tip.
    {
        let node = Arc::clone(&node);
        hub.on_tip_advance(move || node.miner.stop());
    }

    // Pump ledger events out to peers. Acceptance never broadcasts
    // directly; this task is the only place announcements happen.
    {
        let hub = Arc::clone(&hub);
        let mut events = node.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    NodeEvent::BlockAccepted(_) => hub.broadcast_latest(),
                    NodeEvent::TransactionAdmitted(tx) => {
                        hub.broadcast(&Message::MempoolResponse(vec![tx]));
                    }
                }
            }
        });
    }

    // P2p listener.
    {
        let hub = Arc::clone(&hub);
        let port = config.p2p_port;
        tokio::spawn(async move {
            if let Err(err) = p2p::listen(hub, port).await {
                error!("p2p listener failed: {err}");
            }
        });
    }

    // Outbound peers from config.
    for addr in config.peers {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            p2p::connect(hub, addr).await;
        });
    }

    // JSON-RPC server.
    {
        let state = Arc::new(RpcState {
            node: Arc::clone(&node),
            hub: Arc::clone(&hub),
        });
        let port = config.rpc_port;
        tokio::spawn(async move {
            if let Err(err) = start_rpc_server(state, port).await {
                error!("rpc server failed: {err}");
            }
        });
    }

    if config.mine {
        info!("mining enabled");
        let miner_node = Arc::clone(&node);
        tokio::spawn(run_miner(miner_node));
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(err) => error!("failed to listen for shutdown signal: {err}"),
    }
    node.miner.stop();
}

//! Peer transport
//!
//! Newline-delimited JSON messages over TCP. Each connection gets a reader
//! loop (messages from one peer are processed in arrival order) and a
//! writer task fed through a channel; peers are independent of each other.
//! All ledger mutations go through the single ledger lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::node::unix_now;
use crate::storage::LedgerState;

use super::{handle_blockchain_response, handle_mempool_response, Message, SyncOutcome};

type TipCallback = Box<dyn Fn() + Send + Sync>;

/// Connected peers and the shared ledger they reconcile against.
pub struct PeerHub {
    ledger: Arc<Mutex<LedgerState>>,
    peers: Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>,
    next_peer_id: AtomicU64,
    tip_listener: Mutex<Option<TipCallback>>,
}

impl PeerHub {
    pub fn new(ledger: Arc<Mutex<LedgerState>>) -> Arc<Self> {
        Arc::new(PeerHub {
            ledger,
            peers: Mutex::new(HashMap::new()),
            next_peer_id: AtomicU64::new(0),
            tip_listener: Mutex::new(None),
        })
    }

    /// Register a callback run whenever a peer block advances the chain.
    /// The node uses this to cancel an in-flight mining search, whose
    /// template went stale the moment the tip moved.
    pub fn on_tip_advance(&self, callback: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut listener) = self.tip_listener.lock() {
            *listener = Some(Box::new(callback));
        }
    }

    fn notify_tip_advance(&self) {
        if let Ok(listener) = self.tip_listener.lock() {
            if let Some(callback) = listener.as_ref() {
                callback();
            }
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().map(|peers| peers.len()).unwrap_or(0)
    }

    /// Send a message to every connected peer.
    pub fn broadcast(&self, message: &Message) {
        let line = message.to_json();
        if let Ok(peers) = self.peers.lock() {
            for sender in peers.values() {
                let _ = sender.send(line.clone());
            }
        }
    }

    /// Announce the current tip to every peer.
    pub fn broadcast_latest(&self) {
        self.broadcast(&self.latest_message());
    }

    fn latest_message(&self) -> Message {
        let ledger = self.ledger.lock().expect("ledger lock");
        Message::BlockchainResponse(vec![ledger.latest_block().clone()])
    }

    fn chain_message(&self) -> Message {
        let ledger = self.ledger.lock().expect("ledger lock");
        Message::BlockchainResponse(ledger.chain().to_vec())
    }

    fn mempool_message(&self) -> Message {
        let ledger = self.ledger.lock().expect("ledger lock");
        Message::MempoolResponse(ledger.mempool_snapshot())
    }

    fn register(&self, sender: mpsc::UnboundedSender<String>) -> u64 {
        let id = self.next_peer_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut peers) = self.peers.lock() {
            peers.insert(id, sender);
        }
        id
    }

    fn unregister(&self, id: u64) {
        if let Ok(mut peers) = self.peers.lock() {
            peers.remove(&id);
        }
    }

    /// Process one message from one peer, replying through `reply`.
    fn process(&self, message: Message, reply: &mpsc::UnboundedSender<String>) {
        match message {
            Message::GetLatest => {
                let _ = reply.send(self.latest_message().to_json());
            }
            Message::GetAll => {
                let _ = reply.send(self.chain_message().to_json());
            }
            Message::RequestMempool => {
                let _ = reply.send(self.mempool_message().to_json());
            }
            Message::BlockchainResponse(blocks) => {
                let outcome = {
                    let mut ledger = self.ledger.lock().expect("ledger lock");
                    handle_blockchain_response(&mut ledger, blocks, unix_now())
                };
                match outcome {
                    SyncOutcome::BroadcastLatest => {
                        self.notify_tip_advance();
                        self.broadcast_latest();
                    }
                    SyncOutcome::QueryAll => self.broadcast(&Message::GetAll),
                    SyncOutcome::NoOp => {}
                }
            }
            Message::MempoolResponse(txs) => {
                let mut ledger = self.ledger.lock().expect("ledger lock");
                handle_mempool_response(&mut ledger, txs);
            }
        }
    }
}

/// Accept inbound peer connections on `port`.
pub async fn listen(hub: Arc<PeerHub>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("p2p listening on port {port}");
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("peer connected: {addr}");
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            handle_connection(hub, stream).await;
        });
    }
}

/// Dial an outbound peer.
pub async fn connect(hub: Arc<PeerHub>, addr: String) {
    match TcpStream::connect(&addr).await {
        Ok(stream) => {
            info!("connected to peer {addr}");
            tokio::spawn(async move {
                handle_connection(hub, stream).await;
            });
        }
        Err(err) => warn!("could not connect to peer {addr}: {err}"),
    }
}

async fn handle_connection(hub: Arc<PeerHub>, stream: TcpStream) {
    let (read_half, mut write_half) = stream.into_split();
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();
    let peer_id = hub.register(sender.clone());

    // Writer: one task per peer drains its outbound queue.
    let writer = tokio::spawn(async move {
        while let Some(line) = receiver.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if write_half.write_all(b"\n").await.is_err() {
                break;
            }
        }
    });

    // Open the conversation: ask where the peer is and what it has pending.
    let _ = sender.send(Message::GetLatest.to_json());
    let _ = sender.send(Message::RequestMempool.to_json());

    let mut lines = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match Message::parse(&line) {
            Some(message) => hub.process(message, &sender),
            // Fail closed: undecodable input is dropped, not interpreted.
            None => warn!("dropping malformed peer message ({} bytes)", line.len()),
        }
    }

    hub.unregister(peer_id);
    writer.abort();
    info!("peer disconnected");
}

//! Embercoin core library
//!
//! A minimal proof-of-work cryptocurrency: an append-only chain of blocks,
//! a UTXO ledger with ECDSA-signed transactions, adjustable-difficulty
//! mining, and a peer protocol that converges nodes on the chain with the
//! most cumulative work.

pub mod consensus;
pub mod crypto;
pub mod mining;
pub mod node;
pub mod p2p;
pub mod rpc;
pub mod storage;
pub mod validation;
pub mod wallet;

/// Protocol constants. Changing any of these forks the network.
pub mod constants {
    /// Reward minted by every block's coinbase transaction.
    pub const COINBASE_AMOUNT: u64 = 50;

    /// Target seconds between blocks.
    pub const BLOCK_INTERVAL_SECS: u64 = 10;

    /// Blocks between difficulty recalculations.
    pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

    /// Slack allowed when validating block timestamps, in seconds.
    pub const TIMESTAMP_GRACE_SECS: u64 = 60;

    /// Timestamp of the genesis block (Unix seconds).
    pub const GENESIS_TIMESTAMP: u64 = 1718000000;

    /// Uncompressed secp256k1 public key that receives the genesis coinbase.
    /// Nobody holds the matching private key, so the output is unspendable.
    pub const GENESIS_ADDRESS: &str = "04bfcab8722991ae774db48f934ca79cfb7dd991229153b9f732ba5334aafcd8e7266e47076996b55a14bf9913ee3145ce0cfc1372ada8ada74bd287450313534a";
}

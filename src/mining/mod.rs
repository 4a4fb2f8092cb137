//! Mining module - candidate assembly and cancellable proof-of-work search

mod miner;

pub use miner::*;

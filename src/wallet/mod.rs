//! Wallet module - key custody and transaction building

mod wallet;

pub use wallet::*;

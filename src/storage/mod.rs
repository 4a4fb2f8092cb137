//! Storage module - UTXO set, mempool, and ledger state

mod mempool;
mod state;
mod utxo;

pub use mempool::*;
pub use state::*;
pub use utxo::*;

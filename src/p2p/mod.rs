//! P2P module - peer messages, the sync reducer, and the TCP transport

mod protocol;
mod server;
mod sync;

pub use protocol::*;
pub use server::*;
pub use sync::*;

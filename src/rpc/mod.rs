//! RPC module - JSON-RPC methods and the HTTP server

mod methods;
mod server;

pub use methods::*;
pub use server::*;

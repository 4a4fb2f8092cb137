//! Cryptography module - SHA-256 hashing and secp256k1 ECDSA keys

mod hash;
mod keys;

pub use hash::*;
pub use keys::*;

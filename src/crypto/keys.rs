//! secp256k1 ECDSA keys and addresses
//!
//! An address is the 130-hex-character uncompressed SEC1 encoding of a
//! public key (leading `04` byte). Signatures are DER-encoded and carried
//! as hex strings; they always cover a transaction id digest.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use super::Hash;

/// Hex length of an uncompressed SEC1 public key (65 bytes).
pub const ADDRESS_HEX_LEN: usize = 130;

/// Key and address errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("malformed address")]
    MalformedAddress,
    #[error("invalid private key")]
    InvalidPrivateKey,
}

/// A destination address: lowercase hex of an uncompressed public key.
///
/// Parsing enforces shape only (length, hex, `04` prefix); whether the
/// encoding is a real curve point is settled when a signature against it
/// is verified.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        if s.len() != ADDRESS_HEX_LEN {
            return Err(KeyError::MalformedAddress);
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KeyError::MalformedAddress);
        }
        let lower = s.to_ascii_lowercase();
        if !lower.starts_with("04") {
            return Err(KeyError::MalformedAddress);
        }
        Ok(Address(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}..{})", &self.0[..6], &self.0[self.0.len() - 6..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A secp256k1 keypair held in memory by the wallet.
#[derive(Clone)]
pub struct KeyPair(SigningKey);

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair([REDACTED])")
    }
}

impl KeyPair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        KeyPair(SigningKey::random(&mut OsRng))
    }

    /// Import from a raw 32-byte scalar, e.g. a key carried in node
    /// configuration so the address survives restarts.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        SigningKey::from_bytes(bytes.into())
            .map(KeyPair)
            .map_err(|_| KeyError::InvalidPrivateKey)
    }

    /// The public address: uncompressed SEC1 encoding as lowercase hex.
    pub fn address(&self) -> Address {
        let point = self.0.verifying_key().to_encoded_point(false);
        Address(hex::encode(point.as_bytes()))
    }

    /// Sign a digest, returning the DER signature as hex.
    pub fn sign_digest(&self, digest: &Hash) -> String {
        let signature: Signature = self.0.sign(digest.as_bytes());
        hex::encode(signature.to_der().as_bytes())
    }
}

/// Verify a DER-hex signature over `digest` against `address`.
///
/// Any malformed key, signature, or encoding verifies false; peer input
/// must never be able to panic the validator.
pub fn verify_signature(address: &Address, digest: &Hash, signature_hex: &str) -> bool {
    let key_bytes = match hex::decode(address.as_str()) {
        Ok(b) => b,
        Err(_) => return false,
    };
    let verifying_key = match VerifyingKey::from_sec1_bytes(&key_bytes) {
        Ok(vk) => vk,
        Err(_) => return false,
    };
    let sig_bytes = match hex::decode(signature_hex) {
        Ok(b) => b,
        Err(_) => return false,
    };
    let signature = match Signature::from_der(&sig_bytes) {
        Ok(s) => s,
        Err(_) => return false,
    };
    verifying_key.verify(digest.as_bytes(), &signature).is_ok()
}

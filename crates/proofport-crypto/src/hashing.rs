//! # Hashing Primitives
//!
//! SHA-256 for the fingerprint digest, Keccak-256 for everything
//! EVM-shaped (signal hashes, EIP-712 hashes, nullifiers).

use sha2::{Digest, Sha256};
use sha3::Keccak256;

pub type Hash32 = [u8; 32];

pub fn sha256(data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn keccak256_many(inputs: &[&[u8]]) -> Hash32 {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Lowercase `0x`-prefixed hex encoding, the canonical wire form for proof
/// bytes, public inputs, and hashes throughout the engine.
pub fn to_hex0x(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex0x(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

//! # ZKProofPort Crypto
//!
//! The cryptographic primitives shared by the signing and payment
//! rendezvous: Keccak/SHA-256 hashing and secp256k1 signature recovery.
//! Address-recovery (never "verify against a known key") is the only
//! signature check the engine performs — both `signalHash` callbacks and
//! EIP-712 payment authorizations resolve to an address this way.

pub mod ecdsa;
pub mod errors;
pub mod hashing;

pub use ecdsa::{public_key_to_address, recover_address};
pub use errors::CryptoError;
pub use hashing::{from_hex0x, keccak256, keccak256_many, sha256, to_hex0x, Hash32};

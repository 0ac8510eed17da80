//! # ZKProofPort Attestation
//!
//! TEE attestation document generation and verification. `Attester` is a
//! closed three-variant dispatch (`Disabled` / `Local` / `Nitro`); the
//! wire format is a COSE-Sign1 envelope (see [`cose`]) wrapping an
//! [`payload::AttestationPayload`], base64-encoded into
//! `proofport_types::entities::AttestationEnvelope` at the API boundary.

pub mod cose;
pub mod errors;
pub mod payload;
pub mod provider;
pub mod verify;

pub use errors::AttestError;
pub use payload::AttestationPayload;
pub use provider::{Attester, LocalAttester, NitroAttester};
pub use verify::{Parsed, Verification};

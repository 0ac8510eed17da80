//! # Fingerprint & Cache (C2)
//!
//! A deterministic fingerprint of a proof request's semantic inputs, and
//! an idempotent cache of proof results keyed by that fingerprint. The
//! cache is advisory — a miss never proves nothing is in flight; the
//! flow coordinator's fingerprint lock (C6) is what actually enforces
//! at-most-one proving.

pub mod cache;
pub mod fingerprint;

pub use cache::ProofCache;
pub use fingerprint::{fingerprint, FingerprintInputs};

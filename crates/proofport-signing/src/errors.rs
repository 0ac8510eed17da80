//! Signing rendezvous errors (§4.4, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing request not found")]
    NotFound,

    /// Covers both "wrong status" and "callback attempts exceeded" per §7:
    /// both are reported as `Conflict`.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("signing request expired")]
    Expired,

    #[error("kv store error: {0}")]
    Store(#[from] proofport_kv::StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] proofport_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Payment rendezvous errors (§4.5, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment authorization not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payment authorization expired")]
    Expired,

    /// Retryable without nonce rotation; the Flow remains in `payment`.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("kv store error: {0}")]
    Store(#[from] proofport_kv::StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] proofport_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

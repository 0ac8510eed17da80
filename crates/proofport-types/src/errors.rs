//! # Engine Error Kinds
//!
//! The closed set of error kinds operations return (never thrown/strung
//! across module boundaries — see §7 and §9 of the design notes). The
//! flow coordinator routes on the variant, never on `.to_string()`.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrong phase, signing attempts exceeded, or a payment nonce reused.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed payload, address mismatch, or a signature over the wrong message.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("expired")]
    Expired,

    #[error("prove error: {0}")]
    ProveError(String),

    #[error("prove timeout after {0}s")]
    ProveTimeout(u64),

    /// Facilitator, RPC, or attestation service failure.
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// Missing verifier, missing circuit artifact, bad config value.
    #[error("config error: {0}")]
    ConfigError(String),
}

impl EngineError {
    /// A short machine-readable code, surfaced in the HTTP error envelope's
    /// optional `code` field.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::BadRequest(_) => "bad_request",
            EngineError::RateLimited { .. } => "rate_limited",
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::Expired => "expired",
            EngineError::ProveError(_) => "prove_error",
            EngineError::ProveTimeout(_) => "prove_timeout",
            EngineError::UpstreamError(_) => "upstream_error",
            EngineError::ConfigError(_) => "config_error",
        }
    }
}

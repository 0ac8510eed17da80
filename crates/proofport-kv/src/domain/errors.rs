//! # Store Errors

use thiserror::Error;

/// Errors surfaced by any `KvStore` adapter.
///
/// Every variant is a transport/backend failure — there is no domain
/// logic at this layer, so callers only ever see `Unavailable` or
/// `Backend` and decide for themselves what to do about it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("kv store unavailable: {0}")]
    Unavailable(String),

    #[error("kv backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

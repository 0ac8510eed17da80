//! Prover invocation errors (§4.7, §7). Errors are wrapped with
//! `circuitId` and a redacted fingerprint rather than the raw inputs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProveError {
    #[error("prove error for circuit {circuit_id} (fp {fingerprint}): {stderr}")]
    Failed {
        circuit_id: String,
        fingerprint: String,
        stderr: String,
    },

    #[error("prove timeout after {0}s")]
    Timeout(u64),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

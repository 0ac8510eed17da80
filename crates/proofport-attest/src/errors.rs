//! Attestation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttestError {
    #[error("cose encoding error: {0}")]
    Cose(String),

    #[error("cbor encoding error: {0}")]
    Cbor(String),

    #[error("certificate chain error: {0}")]
    Certificate(String),

    #[error("signing error: {0}")]
    Signing(String),
}

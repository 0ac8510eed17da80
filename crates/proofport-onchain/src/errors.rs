//! On-chain verifier errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OnchainError {
    #[error("no verifier registered for circuit {circuit_id} on chain {chain_id}")]
    UnknownCircuit { circuit_id: String, chain_id: u64 },

    #[error("verifier contract address missing for circuit {circuit_id} on chain {chain_id}")]
    NoVerifier { circuit_id: String, chain_id: u64 },

    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("malformed rpc response: {0}")]
    MalformedResponse(String),
}

//! # On-chain Verifier (C10)
//!
//! Calls a circuit-specific verifier contract's `verify(bytes,bytes32[])`
//! view function over JSON-RPC `eth_call`. The contract address comes
//! from a static registry; a revert is surfaced as `isValid = false`
//! with a reason, never as a transport error.

pub mod abi;
pub mod errors;
pub mod registry;

pub use errors::OnchainError;
pub use registry::VerifierRegistry;

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub circuit_id: String,
    pub chain_id: u64,
    pub proof: Vec<u8>,
    pub public_inputs: Vec<[u8; 32]>,
}

#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub is_valid: bool,
    pub verifier_address: String,
    pub reason: Option<String>,
}

#[async_trait]
pub trait OnchainVerifier: Send + Sync {
    async fn verify(&self, request: VerifyRequest) -> Result<VerifyResult, OnchainError>;
}

pub struct JsonRpcVerifier {
    client: reqwest::Client,
    rpc_url: String,
    registry: VerifierRegistry,
    timeout: Duration,
}

impl JsonRpcVerifier {
    pub fn new(rpc_url: String, registry: VerifierRegistry, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url,
            registry,
            timeout,
        }
    }
}

#[derive(serde::Serialize)]
struct EthCallParams<'a> {
    to: &'a str,
    data: String,
}

#[derive(serde::Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: (EthCallParams<'a>, &'a str),
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<JsonRpcError>,
}

#[async_trait]
impl OnchainVerifier for JsonRpcVerifier {
    async fn verify(&self, request: VerifyRequest) -> Result<VerifyResult, OnchainError> {
        let verifier_address = self
            .registry
            .lookup(&request.circuit_id, request.chain_id)?
            .to_string();

        let call_data = abi::encode_verify_call(&request.proof, &request.public_inputs);
        let rpc_request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_call",
            params: (
                EthCallParams {
                    to: &verifier_address,
                    data: format!("0x{}", hex::encode(call_data)),
                },
                "latest",
            ),
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&rpc_request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| OnchainError::Transport(err.to_string()))?;

        let parsed: JsonRpcResponse = response
            .json()
            .await
            .map_err(|err| OnchainError::MalformedResponse(err.to_string()))?;

        if let Some(error) = parsed.error {
            return Ok(VerifyResult {
                is_valid: false,
                verifier_address,
                reason: Some(error.message),
            });
        }

        let raw = parsed
            .result
            .ok_or_else(|| OnchainError::MalformedResponse("missing result field".to_string()))?;
        let bytes = hex::decode(raw.trim_start_matches("0x"))
            .map_err(|err| OnchainError::MalformedResponse(err.to_string()))?;
        let is_valid = abi::decode_bool_return(&bytes);

        Ok(VerifyResult {
            is_valid,
            verifier_address,
            reason: if is_valid { None } else { Some("verifier returned false".to_string()) },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_circuit_short_circuits_before_rpc_call() {
        let verifier = JsonRpcVerifier::new(
            "http://127.0.0.1:8545".to_string(),
            VerifierRegistry::new(),
            Duration::from_secs(5),
        );
        let result = verifier
            .verify(VerifyRequest {
                circuit_id: "coinbase_attestation".to_string(),
                chain_id: 8453,
                proof: vec![1, 2, 3],
                public_inputs: vec![[0u8; 32]],
            })
            .await;
        assert!(matches!(result, Err(OnchainError::UnknownCircuit { .. })));
    }
}

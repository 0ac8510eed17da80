//! `/api/v1/proof/*`, `/api/v1/attestation/*`, `/api/verify` — the
//! read-only artifact surface and the on-chain verification outcall.

use crate::error::{map_attest_error, map_onchain_error, map_result_error, ApiError};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use proofport_crypto::from_hex0x;
use proofport_onchain::{OnchainVerifier, VerifyRequest};
use proofport_types::{EngineError, ProofResult};
use serde::{Deserialize, Serialize};

pub async fn get_proof(
    State(state): State<AppState>,
    Path(proof_id): Path<String>,
) -> Result<Json<ProofResult>, ApiError> {
    let result = state
        .results
        .get(&proof_id)
        .await
        .map_err(map_result_error)?
        .ok_or_else(|| EngineError::NotFound(format!("proof {proof_id} not found")))?;
    Ok(Json(result))
}

#[derive(Serialize)]
pub struct AttestationData {
    pub document: String,
    pub mode: proofport_types::TeeMode,
    pub proof_hash: String,
    pub timestamp: i64,
    pub certificate_chain_valid: bool,
    pub certificates_in_validity_window: bool,
    pub signature_valid: bool,
    pub user_data_matches: bool,
    pub is_valid: bool,
}

pub async fn get_attestation(
    State(state): State<AppState>,
    Path(proof_id): Path<String>,
) -> Result<Json<AttestationData>, ApiError> {
    let result = state
        .results
        .get(&proof_id)
        .await
        .map_err(map_result_error)?
        .ok_or_else(|| EngineError::NotFound(format!("proof {proof_id} not found")))?;
    let envelope = result
        .attestation
        .ok_or_else(|| EngineError::NotFound(format!("proof {proof_id} has no attestation")))?;
    let verification = state
        .attester
        .verify(&envelope)
        .map_err(map_attest_error)?;
    Ok(Json(AttestationData {
        document: envelope.document,
        mode: envelope.mode,
        proof_hash: envelope.proof_hash,
        timestamp: envelope.timestamp,
        certificate_chain_valid: verification.certificate_chain_valid,
        certificates_in_validity_window: verification.certificates_in_validity_window,
        signature_valid: verification.signature_valid,
        user_data_matches: verification.user_data_matches,
        is_valid: verification.is_valid(),
    }))
}

#[derive(Deserialize)]
pub struct VerifyRequestDto {
    pub circuit_id: String,
    pub chain_id: u64,
    pub proof: String,
    pub public_inputs: Vec<String>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub is_valid: bool,
    pub verifier_address: String,
    pub reason: Option<String>,
}

pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequestDto>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let proof = from_hex0x(&body.proof)
        .map_err(|_| EngineError::BadRequest("proof must be 0x-prefixed hex".into()))?;
    let mut public_inputs = Vec::with_capacity(body.public_inputs.len());
    for input in &body.public_inputs {
        let bytes = from_hex0x(input)
            .map_err(|_| EngineError::BadRequest("public input must be 0x-prefixed hex".into()))?;
        if bytes.len() != 32 {
            return Err(ApiError(EngineError::BadRequest(
                "public input must be exactly 32 bytes".into(),
            )));
        }
        let mut word = [0u8; 32];
        word.copy_from_slice(&bytes);
        public_inputs.push(word);
    }

    let result = state
        .onchain
        .verify(VerifyRequest {
            circuit_id: body.circuit_id,
            chain_id: body.chain_id,
            proof,
            public_inputs,
        })
        .await
        .map_err(map_onchain_error)?;

    Ok(Json(VerifyResponse {
        is_valid: result.is_valid,
        verifier_address: result.verifier_address,
        reason: result.reason,
    }))
}

//! `/api/signing/*` — thin adapters over the signing half of the flow
//! coordinator (§6).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use proofport_flow::CreateFlowParams;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct CreateSigningRequest {
    pub scope: String,
    pub circuit_id: String,
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct CreateSigningResponse {
    pub request_id: String,
    pub signing_url: String,
    pub expires_at: i64,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateSigningRequest>,
) -> Result<Json<CreateSigningResponse>, ApiError> {
    let flow = state
        .flow
        .create(CreateFlowParams {
            scope: body.scope,
            circuit_id: body.circuit_id,
            address: body.address,
        })
        .await?;
    Ok(Json(CreateSigningResponse {
        request_id: flow.request_id.clone(),
        signing_url: format!("{}/s/{}", state.sign_page_url, flow.request_id),
        expires_at: flow.expires_at,
    }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<proofport_types::SigningRequest>, ApiError> {
    let request = state.flow.get_signing(&id).await?;
    Ok(Json(request))
}

#[derive(Deserialize)]
pub struct PrepareRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct PrepareResponse {
    pub signal_hash: String,
}

pub async fn prepare(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PrepareRequest>,
) -> Result<Json<PrepareResponse>, ApiError> {
    let signal_hash = state.flow.prepare(&id, &body.address).await?;
    Ok(Json(PrepareResponse { signal_hash }))
}

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub address: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub success: bool,
}

pub async fn callback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, ApiError> {
    state
        .flow
        .signing_callback(&id, &body.address, &body.signature)
        .await?;
    Ok(Json(CallbackResponse { success: true }))
}

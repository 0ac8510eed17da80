//! `/api/payment/*` — thin adapters over the payment half of the flow
//! coordinator (§6).

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use proofport_payment::{PriceDescriptor, TransferWithAuthorization};
use proofport_types::{Address, EngineError, PaymentAuthorization, UsdcDomain};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct UsdcDomainDto {
    pub address: String,
    pub name: String,
    pub version: String,
}

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: String,
    pub pay_to: String,
    pub chain_id: u64,
    pub usdc: UsdcDomainDto,
}

pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<Json<PaymentAuthorization>, ApiError> {
    let price = PriceDescriptor {
        amount: body.amount,
        pay_to: Address::new(body.pay_to),
        chain_id: body.chain_id,
        usdc: UsdcDomain {
            address: Address::new(body.usdc.address),
            name: body.usdc.name,
            version: body.usdc.version,
        },
    };
    let auth = state.flow.payment_create(&id, price).await?;
    Ok(Json(auth))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentAuthorization>, ApiError> {
    let auth = state.flow.get_payment(&id).await?;
    Ok(Json(auth))
}

#[derive(Deserialize)]
pub struct SubmitPaymentRequest {
    pub from: String,
    pub to: String,
    pub value: u128,
    pub valid_after: i64,
    pub valid_before: i64,
    /// 32-byte nonce, `0x`-prefixed hex.
    pub nonce: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct SubmitPaymentResponse {
    pub tx_hash: Option<String>,
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitPaymentRequest>,
) -> Result<Json<SubmitPaymentResponse>, ApiError> {
    let nonce_bytes = hex::decode(body.nonce.trim_start_matches("0x"))
        .map_err(|_| ApiError(EngineError::BadRequest("nonce must be 32-byte hex".into())))?;
    if nonce_bytes.len() != 32 {
        return Err(ApiError(EngineError::BadRequest(
            "nonce must be exactly 32 bytes".into(),
        )));
    }
    let mut nonce = [0u8; 32];
    nonce.copy_from_slice(&nonce_bytes);

    let authorization = TransferWithAuthorization {
        from: Address::new(body.from),
        to: Address::new(body.to),
        value: body.value,
        valid_after: body.valid_after,
        valid_before: body.valid_before,
        nonce,
    };
    let flow = state
        .flow
        .payment_submit(&id, &authorization, &body.signature)
        .await?;
    Ok(Json(SubmitPaymentResponse {
        tx_hash: flow.payment.and_then(|p| p.tx_hash),
    }))
}

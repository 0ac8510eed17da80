//! # Payment Settler
//!
//! The interface to an external facilitator, left abstract in the
//! source material; `Settler` is the chosen shape (§9 Open Question b).
//! Two adapters: `HttpFacilitator` for production, `NoopSettler` for
//! payment-disabled mode and tests.

use crate::eip712::TransferWithAuthorization;
use async_trait::async_trait;
use proofport_types::UsdcDomain;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettleError {
    #[error("facilitator reported failure: {0}")]
    Failed(String),

    /// No verdict within the timeout; the caller keeps the Flow in
    /// `payment` and may retry — settlement is idempotent on `nonce`.
    #[error("facilitator timed out")]
    Timeout,

    #[error("facilitator transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct SettleRequest<'a> {
    pub domain: &'a UsdcDomain,
    pub chain_id: u64,
    pub authorization: &'a TransferWithAuthorization,
    pub signature: &'a str,
}

#[async_trait]
pub trait Settler: Send + Sync {
    async fn settle(&self, request: SettleRequest<'_>) -> Result<String, SettleError>;
}

/// Calls an external HTTP facilitator that submits the authorization
/// on-chain and reports back the landed transaction hash.
pub struct HttpFacilitator {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFacilitator {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }
}

#[derive(serde::Serialize)]
struct SettleBody<'a> {
    chain_id: u64,
    usdc_address: &'a str,
    from: &'a str,
    to: &'a str,
    value: u128,
    valid_after: i64,
    valid_before: i64,
    nonce: String,
    signature: &'a str,
}

#[derive(serde::Deserialize)]
struct SettleResponse {
    tx_hash: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl Settler for HttpFacilitator {
    async fn settle(&self, request: SettleRequest<'_>) -> Result<String, SettleError> {
        let body = SettleBody {
            chain_id: request.chain_id,
            usdc_address: request.domain.address.as_str(),
            from: request.authorization.from.as_str(),
            to: request.authorization.to.as_str(),
            value: request.authorization.value,
            valid_after: request.authorization.valid_after,
            valid_before: request.authorization.valid_before,
            nonce: proofport_crypto::to_hex0x(&request.authorization.nonce),
            signature: request.signature,
        };

        let response = self
            .client
            .post(format!("{}/settle", self.base_url))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SettleError::Timeout
                } else {
                    SettleError::Transport(err.to_string())
                }
            })?;

        let parsed: SettleResponse = response
            .json()
            .await
            .map_err(|err| SettleError::Transport(err.to_string()))?;

        match (parsed.tx_hash, parsed.error) {
            (Some(tx_hash), _) => Ok(tx_hash),
            (None, Some(reason)) => Err(SettleError::Failed(reason)),
            (None, None) => Err(SettleError::Failed("no tx_hash or error in response".into())),
        }
    }
}

/// Used only when payment is globally disabled; never invoked on the
/// enabled path.
pub struct NoopSettler;

#[async_trait]
impl Settler for NoopSettler {
    async fn settle(&self, _request: SettleRequest<'_>) -> Result<String, SettleError> {
        Err(SettleError::Failed("payment is disabled".into()))
    }
}

//! # Payment Rendezvous (C5)
//!
//! Creates short-lived payment authorizations, validates EIP-712
//! `TransferWithAuthorization` signatures, delegates settlement to an
//! abstract facilitator, and records receipts. Bound to exactly one
//! `requestId`; owned by this component until `completed`/`failed`.

mod eip712;
mod errors;
mod settler;

pub use eip712::{typed_data_digest, TransferWithAuthorization};
pub use errors::PaymentError;
pub use settler::{HttpFacilitator, NoopSettler, SettleError, SettleRequest, Settler};

use proofport_crypto::recover_address;
use proofport_kv::KvStore;
use proofport_types::{Address, PaymentAuthorization, PaymentStatus, UsdcDomain};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn payment_key(request_id: &str) -> String {
    format!("payment:{request_id}")
}

fn status_set_key(status: PaymentStatus) -> String {
    let name = match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Completed => "settled",
        PaymentStatus::Failed => "failed",
        PaymentStatus::Expired => "expired",
    };
    format!("payment:status:{name}")
}

fn nonce_set_key(usdc_address: &str, from: &str) -> String {
    format!("payment:nonces:{usdc_address}:{from}")
}

/// Per-circuit price, resolved by the caller before invoking `create`.
#[derive(Debug, Clone)]
pub struct PriceDescriptor {
    pub amount: String,
    pub pay_to: Address,
    pub chain_id: u64,
    pub usdc: UsdcDomain,
}

pub struct PaymentRendezvous {
    store: Arc<dyn KvStore>,
    settler: Arc<dyn Settler>,
    ttl: Duration,
}

impl PaymentRendezvous {
    pub fn new(store: Arc<dyn KvStore>, settler: Arc<dyn Settler>, ttl: Duration) -> Self {
        Self {
            store,
            settler,
            ttl,
        }
    }

    async fn load(&self, request_id: &str) -> Result<PaymentAuthorization, PaymentError> {
        let raw = self
            .store
            .get(&payment_key(request_id))
            .await?
            .ok_or(PaymentError::NotFound)?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, auth: &PaymentAuthorization) -> Result<(), PaymentError> {
        let raw = serde_json::to_string(auth)?;
        self.store
            .set(&payment_key(&auth.request_id), &raw, Some(self.ttl))
            .await?;
        self.store.sadd(&status_set_key(auth.status), &auth.request_id).await?;
        Ok(())
    }

    pub async fn create(
        &self,
        request_id: String,
        circuit_id: String,
        scope: String,
        price: PriceDescriptor,
    ) -> Result<PaymentAuthorization, PaymentError> {
        let created_at = now();
        let auth = PaymentAuthorization {
            request_id,
            circuit_id,
            scope,
            amount: price.amount,
            pay_to: price.pay_to,
            chain_id: price.chain_id,
            usdc: price.usdc,
            status: PaymentStatus::Pending,
            tx_hash: None,
            reserved_nonce: None,
            created_at,
            expires_at: created_at + self.ttl.as_secs() as i64,
        };
        self.save(&auth).await?;
        Ok(auth)
    }

    pub async fn get(&self, request_id: &str) -> Result<PaymentAuthorization, PaymentError> {
        let mut auth = self.load(request_id).await?;
        if now() > auth.expires_at && auth.status == PaymentStatus::Pending {
            auth.status = PaymentStatus::Expired;
            self.save(&auth).await?;
        }
        Ok(auth)
    }

    /// Runs the five validations from §4.5, then delegates settlement.
    pub async fn submit(
        &self,
        request_id: &str,
        authorization: &TransferWithAuthorization,
        signature: &str,
    ) -> Result<PaymentAuthorization, PaymentError> {
        let mut stored = self.load(request_id).await?;
        if now() > stored.expires_at {
            return Err(PaymentError::Expired);
        }
        if stored.status != PaymentStatus::Pending {
            return Err(PaymentError::Conflict("payment not pending".into()));
        }

        // 1. to == configured pay-to address.
        if !authorization
            .to
            .as_str()
            .eq_ignore_ascii_case(stored.pay_to.as_str())
        {
            return Err(PaymentError::BadRequest("recipient mismatch".into()));
        }

        // 2. value == stored amount, exact equality.
        let expected_amount: u128 = stored
            .amount
            .parse()
            .map_err(|_| PaymentError::BadRequest("malformed stored amount".into()))?;
        if authorization.value != expected_amount {
            return Err(PaymentError::BadRequest("amount mismatch".into()));
        }

        // 3. validAfter <= now <= validBefore.
        let current = now();
        if !(authorization.valid_after <= current && current <= authorization.valid_before) {
            return Err(PaymentError::BadRequest("authorization not currently valid".into()));
        }

        // 4. nonce unused for this (from, contract) pair. A nonce this same
        // pending payment already reserved (e.g. a retry after the
        // facilitator timed out on a prior attempt) passes through rather
        // than colliding with its own reservation.
        let nonce_key = nonce_set_key(stored.usdc.address.as_str(), authorization.from.as_str());
        let nonce_hex = proofport_crypto::to_hex0x(&authorization.nonce);
        let already_reserved_by_us = stored.reserved_nonce.as_deref() == Some(nonce_hex.as_str());
        if !already_reserved_by_us {
            if !self.store.sadd(&nonce_key, &nonce_hex).await? {
                return Err(PaymentError::Conflict("nonce already used".into()));
            }
            stored.reserved_nonce = Some(nonce_hex.clone());
            self.save(&stored).await?;
        }

        // 5. signature recovers to authorization.from.
        let digest = typed_data_digest(&stored.usdc, stored.chain_id, authorization);
        let sig_bytes = proofport_crypto::from_hex0x(signature)
            .map_err(|_| PaymentError::BadRequest("malformed signature".into()))?;
        let recovered = recover_address(&digest, &sig_bytes)?;
        if !recovered.eq_ignore_ascii_case(authorization.from.as_str()) {
            self.store.srem(&nonce_key, &nonce_hex).await?;
            stored.reserved_nonce = None;
            self.save(&stored).await?;
            return Err(PaymentError::BadRequest("signature does not recover to from".into()));
        }

        match self
            .settler
            .settle(SettleRequest {
                domain: &stored.usdc,
                chain_id: stored.chain_id,
                authorization,
                signature,
            })
            .await
        {
            Ok(tx_hash) => {
                stored.status = PaymentStatus::Completed;
                stored.tx_hash = Some(tx_hash);
                self.save(&stored).await?;
                Ok(stored)
            }
            Err(SettleError::Timeout) => {
                // No verdict: stay in `payment`. `reserved_nonce` is already
                // saved above, so a retry with the same authorization
                // re-enters this function, recognizes its own reservation,
                // and re-attempts settlement instead of hitting "nonce
                // already used".
                Err(PaymentError::Upstream("facilitator timed out".into()))
            }
            Err(SettleError::Failed(reason)) => {
                stored.status = PaymentStatus::Failed;
                self.save(&stored).await?;
                Err(PaymentError::Conflict(format!("settlement failed: {reason}")))
            }
            Err(SettleError::Transport(reason)) => Err(PaymentError::Upstream(reason)),
        }
    }
}

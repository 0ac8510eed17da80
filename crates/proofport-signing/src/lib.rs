//! # Signing Rendezvous (C4)
//!
//! Creates short-lived signing requests, accepts a signature callback
//! out-of-band (the browser, after wallet connect), and lets a caller
//! wait for completion. A `SigningRequest` is owned by this component
//! until it transitions to `completed`; after that the Flow Coordinator
//! only reads it.

mod errors;

pub use errors::SigningError;

use proofport_crypto::{keccak256, recover_address};
use proofport_kv::KvStore;
use proofport_types::{SigningRequest, SigningStatus};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const MAX_CALLBACK_ATTEMPTS: i64 = 5;
const ATTEMPTS_WINDOW: Duration = Duration::from_secs(300);

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn request_key(id: &str) -> String {
    format!("signing:{id}")
}

fn attempts_key(id: &str) -> String {
    format!("signing:attempts:{id}")
}

/// `signalHash = keccak256(UTF8("zkproofport" ":" scope ":" lower(address)))`.
///
/// The exact scheme varies subtly in the source between the MCP path and
/// the web signing path; this is the one canonical construction every
/// caller of this crate uses, per circuit family.
pub fn compute_signal_hash(scope: &str, address: &str) -> String {
    let payload = format!("zkproofport:{scope}:{}", address.to_lowercase());
    proofport_crypto::to_hex0x(&keccak256(payload.as_bytes()))
}

pub struct SigningRendezvous {
    store: Arc<dyn KvStore>,
    ttl: Duration,
    sign_page_url: String,
}

pub struct CreatedSigningRequest {
    pub request: SigningRequest,
    pub signing_url: String,
}

impl SigningRendezvous {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration, sign_page_url: String) -> Self {
        Self {
            store,
            ttl,
            sign_page_url,
        }
    }

    async fn load(&self, request_id: &str) -> Result<SigningRequest, SigningError> {
        let raw = self
            .store
            .get(&request_key(request_id))
            .await?
            .ok_or(SigningError::NotFound)?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, request: &SigningRequest) -> Result<(), SigningError> {
        let raw = serde_json::to_string(request)?;
        self.store
            .set(&request_key(&request.id), &raw, Some(self.ttl))
            .await?;
        Ok(())
    }

    fn expired(request: &SigningRequest) -> bool {
        now() > request.expires_at
    }

    pub async fn create(
        &self,
        scope: String,
        circuit_id: String,
        address: Option<String>,
    ) -> Result<CreatedSigningRequest, SigningError> {
        let id = Uuid::new_v4().to_string();
        let created_at = now();
        let request = SigningRequest {
            id: id.clone(),
            address: address.map(proofport_types::Address::new),
            scope,
            circuit_id,
            signal_hash: None,
            status: SigningStatus::Pending,
            signature: None,
            created_at,
            expires_at: created_at + self.ttl.as_secs() as i64,
        };
        self.save(&request).await?;
        Ok(CreatedSigningRequest {
            signing_url: format!("{}/s/{}", self.sign_page_url, request.id),
            request,
        })
    }

    pub async fn get(&self, request_id: &str) -> Result<SigningRequest, SigningError> {
        let mut request = self.load(request_id).await?;
        if Self::expired(&request) && request.status == SigningStatus::Pending {
            request.status = SigningStatus::Expired;
            self.save(&request).await?;
        }
        Ok(request)
    }

    /// Binds `address` (first caller wins) and computes `signalHash`.
    /// Idempotent: repeat calls with the same address return the same hash.
    pub async fn prepare(
        &self,
        request_id: &str,
        address: &str,
    ) -> Result<String, SigningError> {
        let mut request = self.load(request_id).await?;
        if Self::expired(&request) {
            return Err(SigningError::Expired);
        }
        if request.status != SigningStatus::Pending {
            return Err(SigningError::Conflict("signing request not pending".into()));
        }
        match &request.address {
            Some(bound) if bound.as_str() != address.to_lowercase() => {
                return Err(SigningError::BadRequest("address mismatch".into()));
            }
            _ => {}
        }
        let signal_hash = compute_signal_hash(&request.scope, address);
        request.address = Some(proofport_types::Address::new(address));
        request.signal_hash = Some(signal_hash.clone());
        self.save(&request).await?;
        Ok(signal_hash)
    }

    /// Accepts the signature callback. Rejects a second successful
    /// callback (P5) and enforces the 5-attempts-per-300s budget.
    pub async fn callback(
        &self,
        request_id: &str,
        address: &str,
        signature: &str,
    ) -> Result<SigningRequest, SigningError> {
        let attempts = self.store.incr(&attempts_key(request_id)).await?;
        if attempts == 1 {
            self.store
                .expire(&attempts_key(request_id), ATTEMPTS_WINDOW)
                .await?;
        }
        if attempts > MAX_CALLBACK_ATTEMPTS {
            return Err(SigningError::Conflict("too many callback attempts".into()));
        }

        let mut request = self.load(request_id).await?;
        if Self::expired(&request) {
            return Err(SigningError::Expired);
        }
        if request.status != SigningStatus::Pending {
            return Err(SigningError::Conflict("signing request not pending".into()));
        }
        let signal_hash = request
            .signal_hash
            .as_ref()
            .ok_or_else(|| SigningError::Conflict("prepare not called".into()))?;
        if !address.eq_ignore_ascii_case(
            request
                .address
                .as_ref()
                .map(|a| a.as_str())
                .unwrap_or_default(),
        ) {
            return Err(SigningError::BadRequest("address mismatch".into()));
        }

        let digest = proofport_crypto::from_hex0x(signal_hash)
            .map_err(|_| SigningError::BadRequest("malformed signalHash".into()))?;
        let digest: [u8; 32] = digest
            .try_into()
            .map_err(|_| SigningError::BadRequest("malformed signalHash".into()))?;
        let sig_bytes = proofport_crypto::from_hex0x(signature)
            .map_err(|_| SigningError::BadRequest("malformed signature".into()))?;
        let recovered = recover_address(&digest, &sig_bytes)?;
        if !recovered.eq_ignore_ascii_case(address) {
            return Err(SigningError::BadRequest("signature does not match address".into()));
        }

        request.status = SigningStatus::Completed;
        request.signature = Some(signature.to_string());
        self.save(&request).await?;
        Ok(request)
    }

    /// Polls for completion with exponential-capped backoff, the
    /// restart-survivable fallback to a pub/sub subscription (owned by
    /// the Flow Coordinator once a Flow exists for this request).
    pub async fn wait(
        &self,
        request_id: &str,
        timeout: Duration,
    ) -> Result<SigningRequest, SigningError> {
        let deadline = std::time::Instant::now() + timeout;
        let mut backoff = Duration::from_millis(100);
        loop {
            let request = self.get(request_id).await?;
            if request.status != SigningStatus::Pending {
                return Ok(request);
            }
            if std::time::Instant::now() >= deadline {
                return Ok(request);
            }
            tokio::time::sleep(backoff.min(Duration::from_secs(2))).await;
            backoff *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofport_crypto::public_key_to_address;
    use proofport_kv::InMemoryKvStore;

    fn signer() -> (k256::ecdsa::SigningKey, String) {
        let key = k256::ecdsa::SigningKey::from_bytes(&[0x42u8; 32].into()).unwrap();
        let address = public_key_to_address(key.verifying_key());
        (key, address)
    }

    fn sign(key: &k256::ecdsa::SigningKey, digest: &[u8; 32]) -> String {
        use k256::ecdsa::{RecoveryId, Signature};
        let (sig, recid): (Signature, RecoveryId) = key.sign_prehash_recoverable(digest).unwrap();
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recid.to_byte());
        proofport_crypto::to_hex0x(&bytes)
    }

    async fn rendezvous() -> SigningRendezvous {
        SigningRendezvous::new(
            Arc::new(InMemoryKvStore::new()),
            Duration::from_secs(300),
            "http://localhost:3000".to_string(),
        )
    }

    #[tokio::test]
    async fn create_returns_signing_url() {
        let r = rendezvous().await;
        let created = r
            .create("demo.test".to_string(), "coinbase_attestation".to_string(), None)
            .await
            .unwrap();
        assert!(created.signing_url.contains(&created.request.id));
    }

    #[tokio::test]
    async fn prepare_then_callback_completes() {
        let r = rendezvous().await;
        let (key, address) = signer();
        let created = r
            .create("demo.test".to_string(), "coinbase_attestation".to_string(), None)
            .await
            .unwrap();
        let signal_hash = r.prepare(&created.request.id, &address).await.unwrap();

        let digest: [u8; 32] = proofport_crypto::from_hex0x(&signal_hash)
            .unwrap()
            .try_into()
            .unwrap();
        let signature = sign(&key, &digest);

        let completed = r
            .callback(&created.request.id, &address, &signature)
            .await
            .unwrap();
        assert_eq!(completed.status, SigningStatus::Completed);
    }

    #[tokio::test]
    async fn second_callback_is_conflict() {
        let r = rendezvous().await;
        let (key, address) = signer();
        let created = r
            .create("demo.test".to_string(), "c".to_string(), None)
            .await
            .unwrap();
        let signal_hash = r.prepare(&created.request.id, &address).await.unwrap();
        let digest: [u8; 32] = proofport_crypto::from_hex0x(&signal_hash)
            .unwrap()
            .try_into()
            .unwrap();
        let signature = sign(&key, &digest);
        r.callback(&created.request.id, &address, &signature)
            .await
            .unwrap();

        let second = r.callback(&created.request.id, &address, &signature).await;
        assert!(matches!(second, Err(SigningError::Conflict(_))));
    }

    #[tokio::test]
    async fn bad_signature_is_bad_request() {
        let r = rendezvous().await;
        let (_, address) = signer();
        let (other_key, _) = signer();
        let created = r
            .create("demo.test".to_string(), "c".to_string(), None)
            .await
            .unwrap();
        let signal_hash = r.prepare(&created.request.id, &address).await.unwrap();
        let digest: [u8; 32] = proofport_crypto::from_hex0x(&signal_hash)
            .unwrap()
            .try_into()
            .unwrap();
        let wrong_signature = sign(&other_key, &digest);

        let result = r
            .callback(&created.request.id, &address, &wrong_signature)
            .await;
        assert!(matches!(result, Err(SigningError::BadRequest(_))));
    }

    #[tokio::test]
    async fn sixth_attempt_is_conflict() {
        let r = rendezvous().await;
        let (_, address) = signer();
        let created = r
            .create("demo.test".to_string(), "c".to_string(), None)
            .await
            .unwrap();
        r.prepare(&created.request.id, &address).await.unwrap();
        for _ in 0..5 {
            let _ = r.callback(&created.request.id, &address, "0xdeadbeef").await;
        }
        let sixth = r.callback(&created.request.id, &address, "0xdeadbeef").await;
        assert!(matches!(sixth, Err(SigningError::Conflict(_))));
    }
}

//! # Flow Coordinator (C6) — core of the core
//!
//! The state machine tying a single `requestId` (which doubles as the
//! `flowId` — the data model's invariant that each `requestId` maps to
//! at most one `Flow` makes them the same key) through
//! `signing → payment → ready → proving → done/failed/expired`,
//! publishing a full snapshot on every transition.

pub mod errors;
pub mod lock;

use errors::{
    map_attest_error, map_cache_error, map_payment_error, map_prove_error, map_publish_error,
    map_result_error, map_signing_error, map_store_error,
};
use lock::{LockOutcome, ProveLock};
use proofport_attest::Attester;
use proofport_bus::{EventPublisher, EventSubscriber, FlowEvent};
use proofport_fingerprint::{fingerprint, FingerprintInputs, ProofCache};
use proofport_kv::KvStore;
use proofport_payment::{PaymentRendezvous, PriceDescriptor, TransferWithAuthorization};
use proofport_prover::ProverInvoker;
use proofport_ratelimit::RateLimiter;
use proofport_result::ResultStore;
use proofport_signing::SigningRendezvous;
use proofport_types::config::PaymentMode;
use proofport_types::{
    Address, EngineError, Flow, FlowPhase, PaymentAuthorization, PaymentSummary, ProofRef,
    ProofResult, ProveParams, SigningRequest, SigningSummary,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn flow_key(flow_id: &str) -> String {
    format!("flow:{flow_id}")
}

/// Circuit-specific public inputs forwarded at `generate_proof` time
/// rather than persisted on the `Flow` — the data model (§3) doesn't
/// carry them on `Flow` or `SigningRequest`, so the caller (the HTTP
/// surface) supplies them fresh with each idempotent `generate` call.
#[derive(Debug, Clone, Default)]
pub struct ProveExtras {
    pub country_list: Option<Vec<String>>,
    pub is_included: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateFlowParams {
    pub scope: String,
    pub circuit_id: String,
    pub address: Option<String>,
}

pub struct FlowCoordinator {
    store: Arc<dyn KvStore>,
    signing: SigningRendezvous,
    payment: PaymentRendezvous,
    rate_limiter: RateLimiter,
    cache: ProofCache,
    results: ResultStore,
    prover: Arc<dyn ProverInvoker>,
    attester: Attester,
    publisher: EventPublisher,
    subscriber: EventSubscriber,
    lock: ProveLock,
    payment_mode: PaymentMode,
    max_flow_ttl: Duration,
    prove_timeout: Duration,
}

impl FlowCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn KvStore>,
        signing: SigningRendezvous,
        payment: PaymentRendezvous,
        rate_limiter: RateLimiter,
        cache: ProofCache,
        results: ResultStore,
        prover: Arc<dyn ProverInvoker>,
        attester: Attester,
        payment_mode: PaymentMode,
        max_flow_ttl: Duration,
        prove_timeout: Duration,
    ) -> Self {
        Self {
            publisher: EventPublisher::new(store.clone()),
            subscriber: EventSubscriber::new(store.clone()),
            lock: ProveLock::new(store.clone()),
            store,
            signing,
            payment,
            rate_limiter,
            cache,
            results,
            prover,
            attester,
            payment_mode,
            max_flow_ttl,
            prove_timeout,
        }
    }

    async fn load_flow(&self, flow_id: &str) -> Result<Flow, EngineError> {
        let raw = self
            .store
            .get(&flow_key(flow_id))
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| EngineError::NotFound("flow not found".into()))?;
        serde_json::from_str(&raw).map_err(|e| EngineError::UpstreamError(e.to_string()))
    }

    async fn save_and_publish(&self, flow: &Flow) -> Result<(), EngineError> {
        let raw = serde_json::to_string(flow).map_err(|e| EngineError::UpstreamError(e.to_string()))?;
        let ttl = Duration::from_secs((flow.expires_at - flow.created_at).max(0) as u64);
        self.store
            .set(&flow_key(&flow.flow_id), &raw, Some(ttl))
            .await
            .map_err(map_store_error)?;
        self.publisher
            .publish(&FlowEvent::new(flow.flow_id.clone(), flow.phase, flow.updated_at))
            .await
            .map_err(map_publish_error)?;
        Ok(())
    }

    /// Transitions to `expired` if `now > expires_at` and the phase is
    /// not already terminal. Returns the (possibly updated) flow.
    async fn apply_expiry(&self, mut flow: Flow) -> Result<Flow, EngineError> {
        if flow.has_expired(now()) && !matches!(flow.phase, FlowPhase::Done | FlowPhase::Failed | FlowPhase::Expired) {
            flow.phase = FlowPhase::Expired;
            flow.updated_at = now();
            self.save_and_publish(&flow).await?;
        }
        Ok(flow)
    }

    /// `create({scope, circuitId, address?})`. Consults the rate limiter
    /// when an address is already known; the fingerprint/cache check is
    /// deferred to `generate_proof`, which is the only place a cache hit
    /// is allowed to skip C7 (§4.6).
    pub async fn create(&self, params: CreateFlowParams) -> Result<Flow, EngineError> {
        if let Some(address) = &params.address {
            let decision = self
                .rate_limiter
                .check(address)
                .await
                .map_err(map_store_error)?;
            if !decision.allowed {
                return Err(EngineError::RateLimited {
                    retry_after_secs: decision.retry_after_secs,
                });
            }
        }

        let created = self
            .signing
            .create(params.scope.clone(), params.circuit_id.clone(), params.address.clone())
            .await
            .map_err(map_signing_error)?;

        let created_at = now();
        let max_ttl_expiry = created_at + self.max_flow_ttl.as_secs() as i64;
        let flow = Flow {
            flow_id: created.request.id.clone(),
            request_id: created.request.id.clone(),
            circuit_id: params.circuit_id,
            scope: params.scope,
            phase: FlowPhase::Signing,
            signing: SigningSummary {
                request_id: created.request.id.clone(),
                status: created.request.status,
                address: created.request.address.clone(),
            },
            payment: None,
            result: None,
            error: None,
            created_at,
            updated_at: created_at,
            expires_at: created.request.expires_at.min(max_ttl_expiry),
        };
        self.save_and_publish(&flow).await?;
        Ok(flow)
    }

    pub async fn get_flow(&self, flow_id: &str) -> Result<Flow, EngineError> {
        let flow = self.load_flow(flow_id).await?;
        self.apply_expiry(flow).await
    }

    pub async fn get_signing(&self, flow_id: &str) -> Result<SigningRequest, EngineError> {
        self.signing.get(flow_id).await.map_err(map_signing_error)
    }

    pub async fn get_payment(&self, flow_id: &str) -> Result<PaymentAuthorization, EngineError> {
        self.payment.get(flow_id).await.map_err(map_payment_error)
    }

    /// `prepare(flowId, address)`: binds the address to the signing
    /// request and mirrors it into the Flow snapshot.
    pub async fn prepare(&self, flow_id: &str, address: &str) -> Result<String, EngineError> {
        let flow = self.get_flow(flow_id).await?;
        if flow.has_expired(now()) {
            return Err(EngineError::Expired);
        }
        let signal_hash = self
            .signing
            .prepare(flow_id, address)
            .await
            .map_err(map_signing_error)?;

        let mut flow = flow;
        flow.signing.address = Some(Address::new(address));
        flow.updated_at = now();
        self.save_and_publish(&flow).await?;
        Ok(signal_hash)
    }

    /// Submits the signature callback and, on success, advances the Flow
    /// to `payment` (or straight to `ready` when payment is disabled).
    pub async fn signing_callback(
        &self,
        flow_id: &str,
        address: &str,
        signature: &str,
    ) -> Result<Flow, EngineError> {
        let flow = self.get_flow(flow_id).await?;
        if flow.has_expired(now()) {
            return Err(EngineError::Expired);
        }

        let completed = self
            .signing
            .callback(flow_id, address, signature)
            .await
            .map_err(map_signing_error)?;

        let mut flow = flow;
        flow.signing.status = completed.status;
        flow.signing.address = completed.address.clone();
        flow.phase = match self.payment_mode {
            PaymentMode::Enabled => FlowPhase::Payment,
            PaymentMode::Disabled => FlowPhase::Ready,
        };
        flow.updated_at = now();
        self.save_and_publish(&flow).await?;
        Ok(flow)
    }

    pub async fn payment_create(
        &self,
        flow_id: &str,
        price: PriceDescriptor,
    ) -> Result<PaymentAuthorization, EngineError> {
        let flow = self.get_flow(flow_id).await?;
        if flow.phase != FlowPhase::Payment {
            return Err(EngineError::Conflict("flow is not awaiting payment".into()));
        }
        self.payment
            .create(flow_id.to_string(), flow.circuit_id.clone(), flow.scope.clone(), price)
            .await
            .map_err(map_payment_error)
    }

    /// Submits the signed EIP-712 authorization. On settlement the Flow
    /// advances to `ready`; a facilitator timeout leaves it in `payment`
    /// (the client may retry, idempotent on `nonce`); a definite failure
    /// moves the Flow to `failed`.
    pub async fn payment_submit(
        &self,
        flow_id: &str,
        authorization: &TransferWithAuthorization,
        signature: &str,
    ) -> Result<Flow, EngineError> {
        let flow = self.get_flow(flow_id).await?;
        if flow.has_expired(now()) {
            return Err(EngineError::Expired);
        }

        match self.payment.submit(flow_id, authorization, signature).await {
            Ok(auth) => {
                let mut flow = flow;
                flow.payment = Some(PaymentSummary {
                    status: auth.status,
                    tx_hash: auth.tx_hash.clone(),
                });
                flow.phase = FlowPhase::Ready;
                flow.updated_at = now();
                self.save_and_publish(&flow).await?;
                Ok(flow)
            }
            Err(proofport_payment::PaymentError::Upstream(reason)) => {
                // Stays in `payment`; record the detail but don't move phase.
                let mut flow = flow;
                flow.error = Some(reason.clone());
                flow.updated_at = now();
                self.save_and_publish(&flow).await?;
                Err(EngineError::UpstreamError(reason))
            }
            Err(err @ proofport_payment::PaymentError::Conflict(_)) => {
                // A retry of the same authorization after a facilitator
                // timeout recognizes its own nonce reservation and never
                // reaches here (see `PaymentRendezvous::submit`). What's
                // left is a genuine terminal conflict: the nonce was
                // already spent by a different payment, or settlement
                // itself reported failure — both are correctly terminal.
                let failed = err.to_string();
                let mut flow = flow;
                flow.phase = FlowPhase::Failed;
                flow.error = Some(failed.clone());
                flow.updated_at = now();
                self.save_and_publish(&flow).await?;
                Err(EngineError::Conflict(failed))
            }
            Err(err) => Err(map_payment_error(err)),
        }
    }

    /// `generate_proof`: the idempotent trigger for steps 4.6's
    /// "begin_prove" transition and the proving pipeline that follows
    /// it. Safe to call repeatedly; each call either advances the Flow,
    /// returns its current terminal state, or waits on whichever Flow
    /// holds the per-fingerprint lock.
    pub async fn generate_proof(
        &self,
        flow_id: &str,
        extras: ProveExtras,
    ) -> Result<Flow, EngineError> {
        let flow = self.get_flow(flow_id).await?;
        if flow.has_expired(now()) {
            return Err(EngineError::Expired);
        }
        match flow.phase {
            FlowPhase::Done | FlowPhase::Failed => return Ok(flow),
            FlowPhase::Ready | FlowPhase::Proving => {}
            _ => return Err(EngineError::Conflict("flow is not ready to prove".into())),
        }

        let address = flow
            .signing
            .address
            .as_ref()
            .ok_or_else(|| EngineError::Conflict("signing address not bound".into()))?
            .clone();
        let fp = fingerprint(&FingerprintInputs {
            circuit_id: flow.circuit_id.clone(),
            address: address.as_str().to_string(),
            scope: flow.scope.clone(),
            country_list: extras.country_list.clone(),
            is_included: extras.is_included,
        });

        let outcome = self
            .lock
            .try_acquire(&fp, flow_id, self.prove_timeout)
            .await
            .map_err(map_store_error)?;

        match outcome {
            LockOutcome::Acquired => self.run_proving_pipeline(flow, fp, address, extras).await,
            LockOutcome::HeldBy(winner_flow_id) => self.mirror_winner(flow, &winner_flow_id).await,
        }
    }

    async fn run_proving_pipeline(
        &self,
        mut flow: Flow,
        fingerprint: String,
        address: Address,
        extras: ProveExtras,
    ) -> Result<Flow, EngineError> {
        flow.phase = FlowPhase::Proving;
        flow.updated_at = now();
        self.save_and_publish(&flow).await?;

        let outcome = self
            .prove_and_store(&flow, &fingerprint, &address, &extras)
            .await;

        match outcome {
            Ok(proof_id) => {
                flow.phase = FlowPhase::Done;
                flow.result = Some(ProofRef {
                    proof_id,
                    fingerprint: fingerprint.clone(),
                });
                flow.updated_at = now();
                // Happens-before: write the result, *then* release the lock.
                self.save_and_publish(&flow).await?;
                let _ = self.lock.release(&fingerprint).await;
                Ok(flow)
            }
            Err(err) => {
                flow.phase = FlowPhase::Failed;
                flow.error = Some(err.to_string());
                flow.updated_at = now();
                self.save_and_publish(&flow).await?;
                let _ = self.lock.release(&fingerprint).await;
                Err(err)
            }
        }
    }

    async fn prove_and_store(
        &self,
        flow: &Flow,
        fingerprint: &str,
        address: &Address,
        extras: &ProveExtras,
    ) -> Result<String, EngineError> {
        if let Some(cached) = self
            .cache
            .get(&flow.circuit_id, fingerprint)
            .await
            .map_err(map_cache_error)?
        {
            return self.results.store(cached).await.map_err(map_result_error);
        }

        let signing_request = self.signing.get(&flow.request_id).await.map_err(map_signing_error)?;
        let signal_hash = signing_request
            .signal_hash
            .clone()
            .ok_or_else(|| EngineError::ConfigError("signing request missing signalHash".into()))?;
        let signature = signing_request
            .signature
            .clone()
            .ok_or_else(|| EngineError::ConfigError("signing request missing signature".into()))?;

        let params = ProveParams {
            circuit_id: flow.circuit_id.clone(),
            address: address.clone(),
            scope: flow.scope.clone(),
            signal_hash: signal_hash.clone(),
            signature,
            country_list: extras.country_list.clone(),
            is_included: extras.is_included,
        };
        let output = self.prover.prove(&params).await.map_err(map_prove_error)?;

        let nullifier = output.public_inputs.first().cloned().unwrap_or_else(|| {
            proofport_crypto::to_hex0x(&proofport_crypto::keccak256(
                format!("{fingerprint}:{signal_hash}").as_bytes(),
            ))
        });

        let proof_bytes = proofport_crypto::from_hex0x(&output.proof).unwrap_or_default();
        let proof_hash = proofport_crypto::to_hex0x(&proofport_crypto::keccak256(&proof_bytes));
        let attestation = match self.attester.generate(&proof_hash, None, now()) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %map_attest_error(err), "attestation generation failed, omitting");
                None
            }
        };

        let result = ProofResult {
            proof_id: String::new(),
            circuit_id: flow.circuit_id.clone(),
            fingerprint: fingerprint.to_string(),
            proof: output.proof,
            public_inputs: output.public_inputs,
            nullifier,
            signal_hash,
            attestation,
            created_at: now(),
        };

        self.cache
            .set(&flow.circuit_id, fingerprint, &result)
            .await
            .map_err(map_cache_error)?;
        self.results.store(result).await.map_err(map_result_error)
    }

    /// The losing side of a `begin_prove` race: subscribes to the
    /// winner's channel (falling back to polling if the subscription
    /// never delivers within the prove timeout) and mirrors its outcome.
    async fn mirror_winner(&self, mut flow: Flow, winner_flow_id: &str) -> Result<Flow, EngineError> {
        // If winner_flow_id == flow.flow_id we're waiting on our own
        // earlier in-flight call; the wait below handles that uniformly.
        let deadline = self.prove_timeout + Duration::from_secs(5);
        let winner = self
            .wait_for_terminal(winner_flow_id, deadline)
            .await
            .unwrap_or(None);

        let winner = match winner {
            Some(winner) => winner,
            None => return self.get_flow(&flow.flow_id).await,
        };

        match winner.phase {
            FlowPhase::Done => {
                flow.phase = FlowPhase::Done;
                flow.result = winner.result.clone();
            }
            FlowPhase::Failed => {
                flow.phase = FlowPhase::Failed;
                flow.error = winner.error.clone();
            }
            _ => return self.get_flow(&flow.flow_id).await,
        }
        flow.updated_at = now();
        self.save_and_publish(&flow).await?;
        Ok(flow)
    }

    async fn wait_for_terminal(&self, flow_id: &str, timeout: Duration) -> Result<Option<Flow>, EngineError> {
        if let Ok(flow) = self.get_flow(flow_id).await {
            if matches!(flow.phase, FlowPhase::Done | FlowPhase::Failed) {
                return Ok(Some(flow));
            }
        }

        let mut stream = match self.subscriber.subscribe(flow_id).await {
            Ok(stream) => stream,
            Err(_) => return Ok(self.poll_for_terminal(flow_id, timeout).await),
        };

        let wait = async {
            while let Some(event) = stream.next().await {
                if matches!(event.phase, FlowPhase::Done | FlowPhase::Failed) {
                    return true;
                }
            }
            false
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(true) => self.get_flow(flow_id).await.map(Some),
            _ => Ok(self.poll_for_terminal(flow_id, Duration::from_millis(1)).await),
        }
    }

    async fn poll_for_terminal(&self, flow_id: &str, timeout: Duration) -> Option<Flow> {
        let deadline = std::time::Instant::now() + timeout;
        let mut backoff = Duration::from_millis(100);
        loop {
            if let Ok(flow) = self.get_flow(flow_id).await {
                if matches!(flow.phase, FlowPhase::Done | FlowPhase::Failed) {
                    return Some(flow);
                }
            }
            if std::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(backoff.min(Duration::from_secs(2))).await;
            backoff *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proofport_kv::InMemoryKvStore;
    use proofport_payment::NoopSettler;
    use proofport_prover::ProveError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProver {
        calls: AtomicUsize,
    }

    impl FakeProver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProverInvoker for FakeProver {
        async fn prove(&self, params: &ProveParams) -> Result<proofport_prover::ProveOutput, ProveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(proofport_prover::ProveOutput {
                proof: format!("0x{}", hex::encode(format!("proof-for-{}", params.address))),
                public_inputs: vec!["0xpublic1".to_string()],
            })
        }
    }

    fn signer() -> (k256::ecdsa::SigningKey, String) {
        let key = k256::ecdsa::SigningKey::from_bytes(&[0x77u8; 32].into()).unwrap();
        let address = proofport_crypto::public_key_to_address(key.verifying_key());
        (key, address)
    }

    fn sign_digest(key: &k256::ecdsa::SigningKey, digest: &[u8; 32]) -> String {
        use k256::ecdsa::{RecoveryId, Signature};
        let (sig, recid): (Signature, RecoveryId) = key.sign_prehash_recoverable(digest).unwrap();
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recid.to_byte());
        proofport_crypto::to_hex0x(&bytes)
    }

    fn coordinator(prover: Arc<dyn ProverInvoker>) -> FlowCoordinator {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        FlowCoordinator::new(
            store.clone(),
            SigningRendezvous::new(store.clone(), Duration::from_secs(300), "http://localhost:3000".into()),
            PaymentRendezvous::new(store.clone(), Arc::new(NoopSettler), Duration::from_secs(600)),
            RateLimiter::new(store.clone(), Duration::from_secs(60), 100),
            ProofCache::new(store.clone(), Duration::from_secs(3600)),
            ResultStore::new(store.clone(), Duration::from_secs(3600)),
            prover,
            Attester::Disabled,
            PaymentMode::Disabled,
            Duration::from_secs(3600),
            Duration::from_secs(5),
        )
    }

    async fn drive_to_ready(coordinator: &FlowCoordinator) -> (Flow, String) {
        let (key, address) = signer();
        let flow = coordinator
            .create(CreateFlowParams {
                scope: "demo.test".into(),
                circuit_id: "coinbase_attestation".into(),
                address: None,
            })
            .await
            .unwrap();

        let signal_hash = coordinator.prepare(&flow.flow_id, &address).await.unwrap();
        let digest: [u8; 32] = proofport_crypto::from_hex0x(&signal_hash).unwrap().try_into().unwrap();
        let signature = sign_digest(&key, &digest);
        let flow = coordinator
            .signing_callback(&flow.flow_id, &address, &signature)
            .await
            .unwrap();
        assert_eq!(flow.phase, FlowPhase::Ready);
        (flow, address)
    }

    #[tokio::test]
    async fn happy_path_generates_proof_end_to_end() {
        let prover = Arc::new(FakeProver::new());
        let coordinator = coordinator(prover.clone());
        let (flow, _address) = drive_to_ready(&coordinator).await;

        let done = coordinator
            .generate_proof(&flow.flow_id, ProveExtras::default())
            .await
            .unwrap();

        assert_eq!(done.phase, FlowPhase::Done);
        assert!(done.result.is_some());
        assert_eq!(prover.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_call_hits_cache_and_skips_the_prover() {
        let prover = Arc::new(FakeProver::new());
        let coordinator = coordinator(prover.clone());
        let (flow, address) = drive_to_ready(&coordinator).await;

        coordinator
            .generate_proof(&flow.flow_id, ProveExtras::default())
            .await
            .unwrap();
        assert_eq!(prover.calls.load(Ordering::SeqCst), 1);

        // A second flow for the same (circuitId, address, scope) shares the
        // fingerprint, so it must hit the cache rather than invoke C7 again.
        let (second, _) = {
            let flow = coordinator
                .create(CreateFlowParams {
                    scope: "demo.test".into(),
                    circuit_id: "coinbase_attestation".into(),
                    address: None,
                })
                .await
                .unwrap();
            let (key, _) = signer();
            let signal_hash = coordinator.prepare(&flow.flow_id, &address).await.unwrap();
            let digest: [u8; 32] = proofport_crypto::from_hex0x(&signal_hash).unwrap().try_into().unwrap();
            let signature = sign_digest(&key, &digest);
            let flow = coordinator
                .signing_callback(&flow.flow_id, &address, &signature)
                .await
                .unwrap();
            (flow, ())
        };

        let done = coordinator
            .generate_proof(&second.flow_id, ProveExtras::default())
            .await
            .unwrap();
        assert_eq!(done.phase, FlowPhase::Done);
        assert_eq!(prover.calls.load(Ordering::SeqCst), 1, "cache hit must not re-invoke the prover");
    }

    #[tokio::test]
    async fn repeated_generate_calls_are_idempotent_once_done() {
        let prover = Arc::new(FakeProver::new());
        let coordinator = coordinator(prover.clone());
        let (flow, _) = drive_to_ready(&coordinator).await;

        let first = coordinator
            .generate_proof(&flow.flow_id, ProveExtras::default())
            .await
            .unwrap();
        let second = coordinator
            .generate_proof(&flow.flow_id, ProveExtras::default())
            .await
            .unwrap();

        assert_eq!(first.result.as_ref().unwrap().proof_id, second.result.as_ref().unwrap().proof_id);
        assert_eq!(prover.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bad_signature_leaves_flow_in_signing_phase() {
        let prover = Arc::new(FakeProver::new());
        let coordinator = coordinator(prover);
        let (_, address) = signer();
        let flow = coordinator
            .create(CreateFlowParams {
                scope: "demo.test".into(),
                circuit_id: "coinbase_attestation".into(),
                address: None,
            })
            .await
            .unwrap();
        coordinator.prepare(&flow.flow_id, &address).await.unwrap();

        let result = coordinator
            .signing_callback(&flow.flow_id, &address, "0xdeadbeef")
            .await;
        assert!(result.is_err());

        let reloaded = coordinator.get_flow(&flow.flow_id).await.unwrap();
        assert_eq!(reloaded.phase, FlowPhase::Signing);
    }

    #[tokio::test]
    async fn expired_flow_generate_proof_is_rejected() {
        let prover = Arc::new(FakeProver::new());
        let coordinator = coordinator(prover);
        let (flow, _) = drive_to_ready(&coordinator).await;

        let mut stale = coordinator.get_flow(&flow.flow_id).await.unwrap();
        stale.expires_at = now() - 10;
        let raw = serde_json::to_string(&stale).unwrap();
        coordinator
            .store
            .set(&flow_key(&stale.flow_id), &raw, None)
            .await
            .unwrap();

        let result = coordinator.generate_proof(&flow.flow_id, ProveExtras::default()).await;
        assert!(matches!(result, Err(EngineError::Expired)));
    }

    #[tokio::test]
    async fn lock_race_second_caller_mirrors_the_winner() {
        let prover = Arc::new(FakeProver::new());
        let coordinator = coordinator(prover.clone());
        let (flow, address) = drive_to_ready(&coordinator).await;

        let fp = fingerprint(&FingerprintInputs {
            circuit_id: flow.circuit_id.clone(),
            address: Address::new(&address).as_str().to_string(),
            scope: flow.scope.clone(),
            country_list: None,
            is_included: None,
        });

        // Simulate a concurrent winner already holding the lock under a
        // different flowId, then resolve that flow to `done` before the
        // loser's wait times out.
        let other_flow_id = "winner-flow".to_string();
        coordinator
            .lock
            .try_acquire(&fp, &other_flow_id, Duration::from_secs(5))
            .await
            .unwrap();

        let mut winner_flow = flow.clone();
        winner_flow.flow_id = other_flow_id.clone();
        winner_flow.phase = FlowPhase::Done;
        winner_flow.result = Some(ProofRef {
            proof_id: "winner-proof".to_string(),
            fingerprint: fp.clone(),
        });
        let raw = serde_json::to_string(&winner_flow).unwrap();
        coordinator
            .store
            .set(&flow_key(&other_flow_id), &raw, None)
            .await
            .unwrap();

        let mirrored = coordinator
            .generate_proof(&flow.flow_id, ProveExtras::default())
            .await
            .unwrap();
        assert_eq!(mirrored.phase, FlowPhase::Done);
        assert_eq!(mirrored.result.unwrap().proof_id, "winner-proof");
        assert_eq!(prover.calls.load(Ordering::SeqCst), 0, "loser must never invoke the prover itself");
    }

    struct FakeSettler {
        outcomes: std::sync::Mutex<std::collections::VecDeque<Result<String, proofport_payment::SettleError>>>,
    }

    impl FakeSettler {
        fn once(outcome: Result<String, proofport_payment::SettleError>) -> Self {
            Self {
                outcomes: std::sync::Mutex::new(std::collections::VecDeque::from([outcome])),
            }
        }
    }

    #[async_trait]
    impl proofport_payment::Settler for FakeSettler {
        async fn settle(
            &self,
            _request: proofport_payment::SettleRequest<'_>,
        ) -> Result<String, proofport_payment::SettleError> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("0xdeadbeef".to_string()))
        }
    }

    fn coordinator_with_payment(
        prover: Arc<dyn ProverInvoker>,
        settler: Arc<dyn proofport_payment::Settler>,
    ) -> FlowCoordinator {
        let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        FlowCoordinator::new(
            store.clone(),
            SigningRendezvous::new(store.clone(), Duration::from_secs(300), "http://localhost:3000".into()),
            PaymentRendezvous::new(store.clone(), settler, Duration::from_secs(600)),
            RateLimiter::new(store.clone(), Duration::from_secs(60), 100),
            ProofCache::new(store.clone(), Duration::from_secs(3600)),
            ResultStore::new(store.clone(), Duration::from_secs(3600)),
            prover,
            Attester::Disabled,
            PaymentMode::Enabled,
            Duration::from_secs(3600),
            Duration::from_secs(5),
        )
    }

    async fn drive_to_payment(coordinator: &FlowCoordinator) -> (Flow, String) {
        let (key, address) = signer();
        let flow = coordinator
            .create(CreateFlowParams {
                scope: "demo.test".into(),
                circuit_id: "coinbase_attestation".into(),
                address: None,
            })
            .await
            .unwrap();

        let signal_hash = coordinator.prepare(&flow.flow_id, &address).await.unwrap();
        let digest: [u8; 32] = proofport_crypto::from_hex0x(&signal_hash).unwrap().try_into().unwrap();
        let signature = sign_digest(&key, &digest);
        let flow = coordinator
            .signing_callback(&flow.flow_id, &address, &signature)
            .await
            .unwrap();
        assert_eq!(flow.phase, FlowPhase::Payment);
        (flow, address)
    }

    #[tokio::test]
    async fn payment_retry_after_facilitator_timeout_reaches_ready() {
        let prover = Arc::new(FakeProver::new());
        let settler = Arc::new(FakeSettler::once(Err(proofport_payment::SettleError::Timeout)));
        let coordinator = coordinator_with_payment(prover, settler);
        let (flow, from) = drive_to_payment(&coordinator).await;

        let pay_to = Address::new("0x2222222222222222222222222222222222222222");
        let usdc = proofport_types::UsdcDomain {
            address: Address::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            name: "USD Coin".to_string(),
            version: "2".to_string(),
        };
        coordinator
            .payment_create(
                &flow.flow_id,
                PriceDescriptor {
                    amount: "100000".to_string(),
                    pay_to: pay_to.clone(),
                    chain_id: 8453,
                    usdc: usdc.clone(),
                },
            )
            .await
            .unwrap();

        let (signer_key, _) = signer();
        let from_address = Address::new(&from);
        let transfer = TransferWithAuthorization {
            from: from_address,
            to: pay_to,
            value: 100_000,
            valid_after: 0,
            valid_before: now() + 300,
            nonce: [5u8; 32],
        };
        let digest = proofport_payment::typed_data_digest(&usdc, 8453, &transfer);
        let signature = sign_digest(&signer_key, &digest);

        let first = coordinator.payment_submit(&flow.flow_id, &transfer, &signature).await;
        assert!(matches!(first, Err(EngineError::UpstreamError(_))));
        let still_pending = coordinator.get_flow(&flow.flow_id).await.unwrap();
        assert_eq!(still_pending.phase, FlowPhase::Payment);

        let second = coordinator
            .payment_submit(&flow.flow_id, &transfer, &signature)
            .await
            .unwrap();
        assert_eq!(second.phase, FlowPhase::Ready);
        assert_eq!(second.payment.unwrap().tx_hash.as_deref(), Some("0xdeadbeef"));
    }
}

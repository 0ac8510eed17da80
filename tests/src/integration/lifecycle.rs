//! End-to-end lifecycle scenarios, each wiring a fresh `FlowCoordinator`
//! against a shared `InMemoryKvStore` the way `node-runtime` wires it
//! against Redis.
//!
//! `proofport-flow`'s own test module already covers the single-component
//! slice of several scenarios from a fresh-store setup (cache hit skips
//! C7, a bad signature leaves the flow in `signing`, a simulated lock
//! race mirrors the winner) with `PaymentMode::Disabled` and
//! `Attester::Disabled` throughout. This module covers what only shows up
//! once payment settlement, a real concurrent race, and attestation are
//! actually exercised.

use k256::ecdsa::{RecoveryId, Signature, SigningKey};
use proofport_attest::{Attester, LocalAttester};
use proofport_crypto::public_key_to_address;
use proofport_fingerprint::ProofCache;
use proofport_flow::{CreateFlowParams, FlowCoordinator, ProveExtras};
use proofport_kv::{InMemoryKvStore, KvStore};
use proofport_payment::{
    NoopSettler, PaymentRendezvous, PriceDescriptor, SettleError, SettleRequest, Settler,
    TransferWithAuthorization,
};
use proofport_prover::{ProveError, ProveOutput, ProverInvoker};
use proofport_ratelimit::RateLimiter;
use proofport_result::ResultStore;
use proofport_signing::SigningRendezvous;
use proofport_types::config::PaymentMode;
use proofport_types::{Address, FlowPhase, ProveParams, UsdcDomain};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Counts invocations so the concurrent-race test can assert C7 ran
/// exactly once, and sleeps briefly so two concurrent callers actually
/// overlap inside the critical section.
struct CountingProver {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ProverInvoker for CountingProver {
    async fn prove(&self, _params: &ProveParams) -> Result<ProveOutput, ProveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(ProveOutput {
            proof: "0x1234".to_string(),
            public_inputs: vec!["0xaaaa".to_string()],
        })
    }
}

/// Reports the scenario's fixed settlement `txHash`.
struct FakeFacilitator;

#[async_trait::async_trait]
impl Settler for FakeFacilitator {
    async fn settle(&self, _request: SettleRequest<'_>) -> Result<String, SettleError> {
        Ok("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef".to_string())
    }
}

fn usdc_domain() -> UsdcDomain {
    UsdcDomain {
        address: Address::new("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        name: "USD Coin".to_string(),
        version: "2".to_string(),
    }
}

fn signer() -> (SigningKey, String) {
    let key = SigningKey::from_bytes(&[0x77u8; 32].into()).unwrap();
    let address = public_key_to_address(key.verifying_key());
    (key, address)
}

fn sign_digest(key: &SigningKey, digest: &[u8; 32]) -> String {
    let (sig, recid): (Signature, RecoveryId) = key.sign_prehash_recoverable(digest).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recid.to_byte());
    proofport_crypto::to_hex0x(&bytes)
}

#[allow(clippy::too_many_arguments)]
fn build_coordinator(
    store: Arc<dyn KvStore>,
    prover: Arc<dyn ProverInvoker>,
    settler: Arc<dyn Settler>,
    payment_mode: PaymentMode,
    attester: Attester,
    signing_ttl: Duration,
) -> FlowCoordinator {
    FlowCoordinator::new(
        store.clone(),
        SigningRendezvous::new(store.clone(), signing_ttl, "http://localhost:3000".to_string()),
        PaymentRendezvous::new(store.clone(), settler, Duration::from_secs(600)),
        RateLimiter::new(store.clone(), Duration::from_secs(60), 100),
        ProofCache::new(store.clone(), Duration::from_secs(3600)),
        ResultStore::new(store.clone(), Duration::from_secs(86400)),
        prover,
        attester,
        payment_mode,
        Duration::from_secs(3600),
        Duration::from_secs(5),
    )
}

/// Binds an address, fetches `signalHash`, and submits a valid
/// signature — the shared prefix of every scenario below.
async fn complete_signing(flow: &FlowCoordinator, flow_id: &str, key: &SigningKey, address: &str) {
    let signal_hash = flow.prepare(flow_id, address).await.unwrap();
    let digest: [u8; 32] = proofport_crypto::from_hex0x(&signal_hash).unwrap().try_into().unwrap();
    let signature = sign_digest(key, &digest);
    flow.signing_callback(flow_id, address, &signature).await.unwrap();
}

async fn create_flow(flow: &FlowCoordinator, scope: &str) -> proofport_types::Flow {
    flow.create(CreateFlowParams {
        scope: scope.to_string(),
        circuit_id: "coinbase_attestation".to_string(),
        address: None,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn happy_path_with_payment_settles_and_reaches_done() {
    let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let prover = Arc::new(CountingProver { calls: AtomicUsize::new(0) });
    let flow = build_coordinator(
        store,
        prover,
        Arc::new(FakeFacilitator),
        PaymentMode::Enabled,
        Attester::Disabled,
        Duration::from_secs(300),
    );

    let created = create_flow(&flow, "demo.test").await;
    assert_eq!(created.phase, FlowPhase::Signing);

    let (key, address) = signer();
    complete_signing(&flow, &created.flow_id, &key, &address).await;
    let after_signing = flow.get_flow(&created.flow_id).await.unwrap();
    assert_eq!(after_signing.phase, FlowPhase::Payment);

    let pay_to = Address::new("0x2222222222222222222222222222222222222222");
    let auth = flow
        .payment_create(
            &created.flow_id,
            PriceDescriptor {
                amount: "100000".to_string(),
                pay_to: pay_to.clone(),
                chain_id: 8453,
                usdc: usdc_domain(),
            },
        )
        .await
        .unwrap();

    let transfer = TransferWithAuthorization {
        from: Address::new(&address),
        to: pay_to,
        value: 100_000,
        valid_after: 0,
        valid_before: now() + 300,
        nonce: [3u8; 32],
    };
    let digest = proofport_payment::typed_data_digest(&usdc_domain(), auth.chain_id, &transfer);
    let signature = sign_digest(&key, &digest);

    let after_payment = flow.payment_submit(&created.flow_id, &transfer, &signature).await.unwrap();
    assert_eq!(after_payment.phase, FlowPhase::Ready);
    assert_eq!(
        after_payment.payment.as_ref().unwrap().tx_hash.as_deref(),
        Some("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef")
    );

    let done = flow.generate_proof(&created.flow_id, ProveExtras::default()).await.unwrap();
    assert_eq!(done.phase, FlowPhase::Done);
    assert!(done.result.is_some());
}

#[tokio::test]
async fn concurrent_generate_on_shared_fingerprint_proves_exactly_once() {
    let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let prover = Arc::new(CountingProver { calls: AtomicUsize::new(0) });
    let flow = Arc::new(build_coordinator(
        store,
        prover.clone(),
        Arc::new(NoopSettler),
        PaymentMode::Disabled,
        Attester::Disabled,
        Duration::from_secs(300),
    ));
    let (key, address) = signer();

    let mut flow_ids = Vec::new();
    for _ in 0..2 {
        let created = create_flow(&flow, "race.test").await;
        complete_signing(&flow, &created.flow_id, &key, &address).await;
        flow_ids.push(created.flow_id);
    }

    let (a, b) = tokio::join!(
        flow.generate_proof(&flow_ids[0], ProveExtras::default()),
        flow.generate_proof(&flow_ids[1], ProveExtras::default()),
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.phase, FlowPhase::Done);
    assert_eq!(b.phase, FlowPhase::Done);
    assert_eq!(a.result.as_ref().unwrap().fingerprint, b.result.as_ref().unwrap().fingerprint);
    assert_eq!(prover.calls.load(Ordering::SeqCst), 1, "only one concurrent caller may invoke the prover");
}

#[tokio::test]
async fn signing_flow_left_unsigned_past_its_ttl_reports_expired() {
    let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let prover = Arc::new(CountingProver { calls: AtomicUsize::new(0) });
    let flow = build_coordinator(
        store,
        prover,
        Arc::new(NoopSettler),
        PaymentMode::Disabled,
        Attester::Disabled,
        Duration::from_millis(50),
    );

    let created = create_flow(&flow, "demo.test").await;

    tokio::time::sleep(Duration::from_millis(150)).await;
    let observed = flow.get_flow(&created.flow_id).await.unwrap();
    assert_eq!(observed.phase, FlowPhase::Expired);
}

#[tokio::test]
async fn attestation_enabled_populates_envelope_on_the_stored_result() {
    let store: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let prover = Arc::new(CountingProver { calls: AtomicUsize::new(0) });
    let attester = Attester::Local(LocalAttester {
        signing_key: p384::ecdsa::SigningKey::from_bytes(&[0x42u8; 48].into()).unwrap(),
        module_id: "proofport-local-test".to_string(),
    });
    let flow = build_coordinator(
        store.clone(),
        prover,
        Arc::new(NoopSettler),
        PaymentMode::Disabled,
        attester,
        Duration::from_secs(300),
    );
    let (key, address) = signer();

    let created = create_flow(&flow, "demo.test").await;
    complete_signing(&flow, &created.flow_id, &key, &address).await;
    let done = flow.generate_proof(&created.flow_id, ProveExtras::default()).await.unwrap();
    assert_eq!(done.phase, FlowPhase::Done);

    let proof_id = done.result.unwrap().proof_id;
    let results = ResultStore::new(store, Duration::from_secs(86400));
    let stored = results.get(&proof_id).await.unwrap().unwrap();
    assert!(stored.attestation.is_some());
    assert_eq!(stored.attestation.unwrap().mode, proofport_types::TeeMode::Local);
}

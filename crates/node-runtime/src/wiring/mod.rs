//! # Subsystem Wiring
//!
//! Builds the twelve components in the dependency order laid out by
//! the lifecycle (C1 at the bottom, C2-C5 middle, C6 coordinating,
//! C7-C10 its collaborators, C11 a spawned background task, C12 the
//! HTTP edge) and hands back the handles `main` needs to serve
//! traffic and run the janitor.

use proofport_attest::Attester;
use proofport_bus::EventSubscriber;
use proofport_fingerprint::ProofCache;
use proofport_flow::FlowCoordinator;
use proofport_janitor::Janitor;
use proofport_kv::{InMemoryKvStore, KvStore, RedisKvStore};
use proofport_onchain::{JsonRpcVerifier, OnchainVerifier, VerifierRegistry};
use proofport_payment::{HttpFacilitator, NoopSettler, PaymentRendezvous, Settler};
use proofport_prover::ProcessProverInvoker;
use proofport_ratelimit::RateLimiter;
use proofport_result::ResultStore;
use proofport_signing::SigningRendezvous;
use proofport_types::config::{EngineConfig, PaymentMode, TeeModeConfig};
use std::sync::Arc;
use tracing::info;

/// Everything `main` needs after wiring: the gateway's composed state
/// and the janitor, which `main` spawns as a background task.
pub struct Node {
    pub gateway_state: proofport_gateway::AppState,
    pub janitor: Janitor,
}

/// Builds the full component graph from `config`. Mirrors §2's DAG:
/// the store is the only thing every other component depends on, the
/// flow coordinator sits at the top of the domain graph, and the
/// gateway and janitor are its two independent consumers.
pub async fn wire(config: &EngineConfig) -> anyhow::Result<Node> {
    info!("wiring C1: key/value store ({})", redact_scheme(&config.kv_url));
    let store = open_store(&config.kv_url).await?;

    info!("wiring C2: fingerprint cache");
    let cache = ProofCache::new(store.clone(), config.proof_ttl);

    info!("wiring C3: rate limiter");
    let rate_limiter = RateLimiter::new(store.clone(), config.rate_window, config.rate_limit);

    info!("wiring C4: signing rendezvous");
    let signing = SigningRendezvous::new(store.clone(), config.signing_ttl, config.sign_page_url.clone());

    info!("wiring C5: payment rendezvous (mode={:?})", config.payment_mode);
    let settler: Arc<dyn Settler> = match config.payment_mode {
        PaymentMode::Enabled => Arc::new(HttpFacilitator::new(facilitator_url(), config.prove_timeout)),
        PaymentMode::Disabled => Arc::new(NoopSettler),
    };
    let payment = PaymentRendezvous::new(store.clone(), settler, config.payment_ttl);

    info!("wiring C7: prover invoker ({})", config.prover_binary);
    let prover = Arc::new(ProcessProverInvoker::new(
        config.prover_binary.clone(),
        config.circuits_dir.clone(),
        config.prove_timeout,
    ));

    info!("wiring C8: attester (mode={:?})", config.tee_mode);
    let attester_for_flow = build_attester(config.tee_mode)?;
    let attester_for_gateway = Arc::new(build_attester(config.tee_mode)?);

    info!("wiring C9: result store");
    let results = ResultStore::new(store.clone(), config.proof_ttl);

    info!("wiring C10: on-chain verifier ({})", redact_scheme(&config.chain_rpc_url));
    let onchain: Arc<dyn OnchainVerifier> = Arc::new(JsonRpcVerifier::new(
        config.chain_rpc_url.clone(),
        load_verifier_registry(),
        config.prove_timeout,
    ));

    info!("wiring C6: flow coordinator");
    let flow = Arc::new(FlowCoordinator::new(
        store.clone(),
        signing,
        payment,
        rate_limiter,
        cache,
        ResultStore::new(store.clone(), config.proof_ttl),
        prover,
        attester_for_flow,
        config.payment_mode,
        config.proof_ttl.max(config.payment_ttl).max(config.signing_ttl),
        config.prove_timeout,
    ));

    info!("wiring C11: janitor");
    let janitor = Janitor::new(store.clone(), config.rate_window);

    info!("wiring C12: gateway state");
    let gateway_state = proofport_gateway::AppState {
        flow,
        results: Arc::new(results),
        subscriber: Arc::new(EventSubscriber::new(store.clone())),
        attester: attester_for_gateway,
        onchain,
        sign_page_url: config.sign_page_url.clone(),
    };

    Ok(Node {
        gateway_state,
        janitor,
    })
}

async fn open_store(kv_url: &str) -> anyhow::Result<Arc<dyn KvStore>> {
    if kv_url.starts_with("memory://") {
        return Ok(Arc::new(InMemoryKvStore::new()));
    }
    let store = RedisKvStore::connect(kv_url).await?;
    Ok(Arc::new(store))
}

/// Builds the attester for the configured mode. `Local`/`Nitro` key
/// material is not part of the engine's recognized environment (§6) —
/// it is read here directly, mirroring how `RUST_LOG` sits outside
/// `EngineConfig`. `Local` generates an ephemeral signing key each
/// startup (there is no real chain to pin, so nothing needs to persist
/// across restarts); `Nitro` loads its leaf key and certificate chain
/// from the paths in `NITRO_KEY_PATH`/`NITRO_CERT_CHAIN_PATH`/
/// `NITRO_ROOT_CERT_PATH`.
fn build_attester(mode: TeeModeConfig) -> anyhow::Result<Attester> {
    use p384::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    match mode {
        TeeModeConfig::Disabled => Ok(Attester::Disabled),
        TeeModeConfig::Local => Ok(Attester::Local(proofport_attest::LocalAttester {
            signing_key: SigningKey::random(&mut OsRng),
            module_id: "proofport-local".to_string(),
        })),
        TeeModeConfig::Nitro => {
            let key_path = env_required("NITRO_KEY_PATH")?;
            let chain_path = env_required("NITRO_CERT_CHAIN_PATH")?;
            let root_path = env_required("NITRO_ROOT_CERT_PATH")?;
            let key_der = std::fs::read(&key_path)?;
            let signing_key = SigningKey::from_bytes(key_der.as_slice().into())
                .map_err(|err| anyhow::anyhow!("invalid Nitro signing key at {key_path}: {err}"))?;
            let chain_der = vec![std::fs::read(&chain_path)?];
            let root_der = std::fs::read(&root_path)?;
            Ok(Attester::Nitro(proofport_attest::NitroAttester {
                signing_key,
                chain_der,
                root_der,
                module_id: "proofport-nitro".to_string(),
            }))
        }
    }
}

fn env_required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("{key} must be set when TEE_MODE=nitro"))
}

fn facilitator_url() -> String {
    std::env::var("FACILITATOR_URL").unwrap_or_else(|_| "http://127.0.0.1:4242".to_string())
}

/// Circuit-to-verifier-contract mapping. Loaded from a JSON file at
/// `VERIFIER_REGISTRY_PATH` (`[{circuit_id, chain_id, address}]`); an
/// empty registry (every lookup fails with `ConfigError`) is used when
/// the variable is unset, since verification is only exercised once a
/// circuit's contract is actually deployed.
fn load_verifier_registry() -> VerifierRegistry {
    #[derive(serde::Deserialize)]
    struct Entry {
        circuit_id: String,
        chain_id: u64,
        address: String,
    }

    let mut registry = VerifierRegistry::new();
    let Ok(path) = std::env::var("VERIFIER_REGISTRY_PATH") else {
        return registry;
    };
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str::<Vec<Entry>>(&raw) {
            Ok(entries) => {
                for entry in entries {
                    registry.register(entry.circuit_id, entry.chain_id, entry.address);
                }
            }
            Err(err) => tracing::warn!(%path, error = %err, "could not parse verifier registry"),
        },
        Err(err) => tracing::warn!(%path, error = %err, "could not read verifier registry"),
    }
    registry
}

fn redact_scheme(url: &str) -> String {
    url.split_once("://")
        .map(|(scheme, _)| format!("{scheme}://***"))
        .unwrap_or_else(|| "***".to_string())
}

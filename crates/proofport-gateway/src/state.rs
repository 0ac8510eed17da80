//! Shared application state handed to every handler. Thin: the gateway
//! itself owns no domain logic, only references to the components that
//! do.

use proofport_attest::Attester;
use proofport_bus::EventSubscriber;
use proofport_flow::FlowCoordinator;
use proofport_onchain::OnchainVerifier;
use proofport_result::ResultStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<FlowCoordinator>,
    pub results: Arc<ResultStore>,
    pub subscriber: Arc<EventSubscriber>,
    /// Needed to verify a `ProofResult.attestation` envelope on read —
    /// the flow coordinator owns its own `Attester` (moved in at
    /// construction) for *generating* attestations, so `node-runtime`
    /// builds a second instance from the same `TEE_MODE` configuration
    /// for this read-only path.
    pub attester: Arc<Attester>,
    pub onchain: Arc<dyn OnchainVerifier>,
    /// `create`'s signing URL is `<sign_page_url>/s/<requestId>`; the
    /// flow coordinator discards the rendezvous's own `signing_url`
    /// once it folds the created request into a `Flow`, so the gateway
    /// rebuilds it from the same deterministic scheme (§4.4) instead of
    /// widening `Flow` with a field only this one response needs.
    pub sign_page_url: String,
}

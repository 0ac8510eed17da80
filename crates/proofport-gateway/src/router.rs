//! Builds the `axum::Router` exposing the twelve endpoints of §6,
//! wrapped in the ambient middleware stack described in §4.12: request
//! tracing, CORS, a blanket request timeout, and a body-size limit.

use crate::config::GatewayConfig;
use crate::handlers::{flow, payment, proof, signing};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let cors = if config.cors.enabled {
        let mut layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        layer = if config.cors.allowed_origins.iter().any(|o| o == "*") {
            layer.allow_origin(Any)
        } else {
            let origins: Vec<_> = config
                .cors
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            layer.allow_origin(origins)
        };
        layer
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/signing/create", post(signing::create))
        .route("/api/signing/:id", get(signing::get))
        .route("/api/signing/:id/prepare", post(signing::prepare))
        .route("/api/signing/callback/:id", post(signing::callback))
        .route("/api/payment/create/:id", post(payment::create))
        .route("/api/payment/:id", get(payment::get))
        .route("/api/payment/sign/:id", post(payment::submit))
        .route("/api/flow/:id/generate", post(flow::generate))
        .route("/api/flow/:id", get(flow::get))
        .route("/api/flow/:id/events", get(flow::events))
        .route("/api/v1/proof/:proof_id", get(proof::get_proof))
        .route("/api/v1/attestation/:proof_id", get(proof::get_attestation))
        .route("/api/verify", post(proof::verify))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::new(config.request_timeout))
                .layer(RequestBodyLimitLayer::new(config.max_body_bytes)),
        )
        .with_state(state)
}

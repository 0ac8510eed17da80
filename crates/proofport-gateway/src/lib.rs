//! # HTTP Surface & Event Dispatcher (C12)
//!
//! Thin adapters only — every handler here does exactly one thing:
//! deserialize the request, call into `proofport-flow` (or, for the
//! read-only artifact/verification endpoints, `proofport-result`/
//! `proofport-attest`/`proofport-onchain` directly), and serialize the
//! result. No domain logic lives in this crate. Errors surface as the
//! uniform `{error, code}` envelope built from `EngineError`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;

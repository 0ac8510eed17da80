//! Uniform `{error, code}` JSON envelope (§4.12) for every handler.
//!
//! `EngineError` is the single kind every handler's `Result` resolves
//! to; a handful of components invoked directly by this crate (C8's
//! verification path, C10) have their own closed error enums and are
//! folded into `EngineError` here, the same way `proofport-flow`'s
//! `errors.rs` folds the rendezvous components' errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use proofport_types::EngineError;
use serde::Serialize;

pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EngineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EngineError::Expired => StatusCode::GONE,
            EngineError::ProveError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::ProveTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            EngineError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            EngineError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn map_attest_error(err: proofport_attest::AttestError) -> EngineError {
    EngineError::UpstreamError(err.to_string())
}

pub fn map_onchain_error(err: proofport_onchain::OnchainError) -> EngineError {
    use proofport_onchain::OnchainError as E;
    match err {
        E::UnknownCircuit { .. } | E::NoVerifier { .. } => {
            EngineError::ConfigError(err.to_string())
        }
        E::Transport(_) | E::MalformedResponse(_) => EngineError::UpstreamError(err.to_string()),
    }
}

pub fn map_result_error(err: proofport_result::ResultError) -> EngineError {
    EngineError::UpstreamError(err.to_string())
}

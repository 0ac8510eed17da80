//! Maps every component's closed error set onto `EngineError`, the single
//! kind the flow coordinator and the HTTP surface route on.
//!
//! These can't be `From` impls: `EngineError` lives in `proofport-types`,
//! which none of the component crates may depend on the other way
//! around, so coherence only allows the impl in `proofport-types`
//! itself — and it has no business knowing about `SigningError` et al.
//! Plain mapping functions instead.

use proofport_types::EngineError;

pub fn map_signing_error(err: proofport_signing::SigningError) -> EngineError {
    use proofport_signing::SigningError as E;
    match err {
        E::NotFound => EngineError::NotFound("signing request not found".into()),
        E::Conflict(msg) => EngineError::Conflict(msg),
        E::BadRequest(msg) => EngineError::BadRequest(msg),
        E::Expired => EngineError::Expired,
        E::Store(e) => EngineError::UpstreamError(e.to_string()),
        E::Crypto(e) => EngineError::BadRequest(e.to_string()),
        E::Serialization(e) => EngineError::UpstreamError(e.to_string()),
    }
}

pub fn map_payment_error(err: proofport_payment::PaymentError) -> EngineError {
    use proofport_payment::PaymentError as E;
    match err {
        E::NotFound => EngineError::NotFound("payment authorization not found".into()),
        E::Conflict(msg) => EngineError::Conflict(msg),
        E::BadRequest(msg) => EngineError::BadRequest(msg),
        E::Expired => EngineError::Expired,
        E::Upstream(msg) => EngineError::UpstreamError(msg),
        E::Store(e) => EngineError::UpstreamError(e.to_string()),
        E::Crypto(e) => EngineError::BadRequest(e.to_string()),
        E::Serialization(e) => EngineError::UpstreamError(e.to_string()),
    }
}

pub fn map_store_error(err: proofport_kv::StoreError) -> EngineError {
    EngineError::UpstreamError(err.to_string())
}

pub fn map_cache_error(err: proofport_fingerprint::CacheError) -> EngineError {
    EngineError::UpstreamError(err.to_string())
}

pub fn map_result_error(err: proofport_result::ResultError) -> EngineError {
    EngineError::UpstreamError(err.to_string())
}

pub fn map_publish_error(err: proofport_bus::PublishError) -> EngineError {
    EngineError::UpstreamError(err.to_string())
}

pub fn map_prove_error(err: proofport_prover::ProveError) -> EngineError {
    use proofport_prover::ProveError as E;
    match err {
        E::Failed { .. } => EngineError::ProveError(err.to_string()),
        E::Timeout(secs) => EngineError::ProveTimeout(secs),
        E::Config(msg) => EngineError::ConfigError(msg),
        E::Io(e) => EngineError::ProveError(e.to_string()),
    }
}

pub fn map_attest_error(err: proofport_attest::AttestError) -> EngineError {
    EngineError::UpstreamError(err.to_string())
}

//! # Engine Configuration
//!
//! Recognized environment options (§6). Parsed once at startup by
//! `node-runtime`; every other crate receives the already-parsed values
//! it needs rather than reading the environment itself.

use crate::errors::EngineError;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeeModeConfig {
    Disabled,
    Local,
    Nitro,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub kv_url: String,
    pub sign_page_url: String,
    pub payment_mode: PaymentMode,
    pub tee_mode: TeeModeConfig,
    pub chain_rpc_url: String,
    pub prover_binary: String,
    pub circuits_dir: String,
    pub signing_ttl: Duration,
    pub payment_ttl: Duration,
    pub proof_ttl: Duration,
    pub prove_timeout: Duration,
    pub rate_window: Duration,
    pub rate_limit: u32,
    pub max_concurrent_provers: usize,
}

impl EngineConfig {
    /// Reads every recognized variable from the process environment,
    /// falling back to the defaults named in the spec where absent.
    pub fn from_env() -> Result<Self, EngineError> {
        Ok(Self {
            kv_url: env_or("KV_URL", "redis://127.0.0.1:6379"),
            sign_page_url: env_or("SIGN_PAGE_URL", "http://localhost:3000"),
            payment_mode: match env_or("PAYMENT_MODE", "enabled").as_str() {
                "enabled" => PaymentMode::Enabled,
                "disabled" => PaymentMode::Disabled,
                other => {
                    return Err(EngineError::ConfigError(format!(
                        "PAYMENT_MODE must be enabled|disabled, got {other}"
                    )))
                }
            },
            tee_mode: match env_or("TEE_MODE", "disabled").as_str() {
                "disabled" => TeeModeConfig::Disabled,
                "local" => TeeModeConfig::Local,
                "nitro" => TeeModeConfig::Nitro,
                other => {
                    return Err(EngineError::ConfigError(format!(
                        "TEE_MODE must be disabled|local|nitro, got {other}"
                    )))
                }
            },
            chain_rpc_url: env_or("CHAIN_RPC_URL", "http://127.0.0.1:8545"),
            prover_binary: env_or("PROVER_BINARY", "/usr/local/bin/zkproofport-prove"),
            circuits_dir: env_or("CIRCUITS_DIR", "/var/lib/zkproofport/circuits"),
            signing_ttl: Duration::from_secs(parse_env("SIGNING_TTL", 300)?),
            payment_ttl: Duration::from_secs(parse_env("PAYMENT_TTL", 600)?),
            proof_ttl: Duration::from_secs(parse_env("PROOF_TTL", 24 * 3600)?),
            prove_timeout: Duration::from_secs(parse_env("PROVE_TIMEOUT", 120)?),
            rate_window: Duration::from_secs(parse_env("RATE_WINDOW", 60)?),
            rate_limit: parse_env("RATE_LIMIT", 10)?,
            max_concurrent_provers: parse_env("MAX_CONCURRENT_PROVERS", num_cpus())?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, EngineError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| EngineError::ConfigError(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_absent() {
        // SAFETY: test runs single-threaded per-process env mutation is fine here.
        for key in [
            "KV_URL",
            "PAYMENT_MODE",
            "TEE_MODE",
            "SIGNING_TTL",
            "RATE_LIMIT",
        ] {
            std::env::remove_var(key);
        }
        let cfg = EngineConfig::from_env().unwrap();
        assert_eq!(cfg.payment_mode, PaymentMode::Enabled);
        assert_eq!(cfg.tee_mode, TeeModeConfig::Disabled);
        assert_eq!(cfg.signing_ttl, Duration::from_secs(300));
        assert_eq!(cfg.rate_limit, 10);
    }

    #[test]
    fn rejects_unknown_payment_mode() {
        std::env::set_var("PAYMENT_MODE", "maybe");
        let result = EngineConfig::from_env();
        std::env::remove_var("PAYMENT_MODE");
        assert!(result.is_err());
    }
}

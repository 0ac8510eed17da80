//! Gateway-local configuration: the bits of wiring that belong to the
//! HTTP surface rather than to the engine (`proofport_types::EngineConfig`
//! covers those). Kept deliberately small — CORS, the bind address, and
//! the two blanket timeouts/limits applied as `tower` layers.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub cors: CorsConfig,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            cors: CorsConfig::default(),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 1024 * 1024,
        }
    }
}

//! # Proof-Request Lifecycle Engine — Node Runtime
//!
//! The main entry point. Reads `EngineConfig` from the environment,
//! wires the twelve components (`node_runtime::wiring::wire`), spawns
//! the janitor as a background sweeper, and serves the gateway's
//! `axum::Router` until `Ctrl+C`.

use anyhow::Result;
use node_runtime::wiring;
use proofport_gateway::GatewayConfig;
use proofport_types::config::EngineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("proof-request lifecycle engine starting");

    let config = EngineConfig::from_env()?;
    let node = wiring::wire(&config).await?;

    tokio::spawn(node.janitor.run());

    let gateway_config = GatewayConfig {
        bind_addr: std::env::var("GATEWAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        ..GatewayConfig::default()
    };
    let bind_addr = gateway_config.bind_addr.clone();
    let router = proofport_gateway::build_router(node.gateway_state, &gateway_config);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, shutting down");
}

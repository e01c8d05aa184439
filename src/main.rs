//! A2A agent registry.
//!
//! Keeps a directory of lab agents, relays messages to them and serves a
//! dashboard at `/`.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::info;

use agent_lab::config::RegistryConfig;
use agent_lab::registry::{RegistryState, router, spawn_sweeper};
use agent_lab::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv();
    telemetry::init();

    let config = RegistryConfig::load().context("failed to load configuration")?;
    let state = RegistryState::from_config(&config).context("failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let sweeper = spawn_sweeper(state.clone(), config.health_interval(), cancel.clone());

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    print_banner(&config.server.host, config.server.port);
    info!(
        name: "registry.server.started",
        address = %address,
        history_capacity = config.registry.history_capacity,
        health_interval_secs = config.registry.health_interval_secs,
        "Registry listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("server error")?;

    cancel.cancel();
    let _ = sweeper.await;
    info!(name: "registry.server.stopped", "Registry stopped");
    Ok(())
}

fn print_banner(host: &str, port: u16) {
    println!(
        r#"
A2A Agent Registry
  Web UI:  http://{host}:{port}/
  API:     http://{host}:{port}/agents

  Register your agent:
  curl -X POST http://<this-ip>:{port}/register \
    -H "Content-Type: application/json" \
    -d '{{"agent_url": "http://<your-ip>:9999"}}'
"#
    );
}

/// Resolve on Ctrl-C or when `cancel` fires, cancelling background tasks.
async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!(name: "registry.server.shutdown", "Ctrl-C received, shutting down");
        }
        () = cancel.cancelled() => {}
    }
    cancel.cancel();
}

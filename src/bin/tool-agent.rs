//! A2A tool agent with calculator and time tools.
//!
//! Answers through an OpenAI-compatible model when `LLM_BASE_URL` and
//! `LLM_MODEL` are set, and by keyword routing otherwise.

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use agent_lab::agent::{AgentState, KeywordResponder, LlmResponder, Responder, build_card, router};
use agent_lab::config::AgentConfig;
use agent_lab::llm::{LlmSettings, Orchestrator};
use agent_lab::registration;
use agent_lab::telemetry;
use agent_lab::tools::{ToolRegistry, builtin};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv();
    telemetry::init();

    let config = AgentConfig::load().context("failed to load configuration")?;
    let public_url = config.public_url();

    let mut tools = match config.agent.mcp_config.as_deref() {
        Some(path) => ToolRegistry::load_from_file(path)
            .await
            .with_context(|| format!("failed to load MCP servers from {path}"))?,
        None => ToolRegistry::new(),
    };
    for tool in builtin::agent_tools() {
        tools = tools.with_native_tool(tool);
    }
    for (name, _) in tools.tools() {
        info!(name: "agent.tool.available", tool = %name, "Tool available");
    }

    let responder: Arc<dyn Responder> = match LlmSettings::from_env() {
        Some(settings) => {
            info!(
                name: "agent.llm.configured",
                base_url = %settings.base_url,
                model = %settings.model,
                "Answering with the configured model"
            );
            Arc::new(LlmResponder::new(Orchestrator::new(settings, tools.clone())))
        }
        None => {
            warn!(
                name: "agent.llm.missing",
                "LLM_BASE_URL or LLM_MODEL not set, using keyword routing"
            );
            Arc::new(KeywordResponder)
        }
    };

    let card = build_card(&config.agent.name, &public_url, &tools);
    let state = AgentState::new(card, responder);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    let cancel = CancellationToken::new();
    let heartbeat = registration::start_heartbeat(
        config.agent.registry_url.as_deref(),
        Some(public_url.as_str()),
        Some(config.agent.name.as_str()),
        config.heartbeat_interval(),
        cancel.clone(),
    );

    let tool_names: Vec<_> = tools.tools().iter().map(|(_, t)| t.name.to_string()).collect();
    println!("Starting {} on {public_url}", config.agent.name);
    println!("Tools: {}", tool_names.join(", "));
    info!(
        name: "agent.server.started",
        address = %address,
        public_url = %public_url,
        "Tool agent listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(name: "agent.server.shutdown", "Ctrl-C received, shutting down");
        })
        .await
        .context("server error")?;

    cancel.cancel();
    if let Some(handle) = heartbeat {
        let _ = handle.await;
    }
    Ok(())
}

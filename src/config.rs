//! Layered configuration for the registry and the tool agent.
//!
//! Priority, lowest first: built-in defaults, config file, `LAB_`-prefixed
//! environment variables (`LAB_REGISTRY__HISTORY_CAPACITY=50`), then CLI
//! flags and their dedicated environment variables.

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::a2a::PollPolicy;

const ENV_PREFIX: &str = "LAB";

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "a2a-registry", author, version, about = "A2A agent registry", long_about = None)]
pub struct RegistryCli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Interface to bind
    #[arg(long, env = "REGISTRY_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "REGISTRY_PORT")]
    pub port: Option<u16>,

    /// Seconds between health sweeps
    #[arg(long, env = "REGISTRY_HEALTH_INTERVAL")]
    pub health_interval: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    pub server: ServerConfig,
    pub registry: DirectoryConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
    /// Number of relayed exchanges kept in memory.
    pub history_capacity: usize,
    pub health_interval_secs: u64,
    /// Timeout for agent card fetches, at registration and during sweeps.
    pub card_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    pub timeout_secs: u64,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
}

impl RegistryConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = RegistryCli::try_parse_from(args)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("registry.history_capacity", 20)?
            .set_default("registry.health_interval_secs", 300)?
            .set_default("registry.card_timeout_secs", 10)?
            .set_default("relay.timeout_secs", 60)?
            .set_default("relay.poll_attempts", 30)?
            .set_default("relay.poll_interval_ms", 1000)?;

        let mut builder = layer_sources(builder, cli.config.as_deref(), "registry.yaml");

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(secs) = cli.health_interval {
            builder = builder.set_override("registry.health_interval_secs", secs)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.registry.health_interval_secs)
    }

    pub fn card_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.card_timeout_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.relay.poll_attempts,
            interval: Duration::from_millis(self.relay.poll_interval_ms),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool agent
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tool-agent", author, version, about = "A2A tool agent", long_about = None)]
pub struct AgentCli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Interface to bind
    #[arg(long, env = "AGENT_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "AGENT_PORT")]
    pub port: Option<u16>,

    /// URL advertised on the agent card and to the registry
    #[arg(long, env = "A2A_AGENT_URL")]
    pub public_url: Option<String>,

    /// Registry to join with a heartbeat
    #[arg(long, env = "A2A_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Path to an `mcp.json` describing extra tool servers
    #[arg(long, env = "MCP_CONFIG")]
    pub mcp_config: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub server: ServerConfig,
    pub agent: AgentSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentSettings {
    pub name: String,
    pub public_url: Option<String>,
    pub registry_url: Option<String>,
    pub heartbeat_secs: u64,
    pub mcp_config: Option<String>,
}

impl AgentConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = AgentCli::try_parse_from(args)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 9999)?
            .set_default("agent.name", "Tool Agent")?
            .set_default("agent.heartbeat_secs", 60)?;

        let mut builder = layer_sources(builder, cli.config.as_deref(), "agent.yaml");

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(url) = cli.public_url {
            builder = builder.set_override("agent.public_url", url)?;
        }
        if let Some(url) = cli.registry_url {
            builder = builder.set_override("agent.registry_url", url)?;
        }
        if let Some(path) = cli.mcp_config {
            builder = builder.set_override("agent.mcp_config", path)?;
        }

        builder.build()?.try_deserialize()
    }

    /// URL other agents use to reach this one.
    pub fn public_url(&self) -> String {
        self.agent.public_url.clone().unwrap_or_else(|| {
            let host = match self.server.host.as_str() {
                "0.0.0.0" | "::" => "localhost",
                other => other,
            };
            format!("http://{host}:{}", self.server.port)
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.agent.heartbeat_secs)
    }
}

/// Add the config file (explicit path, else `fallback` when it exists in the
/// working directory) and the prefixed environment.
fn layer_sources(
    builder: ConfigBuilder<DefaultState>,
    explicit: Option<&str>,
    fallback: &str,
) -> ConfigBuilder<DefaultState> {
    let builder = match explicit {
        Some(path) => builder.add_source(File::with_name(path)),
        None if Path::new(fallback).exists() => builder.add_source(File::with_name(fallback)),
        None => builder,
    };

    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

//! Client side of the registry: joining it, leaving it and talking through
//! it.
//!
//! Agents usually only need [`auto_register`], which keeps the agent
//! registered with a heartbeat when `A2A_REGISTRY_URL` is set.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::registry::{AgentRecord, HistoryEntry};

pub const REGISTRY_URL_ENV: &str = "A2A_REGISTRY_URL";
pub const AGENT_URL_ENV: &str = "A2A_AGENT_URL";
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
// Relays wait for the agent's task to finish.
const RELAY_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid registry URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Registry URL cannot have path segments: {0}")]
    NotABase(String),

    #[error("Registry returned {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

pub type Result<T> = std::result::Result<T, RegistrationError>;

/// Answer of `POST /register`.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub status: String,
    pub name: String,
    pub url: String,
}

#[derive(Deserialize)]
struct AgentsBody {
    agents: Vec<AgentRecord>,
}

#[derive(Deserialize)]
struct HistoryBody {
    history: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct RelayBody {
    response: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Typed client for the registry's JSON API.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base: Url,
    http: reqwest::Client,
}

impl RegistryClient {
    pub fn new(registry_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base: Url::parse(registry_url)?,
            http,
        })
    }

    pub fn registry_url(&self) -> &str {
        self.base.as_str()
    }

    pub async fn register(&self, agent_url: &str, name: Option<&str>) -> Result<Registration> {
        let response = self
            .http
            .post(self.endpoint(&["register"])?)
            .json(&json!({ "agent_url": agent_url, "name": name }))
            .send()
            .await?;
        decode(response).await
    }

    /// Remove an agent. `Ok(false)` when the registry did not know it.
    pub async fn unregister(&self, agent_url: &str) -> Result<bool> {
        let response = self
            .http
            .delete(self.endpoint(&["agents", agent_url])?)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        decode::<serde_json::Value>(response).await.map(|_| true)
    }

    pub async fn agents(&self) -> Result<Vec<AgentRecord>> {
        let response = self.http.get(self.endpoint(&["agents"])?).send().await?;
        Ok(decode::<AgentsBody>(response).await?.agents)
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let response = self.http.get(self.endpoint(&["history"])?).send().await?;
        Ok(decode::<HistoryBody>(response).await?.history)
    }

    /// Relay `message` through the registry and return the agent's answer.
    pub async fn send_message(&self, agent_url: &str, message: &str) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint(&["send-message"])?)
            .timeout(RELAY_TIMEOUT)
            .json(&json!({ "agent_url": agent_url, "message": message }))
            .send()
            .await?;
        Ok(decode::<RelayBody>(response).await?.response)
    }

    /// Registry URL with `segments` appended. Each segment is
    /// percent-encoded, so an agent URL stays a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RegistrationError::NotABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body).map_or(body, |e| e.detail);
    Err(RegistrationError::Rejected {
        status: status.as_u16(),
        detail,
    })
}

/// Register now and again every `interval` until `cancel` fires. Failures
/// are logged and retried on the next beat.
pub fn spawn_heartbeat(
    client: RegistryClient,
    agent_url: String,
    name: Option<String>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            name: "registration.heartbeat.started",
            registry = %client.registry_url(),
            interval_secs = interval.as_secs(),
            "Registry heartbeat started"
        );
        loop {
            match client.register(&agent_url, name.as_deref()).await {
                Ok(reg) => info!(
                    name: "registration.registered",
                    agent = %reg.name,
                    agent_url = %reg.url,
                    "Registered with registry"
                ),
                Err(e) => warn!(
                    name: "registration.failed",
                    agent_url = %agent_url,
                    error = %e,
                    "Registration failed"
                ),
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        info!(name: "registration.heartbeat.stopped", "Registry heartbeat stopped");
    })
}

/// Start a heartbeat when both a registry and an agent URL are known.
pub fn start_heartbeat(
    registry_url: Option<&str>,
    agent_url: Option<&str>,
    name: Option<&str>,
    interval: Duration,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let registry_url = registry_url.filter(|u| !u.trim().is_empty())?;
    let Some(agent_url) = agent_url.filter(|u| !u.trim().is_empty()) else {
        warn!(
            name: "registration.skipped",
            "Set {AGENT_URL_ENV} to auto-register"
        );
        return None;
    };

    match RegistryClient::new(registry_url) {
        Ok(client) => Some(spawn_heartbeat(
            client,
            agent_url.to_string(),
            name.map(str::to_string),
            interval,
            cancel,
        )),
        Err(e) => {
            warn!(
                name: "registration.skipped",
                registry = %registry_url,
                error = %e,
                "Invalid registry URL, not registering"
            );
            None
        }
    }
}

/// Register with the registry named by `A2A_REGISTRY_URL`, if any, using
/// `agent_url` or else `A2A_AGENT_URL`.
pub fn auto_register(
    agent_url: Option<&str>,
    name: Option<&str>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let registry_url = std::env::var(REGISTRY_URL_ENV).ok();
    let env_agent_url = std::env::var(AGENT_URL_ENV).ok();
    start_heartbeat(
        registry_url.as_deref(),
        agent_url.or(env_agent_url.as_deref()),
        name,
        DEFAULT_HEARTBEAT,
        cancel,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_url_is_one_segment() {
        let client = RegistryClient::new("http://registry:8000").unwrap();
        let url = client
            .endpoint(&["agents", "http://192.168.1.50:9999"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://registry:8000/agents/http:%2F%2F192.168.1.50:9999"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = RegistryClient::new("http://host/lab/registry/").unwrap();
        assert_eq!(
            client.endpoint(&["register"]).unwrap().as_str(),
            "http://host/lab/registry/register"
        );
    }

    #[tokio::test]
    async fn test_no_heartbeat_without_urls() {
        let cancel = CancellationToken::new();
        assert!(start_heartbeat(None, Some("http://a"), None, DEFAULT_HEARTBEAT, cancel.clone()).is_none());
        assert!(start_heartbeat(Some("http://r"), None, None, DEFAULT_HEARTBEAT, cancel.clone()).is_none());
        assert!(start_heartbeat(Some("not a url"), Some("http://a"), None, DEFAULT_HEARTBEAT, cancel).is_none());
    }
}

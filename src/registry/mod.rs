//! In-memory directory of A2A agents.
//!
//! Agents are keyed by the URL their card advertises. The directory also
//! keeps a short history of messages relayed through it and periodically
//! drops agents whose card can no longer be fetched.

pub mod dashboard;
mod health;
mod history;
mod relay;
mod routes;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::a2a::PollPolicy;
use crate::a2a::types::AGENT_CARD_PATH;
use crate::config::RegistryConfig;

pub use health::{SweepReport, spawn_sweeper, sweep};
pub use history::{HistoryEntry, MessageHistory};
pub use relay::relay_message;
pub use routes::router;

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub card_url: Option<String>,
    #[serde(default)]
    pub agent_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RegisterRequest {
    /// Card location: explicit, else derived from the agent URL.
    pub fn resolved_card_url(&self) -> Option<String> {
        non_empty(self.card_url.as_deref())
            .map(str::to_string)
            .or_else(|| {
                non_empty(self.agent_url.as_deref())
                    .map(|u| format!("{}{AGENT_CARD_PATH}", u.trim_end_matches('/')))
            })
    }
}

/// A registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub description: String,
    pub url: String,
    pub card_url: String,
    pub skills: Vec<String>,
    pub author: String,
    pub author_url: String,
    pub version: String,
    pub card: Value,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl AgentRecord {
    /// Build a record from a fetched card, filling gaps the way lab agents
    /// expect: request values first, then card values, then placeholders.
    pub fn from_card(
        card: Value,
        card_url: &str,
        request: &RegisterRequest,
        now: DateTime<Utc>,
    ) -> Self {
        let name = non_empty(request.name.as_deref())
            .or_else(|| str_field(&card, "name"))
            .unwrap_or("Unknown Agent")
            .to_string();

        let url = str_field(&card, "url")
            .or_else(|| non_empty(request.agent_url.as_deref()))
            .unwrap_or(card_url)
            .to_string();

        let description = str_field(&card, "description")
            .unwrap_or("No description")
            .to_string();

        let skills = card
            .get("skills")
            .and_then(Value::as_array)
            .map(|skills| {
                skills
                    .iter()
                    .map(|s| {
                        str_field(s, "name")
                            .or_else(|| str_field(s, "id"))
                            .unwrap_or("unknown")
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let provider = card.get("provider");
        let author = provider
            .and_then(|p| str_field(p, "organization").or_else(|| str_field(p, "name")))
            .unwrap_or_default()
            .to_string();
        let author_url = provider
            .and_then(|p| str_field(p, "url"))
            .unwrap_or_default()
            .to_string();
        let version = str_field(&card, "version").unwrap_or_default().to_string();

        Self {
            name,
            description,
            url,
            card_url: card_url.to_string(),
            skills,
            author,
            author_url,
            version,
            card,
            registered_at: now,
            last_seen: now,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    non_empty(value.get(key).and_then(Value::as_str))
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────────────────────────────────────

/// Thread-safe map of agent URL to record.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    agents: Arc<RwLock<HashMap<String, AgentRecord>>>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a record. An existing entry keeps its
    /// `registered_at`. Returns `true` when the agent was new.
    pub fn upsert(&self, mut record: AgentRecord) -> bool {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        let is_new = match agents.get(&record.url) {
            Some(existing) => {
                record.registered_at = existing.registered_at;
                false
            }
            None => true,
        };
        agents.insert(record.url.clone(), record);
        is_new
    }

    pub fn remove(&self, url: &str) -> Option<AgentRecord> {
        self.agents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url)
    }

    pub fn get(&self, url: &str) -> Option<AgentRecord> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Mark an agent as seen now. Returns `false` if it is gone.
    pub fn touch(&self, url: &str, now: DateTime<Utc>) -> bool {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        match agents.get_mut(url) {
            Some(record) => {
                record.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// All records in registration order.
    pub fn list(&self) -> Vec<AgentRecord> {
        let mut records: Vec<_> = self
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then(a.url.cmp(&b.url)));
        records
    }

    /// `(url, card_url)` pairs, for work that must not hold the lock.
    pub fn card_targets(&self) -> Vec<(String, String)> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|r| (r.url.clone(), r.card_url.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared state
// ─────────────────────────────────────────────────────────────────────────────

/// State shared by the registry's handlers and background tasks.
#[derive(Debug, Clone)]
pub struct RegistryState {
    pub directory: AgentDirectory,
    pub history: MessageHistory,
    /// Client used for card fetches; carries the card timeout.
    pub card_http: reqwest::Client,
    pub relay_timeout: Duration,
    pub poll_policy: PollPolicy,
}

impl RegistryState {
    pub fn new(
        history_capacity: usize,
        card_timeout: Duration,
        relay_timeout: Duration,
        poll_policy: PollPolicy,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            directory: AgentDirectory::new(),
            history: MessageHistory::new(history_capacity),
            card_http: reqwest::Client::builder().timeout(card_timeout).build()?,
            relay_timeout,
            poll_policy,
        })
    }

    pub fn from_config(cfg: &RegistryConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            cfg.registry.history_capacity,
            cfg.card_timeout(),
            cfg.relay_timeout(),
            cfg.poll_policy(),
        )
    }

    /// Fetch a card as raw JSON, failing on transport errors, non-2xx
    /// statuses and bodies that are not JSON.
    pub async fn fetch_card(&self, card_url: &str) -> Result<Value, reqwest::Error> {
        self.card_http
            .get(card_url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }

    /// Liveness check used by the health sweep: any 2xx answer counts,
    /// whatever the body.
    pub async fn check_card(&self, card_url: &str) -> Result<(), reqwest::Error> {
        self.card_http
            .get(card_url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

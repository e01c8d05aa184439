//! Minimal A2A JSON-RPC client.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::error::{A2aError, Result};
use super::task::{AskOutcome, PollPolicy, PollStep, inspect};
use super::types::{
    AGENT_CARD_PATH, AgentCard, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams,
    SendResult, Task, TaskIdParams,
};

/// Client for a single agent, addressed by its base URL.
#[derive(Debug, Clone)]
pub struct A2aClient {
    base_url: String,
    http: reqwest::Client,
}

impl A2aClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, http)
    }

    /// Create a client around an existing reqwest client.
    pub fn with_client(base_url: impl AsRef<str>, http: reqwest::Client) -> Result<Self> {
        let base_url = base_url.as_ref();
        Url::parse(base_url)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Location of the agent card.
    pub fn card_url(&self) -> String {
        format!("{}{AGENT_CARD_PATH}", self.base_url)
    }

    /// Fetch the agent card.
    pub async fn resolve_card(&self) -> Result<AgentCard> {
        let response = self.http.get(self.card_url()).send().await?;
        Self::handle_response(response).await
    }

    /// JSON-RPC endpoint advertised by `card`, or the base URL.
    pub fn endpoint_for(&self, card: &AgentCard) -> String {
        if card.url.trim().is_empty() {
            self.base_url.clone()
        } else {
            card.url.clone()
        }
    }

    /// Send `text` as a user message and return the raw `result` value.
    pub async fn send_message_raw(&self, endpoint: &str, text: &str) -> Result<Value> {
        let params = MessageSendParams {
            message: Message::user_text(text),
        };
        self.call(endpoint, "message/send", serde_json::to_value(params)?)
            .await
    }

    /// Send `text` as a user message.
    pub async fn send_message(&self, endpoint: &str, text: &str) -> Result<SendResult> {
        let raw = self.send_message_raw(endpoint, text).await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Fetch the current snapshot of a task.
    pub async fn get_task(&self, endpoint: &str, task_id: &str) -> Result<Task> {
        let params = TaskIdParams {
            id: task_id.to_string(),
        };
        let raw = self
            .call(endpoint, "tasks/get", serde_json::to_value(params)?)
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Discover the agent, send `text`, and wait for the answer.
    pub async fn ask(&self, text: &str, policy: &PollPolicy) -> Result<AskOutcome> {
        let card = self.resolve_card().await?;
        let endpoint = self.endpoint_for(&card);
        debug!(
            name: "a2a.ask.sending",
            agent = %card.name,
            endpoint = %endpoint,
            "Sending message to agent"
        );

        let raw = self.send_message_raw(&endpoint, text).await?;
        match serde_json::from_value::<SendResult>(raw.clone())? {
            SendResult::Message(message) => Ok(message
                .first_text()
                .map_or(AskOutcome::Unstructured(raw), |t| {
                    AskOutcome::Answered(t.to_string())
                })),
            SendResult::Task(task) => self.poll(&endpoint, &task.id, policy).await,
        }
    }

    async fn poll(&self, endpoint: &str, task_id: &str, policy: &PollPolicy) -> Result<AskOutcome> {
        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(policy.interval).await;
            }
            let task = self.get_task(endpoint, task_id).await?;
            if let PollStep::Done(outcome) = inspect(&task) {
                debug!(
                    name: "a2a.ask.finished",
                    task_id = %task_id,
                    state = %task.status.state,
                    attempts = attempt + 1,
                    "Task reached a terminal state"
                );
                return Ok(outcome);
            }
        }
        Ok(AskOutcome::TimedOut)
    }

    async fn call(&self, endpoint: &str, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest::new(method, params);
        let response = self.http.post(endpoint).json(&request).send().await?;
        let envelope: JsonRpcResponse = Self::handle_response(response).await?;

        if let Some(err) = envelope.error {
            return Err(A2aError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        envelope.result.ok_or(A2aError::MissingResult)
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            Err(A2aError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_url_ignores_trailing_slash() {
        let client = A2aClient::new("http://localhost:9999/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.card_url(),
            "http://localhost:9999/.well-known/agent-card.json"
        );
    }

    #[test]
    fn test_endpoint_falls_back_to_base() {
        let client = A2aClient::new("http://localhost:9999", Duration::from_secs(1)).unwrap();
        let mut card = AgentCard::default();
        assert_eq!(client.endpoint_for(&card), "http://localhost:9999");
        card.url = "http://agent.internal:9000/rpc".into();
        assert_eq!(client.endpoint_for(&card), "http://agent.internal:9000/rpc");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = A2aClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, A2aError::InvalidUrl(_)));
    }
}

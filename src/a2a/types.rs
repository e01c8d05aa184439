//! A2A wire types.
//!
//! Only the subset of the protocol the lab agents exchange is modelled:
//! agent cards, text messages, tasks with artifacts, and the JSON-RPC
//! envelopes around `message/send` and `tasks/get`. Deserialization is
//! deliberately lenient so cards and tasks produced by other SDKs still
//! parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Well-known path an agent serves its card from.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// A2A protocol version advertised by agents in this crate.
pub const PROTOCOL_VERSION: &str = "0.3.0";

// ─────────────────────────────────────────────────────────────────────────────
// Agent card
// ─────────────────────────────────────────────────────────────────────────────

/// Self-description served by an agent at [`AGENT_CARD_PATH`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON-RPC endpoint of the agent.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    /// Fields this crate does not model, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Organization publishing an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProvider {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub url: String,
}

/// Optional protocol features an agent supports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

/// A capability advertised on the card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSkill {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    #[serde(other)]
    Other,
}

/// One piece of message or artifact content, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: Value },
    File { file: Value },
    #[serde(other)]
    Unknown,
}

impl Part {
    /// Build a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text content, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

fn message_kind() -> String {
    "message".to_string()
}

fn task_kind() -> String {
    "task".to_string()
}

/// A conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default = "message_kind")]
    pub kind: String,
}

impl Message {
    /// A user message holding a single text part and a fresh message id.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// An agent message holding a single text part and a fresh message id.
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::text(text)],
            message_id: uuid::Uuid::new_v4().simple().to_string(),
            task_id: None,
            context_id: None,
            kind: message_kind(),
        }
    }

    /// First text part of the message.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(Part::as_text)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::AuthRequired => "auth-required",
            Self::Unknown => "unknown",
        }
    }

    /// States a task never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Canceled | Self::Failed | Self::Rejected
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    /// Status in `state`, stamped with the current time.
    pub fn now(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Output produced by a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Asynchronous unit of work created by `message/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default = "task_kind")]
    pub kind: String,
}

/// Result of `message/send`: agents answer either with a task to poll or
/// with a direct message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendResult {
    Task(Task),
    Message(Message),
}

/// Parameters of `message/send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: Message,
}

/// Parameters of `tasks/get` and `tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_from_sdk_payload() {
        let raw = json!({
            "id": "t-1",
            "contextId": "c-1",
            "kind": "task",
            "status": { "state": "input-required", "timestamp": "2026-01-01T00:00:00Z" },
            "artifacts": [
                { "artifactId": "a-1", "parts": [{ "kind": "text", "text": "hi" }] }
            ],
            "history": []
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.status.state, TaskState::InputRequired);
        assert_eq!(task.artifacts[0].parts[0].as_text(), Some("hi"));
    }

    #[test]
    fn test_unknown_state_and_part_kinds_are_tolerated() {
        let raw = json!({
            "id": "t-2",
            "status": { "state": "paused-by-operator" },
            "artifacts": [{ "parts": [{ "kind": "audio", "bytes": "..." }] }]
        });
        let task: Task = serde_json::from_value(raw).unwrap();
        assert_eq!(task.status.state, TaskState::Unknown);
        assert_eq!(task.artifacts[0].parts[0], Part::Unknown);
    }

    #[test]
    fn test_send_result_discriminates_task_and_message() {
        let task = json!({ "id": "t", "status": { "state": "submitted" }, "kind": "task" });
        assert!(matches!(
            serde_json::from_value::<SendResult>(task).unwrap(),
            SendResult::Task(_)
        ));

        let message = json!({
            "role": "agent",
            "parts": [{ "kind": "text", "text": "direct" }],
            "messageId": "m",
            "kind": "message"
        });
        match serde_json::from_value::<SendResult>(message).unwrap() {
            SendResult::Message(m) => assert_eq!(m.first_text(), Some("direct")),
            SendResult::Task(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn test_user_message_wire_shape() {
        let value = serde_json::to_value(Message::user_text("Calculate 2 + 2")).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["kind"], "message");
        assert_eq!(value["parts"][0]["kind"], "text");
        assert_eq!(value["parts"][0]["text"], "Calculate 2 + 2");
        assert_eq!(value["messageId"].as_str().unwrap().len(), 32);
    }

    #[test]
    fn test_card_keeps_unmodelled_fields() {
        let raw = json!({
            "name": "Tool Agent",
            "url": "http://localhost:9999",
            "preferredTransport": "JSONRPC",
            "skills": [{ "id": "calc", "name": "calculate" }]
        });
        let card: AgentCard = serde_json::from_value(raw).unwrap();
        assert_eq!(card.extra["preferredTransport"], "JSONRPC");
        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(back["preferredTransport"], "JSONRPC");
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert_eq!(TaskState::InputRequired.to_string(), "input-required");
    }
}

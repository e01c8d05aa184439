//! OpenAI-compatible chat completion with tool calling.
//!
//! The [`ChatModel`] trait is the seam between the tool loop in
//! [`Orchestrator`] and the HTTP driver in [`ChatCompletionsDriver`].
//!
//! Configuration comes from the environment:
//!
//! | variable                | meaning                                  |
//! |-------------------------|------------------------------------------|
//! | `LLM_BASE_URL`          | e.g. `http://localhost:11434` for Ollama |
//! | `LLM_MODEL`             | model identifier                         |
//! | `LLM_API_KEY`           | optional key                             |
//! | `AZURE_DEPLOYMENT_NAME` | Azure deployment (Azure only)            |
//! | `AZURE_API_VERSION`     | Azure API version (Azure only)           |

pub mod chat_completions;
pub mod orchestrator;
pub mod provider;

pub use chat_completions::ChatCompletionsDriver;
pub use orchestrator::Orchestrator;
pub use provider::Provider;

use serde::{Deserialize, Serialize};

/// LLM connection and model settings.
#[derive(Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub provider: Provider,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider", &self.provider)
            .finish()
    }
}

impl LlmSettings {
    /// Read settings from the environment. `None` unless both
    /// `LLM_BASE_URL` and `LLM_MODEL` are set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get("LLM_BASE_URL")?;
        let model = get("LLM_MODEL")?;
        let api_key = get("LLM_API_KEY");

        let provider = match Provider::detect_from_url(&base_url) {
            Provider::AzureOpenAI {
                deployment_name,
                api_version,
            } => Provider::AzureOpenAI {
                deployment_name: get("AZURE_DEPLOYMENT_NAME").unwrap_or(deployment_name),
                api_version: get("AZURE_API_VERSION").unwrap_or(api_version),
            },
            other => other,
        };

        Some(Self {
            base_url,
            api_key,
            model,
            provider,
        })
    }
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A chat message in the Chat Completions format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(MessageRole::User, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text(MessageRole::Tool, content)
        }
    }

    fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A tool call requested by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: ToolCallFunction,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ToolCall>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCall>>::deserialize(deserializer)?.unwrap_or_default())
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    /// Arguments as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

/// Something that can produce the next assistant turn.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation once, offering `tools` in OpenAI
    /// function format.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> anyhow::Result<ChatMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_require_url_and_model() {
        assert!(LlmSettings::from_lookup(lookup(&[("LLM_MODEL", "llama3.2")])).is_none());
        assert!(
            LlmSettings::from_lookup(lookup(&[
                ("LLM_BASE_URL", "http://localhost:11434"),
                ("LLM_MODEL", " ")
            ]))
            .is_none()
        );

        let settings = LlmSettings::from_lookup(lookup(&[
            ("LLM_BASE_URL", "http://localhost:11434"),
            ("LLM_MODEL", "llama3.2"),
        ]))
        .unwrap();
        assert_eq!(settings.provider, Provider::Ollama);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_azure_deployment_from_env() {
        let settings = LlmSettings::from_lookup(lookup(&[
            ("LLM_BASE_URL", "https://lab.openai.azure.com"),
            ("LLM_MODEL", "gpt-4o"),
            ("LLM_API_KEY", "k"),
            ("AZURE_DEPLOYMENT_NAME", "lab-gpt"),
        ]))
        .unwrap();
        assert_eq!(
            settings.provider,
            Provider::AzureOpenAI {
                deployment_name: "lab-gpt".into(),
                api_version: provider::DEFAULT_AZURE_API_VERSION.into(),
            }
        );
        assert!(!format!("{settings:?}").contains("\"k\""));
    }

    #[test]
    fn test_tool_result_message_shape() {
        let value = serde_json::to_value(ChatMessage::tool_result("call_1", "4")).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn test_null_tool_calls() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"role":"assistant","content":"hello","tool_calls":null}"#,
        )
        .unwrap();
        assert!(message.tool_calls.is_empty());
    }
}

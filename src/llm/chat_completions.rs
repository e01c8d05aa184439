//! Chat Completions driver (`/v1/chat/completions`, non-streaming).

use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ChatMessage, ChatModel, LlmSettings};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// HTTP driver for OpenAI-compatible servers.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[Value]) -> Value {
        let mut body = json!({
            "model": self.settings.model,
            "stream": false,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
        }
        body
    }
}

#[async_trait::async_trait]
impl ChatModel for ChatCompletionsDriver {
    async fn complete(&self, messages: &[ChatMessage], tools: &[Value]) -> anyhow::Result<ChatMessage> {
        let url = self.settings.provider.build_chat_url(&self.settings.base_url);

        let mut rb = self.http.post(&url).json(&self.request_body(messages, tools));
        if let Some(k) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", k)
            } else {
                rb.bearer_auth(k)
            };
        }

        let resp = rb
            .send()
            .await
            .with_context(|| format!("chat completion request to {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion returned {status}: {body}"));
        }

        let parsed: CompletionResponse = resp.json().await.context("invalid chat completion body")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| anyhow!("chat completion returned no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MessageRole, Provider};

    fn driver() -> ChatCompletionsDriver {
        ChatCompletionsDriver::new(LlmSettings {
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "llama3.2".into(),
            provider: Provider::Ollama,
        })
    }

    #[test]
    fn test_body_omits_empty_tools() {
        let body = driver().request_body(&[ChatMessage::user("hi")], &[]);
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], false);
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "native__calculate", "arguments": "{\"expression\":\"2+2\"}" }
                    }]
                }
            }]
        });
        let parsed: CompletionResponse = serde_json::from_value(raw).unwrap();
        let message = &parsed.choices[0].message;
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "native__calculate");
    }
}

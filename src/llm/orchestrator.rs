//! Tool loop around a [`ChatModel`].
//!
//! 1. Send the conversation and the tool list to the model
//! 2. Execute every requested tool through the [`ToolRegistry`]
//! 3. Append the results and ask again
//! 4. Stop when the model answers without tool calls

use std::sync::Arc;

use anyhow::bail;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::tools::ToolRegistry;

use super::{ChatCompletionsDriver, ChatMessage, ChatModel, LlmSettings};

/// Maximum number of model round trips per request.
pub const MAX_TOOL_ITERATIONS: usize = 10;

#[derive(Clone)]
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator talking to an OpenAI-compatible server.
    pub fn new(settings: LlmSettings, tools: ToolRegistry) -> Self {
        Self::with_model(Arc::new(ChatCompletionsDriver::new(settings)), tools)
    }

    pub fn with_model(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self { model, tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer `user_text`, calling tools as the model requests.
    pub async fn run(&self, system_prompt: &str, user_text: &str) -> anyhow::Result<String> {
        let request_id = Uuid::new_v4().to_string();
        let tools = self.tools.openai_tools_json();
        let mut messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(user_text)];

        for iteration in 0..MAX_TOOL_ITERATIONS {
            let reply = self.model.complete(&messages, &tools).await?;

            if reply.tool_calls.is_empty() {
                debug!(
                    request_id = %request_id,
                    iteration,
                    "Model produced final answer"
                );
                return Ok(reply.content.unwrap_or_default());
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in calls {
                let name = &call.function.name;
                let arguments: Value = serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

                info!(
                    request_id = %request_id,
                    iteration,
                    tool_id = %call.id,
                    tool_name = %name,
                    "Executing tool call"
                );

                let content = match self.tools.call_namespaced_tool(name, arguments).await {
                    Ok(Value::String(s)) => s,
                    Ok(other) => other.to_string(),
                    Err(e) => {
                        warn!(
                            request_id = %request_id,
                            tool_name = %name,
                            error = %e,
                            "Tool call failed"
                        );
                        format!("Error: {e}")
                    }
                };
                messages.push(ChatMessage::tool_result(call.id.clone(), content));
            }
        }

        bail!("no final answer after {MAX_TOOL_ITERATIONS} tool iterations")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MessageRole, ToolCall, ToolCallFunction};
    use crate::tools::builtin;
    use std::sync::Mutex;

    /// Replays canned replies and records what it was sent.
    struct Scripted {
        replies: Mutex<Vec<ChatMessage>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl Scripted {
        fn new(mut replies: Vec<ChatMessage>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatModel for Scripted {
        async fn complete(&self, messages: &[ChatMessage], _tools: &[Value]) -> anyhow::Result<ChatMessage> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    fn assistant(content: Option<&str>, calls: Vec<(&str, &str, &str)>) -> ChatMessage {
        ChatMessage {
            role: MessageRole::Assistant,
            content: content.map(str::to_string),
            tool_calls: calls
                .into_iter()
                .map(|(id, name, args)| ToolCall {
                    id: id.into(),
                    call_type: "function".into(),
                    function: ToolCallFunction {
                        name: name.into(),
                        arguments: args.into(),
                    },
                })
                .collect(),
            tool_call_id: None,
        }
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back() {
        let model = Arc::new(Scripted::new(vec![
            assistant(None, vec![("c1", "native__calculate", r#"{"expression":"2 + 2"}"#)]),
            assistant(Some("2 + 2 is 4."), vec![]),
        ]));
        let orchestrator = Orchestrator::with_model(
            model.clone(),
            ToolRegistry::with_native_tools(builtin::agent_tools()),
        );

        let answer = orchestrator.run("be brief", "Calculate 2 + 2").await.unwrap();
        assert_eq!(answer, "2 + 2 is 4.");

        let seen = model.seen.lock().unwrap();
        let second = &seen[1];
        let tool_msg = second.last().unwrap();
        assert_eq!(tool_msg.role, MessageRole::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
        assert_eq!(tool_msg.content.as_deref(), Some("2 + 2 = 4"));
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error_to_model() {
        let model = Arc::new(Scripted::new(vec![
            assistant(None, vec![("c1", "nope__tool", "{}")]),
            assistant(Some("sorry"), vec![]),
        ]));
        let orchestrator = Orchestrator::with_model(model.clone(), ToolRegistry::new());

        assert_eq!(orchestrator.run("", "hi").await.unwrap(), "sorry");
        let seen = model.seen.lock().unwrap();
        let content = seen[1].last().unwrap().content.clone().unwrap();
        assert!(content.starts_with("Error: unknown tool"));
    }

    #[tokio::test]
    async fn test_loop_is_bounded() {
        let looping: Vec<_> = (0..MAX_TOOL_ITERATIONS)
            .map(|_| assistant(None, vec![("c", "native__get_time", "{}")]))
            .collect();
        let orchestrator = Orchestrator::with_model(
            Arc::new(Scripted::new(looping)),
            ToolRegistry::with_native_tools(builtin::agent_tools()),
        );

        let err = orchestrator.run("", "loop").await.unwrap_err();
        assert!(err.to_string().contains("tool iterations"));
    }
}

//! Turning a user message into the agent's reply.

use async_trait::async_trait;
use chrono::Local;

use crate::llm::Orchestrator;
use crate::tools::builtin::{Calculator, Clock};
use crate::tools::expr;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant with calculator and time tools.
When asked about time or date, use the get_time tool.
When asked to calculate something, use the calculate tool.
Keep responses brief and friendly.";

pub const HELP_TEXT: &str = "I can tell you the current time or calculate arithmetic \
expressions. Try \"What time is it?\" or \"Calculate 2 + 2\".";

const QUESTION_PREFIXES: [&str; 6] = ["calculate", "compute", "evaluate", "what's", "whats", "what is"];
const TIME_WORDS: [&str; 5] = ["time", "date", "clock", "today", "day"];

/// Produces the text answer for one incoming message.
#[async_trait]
pub trait Responder: Send + Sync + std::fmt::Debug {
    async fn respond(&self, text: &str) -> anyhow::Result<String>;
}

/// Deterministic routing without a model: arithmetic goes to `calculate`,
/// time questions to `get_time`, anything else gets the help text.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordResponder;

impl KeywordResponder {
    pub fn answer(text: &str) -> String {
        if let Some(expression) = arithmetic(text) {
            return Calculator::run(expression);
        }
        if asks_for_time(text) {
            return Clock::default().render(&Local::now());
        }
        HELP_TEXT.to_string()
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    async fn respond(&self, text: &str) -> anyhow::Result<String> {
        Ok(Self::answer(text))
    }
}

/// The expression in `text` if, once the question wording is removed, it
/// evaluates.
fn arithmetic(text: &str) -> Option<&str> {
    let mut rest = text.trim();
    for prefix in QUESTION_PREFIXES {
        if rest
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            rest = rest[prefix.len()..].trim_start();
            break;
        }
    }
    let expression = rest.trim_end_matches(['?', '!', '.', ' ']);
    (!expression.is_empty() && expr::evaluate(expression).is_ok()).then_some(expression)
}

fn asks_for_time(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|word| TIME_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)))
}

/// Model-driven answers through the tool loop.
#[derive(Debug, Clone)]
pub struct LlmResponder {
    orchestrator: Orchestrator,
    system_prompt: String,
}

impl LlmResponder {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn respond(&self, text: &str) -> anyhow::Result<String> {
        self.orchestrator.run(&self.system_prompt, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm::{ChatMessage, ChatModel, MessageRole};
    use crate::tools::ToolRegistry;

    #[test]
    fn test_lab_questions() {
        assert_eq!(KeywordResponder::answer("Calculate 2 + 2"), "2 + 2 = 4");
        assert_eq!(KeywordResponder::answer("What's sqrt(144)?"), "sqrt(144) = 12");
        assert_eq!(KeywordResponder::answer("what is 10 / 4"), "10 / 4 = 2.5");
        assert!(
            KeywordResponder::answer("What time is it?").starts_with("Current time: ")
        );
    }

    #[test]
    fn test_bare_expression_and_fallback() {
        assert_eq!(KeywordResponder::answer("2 ** 10"), "2 ** 10 = 1024");
        assert_eq!(KeywordResponder::answer("Tell me a joke"), HELP_TEXT);
        // "daydream" is not a time word
        assert_eq!(KeywordResponder::answer("daydream"), HELP_TEXT);
    }

    #[test]
    fn test_deeply_nested_input_on_worker_sized_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let parens = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
                let minuses = format!("Calculate {}1", "-".repeat(900));
                (KeywordResponder::answer(&parens), KeywordResponder::answer(&minuses))
            })
            .unwrap();
        let (parens, minuses) = handle.join().unwrap();
        assert_eq!(parens, HELP_TEXT);
        assert_eq!(minuses, HELP_TEXT);
        assert_eq!(
            Calculator::run(&"-".repeat(900)),
            "Error: expression is nested more than 100 levels deep"
        );
    }

    #[derive(Debug)]
    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[serde_json::Value],
        ) -> anyhow::Result<ChatMessage> {
            assert_eq!(messages[0].content.as_deref(), Some(SYSTEM_PROMPT));
            Ok(ChatMessage {
                role: MessageRole::Assistant,
                content: messages[1].content.clone(),
                tool_calls: Vec::new(),
                tool_call_id: None,
            })
        }
    }

    #[tokio::test]
    async fn test_llm_responder_uses_system_prompt() {
        let responder =
            LlmResponder::new(Orchestrator::with_model(Arc::new(Echo), ToolRegistry::new()));
        assert_eq!(responder.respond("hello").await.unwrap(), "hello");
    }
}

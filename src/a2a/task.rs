//! Polling policy and the outcome of a relayed question.

use std::time::Duration;

use serde_json::Value;

use super::types::{Task, TaskState};

/// How long [`A2aClient::ask`](super::A2aClient::ask) waits for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of `tasks/get` calls.
    pub max_attempts: u32,
    /// Pause between two polls. The first poll is issued immediately.
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(1),
        }
    }
}

/// What came back from an agent after asking it a question.
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// Text extracted from a completed task or a direct message.
    Answered(String),
    /// The task completed but none of its artifacts held text.
    CompletedWithoutText,
    /// The task ended in `failed`, `canceled` or `rejected`.
    Failed(TaskState),
    /// The task was still running after the last poll.
    TimedOut,
    /// A direct message without a text part, kept as raw JSON.
    Unstructured(Value),
}

impl AskOutcome {
    /// Text shown to users and stored in the message history.
    pub fn response_text(&self) -> String {
        match self {
            Self::Answered(text) => text.clone(),
            Self::CompletedWithoutText => "Completed (no text)".to_string(),
            Self::Failed(state) => format!("Task {state}"),
            Self::TimedOut => "Timeout waiting for response".to_string(),
            Self::Unstructured(raw) => raw.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::TimedOut)
    }
}

/// Result of inspecting one polled task.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PollStep {
    Done(AskOutcome),
    Pending,
}

/// Classify a task snapshot returned by `tasks/get`.
pub(crate) fn inspect(task: &Task) -> PollStep {
    match task.status.state {
        TaskState::Completed => PollStep::Done(
            first_artifact_text(task)
                .map_or(AskOutcome::CompletedWithoutText, |t| {
                    AskOutcome::Answered(t.to_string())
                }),
        ),
        state @ (TaskState::Failed | TaskState::Canceled | TaskState::Rejected) => {
            PollStep::Done(AskOutcome::Failed(state))
        }
        _ => PollStep::Pending,
    }
}

/// First text part, scanning artifacts in order and parts in order.
pub fn first_artifact_text(task: &Task) -> Option<&str> {
    task.artifacts
        .iter()
        .flat_map(|a| a.parts.iter())
        .find_map(super::types::Part::as_text)
}

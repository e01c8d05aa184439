//! A2A tool agent.
//!
//! Serves its card at `/.well-known/agent-card.json` and accepts
//! `message/send`, `tasks/get` and `tasks/cancel` on `POST /`. Each message
//! becomes a task that a [`Responder`] completes in the background.

mod card;
mod responder;
mod server;
mod tasks;

pub use card::{AGENT_DESCRIPTION, build_card};
pub use responder::{HELP_TEXT, KeywordResponder, LlmResponder, Responder, SYSTEM_PROMPT};
pub use server::{AgentState, router};
pub use tasks::{CancelError, TaskStore};

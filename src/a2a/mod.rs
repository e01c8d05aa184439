//! Agent-to-Agent (A2A) protocol support.
//!
//! - [`types`]: cards, messages, tasks and JSON-RPC envelopes
//! - [`A2aClient`]: card discovery, `message/send`, `tasks/get` and the
//!   polling loop behind [`A2aClient::ask`]

mod client;
mod error;
mod task;
pub mod types;

pub use client::A2aClient;
pub use error::{A2aError, Result};
pub use task::{AskOutcome, PollPolicy, first_artifact_text};

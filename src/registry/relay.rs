use chrono::Utc;
use tracing::{info, warn};

use super::{HistoryEntry, RegistryState};
use crate::a2a::A2aClient;
use crate::error::RegistryError;

/// Forward `message` to a registered agent and record the exchange,
/// stamped with the time the message arrived.
///
/// Failed and timed-out tasks still produce an answer; they are only
/// flagged as errors in the history. Transport and protocol failures are
/// recorded too and surface as [`RegistryError::Relay`].
pub async fn relay_message(
    state: &RegistryState,
    agent_url: &str,
    message: &str,
) -> Result<String, RegistryError> {
    let received_at = Utc::now();
    let agent = state
        .directory
        .get(agent_url)
        .ok_or(RegistryError::AgentNotRegistered)?;

    let outcome = match A2aClient::new(&agent.url, state.relay_timeout) {
        Ok(client) => client.ask(message, &state.poll_policy).await,
        Err(e) => Err(e),
    };

    let (response, is_error, result) = match outcome {
        Ok(outcome) => {
            let text = outcome.response_text();
            info!(
                name: "registry.relay.answered",
                agent = %agent.name,
                is_error = outcome.is_error(),
                "Relayed message to agent"
            );
            (text.clone(), outcome.is_error(), Ok(text))
        }
        Err(e) => {
            warn!(
                name: "registry.relay.failed",
                agent = %agent.name,
                error = %e,
                "Failed to relay message"
            );
            (
                format!("Error: {e}"),
                true,
                Err(RegistryError::Relay(e.to_string())),
            )
        }
    };

    state.history.record(HistoryEntry {
        agent_name: agent.name,
        agent_url: agent.url,
        message: message.to_string(),
        response,
        is_error,
        timestamp: received_at,
    });

    result
}

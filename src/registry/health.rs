use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::RegistryState;

/// Result of one health sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub healthy: Vec<String>,
    pub removed: Vec<String>,
}

/// Request every agent's card once, concurrently. Agents answering 2xx get
/// a fresh `last_seen`; the rest are removed.
///
/// Works on a snapshot of the directory so registrations are never blocked
/// behind network calls. Agents unregistered mid-sweep are skipped.
pub async fn sweep(state: &RegistryState) -> SweepReport {
    let checks = state
        .directory
        .card_targets()
        .into_iter()
        .map(|(url, card_url)| async move {
            let result = state.check_card(&card_url).await;
            (url, result)
        });

    let mut report = SweepReport::default();
    for (url, result) in join_all(checks).await {
        match result {
            Ok(()) => {
                if state.directory.touch(&url, Utc::now()) {
                    debug!(name: "registry.health.ok", agent_url = %url, "Agent healthy");
                    report.healthy.push(url);
                }
            }
            Err(e) => {
                if let Some(record) = state.directory.remove(&url) {
                    warn!(
                        name: "registry.health.removed",
                        agent = %record.name,
                        agent_url = %url,
                        error = %e,
                        "Removed unreachable agent"
                    );
                    report.removed.push(url);
                }
            }
        }
    }

    report
}

/// Run [`sweep`] every `interval` until `cancel` fires. Empty directories
/// are skipped.
pub fn spawn_sweeper(
    state: RegistryState,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            name: "registry.health.started",
            interval_secs = interval.as_secs(),
            "Health sweeper started"
        );
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
            if state.directory.is_empty() {
                continue;
            }
            let report = sweep(&state).await;
            info!(
                name: "registry.health.swept",
                healthy = report.healthy.len(),
                removed = report.removed.len(),
                "Health sweep finished"
            );
        }
        info!(name: "registry.health.stopped", "Health sweeper stopped");
    })
}

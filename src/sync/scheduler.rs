use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::SyncOrchestrator;

/// Background sweep: every `period`, `sync_all` for each user that owns a connection.
pub struct SyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    period: Duration,
}

impl SyncScheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, period: Duration) -> Self {
        Self {
            orchestrator,
            period,
        }
    }

    /// Runs until `shutdown` fires. A sweep in flight observes the same token.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = self.period.as_secs(), "Sync scheduler started");
            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; start with a full period of quiet.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => self.sweep(&shutdown).await,
                }
            }
            info!("Sync scheduler stopped");
        })
    }

    pub async fn sweep(&self, cancel: &CancellationToken) {
        let users = match self.orchestrator.store().list_users().await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "Scheduler failed to list users");
                return;
            }
        };

        for user_id in users {
            if cancel.is_cancelled() {
                break;
            }
            if let Err(e) = self.orchestrator.sync_all(&user_id, cancel).await {
                warn!(user_id, error = %e, "Scheduled sync_all failed");
            }
        }
    }
}

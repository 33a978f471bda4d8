//! Periodic participant duration checkpoint
//!
//! While a participant is connected their stored duration lags behind by the
//! time since `join_time`. This service folds that stretch in on a fixed
//! interval so the listing endpoints report live durations, and closes the
//! sessions of clients that stopped refreshing without leaving.

use meetly_common::config::TrackerSection;
use meetly_common::db::participants::{checkpoint_active, CheckpointOutcome, DEFAULT_PRESENCE_TIMEOUT_SECS};
use meetly_common::time::now;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Checkpoint service configuration
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    /// Interval between checkpoints (default: 30s)
    pub interval: Duration,
    /// Time without a client refresh before a session is closed (default: 60s)
    pub presence_timeout: Duration,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            presence_timeout: Duration::from_secs(DEFAULT_PRESENCE_TIMEOUT_SECS),
        }
    }
}

impl From<&TrackerSection> for CheckpointConfig {
    fn from(tracker: &TrackerSection) -> Self {
        Self {
            interval: Duration::from_secs(tracker.checkpoint_interval_secs.max(1)),
            presence_timeout: Duration::from_secs(tracker.presence_timeout_secs.max(1)),
        }
    }
}

pub struct CheckpointService {
    config: CheckpointConfig,
    db: SqlitePool,
}

impl CheckpointService {
    pub fn new(config: CheckpointConfig, db: SqlitePool) -> Self {
        Self { config, db }
    }

    /// Run one checkpoint pass now
    pub async fn checkpoint_once(&self) -> meetly_common::Result<CheckpointOutcome> {
        let outcome = checkpoint_active(&self.db, now(), self.config.presence_timeout).await?;
        if outcome != CheckpointOutcome::default() {
            debug!(
                "Checkpoint: {} credited, {} closed, {} skipped",
                outcome.credited, outcome.closed, outcome.skipped
            );
        }
        Ok(outcome)
    }

    /// Spawn the background loop; it exits when `cancel` fires
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            "Starting CheckpointService (interval: {:?}, presence timeout: {:?})",
            self.config.interval, self.config.presence_timeout
        );

        tokio::spawn(async move {
            let mut timer = interval(self.config.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // First tick completes immediately, closing sessions left open
            // while the server was down
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {
                        if let Err(e) = self.checkpoint_once().await {
                            error!("Participant checkpoint failed: {}", e);
                        }
                    }
                }
            }

            // Count the last stretch before shutting down
            if let Err(e) = self.checkpoint_once().await {
                error!("Final participant checkpoint failed: {}", e);
            }
            info!("CheckpointService stopped");
        })
    }
}

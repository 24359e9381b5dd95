//! # Streak Scheduler
//!
//! Background task that periodically runs the activity-streak sweep, demoting
//! repositories that have gone quiet. Each tick is independent; a failed sweep
//! is logged and retried on the next tick.

use std::sync::Arc;

use chrono::Utc;
use metrics::histogram;
use tokio::time::{Duration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::detection::{StreakMonitor, SweepSummary};
use crate::error::RepositoryError;
use crate::store::FactStore;

/// Background scheduler service.
pub struct StreakScheduler {
    monitor: StreakMonitor,
    tick_interval: Duration,
}

impl StreakScheduler {
    pub fn new(config: &AppConfig, store: Arc<dyn FactStore>) -> Self {
        Self {
            monitor: StreakMonitor::from_config(store, &config.detection),
            tick_interval: Duration::from_secs(config.streak_sweep_interval_seconds),
        }
    }

    /// Override the tick interval (primarily for tests).
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_seconds = self.tick_interval.as_secs(),
            "Starting streak scheduler"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Streak scheduler shutdown requested");
                    break;
                }
                _ = sleep(self.tick_interval) => {
                    let tick_started = Instant::now();
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "Streak sweep failed");
                    }
                    histogram!("streak_sweep_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Streak scheduler stopped");
    }

    /// Run a single sweep as of now.
    pub async fn tick(&self) -> Result<SweepSummary, RepositoryError> {
        self.monitor.sweep(Utc::now()).await
    }
}

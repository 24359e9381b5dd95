//! Activity streak tracking.
//!
//! A push always resets a repository to `active`. The sweep moves repositories
//! that have gone quiet: `active` to `at_risk` after the inactivity window,
//! then `at_risk` to `inactive` after twice that window.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use super::AlertDraft;
use crate::config::DetectionConfig;
use crate::error::RepositoryError;
use crate::models::{AlertType, Severity, StreakStatus, tracked_repo};
use crate::store::FactStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub marked_at_risk: usize,
    pub marked_inactive: usize,
    pub failures: usize,
}

pub struct StreakMonitor {
    store: Arc<dyn FactStore>,
    inactivity: Duration,
}

impl StreakMonitor {
    pub fn new(store: Arc<dyn FactStore>, inactivity: Duration) -> Self {
        Self { store, inactivity }
    }

    pub fn from_config(store: Arc<dyn FactStore>, config: &DetectionConfig) -> Self {
        Self::new(store, Duration::hours(config.streak_inactivity_hours))
    }

    /// Run one sweep as of `now`.
    ///
    /// The `at_risk` to `inactive` pass runs first, so a repository moves at
    /// most one step per sweep. A failure on one repository does not stop the rest.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, RepositoryError> {
        let mut summary = SweepSummary::default();

        let dormant = self
            .store
            .list_stale_repositories(StreakStatus::AtRisk, now - self.inactivity * 2)
            .await?;
        for repo in dormant {
            match self
                .store
                .set_streak_status(repo.id, StreakStatus::Inactive)
                .await
            {
                Ok(()) => {
                    summary.marked_inactive += 1;
                    info!(repository = %repo.full_name, "Repository marked inactive");
                }
                Err(err) => {
                    summary.failures += 1;
                    error!(repository = %repo.full_name, error = %err, "Failed to mark repository inactive");
                }
            }
        }

        let quiet = self
            .store
            .list_stale_repositories(StreakStatus::Active, now - self.inactivity)
            .await?;
        for repo in quiet {
            match self.mark_at_risk(&repo, now).await {
                Ok(()) => {
                    summary.marked_at_risk += 1;
                    info!(repository = %repo.full_name, "Repository streak at risk");
                }
                Err(err) => {
                    summary.failures += 1;
                    error!(repository = %repo.full_name, error = %err, "Failed to mark repository at risk");
                }
            }
        }

        Ok(summary)
    }

    async fn mark_at_risk(
        &self,
        repo: &tracked_repo::Model,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.store
            .set_streak_status(repo.id, StreakStatus::AtRisk)
            .await?;

        let inactive_hours = repo
            .last_activity_at
            .map(|at| (now - at.with_timezone(&Utc)).num_hours())
            .unwrap_or_default();
        let alert = AlertDraft::new(
            AlertType::StreakAtRisk,
            Severity::Warning,
            "Activity streak at risk",
            format!("No pushes in the last {inactive_hours} hours"),
        )
        .with_metadata(json!({
            "last_activity_at": repo.last_activity_at.map(|at| at.to_rfc3339()),
            "inactive_hours": inactive_hours,
            "threshold_hours": self.inactivity.num_hours(),
        }));

        self.store.insert_alert(repo.id, &alert).await?;
        counter!("alerts_raised_total", "type" => AlertType::StreakAtRisk.as_str()).increment(1);
        Ok(())
    }
}

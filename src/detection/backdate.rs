//! Backdated commit detection.
//!
//! The lag is measured against the time the push was received, never the time
//! the detector happens to run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use super::AlertDraft;
use crate::config::DetectionConfig;
use crate::models::{AlertType, Severity};

/// Classification of one commit's author-time lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackdateVerdict {
    /// `received_at - authored_at` in whole hours, truncated toward zero.
    /// Negative when the author clock runs ahead of ours.
    pub diff_hours: i64,
    pub suspicious: bool,
    pub critical: bool,
}

impl BackdateVerdict {
    pub fn is_backdated(&self) -> bool {
        self.suspicious
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackdateDetector {
    suspicious_hours: i64,
    critical_hours: i64,
}

impl BackdateDetector {
    pub fn new(suspicious_hours: i64, critical_hours: i64) -> Self {
        Self {
            suspicious_hours,
            critical_hours,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            config.backdate_suspicious_hours,
            config.backdate_critical_hours,
        )
    }

    pub fn evaluate(&self, authored_at: DateTime<Utc>, received_at: DateTime<Utc>) -> BackdateVerdict {
        let diff_hours = (received_at - authored_at).num_hours();
        let critical = diff_hours > self.critical_hours;

        BackdateVerdict {
            diff_hours,
            suspicious: critical || diff_hours > self.suspicious_hours,
            critical,
        }
    }

    /// The single alert for a flagged commit, or `None` when it is not backdated.
    pub fn alert_for(
        &self,
        sha: &str,
        verdict: &BackdateVerdict,
        authored_at: DateTime<Utc>,
        received_at: DateTime<Utc>,
    ) -> Option<AlertDraft> {
        if !verdict.is_backdated() {
            return None;
        }

        let draft = if verdict.critical {
            AlertDraft::new(
                AlertType::BackdateCritical,
                Severity::Critical,
                "Backdated commit detected",
                format!(
                    "Commit author date is {} hours older than the push (critical threshold {}h)",
                    verdict.diff_hours, self.critical_hours
                ),
            )
        } else {
            AlertDraft::new(
                AlertType::BackdateSuspicious,
                Severity::Warning,
                "Suspicious backdated commit",
                format!(
                    "Commit author date is {} hours older than the push (suspicious threshold {}h)",
                    verdict.diff_hours, self.suspicious_hours
                ),
            )
        };

        Some(draft.for_commit(sha).with_metadata(json!({
            "author_date": authored_at.to_rfc3339(),
            "pushed_at": received_at.to_rfc3339(),
            "backdate_hours": verdict.diff_hours,
        })))
    }
}

//! Detectors that turn commit and repository facts into alerts.
//!
//! Detectors never write to storage themselves. They return [`AlertDraft`]s and
//! the caller decides where those go.

pub mod backdate;
pub mod streak;

use serde_json::Value as JsonValue;

use crate::models::{AlertType, Severity};

pub use backdate::{BackdateDetector, BackdateVerdict};
pub use streak::{StreakMonitor, SweepSummary};

/// An alert that has been decided on but not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub commit_sha: Option<String>,
    pub title: String,
    pub description: String,
    pub metadata: JsonValue,
}

impl AlertDraft {
    pub fn new(
        alert_type: AlertType,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            alert_type,
            severity,
            commit_sha: None,
            title: title.into(),
            description: description.into(),
            metadata: JsonValue::Object(Default::default()),
        }
    }

    pub fn for_commit(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = Some(sha.into());
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

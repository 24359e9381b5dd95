//! # Fact Store
//!
//! The storage collaborator the event pipeline and scorecard consume. Writes are
//! idempotent upserts keyed on natural identifiers; alerts are append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::detection::AlertDraft;
use crate::error::RepositoryError;
use crate::events::{CommitFact, InstallationRef, PushFacts, RepositoryRef};
use crate::models::{StreakStatus, alert, commit, contributor, tracked_repo};

pub mod database;
#[cfg(test)]
pub mod memory;

pub use database::DatabaseFactStore;

/// Result of recording a push against its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushRecorded {
    pub repository_id: Uuid,
    /// The push reported no license and the repository was not already known
    /// to be unlicensed.
    pub license_newly_missing: bool,
}

/// Everything the scorecard needs about one repository.
#[derive(Debug, Clone)]
pub struct ScorecardInputs {
    pub repository: tracked_repo::Model,
    pub commits: Vec<commit::Model>,
    pub contributors: Vec<contributor::Model>,
    pub alerts: Vec<alert::Model>,
}

/// Service-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct GlobalStats {
    pub installations: u64,
    pub repositories: u64,
    pub commits: u64,
    pub alerts: u64,
    pub active_repositories: u64,
    pub at_risk_repositories: u64,
    pub inactive_repositories: u64,
    pub backdate_alerts: u64,
    pub force_push_alerts: u64,
    pub alerts_by_severity: BTreeMap<String, u64>,
}

#[async_trait]
pub trait FactStore: Send + Sync {
    async fn upsert_installation(&self, installation: &InstallationRef)
    -> Result<(), RepositoryError>;

    /// Insert or refresh a repository, returning its internal id.
    async fn upsert_repository(
        &self,
        repository: &RepositoryRef,
        installation_id: Option<i64>,
    ) -> Result<Uuid, RepositoryError>;

    /// Mark the repository active as of the push and apply any license observation.
    async fn record_push(&self, push: &PushFacts) -> Result<PushRecorded, RepositoryError>;

    /// Returns `false` when a commit with the same sha already exists.
    async fn insert_commit(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<bool, RepositoryError>;

    /// Fold one newly recorded commit into the author's aggregate.
    async fn upsert_contributor(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<(), RepositoryError>;

    async fn insert_alert(
        &self,
        repository_id: Uuid,
        alert: &AlertDraft,
    ) -> Result<(), RepositoryError>;

    async fn find_repository_by_full_name(
        &self,
        full_name: &str,
    ) -> Result<Option<tracked_repo::Model>, RepositoryError>;

    async fn load_scorecard_inputs(
        &self,
        repository_id: Uuid,
    ) -> Result<ScorecardInputs, RepositoryError>;

    /// Repositories in `status` whose last activity is strictly before `inactive_since`.
    async fn list_stale_repositories(
        &self,
        status: StreakStatus,
        inactive_since: DateTime<Utc>,
    ) -> Result<Vec<tracked_repo::Model>, RepositoryError>;

    async fn set_streak_status(
        &self,
        repository_id: Uuid,
        status: StreakStatus,
    ) -> Result<(), RepositoryError>;

    async fn global_stats(&self) -> Result<GlobalStats, RepositoryError>;
}

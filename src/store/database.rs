//! SeaORM-backed [`FactStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use super::{FactStore, GlobalStats, PushRecorded, ScorecardInputs};
use crate::detection::AlertDraft;
use crate::error::RepositoryError;
use crate::events::{CommitFact, InstallationRef, PushFacts, RepositoryRef};
use crate::models::{AlertType, Severity, StreakStatus, tracked_repo};
use crate::repositories::{
    AlertRepository, CommitRepository, ContributorRepository, InstallationRepository,
    TrackedRepoRepository,
};

#[derive(Debug, Clone)]
pub struct DatabaseFactStore {
    installations: InstallationRepository,
    repositories: TrackedRepoRepository,
    commits: CommitRepository,
    contributors: ContributorRepository,
    alerts: AlertRepository,
}

impl DatabaseFactStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            installations: InstallationRepository::new(db.clone()),
            repositories: TrackedRepoRepository::new(db.clone()),
            commits: CommitRepository::new(db.clone()),
            contributors: ContributorRepository::new(db.clone()),
            alerts: AlertRepository::new(db),
        }
    }
}

#[async_trait]
impl FactStore for DatabaseFactStore {
    async fn upsert_installation(
        &self,
        installation: &InstallationRef,
    ) -> Result<(), RepositoryError> {
        self.installations.upsert(installation).await.map(|_| ())
    }

    async fn upsert_repository(
        &self,
        repository: &RepositoryRef,
        installation_id: Option<i64>,
    ) -> Result<Uuid, RepositoryError> {
        self.repositories
            .upsert(repository, installation_id)
            .await
            .map(|repo| repo.id)
    }

    async fn record_push(&self, push: &PushFacts) -> Result<PushRecorded, RepositoryError> {
        self.repositories.record_push(push).await
    }

    async fn insert_commit(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<bool, RepositoryError> {
        self.commits.insert_if_absent(repository_id, fact).await
    }

    async fn upsert_contributor(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<(), RepositoryError> {
        self.contributors.record_commit(repository_id, fact).await
    }

    async fn insert_alert(
        &self,
        repository_id: Uuid,
        alert: &AlertDraft,
    ) -> Result<(), RepositoryError> {
        self.alerts.insert(repository_id, alert).await.map(|_| ())
    }

    async fn find_repository_by_full_name(
        &self,
        full_name: &str,
    ) -> Result<Option<tracked_repo::Model>, RepositoryError> {
        self.repositories.find_by_full_name(full_name).await
    }

    async fn load_scorecard_inputs(
        &self,
        repository_id: Uuid,
    ) -> Result<ScorecardInputs, RepositoryError> {
        let repository = self
            .repositories
            .find_by_id(repository_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Repository".to_string()))?;

        Ok(ScorecardInputs {
            repository,
            commits: self.commits.list_by_repository(repository_id).await?,
            contributors: self.contributors.list_by_repository(repository_id).await?,
            alerts: self.alerts.list_by_repository(repository_id).await?,
        })
    }

    async fn list_stale_repositories(
        &self,
        status: StreakStatus,
        inactive_since: DateTime<Utc>,
    ) -> Result<Vec<tracked_repo::Model>, RepositoryError> {
        self.repositories.list_stale(status, inactive_since).await
    }

    async fn set_streak_status(
        &self,
        repository_id: Uuid,
        status: StreakStatus,
    ) -> Result<(), RepositoryError> {
        self.repositories
            .set_streak_status(repository_id, status)
            .await
            .map(|_| ())
    }

    async fn global_stats(&self) -> Result<GlobalStats, RepositoryError> {
        let mut stats = GlobalStats {
            installations: self.installations.count().await?,
            repositories: self.repositories.count().await?,
            commits: self.commits.count().await?,
            alerts: self.alerts.count().await?,
            active_repositories: self
                .repositories
                .count_by_status(StreakStatus::Active)
                .await?,
            at_risk_repositories: self
                .repositories
                .count_by_status(StreakStatus::AtRisk)
                .await?,
            inactive_repositories: self
                .repositories
                .count_by_status(StreakStatus::Inactive)
                .await?,
            backdate_alerts: self
                .alerts
                .count_by_type(AlertType::BackdateSuspicious)
                .await?
                + self
                    .alerts
                    .count_by_type(AlertType::BackdateCritical)
                    .await?,
            force_push_alerts: self.alerts.count_by_type(AlertType::ForcePush).await?,
            ..Default::default()
        };

        for severity in [Severity::Info, Severity::Warning, Severity::Critical] {
            let count = self.alerts.count_by_severity(severity).await?;
            stats
                .alerts_by_severity
                .insert(severity.as_str().to_string(), count);
        }

        Ok(stats)
    }
}

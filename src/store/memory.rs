//! In-memory [`FactStore`] for unit tests, with per-sha failure injection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use super::{FactStore, GlobalStats, PushRecorded, ScorecardInputs};
use crate::detection::AlertDraft;
use crate::error::RepositoryError;
use crate::events::{CommitFact, InstallationRef, LicenseObservation, PushFacts, RepositoryRef};
use crate::models::{StreakStatus, alert, commit, contributor, tracked_repo};

#[derive(Default)]
struct State {
    installations: Vec<InstallationRef>,
    repositories: Vec<tracked_repo::Model>,
    commits: Vec<commit::Model>,
    contributors: Vec<contributor::Model>,
    alerts: Vec<alert::Model>,
}

#[derive(Default)]
pub struct MemoryFactStore {
    state: Mutex<State>,
    failing_shas: HashSet<String>,
    fail_push: bool,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `insert_commit` fail for this sha.
    pub fn failing_on(mut self, sha: &str) -> Self {
        self.failing_shas.insert(sha.to_string());
        self
    }

    /// Make `record_push` fail.
    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn commits(&self) -> Vec<commit::Model> {
        self.lock().commits.clone()
    }

    pub fn contributors(&self) -> Vec<contributor::Model> {
        self.lock().contributors.clone()
    }

    pub fn alerts(&self) -> Vec<alert::Model> {
        self.lock().alerts.clone()
    }

    pub fn repositories(&self) -> Vec<tracked_repo::Model> {
        self.lock().repositories.clone()
    }

    pub fn installations(&self) -> Vec<InstallationRef> {
        self.lock().installations.clone()
    }

    /// Seed a repository directly, bypassing push handling.
    pub fn insert_repository(&self, repository: tracked_repo::Model) {
        self.lock().repositories.push(repository);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn new_repository(repository: &RepositoryRef, installation_id: Option<i64>) -> tracked_repo::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    tracked_repo::Model {
        id: Uuid::new_v4(),
        github_id: repository.github_id,
        installation_id,
        owner: repository.owner.clone(),
        name: repository.name.clone(),
        full_name: repository.full_name.clone(),
        default_branch: repository.default_branch.clone(),
        has_license: false,
        license_spdx_id: None,
        license_checked_at: None,
        last_push_at: None,
        last_activity_at: None,
        streak_status: StreakStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

fn upsert_in(
    state: &mut State,
    repository: &RepositoryRef,
    installation_id: Option<i64>,
) -> usize {
    if let Some(idx) = state
        .repositories
        .iter()
        .position(|r| r.github_id == repository.github_id)
    {
        let existing = &mut state.repositories[idx];
        existing.full_name = repository.full_name.clone();
        if installation_id.is_some() {
            existing.installation_id = installation_id;
        }
        return idx;
    }
    state
        .repositories
        .push(new_repository(repository, installation_id));
    state.repositories.len() - 1
}

#[async_trait]
impl FactStore for MemoryFactStore {
    async fn upsert_installation(
        &self,
        installation: &InstallationRef,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        state
            .installations
            .retain(|i| i.installation_id != installation.installation_id);
        state.installations.push(installation.clone());
        Ok(())
    }

    async fn upsert_repository(
        &self,
        repository: &RepositoryRef,
        installation_id: Option<i64>,
    ) -> Result<Uuid, RepositoryError> {
        let mut state = self.lock();
        let idx = upsert_in(&mut state, repository, installation_id);
        Ok(state.repositories[idx].id)
    }

    async fn record_push(&self, push: &PushFacts) -> Result<PushRecorded, RepositoryError> {
        if self.fail_push {
            return Err(RepositoryError::Validation("injected failure".to_string()));
        }

        let mut state = self.lock();
        let idx = upsert_in(&mut state, &push.repository, push.installation_id);
        let repo = &mut state.repositories[idx];
        let already_unlicensed = repo.license_checked_at.is_some() && !repo.has_license;

        repo.last_push_at = Some(push.received_at.into());
        repo.last_activity_at = Some(push.received_at.into());
        repo.streak_status = StreakStatus::Active;
        match &push.license {
            LicenseObservation::NotReported => {}
            LicenseObservation::Missing => {
                repo.has_license = false;
                repo.license_spdx_id = None;
                repo.license_checked_at = Some(push.received_at.into());
            }
            LicenseObservation::Present { spdx_id } => {
                repo.has_license = true;
                repo.license_spdx_id = spdx_id.clone();
                repo.license_checked_at = Some(push.received_at.into());
            }
        }

        Ok(PushRecorded {
            repository_id: repo.id,
            license_newly_missing: push.license == LicenseObservation::Missing
                && !already_unlicensed,
        })
    }

    async fn insert_commit(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<bool, RepositoryError> {
        if self.failing_shas.contains(&fact.sha) {
            return Err(RepositoryError::Validation("injected failure".to_string()));
        }

        let mut state = self.lock();
        if state.commits.iter().any(|c| c.sha == fact.sha) {
            return Ok(false);
        }

        state.commits.push(commit::Model {
            id: Uuid::new_v4(),
            repository_id,
            sha: fact.sha.clone(),
            message: fact.message.clone(),
            author_email: fact.author.email.clone(),
            author_name: fact.author.name.clone().unwrap_or_default(),
            author_login: fact.author.login.clone(),
            author_date: fact.author_date.into(),
            pushed_at: fact.pushed_at.into(),
            additions: fact.additions as i32,
            deletions: fact.deletions as i32,
            is_conventional: fact.conventional.is_valid,
            conventional_type: fact.conventional.commit_type.clone(),
            conventional_scope: fact.conventional.scope.clone(),
            is_breaking: fact.conventional.breaking,
            is_backdated: fact.backdate.is_backdated(),
            backdate_hours: fact.backdate.diff_hours,
            created_at: Utc::now().into(),
        });
        Ok(true)
    }

    async fn upsert_contributor(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let authored: DateTimeWithTimeZone = fact.author_date.into();
        if let Some(existing) = state
            .contributors
            .iter_mut()
            .find(|c| c.repository_id == repository_id && c.email == fact.author.email)
        {
            existing.total_commits += 1;
            existing.total_additions += fact.additions as i64;
            existing.total_deletions += fact.deletions as i64;
            existing.first_commit_at =
                Some(existing.first_commit_at.map_or(authored, |f| f.min(authored)));
            existing.last_commit_at =
                Some(existing.last_commit_at.map_or(authored, |l| l.max(authored)));
            if existing.login.is_none() {
                existing.login = fact.author.login.clone();
            }
            if existing.name.is_none() {
                existing.name = fact.author.name.clone();
            }
            return Ok(());
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        state.contributors.push(contributor::Model {
            id: Uuid::new_v4(),
            repository_id,
            email: fact.author.email.clone(),
            login: fact.author.login.clone(),
            name: fact.author.name.clone(),
            total_commits: 1,
            total_additions: fact.additions as i64,
            total_deletions: fact.deletions as i64,
            first_commit_at: Some(authored),
            last_commit_at: Some(authored),
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn insert_alert(
        &self,
        repository_id: Uuid,
        draft: &AlertDraft,
    ) -> Result<(), RepositoryError> {
        self.lock().alerts.push(alert::Model {
            id: Uuid::new_v4(),
            repository_id,
            commit_sha: draft.commit_sha.clone(),
            alert_type: draft.alert_type,
            severity: draft.severity,
            title: draft.title.clone(),
            description: draft.description.clone(),
            metadata: draft.metadata.clone(),
            acknowledged: false,
            created_at: Utc::now().into(),
        });
        Ok(())
    }

    async fn find_repository_by_full_name(
        &self,
        full_name: &str,
    ) -> Result<Option<tracked_repo::Model>, RepositoryError> {
        Ok(self
            .lock()
            .repositories
            .iter()
            .find(|r| r.full_name == full_name)
            .cloned())
    }

    async fn load_scorecard_inputs(
        &self,
        repository_id: Uuid,
    ) -> Result<ScorecardInputs, RepositoryError> {
        let state = self.lock();
        let repository = state
            .repositories
            .iter()
            .find(|r| r.id == repository_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound("Repository".to_string()))?;

        Ok(ScorecardInputs {
            repository,
            commits: state
                .commits
                .iter()
                .filter(|c| c.repository_id == repository_id)
                .cloned()
                .collect(),
            contributors: state
                .contributors
                .iter()
                .filter(|c| c.repository_id == repository_id)
                .cloned()
                .collect(),
            alerts: state
                .alerts
                .iter()
                .filter(|a| a.repository_id == repository_id)
                .cloned()
                .collect(),
        })
    }

    async fn list_stale_repositories(
        &self,
        status: StreakStatus,
        inactive_since: DateTime<Utc>,
    ) -> Result<Vec<tracked_repo::Model>, RepositoryError> {
        Ok(self
            .lock()
            .repositories
            .iter()
            .filter(|r| r.streak_status == status)
            .filter(|r| r.last_activity_at.is_some_and(|at| at < inactive_since))
            .cloned()
            .collect())
    }

    async fn set_streak_status(
        &self,
        repository_id: Uuid,
        status: StreakStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let repo = state
            .repositories
            .iter_mut()
            .find(|r| r.id == repository_id)
            .ok_or_else(|| RepositoryError::NotFound("Repository".to_string()))?;
        repo.streak_status = status;
        Ok(())
    }

    async fn global_stats(&self) -> Result<GlobalStats, RepositoryError> {
        let state = self.lock();
        Ok(GlobalStats {
            installations: state.installations.len() as u64,
            repositories: state.repositories.len() as u64,
            commits: state.commits.len() as u64,
            alerts: state.alerts.len() as u64,
            ..Default::default()
        })
    }
}

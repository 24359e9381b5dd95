//! Tracked repository data access
//!
//! Owns repository identity, push timestamps, license state and the streak
//! status column.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::events::{LicenseObservation, PushFacts, RepositoryRef};
use crate::models::StreakStatus;
use crate::models::tracked_repo::{self, Entity as TrackedRepo};
use crate::store::PushRecorded;

/// Repository for tracked repository database operations
#[derive(Debug, Clone)]
pub struct TrackedRepoRepository {
    pub db: Arc<DatabaseConnection>,
}

impl TrackedRepoRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<tracked_repo::Model>, RepositoryError> {
        TrackedRepo::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_github_id(
        &self,
        github_id: i64,
    ) -> Result<Option<tracked_repo::Model>, RepositoryError> {
        TrackedRepo::find()
            .filter(tracked_repo::Column::GithubId.eq(github_id))
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_full_name(
        &self,
        full_name: &str,
    ) -> Result<Option<tracked_repo::Model>, RepositoryError> {
        TrackedRepo::find()
            .filter(tracked_repo::Column::FullName.eq(full_name))
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Insert a repository or refresh its identity. Activity and license state
    /// are left alone.
    pub async fn upsert(
        &self,
        repository: &RepositoryRef,
        installation_id: Option<i64>,
    ) -> Result<tracked_repo::Model, RepositoryError> {
        self.write(repository, installation_id, |_| {}).await
    }

    /// Record a push: refresh identity, mark active and apply the license observation.
    pub async fn record_push(&self, push: &PushFacts) -> Result<PushRecorded, RepositoryError> {
        let previous = self.find_by_github_id(push.repository.github_id).await?;
        let already_unlicensed = previous
            .as_ref()
            .is_some_and(|repo| repo.license_checked_at.is_some() && !repo.has_license);

        let received_at = push.received_at;
        let license = push.license.clone();
        let saved = self
            .write(&push.repository, push.installation_id, move |active| {
                active.last_push_at = Set(Some(received_at.into()));
                active.last_activity_at = Set(Some(received_at.into()));
                active.streak_status = Set(StreakStatus::Active);
                match &license {
                    LicenseObservation::NotReported => {}
                    LicenseObservation::Missing => {
                        active.has_license = Set(false);
                        active.license_spdx_id = Set(None);
                        active.license_checked_at = Set(Some(received_at.into()));
                    }
                    LicenseObservation::Present { spdx_id } => {
                        active.has_license = Set(true);
                        active.license_spdx_id = Set(spdx_id.clone());
                        active.license_checked_at = Set(Some(received_at.into()));
                    }
                }
            })
            .await?;

        Ok(PushRecorded {
            repository_id: saved.id,
            license_newly_missing: push.license == LicenseObservation::Missing
                && !already_unlicensed,
        })
    }

    async fn write<F>(
        &self,
        repository: &RepositoryRef,
        installation_id: Option<i64>,
        apply: F,
    ) -> Result<tracked_repo::Model, RepositoryError>
    where
        F: Fn(&mut tracked_repo::ActiveModel),
    {
        if let Some(existing) = self.find_by_github_id(repository.github_id).await? {
            return self.refresh(existing, repository, installation_id, &apply).await;
        }

        let now = Utc::now();
        let mut model = tracked_repo::ActiveModel {
            id: Set(Uuid::new_v4()),
            github_id: Set(repository.github_id),
            installation_id: Set(installation_id),
            owner: Set(repository.owner.clone()),
            name: Set(repository.name.clone()),
            full_name: Set(repository.full_name.clone()),
            default_branch: Set(repository.default_branch.clone()),
            has_license: Set(false),
            license_spdx_id: Set(None),
            license_checked_at: Set(None),
            last_push_at: Set(None),
            last_activity_at: Set(None),
            streak_status: Set(StreakStatus::Active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        apply(&mut model);

        match model.insert(&*self.db).await {
            Ok(created) => Ok(created),
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find_by_github_id(repository.github_id)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound("Repository".to_string()))?;
                self.refresh(existing, repository, installation_id, &apply).await
            }
            Err(err) => Err(RepositoryError::database_error(err)),
        }
    }

    async fn refresh<F>(
        &self,
        existing: tracked_repo::Model,
        repository: &RepositoryRef,
        installation_id: Option<i64>,
        apply: &F,
    ) -> Result<tracked_repo::Model, RepositoryError>
    where
        F: Fn(&mut tracked_repo::ActiveModel),
    {
        let mut active: tracked_repo::ActiveModel = existing.into();
        active.owner = Set(repository.owner.clone());
        active.name = Set(repository.name.clone());
        active.full_name = Set(repository.full_name.clone());
        if repository.default_branch.is_some() {
            active.default_branch = Set(repository.default_branch.clone());
        }
        if installation_id.is_some() {
            active.installation_id = Set(installation_id);
        }
        active.updated_at = Set(Utc::now().into());
        apply(&mut active);

        active
            .update(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Repositories in `status` with recorded activity strictly before `cutoff`.
    pub async fn list_stale(
        &self,
        status: StreakStatus,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<tracked_repo::Model>, RepositoryError> {
        let cutoff: DateTimeWithTimeZone = cutoff.into();
        TrackedRepo::find()
            .filter(tracked_repo::Column::StreakStatus.eq(status))
            .filter(tracked_repo::Column::LastActivityAt.is_not_null())
            .filter(tracked_repo::Column::LastActivityAt.lt(cutoff))
            .order_by_asc(tracked_repo::Column::LastActivityAt)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn set_streak_status(
        &self,
        id: Uuid,
        status: StreakStatus,
    ) -> Result<tracked_repo::Model, RepositoryError> {
        let repo = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Repository".to_string()))?;

        let mut active: tracked_repo::ActiveModel = repo.into();
        active.streak_status = Set(status);
        active.updated_at = Set(Utc::now().into());
        active
            .update(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        TrackedRepo::find()
            .count(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_by_status(&self, status: StreakStatus) -> Result<u64, RepositoryError> {
        TrackedRepo::find()
            .filter(tracked_repo::Column::StreakStatus.eq(status))
            .count(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

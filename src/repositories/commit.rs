//! Commit fact data access
//!
//! Commits are keyed by sha. A second insert of the same sha is a no-op.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::events::CommitFact;
use crate::models::commit::{self, Entity as Commit};

/// Repository for commit database operations
#[derive(Debug, Clone)]
pub struct CommitRepository {
    pub db: Arc<DatabaseConnection>,
}

impl CommitRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// `INSERT ... ON CONFLICT (sha) DO NOTHING`. Returns whether a row was written.
    pub async fn insert_if_absent(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<bool, RepositoryError> {
        let model = commit::ActiveModel {
            id: Set(Uuid::new_v4()),
            repository_id: Set(repository_id),
            sha: Set(fact.sha.clone()),
            message: Set(fact.message.clone()),
            author_email: Set(fact.author.email.clone()),
            author_name: Set(fact.author.name.clone().unwrap_or_default()),
            author_login: Set(fact.author.login.clone()),
            author_date: Set(fact.author_date.into()),
            pushed_at: Set(fact.pushed_at.into()),
            additions: Set(i32::try_from(fact.additions).unwrap_or(i32::MAX)),
            deletions: Set(i32::try_from(fact.deletions).unwrap_or(i32::MAX)),
            is_conventional: Set(fact.conventional.is_valid),
            conventional_type: Set(fact.conventional.commit_type.clone()),
            conventional_scope: Set(fact.conventional.scope.clone()),
            is_breaking: Set(fact.conventional.breaking),
            is_backdated: Set(fact.backdate.is_backdated()),
            backdate_hours: Set(fact.backdate.diff_hours),
            created_at: Set(Utc::now().into()),
        };

        let inserted = Commit::insert(model)
            .on_conflict(
                OnConflict::column(commit::Column::Sha)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(inserted > 0)
    }

    pub async fn find_by_sha(&self, sha: &str) -> Result<Option<commit::Model>, RepositoryError> {
        Commit::find()
            .filter(commit::Column::Sha.eq(sha))
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All commits of a repository, oldest author date first.
    pub async fn list_by_repository(
        &self,
        repository_id: Uuid,
    ) -> Result<Vec<commit::Model>, RepositoryError> {
        Commit::find()
            .filter(commit::Column::RepositoryId.eq(repository_id))
            .order_by_asc(commit::Column::AuthorDate)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Commit::find()
            .count(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

//! Contributor aggregate data access
//!
//! One row per (repository, author email). Counters are incremented in SQL so
//! concurrent deliveries never lose an update.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::events::CommitFact;
use crate::models::contributor::{self, Entity as Contributor};

/// Repository for contributor database operations
#[derive(Debug, Clone)]
pub struct ContributorRepository {
    pub db: Arc<DatabaseConnection>,
}

impl ContributorRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        repository_id: Uuid,
        email: &str,
    ) -> Result<Option<contributor::Model>, RepositoryError> {
        Contributor::find()
            .filter(contributor::Column::RepositoryId.eq(repository_id))
            .filter(contributor::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Most active contributors first.
    pub async fn list_by_repository(
        &self,
        repository_id: Uuid,
    ) -> Result<Vec<contributor::Model>, RepositoryError> {
        Contributor::find()
            .filter(contributor::Column::RepositoryId.eq(repository_id))
            .order_by_desc(contributor::Column::TotalCommits)
            .order_by_asc(contributor::Column::Email)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Count one new commit against its author.
    ///
    /// Login and name follow first-non-empty-wins: a stored value is never
    /// replaced, and an empty incoming value never clears one.
    pub async fn record_commit(
        &self,
        repository_id: Uuid,
        fact: &CommitFact,
    ) -> Result<(), RepositoryError> {
        if let Some(existing) = self.find(repository_id, &fact.author.email).await? {
            return self.increment(existing, fact).await;
        }

        let now = Utc::now();
        let authored: DateTimeWithTimeZone = fact.author_date.into();
        let model = contributor::ActiveModel {
            id: Set(Uuid::new_v4()),
            repository_id: Set(repository_id),
            email: Set(fact.author.email.clone()),
            login: Set(fact.author.login.clone()),
            name: Set(fact.author.name.clone()),
            total_commits: Set(1),
            total_additions: Set(fact.additions as i64),
            total_deletions: Set(fact.deletions as i64),
            first_commit_at: Set(Some(authored)),
            last_commit_at: Set(Some(authored)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match model.insert(&*self.db).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find(repository_id, &fact.author.email)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound("Contributor".to_string()))?;
                self.increment(existing, fact).await
            }
            Err(err) => Err(RepositoryError::database_error(err)),
        }
    }

    async fn increment(
        &self,
        existing: contributor::Model,
        fact: &CommitFact,
    ) -> Result<(), RepositoryError> {
        let authored: DateTimeWithTimeZone = fact.author_date.into();
        let first_commit_at = existing
            .first_commit_at
            .map_or(authored, |first| first.min(authored));
        let last_commit_at = existing
            .last_commit_at
            .map_or(authored, |last| last.max(authored));

        let mut update = Contributor::update_many()
            .col_expr(
                contributor::Column::TotalCommits,
                Expr::col(contributor::Column::TotalCommits).add(1),
            )
            .col_expr(
                contributor::Column::TotalAdditions,
                Expr::col(contributor::Column::TotalAdditions).add(fact.additions as i64),
            )
            .col_expr(
                contributor::Column::TotalDeletions,
                Expr::col(contributor::Column::TotalDeletions).add(fact.deletions as i64),
            )
            .col_expr(
                contributor::Column::FirstCommitAt,
                Expr::value(Some(first_commit_at)),
            )
            .col_expr(
                contributor::Column::LastCommitAt,
                Expr::value(Some(last_commit_at)),
            )
            .col_expr(
                contributor::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            );

        if is_blank(&existing.login) && fact.author.login.is_some() {
            update = update.col_expr(
                contributor::Column::Login,
                Expr::value(fact.author.login.clone()),
            );
        }
        if is_blank(&existing.name) && fact.author.name.is_some() {
            update = update.col_expr(
                contributor::Column::Name,
                Expr::value(fact.author.name.clone()),
            );
        }

        update
            .filter(contributor::Column::Id.eq(existing.id))
            .exec(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

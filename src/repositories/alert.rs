//! Alert data access
//!
//! Alerts are only ever inserted here; acknowledgement is out of band.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::detection::AlertDraft;
use crate::error::RepositoryError;
use crate::models::alert::{self, AlertType, Entity as Alert, Severity};

/// Repository for alert database operations
#[derive(Debug, Clone)]
pub struct AlertRepository {
    pub db: Arc<DatabaseConnection>,
}

impl AlertRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        repository_id: Uuid,
        draft: &AlertDraft,
    ) -> Result<alert::Model, RepositoryError> {
        let model = alert::ActiveModel {
            id: Set(Uuid::new_v4()),
            repository_id: Set(repository_id),
            commit_sha: Set(draft.commit_sha.clone()),
            alert_type: Set(draft.alert_type),
            severity: Set(draft.severity),
            title: Set(draft.title.clone()),
            description: Set(draft.description.clone()),
            metadata: Set(draft.metadata.clone()),
            acknowledged: Set(false),
            created_at: Set(Utc::now().into()),
        };

        model
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Newest first.
    pub async fn list_by_repository(
        &self,
        repository_id: Uuid,
    ) -> Result<Vec<alert::Model>, RepositoryError> {
        Alert::find()
            .filter(alert::Column::RepositoryId.eq(repository_id))
            .order_by_desc(alert::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Alert::find()
            .count(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_by_type(&self, alert_type: AlertType) -> Result<u64, RepositoryError> {
        Alert::find()
            .filter(alert::Column::AlertType.eq(alert_type))
            .count(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count_by_severity(&self, severity: Severity) -> Result<u64, RepositoryError> {
        Alert::find()
            .filter(alert::Column::Severity.eq(severity))
            .count(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

//! Installation repository for database operations

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::events::InstallationRef;
use crate::models::installation::{self, Entity as Installation};

/// Repository for installation database operations
#[derive(Debug, Clone)]
pub struct InstallationRepository {
    pub db: Arc<DatabaseConnection>,
}

impl InstallationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_installation_id(
        &self,
        installation_id: i64,
    ) -> Result<Option<installation::Model>, RepositoryError> {
        Installation::find()
            .filter(installation::Column::InstallationId.eq(installation_id))
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Insert the installation, or refresh the account details of an existing one.
    pub async fn upsert(
        &self,
        installation: &InstallationRef,
    ) -> Result<installation::Model, RepositoryError> {
        if let Some(existing) = self
            .find_by_installation_id(installation.installation_id)
            .await?
        {
            return self.refresh(existing, installation).await;
        }

        let now = Utc::now();
        let model = installation::ActiveModel {
            id: Set(Uuid::new_v4()),
            installation_id: Set(installation.installation_id),
            account_login: Set(installation.account_login.clone()),
            account_type: Set(installation.account_type.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match model.insert(&*self.db).await {
            Ok(created) => Ok(created),
            // Lost a race with a concurrent delivery for the same installation.
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find_by_installation_id(installation.installation_id)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound("Installation".to_string()))?;
                self.refresh(existing, installation).await
            }
            Err(err) => Err(RepositoryError::database_error(err)),
        }
    }

    async fn refresh(
        &self,
        existing: installation::Model,
        installation: &InstallationRef,
    ) -> Result<installation::Model, RepositoryError> {
        let mut active: installation::ActiveModel = existing.into();
        active.account_login = Set(installation.account_login.clone());
        active.account_type = Set(installation.account_type.clone());
        active.updated_at = Set(Utc::now().into());
        active
            .update(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        Installation::find()
            .count(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

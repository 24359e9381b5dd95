//! Contributor entity model
//!
//! Per-repository aggregate keyed by author email.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contributors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub repository_id: Uuid,

    pub email: String,

    pub login: Option<String>,

    pub name: Option<String>,

    pub total_commits: i32,

    pub total_additions: i64,

    pub total_deletions: i64,

    pub first_commit_at: Option<DateTimeWithTimeZone>,

    pub last_commit_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Login, then name, then email.
    pub fn display_name(&self) -> &str {
        self.login
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(&self.email)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tracked_repo::Entity",
        from = "Column::RepositoryId",
        to = "super::tracked_repo::Column::Id"
    )]
    Repository,
}

impl Related<super::tracked_repo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

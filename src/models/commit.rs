//! Commit entity model
//!
//! A commit fact is written once per sha at ingestion time and never updated.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "commits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub repository_id: Uuid,

    #[sea_orm(unique)]
    pub sha: String,

    pub message: String,

    pub author_email: String,

    pub author_name: String,

    /// GitHub username, when the author is linked to an account
    pub author_login: Option<String>,

    /// Time the commit claims it was authored
    pub author_date: DateTimeWithTimeZone,

    /// Time the push carrying this commit was received
    pub pushed_at: DateTimeWithTimeZone,

    pub additions: i32,

    pub deletions: i32,

    pub is_conventional: bool,

    pub conventional_type: Option<String>,

    pub conventional_scope: Option<String>,

    pub is_breaking: bool,

    pub is_backdated: bool,

    /// Whole hours between authoring and push receipt; negative under clock skew
    pub backdate_hours: i64,

    pub created_at: DateTimeWithTimeZone,
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

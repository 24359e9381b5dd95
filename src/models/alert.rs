//! Alert entity model
//!
//! Alerts are append-only. Only `acknowledged` may change after insert.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub repository_id: Uuid,

    /// Set for commit-level alerts
    pub commit_sha: Option<String>,

    pub alert_type: AlertType,

    pub severity: Severity,

    pub title: String,

    pub description: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: JsonValue,

    pub acknowledged: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    #[sea_orm(string_value = "backdate_suspicious")]
    BackdateSuspicious,

    #[sea_orm(string_value = "backdate_critical")]
    BackdateCritical,

    #[sea_orm(string_value = "force_push")]
    ForcePush,

    #[sea_orm(string_value = "no_license")]
    NoLicense,

    #[sea_orm(string_value = "streak_at_risk")]
    StreakAtRisk,

    #[sea_orm(string_value = "non_conventional_commit")]
    NonConventionalCommit,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::BackdateSuspicious => "backdate_suspicious",
            AlertType::BackdateCritical => "backdate_critical",
            AlertType::ForcePush => "force_push",
            AlertType::NoLicense => "no_license",
            AlertType::StreakAtRisk => "streak_at_risk",
            AlertType::NonConventionalCommit => "non_conventional_commit",
        }
    }

    pub fn is_backdate(&self) -> bool {
        matches!(
            self,
            AlertType::BackdateSuspicious | AlertType::BackdateCritical
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "info")]
    Info,

    #[sea_orm(string_value = "warning")]
    Warning,

    #[sea_orm(string_value = "critical")]
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
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

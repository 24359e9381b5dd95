//! Tracked repository entity model
//!
//! Maps the `repositories` table. Named `tracked_repo` to keep it apart from
//! the data-access layer in `crate::repositories`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Repository id assigned by GitHub
    #[sea_orm(unique)]
    pub github_id: i64,

    pub installation_id: Option<i64>,

    pub owner: String,

    pub name: String,

    /// `owner/name`
    #[sea_orm(unique)]
    pub full_name: String,

    pub default_branch: Option<String>,

    pub has_license: bool,

    /// SPDX identifier of the detected license, when GitHub reports one
    pub license_spdx_id: Option<String>,

    /// Last time a push reported license state.
    pub license_checked_at: Option<DateTimeWithTimeZone>,

    pub last_push_at: Option<DateTimeWithTimeZone>,

    pub last_activity_at: Option<DateTimeWithTimeZone>,

    pub streak_status: StreakStatus,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

/// Activity streak state of a repository.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum StreakStatus {
    #[sea_orm(string_value = "active")]
    #[default]
    Active,

    #[sea_orm(string_value = "at_risk")]
    AtRisk,

    #[sea_orm(string_value = "inactive")]
    Inactive,
}

impl StreakStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakStatus::Active => "active",
            StreakStatus::AtRisk => "at_risk",
            StreakStatus::Inactive => "inactive",
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::commit::Entity")]
    Commit,

    #[sea_orm(has_many = "super::contributor::Entity")]
    Contributor,

    #[sea_orm(has_many = "super::alert::Entity")]
    Alert,
}

impl Related<super::commit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commit.def()
    }
}

impl Related<super::contributor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributor.def()
    }
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alert.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

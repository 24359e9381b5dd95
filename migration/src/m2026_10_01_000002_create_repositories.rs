//! Migration to create the repositories table.
//!
//! Tracks every repository the app has been installed on or received a push for,
//! along with license state and the activity streak status.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Repositories::GithubId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Repositories::InstallationId).big_integer().null())
                    .col(ColumnDef::new(Repositories::Owner).text().not_null())
                    .col(ColumnDef::new(Repositories::Name).text().not_null())
                    .col(ColumnDef::new(Repositories::FullName).text().not_null())
                    .col(ColumnDef::new(Repositories::DefaultBranch).text().null())
                    .col(
                        ColumnDef::new(Repositories::HasLicense)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Repositories::LicenseSpdxId).text().null())
                    .col(
                        ColumnDef::new(Repositories::LicenseCheckedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastPushAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::LastActivityAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::StreakStatus)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Repositories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_full_name")
                    .table(Repositories::Table)
                    .col(Repositories::FullName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Streak sweeps filter on status and scan by last activity.
        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_streak_activity")
                    .table(Repositories::Table)
                    .col(Repositories::StreakStatus)
                    .col(Repositories::LastActivityAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_repositories_streak_activity").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_repositories_full_name").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
    GithubId,
    InstallationId,
    Owner,
    Name,
    FullName,
    DefaultBranch,
    HasLicense,
    LicenseSpdxId,
    LicenseCheckedAt,
    LastPushAt,
    LastActivityAt,
    StreakStatus,
    CreatedAt,
    UpdatedAt,
}

//! Migration to create the alerts table.
//!
//! Alerts are append-only; only the acknowledged flag changes after insert.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Alerts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alerts::RepositoryId).uuid().not_null())
                    .col(ColumnDef::new(Alerts::CommitSha).text().null())
                    .col(ColumnDef::new(Alerts::AlertType).text().not_null())
                    .col(ColumnDef::new(Alerts::Severity).text().not_null())
                    .col(ColumnDef::new(Alerts::Title).text().not_null())
                    .col(ColumnDef::new(Alerts::Description).text().not_null())
                    .col(ColumnDef::new(Alerts::Metadata).json_binary().not_null())
                    .col(
                        ColumnDef::new(Alerts::Acknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_repository_id")
                            .from(Alerts::Table, Alerts::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_repository_type")
                    .table(Alerts::Table)
                    .col(Alerts::RepositoryId)
                    .col(Alerts::AlertType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_alerts_repository_type").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Alerts {
    Table,
    Id,
    RepositoryId,
    CommitSha,
    AlertType,
    Severity,
    Title,
    Description,
    Metadata,
    Acknowledged,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Id,
}

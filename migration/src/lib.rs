//! Database migrations for the repo-signals service.
//!
//! Each migration owns one table of the fact store: installations, tracked
//! repositories, commit facts, contributor aggregates and alerts.

pub use sea_orm_migration::prelude::*;

mod m2026_10_01_000001_create_installations;
mod m2026_10_01_000002_create_repositories;
mod m2026_10_01_000003_create_commits;
mod m2026_10_01_000004_create_contributors;
mod m2026_10_01_000005_create_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_10_01_000001_create_installations::Migration),
            Box::new(m2026_10_01_000002_create_repositories::Migration),
            Box::new(m2026_10_01_000003_create_commits::Migration),
            Box::new(m2026_10_01_000004_create_contributors::Migration),
            Box::new(m2026_10_01_000005_create_alerts::Migration),
        ]
    }
}

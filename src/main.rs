//! # Repo Signals Entry Point
//!
//! `serve` (the default) runs the webhook API and the streak scheduler.
//! `migrate` applies schema migrations and exits. `sweep-streaks` runs one
//! streak sweep and exits, for cron-style deployments.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use repo_signals::{
    config::ConfigLoader,
    db::{init_pool, run_migrations},
    scheduler::StreakScheduler,
    server::run_server,
    store::{DatabaseFactStore, FactStore},
    telemetry::init_tracing,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "repo-signals",
    about = "Repository health signals from GitHub App webhooks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Run the HTTP API and the background streak scheduler
    #[default]
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Run one activity-streak sweep and exit
    SweepStreaks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = Arc::new(ConfigLoader::new().load()?);
    init_tracing(&config)?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = Arc::new(init_pool(&config).await?);
    run_migrations(&db).await?;

    match cli.command.unwrap_or_default() {
        Command::Migrate => Ok(()),
        Command::SweepStreaks => {
            let store: Arc<dyn FactStore> = Arc::new(DatabaseFactStore::new(db));
            let summary = StreakScheduler::new(&config, store).tick().await?;
            info!(
                marked_at_risk = summary.marked_at_risk,
                marked_inactive = summary.marked_inactive,
                failures = summary.failures,
                "Streak sweep complete"
            );
            Ok(())
        }
        Command::Serve => serve(config, db).await,
    }
}

async fn serve(
    config: Arc<repo_signals::config::AppConfig>,
    db: Arc<sea_orm::DatabaseConnection>,
) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let store: Arc<dyn FactStore> = Arc::new(DatabaseFactStore::new(db.clone()));
    let scheduler = StreakScheduler::new(&config, store);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!(error = %err, "Failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    let served = run_server(config, db, shutdown.clone()).await;
    shutdown.cancel();
    scheduler_handle
        .await
        .context("Streak scheduler task panicked")?;

    served
}

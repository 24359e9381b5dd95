//! # Server Configuration
//!
//! Router assembly, shared state, and the HTTP listener for the Repo Signals API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::events::{EventProcessor, EventRouter};
use crate::handlers;
use crate::store::{DatabaseFactStore, FactStore};
use crate::telemetry::trace_context_middleware;
use crate::webhook_verification::SignatureVerifier;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub store: Arc<dyn FactStore>,
    pub processor: EventProcessor,
    pub verifier: SignatureVerifier,
}

impl AppState {
    /// Wire the database-backed store and the event pipeline from configuration.
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Self {
        let store: Arc<dyn FactStore> = Arc::new(DatabaseFactStore::new(db.clone()));
        Self::with_store(config, db, store)
    }

    pub fn with_store(
        config: Arc<AppConfig>,
        db: Arc<DatabaseConnection>,
        store: Arc<dyn FactStore>,
    ) -> Self {
        let router = EventRouter::from_config(&config.detection);
        let processor = EventProcessor::new(router, store.clone());
        let verifier = SignatureVerifier::from_config(&config);
        Self {
            config,
            db,
            store,
            processor,
            verifier,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/webhooks/github",
            post(handlers::github_webhook)
                .layer(DefaultBodyLimit::max(handlers::webhooks::MAX_WEBHOOK_BODY_BYTES)),
        )
        .route("/scorecard", get(handlers::get_scorecard))
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_context_middleware))
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn run_server(
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = config.bind_addr().context("Invalid server address")?;
    let app = create_app(AppState::new(config.clone(), db));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        %addr,
        profile = %config.profile,
        signature_verification = config.webhook_github_secret.as_deref().is_some_and(|s| !s.is_empty()),
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::webhooks::github_webhook,
        crate::handlers::scorecard::get_scorecard,
        crate::handlers::stats::get_stats,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::WebhookResponse,
            crate::events::DeliveryOutcome,
            crate::events::DeliveryStatus,
            crate::scorecard::Scorecard,
            crate::store::GlobalStats,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "webhooks", description = "GitHub App webhook intake"),
        (name = "scorecard", description = "Per-repository health reports"),
        (name = "stats", description = "Service-wide counters"),
    ),
    info(
        title = "Repo Signals API",
        description = "Repository health signals derived from GitHub App webhooks",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

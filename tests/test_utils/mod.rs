//! Test utilities for database-backed tests.
//!
//! Provides a migrated in-memory SQLite database, an app router wired to it,
//! and helpers for building signed GitHub deliveries.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use repo_signals::{
    config::AppConfig,
    db::{init_pool, run_migrations},
    server::{AppState, create_app},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use sha2::Sha256;

pub const TEST_SECRET: &str = "integration-secret";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<Arc<DatabaseConnection>> {
    let config = test_config();
    let db = init_pool(&config).await?;
    run_migrations(&db).await?;
    Ok(Arc::new(db))
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        webhook_github_secret: Some(TEST_SECRET.to_string()),
        ..Default::default()
    }
}

/// A migrated database plus the full router on top of it.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let db = setup_test_db().await?;
        let state = AppState::new(Arc::new(test_config()), db.clone());
        Ok(Self {
            db,
            router: create_app(state),
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn deliver(&self, event: &str, delivery_id: &str, body: &Value) -> Response<Body> {
        let bytes = serde_json::to_vec(body).expect("serializable payload");
        let signature = sign(&bytes);
        self.send(signed_request(event, delivery_id, &signature, bytes))
            .await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }
}

pub fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(TEST_SECRET.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn signed_request(
    event: &str,
    delivery_id: &str,
    signature: &str,
    body: Vec<u8>,
) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/github")
        .header("content-type", "application/json")
        .header("X-GitHub-Event", event)
        .header("X-GitHub-Delivery", delivery_id)
        .header("X-Hub-Signature-256", signature)
        .body(Body::from(body))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// One push commit entry.
pub fn commit_json(
    sha: &str,
    message: &str,
    email: &str,
    username: &str,
    authored: DateTime<Utc>,
) -> Value {
    json!({
        "id": sha,
        "message": message,
        "timestamp": authored.to_rfc3339(),
        "author": {"name": username, "email": email, "username": username}
    })
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

pub fn push_payload(full_name: &str, forced: bool, license: Value, commits: Vec<Value>) -> Value {
    let (owner, name) = full_name.split_once('/').expect("owner/name");
    json!({
        "ref": "refs/heads/main",
        "before": "1111111111111111111111111111111111111111",
        "after": "2222222222222222222222222222222222222222",
        "forced": forced,
        "repository": {
            "id": 9001,
            "name": name,
            "full_name": full_name,
            "owner": {"login": owner},
            "default_branch": "main",
            "license": license
        },
        "pusher": {"name": "ada"},
        "installation": {"id": 55},
        "commits": commits
    })
}

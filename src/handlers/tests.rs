//! # Tests for Handlers
//!
//! Router-level tests against the in-memory fact store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use hmac::{Hmac, Mac};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use sha2::Sha256;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::server::{AppState, create_app};
use crate::store::memory::MemoryFactStore;

const SECRET: &str = "handler-test-secret";

fn app_with(store: Arc<MemoryFactStore>, secret: Option<&str>) -> Router {
    let config = AppConfig {
        webhook_github_secret: secret.map(str::to_owned),
        ..Default::default()
    };
    let state = AppState::with_store(
        Arc::new(config),
        Arc::new(DatabaseConnection::default()),
        store,
    );
    create_app(state)
}

fn sign(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn push_body() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "ref": "refs/heads/main",
        "before": "000",
        "after": "abc",
        "forced": false,
        "repository": {
            "id": 7,
            "name": "widgets",
            "full_name": "acme/widgets",
            "owner": {"login": "acme"},
            "license": {"spdx_id": "MIT"}
        },
        "pusher": {"name": "ada"},
        "commits": [{
            "id": "abc",
            "message": "feat: add widget",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "author": {"name": "Ada", "email": "ada@example.com", "username": "ada"}
        }]
    }))
    .unwrap()
}

fn webhook(event: Option<&str>, signature: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/github")
        .header("content-type", "application/json")
        .header("X-GitHub-Delivery", "delivery-1");
    if let Some(event) = event {
        builder = builder.header("X-GitHub-Event", event);
    }
    if let Some(signature) = signature {
        builder = builder.header("X-Hub-Signature-256", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_returns_service_info() {
    let app = app_with(Arc::new(MemoryFactStore::new()), None);
    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["service"], "repo-signals");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_healthz_without_database_is_unavailable() {
    let app = app_with(Arc::new(MemoryFactStore::new()), None);
    let response = app.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_signed_push_is_processed() {
    let store = Arc::new(MemoryFactStore::new());
    let app = app_with(store.clone(), Some(SECRET));
    let body = push_body();
    let signature = sign(&body);

    let response = app
        .oneshot(webhook(Some("push"), Some(&signature), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "processed");
    assert_eq!(body["event"], "push");
    assert_eq!(body["delivery_id"], "delivery-1");
    assert_eq!(body["commits_recorded"], 1);
    assert_eq!(store.commits().len(), 1);
}

#[tokio::test]
async fn test_unsigned_push_is_rejected_and_nothing_stored() {
    let store = Arc::new(MemoryFactStore::new());
    let app = app_with(store.clone(), Some(SECRET));

    let response = app
        .oneshot(webhook(Some("push"), None, push_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.commits().is_empty());
    assert!(store.repositories().is_empty());
}

#[tokio::test]
async fn test_signature_over_different_body_is_rejected() {
    let store = Arc::new(MemoryFactStore::new());
    let app = app_with(store.clone(), Some(SECRET));
    let signature = sign(b"{}");

    let response = app
        .oneshot(webhook(Some("push"), Some(&signature), push_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.commits().is_empty());
}

#[tokio::test]
async fn test_missing_event_header_is_bad_request() {
    let app = app_with(Arc::new(MemoryFactStore::new()), None);

    let response = app.oneshot(webhook(None, None, push_body())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_payload_is_dropped_with_ok() {
    let store = Arc::new(MemoryFactStore::new());
    let app = app_with(store.clone(), None);

    let response = app
        .oneshot(webhook(Some("push"), None, b"{not json".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "dropped");
    assert!(store.repositories().is_empty());
}

#[tokio::test]
async fn test_unknown_event_is_ignored() {
    let app = app_with(Arc::new(MemoryFactStore::new()), None);

    let response = app
        .oneshot(webhook(Some("star"), None, b"{\"action\":\"created\"}".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ignored");
}

#[tokio::test]
async fn test_scorecard_rejects_bad_repo_format() {
    let app = app_with(Arc::new(MemoryFactStore::new()), None);

    let response = app.oneshot(get("/scorecard?repo=widgets")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scorecard_unknown_repo_is_not_found() {
    let app = app_with(Arc::new(MemoryFactStore::new()), None);

    let response = app
        .oneshot(get("/scorecard?repo=acme/missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scorecard_after_push() {
    let store = Arc::new(MemoryFactStore::new());
    let app = app_with(store.clone(), None);

    let response = app
        .clone()
        .oneshot(webhook(Some("push"), None, push_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/scorecard?repo=acme/widgets"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["repository"]["full_name"], "acme/widgets");
    assert_eq!(body["activity_summary"]["total_commits"], 1);
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let app = app_with(Arc::new(MemoryFactStore::new()), None);

    let response = app.oneshot(get("/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["repositories"], 0);
    assert_eq!(body["commits"], 0);
}

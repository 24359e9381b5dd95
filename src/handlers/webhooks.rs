//! # Webhook Handlers
//!
//! Intake for GitHub App deliveries. The raw body is authenticated before any
//! parsing happens, then handed to the event processor.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{Instrument, debug, info_span};
use utoipa::ToSchema;

use crate::error::{ApiError, validation_error};
use crate::events::DeliveryOutcome;
use crate::server::AppState;
use crate::webhook_verification::SIGNATURE_HEADER;

pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// GitHub caps webhook payloads at 25 MB.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Processing summary returned to the sender.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub event: String,
    pub delivery_id: String,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[utoipa::path(
    post,
    path = "/webhooks/github",
    params(
        ("X-GitHub-Event" = String, Header, description = "GitHub event type, e.g. push or installation"),
        ("X-GitHub-Delivery" = Option<String>, Header, description = "Unique delivery ID"),
        ("X-Hub-Signature-256" = Option<String>, Header, description = "HMAC-SHA256 of the body, required when a webhook secret is configured")
    ),
    request_body(content = Option<serde_json::Value>, description = "GitHub webhook payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery processed, ignored, or dropped as malformed", body = WebhookResponse),
        (status = 400, description = "Missing event header or unreadable body", body = ApiError),
        (status = 401, description = "Missing or invalid signature", body = ApiError),
        (status = 500, description = "The event could not be recorded", body = ApiError)
    ),
    tag = "webhooks"
)]
pub async fn github_webhook(
    State(state): State<AppState>,
    req: Request,
) -> Result<(StatusCode, Json<WebhookResponse>), ApiError> {
    // Backdate detection measures against arrival time, not processing time.
    let received_at = Utc::now();

    let (parts, body) = req.into_parts();
    let headers = parts.headers;
    let body_bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_BYTES)
        .await
        .map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "Failed to read request body",
            )
        })?;

    state
        .verifier
        .check(&body_bytes, header_str(&headers, SIGNATURE_HEADER))?;

    let event_type = header_str(&headers, EVENT_HEADER)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            validation_error(
                "Missing required header",
                json!({ "header": EVENT_HEADER }),
            )
        })?
        .to_string();
    let delivery_id = header_str(&headers, DELIVERY_HEADER)
        .unwrap_or_default()
        .to_string();

    let span = info_span!("webhook", event_type = %event_type, delivery_id = %delivery_id);
    debug!(parent: &span, body_size = body_bytes.len(), "Webhook delivery authenticated");

    let outcome = state
        .processor
        .process(&event_type, &delivery_id, &body_bytes, received_at)
        .instrument(span)
        .await?;

    Ok((
        StatusCode::OK,
        Json(WebhookResponse {
            event: event_type,
            delivery_id,
            outcome,
        }),
    ))
}

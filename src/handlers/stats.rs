use axum::{extract::State, response::Json};

use crate::error::ApiError;
use crate::server::AppState;
use crate::store::GlobalStats;

/// Service-wide totals across every tracked repository.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Global counters", body = GlobalStats),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "stats"
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<GlobalStats>, ApiError> {
    Ok(Json(state.store.global_stats().await?))
}

//! Scorecard query endpoint.

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use utoipa::IntoParams;

use crate::analysis::ObservationWindow;
use crate::error::{ApiError, not_found, validation_error};
use crate::scorecard::{Scorecard, build_scorecard};
use crate::server::AppState;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScorecardQuery {
    /// Repository as `owner/name`
    #[param(example = "octo-org/widgets")]
    pub repo: String,
    /// First day of the observation window (YYYY-MM-DD)
    #[param(example = "2026-09-01")]
    pub since: Option<String>,
    /// Last day of the observation window (YYYY-MM-DD), defaults to today
    #[param(example = "2026-09-30")]
    pub until: Option<String>,
}

/// Accepts exactly `owner/name` with both parts non-empty.
fn validate_full_name(repo: &str) -> Result<&str, ApiError> {
    let repo = repo.trim();
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(repo)
        }
        _ => Err(validation_error(
            "Repository must be given as owner/name",
            json!({ "repo": repo }),
        )),
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        validation_error(
            "Dates must use the YYYY-MM-DD format",
            json!({ field: value }),
        )
    })
}

/// Resolve the optional `since`/`until` pair into a window ending today by default.
fn parse_window(
    query: &ScorecardQuery,
    today: NaiveDate,
) -> Result<Option<ObservationWindow>, ApiError> {
    let since = query
        .since
        .as_deref()
        .map(|value| parse_date("since", value))
        .transpose()?;
    let until = query
        .until
        .as_deref()
        .map(|value| parse_date("until", value))
        .transpose()?;

    match (since, until) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(validation_error(
            "since is required when until is given",
            json!({ "since": null }),
        )),
        (Some(start), end) => ObservationWindow::new(start, end.unwrap_or(today))
            .map(Some)
            .ok_or_else(|| {
                validation_error(
                    "until must not precede since",
                    json!({ "since": query.since, "until": query.until }),
                )
            }),
    }
}

#[utoipa::path(
    get,
    path = "/scorecard",
    params(ScorecardQuery),
    responses(
        (status = 200, description = "Health scorecard for the repository", body = Scorecard),
        (status = 400, description = "Malformed repository name or dates", body = ApiError),
        (status = 404, description = "Repository has never been seen", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "scorecard"
)]
pub async fn get_scorecard(
    State(state): State<AppState>,
    Query(query): Query<ScorecardQuery>,
) -> Result<Json<Scorecard>, ApiError> {
    let now = Utc::now();
    let full_name = validate_full_name(&query.repo)?;
    let window = parse_window(&query, now.date_naive())?;

    let repository = state
        .store
        .find_repository_by_full_name(full_name)
        .await?
        .ok_or_else(|| not_found(&format!("Repository {} not found", full_name)))?;

    let inputs = state.store.load_scorecard_inputs(repository.id).await?;
    debug!(
        repository = %full_name,
        commits = inputs.commits.len(),
        alerts = inputs.alerts.len(),
        "Building scorecard"
    );

    Ok(Json(build_scorecard(&inputs, window, now)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(since: Option<&str>, until: Option<&str>) -> ScorecardQuery {
        ScorecardQuery {
            repo: "octo/widgets".to_string(),
            since: since.map(str::to_owned),
            until: until.map(str::to_owned),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_full_name_validation() {
        assert!(validate_full_name("octo/widgets").is_ok());
        assert!(validate_full_name(" octo/widgets ").is_ok());
        for bad in ["widgets", "/widgets", "octo/", "a/b/c", ""] {
            assert!(validate_full_name(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_window_defaults_to_today() {
        let window = parse_window(&query(Some("2026-10-01"), None), today())
            .unwrap()
            .unwrap();
        assert_eq!(window.end, today());
        assert_eq!(window.days(), 16);
    }

    #[test]
    fn test_no_dates_means_no_window() {
        assert_eq!(parse_window(&query(None, None), today()).unwrap(), None);
    }

    #[test]
    fn test_rejects_bad_dates() {
        assert!(parse_window(&query(Some("10/01/2026"), None), today()).is_err());
        assert!(parse_window(&query(Some("2026-10-05"), Some("2026-10-01")), today()).is_err());
        assert!(parse_window(&query(None, Some("2026-10-01")), today()).is_err());
    }
}

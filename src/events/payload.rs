//! Wire shapes of the GitHub webhook payloads this service consumes.
//!
//! Only the fields the router reads are modelled. Commits are kept as raw JSON
//! so a single malformed entry can be skipped without losing the whole push.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

#[derive(Debug, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
    #[serde(default)]
    pub forced: bool,
    pub repository: PushRepository,
    pub pusher: Option<Pusher>,
    pub installation: Option<InstallationId>,
    #[serde(default)]
    pub commits: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct PushRepository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub owner: Option<Account>,
    pub default_branch: Option<String>,
    /// Absent: the payload says nothing. `Some(None)`: GitHub reports no license.
    #[serde(default, deserialize_with = "present_or_null")]
    pub license: Option<Option<LicenseInfo>>,
}

#[derive(Debug, Deserialize)]
pub struct LicenseInfo {
    pub key: Option<String>,
    pub spdx_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub login: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pusher {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstallationId {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PushCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    pub timestamp: DateTime<FixedOffset>,
    pub author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstallationPayload {
    pub action: String,
    pub installation: Installation,
    #[serde(default)]
    pub repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Deserialize)]
pub struct Installation {
    pub id: i64,
    pub account: Option<Account>,
}

#[derive(Debug, Deserialize)]
pub struct InstallationRepositoriesPayload {
    pub action: Option<String>,
    pub installation: InstallationId,
    #[serde(default)]
    pub repositories_added: Vec<RepositorySummary>,
    #[serde(default)]
    pub repositories_removed: Vec<RepositorySummary>,
}

/// Repository entry as listed in installation payloads.
#[derive(Debug, Deserialize)]
pub struct RepositorySummary {
    pub id: i64,
    pub name: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PingPayload {
    pub zen: Option<String>,
    pub hook_id: Option<i64>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repository(extra: JsonValue) -> JsonValue {
        let mut repo = json!({
            "id": 7,
            "name": "widgets",
            "full_name": "acme/widgets",
            "owner": {"login": "acme"}
        });
        if let (Some(target), Some(source)) = (repo.as_object_mut(), extra.as_object()) {
            target.extend(source.clone());
        }
        repo
    }

    #[test]
    fn test_license_absent_null_and_present_are_distinct() {
        let absent: PushRepository = serde_json::from_value(repository(json!({}))).unwrap();
        assert!(absent.license.is_none());

        let null: PushRepository =
            serde_json::from_value(repository(json!({"license": null}))).unwrap();
        assert!(matches!(null.license, Some(None)));

        let present: PushRepository = serde_json::from_value(repository(
            json!({"license": {"key": "mit", "spdx_id": "MIT", "name": "MIT License"}}),
        ))
        .unwrap();
        let license = present.license.flatten().unwrap();
        assert_eq!(license.spdx_id.as_deref(), Some("MIT"));
    }

    #[test]
    fn test_push_defaults() {
        let push: PushPayload =
            serde_json::from_value(json!({"repository": repository(json!({}))})).unwrap();
        assert!(!push.forced);
        assert!(push.commits.is_empty());
        assert!(push.installation.is_none());
    }

    #[test]
    fn test_commit_timestamp_keeps_offset() {
        let commit: PushCommit = serde_json::from_value(json!({
            "id": "abc",
            "message": "fix: x",
            "timestamp": "2026-05-01T10:00:00-07:00",
            "author": {"name": "Ada", "email": "ada@example.com", "username": "ada"}
        }))
        .unwrap();
        assert_eq!(commit.timestamp.offset().utc_minus_local(), 7 * 3600);
    }
}

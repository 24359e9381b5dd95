//! Event routing: raw delivery in, typed facts and alert drafts out.
//!
//! Routing is pure. It parses, classifies and runs the commit-level detectors,
//! but persisting the result is left to [`super::EventProcessor`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::payload::{
    Account, InstallationPayload, InstallationRepositoriesPayload, PingPayload, PushCommit,
    PushPayload, PushRepository, RepositorySummary,
};
use crate::analysis::{ConventionalCommit, parse_conventional};
use crate::config::DetectionConfig;
use crate::detection::{AlertDraft, BackdateDetector, BackdateVerdict};
use crate::models::{AlertType, Severity};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("malformed {event} payload: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Identity of a repository as reported by GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub github_id: i64,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub default_branch: Option<String>,
}

impl RepositoryRef {
    fn from_push(repo: &PushRepository) -> Self {
        let owner = repo
            .owner
            .as_ref()
            .and_then(|o| o.login.clone().or_else(|| o.name.clone()))
            .unwrap_or_else(|| owner_from_full_name(&repo.full_name));

        Self {
            github_id: repo.id,
            owner,
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            default_branch: repo.default_branch.clone(),
        }
    }

    fn from_summary(repo: &RepositorySummary) -> Self {
        Self {
            github_id: repo.id,
            owner: owner_from_full_name(&repo.full_name),
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            default_branch: None,
        }
    }
}

fn owner_from_full_name(full_name: &str) -> String {
    full_name
        .split_once('/')
        .map(|(owner, _)| owner.to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRef {
    pub installation_id: i64,
    pub account_login: String,
    pub account_type: String,
}

/// What a push said about the repository's license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseObservation {
    NotReported,
    Missing,
    Present { spdx_id: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorIdentity {
    /// Contributor identity key.
    pub email: String,
    pub name: Option<String>,
    pub login: Option<String>,
}

/// Everything recorded about one commit at ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitFact {
    pub sha: String,
    pub message: String,
    pub author: AuthorIdentity,
    pub author_date: DateTime<Utc>,
    pub pushed_at: DateTime<Utc>,
    /// Push payloads carry no line stats, so these are zero for webhook commits.
    pub additions: u64,
    pub deletions: u64,
    pub conventional: ConventionalCommit,
    pub backdate: BackdateVerdict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservedCommit {
    pub fact: CommitFact,
    pub alerts: Vec<AlertDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushFacts {
    pub repository: RepositoryRef,
    pub installation_id: Option<i64>,
    pub license: LicenseObservation,
    pub received_at: DateTime<Utc>,
    pub git_ref: String,
    pub before: String,
    pub after: String,
    pub forced: bool,
    pub pusher: Option<String>,
    /// In payload order.
    pub commits: Vec<ObservedCommit>,
    pub skipped_commits: usize,
    /// Push-level alerts, at most one force push alert.
    pub push_alerts: Vec<AlertDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutedEvent {
    Push(PushFacts),
    InstallationCreated {
        installation: InstallationRef,
        repositories: Vec<RepositoryRef>,
    },
    InstallationDeleted {
        installation_id: i64,
    },
    RepositoriesChanged {
        installation_id: i64,
        added: Vec<RepositoryRef>,
        removed: Vec<RepositoryRef>,
    },
    Ping {
        zen: Option<String>,
    },
    Ignored {
        event: String,
        action: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct EventRouter {
    backdate: BackdateDetector,
    alert_non_conventional: bool,
}

impl EventRouter {
    pub fn new(backdate: BackdateDetector, alert_non_conventional: bool) -> Self {
        Self {
            backdate,
            alert_non_conventional,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            BackdateDetector::from_config(config),
            config.alert_non_conventional,
        )
    }

    /// Route one delivery. `received_at` must be captured before the body is parsed.
    pub fn route(
        &self,
        event_type: &str,
        body: &[u8],
        received_at: DateTime<Utc>,
    ) -> Result<RoutedEvent, RouteError> {
        match event_type {
            "push" => {
                let payload: PushPayload = parse(event_type, body)?;
                Ok(RoutedEvent::Push(self.route_push(payload, received_at)))
            }
            "installation" => {
                let payload: InstallationPayload = parse(event_type, body)?;
                Ok(route_installation(payload))
            }
            "installation_repositories" => {
                let payload: InstallationRepositoriesPayload = parse(event_type, body)?;
                Ok(RoutedEvent::RepositoriesChanged {
                    installation_id: payload.installation.id,
                    added: payload
                        .repositories_added
                        .iter()
                        .map(RepositoryRef::from_summary)
                        .collect(),
                    removed: payload
                        .repositories_removed
                        .iter()
                        .map(RepositoryRef::from_summary)
                        .collect(),
                })
            }
            "ping" => {
                let payload: PingPayload = parse(event_type, body)?;
                debug!(hook_id = ?payload.hook_id, "Ping received");
                Ok(RoutedEvent::Ping { zen: payload.zen })
            }
            other => {
                debug!(event_type = other, "Ignoring unhandled event type");
                Ok(RoutedEvent::Ignored {
                    event: other.to_string(),
                    action: None,
                })
            }
        }
    }

    fn route_push(&self, payload: PushPayload, received_at: DateTime<Utc>) -> PushFacts {
        let repository = RepositoryRef::from_push(&payload.repository);
        let license = match &payload.repository.license {
            None => LicenseObservation::NotReported,
            Some(None) => LicenseObservation::Missing,
            Some(Some(info)) => LicenseObservation::Present {
                spdx_id: info
                    .spdx_id
                    .clone()
                    .filter(|id| !id.is_empty() && id != "NOASSERTION"),
            },
        };
        let pusher = payload.pusher.as_ref().and_then(|p| p.name.clone());

        let mut commits = Vec::with_capacity(payload.commits.len());
        let mut skipped_commits = 0;
        for raw in payload.commits {
            match serde_json::from_value::<PushCommit>(raw) {
                Ok(commit) => commits.push(self.observe_commit(commit, received_at)),
                Err(err) => {
                    skipped_commits += 1;
                    warn!(
                        repository = %repository.full_name,
                        error = %err,
                        "Skipping malformed commit in push payload"
                    );
                }
            }
        }

        let push_alerts = if payload.forced {
            vec![
                AlertDraft::new(
                    AlertType::ForcePush,
                    Severity::Warning,
                    "Force push detected",
                    "Repository history was rewritten",
                )
                .with_metadata(json!({
                    "ref": payload.git_ref,
                    "before": payload.before,
                    "after": payload.after,
                    "pusher": pusher,
                })),
            ]
        } else {
            Vec::new()
        };

        PushFacts {
            repository,
            installation_id: payload.installation.map(|i| i.id),
            license,
            received_at,
            git_ref: payload.git_ref,
            before: payload.before,
            after: payload.after,
            forced: payload.forced,
            pusher,
            commits,
            skipped_commits,
            push_alerts,
        }
    }

    fn observe_commit(&self, commit: PushCommit, received_at: DateTime<Utc>) -> ObservedCommit {
        let author_date = commit.timestamp.with_timezone(&Utc);
        let conventional = parse_conventional(&commit.message);
        let backdate = self.backdate.evaluate(author_date, received_at);

        let mut alerts = Vec::new();
        if let Some(alert) = self
            .backdate
            .alert_for(&commit.id, &backdate, author_date, received_at)
        {
            alerts.push(alert);
        }

        if self.alert_non_conventional && !conventional.is_valid {
            let first_line = commit.message.lines().next().unwrap_or_default();
            alerts.push(
                AlertDraft::new(
                    AlertType::NonConventionalCommit,
                    Severity::Info,
                    "Non-conventional commit message",
                    "Commit message does not follow the conventional commit format",
                )
                .for_commit(commit.id.clone())
                .with_metadata(json!({ "subject": first_line })),
            );
        }

        let name = non_empty(commit.author.name);
        let login = non_empty(commit.author.username);
        let email = match non_empty(commit.author.email) {
            Some(email) => email.trim().to_string(),
            None => {
                let fallback = login.as_deref().or(name.as_deref()).unwrap_or_default();
                debug!(
                    sha = %commit.id,
                    identity = %fallback,
                    "Commit author has no email, keying contributor by login or name"
                );
                fallback.trim().to_string()
            }
        };
        let author = AuthorIdentity { email, name, login };

        ObservedCommit {
            fact: CommitFact {
                sha: commit.id,
                message: commit.message,
                author,
                author_date,
                pushed_at: received_at,
                additions: 0,
                deletions: 0,
                conventional,
                backdate,
            },
            alerts,
        }
    }
}

fn route_installation(payload: InstallationPayload) -> RoutedEvent {
    match payload.action.as_str() {
        "created" => {
            let (account_login, account_type) = account_parts(payload.installation.account);
            RoutedEvent::InstallationCreated {
                installation: InstallationRef {
                    installation_id: payload.installation.id,
                    account_login,
                    account_type,
                },
                repositories: payload
                    .repositories
                    .iter()
                    .map(RepositoryRef::from_summary)
                    .collect(),
            }
        }
        "deleted" => RoutedEvent::InstallationDeleted {
            installation_id: payload.installation.id,
        },
        _ => RoutedEvent::Ignored {
            event: "installation".to_string(),
            action: Some(payload.action),
        },
    }
}

fn account_parts(account: Option<Account>) -> (String, String) {
    let account = account.unwrap_or(Account {
        login: None,
        name: None,
        account_type: None,
    });
    (
        account.login.unwrap_or_default(),
        account.account_type.unwrap_or_else(|| "User".to_string()),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse<T: DeserializeOwned>(event_type: &str, body: &[u8]) -> Result<T, RouteError> {
    serde_json::from_slice(body).map_err(|source| RouteError::MalformedPayload {
        event: event_type.to_string(),
        source,
    })
}

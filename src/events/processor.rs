//! Applies routed events to the fact store.
//!
//! Each delivery is handled in one sequential pass. A failure while storing one
//! commit or repository is logged and counted, and the remaining items are
//! still processed. Only a failure to record the event itself is returned.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::router::{EventRouter, ObservedCommit, PushFacts, RoutedEvent};
use crate::detection::AlertDraft;
use crate::error::RepositoryError;
use crate::models::{AlertType, Severity};
use crate::store::FactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Processed,
    Ignored,
    /// The payload could not be parsed. Nothing was stored.
    Dropped,
}

impl DeliveryStatus {
    fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Processed => "processed",
            DeliveryStatus::Ignored => "ignored",
            DeliveryStatus::Dropped => "dropped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryOutcome {
    pub status: DeliveryStatus,
    pub commits_recorded: usize,
    pub duplicate_commits: usize,
    pub alerts_raised: usize,
    pub failed_items: usize,
}

impl DeliveryOutcome {
    fn with_status(status: DeliveryStatus) -> Self {
        Self {
            status,
            commits_recorded: 0,
            duplicate_commits: 0,
            alerts_raised: 0,
            failed_items: 0,
        }
    }
}

#[derive(Clone)]
pub struct EventProcessor {
    router: EventRouter,
    store: Arc<dyn FactStore>,
}

impl EventProcessor {
    pub fn new(router: EventRouter, store: Arc<dyn FactStore>) -> Self {
        Self { router, store }
    }

    /// Route and persist one delivery.
    pub async fn process(
        &self,
        event_type: &str,
        delivery_id: &str,
        body: &[u8],
        received_at: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, RepositoryError> {
        let result = match self.router.route(event_type, body, received_at) {
            Ok(routed) => self.apply(routed).await,
            Err(err) => {
                error!(event_type, delivery_id, error = %err, "Dropping malformed webhook payload");
                Ok(DeliveryOutcome::with_status(DeliveryStatus::Dropped))
            }
        };

        let outcome_label = match &result {
            Ok(outcome) => outcome.status.as_str(),
            Err(_) => "failed",
        };
        counter!(
            "webhook_deliveries_total",
            "event" => event_type.to_string(),
            "outcome" => outcome_label
        )
        .increment(1);

        if let Ok(outcome) = &result {
            info!(
                event_type,
                delivery_id,
                status = outcome.status.as_str(),
                commits_recorded = outcome.commits_recorded,
                duplicate_commits = outcome.duplicate_commits,
                alerts_raised = outcome.alerts_raised,
                failed_items = outcome.failed_items,
                "Webhook delivery processed"
            );
        }

        result
    }

    async fn apply(&self, routed: RoutedEvent) -> Result<DeliveryOutcome, RepositoryError> {
        match routed {
            RoutedEvent::Push(push) => self.apply_push(push).await,
            RoutedEvent::InstallationCreated {
                installation,
                repositories,
            } => {
                self.store.upsert_installation(&installation).await?;

                let mut outcome = DeliveryOutcome::with_status(DeliveryStatus::Processed);
                for repository in &repositories {
                    if let Err(err) = self
                        .store
                        .upsert_repository(repository, Some(installation.installation_id))
                        .await
                    {
                        outcome.failed_items += 1;
                        error!(repository = %repository.full_name, error = %err, "Failed to store repository");
                    }
                }
                info!(
                    installation_id = installation.installation_id,
                    account = %installation.account_login,
                    repositories = repositories.len(),
                    "Installation created"
                );
                Ok(outcome)
            }
            RoutedEvent::InstallationDeleted { installation_id } => {
                info!(installation_id, "Installation deleted");
                Ok(DeliveryOutcome::with_status(DeliveryStatus::Processed))
            }
            RoutedEvent::RepositoriesChanged {
                installation_id,
                added,
                removed,
            } => {
                let mut outcome = DeliveryOutcome::with_status(DeliveryStatus::Processed);
                for repository in &added {
                    if let Err(err) = self
                        .store
                        .upsert_repository(repository, Some(installation_id))
                        .await
                    {
                        outcome.failed_items += 1;
                        error!(repository = %repository.full_name, error = %err, "Failed to store added repository");
                    }
                }
                for repository in &removed {
                    info!(installation_id, repository = %repository.full_name, "Repository removed from installation");
                }
                Ok(outcome)
            }
            RoutedEvent::Ping { zen } => {
                info!(zen = zen.as_deref().unwrap_or_default(), "Ping received");
                Ok(DeliveryOutcome::with_status(DeliveryStatus::Processed))
            }
            RoutedEvent::Ignored { event, action } => {
                debug!(event = %event, action = ?action, "Event ignored");
                Ok(DeliveryOutcome::with_status(DeliveryStatus::Ignored))
            }
        }
    }

    async fn apply_push(&self, push: PushFacts) -> Result<DeliveryOutcome, RepositoryError> {
        info!(
            repository = %push.repository.full_name,
            git_ref = %push.git_ref,
            commits = push.commits.len(),
            forced = push.forced,
            "Processing push"
        );

        let recorded = self.store.record_push(&push).await?;
        let repository_id = recorded.repository_id;

        let mut outcome = DeliveryOutcome::with_status(DeliveryStatus::Processed);
        outcome.failed_items += push.skipped_commits;

        if recorded.license_newly_missing {
            let alert = AlertDraft::new(
                AlertType::NoLicense,
                Severity::Info,
                "No license detected",
                "Repository has no license file",
            )
            .with_metadata(json!({ "checked_at": push.received_at.to_rfc3339() }));
            self.raise(repository_id, &alert, &mut outcome).await;
        }

        for observed in &push.commits {
            self.apply_commit(repository_id, observed, &mut outcome).await;
        }

        for alert in &push.push_alerts {
            self.raise(repository_id, alert, &mut outcome).await;
        }

        Ok(outcome)
    }

    async fn apply_commit(
        &self,
        repository_id: Uuid,
        observed: &ObservedCommit,
        outcome: &mut DeliveryOutcome,
    ) {
        let fact = &observed.fact;
        match self.store.insert_commit(repository_id, fact).await {
            Ok(true) => {
                outcome.commits_recorded += 1;
                counter!("commits_recorded_total").increment(1);
            }
            Ok(false) => {
                debug!(sha = %fact.sha, "Commit already recorded");
                outcome.duplicate_commits += 1;
                return;
            }
            Err(err) => {
                outcome.failed_items += 1;
                error!(sha = %fact.sha, error = %err, "Failed to record commit");
                return;
            }
        }

        for alert in &observed.alerts {
            self.raise(repository_id, alert, outcome).await;
        }

        if let Err(err) = self.store.upsert_contributor(repository_id, fact).await {
            outcome.failed_items += 1;
            error!(sha = %fact.sha, error = %err, "Failed to update contributor");
        }
    }

    async fn raise(&self, repository_id: Uuid, alert: &AlertDraft, outcome: &mut DeliveryOutcome) {
        match self.store.insert_alert(repository_id, alert).await {
            Ok(()) => {
                outcome.alerts_raised += 1;
                counter!("alerts_raised_total", "type" => alert.alert_type.as_str()).increment(1);
                warn!(
                    alert_type = alert.alert_type.as_str(),
                    severity = alert.severity.as_str(),
                    sha = alert.commit_sha.as_deref().unwrap_or_default(),
                    "Alert raised"
                );
            }
            Err(err) => {
                outcome.failed_items += 1;
                error!(alert_type = alert.alert_type.as_str(), error = %err, "Failed to store alert");
            }
        }
    }
}

//! # Data Models
//!
//! SeaORM entities backing the fact store, plus the service info payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod alert;
pub mod commit;
pub mod contributor;
pub mod installation;
pub mod tracked_repo;

pub use alert::{AlertType, Entity as Alert, Severity};
pub use commit::Entity as Commit;
pub use contributor::Entity as Contributor;
pub use installation::Entity as Installation;
pub use tracked_repo::{Entity as TrackedRepo, StreakStatus};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "repo-signals".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

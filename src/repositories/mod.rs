//! # Repository Layer
//!
//! Per-entity data access over SeaORM. [`crate::store::DatabaseFactStore`]
//! composes these into the fact store.

pub mod alert;
pub mod commit;
pub mod contributor;
pub mod installation;
pub mod tracked_repo;

pub use alert::AlertRepository;
pub use commit::CommitRepository;
pub use contributor::ContributorRepository;
pub use installation::InstallationRepository;
pub use tracked_repo::TrackedRepoRepository;

//! Inbound event handling: parse and classify ([`router`]), then persist
//! ([`processor`]).

pub mod payload;
pub mod processor;
pub mod router;

pub use processor::{DeliveryOutcome, DeliveryStatus, EventProcessor};
pub use router::{
    AuthorIdentity, CommitFact, EventRouter, InstallationRef, LicenseObservation, ObservedCommit,
    PushFacts, RepositoryRef, RouteError, RoutedEvent,
};

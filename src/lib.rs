//! # Repo Signals Library
//!
//! Ingests GitHub App webhooks, records commits, contributors and alerts, and
//! derives per-repository health scorecards from them.

pub mod analysis;
pub mod config;
pub mod db;
pub mod detection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod scheduler;
pub mod scorecard;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod webhook_verification;
pub use migration;

//! Shared building blocks for resilient CQL clients.
//!
//! The `database` module holds the session seam ([`database::DatabaseConnection`]),
//! its Scylla-driver implementation, and the retry and connection-observer
//! hooks the session applies internally.

pub mod config;
pub mod database;
pub mod errors;
pub mod ids;
pub mod metrics;
pub mod types;

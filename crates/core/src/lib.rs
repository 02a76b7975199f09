//! Data-quality validation for farmer/plantation records.
//!
//! Loads a record table, runs the fixed rule catalog over it, and splits the
//! records into clean and failed outputs. Also computes the dashboard
//! aggregates read from the clean output. Synchronous; no network access.

pub mod dashboard;
pub mod error;
pub mod partition;
pub mod persist;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod types;
pub mod validation;

//! Data-quality validation engine.
//!
//! Provides the rule catalog, the validator that runs it over a table, and
//! the failure set the validator accumulates. No network access.

pub mod catalog;
pub mod dates;
pub mod evaluator;
pub mod failures;
pub mod rules;

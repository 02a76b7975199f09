//! One end-to-end run: validate, partition, persist.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::CoreError;
use crate::partition::{self, CleanPolicy, OutputPaths};
use crate::persist;
use crate::table::RecordTable;
use crate::validation::catalog::CatalogConfig;
use crate::validation::evaluator::Validator;
use crate::validation::failures::FailureSet;
use crate::validation::rules::{RuleId, RuleViolation};

/// Record counts of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub total: usize,
    pub clean: usize,
    pub failed: usize,
    pub violations: usize,
    pub policy: CleanPolicy,
    /// Distinct rows flagged by each rule that found anything.
    pub rows_per_rule: BTreeMap<RuleId, usize>,
}

/// Everything written to the optional JSON violation report.
#[derive(Debug, Serialize)]
pub struct ViolationReport<'a> {
    pub summary: &'a RunReport,
    pub violations: &'a [RuleViolation],
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub outputs: OutputPaths,
    pub policy: CleanPolicy,
    pub catalog: CatalogConfig,
}

/// Result of [`run_quality_checks`]: the counts plus the material they came from.
#[derive(Debug)]
pub struct QualityRun {
    pub report: RunReport,
    pub table: RecordTable,
    pub failures: FailureSet,
}

/// Validate `table`, write both outputs and return the counts.
///
/// Schema and persistence errors abort the run; rule violations never do.
pub fn run_quality_checks(table: RecordTable, options: &RunOptions) -> Result<QualityRun, CoreError> {
    let mut validator = Validator::new(table, options.catalog.clone());
    validator.run_all_checks()?;
    let (table, failures) = validator.into_parts();

    let split = partition::partition(&table, &failures, options.policy);
    partition::write_outputs(&table, &split, &options.outputs)?;

    let report = RunReport {
        total: table.len(),
        clean: split.clean.len(),
        failed: split.failed.len(),
        violations: failures.len(),
        policy: options.policy,
        rows_per_rule: failures.rows_per_rule(),
    };
    tracing::info!(
        total = report.total,
        clean = report.clean,
        failed = report.failed,
        policy = %report.policy,
        "Run complete",
    );

    Ok(QualityRun {
        report,
        table,
        failures,
    })
}

impl QualityRun {
    /// Write every violation and the run summary as JSON.
    pub fn write_violation_report(&self, path: &Path) -> Result<(), CoreError> {
        persist::write_json(
            path,
            &ViolationReport {
                summary: &self.report,
                violations: self.failures.violations(),
            },
        )?;
        tracing::info!(path = %path.display(), "Violation report saved");
        Ok(())
    }
}

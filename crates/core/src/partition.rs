//! Splits a validated table into the clean and failed outputs.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::persist;
use crate::table::RecordTable;
use crate::types::RowIndex;
use crate::validation::failures::FailureSet;

/// What the clean output contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanPolicy {
    /// Every input row except those that failed a rule.
    #[default]
    ExcludeFailed,
    /// The input unchanged; failures are reported alongside as an overlay.
    Advisory,
}

impl CleanPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExcludeFailed => "exclude-failed",
            Self::Advisory => "advisory",
        }
    }
}

impl FromStr for CleanPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exclude-failed" => Ok(Self::ExcludeFailed),
            "advisory" => Ok(Self::Advisory),
            other => Err(CoreError::Config(format!(
                "Invalid clean policy '{other}'. Must be one of: exclude-failed, advisory"
            ))),
        }
    }
}

impl std::fmt::Display for CleanPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destinations for one run's outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub clean: PathBuf,
    pub failed: PathBuf,
}

/// Row selection for each output, both in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub clean: Vec<RowIndex>,
    /// One row per distinct failing record.
    pub failed: Vec<RowIndex>,
}

/// Decide which rows go to which output.
pub fn partition(table: &RecordTable, failures: &FailureSet, policy: CleanPolicy) -> Partition {
    let failed_rows = failures.failed_rows();
    let clean = match policy {
        CleanPolicy::Advisory => table.rows().collect(),
        CleanPolicy::ExcludeFailed => table.rows().filter(|r| !failed_rows.contains(r)).collect(),
    };
    Partition {
        clean,
        failed: failures.deduplicated(table),
    }
}

/// Write the failed table, then the clean table.
///
/// Both tables are staged before either destination is replaced, so a
/// failure leaves both previous outputs in place.
pub fn write_outputs(table: &RecordTable, partition: &Partition, paths: &OutputPaths) -> Result<(), CoreError> {
    let failed = persist::stage_rows(&paths.failed, table, &partition.failed)?;
    let clean = persist::stage_rows(&paths.clean, table, &partition.clean)?;

    failed.commit()?;
    tracing::info!(
        path = %paths.failed.display(),
        records = partition.failed.len(),
        "Failed data saved",
    );

    clean.commit()?;
    tracing::info!(
        path = %paths.clean.display(),
        records = partition.clean.len(),
        "Clean data saved",
    );
    Ok(())
}

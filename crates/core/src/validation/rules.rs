//! Rule identifiers and violation types.

use serde::{Deserialize, Serialize};

use crate::types::RowIndex;

/// One entry of the data-quality rule catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    UniqueUid,
    MandatoryFields,
    ProgramYearFormat,
    DistrictBlock,
    DateValidity,
    LandArea,
    YesNoValues,
    PaymentBeforeContract,
    TreesPlantedRange,
    SpeciesSum,
}

impl RuleId {
    /// The catalog, in execution order.
    pub const CATALOG: [RuleId; 10] = [
        Self::UniqueUid,
        Self::MandatoryFields,
        Self::ProgramYearFormat,
        Self::DistrictBlock,
        Self::DateValidity,
        Self::LandArea,
        Self::YesNoValues,
        Self::PaymentBeforeContract,
        Self::TreesPlantedRange,
        Self::SpeciesSum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UniqueUid => "unique_uid",
            Self::MandatoryFields => "mandatory_fields",
            Self::ProgramYearFormat => "program_year_format",
            Self::DistrictBlock => "district_block",
            Self::DateValidity => "date_validity",
            Self::LandArea => "land_area",
            Self::YesNoValues => "yes_no_values",
            Self::PaymentBeforeContract => "payment_before_contract",
            Self::TreesPlantedRange => "trees_planted_range",
            Self::SpeciesSum => "species_sum",
        }
    }

    /// Human-readable summary used as the log message for a violated rule.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UniqueUid => "Duplicate or null UID found",
            Self::MandatoryFields => "Mandatory fields missing",
            Self::ProgramYearFormat => "Invalid program year format found",
            Self::DistrictBlock => "Invalid District/Block values found",
            Self::DateValidity => "Invalid date detected",
            Self::LandArea => "Land area inconsistencies found",
            Self::YesNoValues => "Invalid values found in Yes/No column",
            Self::PaymentBeforeContract => "Contract uploaded but payment not collected",
            Self::TreesPlantedRange => "Invalid trees planted count",
            Self::SpeciesSum => "Species count mismatch",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row failing a single rule on one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleViolation {
    pub row: RowIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub rule: RuleId,
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub message: String,
}

/// Everything one rule found in one pass over the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub rule: RuleId,
    pub violations: Vec<RuleViolation>,
}

impl RuleOutcome {
    pub fn new(rule: RuleId) -> Self {
        Self {
            rule,
            violations: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Distinct offending rows, ascending.
    pub fn rows(&self) -> Vec<RowIndex> {
        let mut rows: Vec<RowIndex> = self.violations.iter().map(|v| v.row).collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    /// Distinct columns involved, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for v in &self.violations {
            if !columns.contains(&v.column.as_str()) {
                columns.push(&v.column);
            }
        }
        columns
    }
}

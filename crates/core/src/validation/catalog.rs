//! The data-quality rule catalog.
//!
//! Each check is a pure function of the table: it returns the violating rows
//! and never mutates anything. [`evaluate_rule`] dispatches by [`RuleId`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::dates::check_date;
use super::rules::{RuleId, RuleOutcome, RuleViolation};
use crate::error::CoreError;
use crate::schema;
use crate::table::{format_number, Cell, RecordTable};
use crate::types::{RowIndex, YesNo};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_VALID_DISTRICTS: &[&str] = &["A", "B"];
pub const DEFAULT_VALID_BLOCKS: &[&str] = &["p", "q", "r", "s"];
pub const DEFAULT_MIN_TREES_PLANTED: f64 = 350.0;
pub const DEFAULT_MAX_TREES_PLANTED: f64 = 450.0;

/// Tolerance when comparing the species sum against `trees_planted`.
const SUM_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Constants the rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub mandatory_fields: Vec<String>,
    pub valid_districts: Vec<String>,
    pub valid_blocks: Vec<String>,
    pub date_columns: Vec<String>,
    pub yes_no_columns: Vec<String>,
    pub species_columns: Vec<String>,
    pub min_trees_planted: f64,
    pub max_trees_planted: f64,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            mandatory_fields: owned(&[schema::UID, schema::FARMER_NAME, schema::PROGRAM_YEAR]),
            valid_districts: owned(DEFAULT_VALID_DISTRICTS),
            valid_blocks: owned(DEFAULT_VALID_BLOCKS),
            date_columns: owned(schema::DATE_COLUMNS),
            yes_no_columns: owned(schema::YES_NO_COLUMNS),
            species_columns: owned(schema::SPECIES_COLUMNS),
            min_trees_planted: DEFAULT_MIN_TREES_PLANTED,
            max_trees_planted: DEFAULT_MAX_TREES_PLANTED,
        }
    }
}

impl CatalogConfig {
    /// Reject configurations no table could pass.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.valid_districts.is_empty() {
            return Err(CoreError::Config("valid district set is empty".into()));
        }
        if self.valid_blocks.is_empty() {
            return Err(CoreError::Config("valid block set is empty".into()));
        }
        if self.min_trees_planted > self.max_trees_planted {
            return Err(CoreError::Config(format!(
                "trees planted range is inverted: {} > {}",
                self.min_trees_planted, self.max_trees_planted
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Input columns `rule` reads.
pub fn required_columns(rule: RuleId, config: &CatalogConfig) -> Vec<String> {
    match rule {
        RuleId::UniqueUid => vec![schema::UID.into()],
        RuleId::MandatoryFields => config.mandatory_fields.clone(),
        RuleId::ProgramYearFormat => vec![schema::PROGRAM_YEAR.into()],
        RuleId::DistrictBlock => vec![schema::DISTRICT.into(), schema::BLOCK.into()],
        RuleId::DateValidity => config.date_columns.clone(),
        RuleId::LandArea => vec![
            schema::TOTAL_LAND_AREA_ACRE.into(),
            schema::AREA_F4F_ACRE.into(),
        ],
        RuleId::YesNoValues => config.yes_no_columns.clone(),
        RuleId::PaymentBeforeContract => vec![
            schema::FARMER_PAYMENT_COLLECTED.into(),
            schema::CONTRACT_UPLOADED.into(),
        ],
        RuleId::TreesPlantedRange => vec![schema::TREES_PLANTED.into()],
        RuleId::SpeciesSum => {
            let mut columns = config.species_columns.clone();
            columns.push(schema::TREES_PLANTED.into());
            columns
        }
    }
}

/// Fail with a schema error if `table` lacks any column `rule` reads.
pub fn check_columns(rule: RuleId, table: &RecordTable, config: &CatalogConfig) -> Result<(), CoreError> {
    match required_columns(rule, config)
        .into_iter()
        .find(|c| !table.has_column(c))
    {
        Some(column) => Err(CoreError::Schema {
            rule: rule.as_str(),
            column,
        }),
        None => Ok(()),
    }
}

/// Run one rule over the whole table.
pub fn evaluate_rule(rule: RuleId, table: &RecordTable, config: &CatalogConfig) -> RuleOutcome {
    match rule {
        RuleId::UniqueUid => check_unique_uid(table),
        RuleId::MandatoryFields => check_mandatory_fields(table, config),
        RuleId::ProgramYearFormat => check_program_year(table),
        RuleId::DistrictBlock => check_district_block(table, config),
        RuleId::DateValidity => check_dates(table, config),
        RuleId::LandArea => check_land_area(table),
        RuleId::YesNoValues => check_yes_no(table, config),
        RuleId::PaymentBeforeContract => check_payment_before_contract(table),
        RuleId::TreesPlantedRange => check_trees_planted(table, config),
        RuleId::SpeciesSum => check_species_sum(table, config),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Collector<'a> {
    table: &'a RecordTable,
    outcome: RuleOutcome,
}

impl<'a> Collector<'a> {
    fn new(rule: RuleId, table: &'a RecordTable) -> Self {
        Self {
            table,
            outcome: RuleOutcome::new(rule),
        }
    }

    fn flag(&mut self, row: RowIndex, column: &str, message: impl Into<String>) {
        let cell = self.table.cell(row, column);
        self.outcome.violations.push(RuleViolation {
            row,
            uid: self.table.uid(row).map(str::to_string),
            rule: self.outcome.rule,
            column: column.to_string(),
            value: (!cell.is_null()).then(|| cell.to_string()),
            message: message.into(),
        });
    }

    fn finish(self) -> RuleOutcome {
        self.outcome
    }
}

fn in_set(cell: &Cell, valid: &[String]) -> bool {
    cell.as_text().is_some_and(|v| valid.iter().any(|s| s == v))
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// `uid` must be present and appear only once. The first occurrence of a
/// repeated uid is accepted; every later one is flagged.
pub fn check_unique_uid(table: &RecordTable) -> RuleOutcome {
    let mut out = Collector::new(RuleId::UniqueUid, table);
    let mut seen = HashSet::new();
    for row in table.rows() {
        match table.uid(row) {
            None => out.flag(row, schema::UID, "uid is null"),
            Some(uid) if !seen.insert(uid) => out.flag(row, schema::UID, "uid is duplicated"),
            Some(_) => {}
        }
    }
    out.finish()
}

pub fn check_mandatory_fields(table: &RecordTable, config: &CatalogConfig) -> RuleOutcome {
    let mut out = Collector::new(RuleId::MandatoryFields, table);
    for row in table.rows() {
        for field in &config.mandatory_fields {
            if table.cell(row, field).is_null() {
                out.flag(row, field, format!("mandatory field '{field}' is null"));
            }
        }
    }
    out.finish()
}

/// `program_year` must be exactly four digits. Null never matches.
pub fn check_program_year(table: &RecordTable) -> RuleOutcome {
    let mut out = Collector::new(RuleId::ProgramYearFormat, table);
    for row in table.rows() {
        if !matches!(table.cell(row, schema::PROGRAM_YEAR), Cell::Year(_)) {
            out.flag(row, schema::PROGRAM_YEAR, "program year is not four digits");
        }
    }
    out.finish()
}

/// District and Block are checked independently; a row can fail both.
pub fn check_district_block(table: &RecordTable, config: &CatalogConfig) -> RuleOutcome {
    let mut out = Collector::new(RuleId::DistrictBlock, table);
    for row in table.rows() {
        if !in_set(table.cell(row, schema::DISTRICT), &config.valid_districts) {
            out.flag(row, schema::DISTRICT, "district not in the valid set");
        }
    }
    for row in table.rows() {
        if !in_set(table.cell(row, schema::BLOCK), &config.valid_blocks) {
            out.flag(row, schema::BLOCK, "block not in the valid set");
        }
    }
    out.finish()
}

/// Non-null date cells must parse under an accepted format and name a real day.
pub fn check_dates(table: &RecordTable, config: &CatalogConfig) -> RuleOutcome {
    let mut out = Collector::new(RuleId::DateValidity, table);
    for column in &config.date_columns {
        for row in table.rows() {
            if let Cell::Invalid(raw) = table.cell(row, column) {
                let reason = check_date(raw).reason();
                out.flag(row, column, format!("invalid date in '{column}': {reason}"));
            }
        }
    }
    out.finish()
}

/// Total land must be positive and the plantation area must fit inside it.
/// Null areas compare false and are not flagged.
pub fn check_land_area(table: &RecordTable) -> RuleOutcome {
    let mut out = Collector::new(RuleId::LandArea, table);
    for row in table.rows() {
        let total = table.cell(row, schema::TOTAL_LAND_AREA_ACRE);
        let f4f = table.cell(row, schema::AREA_F4F_ACRE);

        if matches!(total, Cell::Invalid(_)) {
            out.flag(row, schema::TOTAL_LAND_AREA_ACRE, "total land area is not numeric");
            continue;
        }
        if matches!(f4f, Cell::Invalid(_)) {
            out.flag(row, schema::AREA_F4F_ACRE, "plantation area is not numeric");
            continue;
        }
        match (total.as_number(), f4f.as_number()) {
            (Some(t), _) if t <= 0.0 => {
                out.flag(row, schema::TOTAL_LAND_AREA_ACRE, "total land area is not positive")
            }
            (Some(t), Some(f)) if f > t => out.flag(
                row,
                schema::AREA_F4F_ACRE,
                format!("plantation area {} exceeds total land area {}", format_number(f), format_number(t)),
            ),
            _ => {}
        }
    }
    out.finish()
}

/// Flag columns must hold exactly `Yes` or `No`; null is not accepted.
pub fn check_yes_no(table: &RecordTable, config: &CatalogConfig) -> RuleOutcome {
    let mut out = Collector::new(RuleId::YesNoValues, table);
    for column in &config.yes_no_columns {
        for row in table.rows() {
            if table.cell(row, column).as_flag().is_none() {
                out.flag(row, column, format!("'{column}' is not Yes/No"));
            }
        }
    }
    out.finish()
}

/// A contract may only be uploaded once the farmer payment is collected.
pub fn check_payment_before_contract(table: &RecordTable) -> RuleOutcome {
    let mut out = Collector::new(RuleId::PaymentBeforeContract, table);
    for row in table.rows() {
        let paid = table.cell(row, schema::FARMER_PAYMENT_COLLECTED).as_flag();
        let contract = table.cell(row, schema::CONTRACT_UPLOADED).as_flag();
        if paid == Some(YesNo::No) && contract == Some(YesNo::Yes) {
            out.flag(
                row,
                schema::CONTRACT_UPLOADED,
                "contract uploaded but payment not collected",
            );
        }
    }
    out.finish()
}

pub fn check_trees_planted(table: &RecordTable, config: &CatalogConfig) -> RuleOutcome {
    let mut out = Collector::new(RuleId::TreesPlantedRange, table);
    let (min, max) = (config.min_trees_planted, config.max_trees_planted);
    for row in table.rows() {
        match table.cell(row, schema::TREES_PLANTED) {
            Cell::Number(n) if *n < min || *n > max => out.flag(
                row,
                schema::TREES_PLANTED,
                format!(
                    "trees planted outside {}-{}",
                    format_number(min),
                    format_number(max)
                ),
            ),
            Cell::Invalid(_) => out.flag(row, schema::TREES_PLANTED, "trees planted is not numeric"),
            _ => {}
        }
    }
    out.finish()
}

/// Per-row sum of the species columns. Nulls count as zero; a non-numeric
/// species cell makes the row's total null.
pub fn species_totals(table: &RecordTable, species_columns: &[String]) -> Vec<Cell> {
    table
        .rows()
        .map(|row| {
            let mut total = 0.0;
            for column in species_columns {
                match table.cell(row, column) {
                    Cell::Null => {}
                    Cell::Number(n) => total += n,
                    _ => return Cell::Null,
                }
            }
            Cell::Number(total)
        })
        .collect()
}

/// The species columns must add up to `trees_planted`.
pub fn check_species_sum(table: &RecordTable, config: &CatalogConfig) -> RuleOutcome {
    let mut out = Collector::new(RuleId::SpeciesSum, table);
    let totals = species_totals(table, &config.species_columns);
    for (row, total) in table.rows().zip(&totals) {
        let planted = table.cell(row, schema::TREES_PLANTED).as_number();
        match (total.as_number(), planted) {
            (Some(sum), Some(planted)) if (sum - planted).abs() <= SUM_EPSILON => {}
            (Some(sum), _) => out.flag(
                row,
                schema::TREES_PLANTED,
                format!("species total {} does not match trees planted", format_number(sum)),
            ),
            (None, _) => out.flag(
                row,
                schema::TOTAL_SPECIES_DISTRIBUTED,
                "species counts are not numeric",
            ),
        }
    }
    out.finish()
}

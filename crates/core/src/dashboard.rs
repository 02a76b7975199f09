//! Field-manager dashboard aggregates.
//!
//! Computes the figures the dashboard charts plot (land totals, Yes/No
//! distributions, plantation trend, top species, collections by mode) over
//! the clean table. Rendering is left to the consumer. Optional columns that
//! are absent produce empty or zero aggregates.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema;
use crate::table::{Cell, RecordTable};
use crate::types::{RowIndex, YesNo};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Label of the aggregate view over every district.
pub const ALL_DISTRICTS_LABEL: &str = "Total Area";

/// Prefix the dashboard puts in front of district codes.
const DISTRICT_LABEL_PREFIX: &str = "District ";

/// Number of species shown in the top-species chart.
pub const TOP_SPECIES_COUNT: usize = 5;

// ---------------------------------------------------------------------------
// District filter
// ---------------------------------------------------------------------------

/// Which rows a dashboard view covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistrictFilter {
    All,
    District(String),
}

impl DistrictFilter {
    /// Parse a dropdown label. Accepts `Total Area`, `District A` or a bare `A`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label == ALL_DISTRICTS_LABEL {
            return Self::All;
        }
        let code = label.strip_prefix(DISTRICT_LABEL_PREFIX).unwrap_or(label);
        Self::District(code.to_string())
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => ALL_DISTRICTS_LABEL.to_string(),
            Self::District(code) => format!("{DISTRICT_LABEL_PREFIX}{code}"),
        }
    }

    pub fn matches(&self, table: &RecordTable, row: RowIndex) -> bool {
        match self {
            Self::All => true,
            Self::District(code) => table.cell(row, schema::DISTRICT).as_text() == Some(code.as_str()),
        }
    }
}

/// Dropdown options: the aggregate view first, then each district in
/// first-seen order.
pub fn district_options(table: &RecordTable) -> Vec<DistrictFilter> {
    let mut options = vec![DistrictFilter::All];
    for row in table.rows() {
        if let Some(code) = table.cell(row, schema::DISTRICT).as_text() {
            let option = DistrictFilter::District(code.to_string());
            if !options.contains(&option) {
                options.push(option);
            }
        }
    }
    options
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LandTotals {
    pub total_land_area_acre: f64,
    pub area_f4f_acre: f64,
}

/// Yes/No distribution; both keys are always reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YesNoCounts {
    pub yes: usize,
    pub no: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub trees_planted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesCount {
    pub species: String,
    pub planted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeAmount {
    pub mode: String,
    pub amount: f64,
}

/// All dashboard figures for one district view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub view: String,
    pub records: usize,
    pub land: LandTotals,
    pub water_available: YesNoCounts,
    pub electricity_available: YesNoCounts,
    pub payment_status: YesNoCounts,
    pub cc_training: YesNoCounts,
    pub plantation_trend: Vec<TrendPoint>,
    pub top_species: Vec<SpeciesCount>,
    pub amount_by_mode: Vec<ModeAmount>,
}

fn sum(table: &RecordTable, rows: &[RowIndex], column: &str) -> f64 {
    rows.iter()
        .filter_map(|&r| table.cell(r, column).as_number())
        .sum()
}

fn yes_no_counts(table: &RecordTable, rows: &[RowIndex], column: &str) -> YesNoCounts {
    let mut counts = YesNoCounts::default();
    for &row in rows {
        match table.cell(row, column).as_flag() {
            Some(YesNo::Yes) => counts.yes += 1,
            Some(YesNo::No) => counts.no += 1,
            None => {}
        }
    }
    counts
}

/// Trees planted per plantation date, ascending. Undated rows are skipped.
pub fn plantation_trend(table: &RecordTable, rows: &[RowIndex]) -> Vec<TrendPoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &row in rows {
        if let Cell::Date(date) = table.cell(row, schema::PLANTATION_DATE) {
            let planted = table.cell(row, schema::TREES_PLANTED).as_number().unwrap_or(0.0);
            *by_date.entry(*date).or_default() += planted;
        }
    }
    by_date
        .into_iter()
        .map(|(date, trees_planted)| TrendPoint { date, trees_planted })
        .collect()
}

/// The most planted species, descending. Ties keep catalog order.
pub fn top_species(table: &RecordTable, rows: &[RowIndex], limit: usize) -> Vec<SpeciesCount> {
    let mut counts: Vec<SpeciesCount> = schema::SPECIES_COLUMNS
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| SpeciesCount {
            species: c.to_string(),
            planted: sum(table, rows, c),
        })
        .collect();
    counts.sort_by(|a, b| b.planted.total_cmp(&a.planted));
    counts.truncate(limit);
    counts
}

/// Amount collected per collection mode, descending. Rows without a mode
/// are left out.
pub fn amount_by_mode(table: &RecordTable, rows: &[RowIndex]) -> Vec<ModeAmount> {
    let mut by_mode: BTreeMap<&str, f64> = BTreeMap::new();
    for &row in rows {
        if let Some(mode) = table.cell(row, schema::MODE_OF_COLLECTION).as_text() {
            let amount = table.cell(row, schema::AMOUNT_COLLECTED).as_number().unwrap_or(0.0);
            *by_mode.entry(mode).or_default() += amount;
        }
    }
    let mut amounts: Vec<ModeAmount> = by_mode
        .into_iter()
        .map(|(mode, amount)| ModeAmount {
            mode: mode.to_string(),
            amount,
        })
        .collect();
    amounts.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    amounts
}

impl DashboardSummary {
    pub fn compute(table: &RecordTable, filter: &DistrictFilter) -> Self {
        let rows: Vec<RowIndex> = table.rows().filter(|&r| filter.matches(table, r)).collect();
        Self {
            view: filter.label(),
            records: rows.len(),
            land: LandTotals {
                total_land_area_acre: sum(table, &rows, schema::TOTAL_LAND_AREA_ACRE),
                area_f4f_acre: sum(table, &rows, schema::AREA_F4F_ACRE),
            },
            water_available: yes_no_counts(table, &rows, schema::WATER_AVAILABLE),
            electricity_available: yes_no_counts(table, &rows, schema::ELECTRICITY_AVAILABLE),
            payment_status: yes_no_counts(table, &rows, schema::FARMER_PAYMENT_COLLECTED),
            cc_training: yes_no_counts(table, &rows, schema::CC_TRAINING_UPLOADED),
            plantation_trend: plantation_trend(table, &rows),
            top_species: top_species(table, &rows, TOP_SPECIES_COUNT),
            amount_by_mode: amount_by_mode(table, &rows),
        }
    }
}

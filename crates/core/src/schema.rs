//! Column names and semantic types of the farmer/plantation record table.
//!
//! Every column a rule or a dashboard aggregate reads is declared here with
//! its [`ColumnKind`]. Columns the schema does not know about load as
//! [`ColumnKind::Text`] and pass through to the outputs untouched.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Identity and geography
// ---------------------------------------------------------------------------

pub const UID: &str = "uid";
pub const FARMER_NAME: &str = "farmer_name";
pub const PROGRAM_YEAR: &str = "program_year";
pub const DISTRICT: &str = "District";
pub const BLOCK: &str = "Block";

// ---------------------------------------------------------------------------
// Numeric columns
// ---------------------------------------------------------------------------

pub const TOTAL_LAND_AREA_ACRE: &str = "total_land_area_acre";
pub const AREA_F4F_ACRE: &str = "area_f4f_acre";
pub const TREES_PLANTED: &str = "trees_planted";
pub const AMOUNT_COLLECTED: &str = "amount_collected";

/// Derived column holding the per-row sum of [`SPECIES_COLUMNS`].
pub const TOTAL_SPECIES_DISTRIBUTED: &str = "total_species_distributed";

/// Per-species planted-count columns, in export order.
pub const SPECIES_COLUMNS: &[&str] = &[
    "mango_native",
    "mango_grafted_kesar",
    "lemon_sai_sharbati",
    "sitaphal_native",
    "sitaphal_golden",
    "sitaphal _balanagar",
    "awala",
    "awala_grafted",
    "peru",
    "peru_sardar",
    "chincha",
    "chincha_grafted",
    "Jamun",
    "Jamun_bhardoli",
    "chikku",
    "orange",
    "mosambi",
    "dalimb",
    "ramphal",
    "drumstick_Koimb",
    "bamboo",
    "karwand",
    "arjun",
    "katesawar",
    "karanj",
    "kaduneem",
    "kanchan",
    "kadamb",
    "bhendi",
    "shirish",
    "ain",
    "pimpal",
    "vad",
    "tamhan",
    "waval",
    "palas",
    "babhul",
    "bakul",
];

// ---------------------------------------------------------------------------
// Yes/No columns
// ---------------------------------------------------------------------------

pub const CONTRACT_UPLOADED: &str = "contract uploaded";
pub const FARMER_PAYMENT_COLLECTED: &str = "farmer_payment_collected";
pub const CC_TRAINING_UPLOADED: &str = "cc_training_uploaded";
pub const WATER_AVAILABLE: &str = "water_available";
pub const ELECTRICITY_AVAILABLE: &str = "electricity_available";

/// Document-upload, training and payment flags checked by the Yes/No rule.
pub const YES_NO_COLUMNS: &[&str] = &[
    "kml_uploaded",
    CONTRACT_UPLOADED,
    "land_record_uploaded",
    CC_TRAINING_UPLOADED,
    "soil_sample_collected",
    "drone_ortho_taken",
    FARMER_PAYMENT_COLLECTED,
    "baseline_survey",
];

// ---------------------------------------------------------------------------
// Date columns
// ---------------------------------------------------------------------------

pub const PLANTATION_DATE: &str = "plantation_date";

pub const DATE_COLUMNS: &[&str] = &[
    "farmer_payment_date",
    "contract_date",
    PLANTATION_DATE,
    "cc_training_date",
];

// ---------------------------------------------------------------------------
// Other dashboard columns
// ---------------------------------------------------------------------------

pub const MODE_OF_COLLECTION: &str = "mode_of_collection";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Semantic type a raw cell is coerced into before rules run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text, kept as-is.
    Text,
    /// Record identifier; any non-null text.
    Identifier,
    /// Four-digit program year.
    Year,
    /// Fractional quantity (acres, rupees).
    Decimal,
    /// Whole-number quantity (tree counts). Stored as `f64` like `Decimal`.
    Count,
    /// `Yes` / `No` flag.
    YesNo,
    /// Calendar date in one of the accepted text formats.
    Date,
}

/// Maps column names to their semantic type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    kinds: HashMap<String, ColumnKind>,
}

impl Schema {
    /// An empty schema: every column loads as text.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) the kind of `column`.
    pub fn with(mut self, column: &str, kind: ColumnKind) -> Self {
        self.kinds.insert(column.to_string(), kind);
        self
    }

    /// The schema of the plantation programme export.
    pub fn farmer_records() -> Self {
        let mut schema = Self::new()
            .with(UID, ColumnKind::Identifier)
            .with(FARMER_NAME, ColumnKind::Text)
            .with(PROGRAM_YEAR, ColumnKind::Year)
            .with(DISTRICT, ColumnKind::Text)
            .with(BLOCK, ColumnKind::Text)
            .with(TOTAL_LAND_AREA_ACRE, ColumnKind::Decimal)
            .with(AREA_F4F_ACRE, ColumnKind::Decimal)
            .with(AMOUNT_COLLECTED, ColumnKind::Decimal)
            .with(TREES_PLANTED, ColumnKind::Count)
            .with(WATER_AVAILABLE, ColumnKind::YesNo)
            .with(ELECTRICITY_AVAILABLE, ColumnKind::YesNo)
            .with(MODE_OF_COLLECTION, ColumnKind::Text);
        for column in SPECIES_COLUMNS {
            schema = schema.with(column, ColumnKind::Count);
        }
        for column in YES_NO_COLUMNS {
            schema = schema.with(column, ColumnKind::YesNo);
        }
        for column in DATE_COLUMNS {
            schema = schema.with(column, ColumnKind::Date);
        }
        schema
    }

    /// Kind of `column`, defaulting to [`ColumnKind::Text`].
    pub fn kind_of(&self, column: &str) -> ColumnKind {
        self.kinds.get(column).copied().unwrap_or(ColumnKind::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farmer_schema_types_rule_columns() {
        let schema = Schema::farmer_records();
        assert_eq!(schema.kind_of(UID), ColumnKind::Identifier);
        assert_eq!(schema.kind_of(PROGRAM_YEAR), ColumnKind::Year);
        assert_eq!(schema.kind_of("sitaphal _balanagar"), ColumnKind::Count);
        assert_eq!(schema.kind_of(CONTRACT_UPLOADED), ColumnKind::YesNo);
        assert_eq!(schema.kind_of("contract_date"), ColumnKind::Date);
    }

    #[test]
    fn unknown_columns_are_text() {
        assert_eq!(Schema::farmer_records().kind_of("remarks"), ColumnKind::Text);
    }

    #[test]
    fn species_list_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        assert!(SPECIES_COLUMNS.iter().all(|c| seen.insert(*c)));
        assert_eq!(SPECIES_COLUMNS.len(), 38);
    }
}

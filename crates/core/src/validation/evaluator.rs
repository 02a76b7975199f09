//! Runs the full rule catalog over one table.

use std::collections::BTreeSet;

use super::catalog::{check_columns, evaluate_rule, species_totals, CatalogConfig};
use super::failures::FailureSet;
use super::rules::{RuleId, RuleOutcome};
use crate::error::CoreError;
use crate::schema;
use crate::table::RecordTable;

/// Upper bound on uids / values echoed into a single log line.
const LOG_SAMPLE_LIMIT: usize = 20;

/// Owns one table and the failure set of its run.
#[derive(Debug)]
pub struct Validator {
    table: RecordTable,
    config: CatalogConfig,
    failures: FailureSet,
}

impl Validator {
    pub fn new(table: RecordTable, config: CatalogConfig) -> Self {
        Self {
            table,
            config,
            failures: FailureSet::new(),
        }
    }

    /// Confirm every column the catalog reads is present.
    pub fn check_schema(&self) -> Result<(), CoreError> {
        for rule in RuleId::CATALOG {
            check_columns(rule, &self.table, &self.config)?;
        }
        Ok(())
    }

    /// Run every rule exactly once, in catalog order.
    ///
    /// The failure set is rebuilt from scratch, so running twice on the same
    /// table yields the same result. Fails before any rule runs if the table
    /// is missing a column or the configuration is unusable.
    pub fn run_all_checks(&mut self) -> Result<(), CoreError> {
        tracing::info!(rows = self.table.len(), "Starting data quality checks");
        self.config.validate()?;
        self.check_schema()?;

        let totals = species_totals(&self.table, &self.config.species_columns);
        self.table.set_derived(schema::TOTAL_SPECIES_DISTRIBUTED, totals);

        let mut failures = FailureSet::new();
        for rule in RuleId::CATALOG {
            let outcome = evaluate_rule(rule, &self.table, &self.config);
            log_outcome(&outcome);
            failures.record(outcome);
        }
        self.failures = failures;

        tracing::info!(
            rows = self.table.len(),
            violations = self.failures.len(),
            failed_rows = self.failures.failed_rows().len(),
            "Data quality checks completed",
        );
        Ok(())
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn failures(&self) -> &FailureSet {
        &self.failures
    }

    pub fn into_parts(self) -> (RecordTable, FailureSet) {
        (self.table, self.failures)
    }
}

fn log_outcome(outcome: &RuleOutcome) {
    if outcome.is_clean() {
        tracing::debug!(rule = %outcome.rule, "Rule passed");
        return;
    }

    let uids: Vec<&str> = outcome
        .violations
        .iter()
        .map(|v| v.uid.as_deref().unwrap_or("<null>"))
        .take(LOG_SAMPLE_LIMIT)
        .collect();
    let values: BTreeSet<&str> = outcome
        .violations
        .iter()
        .map(|v| v.value.as_deref().unwrap_or("<null>"))
        .take(LOG_SAMPLE_LIMIT)
        .collect();

    tracing::error!(
        rule = %outcome.rule,
        rows = outcome.rows().len(),
        columns = ?outcome.columns(),
        values = ?values,
        uids = ?uids,
        "{}",
        outcome.rule.description()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::table;
    use crate::table::Cell;

    const HEADERS: &[&str] = &[
        "uid",
        "farmer_name",
        "program_year",
        "District",
        "Block",
        "contract_date",
        "total_land_area_acre",
        "area_f4f_acre",
        "contract uploaded",
        "farmer_payment_collected",
        "trees_planted",
        "mango_native",
        "awala",
    ];

    fn config() -> CatalogConfig {
        CatalogConfig {
            date_columns: vec!["contract_date".into()],
            yes_no_columns: vec!["contract uploaded".into(), "farmer_payment_collected".into()],
            species_columns: vec!["mango_native".into(), "awala".into()],
            ..CatalogConfig::default()
        }
    }

    fn sample() -> RecordTable {
        table(
            HEADERS,
            &[
                &["U1", "Asha", "2023", "A", "p", "31-Jul-2023", "2", "1", "Yes", "Yes", "400", "300", "100"],
                &["U2", "Ravi", "202A", "Z", "q", "", "2", "1", "No", "No", "300", "300", ""],
                &["U2", "Ravi", "2023", "A", "q", "", "2", "1", "Yes", "No", "400", "400", ""],
            ],
        )
    }

    #[test]
    fn runs_every_rule_and_accumulates_failures() {
        let mut validator = Validator::new(sample(), config());
        validator.run_all_checks().unwrap();

        let failures = validator.failures();
        assert_eq!(failures.failed_rows().into_iter().collect::<Vec<_>>(), vec![1, 2]);
        let per_rule = failures.rows_per_rule();
        assert_eq!(per_rule[&RuleId::ProgramYearFormat], 1);
        assert_eq!(per_rule[&RuleId::DistrictBlock], 1);
        assert_eq!(per_rule[&RuleId::TreesPlantedRange], 1);
        assert_eq!(per_rule[&RuleId::UniqueUid], 1);
        assert_eq!(per_rule[&RuleId::PaymentBeforeContract], 1);
        assert!(!per_rule.contains_key(&RuleId::SpeciesSum));
    }

    #[test]
    fn computes_species_total_column() {
        let mut validator = Validator::new(sample(), config());
        validator.run_all_checks().unwrap();
        let t = validator.table();
        assert_eq!(t.cell(0, schema::TOTAL_SPECIES_DISTRIBUTED), &Cell::Number(400.0));
        assert_eq!(t.cell(1, schema::TOTAL_SPECIES_DISTRIBUTED), &Cell::Number(300.0));
    }

    #[test]
    fn rerun_produces_identical_failure_set() {
        let mut validator = Validator::new(sample(), config());
        validator.run_all_checks().unwrap();
        let first = validator.failures().clone();
        validator.run_all_checks().unwrap();
        assert_eq!(validator.failures(), &first);
        assert_eq!(validator.table().derived().len(), 1);
    }

    #[test]
    fn missing_column_aborts_before_any_rule() {
        let t = table(&["uid", "farmer_name"], &[&["U1", "Asha"]]);
        let mut validator = Validator::new(t, config());
        let err = validator.run_all_checks().unwrap_err();
        assert!(matches!(err, CoreError::Schema { .. }));
        assert!(validator.failures().is_empty());
        assert!(validator.table().derived().is_empty());
    }
}

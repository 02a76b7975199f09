//! Accumulator for rule violations across one validation run.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::rules::{RuleId, RuleOutcome, RuleViolation};
use crate::table::RecordTable;
use crate::types::RowIndex;

/// Identity used to collapse repeated failures of the same record.
///
/// Rows without a uid cannot be matched to each other, so each keeps its
/// own position as identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Uid(String),
    Row(RowIndex),
}

impl RecordKey {
    pub fn of(table: &RecordTable, row: RowIndex) -> Self {
        match table.uid(row) {
            Some(uid) => Self::Uid(uid.to_string()),
            None => Self::Row(row),
        }
    }
}

/// Every violation found so far, in rule order. A row that fails several
/// rules appears several times until [`FailureSet::deduplicated`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureSet {
    violations: Vec<RuleViolation>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one rule's findings.
    pub fn record(&mut self, outcome: RuleOutcome) {
        self.violations.extend(outcome.violations);
    }

    pub fn violations(&self) -> &[RuleViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Every row that failed at least one rule, ascending.
    pub fn failed_rows(&self) -> BTreeSet<RowIndex> {
        self.violations.iter().map(|v| v.row).collect()
    }

    /// Number of distinct rows each rule flagged.
    pub fn rows_per_rule(&self) -> BTreeMap<RuleId, usize> {
        let mut rows: BTreeMap<RuleId, BTreeSet<RowIndex>> = BTreeMap::new();
        for v in &self.violations {
            rows.entry(v.rule).or_default().insert(v.row);
        }
        rows.into_iter().map(|(rule, set)| (rule, set.len())).collect()
    }

    /// Distinct rules each row failed, in catalog order.
    pub fn rules_for_row(&self, row: RowIndex) -> Vec<RuleId> {
        let rules: BTreeSet<RuleId> = self
            .violations
            .iter()
            .filter(|v| v.row == row)
            .map(|v| v.rule)
            .collect();
        rules.into_iter().collect()
    }

    /// One row per distinct record, in input order. For a uid shared by
    /// several failing rows the earliest row is kept.
    pub fn deduplicated(&self, table: &RecordTable) -> Vec<RowIndex> {
        let mut seen = HashSet::new();
        self.failed_rows()
            .into_iter()
            .filter(|&row| seen.insert(RecordKey::of(table, row)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::table;

    fn outcome(rule: RuleId, rows: &[RowIndex]) -> RuleOutcome {
        RuleOutcome {
            rule,
            violations: rows
                .iter()
                .map(|&row| RuleViolation {
                    row,
                    uid: None,
                    rule,
                    column: "uid".into(),
                    value: None,
                    message: "x".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn record_accumulates_across_rules() {
        let mut set = FailureSet::new();
        set.record(outcome(RuleId::UniqueUid, &[1]));
        set.record(outcome(RuleId::TreesPlantedRange, &[1, 2]));
        assert_eq!(set.len(), 3);
        assert_eq!(set.failed_rows().into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(set.rows_per_rule()[&RuleId::TreesPlantedRange], 2);
        assert_eq!(
            set.rules_for_row(1),
            vec![RuleId::UniqueUid, RuleId::TreesPlantedRange]
        );
    }

    #[test]
    fn rules_for_row_is_distinct_regardless_of_record_order() {
        let mut set = FailureSet::new();
        set.record(outcome(RuleId::TreesPlantedRange, &[0]));
        set.record(outcome(RuleId::UniqueUid, &[0]));
        set.record(outcome(RuleId::TreesPlantedRange, &[0]));
        assert_eq!(
            set.rules_for_row(0),
            vec![RuleId::UniqueUid, RuleId::TreesPlantedRange]
        );
    }

    #[test]
    fn dedup_collapses_shared_uid() {
        let t = table(&["uid"], &[&["U1"], &["U2"], &["U1"]]);
        let mut set = FailureSet::new();
        set.record(outcome(RuleId::UniqueUid, &[2]));
        set.record(outcome(RuleId::TreesPlantedRange, &[0, 2]));
        assert_eq!(set.deduplicated(&t), vec![0]);
    }

    #[test]
    fn dedup_keeps_every_null_uid_row() {
        let t = table(&["uid"], &[&[""], &[""], &["U3"]]);
        let mut set = FailureSet::new();
        set.record(outcome(RuleId::UniqueUid, &[0, 1]));
        set.record(outcome(RuleId::MandatoryFields, &[0, 1]));
        assert_eq!(set.deduplicated(&t), vec![0, 1]);
    }
}

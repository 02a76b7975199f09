use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use f4f_core::error::CoreError;
use f4f_core::partition::{CleanPolicy, OutputPaths};
use f4f_core::pipeline::{run_quality_checks, RunOptions};
use f4f_core::schema::{self, Schema};
use f4f_core::table::RecordTable;
use f4f_core::validation::catalog::CatalogConfig;
use f4f_core::validation::evaluator::Validator;
use f4f_core::validation::rules::RuleId;

fn headers() -> Vec<String> {
    let mut h: Vec<&str> = vec![
        schema::UID,
        schema::FARMER_NAME,
        schema::PROGRAM_YEAR,
        schema::DISTRICT,
        schema::BLOCK,
        schema::TOTAL_LAND_AREA_ACRE,
        schema::AREA_F4F_ACRE,
        schema::TREES_PLANTED,
    ];
    h.extend(schema::DATE_COLUMNS);
    h.extend(schema::YES_NO_COLUMNS);
    h.extend(schema::SPECIES_COLUMNS);
    h.into_iter().map(str::to_string).collect()
}

/// A record passing every rule, with `overrides` applied.
fn record(uid: &str, overrides: &[(&str, &str)]) -> Vec<String> {
    let mut values: BTreeMap<&str, &str> = BTreeMap::new();
    values.insert(schema::UID, uid);
    values.insert(schema::FARMER_NAME, "Asha Patil");
    values.insert(schema::PROGRAM_YEAR, "2023");
    values.insert(schema::DISTRICT, "A");
    values.insert(schema::BLOCK, "p");
    values.insert(schema::TOTAL_LAND_AREA_ACRE, "2.5");
    values.insert(schema::AREA_F4F_ACRE, "1");
    values.insert(schema::TREES_PLANTED, "400");
    values.insert("mango_native", "250");
    values.insert("awala", "150");
    for &column in schema::DATE_COLUMNS {
        values.insert(column, "31-Jul-2023");
    }
    for &column in schema::YES_NO_COLUMNS {
        values.insert(column, "Yes");
    }
    for &(column, value) in overrides {
        values.insert(column, value);
    }
    headers()
        .iter()
        .map(|h| values.get(h.as_str()).copied().unwrap_or("0").to_string())
        .collect()
}

fn load(rows: Vec<Vec<String>>) -> RecordTable {
    RecordTable::from_records(headers(), rows, &Schema::farmer_records()).unwrap()
}

fn options(dir: &Path, policy: CleanPolicy) -> RunOptions {
    RunOptions {
        outputs: OutputPaths {
            clean: dir.join("cleaned_data.csv"),
            failed: dir.join("failed_data.csv"),
        },
        policy,
        catalog: CatalogConfig::default(),
    }
}

fn uids(path: &PathBuf) -> Vec<String> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let position = reader
        .headers()
        .unwrap()
        .iter()
        .position(|h| h == schema::UID)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().get(position).unwrap().to_string())
        .collect()
}

fn mixed_table() -> RecordTable {
    load(vec![
        record("U1", &[]),
        record("U2", &[(schema::TREES_PLANTED, "300"), ("mango_native", "150")]),
        record("U3", &[(schema::PROGRAM_YEAR, "202A"), (schema::DISTRICT, "Z")]),
        record("U1", &[]),
        record("U4", &[("contract uploaded", "Yes"), ("farmer_payment_collected", "No")]),
        record("U5", &[("contract_date", "32-Jul-2023"), ("plantation_date", "")]),
    ])
}

#[test]
fn clean_row_passes_every_rule() {
    let mut validator = Validator::new(load(vec![record("U1", &[])]), CatalogConfig::default());
    validator.run_all_checks().unwrap();
    assert!(validator.failures().is_empty(), "{:?}", validator.failures());
}

#[test]
fn every_record_is_accounted_for() {
    for policy in [CleanPolicy::ExcludeFailed, CleanPolicy::Advisory] {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), policy);
        let run = run_quality_checks(mixed_table(), &opts).unwrap();

        let mut seen: HashSet<String> = uids(&opts.outputs.clean).into_iter().collect();
        seen.extend(uids(&opts.outputs.failed));
        for uid in ["U1", "U2", "U3", "U4", "U5"] {
            assert!(seen.contains(uid), "{uid} missing under {policy}");
        }
        assert_eq!(run.report.total, 6);
    }
}

#[test]
fn exclude_failed_clean_output_has_unique_uids() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), CleanPolicy::ExcludeFailed);
    let run = run_quality_checks(mixed_table(), &opts).unwrap();

    assert_eq!(uids(&opts.outputs.clean), vec!["U1"]);
    assert_eq!(run.report.clean, 1);
}

#[test]
fn failed_output_has_one_row_per_uid() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), CleanPolicy::Advisory);
    let run = run_quality_checks(mixed_table(), &opts).unwrap();

    let failed = uids(&opts.outputs.failed);
    let distinct: HashSet<&String> = failed.iter().collect();
    assert_eq!(failed.len(), distinct.len());
    assert_eq!(failed, vec!["U2", "U3", "U1", "U4", "U5"]);
    assert_eq!(run.report.failed, 5);
    assert_eq!(run.report.clean, 6);
}

#[test]
fn outputs_carry_the_species_total_column() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), CleanPolicy::Advisory);
    run_quality_checks(mixed_table(), &opts).unwrap();

    let mut reader = csv::Reader::from_path(&opts.outputs.clean).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().last(), Some(schema::TOTAL_SPECIES_DISTRIBUTED));
    let first = reader.records().next().unwrap().unwrap();
    assert_eq!(first.iter().last(), Some("400"));
}

#[test]
fn rules_flag_the_documented_cases() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_quality_checks(mixed_table(), &options(dir.path(), CleanPolicy::Advisory)).unwrap();

    let flagged = |rule: RuleId| -> Vec<Option<String>> {
        run.failures
            .violations()
            .iter()
            .filter(|v| v.rule == rule)
            .map(|v| v.uid.clone())
            .collect()
    };
    assert_eq!(flagged(RuleId::TreesPlantedRange), vec![Some("U2".into())]);
    assert_eq!(flagged(RuleId::ProgramYearFormat), vec![Some("U3".into())]);
    assert_eq!(flagged(RuleId::DistrictBlock), vec![Some("U3".into())]);
    assert_eq!(flagged(RuleId::UniqueUid), vec![Some("U1".into())]);
    assert_eq!(flagged(RuleId::PaymentBeforeContract), vec![Some("U4".into())]);
    assert_eq!(flagged(RuleId::DateValidity), vec![Some("U5".into())]);
    assert!(flagged(RuleId::SpeciesSum).is_empty());
}

#[test]
fn missing_column_fails_without_writing_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), CleanPolicy::ExcludeFailed);
    let table = RecordTable::from_reader(
        "uid,farmer_name,program_year\nU1,Asha,2023\n".as_bytes(),
        &Schema::farmer_records(),
    )
    .unwrap();

    let err = run_quality_checks(table, &opts).unwrap_err();
    assert_matches!(err, CoreError::Schema { rule: "district_block", .. });
    assert_eq!(err.stage(), "schema");
    assert!(!opts.outputs.clean.exists());
    assert!(!opts.outputs.failed.exists());
}

#[test]
fn unwritable_destination_is_a_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path(), CleanPolicy::ExcludeFailed);
    std::fs::write(&opts.outputs.failed, "previous").unwrap();
    opts.outputs.clean = dir.path().join("taken");
    std::fs::create_dir(&opts.outputs.clean).unwrap();

    let err = run_quality_checks(mixed_table(), &opts).unwrap_err();
    assert_matches!(err, CoreError::Persistence { .. });
    assert_eq!(err.stage(), "persistence");
    assert!(opts.outputs.clean.is_dir());
    assert_eq!(std::fs::read_to_string(&opts.outputs.failed).unwrap(), "previous");
}

#[test]
fn violation_report_lists_every_violation() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_quality_checks(mixed_table(), &options(dir.path(), CleanPolicy::Advisory)).unwrap();
    let path = dir.path().join("report.json");
    run.write_violation_report(&path).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(json["summary"]["total"], 6);
    assert_eq!(json["summary"]["policy"], "advisory");
    assert_eq!(
        json["violations"].as_array().unwrap().len(),
        run.failures.len()
    );
    assert_eq!(json["summary"]["rows_per_rule"]["unique_uid"], 1);
}

#[test]
fn empty_failure_set_still_writes_header_only_failed_table() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), CleanPolicy::ExcludeFailed);
    let run = run_quality_checks(load(vec![record("U1", &[])]), &opts).unwrap();
    assert_eq!(run.report.failed, 0);
    assert!(uids(&opts.outputs.failed).is_empty());
    assert_eq!(uids(&opts.outputs.clean), vec!["U1"]);
}

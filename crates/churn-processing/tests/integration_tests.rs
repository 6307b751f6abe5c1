//! Integration tests for dataset loading, encoding and statistics.
//!
//! These tests run against the CSV fixtures in `tests/fixtures`.

use churn_processing::{
    CategoricalField, ChurnLabel, Dataset, DatasetConfig, DatasetStatistics, FEATURE_NAMES,
    MalformedRowPolicy, ProcessingError, encode_categorical, encode_frame, encode_record,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(filename: &str) -> Result<Dataset, ProcessingError> {
    Dataset::load(fixtures_path().join(filename), &DatasetConfig::default())
}

fn column_as_f64(frame: &DataFrame, name: &str) -> Vec<f64> {
    frame
        .column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_customers() {
    let dataset = load("customers.csv").unwrap();
    assert_eq!(dataset.len(), 40);

    let first = &dataset.records()[0];
    assert_eq!(first.customer_id.as_deref(), Some("1"));
    assert_eq!(first.age, Some(38));
    assert_eq!(first.contract_length.as_deref(), Some("Quarterly"));
    assert_eq!(first.total_spend, Some(123.2));
    assert_eq!(first.churn, Some(ChurnLabel::Churned));
}

#[test]
fn test_load_missing_file() {
    let err = load("does_not_exist.csv").unwrap_err();
    assert_eq!(err.error_code(), "IO_ERROR");
}

#[test]
fn test_load_missing_column() {
    match load("missing_column.csv") {
        Err(ProcessingError::ColumnNotFound(name)) => assert_eq!(name, "Payment Delay"),
        other => panic!("expected ColumnNotFound, got {:?}", other),
    }
}

#[test]
fn test_load_ignores_extra_columns() {
    let dataset = load("extra_column.csv").unwrap();
    assert_eq!(dataset.len(), 4);
    let encoded = dataset.encode(MalformedRowPolicy::FailFast).unwrap();
    assert_eq!(encoded.len(), 4);
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_malformed_rows_fail_fast() {
    let dataset = load("malformed.csv").unwrap();
    let err = dataset.encode(MalformedRowPolicy::FailFast).unwrap_err();

    assert!(err.to_string().contains("Row 2"));
    assert!(matches!(
        err.root(),
        ProcessingError::InvalidCategory { value, .. } if value == "Gold"
    ));
}

#[test]
fn test_malformed_rows_dropped() {
    let dataset = load("malformed.csv").unwrap();
    let encoded = dataset.encode(MalformedRowPolicy::Drop).unwrap();

    assert_eq!(encoded.dropped_rows, 2);
    assert_eq!(encoded.source_rows, vec![0, 1, 3, 5]);
    assert_eq!(encoded.labels.len(), encoded.features.len());
}

/// The per-record encoder (serving) and the column encoder (statistics)
/// must agree on every row.
#[test]
fn test_record_and_frame_encoders_agree() {
    let dataset = load("customers.csv").unwrap();
    let frame = encode_frame(dataset.frame()).unwrap();

    let columns: Vec<Vec<f64>> = FEATURE_NAMES
        .iter()
        .map(|name| column_as_f64(&frame, name))
        .collect();

    for (row, record) in dataset.records().iter().enumerate() {
        let vector = encode_record(record).unwrap();
        for (feature, column) in columns.iter().enumerate() {
            assert_eq!(
                vector[feature], column[row],
                "row {} feature {}",
                row, FEATURE_NAMES[feature]
            );
        }
    }
}

#[test]
fn test_encoded_dataset_matches_encode_record() {
    let dataset = load("customers.csv").unwrap();
    let encoded = dataset.encode(MalformedRowPolicy::FailFast).unwrap();

    for (vector, &row) in encoded.features.iter().zip(&encoded.source_rows) {
        assert_eq!(*vector, encode_record(&dataset.records()[row]).unwrap());
    }
    assert_eq!(encoded.class_counts(), [20, 20]);
}

#[test]
fn test_gender_codes_on_real_rows() {
    let dataset = load("customers.csv").unwrap();
    for record in dataset.records() {
        let gender = record.gender.as_deref().unwrap();
        let expected = if gender == "Male" { 0 } else { 1 };
        assert_eq!(
            encode_categorical(CategoricalField::Gender, gender).unwrap(),
            expected
        );
        assert_eq!(encode_record(record).unwrap()[1], f64::from(expected));
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_statistics_on_fixture() {
    let dataset = load("customers.csv").unwrap();
    let stats = DatasetStatistics::compute(&dataset).unwrap();

    assert_eq!(stats.rows, 40);
    assert_eq!(stats.churn_distribution.total(), 40);
    assert_eq!(stats.churn_distribution.churned, 20);

    let per_contract: usize = stats
        .contract_churn
        .iter()
        .map(|row| row.counts.total())
        .sum();
    assert_eq!(per_contract, 40);

    // Monthly contracts only appear among churners in this fixture
    let monthly = &stats.contract_churn[0];
    assert_eq!(monthly.contract_length, "Monthly");
    assert_eq!(monthly.counts.stayed, 0);

    let corr = &stats.correlation;
    for name in &corr.columns {
        let diag = corr.get(name, name).unwrap();
        assert!((diag - 1.0).abs() < 1e-9, "{}: {}", name, diag);
    }
    assert!(corr.get("Support Calls", "Churn").unwrap() > 0.5);
}

#[test]
fn test_statistics_reject_unknown_category() {
    let dataset = load("malformed.csv").unwrap();
    assert!(DatasetStatistics::compute(&dataset).is_err());
}

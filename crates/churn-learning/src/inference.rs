//! Single-record and batch inference.
//!
//! Every input goes through [`validate_record`] and [`Customer::encode`],
//! the same encoder used for training, before the classifier is called.
//! A record the encoder rejects never reaches the classifier.

use crate::classifier::Classifier;
use crate::config::ServingConfig;
use crate::error::{LearningError, Result};
use crate::metrics::ModelStats;
use crate::model::TrainedModel;
use crate::prediction_log::{PredictionLog, PredictionLogEntry};
use crate::report::PredictionReport;
use chrono::{Local, NaiveDateTime};
use churn_processing::{
    ChurnLabel, Customer, CustomerRecord, Dataset, DatasetStatistics, ResultExt, encode_record,
    validate_record,
};
use tracing::{debug, info, warn};

/// What a single-record prediction produces.
#[derive(Debug)]
pub struct PredictionOutcome {
    pub label: ChurnLabel,
    pub report: PredictionReport,

    /// Set when the log append failed; the prediction is still valid.
    pub log_error: Option<LearningError>,
}

/// Predict one record, build its report and append it to the log.
///
/// The current local time is used as the timestamp.
///
/// # Errors
///
/// Returns the encoder's error (an unknown category or a missing field)
/// without calling the model. A failed log append is reported in
/// [`PredictionOutcome::log_error`] instead.
pub fn predict_one<C: Classifier + ?Sized>(
    record: &CustomerRecord,
    model: &C,
    log: &PredictionLog,
) -> Result<PredictionOutcome> {
    predict_one_at(record, model, log, Local::now().naive_local())
}

/// [`predict_one`] with an explicit timestamp.
pub fn predict_one_at<C: Classifier + ?Sized>(
    record: &CustomerRecord,
    model: &C,
    log: &PredictionLog,
    timestamp: NaiveDateTime,
) -> Result<PredictionOutcome> {
    let customer: Customer = validate_record(record)?;
    let label = model.predict_one(&customer.encode());
    debug!("Predicted {} for customer {:?}", label, customer.customer_id);

    let entry = PredictionLogEntry {
        timestamp,
        customer: customer.clone(),
        prediction: label,
    };
    let log_error = match log.append(&entry) {
        Ok(()) => None,
        Err(e) => {
            warn!("Prediction not logged: {}", e);
            Some(e)
        }
    };

    Ok(PredictionOutcome {
        label,
        report: PredictionReport::new(timestamp, customer, label),
        log_error,
    })
}

/// Predict every record, in order.
///
/// # Errors
///
/// The first record that cannot be encoded aborts the batch; the error
/// names its row.
pub fn predict_batch<C: Classifier + ?Sized>(
    records: &[CustomerRecord],
    model: &C,
) -> Result<Vec<ChurnLabel>> {
    let features = records
        .iter()
        .enumerate()
        .map(|(row, record)| encode_record(record).context(format!("Row {}", row)))
        .collect::<churn_processing::ProcessingResult<Vec<_>>>()?;

    Ok(model.predict_many(&features))
}

/// Loaded serving state: the model and the prediction log.
///
/// Built once by [`ChurnService::load`]; nothing is loaded lazily.
#[derive(Debug)]
pub struct ChurnService {
    model: TrainedModel,
    log: PredictionLog,
    config: ServingConfig,
}

impl ChurnService {
    /// Load the model named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ModelLoad`] if the model cannot be loaded.
    pub fn load(config: &ServingConfig) -> Result<Self> {
        let model = TrainedModel::load(&config.model_path)?;
        Ok(Self::new(model, config.clone()))
    }

    /// Serve an already loaded model.
    pub fn new(model: TrainedModel, config: ServingConfig) -> Self {
        let log = PredictionLog::new(config.log_path.clone());
        Self { model, log, config }
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn log(&self) -> &PredictionLog {
        &self.log
    }

    pub fn predict_one(&self, record: &CustomerRecord) -> Result<PredictionOutcome> {
        predict_one(record, &self.model, &self.log)
    }

    pub fn predict_batch(&self, records: &[CustomerRecord]) -> Result<Vec<ChurnLabel>> {
        predict_batch(records, &self.model)
    }

    fn load_dataset(&self) -> Result<Dataset> {
        Ok(Dataset::load(&self.config.dataset_path, &self.config.dataset)?)
    }

    /// Model-quality views over the configured dataset.
    ///
    /// Rows that cannot be encoded are handled by the dataset
    /// configuration's malformed-row policy.
    pub fn model_stats(&self) -> Result<ModelStats> {
        let dataset = self.load_dataset()?;
        let encoded = dataset.encode(self.config.dataset.malformed_rows)?;
        info!(
            "Scoring {} rows of {}",
            encoded.len(),
            self.config.dataset_path.display()
        );
        let predicted = self.model.predict_many(&encoded.features);
        ModelStats::compute(&self.model, &encoded.labels, &predicted)
    }

    /// Descriptive statistics of the configured dataset.
    pub fn dataset_statistics(&self) -> Result<DatasetStatistics> {
        let dataset = self.load_dataset()?;
        Ok(DatasetStatistics::compute_with_policy(
            &dataset,
            self.config.dataset.malformed_rows,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_processing::EncodedFeatureVector;
    use std::cell::Cell;

    /// Counts calls and predicts churn when support calls exceed 5.
    struct Counting {
        calls: Cell<usize>,
    }

    impl Classifier for Counting {
        fn predict_one(&self, features: &EncodedFeatureVector) -> ChurnLabel {
            self.calls.set(self.calls.get() + 1);
            if features[4] > 5.0 {
                ChurnLabel::Churned
            } else {
                ChurnLabel::Stayed
            }
        }
    }

    fn record() -> CustomerRecord {
        CustomerRecord::new()
            .age(30)
            .gender("Male")
            .tenure_months(12)
            .usage_frequency(10)
            .support_calls(2)
            .payment_delay_days(5)
            .subscription_type("Basic")
            .contract_length("Monthly")
            .total_spend(500.0)
            .last_interaction_days(5)
    }

    #[test]
    fn test_predict_one_logs_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::new(dir.path().join("log.csv"));
        let model = Counting { calls: Cell::new(0) };

        let outcome = predict_one(&record().support_calls(9), &model, &log).unwrap();
        assert_eq!(outcome.label, ChurnLabel::Churned);
        assert!(outcome.log_error.is_none());
        assert!(outcome.report.text().contains("likely to churn"));
        assert_eq!(model.calls.get(), 1);
        assert!(log.path().exists());
    }

    #[test]
    fn test_invalid_record_never_reaches_model() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::new(dir.path().join("log.csv"));
        let model = Counting { calls: Cell::new(0) };

        let err = predict_one(&record().subscription_type("Gold"), &model, &log).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CATEGORY");
        assert_eq!(model.calls.get(), 0);
        assert!(!log.path().exists());
    }

    #[test]
    fn test_log_failure_keeps_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let log = PredictionLog::new(dir.path().join("no-such-dir").join("log.csv"));
        let model = Counting { calls: Cell::new(0) };

        let outcome = predict_one(&record(), &model, &log).unwrap();
        assert_eq!(outcome.label, ChurnLabel::Stayed);
        assert!(matches!(outcome.log_error, Some(LearningError::LogWrite { .. })));
    }

    #[test]
    fn test_predict_batch_in_order() {
        let model = Counting { calls: Cell::new(0) };
        let records = vec![record(), record().support_calls(8), record()];
        let labels = predict_batch(&records, &model).unwrap();
        assert_eq!(
            labels,
            vec![ChurnLabel::Stayed, ChurnLabel::Churned, ChurnLabel::Stayed]
        );
    }

    #[test]
    fn test_predict_batch_reports_row() {
        let model = Counting { calls: Cell::new(0) };
        let mut broken = record();
        broken.age = None;
        let err = predict_batch(&[record(), broken], &model).unwrap_err();
        assert!(err.to_string().contains("Row 1"));
        assert_eq!(model.calls.get(), 0);
    }
}

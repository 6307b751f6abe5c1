//! Common types used throughout the churn-learning crate.
//!
//! - [`Metrics`]: evaluation metrics stored with a trained model
//! - [`ModelInfo`]: metadata about a trained model
//! - [`FeatureImportance`]: one row of the importance ranking

use crate::config::ForestParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metrics from model evaluation.
///
/// Precision, recall and F1 are support-weighted averages over both
/// classes, matching the "weighted avg" row of the classification report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Metrics {
    /// Accuracy on the training split.
    ///
    /// Used with `test_score` to detect overfitting.
    pub train_score: Option<f64>,

    /// Accuracy on the held-out split.
    pub test_score: Option<f64>,

    /// Accuracy score. Range: [0.0, 1.0].
    pub accuracy: Option<f64>,

    /// Weighted average precision. Range: [0.0, 1.0].
    pub precision: Option<f64>,

    /// Weighted average recall. Range: [0.0, 1.0].
    pub recall: Option<f64>,

    /// Weighted average F1 score. Range: [0.0, 1.0].
    pub f1_score: Option<f64>,
}

/// Information about a trained model.
///
/// Returned by [`TrainedModel::info()`](crate::TrainedModel::info).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ModelInfo {
    /// Name of the model algorithm.
    pub model_name: String,

    /// Name of the label column used during training.
    pub target_column: String,

    /// Names of the features in the order expected by the model.
    pub feature_names: Vec<String>,

    /// Class labels in class-index order.
    pub class_labels: Vec<String>,

    /// Hyperparameters the forest was fitted with.
    pub hyperparameters: ForestParams,

    /// Metrics on the hold-out split (and training accuracy).
    pub metrics: Metrics,

    /// Rows used for fitting.
    pub training_rows: usize,

    /// Rows held out for evaluation.
    pub test_rows: usize,

    /// Rows skipped because they could not be encoded.
    pub dropped_rows: usize,

    /// When training finished.
    pub trained_at: DateTime<Utc>,
}

/// A feature and its importance weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub weight: f64,
}

//! churn-learning: seeded churn classifier, inference and model-quality views.
//!
//! This crate trains a random forest on the shared feature encoding from
//! `churn-processing`, persists it as a JSON artifact, and serves it for
//! single-record and batch predictions.
//!
//! # Features
//!
//! - **Seeded Training**: bootstrap, feature subsampling and the hold-out split
//!   all derive from one seed, so a rerun reproduces the same forest
//! - **Single-Record Inference**: a prediction report plus an append-only CSV log
//! - **Batch Inference**: ordered predictions over many records
//! - **Model Quality**: accuracy, confusion matrix, classification report and
//!   feature-importance ranking
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use churn_learning::{PredictionLog, TrainedModel, TrainingConfig, predict_one, train};
//! use churn_processing::{CustomerRecord, Dataset, DatasetConfig};
//!
//! let dataset = Dataset::load("customer_churn.csv", &DatasetConfig::default())?;
//! let result = train(&dataset, &TrainingConfig::default())?;
//! result.model.save("model.json")?;
//!
//! let model = TrainedModel::load("model.json")?;
//! let log = PredictionLog::new("prediction_logs.csv");
//! let record = CustomerRecord::new()
//!     .age(30)
//!     .gender("Male")
//!     .tenure_months(12)
//!     .usage_frequency(10)
//!     .support_calls(2)
//!     .payment_delay_days(5)
//!     .subscription_type("Basic")
//!     .contract_length("Monthly")
//!     .total_spend(500.0)
//!     .last_interaction_days(5);
//!
//! let outcome = predict_one(&record, &model, &log)?;
//! println!("{}", outcome.report);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          churn-processing                        │
//! │   CustomerRecord ──► encode_record ──► EncodedFeatureVector      │
//! │   Dataset ─────────► encode ─────────► EncodedDataset            │
//! └───────────────────────────┬──────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           churn-learning                         │
//! │   TrainingConfig ──► train ──► TrainingResult ──► TrainedModel   │
//! │                                                       │          │
//! │            predict_one / predict_batch / ModelStats ◄─┘          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`]:
//!
//! - [`LearningError::ModelLoad`] - the artifact is missing, invalid, or was
//!   trained with different code tables; fatal for serving
//! - [`LearningError::LogWrite`] - a prediction could not be logged; reported
//!   alongside the prediction, never instead of it
//! - [`LearningError::Processing`] - the encoder rejected an input
//!
//! ```rust,ignore
//! use churn_learning::{LearningError, TrainedModel};
//!
//! match TrainedModel::load("model.json") {
//!     Ok(model) => println!("{} trees", model.forest().trees().len()),
//!     Err(LearningError::ModelLoad { path, reason }) => eprintln!("{}: {}", path, reason),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use churn_learning::{MaxFeatures, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .n_estimators(200)
//!     .max_depth(Some(12))
//!     .max_features(MaxFeatures::Log2)
//!     .random_seed(7)
//!     .build()?;
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod forest;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod prediction_log;
pub mod report;
pub mod training;
pub mod types;

// Re-export public API
//
// Configuration types
pub use config::{
    ClassWeight, ForestParams, MaxFeatures, ServingConfig, ServingConfigBuilder, TrainingConfig,
    TrainingConfigBuilder,
};
// Error types
pub use error::{LearningError, Result};
// Model types
pub use classifier::Classifier;
pub use forest::RandomForest;
pub use model::{MODEL_FORMAT_VERSION, TrainedModel};
// Inference
pub use inference::{ChurnService, PredictionOutcome, predict_batch, predict_one, predict_one_at};
pub use prediction_log::{LOG_COLUMNS, PredictionLog, PredictionLogEntry};
pub use report::PredictionReport;
// Training
pub use training::{TrainingResult, train, train_test_split};
// Metrics and result types
pub use metrics::{
    ClassScores, ClassificationReport, ConfusionMatrix, ModelStats, accuracy,
    classification_report, confusion_matrix, feature_importance_ranking,
};
pub use types::{FeatureImportance, Metrics, ModelInfo};

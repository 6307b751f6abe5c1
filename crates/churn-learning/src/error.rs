//! Error types for the churn-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! # Error Handling
//!
//! Two variants carry special meaning for serving:
//! - [`ModelLoad`](LearningError::ModelLoad) is fatal: nothing can be
//!   predicted without a model.
//! - [`LogWrite`](LearningError::LogWrite) is never returned from a
//!   prediction; it is reported next to the prediction instead.
//!
//! # Example
//!
//! ```no_run
//! use churn_learning::{LearningError, TrainedModel};
//!
//! fn serve() -> Result<(), LearningError> {
//!     // Errors are automatically propagated with ?
//!     let model = TrainedModel::load("model.json")?;
//!     println!("{}", model.info().model_name);
//!     Ok(())
//! }
//! ```

use churn_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for churn-learning operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// The trained model could not be loaded.
    ///
    /// Common causes:
    /// - The artifact does not exist at the configured path
    /// - The file is not a valid model artifact
    /// - The artifact was written by an incompatible format version
    /// - The artifact's encoding schema differs from this build's tables
    #[error("Failed to load model from '{path}': {reason}")]
    ModelLoad {
        /// The artifact path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// A prediction could not be appended to the prediction log.
    #[error("Failed to write prediction log '{path}': {reason}")]
    LogWrite {
        /// The log path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or evaluation.
    ///
    /// Common causes:
    /// - Label and prediction sequences of different lengths
    /// - Empty inputs
    /// - Only one class present in the training split
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The classifier does not expose feature importances.
    #[error("Classifier does not provide feature importances")]
    ImportancesUnavailable,

    /// Encoding or dataset error.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    /// Get a stable error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ModelLoad { .. } => "MODEL_LOAD",
            Self::LogWrite { .. } => "LOG_WRITE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::ImportancesUnavailable => "IMPORTANCES_UNAVAILABLE",
            Self::Processing(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Check if the error was caused by the caller's input (an unknown
    /// category, an absent field, mismatched label sequences).
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::Processing(e) => e.is_input_error(),
            Self::InvalidData(_) => true,
            _ => false,
        }
    }

    pub(crate) fn model_load(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::ModelLoad {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for churn-learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_passes_through_processing() {
        let err: LearningError = ProcessingError::InvalidCategory {
            field: "Subscription Type".to_string(),
            value: "Gold".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "INVALID_CATEGORY");
        assert!(err.is_input_error());
        assert!(err.to_string().contains("Gold"));
    }

    #[test]
    fn test_model_load_is_not_input_error() {
        let err = LearningError::model_load(std::path::Path::new("model.json"), "not found");
        assert_eq!(err.error_code(), "MODEL_LOAD");
        assert!(!err.is_input_error());
        assert!(err.to_string().contains("model.json"));
    }

    #[test]
    fn test_error_serialization() {
        let err = LearningError::LogWrite {
            path: "/nope/log.csv".to_string(),
            reason: "permission denied".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "LOG_WRITE");
        assert!(json["message"].as_str().unwrap().contains("/nope/log.csv"));
    }

    #[test]
    fn test_every_variant_has_distinct_code() {
        let errors = [
            LearningError::model_load(std::path::Path::new("model.json"), "missing"),
            LearningError::LogWrite {
                path: "log.csv".to_string(),
                reason: "denied".to_string(),
            },
            LearningError::InvalidConfig("n_estimators".to_string()),
            LearningError::InvalidData("empty".to_string()),
            LearningError::ImportancesUnavailable,
            ProcessingError::EmptyDataset.into(),
            std::io::Error::other("disk").into(),
            serde_json::from_str::<u32>("x").unwrap_err().into(),
        ];
        let mut codes: Vec<&str> = errors.iter().map(LearningError::error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}

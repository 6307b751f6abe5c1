//! Error types for the churn data contract.
//!
//! This module provides the error hierarchy for encoding and dataset
//! handling using `thiserror`.
//!
//! Errors are serializable so they can be emitted as `{code, message}`
//! objects by machine-readable front ends.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for encoding and dataset operations.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// A categorical value is outside its closed enumeration.
    #[error("Invalid value '{value}' for categorical field '{field}'")]
    InvalidCategory { field: String, value: String },

    /// A required field is absent from a record.
    #[error("Missing required field '{0}'")]
    MissingField(String),

    /// A field name does not name one of the categorical fields.
    #[error("Unknown categorical field '{0}'")]
    UnknownField(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A cell holds a value outside the column's domain.
    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    /// A record field holds a value outside its domain.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// The dataset has no usable rows.
    #[error("Dataset contains no rows")]
    EmptyDataset,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCategory { .. } => "INVALID_CATEGORY",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::UnknownField(_) => "UNKNOWN_FIELD",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Returns the innermost error, looking through context wrappers.
    pub fn root(&self) -> &ProcessingError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error rejects a record because of its content
    /// rather than a failure of the surrounding machinery.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.root(),
            Self::InvalidCategory { .. }
                | Self::MissingField(_)
                | Self::InvalidValue { .. }
                | Self::InvalidField { .. }
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = ProcessingError::InvalidCategory {
            field: "Gender".to_string(),
            value: "Other".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_CATEGORY");
        assert_eq!(
            ProcessingError::MissingField("Age".to_string()).error_code(),
            "MISSING_FIELD"
        );
    }

    #[test]
    fn test_is_input_error() {
        assert!(ProcessingError::MissingField("Age".to_string()).is_input_error());
        assert!(
            ProcessingError::MissingField("Age".to_string())
                .with_context("row 3")
                .is_input_error()
        );
        assert!(!ProcessingError::EmptyDataset.is_input_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::ColumnNotFound("Churn".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Churn"));
    }

    #[test]
    fn test_with_context() {
        let error = ProcessingError::InvalidCategory {
            field: "Subscription Type".to_string(),
            value: "Gold".to_string(),
        }
        .with_context("Encoding row 7");
        assert!(error.to_string().contains("Encoding row 7"));
        assert!(error.to_string().contains("Gold"));
        assert_eq!(error.error_code(), "INVALID_CATEGORY");
        assert!(matches!(
            error.root(),
            ProcessingError::InvalidCategory { .. }
        ));
    }
}

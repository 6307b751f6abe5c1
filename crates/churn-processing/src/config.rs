//! Configuration for dataset loading and encoding.
//!
//! Uses the builder pattern for ergonomic setup.

use serde::{Deserialize, Serialize};

/// What to do with a dataset row that cannot be encoded
/// (absent field or unknown category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MalformedRowPolicy {
    /// Stop at the first bad row and return its error.
    #[default]
    FailFast,
    /// Skip bad rows, counting them in the encoded result.
    Drop,
}

/// Configuration for loading the churn dataset.
///
/// # Example
///
/// ```rust
/// use churn_processing::config::{DatasetConfig, MalformedRowPolicy};
///
/// let config = DatasetConfig::builder()
///     .malformed_rows(MalformedRowPolicy::Drop)
///     .build()
///     .unwrap();
/// assert_eq!(config.malformed_rows, MalformedRowPolicy::Drop);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Handling of rows that fail encoding.
    /// Default: FailFast
    pub malformed_rows: MalformedRowPolicy,

    /// Number of rows polars scans to infer column types.
    /// `None` scans the whole file.
    /// Default: None
    pub infer_schema_length: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            malformed_rows: MalformedRowPolicy::default(),
            infer_schema_length: None,
        }
    }
}

impl DatasetConfig {
    /// Create a new configuration builder.
    pub fn builder() -> DatasetConfigBuilder {
        DatasetConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.infer_schema_length == Some(0) {
            return Err(ConfigValidationError::InvalidSchemaLength);
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid infer_schema_length: 0 (must be at least 1, or None to scan all rows)")]
    InvalidSchemaLength,
}

/// Builder for [`DatasetConfig`].
#[derive(Debug, Default)]
pub struct DatasetConfigBuilder {
    malformed_rows: Option<MalformedRowPolicy>,
    infer_schema_length: Option<Option<usize>>,
}

impl DatasetConfigBuilder {
    /// Set the policy for rows that cannot be encoded.
    pub fn malformed_rows(mut self, policy: MalformedRowPolicy) -> Self {
        self.malformed_rows = Some(policy);
        self
    }

    /// Limit type inference to the first `rows` rows (`None` = all rows).
    pub fn infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<DatasetConfig, ConfigValidationError> {
        let config = DatasetConfig {
            malformed_rows: self.malformed_rows.unwrap_or_default(),
            infer_schema_length: self.infer_schema_length.unwrap_or(None),
        };

        config.validate()?;
        Ok(config)
    }
}

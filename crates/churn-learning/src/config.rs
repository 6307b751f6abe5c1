//! Configuration types for training and serving.
//!
//! This module provides [`TrainingConfig`] (random forest hyperparameters
//! plus the train/test split) and [`ServingConfig`] (where the model, the
//! dataset and the prediction log live), each with a builder.
//!
//! # Example
//!
//! ```
//! use churn_learning::{MaxFeatures, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .n_estimators(50)
//!     .max_depth(Some(8))
//!     .max_features(MaxFeatures::Sqrt)
//!     .test_size(0.25)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.forest.random_seed, 42);
//! ```

use crate::error::LearningError;
use churn_processing::{DatasetConfig, MalformedRowPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// `floor(sqrt(n))`, at least 1.
    #[default]
    Sqrt,
    /// `floor(log2(n))`, at least 1.
    Log2,
    /// Every feature.
    All,
    /// A fixed count, capped at the number of features.
    Count(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete feature count for `n_features` features.
    ///
    /// # Examples
    ///
    /// ```
    /// use churn_learning::MaxFeatures;
    ///
    /// assert_eq!(MaxFeatures::Sqrt.resolve(10), 3);
    /// assert_eq!(MaxFeatures::Log2.resolve(10), 3);
    /// assert_eq!(MaxFeatures::Count(50).resolve(10), 10);
    /// ```
    #[must_use]
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(count) => (*count).min(n_features),
        };
        n.max(1)
    }
}

/// How training rows are weighted per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassWeight {
    /// `n_samples / (n_classes * class_count)`, so both classes carry the
    /// same total weight.
    #[default]
    Balanced,
    /// Every row weighs 1.
    Uniform,
}

/// Random forest hyperparameters.
///
/// Stored in the trained model so the artifact records how it was fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees (default: 100).
    pub n_estimators: usize,

    /// Maximum tree depth; `None` grows until leaves are pure (default).
    pub max_depth: Option<usize>,

    /// Minimum rows needed to split a node (default: 2).
    pub min_samples_split: usize,

    /// Minimum rows in each child of a split (default: 1).
    pub min_samples_leaf: usize,

    /// Features considered per split (default: sqrt).
    pub max_features: MaxFeatures,

    /// Fit each tree on a bootstrap sample (default: true).
    pub bootstrap: bool,

    /// Class weighting (default: balanced).
    pub class_weight: ClassWeight,

    /// Seed for every random choice in fitting (default: 42).
    pub random_seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::default(),
            bootstrap: true,
            class_weight: ClassWeight::default(),
            random_seed: 42,
        }
    }
}

/// Configuration for training a churn model.
///
/// Use [`TrainingConfig::builder()`] to construct a configuration with the
/// builder pattern.
///
/// # Validation
///
/// The builder validates on [`build()`](TrainingConfigBuilder::build):
/// - `n_estimators` must be at least 1
/// - `max_depth`, if set, must be at least 1
/// - `min_samples_split` must be at least 2
/// - `min_samples_leaf` must be at least 1
/// - `max_features` as a count must be at least 1
/// - `test_size` must be in range `(0.0, 1.0)` (exclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Forest hyperparameters.
    pub forest: ForestParams,

    /// Fraction of rows held out for evaluation (default: 0.2).
    pub test_size: f64,

    /// Handling of rows that cannot be encoded (default: fail fast).
    pub malformed_rows: MalformedRowPolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            test_size: 0.2,
            malformed_rows: MalformedRowPolicy::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] naming the first invalid
    /// setting.
    pub fn validate(&self) -> Result<(), LearningError> {
        let forest = &self.forest;

        if forest.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        if forest.max_depth == Some(0) {
            return Err(LearningError::InvalidConfig(
                "max_depth must be at least 1 (or unset for unlimited)".to_string(),
            ));
        }

        if forest.min_samples_split < 2 {
            return Err(LearningError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }

        if forest.min_samples_leaf == 0 {
            return Err(LearningError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }

        if forest.max_features == MaxFeatures::Count(0) {
            return Err(LearningError::InvalidConfig(
                "max_features must be at least 1".to_string(),
            ));
        }

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(LearningError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`TrainingConfig`].
///
/// Created via [`TrainingConfig::builder()`]. All setters return `self` to
/// allow method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the number of trees (default: 100).
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.forest.n_estimators = n;
        self
    }

    /// Set the maximum depth (`None` = unlimited).
    #[must_use]
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.forest.max_depth = depth;
        self
    }

    /// Set the minimum rows needed to split a node (default: 2).
    #[must_use]
    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.config.forest.min_samples_split = n;
        self
    }

    /// Set the minimum rows per leaf (default: 1).
    #[must_use]
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.config.forest.min_samples_leaf = n;
        self
    }

    /// Set the features considered per split (default: sqrt).
    #[must_use]
    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.config.forest.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling (default: true).
    #[must_use]
    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.config.forest.bootstrap = bootstrap;
        self
    }

    /// Set the class weighting (default: balanced).
    #[must_use]
    pub fn class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.config.forest.class_weight = class_weight;
        self
    }

    /// Set the random seed for reproducibility (default: 42).
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.forest.random_seed = seed;
        self
    }

    /// Set the test size fraction (default: 0.2).
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    /// Set the policy for rows that cannot be encoded (default: fail fast).
    #[must_use]
    pub fn malformed_rows(mut self, policy: MalformedRowPolicy) -> Self {
        self.config.malformed_rows = policy;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any setting is out of
    /// range (see [`TrainingConfig`]).
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Where the serving side finds its files.
///
/// Defaults are `model.json`, `customer_churn.csv` and
/// `prediction_logs.csv` in the working directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingConfig {
    /// Trained model artifact.
    pub model_path: PathBuf,

    /// Historical dataset used for statistics and model stats.
    pub dataset_path: PathBuf,

    /// Append-only prediction log.
    pub log_path: PathBuf,

    /// How the dataset is read.
    pub dataset: DatasetConfig,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.json"),
            dataset_path: PathBuf::from("customer_churn.csv"),
            log_path: PathBuf::from("prediction_logs.csv"),
            dataset: DatasetConfig::default(),
        }
    }
}

impl ServingConfig {
    /// Create a new builder for `ServingConfig`.
    #[must_use]
    pub fn builder() -> ServingConfigBuilder {
        ServingConfigBuilder::default()
    }
}

/// Builder for [`ServingConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServingConfigBuilder {
    config: ServingConfig,
}

impl ServingConfigBuilder {
    #[must_use]
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = path.into();
        self
    }

    #[must_use]
    pub fn dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dataset_path = path.into();
        self
    }

    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    #[must_use]
    pub fn dataset(mut self, dataset: DatasetConfig) -> Self {
        self.config.dataset = dataset;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if a path is empty or the
    /// dataset configuration is invalid.
    pub fn build(self) -> Result<ServingConfig, LearningError> {
        for (name, path) in [
            ("model_path", &self.config.model_path),
            ("dataset_path", &self.config.dataset_path),
            ("log_path", &self.config.log_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(LearningError::InvalidConfig(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }

        self.config
            .dataset
            .validate()
            .map_err(|e| LearningError::InvalidConfig(e.to_string()))?;

        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.forest.max_depth, None);
        assert_eq!(config.forest.min_samples_split, 2);
        assert_eq!(config.forest.min_samples_leaf, 1);
        assert_eq!(config.forest.max_features, MaxFeatures::Sqrt);
        assert!(config.forest.bootstrap);
        assert_eq!(config.forest.class_weight, ClassWeight::Balanced);
        assert_eq!(config.forest.random_seed, 42);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.malformed_rows, MalformedRowPolicy::FailFast);
    }

    #[test]
    fn test_builder_chaining() {
        let config = TrainingConfig::builder()
            .n_estimators(10)
            .max_depth(Some(5))
            .min_samples_split(4)
            .min_samples_leaf(2)
            .max_features(MaxFeatures::All)
            .bootstrap(false)
            .class_weight(ClassWeight::Uniform)
            .random_seed(7)
            .test_size(0.3)
            .malformed_rows(MalformedRowPolicy::Drop)
            .build()
            .unwrap();

        assert_eq!(config.forest.n_estimators, 10);
        assert_eq!(config.forest.max_depth, Some(5));
        assert_eq!(config.forest.min_samples_split, 4);
        assert_eq!(config.forest.min_samples_leaf, 2);
        assert_eq!(config.forest.max_features, MaxFeatures::All);
        assert!(!config.forest.bootstrap);
        assert_eq!(config.forest.class_weight, ClassWeight::Uniform);
        assert_eq!(config.forest.random_seed, 7);
        assert!((config.test_size - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.malformed_rows, MalformedRowPolicy::Drop);
    }

    #[test]
    fn test_invalid_test_size() {
        for size in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let result = TrainingConfig::builder().test_size(size).build();
            assert!(result.unwrap_err().to_string().contains("test_size"));
        }
    }

    #[test]
    fn test_invalid_forest_params() {
        assert!(TrainingConfig::builder().n_estimators(0).build().is_err());
        assert!(TrainingConfig::builder().max_depth(Some(0)).build().is_err());
        assert!(
            TrainingConfig::builder()
                .min_samples_split(1)
                .build()
                .is_err()
        );
        assert!(TrainingConfig::builder().min_samples_leaf(0).build().is_err());
        assert!(
            TrainingConfig::builder()
                .max_features(MaxFeatures::Count(0))
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10), 3);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::Log2.resolve(2), 1);
        assert_eq!(MaxFeatures::All.resolve(10), 10);
        assert_eq!(MaxFeatures::Count(4).resolve(10), 4);
    }

    #[test]
    fn test_serving_defaults() {
        let config = ServingConfig::default();
        assert_eq!(config.model_path, PathBuf::from("model.json"));
        assert_eq!(config.dataset_path, PathBuf::from("customer_churn.csv"));
        assert_eq!(config.log_path, PathBuf::from("prediction_logs.csv"));
    }

    #[test]
    fn test_serving_builder_rejects_empty_path() {
        let result = ServingConfig::builder().log_path("").build();
        assert!(result.unwrap_err().to_string().contains("log_path"));

        let config = ServingConfig::builder()
            .model_path("/tmp/m.json")
            .build()
            .unwrap();
        assert_eq!(config.model_path, PathBuf::from("/tmp/m.json"));
    }
}

//! Training pipeline.
//!
//! Stages, in order:
//!
//! 1. **Encoding** - every dataset row through the shared encoder
//! 2. **Split** - seeded shuffle, then hold out `test_size` of the rows
//! 3. **Fit** - random forest on the training rows
//! 4. **Evaluation** - accuracy and per-class scores on the hold-out rows
//!
//! # Example
//!
//! ```rust,ignore
//! use churn_learning::{train, TrainingConfig};
//! use churn_processing::{Dataset, DatasetConfig};
//!
//! let dataset = Dataset::load("customer_churn.csv", &DatasetConfig::default())?;
//! let result = train(&dataset, &TrainingConfig::default())?;
//! println!("hold-out accuracy: {:.3}", result.holdout.accuracy);
//! result.model.save("model.json")?;
//! ```

use crate::classifier::Classifier;
use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use crate::forest::RandomForest;
use crate::metrics::{ModelStats, accuracy, summarize};
use crate::model::TrainedModel;
use crate::types::ModelInfo;
use churn_processing::{CHURN_COLUMN, ChurnLabel, Dataset, EncodedFeatureVector, FEATURE_NAMES};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// The fitted model, ready to save or serve.
    pub model: TrainedModel,

    /// `[stayed, churned]` counts over all encoded rows.
    pub class_counts: [usize; 2],

    /// Every model-quality view on the hold-out split.
    pub holdout: ModelStats,
}

/// Shuffle `0..n_rows` with `seed` and split off `ceil(n_rows * test_size)`
/// rows for testing.
///
/// Returns `(train, test)` row indices.
///
/// # Errors
///
/// Returns [`LearningError::InvalidData`] if either side would be empty.
pub fn train_test_split(
    n_rows: usize,
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_test = (n_rows as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(LearningError::InvalidData(format!(
            "cannot split {} rows with test_size {}",
            n_rows, test_size
        )));
    }

    let mut rows: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let train = rows.split_off(n_test);
    Ok((train, rows))
}

fn select<T: Copy>(values: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&row| values[row]).collect()
}

/// Train a churn model on `dataset`.
///
/// # Errors
///
/// - [`LearningError::InvalidConfig`] for an invalid configuration
/// - [`LearningError::Processing`] if encoding fails under fail-fast
/// - [`LearningError::InvalidData`] if the split leaves an empty side or
///   the training rows hold a single class
pub fn train(dataset: &Dataset, config: &TrainingConfig) -> Result<TrainingResult> {
    config.validate()?;
    info!("Starting training on {} rows...", dataset.len());

    info!("Step 1: Encoding dataset...");
    let encoded = dataset.encode(config.malformed_rows)?;
    let class_counts = encoded.class_counts();
    info!(
        "Class distribution: {} stayed, {} churned",
        class_counts[0], class_counts[1]
    );
    if encoded.dropped_rows > 0 {
        warn!("{} rows dropped during encoding", encoded.dropped_rows);
    }

    info!("Step 2: Splitting (test_size = {})...", config.test_size);
    let (train_rows, test_rows) = train_test_split(
        encoded.len(),
        config.test_size,
        config.forest.random_seed,
    )?;
    let x_train: Vec<EncodedFeatureVector> = select(&encoded.features, &train_rows);
    let y_train: Vec<ChurnLabel> = select(&encoded.labels, &train_rows);
    let x_test: Vec<EncodedFeatureVector> = select(&encoded.features, &test_rows);
    let y_test: Vec<ChurnLabel> = select(&encoded.labels, &test_rows);

    if !ChurnLabel::ALL.iter().all(|class| y_train.contains(class)) {
        return Err(LearningError::InvalidData(
            "training split contains only one class".to_string(),
        ));
    }

    info!(
        "Step 3: Fitting random forest ({} trees, {} training rows)...",
        config.forest.n_estimators,
        x_train.len()
    );
    let forest = RandomForest::fit(&x_train, &y_train, &config.forest)?;

    info!("Step 4: Evaluating on {} hold-out rows...", x_test.len());
    let predicted = forest.predict_many(&x_test);
    let holdout = ModelStats::compute(&forest, &y_test, &predicted)?;

    let mut metrics = summarize(&y_test, &predicted)?;
    metrics.train_score = Some(accuracy(&y_train, &forest.predict_many(&x_train))?);
    info!(
        "Hold-out accuracy: {:.4} (training accuracy: {:.4})",
        holdout.accuracy,
        metrics.train_score.unwrap_or_default()
    );

    let info = ModelInfo {
        model_name: "random_forest".to_string(),
        target_column: CHURN_COLUMN.to_string(),
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        class_labels: ChurnLabel::ALL
            .iter()
            .map(|l| l.display_name().to_string())
            .collect(),
        hyperparameters: config.forest.clone(),
        metrics,
        training_rows: x_train.len(),
        test_rows: x_test.len(),
        dropped_rows: encoded.dropped_rows,
        trained_at: chrono::Utc::now(),
    };

    Ok(TrainingResult {
        model: TrainedModel::new(info, forest),
        class_counts,
        holdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_test_side_up() {
        let (train, test) = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(
            train_test_split(50, 0.2, 42).unwrap(),
            train_test_split(50, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_split(50, 0.2, 42).unwrap(),
            train_test_split(50, 0.2, 43).unwrap()
        );
    }

    #[test]
    fn test_split_too_small() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(train_test_split(0, 0.2, 42).is_err());
    }
}

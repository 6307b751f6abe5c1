//! Seeded random forest classifier.
//!
//! Each tree is fitted on a bootstrap sample of the training rows and
//! considers a random subset of features at every split. All randomness
//! flows from one master RNG seeded with
//! [`ForestParams::random_seed`], so fitting the same encoded data with the
//! same parameters always yields the same forest.

mod tree;

pub use tree::{DecisionTree, Node};

use crate::classifier::Classifier;
use crate::config::{ClassWeight, ForestParams};
use crate::error::{LearningError, Result};
use churn_processing::{ChurnLabel, EncodedFeatureVector, FEATURE_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tree::{TreeData, TreeParams};

/// A fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

/// Per-row weights for `labels` under `class_weight`.
///
/// Balanced weights are `n / (2 * count(class))`.
pub fn class_weights(labels: &[ChurnLabel], class_weight: ClassWeight) -> [f64; 2] {
    match class_weight {
        ClassWeight::Uniform => [1.0, 1.0],
        ClassWeight::Balanced => {
            let mut counts = [0usize; 2];
            for label in labels {
                counts[label.index()] += 1;
            }
            let n = labels.len() as f64;
            counts.map(|count| {
                if count == 0 {
                    0.0
                } else {
                    n / (2.0 * count as f64)
                }
            })
        }
    }
}

impl RandomForest {
    /// Fit a forest on encoded features and labels.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if there are no rows or the
    /// feature and label counts differ.
    pub fn fit(
        features: &[EncodedFeatureVector],
        labels: &[ChurnLabel],
        params: &ForestParams,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(LearningError::InvalidData(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if features.len() != labels.len() {
            return Err(LearningError::InvalidData(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let n_rows = features.len();
        let x: Vec<&[f64]> = features.iter().map(|f| f.as_slice()).collect();
        let y: Vec<usize> = labels.iter().map(|l| l.index()).collect();
        let per_class = class_weights(labels, params.class_weight);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features.resolve(FEATURE_COUNT),
        };

        let mut master = StdRng::seed_from_u64(params.random_seed);
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importances = vec![0.0; FEATURE_COUNT];

        for index in 0..params.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.r#gen::<u64>());

            // Bootstrap draws become integer sample weights
            let mut draws = vec![0u32; n_rows];
            if params.bootstrap {
                for _ in 0..n_rows {
                    draws[rng.gen_range(0..n_rows)] += 1;
                }
            } else {
                draws.fill(1);
            }

            let weights: Vec<f64> = draws
                .iter()
                .zip(&y)
                .map(|(&count, &class)| f64::from(count) * per_class[class])
                .collect();
            let rows: Vec<usize> = (0..n_rows).filter(|&row| draws[row] > 0).collect();

            let data = TreeData {
                x: &x,
                y: &y,
                weights: &weights,
                n_features: FEATURE_COUNT,
            };
            let (tree, tree_importances) = DecisionTree::fit(&data, rows, tree_params, &mut rng);
            debug!(
                "Tree {}: {} nodes, {} leaves",
                index,
                tree.nodes().len(),
                tree.n_leaves()
            );

            for (total, value) in importances.iter_mut().zip(tree_importances) {
                *total += value;
            }
            trees.push(tree);
        }

        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for value in &mut importances {
                *value /= sum;
            }
        }

        Ok(Self {
            params: params.clone(),
            n_features: FEATURE_COUNT,
            trees,
            importances,
        })
    }

    /// Mean leaf probabilities `[stayed, churned]` over all trees.
    pub fn predict_proba(&self, features: &EncodedFeatureVector) -> [f64; 2] {
        let mut totals = [0.0; 2];
        for tree in &self.trees {
            let p = tree.predict_proba(features.as_slice());
            totals[0] += p[0];
            totals[1] += p[1];
        }
        let n = self.trees.len().max(1) as f64;
        [totals[0] / n, totals[1] / n]
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Normalized mean impurity decrease per feature.
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Structural check used after deserialization.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.n_features != FEATURE_COUNT {
            return Err(format!(
                "forest expects {} features, this build encodes {}",
                self.n_features, FEATURE_COUNT
            ));
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.importances.len() != FEATURE_COUNT {
            return Err("importance vector has the wrong length".to_string());
        }
        if let Some(index) = self
            .trees
            .iter()
            .position(|tree| !tree.is_well_formed(self.n_features))
        {
            return Err(format!("tree {} is malformed", index));
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    /// Argmax of the averaged probabilities; an exact tie predicts Stayed.
    fn predict_one(&self, features: &EncodedFeatureVector) -> ChurnLabel {
        let [stayed, churned] = self.predict_proba(features);
        if churned > stayed {
            ChurnLabel::Churned
        } else {
            ChurnLabel::Stayed
        }
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.importances.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<EncodedFeatureVector>, Vec<ChurnLabel>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let churned = i % 3 == 0;
            let support_calls = if churned { 7.0 + (i % 4) as f64 } else { (i % 4) as f64 };
            features.push(EncodedFeatureVector::new([
                20.0 + i as f64,
                (i % 2) as f64,
                10.0,
                5.0,
                support_calls,
                3.0,
                1.0,
                2.0,
                400.0,
                7.0,
            ]));
            labels.push(if churned {
                ChurnLabel::Churned
            } else {
                ChurnLabel::Stayed
            });
        }
        (features, labels)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_balanced_class_weights() {
        let labels = [
            ChurnLabel::Stayed,
            ChurnLabel::Stayed,
            ChurnLabel::Stayed,
            ChurnLabel::Churned,
        ];
        let weights = class_weights(&labels, ClassWeight::Balanced);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[1] - 2.0).abs() < 1e-12);
        assert_eq!(class_weights(&labels, ClassWeight::Uniform), [1.0, 1.0]);
    }

    #[test]
    fn test_fit_learns_separable_feature() {
        let (features, labels) = toy_data();
        let forest = RandomForest::fit(&features, &labels, &small_params()).unwrap();

        assert_eq!(forest.trees().len(), 15);
        assert_eq!(forest.predict_many(&features), labels);

        let importances = forest.feature_importances().unwrap();
        let best = importances
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(4));
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (features, labels) = toy_data();
        let a = RandomForest::fit(&features, &labels, &small_params()).unwrap();
        let b = RandomForest::fit(&features, &labels, &small_params()).unwrap();
        assert_eq!(a, b);

        let other_seed = ForestParams {
            random_seed: 7,
            ..small_params()
        };
        let c = RandomForest::fit(&features, &labels, &other_seed).unwrap();
        assert_eq!(c.predict_many(&features), labels);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (features, labels) = toy_data();
        let forest = RandomForest::fit(&features, &labels, &small_params()).unwrap();
        for f in &features {
            let [a, b] = forest.predict_proba(f);
            assert!((a + b - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let (features, labels) = toy_data();
        assert!(matches!(
            RandomForest::fit(&[], &[], &small_params()),
            Err(LearningError::InvalidData(_))
        ));
        assert!(matches!(
            RandomForest::fit(&features, &labels[..3], &small_params()),
            Err(LearningError::InvalidData(_))
        ));
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let (features, _) = toy_data();
        let labels = vec![ChurnLabel::Churned; features.len()];
        let forest = RandomForest::fit(&features, &labels, &small_params()).unwrap();
        assert_eq!(forest.predict_one(&features[0]), ChurnLabel::Churned);
        assert_eq!(forest.feature_importances().unwrap(), vec![0.0; FEATURE_COUNT]);
    }

    #[test]
    fn test_validate_detects_tampering() {
        let (features, labels) = toy_data();
        let mut forest = RandomForest::fit(&features, &labels, &small_params()).unwrap();
        assert!(forest.validate().is_ok());
        forest.trees.clear();
        assert!(forest.validate().is_err());
    }
}

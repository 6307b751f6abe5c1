//! CART classification tree.
//!
//! Exact-greedy construction with weighted Gini impurity. Nodes live in a
//! flat vector; a split node stores the indices of its children.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Resolved number of features tried per split.
    pub max_features: usize,
}

/// A tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node with weighted class probabilities `[stayed, churned]`.
    Leaf { probabilities: [f64; 2] },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Training rows for one tree: features, class index and weight per row.
pub(crate) struct TreeData<'a> {
    pub x: &'a [&'a [f64]],
    pub y: &'a [usize],
    pub weights: &'a [f64],
    pub n_features: usize,
}

struct Builder<'a, R: Rng> {
    data: &'a TreeData<'a>,
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Fit a tree on the rows listed in `rows`.
    ///
    /// Returns the tree and its impurity-decrease importances, normalized to
    /// sum to 1 (all zeros when the tree never split).
    pub(crate) fn fit<R: Rng>(
        data: &TreeData<'_>,
        rows: Vec<usize>,
        params: TreeParams,
        rng: &mut R,
    ) -> (Self, Vec<f64>) {
        let mut builder = Builder {
            data,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; data.n_features],
        };
        builder.build_node(rows, 0);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in &mut importances {
                *value /= total;
            }
        }

        (
            Self {
                nodes: builder.nodes,
            },
            importances,
        )
    }

    /// Class probabilities `[stayed, churned]` of the leaf `x` falls into.
    pub fn predict_proba(&self, x: &[f64]) -> [f64; 2] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { probabilities } => return *probabilities,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Check that every split points at existing nodes after itself and uses
    /// a feature below `n_features`.
    pub(crate) fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { probabilities } => probabilities.iter().all(|p| p.is_finite()),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && *left > i
                        && *right > i
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

fn gini(class_weights: [f64; 2]) -> f64 {
    let total = class_weights[0] + class_weights[1];
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = class_weights[0] / total;
    let p1 = class_weights[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

impl<R: Rng> Builder<'_, R> {
    fn class_weights(&self, rows: &[usize]) -> [f64; 2] {
        let mut totals = [0.0; 2];
        for &row in rows {
            totals[self.data.y[row]] += self.data.weights[row];
        }
        totals
    }

    fn push_leaf(&mut self, class_weights: [f64; 2]) -> usize {
        let total = class_weights[0] + class_weights[1];
        let probabilities = if total > 0.0 {
            [class_weights[0] / total, class_weights[1] / total]
        } else {
            [0.5, 0.5]
        };
        self.nodes.push(Node::Leaf { probabilities });
        self.nodes.len() - 1
    }

    fn build_node(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let class_weights = self.class_weights(&rows);
        let impurity = gini(class_weights);

        let at_max_depth = self.params.max_depth.is_some_and(|max| depth >= max);
        if at_max_depth
            || rows.len() < self.params.min_samples_split
            || rows.len() < 2 * self.params.min_samples_leaf
            || impurity <= 0.0
        {
            return self.push_leaf(class_weights);
        }

        let Some(split) = self.find_best_split(&rows, class_weights) else {
            return self.push_leaf(class_weights);
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&row| self.data.x[row][split.feature] <= split.threshold);

        self.importances[split.feature] += split.gain;

        // Reserve the slot, children are appended after it
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            probabilities: [0.0; 2],
        });

        let left = self.build_node(left_rows, depth + 1);
        let right = self.build_node(right_rows, depth + 1);

        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    /// Best weighted Gini decrease over a random subset of features.
    ///
    /// Features are drawn in random order until `max_features` non-constant
    /// ones have been examined.
    fn find_best_split(&mut self, rows: &[usize], parent: [f64; 2]) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..self.data.n_features).collect();
        features.shuffle(&mut *self.rng);

        let parent_weight = parent[0] + parent[1];
        let parent_impurity = gini(parent) * parent_weight;
        let min_leaf = self.params.min_samples_leaf;

        let mut best: Option<SplitCandidate> = None;
        let mut examined = 0;
        let mut sorted = rows.to_vec();

        for feature in features {
            if examined >= self.params.max_features {
                break;
            }

            let x = self.data.x;
            sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let first = x[sorted[0]][feature];
            let last = x[sorted[sorted.len() - 1]][feature];
            if first == last {
                continue;
            }
            examined += 1;

            let mut left = [0.0; 2];
            for position in 0..sorted.len() - 1 {
                let row = sorted[position];
                left[self.data.y[row]] += self.data.weights[row];

                let here = x[row][feature];
                let next = x[sorted[position + 1]][feature];
                if here == next {
                    continue;
                }

                let n_left = position + 1;
                let n_right = sorted.len() - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right = [parent[0] - left[0], parent[1] - left[1]];
                let left_weight = left[0] + left[1];
                let right_weight = right[0] + right[1];
                let gain = parent_impurity
                    - gini(left) * left_weight
                    - gini(right) * right_weight;

                if best.is_none_or(|b| gain > b.gain) {
                    let mut threshold = here + (next - here) / 2.0;
                    // Midpoint can round up to `next` for adjacent floats
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain: gain.max(0.0),
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 2,
        }
    }

    fn fit(rows: &[[f64; 2]], y: &[usize], params: TreeParams) -> (DecisionTree, Vec<f64>) {
        let x: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let weights = vec![1.0; y.len()];
        let data = TreeData {
            x: &x,
            y,
            weights: &weights,
            n_features: 2,
        };
        let mut rng = StdRng::seed_from_u64(0);
        DecisionTree::fit(&data, (0..y.len()).collect(), params, &mut rng)
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini([4.0, 0.0]), 0.0);
        assert!((gini([2.0, 2.0]) - 0.5).abs() < 1e-12);
        assert_eq!(gini([0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_separable_on_one_feature() {
        let rows = [[1.0, 5.0], [2.0, 5.0], [8.0, 5.0], [9.0, 5.0]];
        let (tree, importances) = fit(&rows, &[0, 0, 1, 1], params());

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_proba(&[1.5, 0.0]), [1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[8.5, 0.0]), [0.0, 1.0]);
        match &tree.nodes()[0] {
            Node::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 5.0);
            }
            other => panic!("expected split at root, got {:?}", other),
        }
        assert_eq!(importances, vec![1.0, 0.0]);
        assert!(tree.is_well_formed(2));
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let rows = [[1.0, 1.0], [2.0, 2.0]];
        let (tree, importances) = fit(&rows, &[1, 1], params());
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(importances, vec![0.0, 0.0]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let rows = [[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let limited = TreeParams {
            max_depth: Some(1),
            ..params()
        };
        let (tree, _) = fit(&rows, &[0, 1, 0, 1], limited);
        assert!(tree.n_leaves() <= 2);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let rows = [[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0], [5.0, 0.0]];
        let strict = TreeParams {
            min_samples_leaf: 3,
            ..params()
        };
        // No split can leave 3 rows on both sides of 5
        let (tree, _) = fit(&rows, &[1, 0, 0, 0, 0], strict);
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict_proba(&[1.0, 0.0]), [0.8, 0.2]);
    }

    #[test]
    fn test_constant_features_give_leaf() {
        let rows = [[3.0, 3.0], [3.0, 3.0], [3.0, 3.0]];
        let (tree, _) = fit(&rows, &[0, 1, 0], params());
        assert_eq!(tree.nodes().len(), 1);
    }
}

//! CART regression trees
//!
//! Greedy binary splits chosen to maximize the reduction of the summed
//! squared error. Each split compares one feature against a threshold
//! halfway between two consecutive distinct training values.

use geolearn_core::{check_fit_input, check_predict_input, Error, Estimator, Predictor, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Every feature
    #[default]
    All,
    /// `floor(sqrt(n_features))`, at least 1
    Sqrt,
    /// `floor(fraction · n_features)`, at least 1; fraction in (0, 1]
    Fraction(f64),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> Result<usize> {
        let n = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Fraction(f) => {
                if !(f > 0.0 && f <= 1.0) {
                    return Err(Error::invalid_parameter("max_features", f, "fraction must be in (0, 1]"));
                }
                (f * n_features as f64) as usize
            }
        };
        Ok(n.clamp(1, n_features.max(1)))
    }
}

/// Growth limits shared by single trees and forests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; `None` grows until leaves are pure or too small
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node (default: 2)
    pub min_samples_split: usize,
    /// Minimum samples in each child (default: 1)
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

impl TreeParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(Error::invalid_parameter("min_samples_split", self.min_samples_split, "must be >= 2"));
        }
        if self.min_samples_leaf < 1 {
            return Err(Error::invalid_parameter("min_samples_leaf", self.min_samples_leaf, "must be >= 1"));
        }
        if self.max_depth == Some(0) {
            return Err(Error::invalid_parameter("max_depth", 0, "must be >= 1"));
        }
        Ok(())
    }
}

/// Single regression tree estimator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub params: TreeParams,
    /// Seed for feature subsampling when `max_features` is not `All`
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl RegressionTree {
    /// Fit on the rows `sample_indices` of `features` (repeats allowed, as
    /// produced by bootstrap sampling).
    pub(crate) fn fit_indices(
        features: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
        mut sample_indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let n_features = features.ncols();
        let mut builder = Builder {
            features: features.reborrow(),
            target: target.reborrow(),
            params,
            max_features: params.max_features.resolve(n_features)?,
            feature_order: (0..n_features).collect(),
            rng,
            nodes: Vec::new(),
        };
        builder.grow(&mut sample_indices, 0);
        Ok(Self {
            nodes: builder.nodes,
            n_features,
        })
    }

    /// Number of nodes including leaves
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub(crate) fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[feature] <= threshold { left } else { right },
            }
        }
    }
}

impl Predictor for RegressionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_predict_input(features, self.n_features)?;
        Ok(features.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }
}

impl Estimator for DecisionTreeRegressor {
    type Model = RegressionTree;

    fn name(&self) -> &'static str {
        "tree"
    }

    fn fit(&self, features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<RegressionTree> {
        check_fit_input(features, target)?;
        self.params.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        RegressionTree::fit_indices(features, target, (0..features.nrows()).collect(), &self.params, &mut rng)
    }
}

struct Builder<'a, 'r> {
    features: ArrayView2<'a, f64>,
    target: ArrayView1<'a, f64>,
    params: &'a TreeParams,
    max_features: usize,
    feature_order: Vec<usize>,
    rng: &'r mut StdRng,
    nodes: Vec<Node>,
}

/// Best split found for one node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Number of sorted samples going left
    n_left: usize,
    score: f64,
}

impl Builder<'_, '_> {
    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let n = indices.len();
        let mean = indices.iter().map(|&i| self.target[i]).sum::<f64>() / n as f64;
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || n < self.params.min_samples_split || n < 2 * self.params.min_samples_leaf {
            return node_idx;
        }
        let pure = indices.iter().all(|&i| self.target[i] == self.target[indices[0]]);
        if pure {
            return node_idx;
        }

        let Some(best) = self.best_split(indices) else {
            return node_idx;
        };

        // Reorder so the left child occupies the first n_left entries
        let feature = best.feature;
        indices.sort_by(|&a, &b| self.features[[a, feature]].total_cmp(&self.features[[b, feature]]));
        let (left_idx, right_idx) = indices.split_at_mut(best.n_left);

        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_idx
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let total_sum: f64 = indices.iter().map(|&i| self.target[i]).sum();

        if self.max_features < self.feature_order.len() {
            self.feature_order.shuffle(&mut *self.rng);
        }

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = indices.to_vec();

        for &feature in &self.feature_order[..self.max_features] {
            sorted.sort_by(|&a, &b| self.features[[a, feature]].total_cmp(&self.features[[b, feature]]));

            // Maximizing sum_l²/n_l + sum_r²/n_r minimizes the children's SSE
            let mut left_sum = 0.0;
            for split in 1..n {
                left_sum += self.target[sorted[split - 1]];
                let lo = self.features[[sorted[split - 1], feature]];
                let hi = self.features[[sorted[split], feature]];
                if lo == hi || split < min_leaf || n - split < min_leaf {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / split as f64 + right_sum * right_sum / (n - split) as f64;
                if best.as_ref().map_or(true, |b| score > b.score) {
                    // Adjacent floats: the midpoint rounds up to `hi`
                    let mid = lo + (hi - lo) / 2.0;
                    best = Some(SplitCandidate {
                        feature,
                        threshold: if mid >= hi { lo } else { mid },
                        n_left: split,
                        score,
                    });
                }
            }
        }

        // Only accept splits that reduce the error
        let parent_score = total_sum * total_sum / n as f64;
        best.filter(|b| b.score > parent_score + 1e-12 * parent_score.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let tree = DecisionTreeRegressor::default().fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_count(), 3);
        let p = tree.predict(array![[0.0], [6.4], [6.6], [100.0]].view()).unwrap();
        assert_eq!(p.to_vec(), vec![5.0, 5.0, 20.0, 20.0]);
    }

    #[test]
    fn test_fully_grown_tree_fits_training_data() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| ((i * (j + 2)) % 13) as f64 + j as f64 * 0.1 * i as f64);
        let y = x.column(0).mapv(|v| v.sin() * 10.0) + &x.column(1);
        let tree = DecisionTreeRegressor::default().fit(x.view(), y.view()).unwrap();
        let p = tree.predict(x.view()).unwrap();
        for (a, b) in p.iter().zip(y.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_split_between_adjacent_floats() {
        let x = array![[1.0 + f64::EPSILON], [1.0 + 2.0 * f64::EPSILON]];
        let y = array![0.0, 10.0];
        let tree = DecisionTreeRegressor::default().fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(x.view()).unwrap().to_vec(), vec![0.0, 10.0]);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = Array2::from_shape_fn((64, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| v * v);
        let params = TreeParams {
            max_depth: Some(3),
            ..Default::default()
        };
        let tree = DecisionTreeRegressor { params, seed: 0 }.fit(x.view(), y.view()).unwrap();
        assert!(tree.depth() <= 3);
        assert!(tree.node_count() <= 15);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 0.0, 100.0];
        let params = TreeParams {
            min_samples_leaf: 2,
            ..Default::default()
        };
        let tree = DecisionTreeRegressor { params, seed: 0 }.fit(x.view(), y.view()).unwrap();
        // The outlier cannot be isolated; best split is 2 | 2
        let p = tree.predict(array![[4.0]].view()).unwrap();
        assert_relative_eq!(p[0], 50.0);
    }

    #[test]
    fn test_constant_target_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![7.0, 7.0, 7.0];
        let tree = DecisionTreeRegressor::default().fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::All.resolve(8).unwrap(), 8);
        assert_eq!(MaxFeatures::Sqrt.resolve(8).unwrap(), 2);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(8).unwrap(), 4);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(8).unwrap(), 1);
        assert!(MaxFeatures::Fraction(1.5).resolve(8).is_err());
    }

    #[test]
    fn test_invalid_params() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0];
        let bad = DecisionTreeRegressor {
            params: TreeParams {
                min_samples_split: 1,
                ..Default::default()
            },
            seed: 0,
        };
        assert!(bad.fit(x.view(), y.view()).is_err());
    }
}

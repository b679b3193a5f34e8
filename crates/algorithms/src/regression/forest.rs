//! Random forest regression
//!
//! An ensemble of CART trees, each grown on a bootstrap resample of the
//! training rows with a random subset of features considered per split.
//! Trees are fitted independently in parallel; the prediction is the mean
//! of the tree predictions.
//!
//! Reference:
//! Breiman, L. (2001). Random forests. Machine Learning, 45(1).

use super::tree::{MaxFeatures, RegressionTree, TreeParams};
use crate::maybe_rayon::*;
use geolearn_core::{check_fit_input, check_predict_input, Error, Estimator, Predictor, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    /// Number of trees (default: 100)
    pub n_estimators: usize,
    /// Maximum depth per tree (default: unlimited)
    pub max_depth: Option<usize>,
    /// Minimum samples to split a node (default: 2)
    pub min_samples_split: usize,
    /// Minimum samples per leaf (default: 1)
    pub min_samples_leaf: usize,
    /// Features considered at each split (default: all)
    pub max_features: MaxFeatures,
    /// Draw each tree's rows with replacement (default: true)
    pub bootstrap: bool,
    /// Base seed; tree `t` uses `seed + t`
    pub seed: u64,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl RandomForestRegressor {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }
}

/// Fitted forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestModel {
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

impl Predictor for RandomForestModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_predict_input(features, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        let predictions: Vec<f64> = (0..features.nrows())
            .into_par_iter()
            .map(|i| {
                let row = features.row(i);
                self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}

impl Estimator for RandomForestRegressor {
    type Model = RandomForestModel;

    fn name(&self) -> &'static str {
        "forest"
    }

    fn fit(&self, features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<RandomForestModel> {
        check_fit_input(features, target)?;
        if self.n_estimators == 0 {
            return Err(Error::invalid_parameter("n_estimators", 0, "must be >= 1"));
        }
        let params = self.tree_params();
        params.validate()?;

        let n = features.nrows();
        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let rows: Vec<usize> = if self.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit_indices(features, target, rows, &params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            n_trees = trees.len(),
            mean_depth = trees.iter().map(|t| t.depth()).sum::<usize>() as f64 / trees.len() as f64,
            "random forest fitted"
        );

        Ok(RandomForestModel {
            trees,
            n_features: features.ncols(),
        })
    }
}

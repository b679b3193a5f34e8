//! k-nearest-neighbour regression
//!
//! Predicts the (optionally distance-weighted) mean target of the k
//! training samples closest in Euclidean feature space. Features should be
//! on comparable scales, so this is usually combined with a
//! [`Scaler`](crate::transform::Scaler).

use super::kdtree::KdTree;
use crate::maybe_rayon::*;
use geolearn_core::{check_fit_input, check_predict_input, Error, Estimator, Predictor, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// How neighbour targets are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weights {
    /// Plain mean of the k targets
    #[default]
    Uniform,
    /// Weighted by inverse distance; exact matches take precedence
    Distance,
}

/// k-NN regression estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    /// Number of neighbours (default: 5)
    pub k: usize,
    pub weights: Weights,
}

impl Default for KNeighborsRegressor {
    fn default() -> Self {
        Self {
            k: 5,
            weights: Weights::Uniform,
        }
    }
}

impl KNeighborsRegressor {
    pub fn new(k: usize, weights: Weights) -> Self {
        Self { k, weights }
    }
}

/// Fitted k-NN model: the indexed training set
#[derive(Debug, Clone)]
pub struct KNeighborsModel {
    tree: KdTree,
    targets: Vec<f64>,
    n_features: usize,
    k: usize,
    weights: Weights,
}

impl KNeighborsModel {
    pub fn n_samples(&self) -> usize {
        self.tree.len()
    }

    fn predict_one(&self, query: &[f64]) -> f64 {
        let neighbours = self.tree.k_nearest(query, self.k);

        match self.weights {
            Weights::Uniform => {
                neighbours.iter().map(|n| self.targets[n.index]).sum::<f64>() / neighbours.len() as f64
            }
            Weights::Distance => {
                let exact: Vec<f64> = neighbours
                    .iter()
                    .filter(|n| n.distance_sq == 0.0)
                    .map(|n| self.targets[n.index])
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().sum::<f64>() / exact.len() as f64;
                }

                let mut weighted = 0.0;
                let mut total = 0.0;
                for n in &neighbours {
                    let w = 1.0 / n.distance_sq.sqrt();
                    weighted += w * self.targets[n.index];
                    total += w;
                }
                weighted / total
            }
        }
    }
}

impl Predictor for KNeighborsModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_predict_input(features, self.n_features)?;
        let rows: Vec<Vec<f64>> = features.rows().into_iter().map(|r| r.to_vec()).collect();
        let predictions: Vec<f64> = rows.par_iter().map(|q| self.predict_one(q)).collect();
        Ok(Array1::from_vec(predictions))
    }
}

impl Estimator for KNeighborsRegressor {
    type Model = KNeighborsModel;

    fn name(&self) -> &'static str {
        "knn"
    }

    fn fit(&self, features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<KNeighborsModel> {
        check_fit_input(features, target)?;
        if self.k == 0 || self.k > features.nrows() {
            return Err(Error::invalid_parameter(
                "k",
                self.k,
                format!("must be in 1..={} (number of training samples)", features.nrows()),
            ));
        }

        Ok(KNeighborsModel {
            tree: KdTree::build(features),
            targets: target.to_vec(),
            n_features: features.ncols(),
            k: self.k,
            weights: self.weights,
        })
    }
}

//! Regression estimators
//!
//! - **Linear**: ordinary least squares via the normal equations
//! - **LASSO**: L1-regularized least squares by coordinate descent
//! - **k-NN**: (distance-weighted) mean of nearest training targets
//! - **Decision tree / random forest**: CART trees and bootstrap ensembles
//!
//! Every estimator implements [`Estimator`]; [`RegressorKind`] selects one
//! at runtime and yields a boxed [`Predictor`].

mod forest;
mod kdtree;
mod knn;
mod lasso;
mod linear;
mod solve;
mod tree;

pub use forest::{RandomForestModel, RandomForestRegressor};
pub use knn::{KNeighborsModel, KNeighborsRegressor, Weights};
pub use lasso::Lasso;
pub use linear::{LinearModel, LinearRegression};
pub use tree::{DecisionTreeRegressor, MaxFeatures, RegressionTree, TreeParams};

use geolearn_core::{Estimator, Predictor, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Any of the supported regressors with its hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorKind {
    Linear(LinearRegression),
    Lasso(Lasso),
    KNeighbors(KNeighborsRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
}

impl RegressorKind {
    /// Human-readable summary including the main hyperparameter
    pub fn label(&self) -> String {
        match self {
            RegressorKind::Linear(_) => "linear".to_string(),
            RegressorKind::Lasso(m) => format!("lasso(alpha={})", m.alpha),
            RegressorKind::KNeighbors(m) => format!("knn(k={}, {:?})", m.k, m.weights),
            RegressorKind::DecisionTree(m) => match m.params.max_depth {
                Some(d) => format!("tree(max_depth={})", d),
                None => "tree".to_string(),
            },
            RegressorKind::RandomForest(m) => match m.max_depth {
                Some(d) => format!("forest(n={}, max_depth={})", m.n_estimators, d),
                None => format!("forest(n={})", m.n_estimators),
            },
        }
    }
}

impl Estimator for RegressorKind {
    type Model = Box<dyn Predictor>;

    fn name(&self) -> &'static str {
        match self {
            RegressorKind::Linear(m) => m.name(),
            RegressorKind::Lasso(m) => m.name(),
            RegressorKind::KNeighbors(m) => m.name(),
            RegressorKind::DecisionTree(m) => m.name(),
            RegressorKind::RandomForest(m) => m.name(),
        }
    }

    fn fit(&self, features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<Box<dyn Predictor>> {
        Ok(match self {
            RegressorKind::Linear(m) => Box::new(m.fit(features, target)?),
            RegressorKind::Lasso(m) => Box::new(m.fit(features, target)?),
            RegressorKind::KNeighbors(m) => Box::new(m.fit(features, target)?),
            RegressorKind::DecisionTree(m) => Box::new(m.fit(features, target)?),
            RegressorKind::RandomForest(m) => Box::new(m.fit(features, target)?),
        })
    }
}

impl From<LinearRegression> for RegressorKind {
    fn from(m: LinearRegression) -> Self {
        RegressorKind::Linear(m)
    }
}

impl From<Lasso> for RegressorKind {
    fn from(m: Lasso) -> Self {
        RegressorKind::Lasso(m)
    }
}

impl From<KNeighborsRegressor> for RegressorKind {
    fn from(m: KNeighborsRegressor) -> Self {
        RegressorKind::KNeighbors(m)
    }
}

impl From<DecisionTreeRegressor> for RegressorKind {
    fn from(m: DecisionTreeRegressor) -> Self {
        RegressorKind::DecisionTree(m)
    }
}

impl From<RandomForestRegressor> for RegressorKind {
    fn from(m: RandomForestRegressor) -> Self {
        RegressorKind::RandomForest(m)
    }
}

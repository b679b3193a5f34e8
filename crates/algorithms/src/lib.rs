//! # geolearn Algorithms
//!
//! Segmentation, regression and evaluation algorithms for geolearn.
//!
//! ## Available Algorithm Categories
//!
//! - **transform**: Band selection, min-max normalization, RGB composites, column scalers
//! - **cluster**: K-means pixel clustering, SLIC superpixels, per-segment means
//! - **regression**: OLS, LASSO, k-NN, decision tree, random forest
//! - **metrics**: RMSE, MSE, MAE, R²
//! - **model_selection**: Seeded data splits and hyperparameter sweeps
//! - **statistics**: Correlation matrices
//! - **pipeline**: Segmenter fitting and regression experiments

pub(crate) mod maybe_rayon;

pub mod cluster;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod regression;
pub mod statistics;
pub mod transform;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cluster::{kmeans, mark_boundaries, mean_image, segment_means, slic, KMeans, KMeansModel, KMeansParams, SlicParams};
    pub use crate::metrics::{mae, mse, r2_score, rmse};
    pub use crate::model_selection::{sweep, train_test_split, train_validation_test_split, SplitFractions};
    pub use crate::pipeline::{fit_segmenter, ExperimentReport, RegressionExperiment, SegmentationConfig, Segmenter};
    pub use crate::regression::{
        DecisionTreeRegressor, KNeighborsRegressor, Lasso, LinearRegression, MaxFeatures, RandomForestRegressor,
        RegressorKind, Weights,
    };
    pub use crate::statistics::{correlation_matrix, target_correlations};
    pub use crate::transform::{
        display_composite, normalize_channels, normalize_image, rgb_composite, select_indices, ConstantChannel, Scaler,
        SENTINEL2_RGB,
    };
    pub use geolearn_core::prelude::*;
}

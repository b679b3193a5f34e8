//! # geolearn Core
//!
//! Core types, traits and I/O for the geolearn workspace.
//!
//! This crate provides:
//! - `ImageStack`: multispectral image stack indexed (image, band, row, col)
//! - `FeatureTable`: tabular features paired with a regression target
//! - `LabelMap`: per-pixel cluster or segment identifiers
//! - `Estimator` / `Predictor`: the fit/predict contract shared by all regressors
//! - I/O for directories of multi-band TIFF or `.npy` images and CSV tables

pub mod error;
pub mod io;
pub mod labels;
pub mod stack;
pub mod table;

pub use error::{Error, Result};
pub use labels::LabelMap;
pub use stack::ImageStack;
pub use table::{FeatureTable, TabularDataset};

use ndarray::{Array1, ArrayView1, ArrayView2};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::labels::LabelMap;
    pub use crate::stack::ImageStack;
    pub use crate::table::{FeatureTable, TabularDataset};
    pub use crate::{Estimator, Predictor};
}

/// A regression strategy with a fixed hyperparameter configuration.
///
/// Fitting never mutates the estimator; the fitted state is returned as a
/// separate value owned by the caller.
pub trait Estimator {
    /// Fitted model produced by [`Estimator::fit`]
    type Model: Predictor;

    /// Short identifier used in reports
    fn name(&self) -> &'static str;

    /// Fit on a `(sample, feature)` matrix and its target vector.
    fn fit(&self, features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<Self::Model>;
}

/// Fitted model state able to produce continuous predictions.
pub trait Predictor: Send + Sync {
    /// Number of feature columns the model was fitted on
    fn n_features(&self) -> usize;

    /// Predict one value per row of `features`.
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        (**self).predict(features)
    }
}

/// Validate a fitting pair: matching rows, at least one sample, finite values.
pub fn check_fit_input(features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<()> {
    if features.nrows() != target.len() {
        return Err(Error::shape(
            format!("{} target values", features.nrows()),
            target.len(),
        ));
    }
    if features.nrows() == 0 {
        return Err(Error::InvalidInput("cannot fit on zero samples".into()));
    }
    if features.ncols() == 0 {
        return Err(Error::InvalidInput("cannot fit on zero features".into()));
    }
    if features.iter().chain(target.iter()).any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput("features and target must be finite".into()));
    }
    Ok(())
}

/// Validate a prediction matrix against the fitted column count.
pub fn check_predict_input(features: ArrayView2<'_, f64>, n_features: usize) -> Result<()> {
    if features.ncols() != n_features {
        return Err(Error::shape(
            format!("{} feature columns", n_features),
            features.ncols(),
        ));
    }
    if features.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput("features must be finite".into()));
    }
    Ok(())
}

//! Ordinary least squares linear regression
//!
//! Minimizes `||y − Xw − b||²` by solving the normal equations
//! `(XcᵀXc) w = Xcᵀyc` on mean-centred data, then recovering the intercept
//! from the means. Centring keeps the system well conditioned when features
//! have large offsets.

use super::solve::gauss_solve;
use geolearn_core::{check_fit_input, check_predict_input, Estimator, Predictor, Result};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OLS estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fit an intercept term (default: true)
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self { fit_intercept: true }
    }
}

/// Fitted linear model `y = features · coefficients + intercept`.
///
/// Shared by [`LinearRegression`] and [`Lasso`](super::Lasso).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl Predictor for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        check_predict_input(features, self.n_features())?;
        Ok(features.dot(&self.coefficients) + self.intercept)
    }
}

/// Column means of `features` and the mean of `target`, or zeros when no
/// intercept is fitted.
pub(crate) fn centring(
    features: ArrayView2<'_, f64>,
    target: ArrayView1<'_, f64>,
    fit_intercept: bool,
) -> (Array1<f64>, f64) {
    if fit_intercept {
        let x_mean = features.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(features.ncols()));
        let y_mean = target.mean().unwrap_or(0.0);
        (x_mean, y_mean)
    } else {
        (Array1::zeros(features.ncols()), 0.0)
    }
}

impl Estimator for LinearRegression {
    type Model = LinearModel;

    fn name(&self) -> &'static str {
        "linear"
    }

    fn fit(&self, features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<LinearModel> {
        check_fit_input(features, target)?;
        let d = features.ncols();
        let (x_mean, y_mean) = centring(features, target, self.fit_intercept);

        let xc = &features - &x_mean;
        let yc = &target - y_mean;

        // Normal equations: (XᵀX) w = Xᵀy
        let xtx = xc.t().dot(&xc);
        let xty = xc.t().dot(&yc);
        let mut mat: Vec<f64> = xtx.iter().copied().collect();
        let mut rhs = xty.to_vec();
        let w = Array1::from_vec(gauss_solve(d, &mut mat, &mut rhs)?);

        let intercept = y_mean - x_mean.dot(&w);
        debug!(n_samples = features.nrows(), n_features = d, "OLS fitted");

        Ok(LinearModel {
            coefficients: w,
            intercept,
        })
    }
}

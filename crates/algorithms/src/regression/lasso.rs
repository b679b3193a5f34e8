//! LASSO regression by cyclic coordinate descent
//!
//! Minimizes
//!
//! ```text
//! (1 / 2n) · ||y − Xw − b||² + α · ||w||₁
//! ```
//!
//! The L1 penalty drives weak coefficients exactly to zero. With `α = 0`
//! the solution converges to ordinary least squares.
//!
//! Reference:
//! Friedman, J., Hastie, T. & Tibshirani, R. (2010). Regularization paths
//! for generalized linear models via coordinate descent. J. Stat. Softw.

use super::linear::{centring, LinearModel};
use geolearn_core::{check_fit_input, Error, Estimator, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// L1-regularized linear regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lasso {
    /// Regularization strength, `>= 0` (default: 1.0)
    pub alpha: f64,
    /// Fit an unpenalized intercept (default: true)
    pub fit_intercept: bool,
    /// Maximum full passes over the coefficients (default: 1000)
    pub max_iterations: usize,
    /// Stop when the largest coefficient update is below
    /// `tolerance × max |w|` (default: 1e-4)
    pub tolerance: f64,
}

impl Default for Lasso {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit_intercept: true,
            max_iterations: 1000,
            tolerance: 1e-4,
        }
    }
}

impl Lasso {
    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            alpha,
            ..Default::default()
        }
    }
}

#[inline]
fn soft_threshold(x: f64, lambda: f64) -> f64 {
    if x > lambda {
        x - lambda
    } else if x < -lambda {
        x + lambda
    } else {
        0.0
    }
}

impl Estimator for Lasso {
    type Model = LinearModel;

    fn name(&self) -> &'static str {
        "lasso"
    }

    fn fit(&self, features: ArrayView2<'_, f64>, target: ArrayView1<'_, f64>) -> Result<LinearModel> {
        if !(self.alpha >= 0.0) || !self.alpha.is_finite() {
            return Err(Error::invalid_parameter("alpha", self.alpha, "must be finite and >= 0"));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid_parameter("max_iterations", self.max_iterations, "must be >= 1"));
        }
        check_fit_input(features, target)?;

        let n = features.nrows() as f64;
        let d = features.ncols();
        let (x_mean, y_mean) = centring(features, target, self.fit_intercept);

        // Centred columns, contiguous for the inner loop
        let columns: Vec<Vec<f64>> = (0..d)
            .map(|j| features.column(j).iter().map(|v| v - x_mean[j]).collect())
            .collect();
        let col_norm: Vec<f64> = columns.iter().map(|c| c.iter().map(|v| v * v).sum::<f64>() / n).collect();

        let mut w = vec![0.0_f64; d];
        let mut residual: Vec<f64> = target.iter().map(|v| v - y_mean).collect();
        let mut converged = false;
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let mut max_delta = 0.0_f64;
            let mut max_w = 0.0_f64;

            for j in 0..d {
                if col_norm[j] == 0.0 {
                    w[j] = 0.0;
                    continue;
                }
                let old = w[j];
                let rho = columns[j].iter().zip(&residual).map(|(x, r)| x * r).sum::<f64>() / n
                    + col_norm[j] * old;
                let new = soft_threshold(rho, self.alpha) / col_norm[j];

                let delta = new - old;
                if delta != 0.0 {
                    for (r, x) in residual.iter_mut().zip(&columns[j]) {
                        *r -= x * delta;
                    }
                    w[j] = new;
                }
                max_delta = max_delta.max(delta.abs());
                max_w = max_w.max(new.abs());
            }

            if max_w == 0.0 || max_delta <= self.tolerance * max_w {
                converged = true;
                break;
            }
        }

        if converged {
            debug!(alpha = self.alpha, iterations, "LASSO converged");
        } else {
            warn!(
                alpha = self.alpha,
                iterations, "LASSO did not converge; consider more iterations or a larger alpha"
            );
        }

        let w = Array1::from_vec(w);
        let intercept = y_mean - x_mean.dot(&w);
        Ok(LinearModel {
            coefficients: w,
            intercept,
        })
    }
}

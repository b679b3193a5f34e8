//! Column scalers fitted on training data
//!
//! A scaler learns one offset and one scale per column, then maps
//! `x -> (x - offset) / scale`. Columns with zero spread get scale 1 so
//! they are shifted but never divided by zero.

use geolearn_core::{Error, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Scaling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scaler {
    /// Zero mean, unit (population) standard deviation
    Standard,
    /// Zero median, unit interquartile range; insensitive to outliers
    Robust,
    /// Column minimum to 0, column maximum to 1
    MinMax,
}

/// Per-column parameters learned by [`Scaler::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub kind: Scaler,
    pub offset: Array1<f64>,
    pub scale: Array1<f64>,
}

impl Scaler {
    /// Learn offsets and scales from the columns of `features`.
    pub fn fit(self, features: ArrayView2<'_, f64>) -> Result<ScalerState> {
        if features.nrows() == 0 {
            return Err(Error::InvalidInput("cannot fit a scaler on zero rows".into()));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput("scaler input must be finite".into()));
        }

        let n_cols = features.ncols();
        let mut offset = Array1::zeros(n_cols);
        let mut scale = Array1::ones(n_cols);

        for (j, column) in features.axis_iter(Axis(1)).enumerate() {
            let (o, s) = match self {
                Scaler::Standard => {
                    let mean = column.sum() / column.len() as f64;
                    let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
                    (mean, var.sqrt())
                }
                Scaler::Robust => {
                    let mut sorted = column.to_vec();
                    sorted.sort_by(|a, b| a.total_cmp(b));
                    let q1 = quantile_sorted(&sorted, 0.25);
                    let q3 = quantile_sorted(&sorted, 0.75);
                    (quantile_sorted(&sorted, 0.5), q3 - q1)
                }
                Scaler::MinMax => {
                    let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
                    let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    (min, max - min)
                }
            };
            offset[j] = o;
            scale[j] = if s > 0.0 { s } else { 1.0 };
        }

        Ok(ScalerState {
            kind: self,
            offset,
            scale,
        })
    }

    /// Fit on `features` and return the scaled copy together with the state.
    pub fn fit_transform(self, features: ArrayView2<'_, f64>) -> Result<(ScalerState, Array2<f64>)> {
        let state = self.fit(features)?;
        let scaled = state.transform(features)?;
        Ok((state, scaled))
    }
}

impl ScalerState {
    pub fn n_features(&self) -> usize {
        self.offset.len()
    }

    /// Apply the learned scaling to a matrix with the same column count.
    pub fn transform(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.n_features() {
            return Err(Error::shape(
                format!("{} columns", self.n_features()),
                features.ncols(),
            ));
        }
        let mut out = features.to_owned();
        for mut row in out.rows_mut() {
            row -= &self.offset;
            row /= &self.scale;
        }
        Ok(out)
    }

    /// Undo [`transform`](Self::transform).
    pub fn inverse_transform(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.n_features() {
            return Err(Error::shape(
                format!("{} columns", self.n_features()),
                features.ncols(),
            ));
        }
        let mut out = features.to_owned();
        for mut row in out.rows_mut() {
            row *= &self.scale;
            row += &self.offset;
        }
        Ok(out)
    }
}

/// Linear-interpolated quantile of an ascending slice (`q` in [0, 1]).
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

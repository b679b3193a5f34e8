//! Pearson correlation between feature columns
//!
//! Zero-variance columns have no defined correlation and yield NaN.

use crate::maybe_rayon::*;
use geolearn_core::{Error, FeatureTable, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return f64::NAN;
    }
    (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
}

/// Symmetric `n_features × n_features` correlation matrix of the columns.
pub fn correlation_matrix(features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    if features.nrows() < 2 {
        return Err(Error::InvalidInput("correlation needs at least two rows".into()));
    }
    let d = features.ncols();
    let columns: Vec<ArrayView1<'_, f64>> = features.axis_iter(Axis(1)).collect();

    // Upper triangle in parallel, one row of the matrix per task
    let upper: Vec<Vec<f64>> = (0..d)
        .into_par_iter()
        .map(|i| (i..d).map(|j| pearson(columns[i], columns[j])).collect())
        .collect();

    let mut out = Array2::zeros((d, d));
    for (i, row) in upper.into_iter().enumerate() {
        for (offset, r) in row.into_iter().enumerate() {
            let j = i + offset;
            out[[i, j]] = r;
            out[[j, i]] = r;
        }
    }
    Ok(out)
}

/// Correlation of every feature column with the target, in column order.
pub fn target_correlations(table: &FeatureTable) -> Result<Array1<f64>> {
    if table.n_samples() < 2 {
        return Err(Error::InvalidInput("correlation needs at least two rows".into()));
    }
    let target = table.target();
    Ok(table
        .features()
        .axis_iter(Axis(1))
        .map(|col| pearson(col, target))
        .collect())
}

//! Regression error metrics
//!
//! All metrics take `(truth, predicted)` of equal, non-zero length.

use geolearn_core::{Error, Result};
use ndarray::ArrayView1;

fn check_pair(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Result<()> {
    if truth.len() != predicted.len() {
        return Err(Error::InvalidInput(format!(
            "length mismatch: {} true values vs {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(Error::InvalidInput("cannot score empty vectors".into()));
    }
    Ok(())
}

/// Mean squared error
pub fn mse(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(truth, predicted)?;
    let sum: f64 = truth.iter().zip(predicted.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(sum / truth.len() as f64)
}

/// Root mean squared error, in the units of the target
pub fn rmse(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Result<f64> {
    mse(truth, predicted).map(f64::sqrt)
}

/// Mean absolute error
pub fn mae(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(truth, predicted)?;
    let sum: f64 = truth.iter().zip(predicted.iter()).map(|(t, p)| (t - p).abs()).sum();
    Ok(sum / truth.len() as f64)
}

/// Coefficient of determination `1 − SS_res / SS_tot`.
///
/// A constant `truth` gives 1.0 for a perfect prediction and 0.0 otherwise.
pub fn r2_score(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(truth, predicted)?;
    let mean = truth.sum() / truth.len() as f64;
    let ss_res: f64 = truth.iter().zip(predicted.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_rmse_two_values() {
        let t = array![3.0, 5.0];
        let p = array![3.0, 7.0];
        assert_relative_eq!(rmse(t.view(), p.view()).unwrap(), 2.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_rmse_identical_is_zero() {
        let t = array![1.5, -2.0, 8.25];
        assert_eq!(rmse(t.view(), t.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_rmse_symmetric_and_non_negative() {
        let a = array![1.0, 4.0, -2.0, 0.5];
        let b = array![0.0, 5.0, 3.0, 0.5];
        let ab = rmse(a.view(), b.view()).unwrap();
        let ba = rmse(b.view(), a.view()).unwrap();
        assert!(ab >= 0.0);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        let a = array![1.0, 2.0];
        let b = array![1.0];
        assert!(matches!(rmse(a.view(), b.view()), Err(Error::InvalidInput(_))));
        let empty = ndarray::Array1::<f64>::zeros(0);
        assert!(matches!(rmse(empty.view(), empty.view()), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_mae_and_mse() {
        let t = array![0.0, 0.0, 0.0];
        let p = array![1.0, -2.0, 3.0];
        assert_relative_eq!(mae(t.view(), p.view()).unwrap(), 2.0);
        assert_relative_eq!(mse(t.view(), p.view()).unwrap(), 14.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_r2() {
        let t = array![1.0, 2.0, 3.0];
        assert_eq!(r2_score(t.view(), t.view()).unwrap(), 1.0);
        let mean = array![2.0, 2.0, 2.0];
        assert_relative_eq!(r2_score(t.view(), mean.view()).unwrap(), 0.0);
        assert_eq!(r2_score(mean.view(), t.view()).unwrap(), 0.0);
    }
}

//! Dense linear system solver

use geolearn_core::{Error, Result};

/// Solve `mat · x = rhs` for a row-major `n × n` matrix by Gaussian
/// elimination with partial pivoting. `mat` and `rhs` are overwritten.
///
/// A pivot below `1e-12` times the largest matrix entry is treated as
/// singular.
pub(crate) fn gauss_solve(n: usize, mat: &mut [f64], rhs: &mut [f64]) -> Result<Vec<f64>> {
    let scale = mat.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return Err(Error::Algorithm("singular system: zero matrix".into()));
    }
    let threshold = scale * 1e-12;

    // Forward elimination
    for col in 0..n {
        // Find pivot (max absolute value in column)
        let mut max_val = mat[col * n + col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = mat[row * n + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < threshold {
            return Err(Error::Algorithm(format!(
                "singular system: column {} is linearly dependent",
                col
            )));
        }

        if max_row != col {
            for j in 0..n {
                mat.swap(col * n + j, max_row * n + j);
            }
            rhs.swap(col, max_row);
        }

        // Eliminate below
        let pivot = mat[col * n + col];
        for row in (col + 1)..n {
            let factor = mat[row * n + col] / pivot;
            mat[row * n + col] = 0.0;
            for j in (col + 1)..n {
                mat[row * n + j] -= factor * mat[col * n + j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0_f64; n];
    for col in (0..n).rev() {
        let mut sum = rhs[col];
        for j in (col + 1)..n {
            sum -= mat[col * n + j] * x[j];
        }
        x[col] = sum / mat[col * n + col];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_3x3() {
        // 2x + y - z = 8, -3x - y + 2z = -11, -2x + y + 2z = -3
        let mut mat = [2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0];
        let mut rhs = [8.0, -11.0, -3.0];
        let x = gauss_solve(3, &mut mat, &mut rhs).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
        assert!((x[2] + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_pivoting_needed() {
        let mut mat = [0.0, 1.0, 1.0, 0.0];
        let mut rhs = [3.0, 4.0];
        let x = gauss_solve(2, &mut mat, &mut rhs).unwrap();
        assert_eq!(x, vec![4.0, 3.0]);
    }

    #[test]
    fn test_singular() {
        let mut mat = [1.0, 2.0, 2.0, 4.0];
        let mut rhs = [1.0, 2.0];
        assert!(matches!(gauss_solve(2, &mut mat, &mut rhs), Err(Error::Algorithm(_))));

        let mut zero = [0.0; 4];
        assert!(gauss_solve(2, &mut zero, &mut rhs).is_err());
    }
}

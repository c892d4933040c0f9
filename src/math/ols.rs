//! Weighted least squares solver.
//!
//! For fixed time constants the Foster model is linear in the stage
//! resistances, so every evaluation of the nonlinear fit solves a small
//! problem of the form:
//!
//! ```text
//! minimize Σ w_k (z_k - φ_k^T R)^2
//! ```
//!
//! Implementation choices:
//! - Rows are pre-scaled by `sqrt(w_k)` by the caller; this is plain OLS.
//! - SVD handles tall design matrices and (near-)collinear columns, which
//!   appear whenever two time constants drift close to each other.
//!   (Nalgebra's `QR::solve` is intended for square systems.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Singular values below `tol` are treated as zero, which yields the
    // minimum-norm solution for rank-deficient designs.
    let s_max = svd.singular_values.max();
    for &rel_tol in &[1e-13, 1e-10, 1e-8] {
        let tol = (s_max * rel_tol).max(f64::MIN_POSITIVE);
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_handles_duplicate_columns() {
        // Two identical columns: the minimum-norm solution splits the weight.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let y = DVector::from_row_slice(&[2.0, 4.0, 6.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] + beta[1] - 2.0).abs() < 1e-9);
        assert!((beta[0] - beta[1]).abs() < 1e-9);
    }
}

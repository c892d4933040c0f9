//! Non-negative least squares.
//!
//! Stage resistances of a passive network cannot be negative, so the inner
//! amplitude solve of the Foster fit is constrained:
//!
//! ```text
//! minimize ‖X β − y‖²   subject to   β >= 0
//! ```
//!
//! Lawson–Hanson active-set method. Each passive-set subproblem is solved
//! with the SVD solver from `ols`.

use nalgebra::{DMatrix, DVector};

use crate::math::solve_least_squares;

/// Solve `min ‖x β − y‖²` with `β >= 0`.
///
/// Returns `None` if a passive-set subproblem cannot be solved.
pub fn solve_nnls(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let n = x.ncols();
    let mut beta = DVector::<f64>::zeros(n);
    let mut passive = vec![false; n];

    let tol = 10.0 * f64::EPSILON * x.amax() * y.amax() * (x.nrows().max(n) as f64);

    for _ in 0..3 * n {
        let w = x.transpose() * (y - x * &beta);
        let next = (0..n)
            .filter(|&j| !passive[j] && w[j] > tol)
            .max_by(|&a, &b| w[a].total_cmp(&w[b]).then(b.cmp(&a)));
        let Some(j) = next else {
            break;
        };
        passive[j] = true;

        // Shrink the passive set until its unconstrained solution is positive.
        for _ in 0..=n {
            let s = passive_solution(x, y, &passive)?;
            let mut step: Option<(usize, f64)> = None;
            for k in (0..n).filter(|&k| passive[k] && s[k] <= 0.0) {
                let denom = beta[k] - s[k];
                let alpha = if denom > 0.0 { beta[k] / denom } else { 0.0 };
                if step.is_none_or(|(_, a)| alpha < a) {
                    step = Some((k, alpha));
                }
            }
            let Some((blocking, alpha)) = step else {
                beta = s;
                break;
            };
            let delta = (&s - &beta) * alpha;
            beta += delta;
            beta[blocking] = 0.0;
            for k in 0..n {
                if passive[k] && beta[k] <= 0.0 {
                    passive[k] = false;
                    beta[k] = 0.0;
                }
            }
        }
    }

    beta.iter().all(|v| v.is_finite() && *v >= 0.0).then_some(beta)
}

/// Unconstrained least squares on the passive columns, zero elsewhere.
fn passive_solution(x: &DMatrix<f64>, y: &DVector<f64>, passive: &[bool]) -> Option<DVector<f64>> {
    let cols: Vec<usize> = (0..passive.len()).filter(|&k| passive[k]).collect();
    let mut out = DVector::<f64>::zeros(passive.len());
    if cols.is_empty() {
        return Some(out);
    }
    let sub = x.select_columns(cols.iter());
    let s = solve_least_squares(&sub, y)?;
    for (i, &k) in cols.iter().enumerate() {
        out[k] = s[i];
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_unconstrained_solution_when_positive() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let beta = solve_nnls(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn clamps_negative_coefficient_to_zero() {
        // Unconstrained: y = 3 - 1·x gives a negative slope.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[3.0, 2.0, 1.0]);
        let beta = solve_nnls(&x, &y).unwrap();
        assert_eq!(beta[1], 0.0);
        // Best constant fit is the mean.
        assert!((beta[0] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn all_negative_target_gives_zero() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[-1.0, -2.0]);
        let beta = solve_nnls(&x, &y).unwrap();
        assert_eq!(beta[0], 0.0);
    }
}

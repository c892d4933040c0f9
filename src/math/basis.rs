//! Stable basis function for first-order RC step responses.
//!
//! A single Foster stage contributes `R · g(t, τ)` with
//!
//! - `g(t, τ) = 1 - exp(-t/τ)`
//!
//! Numerical notes:
//! - For small `x = t/τ`, `1 - exp(-x)` suffers from catastrophic cancellation.
//!   We evaluate it as `-expm1(-x)` which keeps full relative precision.
//! - For `t ≫ τ`, `exp(-x)` underflows to `0` and `g → 1` without overflow.
//! - `t = 0` maps exactly to `0`.

/// Compute `g(t, τ) = 1 - exp(-t/τ)` in a numerically stable way.
///
/// `tau` must be positive; callers clip non-physical values before evaluation.
pub fn step_basis(t: f64, tau: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    let x = t / tau;
    if x.is_infinite() {
        return 1.0;
    }
    -(-x).exp_m1()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_basis_limits() {
        assert_eq!(step_basis(0.0, 1.0), 0.0);
        assert!((step_basis(1e6, 1e-3) - 1.0).abs() < 1e-15);
        assert_eq!(step_basis(1.0, 1e-320), 1.0);
    }

    #[test]
    fn step_basis_small_argument_keeps_precision() {
        let x = 1e-12;
        let g = step_basis(x, 1.0);
        assert!(((g - x) / x).abs() < 1e-9, "g={g}");
    }

    #[test]
    fn step_basis_one_time_constant() {
        let g = step_basis(2.0, 2.0);
        assert!((g - (1.0 - (-1.0f64).exp())).abs() < 1e-15);
    }
}

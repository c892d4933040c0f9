//! Bounded Levenberg–Marquardt for small nonlinear least-squares problems.
//!
//! The solver is fully deterministic: forward-difference Jacobian, fixed
//! damping schedule, fixed stopping rules. Parameters are clamped to box
//! bounds after every step.

use nalgebra::{DMatrix, DVector};

/// Stopping rules and limits.
#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Maximum number of accepted-or-rejected outer iterations.
    pub max_iterations: usize,
    /// Stop when an accepted step lowers the cost by less than this fraction.
    pub rel_tolerance: f64,
    /// Stop as soon as the cost drops to this value.
    pub abs_cost: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            rel_tolerance: 1e-10,
            abs_cost: 0.0,
        }
    }
}

/// Final state of a solve.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
    /// `false` only when the iteration cap was hit.
    pub converged: bool,
}

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;
const FD_STEP: f64 = 1e-7;

/// Minimize `‖f(x)‖²` subject to `lower <= x <= upper`.
///
/// `f` returns `None` when the residual cannot be computed at `x`; such
/// points are treated as infinitely bad.
pub fn minimize<F>(f: F, x0: &[f64], lower: &[f64], upper: &[f64], opts: &LmOptions) -> LmOutcome
where
    F: Fn(&[f64]) -> Option<DVector<f64>>,
{
    let clamp = |x: &mut [f64]| {
        for (i, xi) in x.iter_mut().enumerate() {
            *xi = xi.clamp(lower[i], upper[i]);
        }
    };

    let mut x = x0.to_vec();
    clamp(&mut x);

    let Some(mut r) = f(&x) else {
        return LmOutcome {
            params: x,
            cost: f64::INFINITY,
            iterations: 0,
            converged: false,
        };
    };
    let mut cost = r.norm_squared();
    let mut lambda = LAMBDA_INIT;

    for iter in 1..=opts.max_iterations {
        if cost <= opts.abs_cost {
            return LmOutcome { params: x, cost, iterations: iter - 1, converged: true };
        }

        let jac = jacobian(&f, &x, &r);
        let jt = jac.transpose();
        let a = &jt * &jac;
        let g = &jt * &r;
        if g.amax() == 0.0 {
            return LmOutcome { params: x, cost, iterations: iter, converged: true };
        }

        // Inner loop: raise damping until a step lowers the cost.
        loop {
            let mut damped = a.clone();
            for i in 0..x.len() {
                damped[(i, i)] += lambda * a[(i, i)].max(1e-12);
            }
            let Some(delta) = solve_normal(damped, -g.clone()) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    return LmOutcome { params: x, cost, iterations: iter, converged: true };
                }
                continue;
            };

            let mut x_new: Vec<f64> = x.iter().zip(delta.iter()).map(|(a, d)| a + d).collect();
            clamp(&mut x_new);

            let trial = f(&x_new).map(|r_new| {
                let c = r_new.norm_squared();
                (r_new, c)
            });
            match trial {
                Some((r_new, cost_new)) if cost_new.is_finite() && cost_new < cost => {
                    let rel = (cost - cost_new) / cost;
                    x = x_new;
                    r = r_new;
                    cost = cost_new;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);
                    tracing::trace!(iter, cost, lambda, "lm step accepted");
                    if rel < opts.rel_tolerance {
                        return LmOutcome { params: x, cost, iterations: iter, converged: true };
                    }
                    break;
                }
                _ => {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        // No descent direction left: a (local) minimum.
                        return LmOutcome { params: x, cost, iterations: iter, converged: true };
                    }
                }
            }
        }
    }

    LmOutcome {
        params: x,
        cost,
        iterations: opts.max_iterations,
        converged: false,
    }
}

fn jacobian<F>(f: &F, x: &[f64], r: &DVector<f64>) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> Option<DVector<f64>>,
{
    let m = r.len();
    let n = x.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut xp = x.to_vec();
    for j in 0..n {
        let h = FD_STEP * x[j].abs().max(1.0);
        xp[j] = x[j] + h;
        if let Some(rp) = f(&xp) {
            for i in 0..m {
                jac[(i, j)] = (rp[i] - r[i]) / h;
            }
        }
        xp[j] = x[j];
    }
    jac
}

fn solve_normal(a: DMatrix<f64>, b: DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        let x = chol.solve(&b);
        if x.iter().all(|v| v.is_finite()) {
            return Some(x);
        }
    }
    a.lu().solve(&b).filter(|x| x.iter().all(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_exponential_decay_rate() {
        // y = exp(-k t) with k = 0.7; fit k.
        let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
        let y: Vec<f64> = t.iter().map(|&t| (-0.7 * t).exp()).collect();
        let f = |x: &[f64]| {
            Some(DVector::from_iterator(
                t.len(),
                t.iter().zip(y.iter()).map(|(&ti, &yi)| (-x[0] * ti).exp() - yi),
            ))
        };
        let out = minimize(f, &[0.1], &[0.0], &[10.0], &LmOptions::default());
        assert!(out.converged);
        assert!((out.params[0] - 0.7).abs() < 1e-6, "k={}", out.params[0]);
    }

    #[test]
    fn respects_bounds() {
        // Minimum at x = -3 but lower bound is 0.
        let f = |x: &[f64]| Some(DVector::from_row_slice(&[x[0] + 3.0]));
        let out = minimize(f, &[1.0], &[0.0], &[5.0], &LmOptions::default());
        assert!(out.params[0] >= 0.0);
        assert!(out.params[0] < 1e-6);
    }

    #[test]
    fn reports_iteration_cap() {
        let f = |x: &[f64]| Some(DVector::from_row_slice(&[x[0] - 100.0, (x[0] - 100.0) * 1e-3]));
        let opts = LmOptions {
            max_iterations: 1,
            rel_tolerance: 0.0,
            abs_cost: 0.0,
        };
        let out = minimize(f, &[0.0], &[-1e9], &[1e9], &opts);
        assert!(!out.converged);
        assert_eq!(out.iterations, 1);
    }
}

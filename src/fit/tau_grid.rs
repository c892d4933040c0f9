//! Tau grid generation.
//!
//! Time constants are placed on logarithmic grids because thermal transients
//! span many decades of time. Two uses:
//!
//! - the geometric initial guess (`geometric_taus`)
//! - a deterministic grid search over ordered τ tuples used to seed the
//!   nonlinear solver for low orders (`tau_grid`)

use crate::error::AppError;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::validation(format!(
            "Invalid tau range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::validation("Tau steps must be >= 2."));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

/// `n` time constants spread geometrically over `[t_min/2, t_max·2]`.
///
/// A single time constant sits at the geometric midpoint of the range.
pub fn geometric_taus(t_min: f64, t_max: f64, n: usize) -> Result<Vec<f64>, AppError> {
    let lo = t_min / 2.0;
    let hi = t_max * 2.0;
    if n == 1 {
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && hi > lo) {
            return Err(AppError::validation(format!(
                "Invalid time range: min={t_min}, max={t_max}."
            )));
        }
        return Ok(vec![(lo * hi).sqrt()]);
    }
    log_space(lo, hi, n)
}

/// All strictly increasing `order`-tuples from a log grid.
///
/// Consecutive entries must differ by at least `min_ratio`.
pub fn tau_grid(
    min: f64,
    max: f64,
    steps: usize,
    order: usize,
    min_ratio: f64,
) -> Result<Vec<Vec<f64>>, AppError> {
    let values = log_space(min, max, steps)?;
    let min_ratio = min_ratio.max(1.0);
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(order);
    push_tuples(&values, 0, order, min_ratio, &mut current, &mut out);
    Ok(out)
}

fn push_tuples(
    values: &[f64],
    start: usize,
    remaining: usize,
    min_ratio: f64,
    current: &mut Vec<f64>,
    out: &mut Vec<Vec<f64>>,
) {
    if remaining == 0 {
        out.push(current.clone());
        return;
    }
    for i in start..values.len() {
        if let Some(&prev) = current.last() {
            if values[i] < prev * min_ratio {
                continue;
            }
        }
        current.push(values[i]);
        push_tuples(values, i + 1, remaining - 1, min_ratio, current, out);
        current.pop();
    }
}

//! Fit-quality metrics.
//!
//! - `rms_error_pct = 100 · sqrt(mean(res²) / mean(Zth²))`
//! - `dc_error_pct  = 100 · |Σ R − Zth_last| / Zth_last`
//!
//! The longest-time sample stands in for the true steady state.

use crate::domain::{Dataset, FitDiagnostics, FosterNetwork, NumericalWarning};
use crate::error::AppError;
use crate::models::evaluate;

/// Compute diagnostics for `network` against its source `dataset`.
pub fn compute_diagnostics(
    network: &FosterNetwork,
    dataset: &Dataset,
    warnings: Vec<NumericalWarning>,
) -> Result<FitDiagnostics, AppError> {
    let fitted = evaluate(network, &dataset.times())?;
    diagnostics_from_series(network.total_resistance(), dataset, &fitted, warnings)
}

/// Same as [`compute_diagnostics`] for an already evaluated model series.
pub fn diagnostics_from_series(
    total_resistance: f64,
    dataset: &Dataset,
    fitted: &[f64],
    warnings: Vec<NumericalWarning>,
) -> Result<FitDiagnostics, AppError> {
    let Some(last) = dataset.last() else {
        return Err(AppError::validation("Cannot compute diagnostics for an empty dataset."));
    };
    if fitted.len() != dataset.len() {
        return Err(AppError::validation(format!(
            "Fitted series length {} does not match dataset length {}.",
            fitted.len(),
            dataset.len()
        )));
    }
    if last.zth <= 0.0 {
        return Err(AppError::validation(
            "Steady-state Zth (last sample) must be > 0 for diagnostics.",
        ));
    }

    let n = dataset.len() as f64;
    let mut sse = 0.0;
    let mut ss = 0.0;
    for (p, &y) in dataset.points().iter().zip(fitted.iter()) {
        let r = y - p.zth;
        sse += r * r;
        ss += p.zth * p.zth;
    }
    let rms_error_pct = 100.0 * ((sse / n) / (ss / n)).sqrt();
    let dc_error_pct = 100.0 * (total_resistance - last.zth).abs() / last.zth;

    Ok(FitDiagnostics {
        rms_error_pct,
        dc_error_pct,
        warnings,
    })
}

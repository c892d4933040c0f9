//! Common step-response interface for Foster and Cauer networks.
//!
//! Both network kinds answer the same question (junction temperature rise for
//! a unit power step), which lets the converter be verified by simulating the
//! ladder and comparing it against the Foster curve sample by sample.

use crate::domain::Measurement;
use crate::error::AppError;

/// Unit-step thermal response of an RC network.
pub trait StepResponse {
    /// Number of RC stages.
    fn order(&self) -> usize;

    /// `Zth(t → ∞)`, the steady-state thermal resistance.
    fn steady_state(&self) -> f64;

    /// Evaluate `Zth(t)` at each requested time.
    ///
    /// Times must already be validated (finite, `>= 0`); use [`evaluate`] for
    /// unchecked caller input.
    fn step_response(&self, times: &[f64]) -> Result<Vec<f64>, AppError>;
}

/// Evaluate a network's step response at caller-supplied times.
pub fn evaluate<N: StepResponse + ?Sized>(network: &N, times: &[f64]) -> Result<Vec<f64>, AppError> {
    check_times(times)?;
    let values = network.step_response(times)?;
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(AppError::numerical(format!(
            "Non-finite step response at t={}.",
            times[i]
        )));
    }
    Ok(values)
}

/// Evaluate and pair each value with its time, ready for plotting/export.
pub fn simulate<N: StepResponse + ?Sized>(network: &N, times: &[f64]) -> Result<Vec<Measurement>, AppError> {
    let values = evaluate(network, times)?;
    Ok(times
        .iter()
        .zip(values)
        .map(|(&t, z)| Measurement::new(t, z))
        .collect())
}

fn check_times(times: &[f64]) -> Result<(), AppError> {
    if let Some(t) = times.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
        return Err(AppError::validation(format!(
            "Evaluation times must be finite and >= 0, got {t}."
        )));
    }
    Ok(())
}

/// `n` log-spaced times covering a network's time constants.
///
/// Spans `min τ / 10 .. max τ · 10`, which shows the full rise of every stage.
pub fn tau_span_times(taus: &[f64], n: usize) -> Vec<f64> {
    let min = taus.iter().copied().fold(f64::INFINITY, f64::min);
    let max = taus.iter().copied().fold(0.0_f64, f64::max);
    if !(min.is_finite() && min > 0.0 && max >= min) {
        return Vec::new();
    }
    let lo = (min / 10.0).log10();
    let hi = (max * 10.0).log10();
    let n = n.max(2);
    (0..n)
        .map(|i| 10f64.powf(lo + (hi - lo) * i as f64 / (n as f64 - 1.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FosterNetwork;

    #[test]
    fn evaluate_rejects_negative_times() {
        let net = FosterNetwork::from_rc(&[1.0], &[1.0]).unwrap();
        let err = evaluate(&net, &[0.0, -1.0]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn simulate_pairs_times_with_values() {
        let net = FosterNetwork::from_rc(&[2.0], &[0.5]).unwrap();
        let series = simulate(&net, &[0.0, 1.0]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].zth, 0.0);
        assert!((series[1].zth - 2.0 * (1.0 - (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn tau_span_times_bracket_time_constants() {
        let times = tau_span_times(&[1e-3, 1.0], 5);
        assert_eq!(times.len(), 5);
        assert!((times[0] - 1e-4).abs() < 1e-16);
        assert!((times[4] - 10.0).abs() < 1e-12);
    }
}

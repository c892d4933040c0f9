//! Seeded synthetic transient generation from a known network.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Dataset, Measurement};
use crate::error::AppError;
use crate::models::{StepResponse, evaluate};

/// `n` log-spaced sample times in `[t_min, t_max]` (inclusive).
pub fn log_times(t_min: f64, t_max: f64, n: usize) -> Result<Vec<f64>, AppError> {
    if !(t_min.is_finite() && t_max.is_finite() && t_min > 0.0 && t_max > t_min) {
        return Err(AppError::validation(format!(
            "Invalid time range: t_min={t_min}, t_max={t_max} (must be finite, >0, and t_max>t_min)."
        )));
    }
    if n < 2 {
        return Err(AppError::validation("Need at least 2 sample times."));
    }
    let lo = t_min.ln();
    let step = (t_max.ln() - lo) / (n as f64 - 1.0);
    let mut out: Vec<f64> = (0..n).map(|i| (lo + step * i as f64).exp()).collect();
    // Pin the endpoints so callers get exactly the requested range.
    out[0] = t_min;
    out[n - 1] = t_max;
    Ok(out)
}

/// Evaluate `network` at `times` and apply multiplicative Gaussian noise.
///
/// Each sample becomes `z · (1 + noise_rel · N(0,1))`, clamped at 0. The same
/// seed always produces the same transient.
pub fn synthesize<N: StepResponse + ?Sized>(
    network: &N,
    times: &[f64],
    noise_rel: f64,
    seed: u64,
) -> Result<Dataset, AppError> {
    if !(noise_rel.is_finite() && noise_rel >= 0.0) {
        return Err(AppError::validation(format!(
            "Noise level must be finite and >= 0, got {noise_rel}."
        )));
    }
    let clean = evaluate(network, times)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::numerical(format!("Noise distribution error: {e}")))?;

    let points = times
        .iter()
        .zip(clean)
        .map(|(&t, z)| {
            let noisy = if noise_rel > 0.0 {
                z * (1.0 + noise_rel * normal.sample(&mut rng))
            } else {
                z
            };
            Measurement::new(t, noisy.max(0.0))
        })
        .collect();
    Dataset::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FosterNetwork;

    fn network() -> FosterNetwork {
        FosterNetwork::from_r_tau(&[0.3, 0.7], &[0.01, 1.0]).unwrap()
    }

    #[test]
    fn log_times_span_the_requested_range() {
        let t = log_times(1e-3, 10.0, 5).unwrap();
        assert_eq!(t.len(), 5);
        assert_eq!(t[0], 1e-3);
        assert_eq!(t[4], 10.0);
        assert!((t[2] - 0.1).abs() < 1e-12);
        assert!(log_times(0.0, 1.0, 5).is_err());
        assert!(log_times(1.0, 10.0, 1).is_err());
    }

    #[test]
    fn noiseless_synthesis_matches_the_model() {
        let times = log_times(1e-3, 10.0, 20).unwrap();
        let ds = synthesize(&network(), &times, 0.0, 7).unwrap();
        let z = network().step_response(&times).unwrap();
        assert_eq!(ds.values(), z);
    }

    #[test]
    fn same_seed_same_noise() {
        let times = log_times(1e-3, 10.0, 20).unwrap();
        let a = synthesize(&network(), &times, 0.02, 42).unwrap();
        let b = synthesize(&network(), &times, 0.02, 42).unwrap();
        let c = synthesize(&network(), &times, 0.02, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn rejects_negative_noise() {
        let times = log_times(1e-3, 10.0, 4).unwrap();
        assert!(synthesize(&network(), &times, -0.1, 1).unwrap_err().is_validation());
    }
}

//! Temperature response to arbitrary power profiles.
//!
//! A piecewise-constant profile is a sum of shifted power steps, so for a
//! linear network
//!
//! ```text
//! ΔT(t) = Σⱼ (Pⱼ − Pⱼ₋₁) · Zth(t − tⱼ),   t ≥ tⱼ,  P₋₁ = 0
//! ```

use crate::domain::{PowerProfile, PowerSample};
use crate::error::AppError;
use crate::models::{StepResponse, evaluate};

/// Duty-cycle estimate of a power profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyCycle {
    /// Threshold used to classify "on" intervals (W).
    pub threshold: f64,
    /// Fraction of the profile duration above the threshold, in `[0, 1]`.
    pub duty: f64,
    /// Mean spacing of rising edges (s); 0 with fewer than two edges.
    pub period: f64,
}

/// Temperature rise above ambient at each requested time.
pub fn temperature_rise<N: StepResponse + ?Sized>(
    network: &N,
    profile: &PowerProfile,
    times: &[f64],
) -> Result<Vec<f64>, AppError> {
    // Validates the query times once; shifted times below are then valid too.
    evaluate(network, times)?;

    let mut rise = vec![0.0; times.len()];
    let mut previous = 0.0;
    for step in profile.samples() {
        let delta = step.p - previous;
        previous = step.p;
        if delta == 0.0 {
            continue;
        }
        let active: Vec<usize> = (0..times.len()).filter(|&i| times[i] >= step.t).collect();
        if active.is_empty() {
            continue;
        }
        let shifted: Vec<f64> = active.iter().map(|&i| times[i] - step.t).collect();
        let z = network.step_response(&shifted)?;
        for (&i, zi) in active.iter().zip(z) {
            rise[i] += delta * zi;
        }
    }
    Ok(rise)
}

/// Absolute temperature: `ambient + ΔT`.
pub fn temperature<N: StepResponse + ?Sized>(
    network: &N,
    profile: &PowerProfile,
    times: &[f64],
    ambient: f64,
) -> Result<Vec<f64>, AppError> {
    if !ambient.is_finite() {
        return Err(AppError::validation(format!(
            "Ambient temperature must be finite, got {ambient}."
        )));
    }
    Ok(temperature_rise(network, profile, times)?
        .into_iter()
        .map(|dt| ambient + dt)
        .collect())
}

/// Estimate duty cycle and period of a profile.
///
/// The last sample has no duration of its own, so a single-sample profile has
/// zero duration and a duty of 0.
pub fn duty_cycle(profile: &PowerProfile) -> DutyCycle {
    let samples = profile.samples();
    let p_min = samples.iter().map(|s| s.p).fold(f64::INFINITY, f64::min);
    let p_max = samples.iter().map(|s| s.p).fold(f64::NEG_INFINITY, f64::max);
    let threshold = 0.5 * (p_min + p_max);

    let total = samples[samples.len() - 1].t - samples[0].t;
    let on: f64 = samples
        .windows(2)
        .filter(|w| is_on(&w[0], threshold, p_min, p_max))
        .map(|w| w[1].t - w[0].t)
        .sum();
    let duty = if total > 0.0 { on / total } else { 0.0 };

    let edges: Vec<f64> = samples
        .windows(2)
        .filter(|w| !is_on(&w[0], threshold, p_min, p_max) && is_on(&w[1], threshold, p_min, p_max))
        .map(|w| w[1].t)
        .collect();
    let period = if edges.len() >= 2 {
        (edges[edges.len() - 1] - edges[0]) / (edges.len() - 1) as f64
    } else {
        0.0
    };

    DutyCycle {
        threshold,
        duty,
        period,
    }
}

fn is_on(s: &PowerSample, threshold: f64, p_min: f64, p_max: f64) -> bool {
    p_max > p_min && s.p > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CauerNetwork, FosterNetwork};
    use approx::assert_relative_eq;

    fn foster() -> FosterNetwork {
        FosterNetwork::from_r_tau(&[0.5, 1.5], &[0.01, 1.0]).unwrap()
    }

    fn profile(points: &[(f64, f64)]) -> PowerProfile {
        PowerProfile::new(points.iter().map(|&(t, p)| PowerSample::new(t, p)).collect()).unwrap()
    }

    #[test]
    fn single_step_equals_scaled_step_response() {
        let net = foster();
        let times = [0.0, 0.001, 0.1, 1.0, 10.0];
        let rise = temperature_rise(&net, &profile(&[(0.0, 25.0)]), &times).unwrap();
        let z = net.step_response(&times).unwrap();
        for (a, b) in rise.iter().zip(z.iter()) {
            assert_relative_eq!(*a, 25.0 * b, max_relative = 1e-12);
        }
    }

    #[test]
    fn pulse_decays_back_towards_ambient() {
        let net = foster();
        let p = profile(&[(0.0, 10.0), (1.0, 0.0)]);
        let temps = temperature(&net, &p, &[0.5, 1.0, 100.0], 25.0).unwrap();
        assert!(temps[1] > temps[0]);
        assert!((temps[2] - 25.0).abs() < 1e-6);
    }

    #[test]
    fn delayed_step_contributes_nothing_before_it_starts() {
        let net = foster();
        let rise = temperature_rise(&net, &profile(&[(2.0, 5.0)]), &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(rise[0], 0.0);
        assert_eq!(rise[1], 0.0);
        assert!(rise[2] > 0.0);
    }

    #[test]
    fn works_for_ladders() {
        let ladder = CauerNetwork::from_rc(&[1.0], &[2.0]).unwrap();
        let rise = temperature_rise(&ladder, &profile(&[(0.0, 3.0)]), &[2.0]).unwrap();
        assert_relative_eq!(rise[0], 3.0 * (1.0 - (-1.0f64).exp()), max_relative = 1e-9);
    }

    #[test]
    fn rejects_negative_query_times() {
        let err = temperature_rise(&foster(), &profile(&[(0.0, 1.0)]), &[-1.0]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn square_wave_duty_cycle() {
        let p = profile(&[
            (0.0, 10.0),
            (1.0, 0.0),
            (4.0, 10.0),
            (5.0, 0.0),
            (8.0, 10.0),
            (9.0, 0.0),
            (12.0, 0.0),
        ]);
        let d = duty_cycle(&p);
        assert_eq!(d.threshold, 5.0);
        assert_relative_eq!(d.duty, 0.25);
        assert_relative_eq!(d.period, 4.0);
    }

    #[test]
    fn constant_profile_has_no_duty() {
        let d = duty_cycle(&profile(&[(0.0, 3.0), (5.0, 3.0)]));
        assert_eq!(d.duty, 0.0);
        assert_eq!(d.period, 0.0);
    }
}

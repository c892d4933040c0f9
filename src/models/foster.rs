//! Foster (parallel RC bank) evaluation.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given time and taus (for the linear R solve)
//! - evaluate `Zth(t)` given R and taus (for residuals/plots)

use crate::domain::FosterNetwork;
use crate::error::AppError;
use crate::math::step_basis;
use crate::models::response::StepResponse;

/// Fill a design row: `out[i] = 1 - exp(-t/τᵢ)`.
///
/// # Panics
/// Panics if `out` is shorter than `taus`. Callers size these arrays correctly.
pub fn fill_design_row(t: f64, taus: &[f64], out: &mut [f64]) {
    for (o, &tau) in out.iter_mut().zip(taus.iter()) {
        *o = step_basis(t, tau);
    }
}

/// `Σ Rᵢ · (1 - exp(-t/τᵢ))`.
pub fn foster_response(t: f64, r: &[f64], taus: &[f64]) -> f64 {
    r.iter()
        .zip(taus.iter())
        .map(|(&ri, &tau)| ri * step_basis(t, tau))
        .sum()
}

/// Driving-point impedance `Z(s) = Σ Rᵢ / (1 + s τᵢ)` for real `s >= 0`.
pub fn foster_impedance(network: &FosterNetwork, s: f64) -> f64 {
    network
        .stages()
        .iter()
        .map(|st| st.r / (1.0 + s * st.tau()))
        .sum()
}

impl StepResponse for FosterNetwork {
    fn order(&self) -> usize {
        FosterNetwork::order(self)
    }

    fn steady_state(&self) -> f64 {
        self.total_resistance()
    }

    fn step_response(&self, times: &[f64]) -> Result<Vec<f64>, AppError> {
        let r = self.resistances();
        let taus = self.taus();
        Ok(times.iter().map(|&t| foster_response(t, &r, &taus)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_saturates_without_overflow() {
        let net = FosterNetwork::from_rc(&[0.3, 0.7], &[1e-6, 1e3]).unwrap();
        let z = net.step_response(&[1e12, 1e-15]).unwrap();
        assert!((z[0] - 1.0).abs() < 1e-12);
        assert!(z[1] >= 0.0 && z[1] < 1e-8);
    }

    #[test]
    fn impedance_at_dc_is_total_resistance() {
        let net = FosterNetwork::from_rc(&[0.3, 0.7], &[1.0, 2.0]).unwrap();
        assert!((foster_impedance(&net, 0.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn design_row_matches_basis() {
        let mut row = [0.0; 2];
        fill_design_row(1.0, &[1.0, 2.0], &mut row);
        assert!((row[0] - (1.0 - (-1.0f64).exp())).abs() < 1e-15);
        assert!((row[1] - (1.0 - (-0.5f64).exp())).abs() < 1e-15);
    }
}

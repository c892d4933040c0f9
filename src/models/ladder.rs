//! Cauer ladder evaluation via modal decomposition.
//!
//! Node `i` carries the shunt capacitance `Cᵢ`; the series resistance `Rᵢ`
//! joins node `i` to node `i+1`, and the last resistance joins the final node
//! to ambient. A unit power step is injected at node 0.
//!
//! The node temperatures obey `C dV/dt = -G V + e₀`. For a chain grounded at
//! its far end the inverse conductance matrix is explicit,
//! `(G⁻¹)ᵢⱼ = Σ_{k ≥ max(i,j)} Rₖ`, so the symmetric matrix
//! `W = C^½ G⁻¹ C^½` can be built without any inversion. Its eigenvalues are
//! the ladder's time constants and, with `W = Q T Qᵀ`,
//!
//! ```text
//! V₀(t) = Σₖ (Q₀ₖ² τₖ / C₀) · (1 - exp(-t/τₖ))
//! ```
//!
//! which is a Foster network with `Rₖ = Q₀ₖ² τₖ / C₀`.
//!
//! Working with `W` rather than `C⁻¹G` keeps the slow (large τ) modes accurate
//! relative to each other; stiff modes of negligible amplitude may come out as
//! tiny non-positive values and are dropped from the response.

use nalgebra::DMatrix;
use nalgebra::linalg::SymmetricEigen;

use crate::domain::{
    CauerNetwork, FosterNetwork, FosterStage, NumericalWarning, clip_positive, join_warnings,
};
use crate::error::AppError;
use crate::models::foster::foster_response;
use crate::models::response::StepResponse;

/// Modal amplitudes and time constants of a ladder (unclipped).
#[derive(Debug, Clone)]
pub struct LadderModes {
    pub r: Vec<f64>,
    pub tau: Vec<f64>,
}

impl LadderModes {
    /// Modes with a positive, finite amplitude and time constant.
    fn physical(&self) -> (Vec<f64>, Vec<f64>) {
        self.r
            .iter()
            .zip(self.tau.iter())
            .filter(|(r, tau)| r.is_finite() && **r > 0.0 && tau.is_finite() && **tau > 0.0)
            .map(|(&r, &tau)| (r, tau))
            .unzip()
    }
}

/// Decompose a ladder into its modes.
pub fn ladder_modes(ladder: &CauerNetwork) -> Result<LadderModes, AppError> {
    let stages = ladder.stages();
    let n = stages.len();

    // Resistance from node i to ambient.
    let mut r_to_ambient = vec![0.0; n];
    let mut acc = 0.0;
    for i in (0..n).rev() {
        acc += stages[i].r;
        r_to_ambient[i] = acc;
    }

    let sqrt_c: Vec<f64> = stages.iter().map(|s| s.c.sqrt()).collect();
    let mut w = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            w[(i, j)] = sqrt_c[i] * sqrt_c[j] * r_to_ambient[i.max(j)];
        }
    }

    // Keep entries O(1) before the iterative solver runs.
    let scale = w.diagonal().max();
    if !(scale.is_finite() && scale > 0.0) {
        return Err(AppError::numerical("Degenerate ladder state matrix."));
    }
    w /= scale;

    let eig = SymmetricEigen::try_new(w, f64::EPSILON, 0)
        .ok_or_else(|| AppError::numerical("Ladder eigendecomposition did not converge."))?;

    let c0 = stages[0].c;
    let mut r = Vec::with_capacity(n);
    let mut tau = Vec::with_capacity(n);
    for k in 0..n {
        let tau_k = eig.eigenvalues[k] * scale;
        let q0 = eig.eigenvectors[(0, k)];
        r.push(q0 * q0 * tau_k / c0);
        tau.push(tau_k);
    }

    Ok(LadderModes { r, tau })
}

/// Result of a Cauer → Foster decomposition.
#[derive(Debug, Clone)]
pub struct FosterDecomposition {
    pub network: FosterNetwork,
    pub warnings: Vec<NumericalWarning>,
}

impl FosterDecomposition {
    pub fn warning(&self) -> Option<String> {
        join_warnings(&self.warnings)
    }
}

/// Exact Cauer → Foster conversion.
///
/// Modes with a non-physical amplitude or time constant (possible only from
/// rounding on extremely ill-conditioned ladders) are clipped to the floor
/// and flagged with [`NumericalWarning::ClippedParameters`].
pub fn cauer_to_foster(ladder: &CauerNetwork) -> Result<FosterDecomposition, AppError> {
    foster_from_modes(&ladder_modes(ladder)?)
}

fn foster_from_modes(modes: &LadderModes) -> Result<FosterDecomposition, AppError> {
    let mut clipped = false;
    let stages = modes
        .r
        .iter()
        .zip(modes.tau.iter())
        .map(|(&r, &tau)| {
            let (r, cr) = clip_positive(r);
            let (tau, ct) = clip_positive(tau);
            clipped |= cr || ct;
            FosterStage::new(r, tau / r)
        })
        .collect();
    let mut warnings = Vec::new();
    if clipped {
        tracing::warn!("Clipped non-physical modes while decomposing Cauer ladder");
        warnings.push(NumericalWarning::ClippedParameters);
    }
    Ok(FosterDecomposition {
        network: FosterNetwork::new(stages)?,
        warnings,
    })
}

/// Driving-point impedance of the ladder for real `s >= 0`.
///
/// Evaluated from the ambient end: `Z = 1/(s Cᵢ + 1/(Rᵢ + Z_next))`.
pub fn ladder_impedance(ladder: &CauerNetwork, s: f64) -> f64 {
    let mut z_next = 0.0;
    for st in ladder.stages().iter().rev() {
        let series = st.r + z_next;
        z_next = 1.0 / (s * st.c + 1.0 / series);
    }
    z_next
}

impl StepResponse for CauerNetwork {
    fn order(&self) -> usize {
        CauerNetwork::order(self)
    }

    fn steady_state(&self) -> f64 {
        self.total_resistance()
    }

    fn step_response(&self, times: &[f64]) -> Result<Vec<f64>, AppError> {
        let (r, tau) = ladder_modes(self)?.physical();
        if r.is_empty() {
            return Err(AppError::numerical("Ladder has no decaying mode."));
        }
        Ok(times.iter().map(|&t| foster_response(t, &r, &tau)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_stage_ladder_is_single_exponential() {
        let ladder = CauerNetwork::from_rc(&[2.0], &[0.5]).unwrap();
        let z = ladder.step_response(&[1.0]).unwrap();
        assert!((z[0] - 2.0 * (1.0 - (-1.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn modes_sum_to_total_resistance() {
        let ladder = CauerNetwork::from_rc(&[0.1, 0.4, 0.5], &[1e-3, 1e-1, 10.0]).unwrap();
        let decomposition = cauer_to_foster(&ladder).unwrap();
        assert!(decomposition.warnings.is_empty());
        assert!((decomposition.network.total_resistance() - 1.0).abs() < 1e-10);
        let late = ladder.step_response(&[1e6]).unwrap();
        assert!((late[0] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn impedance_matches_modal_foster() {
        let ladder = CauerNetwork::from_rc(&[0.2, 0.3], &[0.01, 2.0]).unwrap();
        let foster = cauer_to_foster(&ladder).unwrap().network;
        for &s in &[0.0, 0.5, 10.0, 1e3] {
            let zl = ladder_impedance(&ladder, s);
            let zf = crate::models::foster_impedance(&foster, s);
            assert!(((zl - zf) / zl).abs() < 1e-9, "s={s}: {zl} vs {zf}");
        }
    }

    #[test]
    fn non_physical_modes_are_clipped_and_flagged() {
        let modes = LadderModes {
            r: vec![0.5, -1e-20],
            tau: vec![1.0, 1e-30],
        };
        let decomposition = foster_from_modes(&modes).unwrap();
        assert_eq!(decomposition.warnings, vec![NumericalWarning::ClippedParameters]);
        assert!(decomposition.warning().is_some());
        for st in decomposition.network.stages() {
            assert!(st.r > 0.0 && st.c > 0.0);
        }
    }
}

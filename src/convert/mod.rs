//! Foster → Cauer synthesis by continued-fraction expansion.
//!
//! The Foster driving-point impedance
//!
//! ```text
//! Z(s) = Σ Rᵢ / (1 + s τᵢ) = N(s) / D(s),   D(s) = Π (1 + s τᵢ)
//! ```
//!
//! is expanded around `s → ∞`:
//!
//! ```text
//! Z = 1 / (s C₁ + 1 / (R₁ + 1 / (s C₂ + 1 / (R₂ + ...))))
//! ```
//!
//! Each step divides the admittance `D/N` to peel off a shunt capacitance,
//! then divides the remaining impedance to peel off a series resistance.
//!
//! Numerical notes:
//! - Raw coefficients of `Π (1 + s τᵢ)` span `Π τᵢ` in magnitude, which
//!   overflows/underflows quickly when τ covers many decades. We substitute
//!   `p = s·τ_c` (τ_c = geometric mean of the τᵢ) and divide impedances by
//!   `Σ Rᵢ`, so the leading coefficient of `D` is exactly 1 and the constant
//!   term of `N` is exactly 1.
//! - After every division the numerator/denominator pair is rescaled by a
//!   common factor to unit max-norm.
//! - Time constants equal within a relative `1e-9` are merged first: the exact
//!   rational function then has lower order and the expansion would divide by
//!   a vanishing leading coefficient.

use crate::domain::{
    CauerNetwork, CauerStage, FosterNetwork, NumericalWarning, PARAM_FLOOR, clip_positive,
    join_warnings,
};
use crate::error::AppError;
use crate::math::poly::{add_scaled, leading, mul_linear, product_of_linear};

/// Relative τ distance below which two Foster stages are merged.
pub const DUPLICATE_TAU_REL: f64 = 1e-9;

/// Relative mismatch of `Σ R` (Cauer vs Foster) that flags an unstable expansion.
const DC_MISMATCH_REL: f64 = 1e-6;

/// Result of a Foster → Cauer conversion.
#[derive(Debug, Clone)]
pub struct CauerConversion {
    pub network: CauerNetwork,
    pub warnings: Vec<NumericalWarning>,
}

impl CauerConversion {
    pub fn warning(&self) -> Option<String> {
        join_warnings(&self.warnings)
    }
}

/// Convert a Foster network into an equivalent Cauer ladder of the same order.
///
/// Non-physical extracted elements are clipped to [`PARAM_FLOOR`] and flagged
/// with [`NumericalWarning::UnstableConversion`]; this never fails for a valid
/// Foster network apart from non-finite normalization constants.
pub fn foster_to_cauer(foster: &FosterNetwork) -> Result<CauerConversion, AppError> {
    let n = foster.order();
    let (r, tau) = merge_duplicate_taus(&foster.resistances(), &foster.taus());
    let mut unstable = r.len() < n;

    let r_total: f64 = r.iter().sum();
    let tau_c = (tau.iter().map(|t| t.ln()).sum::<f64>() / tau.len() as f64).exp();
    if !(r_total.is_finite() && r_total > 0.0 && tau_c.is_finite() && tau_c > 0.0) {
        return Err(AppError::numerical(
            "Cannot normalize Foster network for Cauer synthesis.",
        ));
    }

    let a: Vec<f64> = tau.iter().map(|t| t / tau_c).collect();
    let rho: Vec<f64> = r.iter().map(|ri| ri / r_total).collect();

    let (mut num, mut den) = admittance_polynomials(&rho, &a);
    let normalized = expand(&mut num, &mut den, a.len());

    let mut stages = Vec::with_capacity(n);
    for (r_hat, c_hat) in normalized {
        let (r, cr) = clip_positive(r_hat * r_total);
        let (c, cc) = clip_positive(c_hat * tau_c / r_total);
        unstable |= cr || cc;
        stages.push(CauerStage::new(r, c));
    }
    // Merged duplicates leave the ladder short; pad at the ambient end with
    // negligible stages so callers always get the requested order.
    while stages.len() < n {
        stages.push(CauerStage::new(PARAM_FLOOR, PARAM_FLOOR));
    }

    let r_cauer: f64 = stages.iter().map(|s| s.r).sum();
    if ((r_cauer - foster.total_resistance()) / foster.total_resistance()).abs() > DC_MISMATCH_REL {
        unstable = true;
    }

    let mut warnings = Vec::new();
    if unstable {
        tracing::warn!(
            order = n,
            reduced_order = r.len(),
            "Cauer synthesis is ill-conditioned; elements clipped or padded"
        );
        warnings.push(NumericalWarning::UnstableConversion);
    }

    Ok(CauerConversion {
        network: CauerNetwork::new(stages)?,
        warnings,
    })
}

/// Merge stages whose τ agree within [`DUPLICATE_TAU_REL`].
///
/// Input must be sorted by ascending τ. Merged stages keep the R-weighted
/// mean τ and the summed R.
fn merge_duplicate_taus(r: &[f64], tau: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut r_out: Vec<f64> = Vec::with_capacity(r.len());
    let mut tau_out: Vec<f64> = Vec::with_capacity(tau.len());
    for (&ri, &ti) in r.iter().zip(tau.iter()) {
        match (r_out.last_mut(), tau_out.last_mut()) {
            (Some(r_prev), Some(t_prev)) if (ti - *t_prev).abs() <= DUPLICATE_TAU_REL * *t_prev => {
                *t_prev = (*t_prev * *r_prev + ti * ri) / (*r_prev + ri);
                *r_prev += ri;
            }
            _ => {
                r_out.push(ri);
                tau_out.push(ti);
            }
        }
    }
    (r_out, tau_out)
}

/// Admittance `Y(p) = D(p) / N(p)` of the normalized Foster network.
fn admittance_polynomials(rho: &[f64], a: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let d = product_of_linear(a);
    let mut nz = vec![0.0; a.len()];
    for (i, &ri) in rho.iter().enumerate() {
        let mut term = vec![1.0];
        for (j, &aj) in a.iter().enumerate() {
            if j != i {
                term = mul_linear(&term, aj);
            }
        }
        add_scaled(&mut nz, &term, ri);
    }
    (d, nz)
}

/// Run the continued fraction on `Y = num/den`, returning normalized `(R, C)`.
fn expand(num: &mut Vec<f64>, den: &mut Vec<f64>, order: usize) -> Vec<(f64, f64)> {
    let mut out = Vec::with_capacity(order);
    for _ in 0..order {
        normalize_pair(num, den);

        // Shunt C: Y = p·c + num'/den with deg num' = deg den.
        let c = leading(num) / leading(den);
        let mut shifted = vec![0.0];
        shifted.extend_from_slice(den);
        add_scaled(num, &shifted, -c);
        num.pop();

        normalize_pair(num, den);

        // Series R: Z = den/num = r + den'/num with deg den' = deg num - 1.
        let r = leading(den) / leading(num);
        add_scaled(den, num, -r);
        den.pop();

        out.push((r, c));
        if den.is_empty() {
            break;
        }
        // Remaining admittance is num/den again.
    }
    out
}

fn normalize_pair(num: &mut [f64], den: &mut [f64]) {
    let norm = num
        .iter()
        .chain(den.iter())
        .fold(0.0_f64, |m, c| m.max(c.abs()));
    if norm > 0.0 && norm.is_finite() {
        num.iter_mut().for_each(|c| *c /= norm);
        den.iter_mut().for_each(|c| *c /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepResponse, cauer_to_foster, foster_impedance, ladder_impedance, tau_span_times};

    fn assert_equivalent(foster: &FosterNetwork, cauer: &CauerNetwork, rel: f64) {
        let times = tau_span_times(&foster.taus(), 200);
        let zf = foster.step_response(&times).unwrap();
        let zc = cauer.step_response(&times).unwrap();
        for ((t, a), b) in times.iter().zip(zf.iter()).zip(zc.iter()) {
            let err = ((a - b) / a).abs();
            assert!(err < rel, "t={t}: foster={a} cauer={b} rel={err}");
        }
    }

    #[test]
    fn single_stage_is_identity() {
        let foster = FosterNetwork::from_rc(&[2.0], &[0.25]).unwrap();
        let conv = foster_to_cauer(&foster).unwrap();
        let st = conv.network.stages()[0];
        assert!((st.r - 2.0).abs() < 1e-12);
        assert!((st.c - 0.25).abs() < 1e-12);
        assert!(conv.warnings.is_empty());
    }

    #[test]
    fn two_stage_matches_closed_form() {
        // C₁ = 1 / Σ(1/Cᵢ) for the shunt capacitance nearest the junction.
        let foster = FosterNetwork::from_rc(&[1.0, 1.0], &[1.0, 10.0]).unwrap();
        let conv = foster_to_cauer(&foster).unwrap();
        let c1 = conv.network.stages()[0].c;
        assert!((c1 - 1.0 / (1.0 + 0.1)).abs() < 1e-12);
        assert!((conv.network.total_resistance() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn step_response_reproduces_foster_for_separated_taus() {
        let foster =
            FosterNetwork::from_r_tau(&[0.2, 0.5, 0.3], &[1e-3, 1e-1, 10.0]).unwrap();
        let conv = foster_to_cauer(&foster).unwrap();
        assert_eq!(conv.network.order(), 3);
        assert!(conv.warnings.is_empty(), "{:?}", conv.warnings);
        assert_equivalent(&foster, &conv.network, 1e-6);
    }

    #[test]
    fn four_stage_spanning_six_decades() {
        let foster = FosterNetwork::from_r_tau(
            &[0.05, 0.15, 0.4, 0.9],
            &[1e-5, 1e-3, 1e-1, 10.0],
        )
        .unwrap();
        let conv = foster_to_cauer(&foster).unwrap();
        assert!(conv.warnings.is_empty(), "{:?}", conv.warnings);
        assert_equivalent(&foster, &conv.network, 1e-6);
        for &s in &[0.0, 1.0, 1e3] {
            let zf = foster_impedance(&foster, s);
            let zc = ladder_impedance(&conv.network, s);
            assert!(((zf - zc) / zf).abs() < 1e-8);
        }
    }

    #[test]
    fn round_trip_through_modal_decomposition() {
        let foster = FosterNetwork::from_r_tau(&[0.3, 0.6], &[0.01, 1.0]).unwrap();
        let ladder = foster_to_cauer(&foster).unwrap().network;
        let back = cauer_to_foster(&ladder).unwrap().network;
        for (a, b) in foster.stages().iter().zip(back.stages().iter()) {
            assert!(((a.r - b.r) / a.r).abs() < 1e-8);
            assert!(((a.tau() - b.tau()) / a.tau()).abs() < 1e-8);
        }
    }

    #[test]
    fn exact_duplicate_taus_are_merged_and_padded() {
        let foster = FosterNetwork::from_r_tau(&[0.4, 0.6, 1.0], &[0.5, 0.5, 20.0]).unwrap();
        let conv = foster_to_cauer(&foster).unwrap();
        assert_eq!(conv.network.order(), 3);
        assert_eq!(conv.warnings, vec![NumericalWarning::UnstableConversion]);
        let rel = (conv.network.total_resistance() - 2.0).abs() / 2.0;
        assert!(rel < 1e-6, "rel={rel}");
        assert_equivalent(&foster, &conv.network, 1e-6);
    }

    #[test]
    fn near_degenerate_taus_stay_physical() {
        let foster = FosterNetwork::from_r_tau(
            &[0.25, 0.25, 0.25, 0.25],
            &[1.0, 1.0 + 1e-7, 1.0 + 2e-7, 5.0],
        )
        .unwrap();
        let conv = foster_to_cauer(&foster).unwrap();
        assert_eq!(conv.network.order(), 4);
        for st in conv.network.stages() {
            assert!(st.r.is_finite() && st.r > 0.0);
            assert!(st.c.is_finite() && st.c > 0.0);
        }
    }
}

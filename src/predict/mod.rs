//! Sibling-package prediction by die-area scaling.
//!
//! A fitted Foster network is rescaled stage by stage:
//!
//! ```text
//! Rᵢ' = Rᵢ · (A_ref / A_new)^γᵢ
//! Cᵢ' = Cᵢ · (A_new / A_ref)^γᵢ      (τᵢ unchanged)
//! ```
//!
//! With `fixed` scaling every stage shares one γ. With `blended` scaling γ
//! follows a logistic curve in `log10 τ`:
//!
//! ```text
//! γᵢ = 1 / (1 + exp((log10 τᵢ − log10 τ_mid) / w))
//! ```
//!
//! so fast stages (die-dominated heat spreading) scale almost inversely with
//! area while slow stages (package/board) barely scale at all. `τ_mid`
//! defaults to the geometric mean of the extreme time constants, `w` to one
//! decade.

use crate::domain::{
    Dataset, FitDiagnostics, FosterNetwork, FosterStage, MIN_FIT_POINTS, Measurement, NumericalWarning,
    ScalingMode, ScalingSpec, clip_positive, join_warnings,
};
use crate::error::AppError;
use crate::fit::{FitOptions, compute_diagnostics, fit_foster};
use crate::models::simulate;

/// Width of the blended transition when none is configured (decades).
pub const DEFAULT_WIDTH_DECADES: f64 = 1.0;

/// Inputs beyond the dataset and areas.
#[derive(Debug, Clone, Default)]
pub struct PredictOptions {
    /// Options for the internal reference fit.
    pub fit: FitOptions,
    /// Use this network as the reference instead of fitting one.
    pub network: Option<FosterNetwork>,
}

/// Result of a sibling prediction.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Predicted transient at the dataset's times.
    pub series: Vec<Measurement>,
    /// `Σ R_new / Σ R` (or `A_ref / A_new` on the fallback path).
    pub scale: f64,
    pub summary: String,
    /// `None` on the fallback path.
    pub reference: Option<FosterNetwork>,
    pub scaled: Option<FosterNetwork>,
    /// How well the reference network matches the measured samples.
    pub reference_diagnostics: Option<FitDiagnostics>,
    /// Per-stage exponents, aligned with the reference stages.
    pub gammas: Vec<f64>,
    pub warnings: Vec<NumericalWarning>,
}

impl Prediction {
    pub fn warning(&self) -> Option<String> {
        join_warnings(&self.warnings)
    }
}

/// Logistic γ for each τ, decreasing in `log10 τ`.
pub fn blended_gammas(taus: &[f64], tau_mid: Option<f64>, width_decades: Option<f64>) -> Vec<f64> {
    if taus.is_empty() {
        return Vec::new();
    }
    let mid = tau_mid.unwrap_or_else(|| {
        let lo = taus.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = taus.iter().copied().fold(0.0_f64, f64::max);
        (lo * hi).sqrt()
    });
    let w = width_decades.unwrap_or(DEFAULT_WIDTH_DECADES);
    let log_mid = mid.log10();
    taus.iter()
        .map(|&tau| 1.0 / (1.0 + ((tau.log10() - log_mid) / w).exp()))
        .collect()
}

/// Exponents for every stage of `network` under `spec`.
pub fn stage_gammas(network: &FosterNetwork, spec: &ScalingSpec) -> Result<Vec<f64>, AppError> {
    spec.validate()?;
    match spec.mode {
        ScalingMode::Fixed => {
            let g = spec
                .gamma_fixed
                .ok_or_else(|| AppError::validation("Fixed scaling mode requires gammaFixed."))?;
            Ok(vec![g; network.order()])
        }
        ScalingMode::Blended => Ok(blended_gammas(
            &network.taus(),
            spec.tau_mid,
            spec.width_decades,
        )),
    }
}

/// A network rescaled to a new die area.
#[derive(Debug, Clone)]
pub struct ScaledNetwork {
    pub network: FosterNetwork,
    /// γᵢ per stage.
    pub gammas: Vec<f64>,
    /// Some scaled element left the representable range and was clipped.
    pub clipped: bool,
}

/// Scale `network` from `a_ref` to `a_new`.
pub fn scale_network(
    network: &FosterNetwork,
    a_ref: f64,
    a_new: f64,
    spec: &ScalingSpec,
) -> Result<ScaledNetwork, AppError> {
    check_areas(a_ref, a_new)?;
    let gammas = stage_gammas(network, spec)?;
    let shrink = a_ref / a_new;
    let grow = a_new / a_ref;

    let mut clipped = false;
    let stages = network
        .stages()
        .iter()
        .zip(gammas.iter())
        .map(|(st, &g)| {
            let (r, cr) = clip_positive(st.r * shrink.powf(g));
            let (c, cc) = clip_positive(st.c * grow.powf(g));
            clipped |= cr || cc;
            FosterStage::new(r, c)
        })
        .collect();
    if clipped {
        tracing::warn!("Area scaling produced non-physical stages; clipped");
    }
    Ok(ScaledNetwork {
        network: FosterNetwork::new(stages)?,
        gammas,
        clipped,
    })
}

/// Predict the transient of a sibling device with die area `a_new`.
pub fn predict(
    dataset: &Dataset,
    a_ref: f64,
    a_new: f64,
    spec: &ScalingSpec,
    opts: &PredictOptions,
) -> Result<Prediction, AppError> {
    check_areas(a_ref, a_new)?;
    spec.validate()?;
    if dataset.is_empty() {
        return Err(AppError::validation("Need at least one sample to predict."));
    }

    let mut warnings = Vec::new();
    let (reference, reference_diagnostics) = match &opts.network {
        Some(net) => {
            let diagnostics = if can_fit(dataset) {
                Some(compute_diagnostics(net, dataset, Vec::new())?)
            } else {
                None
            };
            (net.clone(), diagnostics)
        }
        None => {
            if !can_fit(dataset) {
                return Ok(fallback(dataset, a_ref, a_new));
            }
            let fit = fit_foster(dataset, &opts.fit)?;
            warnings.extend(fit.diagnostics.warnings.iter().copied());
            (fit.network, Some(fit.diagnostics))
        }
    };

    let ScaledNetwork {
        network: scaled,
        gammas,
        clipped,
    } = scale_network(&reference, a_ref, a_new, spec)?;
    if clipped && !warnings.contains(&NumericalWarning::ClippedParameters) {
        warnings.push(NumericalWarning::ClippedParameters);
    }
    let scale = scaled.total_resistance() / reference.total_resistance();
    let series = simulate(&scaled, &dataset.times())?;

    let summary = format!(
        "{} area scale applied: {scale:.6} (Aref={a_ref}, Anew={a_new}, N={}, gamma {})",
        match spec.mode {
            ScalingMode::Fixed => "fixed",
            ScalingMode::Blended => "blended",
        },
        reference.order(),
        gamma_range(&gammas),
    );
    tracing::info!(scale, order = reference.order(), "sibling prediction done");

    Ok(Prediction {
        series,
        scale,
        summary,
        reference: Some(reference),
        scaled: Some(scaled),
        reference_diagnostics,
        gammas,
        warnings,
    })
}

fn can_fit(dataset: &Dataset) -> bool {
    dataset.len() >= MIN_FIT_POINTS && dataset.last().is_some_and(|p| p.zth > 0.0)
}

/// Pure inverse-area scaling of the raw samples (γ = 1).
fn fallback(dataset: &Dataset, a_ref: f64, a_new: f64) -> Prediction {
    let scale = a_ref / a_new;
    tracing::warn!(
        points = dataset.len(),
        scale,
        "Too few usable samples to fit; scaling raw samples"
    );
    let series = dataset
        .points()
        .iter()
        .map(|p| Measurement::new(p.t, p.zth * scale))
        .collect();
    Prediction {
        series,
        scale,
        summary: format!("simple area scale applied: {scale:.6}"),
        reference: None,
        scaled: None,
        reference_diagnostics: None,
        gammas: Vec::new(),
        warnings: vec![NumericalWarning::FallbackScaling],
    }
}

fn check_areas(a_ref: f64, a_new: f64) -> Result<(), AppError> {
    for (name, v) in [("Aref", a_ref), ("Anew", a_new)] {
        if !(v.is_finite() && v > 0.0) {
            return Err(AppError::validation(format!(
                "{name} must be finite and > 0, got {v}."
            )));
        }
    }
    Ok(())
}

fn gamma_range(gammas: &[f64]) -> String {
    let lo = gammas.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = gammas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() {
        return "n/a".to_string();
    }
    if (hi - lo).abs() < 1e-12 {
        format!("{lo:.3}")
    } else {
        format!("{lo:.3}..{hi:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> FosterNetwork {
        FosterNetwork::from_r_tau(&[0.2, 0.3, 0.5], &[1e-3, 1e-1, 10.0]).unwrap()
    }

    fn dataset() -> Dataset {
        let times = crate::data::log_times(1e-4, 100.0, 30).unwrap();
        let z = crate::models::evaluate(&reference(), &times).unwrap();
        Dataset::from_columns(&times, &z).unwrap()
    }

    #[test]
    fn equal_areas_leave_the_network_unchanged() {
        let ds = dataset();
        let opts = PredictOptions {
            fit: FitOptions::with_order(3),
            network: None,
        };
        for spec in [ScalingSpec::fixed(0.7), ScalingSpec::blended()] {
            let p = predict(&ds, 2.0, 2.0, &spec, &opts).unwrap();
            assert_eq!(p.scale, 1.0);
            let fit = fit_foster(&ds, &opts.fit).unwrap();
            assert_eq!(p.series, fit.fitted);
        }
    }

    #[test]
    fn fixed_unit_gamma_halves_resistance_for_double_area() {
        let opts = PredictOptions {
            network: Some(reference()),
            ..PredictOptions::default()
        };
        let p = predict(&dataset(), 1.0, 2.0, &ScalingSpec::fixed(1.0), &opts).unwrap();
        assert_relative_eq!(p.scale, 0.5, max_relative = 1e-12);
        assert!(p.warnings.is_empty());
        assert!(p.summary.starts_with("fixed area scale applied: 0.500000 (Aref=1, Anew=2, N=3"));
        let diag = p.reference_diagnostics.unwrap();
        assert!(diag.rms_error_pct < 1e-9);
        let scaled = p.scaled.unwrap();
        for (a, b) in reference().taus().iter().zip(scaled.taus().iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn blended_gamma_is_monotone_decreasing() {
        let taus = [1e-5, 1e-4, 1e-3, 1e-2, 1e-1, 1.0, 10.0];
        let g = blended_gammas(&taus, None, None);
        for pair in g.windows(2) {
            assert!(pair[0] > pair[1]);
        }
        assert!(g[0] > 0.95);
        assert!(g[6] < 0.05);
        assert_relative_eq!(g[3], 0.5, max_relative = 1e-12);
    }

    #[test]
    fn blended_gamma_honours_centre_and_width() {
        let g = blended_gammas(&[1.0], Some(1.0), Some(2.0));
        assert_relative_eq!(g[0], 0.5);
        let g = blended_gammas(&[10.0], Some(1.0), Some(1.0));
        assert_relative_eq!(g[0], 1.0 / (1.0 + 1f64.exp()), max_relative = 1e-12);
    }

    #[test]
    fn blended_scaling_shrinks_fast_stages_more() {
        let scaled = scale_network(&reference(), 1.0, 4.0, &ScalingSpec::blended()).unwrap();
        assert_eq!(scaled.gammas.len(), 3);
        assert!(!scaled.clipped);
        let before = reference().resistances();
        let after = scaled.network.resistances();
        let ratio_fast = after[0] / before[0];
        let ratio_slow = after[2] / before[2];
        assert!(ratio_fast < ratio_slow);
    }

    #[test]
    fn extreme_area_ratio_clips_and_warns() {
        let opts = PredictOptions {
            network: Some(reference()),
            ..PredictOptions::default()
        };
        let p = predict(&dataset(), 1e-200, 1e200, &ScalingSpec::fixed(1.0), &opts).unwrap();
        assert!(p.warnings.contains(&NumericalWarning::ClippedParameters));
        assert!(p.warning().is_some());
        for st in p.scaled.unwrap().stages() {
            assert!(st.r.is_finite() && st.r > 0.0);
            assert!(st.c.is_finite() && st.c > 0.0);
        }
        assert!(p.series.iter().all(|m| m.zth.is_finite()));
    }

    #[test]
    fn short_dataset_falls_back_to_inverse_area() {
        let ds = Dataset::from_columns(&[0.1, 1.0], &[0.4, 0.8]).unwrap();
        let p = predict(&ds, 1.0, 4.0, &ScalingSpec::blended(), &PredictOptions::default()).unwrap();
        assert_eq!(p.scale, 0.25);
        assert_eq!(p.series[1], Measurement::new(1.0, 0.2));
        assert_eq!(p.warnings, vec![NumericalWarning::FallbackScaling]);
        assert_eq!(p.summary, "simple area scale applied: 0.250000");
        assert_eq!(p.warning().as_deref(), Some("used fallback pure-inverse-area scaling"));
        assert!(p.scaled.is_none());
    }

    #[test]
    fn rejects_bad_areas_and_empty_data() {
        let ds = dataset();
        let opts = PredictOptions::default();
        let spec = ScalingSpec::blended();
        assert!(predict(&ds, 0.0, 1.0, &spec, &opts).unwrap_err().is_validation());
        assert!(predict(&ds, 1.0, f64::NAN, &spec, &opts).unwrap_err().is_validation());
        let empty = Dataset::new(Vec::new()).unwrap();
        assert!(predict(&empty, 1.0, 1.0, &spec, &opts).unwrap_err().is_validation());
    }

    #[test]
    fn fixed_mode_requires_gamma() {
        let spec = ScalingSpec {
            mode: ScalingMode::Fixed,
            ..ScalingSpec::default()
        };
        let err = predict(&dataset(), 1.0, 2.0, &spec, &PredictOptions::default()).unwrap_err();
        assert!(err.is_validation());
    }
}

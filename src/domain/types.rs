//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting / conversion / prediction
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons
//!
//! Every network type is an immutable value: constructors validate, and every
//! transform (conversion, scaling, appending a stage) builds a new instance.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Positive floor substituted for non-physical (≤ 0, NaN, ±inf) element values.
pub const PARAM_FLOOR: f64 = 1e-12;

/// Smallest supported network order.
pub const MIN_ORDER: usize = 1;

/// Largest supported network order.
pub const MAX_ORDER: usize = 10;

/// Minimum number of samples needed to attempt a fit.
pub const MIN_FIT_POINTS: usize = 3;

/// Order used when a caller asks for a fit without naming one.
pub const DEFAULT_ORDER: usize = 4;

/// A single thermal-impedance sample.
///
/// Field names on the wire follow the surrounding application (`tp`, `Zth`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Elapsed time after the power step (seconds, > 0).
    #[serde(rename = "tp")]
    pub t: f64,
    /// Thermal impedance (K/W, ≥ 0).
    #[serde(rename = "Zth")]
    pub zth: f64,
}

impl Measurement {
    pub fn new(t: f64, zth: f64) -> Self {
        Self { t, zth }
    }
}

/// A validated, time-ordered thermal transient.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    points: Vec<Measurement>,
}

impl Dataset {
    /// Validate and wrap a sequence of samples.
    ///
    /// Requires finite values, `t > 0`, `Zth >= 0` and strictly increasing `t`.
    /// Length requirements belong to the individual operations.
    pub fn new(points: Vec<Measurement>) -> Result<Self, AppError> {
        for (i, p) in points.iter().enumerate() {
            if !(p.t.is_finite() && p.t > 0.0) {
                return Err(AppError::validation(format!(
                    "Sample {i}: time must be finite and > 0, got {}.",
                    p.t
                )));
            }
            if !(p.zth.is_finite() && p.zth >= 0.0) {
                return Err(AppError::validation(format!(
                    "Sample {i}: Zth must be finite and >= 0, got {}.",
                    p.zth
                )));
            }
            if i > 0 && p.t <= points[i - 1].t {
                return Err(AppError::validation(format!(
                    "Sample {i}: times must be strictly increasing ({} after {}).",
                    p.t,
                    points[i - 1].t
                )));
            }
        }
        Ok(Self { points })
    }

    /// Build from parallel time/value slices.
    pub fn from_columns(times: &[f64], zth: &[f64]) -> Result<Self, AppError> {
        if times.len() != zth.len() {
            return Err(AppError::validation(format!(
                "Time and Zth columns differ in length ({} vs {}).",
                times.len(),
                zth.len()
            )));
        }
        let points = times
            .iter()
            .zip(zth.iter())
            .map(|(&t, &z)| Measurement::new(t, z))
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[Measurement] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.zth).collect()
    }

    /// The longest-time sample, used as the steady-state proxy.
    pub fn last(&self) -> Option<Measurement> {
        self.points.last().copied()
    }
}

/// One parallel RC stage of a Foster network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FosterStage {
    pub r: f64,
    pub c: f64,
}

impl FosterStage {
    pub fn new(r: f64, c: f64) -> Self {
        Self { r, c }
    }

    pub fn tau(&self) -> f64 {
        self.r * self.c
    }
}

/// Sum-of-exponentials network: `Zth(t) = Σ Rᵢ·(1 − e^(−t/τᵢ))`.
///
/// Stages are kept sorted by ascending time constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FosterNetwork {
    stages: Vec<FosterStage>,
}

impl FosterNetwork {
    pub fn new(mut stages: Vec<FosterStage>) -> Result<Self, AppError> {
        check_order(stages.len(), "Foster")?;
        for (i, s) in stages.iter().enumerate() {
            check_element(i, "R", s.r, "Foster")?;
            check_element(i, "C", s.c, "Foster")?;
            check_element(i, "tau", s.tau(), "Foster")?;
        }
        stages.sort_by(|a, b| a.tau().total_cmp(&b.tau()));
        Ok(Self { stages })
    }

    /// Build from parallel `R` / `C` arrays.
    pub fn from_rc(r: &[f64], c: &[f64]) -> Result<Self, AppError> {
        if r.len() != c.len() {
            return Err(AppError::validation(format!(
                "R and C must have the same length ({} vs {}).",
                r.len(),
                c.len()
            )));
        }
        Self::new(r.iter().zip(c.iter()).map(|(&r, &c)| FosterStage::new(r, c)).collect())
    }

    /// Build from parallel `R` / `τ` arrays.
    pub fn from_r_tau(r: &[f64], tau: &[f64]) -> Result<Self, AppError> {
        if r.len() != tau.len() {
            return Err(AppError::validation(format!(
                "R and tau must have the same length ({} vs {}).",
                r.len(),
                tau.len()
            )));
        }
        let stages = r
            .iter()
            .zip(tau.iter())
            .map(|(&r, &tau)| FosterStage::new(r, tau / r))
            .collect();
        Self::new(stages)
    }

    pub fn stages(&self) -> &[FosterStage] {
        &self.stages
    }

    pub fn order(&self) -> usize {
        self.stages.len()
    }

    pub fn resistances(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.r).collect()
    }

    pub fn capacitances(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.c).collect()
    }

    pub fn taus(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.tau()).collect()
    }

    /// Steady-state thermal resistance `Σ Rᵢ`.
    pub fn total_resistance(&self) -> f64 {
        self.stages.iter().map(|s| s.r).sum()
    }
}

/// One ladder element pair of a Cauer network.
///
/// `c` is the shunt capacitance at the stage's node, `r` the series resistance
/// from that node towards the next stage (the last one goes to ambient).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CauerStage {
    pub r: f64,
    pub c: f64,
}

impl CauerStage {
    pub fn new(r: f64, c: f64) -> Self {
        Self { r, c }
    }
}

/// Ladder network; stage 0 is nearest the driving point (junction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauerNetwork {
    stages: Vec<CauerStage>,
}

impl CauerNetwork {
    pub fn new(stages: Vec<CauerStage>) -> Result<Self, AppError> {
        check_order(stages.len(), "Cauer")?;
        for (i, s) in stages.iter().enumerate() {
            check_element(i, "R", s.r, "Cauer")?;
            check_element(i, "C", s.c, "Cauer")?;
        }
        Ok(Self { stages })
    }

    pub fn from_rc(r: &[f64], c: &[f64]) -> Result<Self, AppError> {
        if r.len() != c.len() {
            return Err(AppError::validation(format!(
                "R and C must have the same length ({} vs {}).",
                r.len(),
                c.len()
            )));
        }
        Self::new(r.iter().zip(c.iter()).map(|(&r, &c)| CauerStage::new(r, c)).collect())
    }

    /// Append a stage at the ambient end (e.g. a heatsink), returning a new ladder.
    pub fn with_stage(&self, stage: CauerStage) -> Result<Self, AppError> {
        let mut stages = self.stages.clone();
        stages.push(stage);
        Self::new(stages)
    }

    pub fn stages(&self) -> &[CauerStage] {
        &self.stages
    }

    pub fn order(&self) -> usize {
        self.stages.len()
    }

    pub fn resistances(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.r).collect()
    }

    pub fn capacitances(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.c).collect()
    }

    pub fn total_resistance(&self) -> f64 {
        self.stages.iter().map(|s| s.r).sum()
    }
}

fn check_order(n: usize, kind: &str) -> Result<(), AppError> {
    if !(MIN_ORDER..=MAX_ORDER).contains(&n) {
        return Err(AppError::validation(format!(
            "{kind} network order must be in [{MIN_ORDER}, {MAX_ORDER}], got {n}."
        )));
    }
    Ok(())
}

fn check_element(i: usize, name: &str, v: f64, kind: &str) -> Result<(), AppError> {
    if !(v.is_finite() && v > 0.0) {
        return Err(AppError::validation(format!(
            "{kind} stage {i}: {name} must be finite and > 0, got {v}."
        )));
    }
    Ok(())
}

/// Replace a non-physical value with [`PARAM_FLOOR`].
///
/// Returns the substituted value and whether clipping happened.
pub fn clip_positive(v: f64) -> (f64, bool) {
    if v.is_finite() && v > 0.0 {
        (v, false)
    } else {
        (PARAM_FLOOR, true)
    }
}

/// Non-fatal numerical conditions that accompany a usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericalWarning {
    /// Fewer samples than `2N + 1`.
    Underdetermined,
    /// At least one fitted R or τ was clipped to the floor.
    ClippedParameters,
    /// The solver hit its iteration cap.
    NotConverged,
    /// Cauer synthesis produced (or would produce) non-physical elements.
    UnstableConversion,
    /// The predictor could not fit and scaled raw samples instead.
    FallbackScaling,
}

impl NumericalWarning {
    pub fn message(self) -> &'static str {
        match self {
            NumericalWarning::Underdetermined => "underdetermined fit",
            NumericalWarning::ClippedParameters => "non-physical parameters clipped",
            NumericalWarning::NotConverged => "fit did not fully converge",
            NumericalWarning::UnstableConversion => {
                "numerically unstable conversion — near-degenerate time constants"
            }
            NumericalWarning::FallbackScaling => "used fallback pure-inverse-area scaling",
        }
    }
}

impl std::fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Join warnings into the single wire-level `warning` string.
pub fn join_warnings(warnings: &[NumericalWarning]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }
    Some(
        warnings
            .iter()
            .map(|w| w.message())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Fit quality metrics attached to a fit result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub rms_error_pct: f64,
    pub dc_error_pct: f64,
    pub warnings: Vec<NumericalWarning>,
}

impl FitDiagnostics {
    pub fn warning(&self) -> Option<String> {
        join_warnings(&self.warnings)
    }
}

/// How observations are weighted in the fit objective.
///
/// Thermal transients span many decades of time; with uniform weights the
/// late-time samples (largest Zth) dominate the squared error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Plain least squares.
    #[default]
    Uniform,
    /// Squared relative error: `w = 1 / max(Zth, 1e-3·max Zth)²`.
    Relative,
}

/// Gamma policy for area scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMode {
    /// One exponent for every stage.
    Fixed,
    /// Per-stage exponent from a logistic curve in `log10 τ`.
    #[default]
    Blended,
}

/// Area-scaling configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingSpec {
    pub mode: ScalingMode,
    /// Required for `fixed`; must lie in `(0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma_fixed: Option<f64>,
    /// Centre of the blended curve (seconds). Defaults to `sqrt(min τ · max τ)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau_mid: Option<f64>,
    /// Transition width of the blended curve in decades. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_decades: Option<f64>,
}

impl ScalingSpec {
    pub fn fixed(gamma: f64) -> Self {
        Self {
            mode: ScalingMode::Fixed,
            gamma_fixed: Some(gamma),
            tau_mid: None,
            width_decades: None,
        }
    }

    pub fn blended() -> Self {
        Self {
            mode: ScalingMode::Blended,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.mode == ScalingMode::Fixed {
            match self.gamma_fixed {
                Some(g) if g.is_finite() && g > 0.0 && g <= 1.0 => {}
                Some(g) => {
                    return Err(AppError::validation(format!(
                        "gammaFixed must lie in (0, 1], got {g}."
                    )));
                }
                None => {
                    return Err(AppError::validation(
                        "Fixed scaling mode requires gammaFixed.",
                    ));
                }
            }
        }
        if let Some(mid) = self.tau_mid {
            if !(mid.is_finite() && mid > 0.0) {
                return Err(AppError::validation(format!("tauMid must be finite and > 0, got {mid}.")));
            }
        }
        if let Some(w) = self.width_decades {
            if !(w.is_finite() && w > 0.0) {
                return Err(AppError::validation(format!(
                    "widthDecades must be finite and > 0, got {w}."
                )));
            }
        }
        Ok(())
    }
}

/// One sample of a piecewise-constant power profile.
///
/// Power `p` (W) is applied from `t` until the next sample's time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub t: f64,
    pub p: f64,
}

impl PowerSample {
    pub fn new(t: f64, p: f64) -> Self {
        Self { t, p }
    }
}

/// Validated power profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerProfile {
    samples: Vec<PowerSample>,
}

impl PowerProfile {
    pub fn new(samples: Vec<PowerSample>) -> Result<Self, AppError> {
        if samples.is_empty() {
            return Err(AppError::validation("Power profile is empty."));
        }
        for (i, s) in samples.iter().enumerate() {
            if !(s.t.is_finite() && s.t >= 0.0) {
                return Err(AppError::validation(format!(
                    "Power sample {i}: time must be finite and >= 0, got {}.",
                    s.t
                )));
            }
            if !s.p.is_finite() {
                return Err(AppError::validation(format!(
                    "Power sample {i}: power must be finite, got {}.",
                    s.p
                )));
            }
            if i > 0 && s.t <= samples[i - 1].t {
                return Err(AppError::validation(format!(
                    "Power sample {i}: times must be strictly increasing."
                )));
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_rejects_unsorted_times() {
        let err = Dataset::from_columns(&[1.0, 0.5], &[0.1, 0.2]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn dataset_rejects_negative_zth() {
        assert!(Dataset::from_columns(&[1.0, 2.0], &[0.1, -0.2]).is_err());
    }

    #[test]
    fn foster_network_sorts_by_tau() {
        let net = FosterNetwork::from_rc(&[1.0, 2.0], &[10.0, 0.1]).unwrap();
        let taus = net.taus();
        assert!(taus[0] < taus[1]);
        assert!((net.total_resistance() - 3.0).abs() < 1e-15);
    }

    #[test]
    fn foster_network_enforces_order_bounds() {
        assert!(FosterNetwork::new(Vec::new()).is_err());
        let stages = vec![FosterStage::new(1.0, 1.0); MAX_ORDER + 1];
        assert!(FosterNetwork::new(stages).is_err());
    }

    #[test]
    fn foster_network_rejects_non_positive_elements() {
        assert!(FosterNetwork::from_rc(&[1.0, 0.0], &[1.0, 1.0]).is_err());
        assert!(FosterNetwork::from_rc(&[1.0, f64::NAN], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn warnings_join_with_semicolons() {
        let joined = join_warnings(&[
            NumericalWarning::Underdetermined,
            NumericalWarning::NotConverged,
        ]);
        assert_eq!(
            joined.as_deref(),
            Some("underdetermined fit; fit did not fully converge")
        );
        assert_eq!(join_warnings(&[]), None);
    }

    #[test]
    fn scaling_spec_validates_gamma_range() {
        assert!(ScalingSpec::fixed(1.0).validate().is_ok());
        assert!(ScalingSpec::fixed(0.0).validate().is_err());
        assert!(ScalingSpec::fixed(1.5).validate().is_err());
        let missing = ScalingSpec {
            mode: ScalingMode::Fixed,
            ..ScalingSpec::default()
        };
        assert!(missing.validate().is_err());
        assert!(ScalingSpec::blended().validate().is_ok());
    }

    #[test]
    fn scaling_spec_uses_wire_field_names() {
        let spec: ScalingSpec =
            serde_json::from_str(r#"{"mode":"fixed","gammaFixed":0.8}"#).unwrap();
        assert_eq!(spec.mode, ScalingMode::Fixed);
        assert_eq!(spec.gamma_fixed, Some(0.8));
    }

    #[test]
    fn cauer_with_stage_appends_at_ambient_end() {
        let ladder = CauerNetwork::from_rc(&[1.0], &[2.0]).unwrap();
        let extended = ladder.with_stage(CauerStage::new(0.5, 100.0)).unwrap();
        assert_eq!(extended.order(), 2);
        assert_eq!(extended.stages()[1], CauerStage::new(0.5, 100.0));
        assert_eq!(ladder.order(), 1);
    }
}

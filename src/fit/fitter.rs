//! Exponential-sum (Foster) fitting.
//!
//! Given:
//! - times `t_k` and measured impedances `z_k`
//! - observation weights `w_k`
//! - the requested order `N`
//!
//! we minimize `Σ w_k (Σᵢ Rᵢ (1 − e^(−t_k/τᵢ)) − z_k)²`.
//!
//! The model is linear in `R` for fixed `τ`, so the solver only moves
//! `θᵢ = ln τᵢ` and recomputes the optimal `R >= 0` by weighted non-negative
//! least squares at every evaluation (variable projection). The solver
//! therefore only ever sees physical networks. Working in `ln τ` keeps every
//! time constant positive and makes steps scale-free across decades.
//!
//! Because `R` is recomputed from `τ`, the even split `Rᵢ = Zth_last / N` is
//! not a starting point. It is only returned if the final projection fails.
//! Stages the projection drives to `R = 0` are clipped to the parameter floor
//! and flagged.
//!
//! Seeding is deterministic: the geometric guess is always a candidate, and
//! for low orders a log grid of ordered τ tuples is evaluated in parallel and
//! the lowest-SSE tuple (ties broken by grid index) starts the solver.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::domain::{
    DEFAULT_ORDER, Dataset, FitDiagnostics, FosterNetwork, MAX_ORDER, MIN_FIT_POINTS, MIN_ORDER,
    Measurement, NumericalWarning, Weighting, clip_positive,
};
use crate::error::AppError;
use crate::fit::diagnostics::diagnostics_from_series;
use crate::fit::solver::{LmOptions, minimize};
use crate::fit::tau_grid::{geometric_taus, tau_grid};
use crate::math::solve_nnls;
use crate::models::{StepResponse, fill_design_row};

/// How far (factor) τ may wander outside the observed time range.
const TAU_RANGE_FACTOR: f64 = 1e3;

/// Relative weight floor for `Weighting::Relative`.
const RELATIVE_WEIGHT_FLOOR: f64 = 1e-3;

/// Fitting options.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Number of Foster stages, `1..=10`.
    pub order: usize,
    /// Objective weighting.
    pub weighting: Weighting,
    /// Solver iteration cap.
    pub max_iterations: usize,
    /// Relative cost change that counts as converged.
    pub tolerance: f64,
    /// Grid points per τ dimension for seeding.
    pub seed_steps: usize,
    /// Highest order for which the seed grid is searched.
    ///
    /// The tuple count grows combinatorially, so higher orders start from the
    /// geometric guess only.
    pub seed_max_order: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            weighting: Weighting::Uniform,
            max_iterations: 1000,
            tolerance: 1e-10,
            seed_steps: 12,
            seed_max_order: 3,
        }
    }
}

impl FitOptions {
    pub fn with_order(order: usize) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }
}

/// Output of a Foster fit.
#[derive(Debug, Clone)]
pub struct FosterFit {
    pub network: FosterNetwork,
    pub diagnostics: FitDiagnostics,
    /// Model evaluated at the dataset's own times.
    pub fitted: Vec<Measurement>,
    /// Solver iterations used.
    pub iterations: usize,
}

/// Weighted projection problem shared by seeding and the solver.
struct Projection {
    times: Vec<f64>,
    /// `sqrt(w_k)`.
    sw: Vec<f64>,
    /// `sqrt(w_k) · z_k`.
    zw: DVector<f64>,
}

impl Projection {
    fn new(dataset: &Dataset, weighting: Weighting) -> Self {
        let times = dataset.times();
        let z = dataset.values();
        let z_max = z.iter().copied().fold(0.0_f64, f64::max);
        let sw: Vec<f64> = match weighting {
            Weighting::Uniform => vec![1.0; z.len()],
            Weighting::Relative => {
                let floor = (RELATIVE_WEIGHT_FLOOR * z_max).max(f64::MIN_POSITIVE);
                z.iter().map(|&zk| 1.0 / zk.max(floor)).collect()
            }
        };
        let zw = DVector::from_iterator(z.len(), z.iter().zip(sw.iter()).map(|(zk, s)| zk * s));
        Self { times, sw, zw }
    }

    fn design(&self, taus: &[f64]) -> DMatrix<f64> {
        let n = self.times.len();
        let mut x = DMatrix::<f64>::zeros(n, taus.len());
        let mut row = vec![0.0; taus.len()];
        for (k, &t) in self.times.iter().enumerate() {
            fill_design_row(t, taus, &mut row);
            for (j, v) in row.iter().enumerate() {
                x[(k, j)] = v * self.sw[k];
            }
        }
        x
    }

    /// Optimal non-negative `R` for the given τ and the weighted residual vector.
    fn solve(&self, taus: &[f64]) -> Option<(DVector<f64>, DVector<f64>)> {
        if taus.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            return None;
        }
        let x = self.design(taus);
        let r = solve_nnls(&x, &self.zw)?;
        let residual = &x * &r - &self.zw;
        if residual.iter().all(|v| v.is_finite()) {
            Some((r, residual))
        } else {
            None
        }
    }

    fn residual_log_tau(&self, theta: &[f64]) -> Option<DVector<f64>> {
        let taus: Vec<f64> = theta.iter().map(|v| v.exp()).collect();
        self.solve(&taus).map(|(_, res)| res)
    }
}

/// Fit an N-stage Foster network to a measured transient.
///
/// Fatal problems (too few samples, order out of range, zero steady state)
/// are `ValidationError`s. Everything else yields a usable network with
/// warnings attached to the diagnostics.
pub fn fit_foster(dataset: &Dataset, opts: &FitOptions) -> Result<FosterFit, AppError> {
    validate(dataset, opts)?;

    let n = opts.order;
    let mut warnings = Vec::new();
    if dataset.len() < 2 * n + 1 {
        warnings.push(NumericalWarning::Underdetermined);
    }

    let times = dataset.times();
    let t_min = times[0];
    let t_max = times[times.len() - 1];
    let z_last = dataset.last().map(|p| p.zth).unwrap_or(0.0);

    let problem = Projection::new(dataset, opts.weighting);

    let seed = select_seed(&problem, t_min, t_max, opts)?;
    let theta0: Vec<f64> = seed.iter().map(|t| t.ln()).collect();
    let lower = vec![(t_min / TAU_RANGE_FACTOR).ln(); n];
    let upper = vec![(t_max * TAU_RANGE_FACTOR).ln(); n];

    let scale: f64 = problem.zw.norm_squared();
    let lm = LmOptions {
        max_iterations: opts.max_iterations,
        rel_tolerance: opts.tolerance,
        abs_cost: 1e-28 * scale,
    };
    let outcome = minimize(|th| problem.residual_log_tau(th), &theta0, &lower, &upper, &lm);
    tracing::debug!(
        order = n,
        iterations = outcome.iterations,
        cost = outcome.cost,
        converged = outcome.converged,
        "foster fit finished"
    );
    if !outcome.converged {
        warnings.push(NumericalWarning::NotConverged);
    }

    let taus: Vec<f64> = outcome.params.iter().map(|v| v.exp()).collect();
    let r: Vec<f64> = match problem.solve(&taus) {
        Some((r, _)) => r.iter().copied().collect(),
        None => {
            // Even split keeps the result plottable.
            if !warnings.contains(&NumericalWarning::NotConverged) {
                warnings.push(NumericalWarning::NotConverged);
            }
            vec![z_last / n as f64; n]
        }
    };

    let mut clipped = false;
    let mut r_out = Vec::with_capacity(n);
    let mut tau_out = Vec::with_capacity(n);
    for (&ri, &ti) in r.iter().zip(taus.iter()) {
        let (ri, cr) = clip_positive(ri);
        let (ti, ct) = clip_positive(ti);
        clipped |= cr || ct;
        r_out.push(ri);
        tau_out.push(ti);
    }
    if clipped {
        warnings.push(NumericalWarning::ClippedParameters);
    }

    let network = FosterNetwork::from_r_tau(&r_out, &tau_out)?;
    let values = network.step_response(&times)?;
    let diagnostics =
        diagnostics_from_series(network.total_resistance(), dataset, &values, warnings)?;
    if let Some(w) = diagnostics.warning() {
        tracing::warn!(order = n, warning = %w, "foster fit returned with warnings");
    }

    let fitted = times
        .iter()
        .zip(values)
        .map(|(&t, z)| Measurement::new(t, z))
        .collect();

    Ok(FosterFit {
        network,
        diagnostics,
        fitted,
        iterations: outcome.iterations,
    })
}

fn validate(dataset: &Dataset, opts: &FitOptions) -> Result<(), AppError> {
    if dataset.len() < MIN_FIT_POINTS {
        return Err(AppError::validation(format!(
            "Need at least {MIN_FIT_POINTS} samples to fit, got {}.",
            dataset.len()
        )));
    }
    if !(MIN_ORDER..=MAX_ORDER).contains(&opts.order) {
        return Err(AppError::validation(format!(
            "Order N must be in [{MIN_ORDER}, {MAX_ORDER}], got {}.",
            opts.order
        )));
    }
    if !(opts.tolerance.is_finite() && opts.tolerance >= 0.0) {
        return Err(AppError::validation("Fit tolerance must be finite and >= 0."));
    }
    match dataset.last() {
        Some(p) if p.zth > 0.0 => Ok(()),
        _ => Err(AppError::validation(
            "Steady-state Zth (last sample) must be > 0 to fit.",
        )),
    }
}

/// Pick the starting τ vector: geometric guess vs. grid tuples, lowest SSE wins.
fn select_seed(
    problem: &Projection,
    t_min: f64,
    t_max: f64,
    opts: &FitOptions,
) -> Result<Vec<f64>, AppError> {
    let mut candidates = vec![geometric_taus(t_min, t_max, opts.order)?];
    if opts.order <= opts.seed_max_order && opts.seed_steps >= opts.order.max(2) {
        candidates.extend(tau_grid(
            t_min / 2.0,
            t_max * 2.0,
            opts.seed_steps,
            opts.order,
            1.5,
        )?);
    }

    let scored: Vec<(usize, f64)> = candidates
        .par_iter()
        .enumerate()
        .filter_map(|(idx, taus)| {
            problem
                .solve(taus)
                .map(|(_, res)| (idx, res.norm_squared()))
                .filter(|(_, sse)| sse.is_finite())
        })
        .collect();

    // Deterministic selection: minimum SSE, ties broken by candidate index.
    let best = scored
        .iter()
        .copied()
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    Ok(candidates.swap_remove(best))
}

//! Shared pipeline logic behind the CLI subcommands.
//!
//! Each run takes an explicit config (built from CLI args in `app`) and
//! returns every computed output, so presentation stays in `app`:
//! CSV ingest -> fit -> {convert, predict, simulate} -> outputs

use std::path::PathBuf;

use crate::convert::{CauerConversion, foster_to_cauer};
use crate::data::{log_times, synthesize};
use crate::domain::{
    CauerNetwork, CauerStage, Dataset, FosterNetwork, NumericalWarning, ScalingSpec,
};
use crate::error::AppError;
use crate::fit::{FitOptions, FosterFit, fit_foster};
use crate::io::ingest::{IngestedData, load_power_csv, load_zth_csv};
use crate::io::network::{NetworkKind, read_network_json};
use crate::models::FosterDecomposition;
use crate::power::{DutyCycle, duty_cycle, temperature};
use crate::predict::{PredictOptions, Prediction, predict};

/// Inputs of a fit run.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: PathBuf,
    pub fit: FitOptions,
}

/// All computed outputs of a single `zth fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub ingest: IngestedData,
    pub fit: FosterFit,
}

pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    let ingest = load_zth_csv(&config.input)?;
    let fit = fit_foster(&ingest.dataset, &config.fit)?;
    Ok(FitRun { ingest, fit })
}

/// Where a conversion gets its Foster network from.
#[derive(Debug, Clone)]
pub enum NetworkSource {
    File(PathBuf),
    Fit(FitConfig),
}

#[derive(Debug, Clone)]
pub struct CauerConfig {
    pub source: NetworkSource,
    pub heatsink: Option<CauerStage>,
}

#[derive(Debug, Clone)]
pub struct CauerRun {
    pub foster: FosterNetwork,
    /// Present when the network was fitted in this run.
    pub fitted: Option<FitRun>,
    pub conversion: CauerConversion,
    /// The converted ladder, extended by the heatsink stage when one is given.
    pub ladder: CauerNetwork,
}

pub fn run_cauer(config: &CauerConfig) -> Result<CauerRun, AppError> {
    let (decomposition, fitted) = match &config.source {
        NetworkSource::File(path) => (load_foster(path)?, None),
        NetworkSource::Fit(fit_config) => {
            let run = run_fit(fit_config)?;
            let decomposition = FosterDecomposition {
                network: run.fit.network.clone(),
                warnings: Vec::new(),
            };
            (decomposition, Some(run))
        }
    };
    let foster = decomposition.network;
    let mut conversion = foster_to_cauer(&foster)?;
    merge_warnings(&mut conversion.warnings, &decomposition.warnings);
    let ladder = match config.heatsink {
        Some(stage) => conversion.network.with_stage(stage)?,
        None => conversion.network.clone(),
    };
    Ok(CauerRun {
        foster,
        fitted,
        conversion,
        ladder,
    })
}

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub input: PathBuf,
    pub fit: FitOptions,
    pub a_ref: f64,
    pub a_new: f64,
    pub spec: ScalingSpec,
    pub network: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PredictRun {
    pub ingest: IngestedData,
    pub prediction: Prediction,
}

pub fn run_predict(config: &PredictConfig) -> Result<PredictRun, AppError> {
    let ingest = load_zth_csv(&config.input)?;
    let decomposition = config.network.as_deref().map(load_foster).transpose()?;
    let source_warnings = decomposition
        .as_ref()
        .map(|d| d.warnings.clone())
        .unwrap_or_default();
    let opts = PredictOptions {
        fit: config.fit.clone(),
        network: decomposition.map(|d| d.network),
    };
    let mut prediction = predict(
        &ingest.dataset,
        config.a_ref,
        config.a_new,
        &config.spec,
        &opts,
    )?;
    merge_warnings(&mut prediction.warnings, &source_warnings);
    Ok(PredictRun { ingest, prediction })
}

#[derive(Debug, Clone)]
pub struct TempConfig {
    pub network: PathBuf,
    pub power: PathBuf,
    pub ambient: f64,
    pub points: usize,
    pub t_end: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TempRun {
    pub times: Vec<f64>,
    pub temperatures: Vec<f64>,
    pub duty: DutyCycle,
}

pub fn run_temperature(config: &TempConfig) -> Result<TempRun, AppError> {
    let file = read_network_json(&config.network)?;
    let profile = load_power_csv(&config.power)?;
    // Modes of either network kind set the evaluation window.
    let foster = file.to_foster()?.network;
    let max_tau = foster.taus().into_iter().fold(0.0_f64, f64::max);
    let min_tau = foster.taus().into_iter().fold(f64::INFINITY, f64::min);

    let samples = profile.samples();
    let t_last = samples[samples.len() - 1].t;
    let t_end = config.t_end.unwrap_or(t_last + 5.0 * max_tau);
    let t_start = (min_tau / 10.0).min(t_end / 10.0);
    let mut times = log_times(t_start, t_end, config.points)?;
    times.insert(0, 0.0);

    let temperatures = match file.kind {
        NetworkKind::Foster => temperature(&foster, &profile, &times, config.ambient)?,
        NetworkKind::Cauer => temperature(&file.to_cauer()?, &profile, &times, config.ambient)?,
    };
    Ok(TempRun {
        times,
        temperatures,
        duty: duty_cycle(&profile),
    })
}

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub r: Vec<f64>,
    pub tau: Vec<f64>,
    pub t_min: f64,
    pub t_max: f64,
    pub points: usize,
    pub noise: f64,
    pub seed: u64,
}

pub fn run_synth(config: &SynthConfig) -> Result<Dataset, AppError> {
    let network = FosterNetwork::from_r_tau(&config.r, &config.tau)?;
    let times = log_times(config.t_min, config.t_max, config.points)?;
    synthesize(&network, &times, config.noise, config.seed)
}

fn load_foster(path: &std::path::Path) -> Result<FosterDecomposition, AppError> {
    let file = read_network_json(path)?;
    if file.kind != NetworkKind::Foster {
        tracing::info!(path = %path.display(), "decomposing Cauer ladder into Foster modes");
    }
    file.to_foster()
}

fn merge_warnings(into: &mut Vec<NumericalWarning>, extra: &[NumericalWarning]) {
    for w in extra {
        if !into.contains(w) {
            into.push(*w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_warnings_stay_unique() {
        let mut into = vec![NumericalWarning::UnstableConversion];
        merge_warnings(
            &mut into,
            &[NumericalWarning::ClippedParameters, NumericalWarning::UnstableConversion],
        );
        assert_eq!(
            into,
            vec![NumericalWarning::UnstableConversion, NumericalWarning::ClippedParameters]
        );
    }
}

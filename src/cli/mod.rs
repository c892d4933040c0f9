//! Command-line parsing for the `zth` thermal-network tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! numerical code. Every flag has a default; `app` turns parsed args into the
//! explicit option structs the library operations take.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::api::Endpoint;
use crate::domain::{DEFAULT_ORDER, ScalingMode, Weighting};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "zth", version, about = "Thermal RC network fitting, conversion and prediction")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a Foster network to a measured Zth(t) CSV.
    Fit(FitArgs),
    /// Convert a Foster network (fitted or from JSON) into a Cauer ladder.
    Cauer(CauerArgs),
    /// Predict a sibling device's transient by die-area scaling.
    Predict(PredictArgs),
    /// Temperature response of a saved network to a power profile CSV.
    Temp(TempArgs),
    /// Generate a synthetic transient from known R / tau values.
    Synth(SynthArgs),
    /// Answer one JSON request (fit_foster, foster_to_cauer, predict).
    Api(ApiArgs),
}

/// Transient input and fit options shared by several subcommands.
#[derive(Debug, Args, Clone)]
pub struct FitInputArgs {
    /// Two-column CSV: time [s], Zth [K/W]. A header row is optional.
    #[arg(short = 'f', long = "file", value_name = "CSV")]
    pub input: PathBuf,

    /// Number of Foster stages (1..=10).
    #[arg(short = 'n', long, default_value_t = DEFAULT_ORDER)]
    pub order: usize,

    /// Objective weighting.
    #[arg(long, value_enum, default_value_t = Weighting::Uniform)]
    pub weighting: Weighting,

    /// Solver iteration cap.
    #[arg(long, default_value_t = 1000)]
    pub max_iterations: usize,
}

/// Plot size options.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: FitInputArgs,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Export the stage table (R,C) to CSV.
    #[arg(long = "export-rc", value_name = "CSV")]
    pub export_rc: Option<PathBuf>,

    /// Export the fitted series (tp,Zth) to CSV.
    #[arg(long = "export-series", value_name = "CSV")]
    pub export_series: Option<PathBuf>,

    /// Export the network (values, diagnostics, grid) to JSON.
    #[arg(long = "export-network", value_name = "JSON")]
    pub export_network: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct CauerArgs {
    /// Foster network JSON from `zth fit --export-network`.
    #[arg(long, value_name = "JSON", conflicts_with = "file")]
    pub network: Option<PathBuf>,

    /// Fit this CSV first instead of loading a network.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Number of Foster stages when fitting.
    #[arg(short = 'n', long, default_value_t = DEFAULT_ORDER)]
    pub order: usize,

    /// Append a heatsink stage with this resistance [K/W].
    #[arg(long, requires = "heatsink_c")]
    pub heatsink_r: Option<f64>,

    /// Heatsink stage capacitance [J/K].
    #[arg(long, requires = "heatsink_r")]
    pub heatsink_c: Option<f64>,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Export the ladder (R_cauer,C_cauer) to CSV.
    #[arg(long = "export-rc", value_name = "CSV")]
    pub export_rc: Option<PathBuf>,

    /// Export the ladder to JSON.
    #[arg(long = "export-network", value_name = "JSON")]
    pub export_network: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub input: FitInputArgs,

    /// Reference die area.
    #[arg(long = "aref")]
    pub a_ref: f64,

    /// New die area.
    #[arg(long = "anew")]
    pub a_new: f64,

    /// Gamma policy.
    #[arg(long, value_enum, default_value_t = ScalingMode::Blended)]
    pub mode: ScalingMode,

    /// Exponent for `--mode fixed`, in (0, 1].
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Centre of the blended curve [s] (default: geometric mean of tau range).
    #[arg(long)]
    pub tau_mid: Option<f64>,

    /// Width of the blended transition in decades.
    #[arg(long)]
    pub width_decades: Option<f64>,

    /// Use a saved Foster network instead of fitting.
    #[arg(long, value_name = "JSON")]
    pub network: Option<PathBuf>,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Export the predicted series (tp,Zth) to CSV.
    #[arg(long = "export-series", value_name = "CSV")]
    pub export_series: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct TempArgs {
    /// Network JSON (Foster or Cauer).
    #[arg(long, value_name = "JSON")]
    pub network: PathBuf,

    /// Power profile CSV: time [s], power [W], piecewise constant.
    #[arg(long, value_name = "CSV")]
    pub power: PathBuf,

    /// Ambient temperature [degC].
    #[arg(long, default_value_t = 25.0)]
    pub ambient: f64,

    /// Number of evaluation times.
    #[arg(long, default_value_t = 200)]
    pub points: usize,

    /// End of the evaluation window [s] (default: last profile time + 5 x max tau).
    #[arg(long)]
    pub t_end: Option<f64>,

    /// Export (t, T) to CSV.
    #[arg(long = "export", value_name = "CSV")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Stage resistances [K/W], comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub r: Vec<f64>,

    /// Stage time constants [s], comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub tau: Vec<f64>,

    #[arg(long, default_value_t = 1e-5)]
    pub t_min: f64,

    #[arg(long, default_value_t = 100.0)]
    pub t_max: f64,

    #[arg(long, default_value_t = 60)]
    pub points: usize,

    /// Relative Gaussian noise level.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV (tp,Zth).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,
}

#[derive(Debug, Parser, Clone)]
pub struct ApiArgs {
    /// Operation to run.
    #[arg(value_enum)]
    pub endpoint: Endpoint,

    /// Request JSON file (`-` for stdin).
    #[arg(long, default_value = "-")]
    pub request: PathBuf,

    /// Response JSON file (stdout when omitted).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

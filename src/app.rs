//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - dispatches parsed CLI subcommands
//! - converts args into explicit option structs
//! - prints reports/plots
//! - writes optional exports

use std::io::Read;
use std::path::Path;

use crate::cli::{
    ApiArgs, CauerArgs, Cli, Command, FitArgs, FitInputArgs, PredictArgs, SynthArgs, TempArgs,
};
use crate::domain::{CauerStage, Measurement, ScalingSpec};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::io::export::{write_rc_csv, write_series_csv};
use crate::io::network::{NetworkFile, write_network_json};
use crate::models::{simulate, tau_span_times};
use crate::plot::{Curve, render_ascii_plot, render_plot};

pub mod pipeline;

use pipeline::{CauerConfig, FitConfig, NetworkSource, PredictConfig, SynthConfig, TempConfig};

/// Entry point for the `zth` binary (after logging is initialised).
pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Cauer(args) => handle_cauer(args),
        Command::Predict(args) => handle_predict(args),
        Command::Temp(args) => handle_temp(args),
        Command::Synth(args) => handle_synth(args),
        Command::Api(args) => handle_api(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.input);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_ingest_summary(&run.ingest));
    println!("{}", crate::report::format_fit_summary(&run.fit));

    if !args.plot.no_plot {
        // Dense curve on top of the samples.
        let times = dense_times(&run.ingest.dataset.times());
        let curve = simulate(&run.fit.network, &times)?;
        let plot = render_ascii_plot(
            run.ingest.dataset.points(),
            &curve,
            args.plot.width,
            args.plot.height,
        );
        println!("{plot}");
    }

    if let Some(path) = &args.export_rc {
        write_rc_csv(
            path,
            ["R", "C"],
            &run.fit.network.resistances(),
            &run.fit.network.capacitances(),
        )?;
    }
    if let Some(path) = &args.export_series {
        write_series_csv(path, &run.fit.fitted)?;
    }
    if let Some(path) = &args.export_network {
        let file = NetworkFile::from_foster(&run.fit.network, Some(run.fit.diagnostics.clone()))?;
        write_network_json(path, &file)?;
    }
    Ok(())
}

fn handle_cauer(args: CauerArgs) -> Result<(), AppError> {
    let config = cauer_config_from_args(&args)?;
    let run = pipeline::run_cauer(&config)?;

    if let Some(fitted) = &run.fitted {
        println!("{}", crate::report::format_fit_summary(&fitted.fit));
    }
    println!("{}", crate::report::format_cauer_summary(&run.conversion));
    if run.ladder.order() > run.conversion.network.order() {
        println!(
            "Heatsink appended: ladder now has {} stages, sum R = {:.6} K/W\n",
            run.ladder.order(),
            run.ladder.total_resistance()
        );
    }

    if !args.plot.no_plot {
        let times = tau_span_times(&run.foster.taus(), args.plot.width.max(2));
        let foster = simulate(&run.foster, &times)?;
        let ladder = simulate(&run.ladder, &times)?;
        let plot = render_plot(
            &[],
            &[Curve::new(&foster, '-'), Curve::new(&ladder, '*')],
            args.plot.width,
            args.plot.height,
        );
        println!("{plot}");
        println!("- Foster   * Cauer");
    }

    if let Some(path) = &args.export_rc {
        write_rc_csv(
            path,
            ["R_cauer", "C_cauer"],
            &run.ladder.resistances(),
            &run.ladder.capacitances(),
        )?;
    }
    if let Some(path) = &args.export_network {
        write_network_json(path, &NetworkFile::from_cauer(&run.ladder)?)?;
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = predict_config_from_args(&args);
    let run = pipeline::run_predict(&config)?;

    println!("{}", crate::report::format_ingest_summary(&run.ingest));
    println!("{}", crate::report::format_prediction(&run.prediction));

    if !args.plot.no_plot {
        let plot = render_plot(
            run.ingest.dataset.points(),
            &[Curve::new(&run.prediction.series, '*')],
            args.plot.width,
            args.plot.height,
        );
        println!("{plot}");
        println!("o measured   * predicted");
    }

    if let Some(path) = &args.export_series {
        write_series_csv(path, &run.prediction.series)?;
    }
    Ok(())
}

fn handle_temp(args: TempArgs) -> Result<(), AppError> {
    let config = TempConfig {
        network: args.network.clone(),
        power: args.power.clone(),
        ambient: args.ambient,
        points: args.points,
        t_end: args.t_end,
    };
    let run = pipeline::run_temperature(&config)?;
    println!(
        "{}",
        crate::report::format_temperature(&run.times, &run.temperatures, &run.duty)
    );
    if let Some(path) = &args.export {
        let series: Vec<Measurement> = run
            .times
            .iter()
            .zip(run.temperatures.iter())
            .map(|(&t, &temp)| Measurement::new(t, temp))
            .collect();
        write_series_csv(path, &series)?;
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        r: args.r.clone(),
        tau: args.tau.clone(),
        t_min: args.t_min,
        t_max: args.t_max,
        points: args.points,
        noise: args.noise,
        seed: args.seed,
    };
    let dataset = pipeline::run_synth(&config)?;
    write_series_csv(&args.output, dataset.points())?;
    println!(
        "Wrote {} samples to {}",
        dataset.len(),
        args.output.display()
    );
    Ok(())
}

fn handle_api(args: ApiArgs) -> Result<(), AppError> {
    let body = read_request(&args.request)?;
    let response = crate::api::handle_json(args.endpoint, &body)?;
    match &args.output {
        Some(path) => std::fs::write(path, response).map_err(|e| {
            AppError::io(format!("Failed to write response '{}': {e}", path.display()))
        }),
        None => {
            println!("{response}");
            Ok(())
        }
    }
}

pub fn fit_config_from_args(args: &FitInputArgs) -> FitConfig {
    FitConfig {
        input: args.input.clone(),
        fit: fit_options_from_args(args),
    }
}

pub fn fit_options_from_args(args: &FitInputArgs) -> FitOptions {
    FitOptions {
        order: args.order,
        weighting: args.weighting,
        max_iterations: args.max_iterations,
        ..FitOptions::default()
    }
}

pub fn cauer_config_from_args(args: &CauerArgs) -> Result<CauerConfig, AppError> {
    let source = match (&args.network, &args.file) {
        (Some(path), _) => NetworkSource::File(path.clone()),
        (None, Some(input)) => NetworkSource::Fit(FitConfig {
            input: input.clone(),
            fit: FitOptions::with_order(args.order),
        }),
        (None, None) => {
            return Err(AppError::validation(
                "Provide a Foster network with --network <JSON> or a transient with --file <CSV>.",
            ));
        }
    };
    let heatsink = match (args.heatsink_r, args.heatsink_c) {
        (Some(r), Some(c)) => Some(CauerStage::new(r, c)),
        _ => None,
    };
    Ok(CauerConfig { source, heatsink })
}

pub fn predict_config_from_args(args: &PredictArgs) -> PredictConfig {
    PredictConfig {
        input: args.input.input.clone(),
        fit: fit_options_from_args(&args.input),
        a_ref: args.a_ref,
        a_new: args.a_new,
        spec: ScalingSpec {
            mode: args.mode,
            gamma_fixed: args.gamma,
            tau_mid: args.tau_mid,
            width_decades: args.width_decades,
        },
        network: args.network.clone(),
    }
}

/// Dataset times plus a log grid between them, for smooth plotted curves.
fn dense_times(times: &[f64]) -> Vec<f64> {
    let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
        return Vec::new();
    };
    let mut out = crate::data::log_times(first, last, 200).unwrap_or_default();
    out.extend_from_slice(times);
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

fn read_request(path: &Path) -> Result<String, AppError> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .map_err(|e| AppError::io(format!("Failed to read request from stdin: {e}")))?;
        return Ok(body);
    }
    std::fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read request '{}': {e}", path.display())))
}

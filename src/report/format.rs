//! Plain-text summaries of fits, conversions, predictions and power runs.

use crate::convert::CauerConversion;
use crate::domain::{FosterNetwork, NumericalWarning, join_warnings};
use crate::fit::FosterFit;
use crate::io::ingest::IngestedData;
use crate::power::DutyCycle;
use crate::predict::Prediction;

/// Dataset bookkeeping from CSV ingest.
pub fn format_ingest_summary(ingest: &IngestedData) -> String {
    let ds = &ingest.dataset;
    let mut out = String::new();
    out.push_str(&format!(
        "Rows: read={} used={} dropped={} skipped={}\n",
        ingest.rows_read,
        ingest.rows_used(),
        ingest.rows_dropped,
        ingest.row_errors.len()
    ));
    if let (Some(first), Some(last)) = (ds.points().first(), ds.last()) {
        out.push_str(&format!(
            "Points: n={} | t=[{:.3e}, {:.3e}] s | Zth_last={:.4} K/W\n",
            ds.len(),
            first.t,
            last.t,
            last.zth
        ));
    }
    for e in ingest.row_errors.iter().take(5) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if ingest.row_errors.len() > 5 {
        out.push_str(&format!("  ... {} more\n", ingest.row_errors.len() - 5));
    }
    out
}

/// Foster fit result: stage table plus diagnostics.
pub fn format_fit_summary(fit: &FosterFit) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== zth - Foster fit (N={}) ===\n",
        fit.network.order()
    ));
    out.push_str(&format_foster_table(&fit.network));
    out.push_str(&format!(
        "\nrms_error={:.3}% dc_error={:.3}% iterations={}\n",
        fit.diagnostics.rms_error_pct, fit.diagnostics.dc_error_pct, fit.iterations
    ));
    out.push_str(&format_warnings(&fit.diagnostics.warnings));
    out
}

/// Foster stage table sorted by τ.
pub fn format_foster_table(network: &FosterNetwork) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<6} {:>12} {:>12} {:>12}\n", "stage", "R [K/W]", "C [J/K]", "tau [s]"));
    out.push_str(&format!("{:-<6} {:-<12} {:-<12} {:-<12}\n", "", "", "", ""));
    for (i, st) in network.stages().iter().enumerate() {
        out.push_str(&format!(
            "{:<6} {:>12.5e} {:>12.5e} {:>12.5e}\n",
            i + 1,
            st.r,
            st.c,
            st.tau()
        ));
    }
    out.push_str(&format!("sum R = {:.6} K/W\n", network.total_resistance()));
    out
}

/// Cauer ladder table (stage 1 nearest the junction).
pub fn format_cauer_summary(conversion: &CauerConversion) -> String {
    let net = &conversion.network;
    let mut out = String::new();
    out.push_str(&format!("=== zth - Cauer ladder (N={}) ===\n", net.order()));
    out.push_str(&format!("{:<6} {:>12} {:>12}\n", "stage", "R_cauer", "C_cauer"));
    out.push_str(&format!("{:-<6} {:-<12} {:-<12}\n", "", "", ""));
    for (i, st) in net.stages().iter().enumerate() {
        out.push_str(&format!("{:<6} {:>12.5e} {:>12.5e}\n", i + 1, st.r, st.c));
    }
    out.push_str(&format!("sum R = {:.6} K/W\n", net.total_resistance()));
    out.push_str(&format_warnings(&conversion.warnings));
    out
}

/// Sibling prediction: scale, summary and the per-stage exponents.
pub fn format_prediction(prediction: &Prediction) -> String {
    let mut out = String::new();
    out.push_str("=== zth - sibling prediction ===\n");
    out.push_str(&format!("{}\n", prediction.summary));
    out.push_str(&format!("scale = {:.6}\n", prediction.scale));
    if let Some(d) = &prediction.reference_diagnostics {
        out.push_str(&format!(
            "reference: rms_error={:.3}% dc_error={:.3}%\n",
            d.rms_error_pct, d.dc_error_pct
        ));
    }
    if let Some(scaled) = &prediction.scaled {
        out.push_str(&format!("gamma : {}\n", fmt_vec(&prediction.gammas)));
        out.push_str("\nScaled network:\n");
        out.push_str(&format_foster_table(scaled));
    }
    out.push_str(&format_warnings(&prediction.warnings));
    out
}

/// Temperature table plus duty-cycle estimate.
pub fn format_temperature(times: &[f64], temps: &[f64], duty: &DutyCycle) -> String {
    let mut out = String::new();
    out.push_str("=== zth - temperature response ===\n");
    out.push_str(&format!(
        "duty={:.1}% period={:.4e} s threshold={:.3} W\n",
        100.0 * duty.duty,
        duty.period,
        duty.threshold
    ));
    out.push_str(&format!("{:>12} {:>12}\n", "t [s]", "T [degC]"));
    for (t, temp) in times.iter().zip(temps.iter()) {
        out.push_str(&format!("{t:>12.4e} {temp:>12.4}\n"));
    }
    if let Some(peak) = temps.iter().copied().reduce(f64::max) {
        out.push_str(&format!("peak = {peak:.4}\n"));
    }
    out
}

fn format_warnings(warnings: &[NumericalWarning]) -> String {
    match join_warnings(warnings) {
        Some(w) => format!("warning: {w}\n"),
        None => String::new(),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

//! JSON request/response contracts.
//!
//! Three operations are exposed with the field names the surrounding
//! application already speaks:
//!
//! - `fit_foster`: `{points, N}` → `{R, C, tau, fitSeries, rms_error, dc_error, warning?}`
//! - `foster_to_cauer`: `{R, C, series}` → `{R_cauer, C_cauer, series, warning?}`
//! - `predict`: `{points, Aref, Anew, scalingSpec}` → `{series, scale, summary, warning?}`
//!
//! Handlers re-validate everything they receive; any `ValidationError` is
//! returned as-is and no partial response is produced.

use serde::{Deserialize, Serialize};

use crate::convert::foster_to_cauer as convert_foster;
use crate::domain::{
    DEFAULT_ORDER, Dataset, FosterNetwork, Measurement, ScalingSpec, Weighting,
};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_foster as fit_dataset};
use crate::models::{simulate, tau_span_times};
use crate::predict::{PredictOptions, predict as predict_dataset};

/// Sample count used when a conversion request carries no series.
pub const DEFAULT_SERIES_POINTS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRequest {
    pub points: Vec<Measurement>,
    #[serde(rename = "N", default = "default_order")]
    pub n: usize,
    #[serde(default)]
    pub weighting: Weighting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResponse {
    #[serde(rename = "R")]
    pub r: Vec<f64>,
    #[serde(rename = "C")]
    pub c: Vec<f64>,
    pub tau: Vec<f64>,
    #[serde(rename = "fitSeries")]
    pub fit_series: Vec<Measurement>,
    pub rms_error: f64,
    pub dc_error: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauerRequest {
    #[serde(rename = "R")]
    pub r: Vec<f64>,
    #[serde(rename = "C")]
    pub c: Vec<f64>,
    #[serde(default)]
    pub series: Vec<Measurement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauerResponse {
    #[serde(rename = "R_cauer")]
    pub r_cauer: Vec<f64>,
    #[serde(rename = "C_cauer")]
    pub c_cauer: Vec<f64>,
    pub series: Vec<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub points: Vec<Measurement>,
    #[serde(rename = "Aref")]
    pub a_ref: f64,
    #[serde(rename = "Anew")]
    pub a_new: f64,
    #[serde(rename = "scalingSpec", default)]
    pub scaling_spec: ScalingSpec,
    #[serde(rename = "N", default = "default_order")]
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub series: Vec<Measurement>,
    pub scale: f64,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn default_order() -> usize {
    DEFAULT_ORDER
}

/// Fit a Foster network to the request points.
pub fn fit_foster(req: &FitRequest) -> Result<FitResponse, AppError> {
    let dataset = Dataset::new(req.points.clone())?;
    let opts = FitOptions {
        order: req.n,
        weighting: req.weighting,
        ..FitOptions::default()
    };
    let fit = fit_dataset(&dataset, &opts)?;
    Ok(FitResponse {
        r: fit.network.resistances(),
        c: fit.network.capacitances(),
        tau: fit.network.taus(),
        fit_series: fit.fitted,
        rms_error: fit.diagnostics.rms_error_pct,
        dc_error: fit.diagnostics.dc_error_pct,
        warning: fit.diagnostics.warning(),
    })
}

/// Convert a Foster network to its ladder and simulate the ladder.
///
/// The response series holds the ladder's step response at the request
/// series' times, or at [`DEFAULT_SERIES_POINTS`] times spanning the
/// network's τ range when the request has none.
pub fn foster_to_cauer(req: &CauerRequest) -> Result<CauerResponse, AppError> {
    let foster = FosterNetwork::from_rc(&req.r, &req.c)?;
    let conversion = convert_foster(&foster)?;

    let times: Vec<f64> = if req.series.is_empty() {
        tau_span_times(&foster.taus(), DEFAULT_SERIES_POINTS)
    } else {
        req.series.iter().map(|p| p.t).collect()
    };
    let series = simulate(&conversion.network, &times)?;

    Ok(CauerResponse {
        r_cauer: conversion.network.resistances(),
        c_cauer: conversion.network.capacitances(),
        series,
        warning: conversion.warning(),
    })
}

/// Predict a sibling device's transient.
pub fn predict(req: &PredictRequest) -> Result<PredictResponse, AppError> {
    let dataset = Dataset::new(req.points.clone())?;
    let opts = PredictOptions {
        fit: FitOptions::with_order(req.n),
        network: None,
    };
    let prediction = predict_dataset(&dataset, req.a_ref, req.a_new, &req.scaling_spec, &opts)?;
    Ok(PredictResponse {
        warning: prediction.warning(),
        series: prediction.series,
        scale: prediction.scale,
        summary: prediction.summary,
    })
}

/// Operation selector for [`handle_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Endpoint {
    FitFoster,
    FosterToCauer,
    Predict,
}

/// Decode a request, run the operation and encode the response.
pub fn handle_json(endpoint: Endpoint, body: &str) -> Result<String, AppError> {
    match endpoint {
        Endpoint::FitFoster => encode(&fit_foster(&decode(body)?)?),
        Endpoint::FosterToCauer => encode(&foster_to_cauer(&decode(body)?)?),
        Endpoint::Predict => encode(&predict(&decode(body)?)?),
    }
}

fn decode<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, AppError> {
    serde_json::from_str(body)
        .map_err(|e| AppError::validation(format!("Malformed request JSON: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::numerical(format!("Failed to encode response JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn scenario_points() -> Value {
        json!([
            {"tp": 0.001, "Zth": 0.10},
            {"tp": 0.01, "Zth": 0.30},
            {"tp": 0.1, "Zth": 0.60},
            {"tp": 1.0, "Zth": 0.90},
            {"tp": 10.0, "Zth": 0.95}
        ])
    }

    #[test]
    fn fit_contract_field_names() {
        let body = json!({"points": scenario_points(), "N": 2}).to_string();
        let out: Value = serde_json::from_str(&handle_json(Endpoint::FitFoster, &body).unwrap()).unwrap();
        for key in ["R", "C", "tau", "fitSeries", "rms_error", "dc_error"] {
            assert!(out.get(key).is_some(), "missing {key}");
        }
        assert_eq!(out["R"].as_array().unwrap().len(), 2);
        assert_eq!(out["fitSeries"].as_array().unwrap().len(), 5);
        assert!(out["fitSeries"][0].get("Zth").is_some());
    }

    #[test]
    fn fit_defaults_to_order_four() {
        let req: FitRequest = serde_json::from_value(json!({"points": scenario_points()})).unwrap();
        assert_eq!(req.n, DEFAULT_ORDER);
        let resp = fit_foster(&req).unwrap();
        assert_eq!(resp.r.len(), 4);
        // 5 points < 2·4 + 1.
        assert!(resp.warning.unwrap().contains("underdetermined fit"));
    }

    #[test]
    fn fit_rejects_unsorted_points() {
        let body = json!({
            "points": [{"tp": 1.0, "Zth": 0.5}, {"tp": 0.1, "Zth": 0.2}, {"tp": 2.0, "Zth": 0.6}],
            "N": 1
        })
        .to_string();
        assert!(handle_json(Endpoint::FitFoster, &body).unwrap_err().is_validation());
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        assert!(handle_json(Endpoint::Predict, "{not json").unwrap_err().is_validation());
    }

    #[test]
    fn cauer_contract_simulates_request_times() {
        let body = json!({
            "R": [0.2, 0.8],
            "C": [0.005, 1.25],
            "series": [{"tp": 0.01, "Zth": 0.0}, {"tp": 1.0, "Zth": 0.0}]
        })
        .to_string();
        let out: Value =
            serde_json::from_str(&handle_json(Endpoint::FosterToCauer, &body).unwrap()).unwrap();
        assert_eq!(out["R_cauer"].as_array().unwrap().len(), 2);
        assert_eq!(out["C_cauer"].as_array().unwrap().len(), 2);
        assert_eq!(out["series"][1]["tp"], 1.0);
        assert!(out.get("warning").is_none());

        let foster = FosterNetwork::from_rc(&[0.2, 0.8], &[0.005, 1.25]).unwrap();
        let expected = crate::models::evaluate(&foster, &[1.0]).unwrap()[0];
        let got = out["series"][1]["Zth"].as_f64().unwrap();
        assert!(((got - expected) / expected).abs() < 1e-6);
    }

    #[test]
    fn cauer_without_series_uses_tau_span() {
        let req = CauerRequest {
            r: vec![1.0],
            c: vec![1.0],
            series: Vec::new(),
        };
        let resp = foster_to_cauer(&req).unwrap();
        assert_eq!(resp.series.len(), DEFAULT_SERIES_POINTS);
        assert!((resp.series[0].t - 0.1).abs() < 1e-12);
    }

    #[test]
    fn cauer_rejects_mismatched_arrays() {
        let req = CauerRequest {
            r: vec![1.0, 2.0],
            c: vec![1.0],
            series: Vec::new(),
        };
        assert!(foster_to_cauer(&req).unwrap_err().is_validation());
    }

    #[test]
    fn predict_contract_with_fixed_gamma() {
        let body = json!({
            "points": scenario_points(),
            "Aref": 1.0,
            "Anew": 2.0,
            "scalingSpec": {"mode": "fixed", "gammaFixed": 1.0},
            "N": 2
        })
        .to_string();
        let out: Value = serde_json::from_str(&handle_json(Endpoint::Predict, &body).unwrap()).unwrap();
        assert!((out["scale"].as_f64().unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(out["series"].as_array().unwrap().len(), 5);
        assert!(out["summary"].as_str().unwrap().contains("0.500000"));
    }

    #[test]
    fn predict_rejects_non_positive_area() {
        let req = PredictRequest {
            points: vec![Measurement::new(1.0, 1.0)],
            a_ref: 1.0,
            a_new: -2.0,
            scaling_spec: ScalingSpec::blended(),
            n: 2,
        };
        assert!(predict(&req).unwrap_err().is_validation());
    }

    #[test]
    fn predict_fallback_reports_warning() {
        let body = json!({
            "points": [{"tp": 0.1, "Zth": 0.4}, {"tp": 1.0, "Zth": 0.8}],
            "Aref": 2.0,
            "Anew": 1.0
        })
        .to_string();
        let out: Value = serde_json::from_str(&handle_json(Endpoint::Predict, &body).unwrap()).unwrap();
        assert_eq!(out["scale"], 2.0);
        assert_eq!(out["warning"], "used fallback pure-inverse-area scaling");
    }
}

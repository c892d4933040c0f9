//! Read/write network JSON files.
//!
//! A network file is the portable form of a fitted or converted model:
//! - the network kind and its element values
//! - fit diagnostics when the network came from a fit
//! - a precomputed step-response grid for quick plotting

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CauerNetwork, FitDiagnostics, FosterNetwork, Measurement};
use crate::error::AppError;
use crate::models::{FosterDecomposition, StepResponse, cauer_to_foster, simulate, tau_span_times};

/// Points in the stored step-response grid.
const GRID_POINTS: usize = 101;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Foster,
    Cauer,
}

/// On-disk network description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkFile {
    pub tool: String,
    pub kind: NetworkKind,
    #[serde(rename = "R")]
    pub r: Vec<f64>,
    #[serde(rename = "C")]
    pub c: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<FitDiagnostics>,
    #[serde(default)]
    pub grid: Vec<Measurement>,
}

impl NetworkFile {
    pub fn from_foster(
        network: &FosterNetwork,
        diagnostics: Option<FitDiagnostics>,
    ) -> Result<Self, AppError> {
        let times = tau_span_times(&network.taus(), GRID_POINTS);
        Ok(Self {
            tool: "zth".to_string(),
            kind: NetworkKind::Foster,
            r: network.resistances(),
            c: network.capacitances(),
            diagnostics,
            grid: simulate(network, &times)?,
        })
    }

    pub fn from_cauer(network: &CauerNetwork) -> Result<Self, AppError> {
        // Grid range follows the ladder's own modes.
        let foster = cauer_to_foster(network)?.network;
        let times = tau_span_times(&foster.taus(), GRID_POINTS);
        Ok(Self {
            tool: "zth".to_string(),
            kind: NetworkKind::Cauer,
            r: network.resistances(),
            c: network.capacitances(),
            diagnostics: None,
            grid: simulate(network, &times)?,
        })
    }

    /// Rebuild the Foster network; ladders are decomposed into their modes.
    pub fn to_foster(&self) -> Result<FosterDecomposition, AppError> {
        match self.kind {
            NetworkKind::Foster => Ok(FosterDecomposition {
                network: FosterNetwork::from_rc(&self.r, &self.c)?,
                warnings: Vec::new(),
            }),
            NetworkKind::Cauer => cauer_to_foster(&self.to_cauer()?),
        }
    }

    pub fn to_cauer(&self) -> Result<CauerNetwork, AppError> {
        match self.kind {
            NetworkKind::Cauer => CauerNetwork::from_rc(&self.r, &self.c),
            NetworkKind::Foster => Err(AppError::validation(
                "Network file holds a Foster network; convert it first.",
            )),
        }
    }

    /// Evaluate the stored network at arbitrary times.
    pub fn step_response(&self, times: &[f64]) -> Result<Vec<f64>, AppError> {
        match self.kind {
            NetworkKind::Foster => self.to_foster()?.network.step_response(times),
            NetworkKind::Cauer => self.to_cauer()?.step_response(times),
        }
    }
}

/// Write a network JSON file.
pub fn write_network_json(path: &Path, file: &NetworkFile) -> Result<(), AppError> {
    let out = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create network JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::io(format!("Failed to write network JSON: {e}")))
}

/// Read a network JSON file.
pub fn read_network_json(path: &Path) -> Result<NetworkFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::io(format!("Failed to open network JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::validation(format!("Invalid network JSON: {e}")))
}

//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - measured transients (`Measurement`, `Dataset`)
//! - RC network value objects (`FosterNetwork`, `CauerNetwork`)
//! - fit diagnostics and non-fatal warnings (`FitDiagnostics`, `NumericalWarning`)
//! - configuration enums (`Weighting`, `ScalingMode`, `ScalingSpec`)
//! - power profiles for temperature prediction

pub mod types;

pub use types::*;

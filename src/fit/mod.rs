//! Foster network fitting.
//!
//! Responsibilities:
//!
//! - generate τ grids for seeding the solver
//! - evaluate candidate τ tuples (parallel) and pick a deterministic seed
//! - refine `ln τ` with Levenberg–Marquardt, solving `R` by projection
//! - report fit quality and non-fatal warnings

pub mod diagnostics;
pub mod fitter;
pub mod solver;
pub mod tau_grid;

pub use diagnostics::*;
pub use fitter::*;
pub use tau_grid::*;

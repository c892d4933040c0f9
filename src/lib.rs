//! `zth-networks` library crate.
//!
//! Thermal RC network identification: fit a Foster network to a measured
//! Zth(t) transient, convert it into an equivalent Cauer ladder, and predict
//! a sibling device's transient by die-area scaling.
//!
//! The binary (`zth`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the numerical operations are reusable behind any transport

pub mod api;
pub mod app;
pub mod cli;
pub mod convert;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod power;
pub mod predict;
pub mod report;

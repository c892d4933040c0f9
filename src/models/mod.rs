//! RC network evaluation.
//!
//! Networks are evaluated through small pure functions so that fitting,
//! conversion and prediction code can stay generic:
//! - `foster`: design rows and closed-form step response of a Foster bank
//! - `ladder`: modal (state-space) solution of a Cauer ladder
//! - `response`: the common `StepResponse` interface and series helpers

pub mod foster;
pub mod ladder;
pub mod response;

pub use foster::*;
pub use ladder::*;
pub use response::*;

//! Synthetic thermal transients for demos and tests.

pub mod sample;

pub use sample::*;

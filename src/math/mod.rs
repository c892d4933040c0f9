//! Mathematical utilities: step basis, (non-negative) least squares, polynomials.

pub mod basis;
pub mod nnls;
pub mod ols;
pub mod poly;

pub use basis::*;
pub use nnls::*;
pub use ols::*;

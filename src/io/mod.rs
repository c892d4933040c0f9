//! Input/output helpers.
//!
//! - CSV ingest + cleaning (`ingest`)
//! - RC / series CSV exports (`export`)
//! - network JSON read/write (`network`)

pub mod export;
pub mod ingest;
pub mod network;

pub use export::*;
pub use ingest::*;
pub use network::*;

//! Input/output helpers.
//!
//! - table ingest from CSV/Parquet (`ingest`)
//! - table export to CSV/Parquet (`export`)
//! - model artifact JSON read/write (`artifact`)

pub mod artifact;
pub mod export;
pub mod ingest;

pub use artifact::*;
pub use export::*;
pub use ingest::*;

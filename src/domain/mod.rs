//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the column contracts each stage's `DataFrame` honors
//! - typed rows (`DailyStoreSales`, `ForecastRow`) for stages that walk a frame row by row
//! - small helpers for moving dates and columns in and out of `polars`

pub mod types;

pub use types::*;

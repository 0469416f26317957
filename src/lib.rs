//! `retail-pipeline` library crate.
//!
//! The binary is a thin wrapper around this library so the pipeline stages
//! can be tested without spawning processes.
//!
//! ingest -> transform -> features -> model -> export, with `app` wiring the
//! stages together and `remote` standing in for object storage.

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod features;
pub mod io;
pub mod logging;
pub mod math;
pub mod model;
pub mod remote;
pub mod transform;

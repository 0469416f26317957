//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module parses the CLI, loads configuration,
//! and dispatches to the pipeline, the remote runner, or the trigger server.

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, ForecastArgs, RunArgs, ServeArgs};
use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::io::{read_model_json, read_table, write_model_json, write_table};
use crate::remote::GcsClient;
use crate::transform::coerce_daily_store_sales;

pub mod pipeline;
pub mod trigger;

/// Entry point for the `retail-pipeline` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    // Loads `.env` first so LOG_LEVEL can come from it.
    let config = PipelineConfig::from_env()?;
    crate::logging::init();

    match cli.command {
        Command::Run(args) => handle_run(args, config),
        Command::Forecast(args) => handle_forecast(args, config),
        Command::Remote => handle_remote(config),
        Command::Serve(args) => handle_serve(args, config),
    }
}

fn handle_run(args: RunArgs, mut config: PipelineConfig) -> Result<(), AppError> {
    if let Some(horizon) = args.horizon {
        config.modeling.forecast_horizon_days = horizon;
    }
    let sales = args
        .sales
        .unwrap_or_else(|| config.paths.data_raw_dir.join("sales.csv"));
    let customers = args
        .customers
        .unwrap_or_else(|| config.paths.data_raw_dir.join("customers.csv"));

    let output = pipeline::run_local_pipeline(&sales, &customers, args.output_dir.as_deref(), &config)?;

    if let Some(path) = &args.save_model {
        write_model_json(path, &output.artifact)?;
    }

    for path in &output.written {
        println!("{}", path.display());
    }
    Ok(())
}

fn handle_forecast(args: ForecastArgs, config: PipelineConfig) -> Result<(), AppError> {
    let artifact = read_model_json(&args.model)?;
    let daily = coerce_daily_store_sales(&read_table(&args.daily)?)?;
    let horizon = args.horizon.unwrap_or(config.modeling.forecast_horizon_days);

    let fcst = crate::model::forecast(&artifact, &daily, horizon)?;
    write_table(&fcst, &args.output)?;
    info!(rows = fcst.height(), "Forecast written to {}", args.output.display());
    Ok(())
}

fn handle_remote(config: PipelineConfig) -> Result<(), AppError> {
    config.remote.require_buckets()?;
    let store = GcsClient::from_config(&config.remote)?;
    pipeline::run_remote_pipeline(&config, &store)?;
    Ok(())
}

fn handle_serve(args: ServeArgs, config: PipelineConfig) -> Result<(), AppError> {
    trigger::serve(config, args.addr)
}

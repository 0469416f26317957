//! Command-line parsing for the retail pipeline.
//!
//! Parsing lives here; dispatch lives in `app`. Unset options fall back to the
//! environment-sourced `PipelineConfig`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "retail-pipeline",
    version,
    about = "Retail sales ETL and per-store revenue forecasting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline on local files.
    Run(RunArgs),
    /// Forecast from a saved model and an existing daily store sales file.
    Forecast(ForecastArgs),
    /// Download inputs from object storage, run, and upload the outputs.
    Remote,
    /// Serve the HTTP trigger.
    Serve(ServeArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Sales file (.csv or .parquet). Defaults to `<DATA_RAW_DIR>/sales.csv`.
    #[arg(long, value_name = "PATH")]
    pub sales: Option<PathBuf>,

    /// Customers file (.csv or .parquet). Defaults to `<DATA_RAW_DIR>/customers.csv`.
    #[arg(long, value_name = "PATH")]
    pub customers: Option<PathBuf>,

    /// Output directory. Defaults to `DATA_PROCESSED_DIR`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Forecast horizon in days (overrides FORECAST_HORIZON_DAYS).
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Also write the trained model as JSON.
    #[arg(long, value_name = "JSON")]
    pub save_model: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct ForecastArgs {
    /// Model JSON written by `run --save-model`.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Daily store sales history (.csv or .parquet).
    #[arg(long, value_name = "PATH")]
    pub daily: PathBuf,

    /// Forecast output (.csv or .parquet).
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Forecast horizon in days (overrides FORECAST_HORIZON_DAYS).
    #[arg(long)]
    pub horizon: Option<usize>,
}

#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "retail-pipeline",
            "run",
            "--sales",
            "in/sales.parquet",
            "--horizon",
            "7",
            "--save-model",
            "models/baseline.json",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.sales, Some(PathBuf::from("in/sales.parquet")));
        assert_eq!(args.customers, None);
        assert_eq!(args.horizon, Some(7));
        assert_eq!(args.save_model, Some(PathBuf::from("models/baseline.json")));
    }

    #[test]
    fn serve_has_default_addr() {
        let cli = Cli::parse_from(["retail-pipeline", "serve"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr.port(), 8080);
    }
}

//! End-to-end pipeline orchestration.
//!
//! ingest -> clean -> features -> persist -> train -> forecast -> persist
//!
//! Every stage fully materializes its output before the next begins. The
//! remote variant wraps the local one with a download/upload step around a
//! scratch directory that is removed however the run ends.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::features::{customer_features, daily_store_sales, fill_daily_gaps};
use crate::io::{read_customers, read_sales, write_table};
use crate::model::{ModelArtifact, forecast, train_baseline};
use crate::remote::ObjectStore;
use crate::transform::{clean_customers, clean_sales};

pub const DAILY_STORE_SALES: &str = "daily_store_sales";
pub const CUSTOMER_FEATURES: &str = "customer_features";
pub const FORECAST: &str = "forecast";

/// Parquet outputs shipped to the processed bucket by a remote run.
pub const UPLOADED_OUTPUTS: [&str; 3] = [
    "daily_store_sales.parquet",
    "customer_features.parquet",
    "forecast.parquet",
];

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub daily: DataFrame,
    pub customer_features: DataFrame,
    pub forecast: DataFrame,
    pub artifact: ModelArtifact,
}

/// Run the full pipeline on local files.
///
/// `output_dir` defaults to `config.paths.data_processed_dir`. Each table is
/// written as both `.parquet` and `.csv`.
pub fn run_local_pipeline(
    sales_path: &Path,
    customers_path: &Path,
    output_dir: Option<&Path>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, AppError> {
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.paths.data_processed_dir.clone());
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| AppError::io(format!("Failed to create output dir '{}': {e}", output_dir.display())))?;

    if config.modeling.model_type != "linear" {
        warn!(
            model_type = %config.modeling.model_type,
            "Unknown MODEL_TYPE; using the linear baseline"
        );
    }

    let raw_sales = read_sales(sales_path)?;
    let raw_customers = read_customers(customers_path)?;

    let sales = clean_sales(&raw_sales)?;
    let customers = clean_customers(&raw_customers)?;

    let mut daily = daily_store_sales(&sales)?;
    if config.modeling.fill_missing_days {
        daily = fill_daily_gaps(&daily)?;
    }
    let cust_feats = customer_features(&sales, &customers)?;

    let mut written = Vec::new();
    written.extend(write_both(&daily, &output_dir, DAILY_STORE_SALES)?);
    written.extend(write_both(&cust_feats, &output_dir, CUSTOMER_FEATURES)?);

    let artifact = train_baseline(&daily, config.modeling.validation_days)?;
    let fcst = forecast(&artifact, &daily, config.modeling.forecast_horizon_days)?;
    written.extend(write_both(&fcst, &output_dir, FORECAST)?);

    info!("Pipeline completed. Outputs saved to {}", output_dir.display());

    Ok(PipelineOutput {
        output_dir,
        written,
        daily,
        customer_features: cust_feats,
        forecast: fcst,
        artifact,
    })
}

/// Download inputs, run the local pipeline in a scratch dir, upload outputs.
///
/// Bucket configuration is checked before any network I/O. Paths in the
/// returned output point into the staging directory, which is gone by the time
/// this returns.
pub fn run_remote_pipeline(config: &PipelineConfig, store: &dyn ObjectStore) -> Result<PipelineOutput, AppError> {
    let (bucket_raw, bucket_processed) = config.remote.require_buckets()?;

    let tmp = tempfile::Builder::new()
        .prefix("retail-pipeline-")
        .tempdir()
        .map_err(|e| AppError::io(format!("Failed to create staging directory: {e}")))?;
    let local_sales = tmp.path().join(staged_name("sales", &config.remote.sales_blob));
    let local_customers = tmp.path().join(staged_name("customers", &config.remote.customers_blob));
    let out_dir = tmp.path().join("processed");

    store.fetch(bucket_raw, &config.remote.sales_blob, &local_sales)?;
    store.fetch(bucket_raw, &config.remote.customers_blob, &local_customers)?;

    let output = run_local_pipeline(&local_sales, &local_customers, Some(&out_dir), config)?;

    for name in UPLOADED_OUTPUTS {
        store.put(&out_dir.join(name), bucket_processed, &format!("processed/{name}"))?;
    }

    Ok(output)
}

/// Local file name for a downloaded blob. The blob's extension is kept so
/// ingest picks the right reader.
fn staged_name(role: &str, blob: &str) -> String {
    match Path::new(blob).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{role}.{ext}"),
        None => role.to_string(),
    }
}

fn write_both(df: &DataFrame, dir: &Path, stem: &str) -> Result<[PathBuf; 2], AppError> {
    let parquet = dir.join(format!("{stem}.parquet"));
    let csv = dir.join(format!("{stem}.csv"));
    write_table(df, &parquet)?;
    write_table(df, &csv)?;
    Ok([parquet, csv])
}

//! Environment-sourced configuration.
//!
//! Values are read once (after loading an optional `.env`) into immutable
//! structs that are passed by reference into each stage. Nothing here is global.

use std::path::PathBuf;

use crate::error::AppError;

/// Local directory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub project_root: PathBuf,
    pub data_raw_dir: PathBuf,
    pub data_processed_dir: PathBuf,
    pub models_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Paths {
    /// Default layout under `root`.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_raw_dir: root.join("data").join("raw"),
            data_processed_dir: root.join("data").join("processed"),
            models_dir: root.join("models"),
            reports_dir: root.join("reports"),
            project_root: root,
        }
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let root = lookup("PROJECT_ROOT")
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let defaults = Self::under(root);
        let dir = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);
        Self {
            data_raw_dir: dir("DATA_RAW_DIR", defaults.data_raw_dir),
            data_processed_dir: dir("DATA_PROCESSED_DIR", defaults.data_processed_dir),
            models_dir: dir("MODELS_DIR", defaults.models_dir),
            reports_dir: dir("REPORTS_DIR", defaults.reports_dir),
            project_root: defaults.project_root,
        }
    }
}

/// Remote object storage / cluster settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub project_id: Option<String>,
    pub bucket_raw: Option<String>,
    pub bucket_processed: Option<String>,
    pub region: String,
    pub cluster: Option<String>,
    pub sales_blob: String,
    pub customers_blob: String,
    pub access_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            bucket_raw: None,
            bucket_processed: None,
            region: "us-central1".to_string(),
            cluster: None,
            sales_blob: "raw/sales.csv".to_string(),
            customers_blob: "raw/customers.csv".to_string(),
            access_token: None,
        }
    }
}

impl RemoteConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            project_id: lookup("GCP_PROJECT_ID"),
            bucket_raw: lookup("GCS_BUCKET_RAW"),
            bucket_processed: lookup("GCS_BUCKET_PROCESSED"),
            region: lookup("GCP_REGION").unwrap_or(defaults.region),
            cluster: lookup("DATAPROC_CLUSTER"),
            sales_blob: lookup("GCS_SALES_BLOB").unwrap_or(defaults.sales_blob),
            customers_blob: lookup("GCS_CUSTOMERS_BLOB").unwrap_or(defaults.customers_blob),
            access_token: lookup("GCS_ACCESS_TOKEN"),
        }
    }

    /// Return `(raw, processed)` bucket names, or fail before any network I/O.
    pub fn require_buckets(&self) -> Result<(&str, &str), AppError> {
        match (self.bucket_raw.as_deref(), self.bucket_processed.as_deref()) {
            (Some(raw), Some(processed)) => Ok((raw, processed)),
            _ => Err(AppError::configuration(
                "GCS buckets not configured: set GCS_BUCKET_RAW and GCS_BUCKET_PROCESSED.",
            )),
        }
    }
}

/// Forecasting knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelingConfig {
    pub forecast_horizon_days: usize,
    pub validation_days: usize,
    /// Only `linear` is implemented; other values fall back to it.
    pub model_type: String,
    /// Gap-fill the daily store series before modeling.
    pub fill_missing_days: bool,
}

impl Default for ModelingConfig {
    fn default() -> Self {
        Self {
            forecast_horizon_days: 14,
            validation_days: 28,
            model_type: "linear".to_string(),
            fill_missing_days: false,
        }
    }
}

impl ModelingConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            forecast_horizon_days: parse_usize(lookup, "FORECAST_HORIZON_DAYS", defaults.forecast_horizon_days)?,
            validation_days: parse_usize(lookup, "VALIDATION_DAYS", defaults.validation_days)?,
            model_type: lookup("MODEL_TYPE").unwrap_or(defaults.model_type),
            fill_missing_days: parse_bool(lookup, "FILL_MISSING_DAYS", defaults.fill_missing_days)?,
        })
    }
}

/// Everything a pipeline run needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub paths: Paths,
    pub remote: RemoteConfig,
    pub modeling: ModelingConfig,
}

impl PipelineConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self {
            paths: Paths::from_lookup(&lookup),
            remote: RemoteConfig::from_lookup(&lookup),
            modeling: ModelingConfig::from_lookup(&lookup)?,
        })
    }

    /// Defaults rooted at `root`, ignoring the environment.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            paths: Paths::under(root),
            remote: RemoteConfig::default(),
            modeling: ModelingConfig::default(),
        }
    }
}

fn parse_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize, AppError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|e| AppError::configuration(format!("Invalid {key} '{raw}': {e}"))),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, AppError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::configuration(format!("Invalid {key} '{raw}': expected true/false"))),
    }
}

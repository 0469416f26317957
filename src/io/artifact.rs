//! Read/write model artifact JSON files.
//!
//! The JSON carries everything `forecast` needs: intercept, coefficients, the
//! ordered feature names and the target name. Training row count and the
//! validation MAE ride along for reporting.

use std::fs::{File, create_dir_all};
use std::path::Path;

use tracing::info;

use crate::error::AppError;
use crate::model::ModelArtifact;

/// Write a model artifact as pretty-printed JSON.
pub fn write_model_json(path: &Path, artifact: &ModelArtifact) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create model JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, artifact)
        .map_err(|e| AppError::io(format!("Failed to write model JSON: {e}")))?;

    info!(path = %path.display(), "Saved model artifact");
    Ok(())
}

/// Read a model artifact JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelArtifact, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let artifact: ModelArtifact =
        serde_json::from_reader(file).map_err(|e| AppError::model(format!("Invalid model JSON: {e}")))?;

    if artifact.model.coefficients.len() != artifact.feature_columns.len() {
        return Err(AppError::model(format!(
            "Model JSON has {} coefficients for {} feature columns.",
            artifact.model.coefficients.len(),
            artifact.feature_columns.len()
        )));
    }
    Ok(artifact)
}

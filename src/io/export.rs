//! Write frames to CSV or Parquet.
//!
//! Every processed dataset is written twice (binary columnar + text) so that
//! downstream consumers that cannot read Parquet still get a copy.

use std::fs::{File, create_dir_all};
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::AppError;
use crate::io::ingest::FileFormat;

/// Write `df` to `path`, picking the format from the extension.
pub fn write_table(df: &DataFrame, path: &Path) -> Result<(), AppError> {
    let format = FileFormat::from_path(path)
        .map_err(|_| AppError::unsupported_format(format!("Unsupported output file type: {}", path.display())))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", parent.display())))?;
    }

    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
    // The writers want `&mut`; they never change the frame's contents.
    let mut out = df.clone();
    match format {
        FileFormat::Csv => CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut out)
            .map_err(|e| AppError::io(format!("Failed to write CSV '{}': {e}", path.display())))?,
        FileFormat::Parquet => {
            ParquetWriter::new(file)
                .finish(&mut out)
                .map_err(|e| AppError::io(format!("Failed to write parquet file '{}': {e}", path.display())))?;
        }
    }

    info!(rows = df.height(), "Wrote dataset to {}", path.display());
    Ok(())
}

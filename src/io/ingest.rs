//! Tabular file ingest (CSV and Parquet).
//!
//! Ingest is deliberately dumb: it only turns a file into a `DataFrame`.
//! Header normalization, type coercion, and row filtering are the cleaning
//! stage's job, so CSV columns arrive as text (empty cells as null) and
//! Parquet columns keep their stored types.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::AppError;

/// Supported on-disk formats, chosen by file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            _ => Err(AppError::unsupported_format(format!(
                "Unsupported file type: {} (expected .csv, .parquet, or .pq)",
                path.display()
            ))),
        }
    }
}

/// Read any supported file into a `DataFrame`.
pub fn read_table(path: &Path) -> Result<DataFrame, AppError> {
    match FileFormat::from_path(path)? {
        FileFormat::Csv => read_csv(path),
        FileFormat::Parquet => read_parquet(path),
    }
}

/// Read the raw sales file.
pub fn read_sales(path: &Path) -> Result<DataFrame, AppError> {
    let df = read_table(path)?;
    info!(rows = df.height(), cols = df.width(), "Read sales data from {}", path.display());
    Ok(df)
}

/// Read the raw customers file.
pub fn read_customers(path: &Path) -> Result<DataFrame, AppError> {
    let df = read_table(path)?;
    info!(rows = df.height(), cols = df.width(), "Read customers data from {}", path.display());
    Ok(df)
}

fn read_csv(path: &Path) -> Result<DataFrame, AppError> {
    // A zero-row inference window reads every column as text.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?
        .finish()
        .map_err(|e| AppError::io(format!("Failed to parse CSV '{}': {e}", path.display())))?;

    debug!(rows = df.height(), "Parsed CSV {}", path.display());
    Ok(df)
}

fn read_parquet(path: &Path) -> Result<DataFrame, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open parquet file '{}': {e}", path.display())))?;

    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| AppError::io(format!("Failed to read parquet file '{}': {e}", path.display())))?;

    debug!("Parquet schema: {:?}", df.schema());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::column_names;
    use crate::error::ErrorKind;

    #[test]
    fn unknown_extension_is_rejected() {
        let err = read_table(Path::new("sales.xlsx")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        let err = read_table(Path::new("sales")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn format_detection_ignores_case() {
        assert_eq!(FileFormat::from_path(Path::new("a/B.CSV")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("x.pq")).unwrap(), FileFormat::Parquet);
    }

    #[test]
    fn csv_columns_are_text_and_blanks_are_null() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Date,Store_ID,quantity").unwrap();
        writeln!(file, "2024-01-01,s1,").unwrap();
        writeln!(file, "2024-01-02,s2,3").unwrap();
        file.flush().unwrap();

        let df = read_table(file.path()).unwrap();
        assert_eq!(column_names(&df), ["Date", "Store_ID", "quantity"]);
        assert_eq!(df.height(), 2);

        let qty = df.column("quantity").unwrap();
        assert_eq!(qty.dtype(), &DataType::String);
        assert_eq!(qty.null_count(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("absent.parquet")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}

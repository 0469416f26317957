//! Cleaning and canonical transformations.
//!
//! Row-level data problems (unparseable dates, missing or negative quantity and
//! price, missing customer ids) never raise: offending rows are dropped and the
//! drop count is logged. Only a missing required column is fatal.

use polars::prelude::*;
use tracing::info;

use crate::domain::{CUSTOMERS_REQUIRED, DAILY_STORE_SALES_COLUMNS, SALES_REQUIRED, column_names, require_columns};
use crate::error::AppError;

/// Trim and lowercase every column name.
pub fn normalize_column_names(df: &DataFrame) -> Result<DataFrame, AppError> {
    let names: Vec<String> = column_names(df)
        .iter()
        .map(|name| name.trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect();
    let mut out = df.clone();
    out.set_column_names(names)
        .map_err(|e| AppError::schema(format!("Column names collide after normalization: {e}")))?;
    Ok(out)
}

/// Expression turning column `name` into a `Date`.
///
/// Text is parsed leniently (unparseable values become null); dates pass
/// through; timestamps are truncated to their day.
pub fn date_expr(df: &DataFrame, name: &str) -> Result<Expr, AppError> {
    let expr = match df.column(name)?.dtype() {
        DataType::Date => col(name),
        DataType::String => col(name).str().to_date(StrptimeOptions {
            strict: false,
            ..Default::default()
        }),
        _ => col(name).cast(DataType::Date),
    };
    Ok(expr)
}

/// Validate, coerce, and filter raw sales; derive `revenue`.
///
/// Null `store_id`/`product_id` values stay null and act as their own key
/// downstream. Columns beyond the required ones (e.g. `customer_id`) are kept.
pub fn clean_sales(raw: &DataFrame) -> Result<DataFrame, AppError> {
    let df = normalize_column_names(raw)?;
    require_columns(&df, "Sales", &SALES_REQUIRED)?;

    let mut casts = vec![
        date_expr(&df, "date")?,
        col("store_id").cast(DataType::String),
        col("product_id").cast(DataType::String),
        col("quantity").cast(DataType::Float64),
        col("price").cast(DataType::Float64),
    ];
    if df.get_column_index("customer_id").is_some() {
        casts.push(col("customer_id").cast(DataType::String));
    }

    let cleaned = df
        .clone()
        .lazy()
        .with_columns(casts)
        .filter(
            col("date")
                .is_not_null()
                .and(col("quantity").is_not_null())
                .and(col("price").is_not_null())
                .and(col("quantity").gt_eq(lit(0.0)))
                .and(col("price").gt_eq(lit(0.0))),
        )
        .with_column((col("quantity") * col("price")).alias("revenue"))
        .collect()?;

    info!(
        rows = cleaned.height(),
        dropped = df.height() - cleaned.height(),
        "Cleaned sales data"
    );
    Ok(cleaned)
}

/// Validate and coerce raw customers; drop rows without a `customer_id`.
///
/// Columns other than the required ones pass through untouched.
pub fn clean_customers(raw: &DataFrame) -> Result<DataFrame, AppError> {
    let df = normalize_column_names(raw)?;
    require_columns(&df, "Customers", &CUSTOMERS_REQUIRED)?;

    let cleaned = df
        .clone()
        .lazy()
        .with_columns([col("customer_id").cast(DataType::String), date_expr(&df, "signup_date")?])
        .filter(col("customer_id").is_not_null())
        .collect()?;

    info!(
        rows = cleaned.height(),
        dropped = df.height() - cleaned.height(),
        "Cleaned customers data"
    );
    Ok(cleaned)
}

/// Coerce a daily-sales frame read back from disk (CSV columns arrive as
/// text) to the types the model stages expect.
pub fn coerce_daily_store_sales(raw: &DataFrame) -> Result<DataFrame, AppError> {
    let df = normalize_column_names(raw)?;
    require_columns(&df, "Daily store sales", &DAILY_STORE_SALES_COLUMNS)?;

    let typed = df
        .clone()
        .lazy()
        .with_columns([
            date_expr(&df, "date")?,
            col("store_id").cast(DataType::String),
            col("qty_sum").cast(DataType::Float64),
            col("rev_sum").cast(DataType::Float64),
            col("num_txn").cast(DataType::Int64),
        ])
        .collect()?;
    Ok(typed)
}

//! Pipeline entities and their frame layouts.
//!
//! Stages hand `polars` frames to each other. The typed rows here exist for
//! the one stage that steps through history row by row (the forecast) and for
//! rebuilding a frame from its output.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const SALES_REQUIRED: [&str; 5] = ["date", "store_id", "product_id", "quantity", "price"];
pub const CUSTOMERS_REQUIRED: [&str; 2] = ["customer_id", "signup_date"];
pub const DAILY_STORE_SALES_COLUMNS: [&str; 5] = ["date", "store_id", "qty_sum", "rev_sum", "num_txn"];
pub const CUSTOMER_FEATURE_COLUMNS: [&str; 4] = [
    "customer_num_txn",
    "customer_ltv",
    "customer_avg_basket",
    "customer_last_purchase_date",
];
pub const FORECAST_COLUMNS: [&str; 3] = ["store_id", "date", "rev_fcst"];

/// `num_days_from_ce` of 1970-01-01, the origin of the polars `Date` type.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_FROM_CE)?)
}

/// Build a `Date` column; `None` becomes null.
pub fn date_column(name: &str, dates: &[Option<NaiveDate>]) -> Result<Column, AppError> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_days)).collect();
    Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|n| n.to_string()).collect()
}

/// Fail with a schema error naming every required column `df` lacks.
pub fn require_columns(df: &DataFrame, dataset: &str, required: &[&str]) -> Result<(), AppError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| df.get_column_index(c).is_none())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AppError::schema(format!(
        "{dataset} dataset missing required columns: {}",
        missing.join(", ")
    )))
}

pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, AppError> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, AppError> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    Ok(series.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Read a `Date` column. Any other dtype is a schema error; parse text dates
/// during cleaning instead.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, AppError> {
    let column = df.column(name)?;
    if column.dtype() != &DataType::Date {
        return Err(AppError::schema(format!(
            "Column `{name}` holds {} values, expected dates",
            column.dtype()
        )));
    }
    let days = column.as_materialized_series().cast(&DataType::Int32)?;
    Ok(days.i32()?.into_iter().map(|d| d.and_then(days_to_date)).collect())
}

/// One row per `(date, store_id)`.
///
/// `store_id` is `None` for sales whose store was null; those form their own
/// store rather than being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStoreSales {
    pub date: NaiveDate,
    pub store_id: Option<String>,
    pub qty_sum: f64,
    pub rev_sum: f64,
    pub num_txn: i64,
}

impl DailyStoreSales {
    /// Read typed rows out of a daily-sales frame.
    ///
    /// Rows with a null date are skipped; null measures read as 0.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<DailyStoreSales>, AppError> {
        require_columns(df, "Daily store sales", &DAILY_STORE_SALES_COLUMNS)?;
        let dates = date_values(df, "date")?;
        let stores = str_values(df, "store_id")?;
        let qty = f64_values(df, "qty_sum")?;
        let rev = f64_values(df, "rev_sum")?;
        let txn = f64_values(df, "num_txn")?;

        Ok(dates
            .into_iter()
            .zip(stores)
            .zip(qty.into_iter().zip(rev).zip(txn))
            .filter_map(|((date, store_id), ((qty, rev), txn))| {
                Some(DailyStoreSales {
                    date: date?,
                    store_id,
                    qty_sum: qty.unwrap_or(0.0),
                    rev_sum: rev.unwrap_or(0.0),
                    num_txn: txn.unwrap_or(0.0) as i64,
                })
            })
            .collect())
    }

    pub fn to_frame(rows: &[DailyStoreSales]) -> Result<DataFrame, AppError> {
        let dates: Vec<Option<NaiveDate>> = rows.iter().map(|r| Some(r.date)).collect();
        Ok(DataFrame::new(vec![
            date_column("date", &dates)?,
            Column::new("store_id".into(), rows.iter().map(|r| r.store_id.clone()).collect::<Vec<_>>()),
            Column::new("qty_sum".into(), rows.iter().map(|r| r.qty_sum).collect::<Vec<_>>()),
            Column::new("rev_sum".into(), rows.iter().map(|r| r.rev_sum).collect::<Vec<_>>()),
            Column::new("num_txn".into(), rows.iter().map(|r| r.num_txn).collect::<Vec<_>>()),
        ])?)
    }
}

/// One forecast step for one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub store_id: Option<String>,
    pub date: NaiveDate,
    pub rev_fcst: f64,
}

impl ForecastRow {
    /// Exactly `store_id`, `date`, `rev_fcst`, in that order.
    pub fn to_frame(rows: &[ForecastRow]) -> Result<DataFrame, AppError> {
        let dates: Vec<Option<NaiveDate>> = rows.iter().map(|r| Some(r.date)).collect();
        Ok(DataFrame::new(vec![
            Column::new("store_id".into(), rows.iter().map(|r| r.store_id.clone()).collect::<Vec<_>>()),
            date_column("date", &dates)?,
            Column::new("rev_fcst".into(), rows.iter().map(|r| r.rev_fcst).collect::<Vec<_>>()),
        ])?)
    }
}

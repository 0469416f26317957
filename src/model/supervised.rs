//! Lagged-feature supervised dataset.

use nalgebra::{DMatrix, DVector};
use polars::prelude::*;

use crate::domain::{DAILY_STORE_SALES_COLUMNS, f64_values, require_columns};
use crate::error::AppError;

pub const FEATURE_COLUMNS: [&str; 4] = ["rev_lag1", "rev_lag7", "qty_lag1", "num_txn"];
pub const TARGET_COLUMN: &str = "rev_sum";

/// Longest lag used by the feature set; rows with fewer prior rows in their
/// store are cold starts.
pub const MAX_LAG: i64 = 7;

/// Features `X`, target `y`, and the column names of `X` in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisedSet {
    pub features: DMatrix<f64>,
    pub target: DVector<f64>,
    pub feature_columns: Vec<String>,
}

impl SupervisedSet {
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// Add the lag columns to a daily-sales frame and drop cold-start rows.
///
/// Rows are sorted by `(store_id, date)` and lags are taken by row offset
/// within each store (never across stores): `rev_lag1` and `qty_lag1` from the
/// previous row, `rev_lag7` from seven rows back.
pub fn lagged_frame(daily: &DataFrame) -> Result<DataFrame, AppError> {
    require_columns(daily, "Daily store sales", &DAILY_STORE_SALES_COLUMNS)?;

    let lagged = daily
        .clone()
        .lazy()
        .sort(["store_id", "date"], SortMultipleOptions::default())
        .with_columns([
            col("rev_sum").shift(lit(1i64)).over([col("store_id")]).alias("rev_lag1"),
            col("rev_sum").shift(lit(MAX_LAG)).over([col("store_id")]).alias("rev_lag7"),
            col("qty_sum").shift(lit(1i64)).over([col("store_id")]).alias("qty_lag1"),
        ])
        .filter(
            col("rev_lag1")
                .is_not_null()
                .and(col("rev_lag7").is_not_null())
                .and(col("qty_lag1").is_not_null()),
        )
        .collect()?;
    Ok(lagged)
}

/// Build `(X, y)` for next-day revenue from a daily-sales frame.
///
/// A null `num_txn` or target reads as 0.
pub fn prepare_supervised(daily: &DataFrame) -> Result<SupervisedSet, AppError> {
    let lagged = lagged_frame(daily)?;
    let n = lagged.height();

    let columns = FEATURE_COLUMNS
        .iter()
        .map(|name| f64_values(&lagged, name))
        .collect::<Result<Vec<_>, AppError>>()?;
    let features = DMatrix::from_fn(n, FEATURE_COLUMNS.len(), |i, j| columns[j][i].unwrap_or(0.0));
    let target: Vec<f64> = f64_values(&lagged, TARGET_COLUMN)?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();

    Ok(SupervisedSet {
        features,
        target: DVector::from_vec(target),
        feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::DailyStoreSales;

    fn series(store: &str, revs: &[f64]) -> Vec<DailyStoreSales> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        revs.iter()
            .enumerate()
            .map(|(i, &rev)| DailyStoreSales {
                date: start + chrono::Duration::days(i as i64),
                store_id: Some(store.to_string()),
                qty_sum: rev / 10.0,
                rev_sum: rev,
                num_txn: i as i64 + 1,
            })
            .collect()
    }

    fn frame(rows: &[DailyStoreSales]) -> DataFrame {
        DailyStoreSales::to_frame(rows).unwrap()
    }

    #[test]
    fn cold_start_rows_are_dropped() {
        let daily = frame(&series("s1", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]));
        let set = prepare_supervised(&daily).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.feature_columns, vec!["rev_lag1", "rev_lag7", "qty_lag1", "num_txn"]);

        // First usable row is day 8 (rev 8): lag1 = 7, lag7 = 1, qty_lag1 = 0.7, txn = 8.
        assert_eq!(set.features[(0, 0)], 7.0);
        assert_eq!(set.features[(0, 1)], 1.0);
        assert!((set.features[(0, 2)] - 0.7).abs() < 1e-12);
        assert_eq!(set.features[(0, 3)], 8.0);
        assert_eq!(set.target[0], 8.0);
    }

    #[test]
    fn lags_never_cross_store_boundaries() {
        let mut rows = series("b", &[100.0; 8]);
        rows.extend(series("a", &[1.0; 8]));
        let set = prepare_supervised(&frame(&rows)).unwrap();

        // One row per store (the eighth day), stores ordered a then b.
        assert_eq!(set.len(), 2);
        assert_eq!(set.features[(0, 0)], 1.0);
        assert_eq!(set.features[(1, 1)], 100.0);
    }

    #[test]
    fn unsorted_input_is_ordered_before_lagging() {
        let mut rows = series("s1", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        rows.reverse();
        let set = prepare_supervised(&frame(&rows)).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.target[0], 8.0);
        assert_eq!(set.features[(0, 1)], 1.0);
    }

    #[test]
    fn short_history_yields_empty_set() {
        let set = prepare_supervised(&frame(&series("s1", &[1.0, 2.0]))).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.features.ncols(), 4);
    }

    #[test]
    fn missing_daily_columns_are_a_schema_error() {
        let df = df!("date" => &["2024-01-01"]).unwrap();
        let err = prepare_supervised(&df).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
    }
}

//! Feature engineering: daily store aggregates, customer lifetime features, and
//! gap filling for per-group daily series.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, info};

use crate::domain::{column_names, date_column, date_values, require_columns};
use crate::error::AppError;

/// Aggregate cleaned sales into one row per `(date, store_id)`.
///
/// Output is sorted by `(store_id, date)`; the modeling stage relies on that
/// order. Dates with no sales for a store are not fabricated here.
pub fn daily_store_sales(sales: &DataFrame) -> Result<DataFrame, AppError> {
    require_columns(sales, "Sales", &["date", "store_id", "quantity", "revenue"])?;

    let daily = sales
        .clone()
        .lazy()
        .group_by([col("date"), col("store_id")])
        .agg([
            col("quantity").sum().alias("qty_sum"),
            col("revenue").sum().alias("rev_sum"),
            len().cast(DataType::Int64).alias("num_txn"),
        ])
        .sort(["store_id", "date"], SortMultipleOptions::default())
        .collect()?;

    debug!(rows = daily.height(), "Aggregated daily store sales");
    Ok(daily)
}

/// Per-customer transaction count, lifetime value, average basket, and last
/// purchase date, left-joined onto the cleaned customers frame.
///
/// Every customer row is kept exactly once and in its original order.
/// Customers without sales get zeros (and no last purchase date). When the
/// sales data has no `customer_id` column at all, every customer gets zeros
/// without attempting a join.
pub fn customer_features(sales: &DataFrame, customers: &DataFrame) -> Result<DataFrame, AppError> {
    require_columns(customers, "Customers", &["customer_id"])?;

    if sales.get_column_index("customer_id").is_none() {
        info!("Sales data has no customer_id column; customer features are zero-filled");
        let zeroed = customers
            .clone()
            .lazy()
            .with_columns([
                lit(0i64).alias("customer_num_txn"),
                lit(0.0).alias("customer_ltv"),
                lit(0.0).alias("customer_avg_basket"),
                lit(NULL).cast(DataType::Date).alias("customer_last_purchase_date"),
            ])
            .collect()?;
        return Ok(zeroed);
    }

    let per_customer = sales
        .clone()
        .lazy()
        .filter(col("customer_id").is_not_null())
        .with_column(col("customer_id").cast(DataType::String))
        .group_by([col("customer_id")])
        .agg([
            len().cast(DataType::Int64).alias("customer_num_txn"),
            col("revenue").sum().alias("customer_ltv"),
            col("revenue").mean().alias("customer_avg_basket"),
            col("date").max().alias("customer_last_purchase_date"),
        ]);

    const ROW: &str = "__customer_row";
    let joined = customers
        .clone()
        .lazy()
        .with_row_index(ROW, None)
        .with_column(col("customer_id").cast(DataType::String))
        .join(
            per_customer,
            [col("customer_id")],
            [col("customer_id")],
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([
            col("customer_num_txn").fill_null(lit(0i64)),
            col("customer_ltv").fill_null(lit(0.0)),
            col("customer_avg_basket").fill_null(lit(0.0)),
        ])
        .sort([ROW], SortMultipleOptions::default())
        .collect()?
        .drop(ROW)?;

    info!(rows = joined.height(), "Built customer features");
    Ok(joined)
}

/// Make every group's daily series contiguous over the global date range.
///
/// The range runs from the earliest to the latest date in `date_col` across
/// all groups. Inserted rows carry the previous row's values within the group;
/// `value_cols` still missing after that (days before a group's first
/// observation) become zero. Rows with a null date are dropped.
pub fn fill_missing_time_series(
    df: &DataFrame,
    group_key: &str,
    date_col: &str,
    value_cols: &[&str],
) -> Result<DataFrame, AppError> {
    let mut required = vec![group_key, date_col];
    required.extend_from_slice(value_cols);
    require_columns(df, "Time series", &required)?;

    let dates: Vec<NaiveDate> = date_values(df, date_col)?.into_iter().flatten().collect();
    let (Some(first), Some(last)) = (dates.iter().min().copied(), dates.iter().max().copied()) else {
        return Ok(df.clone());
    };
    let range: Vec<Option<NaiveDate>> = first.iter_days().take_while(|d| *d <= last).map(Some).collect();
    let calendar = DataFrame::new(vec![date_column(date_col, &range)?])?;

    let names = column_names(df);
    let mut fills: Vec<Expr> = Vec::new();
    for name in names.iter().filter(|n| n.as_str() != date_col) {
        let mut expr = col(name.as_str()).forward_fill(None);
        if name.as_str() == group_key {
            // Leading inserted rows have no earlier row to copy the key from.
            expr = expr.backward_fill(None);
        } else if value_cols.contains(&name.as_str()) {
            let dtype = df.column(name)?.dtype().clone();
            if dtype != DataType::Date {
                expr = expr.fill_null(lit(0).cast(dtype));
            }
        }
        fills.push(expr.alias(name.as_str()));
    }
    let order: Vec<Expr> = names.iter().map(|n| col(n.as_str())).collect();

    let mut filled: Option<DataFrame> = None;
    for group in df.partition_by([group_key], true)? {
        let group = calendar
            .clone()
            .lazy()
            .join(
                group.lazy(),
                [col(date_col)],
                [col(date_col)],
                JoinArgs::new(JoinType::Left),
            )
            .sort([date_col], SortMultipleOptions::default())
            .with_columns(fills.clone())
            .select(order.clone())
            .collect()?;
        match filled.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&group)?;
            }
            None => filled = Some(group),
        }
    }

    let Some(filled) = filled else {
        return Ok(df.clone());
    };
    let out = filled
        .lazy()
        .sort([group_key, date_col], SortMultipleOptions::default())
        .collect()?;

    debug!(inserted = out.height().saturating_sub(df.height()), rows = out.height(), "Filled missing days");
    Ok(out)
}

/// Gap-fill a daily store series over the global date range.
pub fn fill_daily_gaps(daily: &DataFrame) -> Result<DataFrame, AppError> {
    fill_missing_time_series(daily, "store_id", "date", &["qty_sum", "rev_sum", "num_txn"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DAILY_STORE_SALES_COLUMNS, DailyStoreSales, f64_values, str_values};
    use crate::transform::{clean_customers, clean_sales};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sales(rows: &[(&str, &str, f64, f64, Option<&str>)]) -> DataFrame {
        let raw = df!(
            "date" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "store_id" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "product_id" => vec!["p1"; rows.len()],
            "quantity" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            "price" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            "customer_id" => rows.iter().map(|r| r.4).collect::<Vec<_>>(),
        )
        .unwrap();
        clean_sales(&raw).unwrap()
    }

    fn customers(ids: &[&str]) -> DataFrame {
        let raw = df!(
            "customer_id" => ids,
            "signup_date" => vec!["2024-01-01"; ids.len()],
        )
        .unwrap();
        clean_customers(&raw).unwrap()
    }

    fn daily_row(day: u32, store: &str, qty: f64, rev: f64, txn: i64) -> DailyStoreSales {
        DailyStoreSales { date: d(day), store_id: Some(store.to_string()), qty_sum: qty, rev_sum: rev, num_txn: txn }
    }

    #[test]
    fn daily_sales_one_row_per_store_day_sorted() {
        let sales = sales(&[
            ("2024-01-02", "s2", 1.0, 5.0, None),
            ("2024-01-01", "s1", 1.0, 10.0, None),
            ("2024-01-02", "s1", 2.0, 12.0, None),
            ("2024-01-01", "s1", 3.0, 1.0, None),
            ("2024-01-01", "s2", 4.0, 2.0, None),
        ]);
        let daily = daily_store_sales(&sales).unwrap();
        assert_eq!(column_names(&daily), DAILY_STORE_SALES_COLUMNS);

        let rows = DailyStoreSales::from_frame(&daily).unwrap();
        let keys: Vec<(&str, NaiveDate)> =
            rows.iter().map(|r| (r.store_id.as_deref().unwrap(), r.date)).collect();
        assert_eq!(keys, vec![("s1", d(1)), ("s1", d(2)), ("s2", d(1)), ("s2", d(2))]);
        assert_eq!(rows[0], daily_row(1, "s1", 4.0, 13.0, 2));
    }

    #[test]
    fn customer_features_keep_every_customer_in_order() {
        let sales = sales(&[
            ("2024-01-01", "s1", 1.0, 10.0, Some("c1")),
            ("2024-01-03", "s1", 2.0, 5.0, Some("c1")),
            ("2024-01-02", "s1", 1.0, 7.0, None),
            ("2024-01-02", "s1", 1.0, 7.0, Some("ghost")),
        ]);
        let feats = customer_features(&sales, &customers(&["c2", "c1", "c3", "c1"])).unwrap();
        assert_eq!(feats.height(), 4);
        assert_eq!(
            column_names(&feats),
            [
                "customer_id",
                "signup_date",
                "customer_num_txn",
                "customer_ltv",
                "customer_avg_basket",
                "customer_last_purchase_date"
            ]
        );

        let ids = str_values(&feats, "customer_id").unwrap();
        assert_eq!(ids, ["c2", "c1", "c3", "c1"].map(|s| Some(s.to_string())));
        assert_eq!(f64_values(&feats, "customer_num_txn").unwrap(), [Some(0.0), Some(2.0), Some(0.0), Some(2.0)]);
        assert_eq!(f64_values(&feats, "customer_ltv").unwrap()[1], Some(20.0));
        assert_eq!(f64_values(&feats, "customer_avg_basket").unwrap()[1], Some(10.0));
        assert_eq!(f64_values(&feats, "customer_avg_basket").unwrap()[0], Some(0.0));

        let last = date_values(&feats, "customer_last_purchase_date").unwrap();
        assert_eq!(last, [None, Some(d(3)), None, Some(d(3))]);
    }

    #[test]
    fn customer_features_without_customer_column_are_zero() {
        let raw = df!(
            "date" => &["2024-01-01"],
            "store_id" => &["s1"],
            "product_id" => &["p1"],
            "quantity" => &[1.0],
            "price" => &[10.0],
        )
        .unwrap();
        let sales = clean_sales(&raw).unwrap();
        let feats = customer_features(&sales, &customers(&["c1", "c2"])).unwrap();
        assert_eq!(feats.height(), 2);
        assert_eq!(f64_values(&feats, "customer_ltv").unwrap(), [Some(0.0), Some(0.0)]);
        assert_eq!(feats.column("customer_num_txn").unwrap().dtype(), &DataType::Int64);
        assert_eq!(feats.column("customer_last_purchase_date").unwrap().null_count(), 2);
    }

    #[test]
    fn gap_fill_uses_global_range_and_forward_fills() {
        let daily = DailyStoreSales::to_frame(&[
            daily_row(1, "a", 1.0, 10.0, 1),
            daily_row(4, "a", 4.0, 40.0, 4),
            daily_row(3, "b", 3.0, 30.0, 3),
        ])
        .unwrap();
        let filled = DailyStoreSales::from_frame(&fill_daily_gaps(&daily).unwrap()).unwrap();
        assert_eq!(filled.len(), 8);

        let a: Vec<f64> = filled.iter().filter(|r| r.store_id.as_deref() == Some("a")).map(|r| r.rev_sum).collect();
        assert_eq!(a, vec![10.0, 10.0, 10.0, 40.0]);

        // Store b starts on day 3: leading days are zero-filled, trailing day carries forward.
        let b: Vec<(NaiveDate, f64, i64)> = filled
            .iter()
            .filter(|r| r.store_id.as_deref() == Some("b"))
            .map(|r| (r.date, r.rev_sum, r.num_txn))
            .collect();
        assert_eq!(b, vec![(d(1), 0.0, 0), (d(2), 0.0, 0), (d(3), 30.0, 3), (d(4), 30.0, 3)]);
    }

    #[test]
    fn gap_fill_keeps_the_null_store_as_its_own_series() {
        let mut rows = vec![daily_row(1, "a", 1.0, 10.0, 1), daily_row(3, "a", 3.0, 30.0, 3)];
        rows.push(DailyStoreSales { date: d(2), store_id: None, qty_sum: 2.0, rev_sum: 20.0, num_txn: 2 });
        let filled = fill_daily_gaps(&DailyStoreSales::to_frame(&rows).unwrap()).unwrap();
        let filled = DailyStoreSales::from_frame(&filled).unwrap();
        assert_eq!(filled.len(), 6);

        let unkeyed: Vec<f64> = filled.iter().filter(|r| r.store_id.is_none()).map(|r| r.rev_sum).collect();
        assert_eq!(unkeyed, vec![0.0, 20.0, 20.0]);
    }

    #[test]
    fn gap_fill_requires_its_columns() {
        let err = fill_missing_time_series(&customers(&["c1"]), "store_id", "signup_date", &["x"]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
    }
}

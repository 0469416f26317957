//! Autoregressive roll-forward forecast.
//!
//! One shared model serves every store; per-store dynamics enter only through
//! the lag features. Each store carries a small accumulator of its history and
//! is stepped one day at a time, feeding every prediction back in as the next
//! step's `rev_lag1`.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use polars::prelude::DataFrame;
use tracing::info;

use crate::domain::{DailyStoreSales, ForecastRow};
use crate::error::AppError;
use crate::model::train::ModelArtifact;

/// Growing per-store history.
#[derive(Debug, Clone)]
struct StoreState {
    rev: Vec<f64>,
    qty: Vec<f64>,
    txn: Vec<f64>,
    last_date: NaiveDate,
}

impl StoreState {
    fn from_history(rows: &[&DailyStoreSales]) -> Option<Self> {
        let last_date = rows.last()?.date;
        Some(Self {
            rev: rows.iter().map(|r| r.rev_sum).collect(),
            qty: rows.iter().map(|r| r.qty_sum).collect(),
            txn: rows.iter().map(|r| r.num_txn as f64).collect(),
            last_date,
        })
    }

    fn feature(&self, name: &str) -> Option<f64> {
        let rev_lag1 = self.rev.last().copied().unwrap_or(0.0);
        match name {
            "rev_lag1" => Some(rev_lag1),
            "rev_lag7" => Some(if self.rev.len() >= 7 {
                self.rev[self.rev.len() - 7]
            } else {
                rev_lag1
            }),
            "qty_lag1" => Some(self.qty.last().copied().unwrap_or(0.0)),
            "num_txn" => Some(self.txn.last().copied().unwrap_or(0.0)),
            _ => None,
        }
    }

    /// Predict the next day, append it to the history, and advance the date.
    fn step(&mut self, artifact: &ModelArtifact) -> Result<(NaiveDate, f64), AppError> {
        let features = artifact
            .feature_columns
            .iter()
            .map(|name| {
                self.feature(name)
                    .ok_or_else(|| AppError::model(format!("Model expects unknown feature `{name}`.")))
            })
            .collect::<Result<Vec<f64>, AppError>>()?;
        let yhat = artifact.model.predict(&features);

        let qty_lag1 = self.qty.last().copied().unwrap_or(0.0);
        let txn_last = self.txn.last().copied().unwrap_or(0.0);
        self.rev.push(yhat);
        self.qty.push(qty_lag1);
        self.txn.push(txn_last);
        self.last_date = self
            .last_date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::model("Forecast date overflowed the calendar."))?;

        Ok((self.last_date, yhat))
    }
}

/// Forecast `horizon_days` days of revenue past each store's last date.
///
/// Returns a `store_id, date, rev_fcst` frame with `horizon_days × stores`
/// rows, stores in ascending id order (the null store first) and dates
/// strictly increasing by one day within each store.
pub fn forecast(
    artifact: &ModelArtifact,
    recent_daily: &DataFrame,
    horizon_days: usize,
) -> Result<DataFrame, AppError> {
    let history = DailyStoreSales::from_frame(recent_daily)?;
    let rows = forecast_rows(artifact, &history, horizon_days)?;
    info!(rows = rows.len(), horizon_days, "Generated forecast");
    ForecastRow::to_frame(&rows)
}

/// Row-level roll-forward behind [`forecast`].
pub fn forecast_rows(
    artifact: &ModelArtifact,
    recent_daily: &[DailyStoreSales],
    horizon_days: usize,
) -> Result<Vec<ForecastRow>, AppError> {
    let mut by_store: BTreeMap<Option<&str>, Vec<&DailyStoreSales>> = BTreeMap::new();
    for row in recent_daily {
        by_store.entry(row.store_id.as_deref()).or_default().push(row);
    }

    let mut out = Vec::with_capacity(by_store.len() * horizon_days);
    for (store, mut history) in by_store {
        history.sort_by_key(|r| r.date);
        let Some(mut state) = StoreState::from_history(&history) else {
            continue;
        };
        for _ in 0..horizon_days {
            let (date, rev_fcst) = state.step(artifact)?;
            out.push(ForecastRow {
                store_id: store.map(str::to_string),
                date,
                rev_fcst,
            });
        }
    }
    Ok(out)
}

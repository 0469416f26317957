//! Baseline training with a held-out validation tail.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;
use crate::model::linear::{LinearModel, mean_absolute_error};
use crate::model::supervised::{TARGET_COLUMN, prepare_supervised};

/// A trained regressor bound to the feature and target names it was fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: LinearModel,
    pub feature_columns: Vec<String>,
    pub target_column: String,
    pub train_rows: usize,
    /// Report-only; never gates anything.
    pub validation_mae: Option<f64>,
}

/// Split point for a tail of `validation_days` rows: `max(1, n - validation_days)`.
///
/// The split runs over the concatenated `(store_id, date)`-sorted rows, so
/// for multi-store data the validation tail is the last rows of the last stores.
pub fn split_index(n: usize, validation_days: usize) -> usize {
    n.saturating_sub(validation_days).max(1)
}

/// Fit the lagged-feature linear baseline.
///
/// With no usable supervised rows (every store shorter than eight days) a
/// persistence model (`rev_sum = rev_lag1`) is returned instead so a forecast
/// can still be produced.
pub fn train_baseline(daily: &DataFrame, validation_days: usize) -> Result<ModelArtifact, AppError> {
    let set = prepare_supervised(daily)?;
    let n = set.len();

    if set.is_empty() {
        warn!(
            daily_rows = daily.height(),
            "No supervised rows after lag construction; falling back to a persistence model"
        );
        return Ok(ModelArtifact {
            model: LinearModel::persistence(set.feature_columns.len(), 0),
            feature_columns: set.feature_columns,
            target_column: TARGET_COLUMN.to_string(),
            train_rows: 0,
            validation_mae: None,
        });
    }

    let split = split_index(n, validation_days);
    let x_train = set.features.rows(0, split).into_owned();
    let y_train = set.target.rows(0, split).into_owned();
    let model = LinearModel::fit(&x_train, &y_train)?;

    let validation_mae = if split < n {
        let x_val = set.features.rows(split, n - split).into_owned();
        let y_val: Vec<f64> = set.target.rows(split, n - split).iter().copied().collect();
        let mae = mean_absolute_error(&model.predict_rows(&x_val), &y_val);
        if let Some(mae) = mae {
            info!(validation_rows = n - split, "Validation MAE: {mae:.4}");
        }
        mae
    } else {
        None
    };

    info!(train_rows = split, "Trained linear baseline");

    Ok(ModelArtifact {
        model,
        feature_columns: set.feature_columns,
        target_column: TARGET_COLUMN.to_string(),
        train_rows: split,
        validation_mae,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::DailyStoreSales;

    fn linear_series(days: usize) -> DataFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = (0..days)
            .map(|i| {
                let qty = 1.0 + (i % 3) as f64;
                DailyStoreSales {
                    date: start + chrono::Duration::days(i as i64),
                    store_id: Some("s1".to_string()),
                    qty_sum: qty,
                    rev_sum: qty * 10.0,
                    num_txn: 1,
                }
            })
            .collect::<Vec<_>>();
        frame(&rows)
    }

    fn frame(rows: &[DailyStoreSales]) -> DataFrame {
        DailyStoreSales::to_frame(rows).unwrap()
    }

    #[test]
    fn split_keeps_at_least_one_training_row() {
        assert_eq!(split_index(100, 28), 72);
        assert_eq!(split_index(20, 28), 1);
        assert_eq!(split_index(1, 28), 1);
        assert_eq!(split_index(5, 0), 5);
    }

    #[test]
    fn trains_with_validation_tail() {
        let artifact = train_baseline(&linear_series(60), 10).unwrap();
        // 60 days -> 53 supervised rows -> 43 train, 10 validation.
        assert_eq!(artifact.train_rows, 43);
        assert!(artifact.validation_mae.is_some());
        assert_eq!(artifact.target_column, "rev_sum");
        assert_eq!(artifact.feature_columns.len(), 4);
    }

    #[test]
    fn linear_target_is_learned_exactly() {
        // rev_sum = 2 * rev_lag1 + 5 on every row.
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rev = 1.0;
        let daily: Vec<DailyStoreSales> = (0..20)
            .map(|i| {
                let row = DailyStoreSales {
                    date: start + chrono::Duration::days(i),
                    store_id: Some("s1".to_string()),
                    qty_sum: 1.0,
                    rev_sum: rev,
                    num_txn: 1,
                };
                rev = 2.0 * rev + 5.0;
                row
            })
            .collect();
        let last_rev = daily[19].rev_sum;
        let artifact = train_baseline(&frame(&daily), 3).unwrap();
        let mae = artifact.validation_mae.unwrap();
        assert!(mae / last_rev < 1e-6, "relative MAE too large: {mae}");
    }

    #[test]
    fn short_history_falls_back_to_persistence() {
        let artifact = train_baseline(&linear_series(3), 28).unwrap();
        assert_eq!(artifact.train_rows, 0);
        assert_eq!(artifact.model, LinearModel::persistence(4, 0));
    }
}

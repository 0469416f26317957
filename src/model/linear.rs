//! Linear regression with intercept.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::solve_least_squares;

/// `y = intercept + Σ coefficients[i] * x[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit by ordinary least squares on `[1, X]`.
    pub fn fit(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Self, AppError> {
        if x.nrows() == 0 {
            return Err(AppError::model("Cannot fit a linear model on zero rows."));
        }
        if x.nrows() != y.len() {
            return Err(AppError::model(format!(
                "Feature rows ({}) and target length ({}) differ.",
                x.nrows(),
                y.len()
            )));
        }

        let design = x.clone().insert_column(0, 1.0);
        let beta = solve_least_squares(&design, y)
            .ok_or_else(|| AppError::model("Least squares solve failed (ill-conditioned design)."))?;

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        })
    }

    /// Predict `y = x[lag_index]`: a naive "same as last period" model.
    pub fn persistence(n_features: usize, lag_index: usize) -> Self {
        let mut coefficients = vec![0.0; n_features];
        if let Some(c) = coefficients.get_mut(lag_index) {
            *c = 1.0;
        }
        Self {
            intercept: 0.0,
            coefficients,
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    /// Predict every row of `x`.
    pub fn predict_rows(&self, x: &DMatrix<f64>) -> Vec<f64> {
        x.row_iter()
            .map(|row| {
                let features: Vec<f64> = row.iter().copied().collect();
                self.predict(&features)
            })
            .collect()
    }
}

/// Mean absolute error; `None` for empty input.
pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let total: f64 = predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum();
    Some(total / predicted.len() as f64)
}

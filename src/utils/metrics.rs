//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Accuracy metrics for one (column, horizon offset) cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mse: f64,
    /// Fraction, not percent.
    pub mape: f64,
    pub mae: f64,
    pub rmse: f64,
}

/// Score `predicted` against `actual`, which must be non-empty and of equal
/// length.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let mse = mse(actual, predicted);
    Ok(AccuracyMetrics {
        mse,
        mape: mape(actual, predicted),
        mae: mae(actual, predicted),
        rmse: mse.sqrt(),
    })
}

/// Mean of `err(a, p)` over paired values; NaN when `actual` is empty.
fn mean_error(actual: &[f64], predicted: &[f64], err: impl Fn(f64, f64) -> f64) -> f64 {
    if actual.is_empty() {
        return f64::NAN;
    }
    let total: f64 = actual.iter().zip(predicted).map(|(&a, &p)| err(a, p)).sum();
    total / actual.len() as f64
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_error(actual, predicted, |a, p| (a - p).abs())
}

pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_error(actual, predicted, |a, p| (a - p) * (a - p))
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Mean absolute percentage error as a fraction (0.05 is 5%).
///
/// Each denominator is floored at machine epsilon, so zeros in `actual`
/// give a large but finite value instead of infinity.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_error(actual, predicted, |a, p| (a - p).abs() / a.abs().max(f64::EPSILON))
}

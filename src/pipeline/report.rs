//! Outcome of running one predictor through an experiment.

use crate::core::{ColumnId, Tensor3};
use crate::evaluation::MetricsTable;
use crate::models::nn::TrainingHistory;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Loss curves, metrics and forecasts of one predictor, in original units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub name: String,
    pub history: TrainingHistory,
    pub metrics: MetricsTable,
    /// Inverse-scaled forecasts, `n × future_length × n_targets`.
    pub predictions: Tensor3,
    /// Inverse-scaled truth, same shape as `predictions`.
    pub actuals: Tensor3,
    /// Date of the first forecast day of each test window.
    pub forecast_dates: Vec<DateTime<Utc>>,
    pub target_columns: Vec<ColumnId>,
}

impl ExperimentReport {
    /// Predicted and actual values of `column` at `offset` across all test
    /// windows, for plotting.
    pub fn lane(&self, column: &ColumnId, offset: usize) -> Option<(Vec<f64>, Vec<f64>)> {
        let c = self.target_columns.iter().position(|id| id == column)?;
        if offset >= self.predictions.steps() {
            return None;
        }
        Some((
            self.predictions.lane(offset, c),
            self.actuals.lane(offset, c),
        ))
    }
}

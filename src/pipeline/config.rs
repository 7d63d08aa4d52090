//! Experiment configuration.

use crate::core::{ColumnId, Series};
use crate::error::{ForecastError, Result};
use crate::models::nn::TrainingConfig;
use crate::transform::{WindowSpec, DEFAULT_FEATURE_RANGE};
use serde::{Deserialize, Serialize};

/// Configuration for one forecasting experiment.
///
/// # Example
///
/// ```
/// use anofox_seqcast::core::ohlcv_columns;
/// use anofox_seqcast::pipeline::PipelineConfig;
///
/// let single = PipelineConfig::single_step();
/// assert_eq!((single.past_length, single.future_length), (22, 1));
///
/// let multi = PipelineConfig::multi_step(ohlcv_columns()).with_train_ratio(0.8);
/// assert_eq!(multi.future_length, 5);
/// assert_eq!(multi.target_columns.len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fraction of rows assigned to the training partition.
    pub train_ratio: f64,
    /// Rows of history per window.
    pub past_length: usize,
    /// Rows forecast per window.
    pub future_length: usize,
    /// Columns forecast, in output order.
    pub target_columns: Vec<ColumnId>,
    /// Target range of every column scaler.
    pub feature_range: (f64, f64),
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::single_step()
    }
}

impl PipelineConfig {
    /// One day of Close from 22 days of history.
    pub fn single_step() -> Self {
        Self {
            train_ratio: 0.7,
            past_length: 22,
            future_length: 1,
            target_columns: vec![ColumnId::close()],
            feature_range: DEFAULT_FEATURE_RANGE,
            training: TrainingConfig::default(),
        }
    }

    /// Five days of every column in `columns` from 22 days of history.
    pub fn multi_step(columns: Vec<ColumnId>) -> Self {
        Self {
            future_length: 5,
            target_columns: columns,
            ..Self::single_step()
        }
    }

    pub fn with_train_ratio(mut self, ratio: f64) -> Self {
        self.train_ratio = ratio;
        self
    }

    pub fn with_past_length(mut self, past_length: usize) -> Self {
        self.past_length = past_length;
        self
    }

    pub fn with_future_length(mut self, future_length: usize) -> Self {
        self.future_length = future_length;
        self
    }

    pub fn with_target_columns(mut self, columns: Vec<ColumnId>) -> Self {
        self.target_columns = columns;
        self
    }

    pub fn with_feature_range(mut self, range: (f64, f64)) -> Self {
        self.feature_range = range;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    /// Window geometry implied by this configuration.
    pub fn window_spec(&self) -> Result<WindowSpec> {
        WindowSpec::new(
            self.past_length,
            self.future_length,
            self.target_columns.clone(),
        )
    }

    /// Check the configuration on its own and against the columns of `series`.
    pub fn validate_for(&self, series: &Series) -> Result<()> {
        if !(0.0..=1.0).contains(&self.train_ratio) {
            return Err(ForecastError::InvalidParameter(format!(
                "train_ratio must lie in [0, 1], got {}",
                self.train_ratio
            )));
        }
        self.window_spec()?;
        self.training.validate()?;
        for column in &self.target_columns {
            series.column_index(column)?;
        }
        Ok(())
    }
}

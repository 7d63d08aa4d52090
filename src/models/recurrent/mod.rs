//! Single-step recurrent predictors.
//!
//! Both variants read the past window one step at a time and map the final
//! hidden state through `Dense(1, tanh)` to a one-day forecast of a single
//! target column.

mod lstm;
mod simple_rnn;

pub use lstm::LstmForecaster;
pub use simple_rnn::SimpleRnnForecaster;

use crate::error::{ForecastError, Result};
use crate::models::nn::OptimizerConfig;
use crate::models::traits::{Hyperparameters, PredictorConfig};

/// RMSprop with learning rate 0.001.
pub(crate) fn default_optimizer() -> OptimizerConfig {
    OptimizerConfig::rmsprop(0.001)
}

/// Single-step variants predict exactly one value per window.
pub(crate) fn check_single_step(
    name: &str,
    config: &PredictorConfig,
    hyper: &Hyperparameters,
) -> Result<()> {
    hyper.validate()?;
    if config.future_length != 1 || config.n_targets() != 1 {
        return Err(ForecastError::InvalidParameter(format!(
            "{} forecasts one step of one column, got future_length {} and {} targets",
            name,
            config.future_length,
            config.n_targets()
        )));
    }
    Ok(())
}

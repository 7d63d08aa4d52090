//! # anofox-seqcast
//!
//! Sequence-model forecasting for daily multivariate price series.
//!
//! The crate covers the whole experiment: a chronological train/test split,
//! per-column range scaling fitted on the training rows, sliding supervised
//! windows, four neural predictors (simple RNN, LSTM, encoder-decoder and
//! encoder-decoder with attention) and a per-column, per-horizon-day metrics
//! table computed in original units.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod transform;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::core::{ohlcv_columns, ColumnId, Series, SeriesBuilder, Tensor3};
    pub use crate::error::{ForecastError, Result};
    pub use crate::evaluation::{evaluate, MetricsTable};
    pub use crate::models::nn::{OptimizerConfig, TrainingConfig, TrainingHistory};
    pub use crate::models::recurrent::{LstmForecaster, SimpleRnnForecaster};
    pub use crate::models::seq2seq::{AttentionForecaster, EncoderDecoderForecaster};
    pub use crate::models::{Hyperparameters, Predictor, PredictorConfig, PredictorRegistry};
    pub use crate::pipeline::{compare, prepare, ExperimentReport, PipelineConfig};
    pub use crate::transform::{ScalerRegistry, WindowSpec};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
}

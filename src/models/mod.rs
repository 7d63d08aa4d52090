//! Sequence predictors.
//!
//! `recurrent` holds the single-step Close forecasters and `seq2seq` the
//! multi-step encoder-decoder family. Both are built on the small autodiff
//! engine in [`nn`].

mod traits;

pub mod nn;
pub mod recurrent;
pub mod seq2seq;

pub use traits::{
    BoxedPredictor, Hyperparameters, Predictor, PredictorConfig, PredictorRegistry, PredictorSpec,
};

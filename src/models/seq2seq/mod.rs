//! Multi-step encoder-decoder predictors.
//!
//! An LSTM encoder summarises the past window into its final `(h, c)`. A
//! decoder LSTM starts from that state, is fed the summary `h` at each of the
//! `future_length` steps, and a linear layer maps every decoder step to one
//! row of target columns. [`AttentionForecaster`] additionally mixes every
//! encoder step into each decoder output.

mod attention;
mod encoder_decoder;

pub use attention::AttentionForecaster;
pub use encoder_decoder::EncoderDecoderForecaster;

use crate::models::nn::{LstmState, NodeId, OptimizerConfig};

/// Adam with learning rate 0.01.
pub(crate) fn default_optimizer() -> OptimizerConfig {
    OptimizerConfig::adam(0.01)
}

/// Decoder inputs: the encoder summary repeated once per forecast step.
pub(crate) fn repeat_summary(summary: LstmState, future_length: usize) -> Vec<NodeId> {
    vec![summary.h; future_length]
}

//! Neural network internals shared by the recurrent and sequence-to-sequence
//! predictors: a reverse-mode graph over vectors, layers, optimizers and the
//! training loop.

mod activation;
mod graph;
mod layers;
mod optimizer;
mod params;
mod training;

pub use activation::Activation;
pub use graph::{Gradients, Graph, NodeId};
pub use layers::{sequence_inputs, Dense, LstmCell, LstmState, SimpleRnnCell};
pub use optimizer::{Optimizer, OptimizerConfig};
pub use params::{Param, ParamId, Parameters};
pub use training::{predict, train, SequenceNetwork, TrainingConfig, TrainingHistory};

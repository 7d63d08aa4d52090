//! Fully connected recurrent predictor.

use super::{check_single_step, default_optimizer};
use crate::core::Tensor3;
use crate::error::{ForecastError, Result};
use crate::models::nn::{
    self, sequence_inputs, Activation, Dense, Graph, NodeId, Parameters, SequenceNetwork,
    SimpleRnnCell, TrainingConfig, TrainingHistory,
};
use crate::models::traits::{Hyperparameters, Predictor, PredictorConfig};
use ndarray::ArrayView2;
use rand::Rng;

#[derive(Debug, Clone)]
struct RnnNetwork {
    params: Parameters,
    cell: SimpleRnnCell,
    head: Dense,
}

impl RnnNetwork {
    fn new<R: Rng>(config: &PredictorConfig, hyper: &Hyperparameters, rng: &mut R) -> Self {
        let mut params = Parameters::new();
        let cell = SimpleRnnCell::new(
            &mut params,
            rng,
            "rnn",
            config.n_features,
            hyper.units,
            hyper.activation,
        );
        let head = Dense::new(&mut params, rng, "head", hyper.units, 1, Activation::Tanh);
        Self {
            params,
            cell,
            head,
        }
    }
}

impl SequenceNetwork for RnnNetwork {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn forward(&self, graph: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> NodeId {
        let inputs = sequence_inputs(graph, window);
        let h = self.cell.run(graph, &inputs);
        self.head.forward(graph, h)
    }
}

/// Simple recurrent network forecasting the next value of one column.
///
/// # Example
///
/// ```
/// use anofox_seqcast::core::ColumnId;
/// use anofox_seqcast::models::recurrent::SimpleRnnForecaster;
/// use anofox_seqcast::models::{Hyperparameters, Predictor, PredictorConfig};
///
/// let config = PredictorConfig::new(22, 1, 5, vec![ColumnId::close()]).unwrap();
/// let model = SimpleRnnForecaster::new(config, Hyperparameters::simple_rnn()).unwrap();
/// assert_eq!(model.name(), "SimpleRNN");
/// ```
#[derive(Debug, Clone)]
pub struct SimpleRnnForecaster {
    config: PredictorConfig,
    hyper: Hyperparameters,
    network: Option<RnnNetwork>,
}

impl SimpleRnnForecaster {
    pub fn new(config: PredictorConfig, hyper: Hyperparameters) -> Result<Self> {
        check_single_step("SimpleRNN", &config, &hyper)?;
        Ok(Self {
            config,
            hyper,
            network: None,
        })
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }
}

impl Predictor for SimpleRnnForecaster {
    fn fit(
        &mut self,
        x: &Tensor3,
        y: &Tensor3,
        training: &TrainingConfig,
    ) -> Result<TrainingHistory> {
        self.config.check_input(x, "SimpleRNN fit input")?;
        self.config
            .check_output(y, x.n_samples(), "SimpleRNN fit target")?;

        let mut rng = training.rng();
        let mut network = RnnNetwork::new(&self.config, &self.hyper, &mut rng);
        let history = nn::train(
            &mut network,
            self.name(),
            x,
            y,
            training,
            default_optimizer(),
        )?;
        self.network = Some(network);
        Ok(history)
    }

    fn predict(&self, x: &Tensor3) -> Result<Tensor3> {
        let network = self.network.as_ref().ok_or(ForecastError::FitRequired)?;
        self.config.check_input(x, "SimpleRNN predict input")?;
        let out = nn::predict(network, x, 1, 1)?;
        self.config
            .check_output(&out, x.n_samples(), "SimpleRNN prediction")?;
        Ok(out)
    }

    fn name(&self) -> &str {
        "SimpleRNN"
    }

    fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn is_fitted(&self) -> bool {
        self.network.is_some()
    }
}

//! Encoder-decoder predictor.

use super::{default_optimizer, repeat_summary};
use crate::core::Tensor3;
use crate::error::{ForecastError, Result};
use crate::models::nn::{
    self, sequence_inputs, Activation, Dense, Graph, LstmCell, NodeId, Parameters,
    SequenceNetwork, TrainingConfig, TrainingHistory,
};
use crate::models::traits::{Hyperparameters, Predictor, PredictorConfig};
use ndarray::ArrayView2;
use rand::Rng;

#[derive(Debug, Clone)]
struct EncoderDecoderNetwork {
    params: Parameters,
    encoder: LstmCell,
    decoder: LstmCell,
    head: Dense,
    future_length: usize,
}

impl EncoderDecoderNetwork {
    fn new<R: Rng>(config: &PredictorConfig, hyper: &Hyperparameters, rng: &mut R) -> Self {
        let mut params = Parameters::new();
        let encoder = LstmCell::new(
            &mut params,
            rng,
            "encoder",
            config.n_features,
            hyper.units,
            hyper.activation,
        );
        let decoder = LstmCell::new(
            &mut params,
            rng,
            "decoder",
            hyper.units,
            hyper.units,
            hyper.activation,
        );
        let head = Dense::new(
            &mut params,
            rng,
            "head",
            hyper.units,
            config.n_targets(),
            Activation::Linear,
        );
        Self {
            params,
            encoder,
            decoder,
            head,
            future_length: config.future_length,
        }
    }
}

impl SequenceNetwork for EncoderDecoderNetwork {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn forward(&self, graph: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> NodeId {
        let inputs = sequence_inputs(graph, window);
        let initial = self.encoder.zero_state(graph);
        let (_, summary) = self.encoder.run(graph, &inputs, initial);

        let repeated = repeat_summary(summary, self.future_length);
        let (decoded, _) = self.decoder.run(graph, &repeated, summary);

        let rows: Vec<NodeId> = decoded
            .into_iter()
            .map(|h| self.head.forward(graph, h))
            .collect();
        graph.concat(&rows)
    }
}

/// Sequence-to-sequence LSTM forecasting `future_length` steps of every
/// target column.
///
/// # Example
///
/// ```
/// use anofox_seqcast::core::ohlcv_columns;
/// use anofox_seqcast::models::seq2seq::EncoderDecoderForecaster;
/// use anofox_seqcast::models::{Hyperparameters, Predictor, PredictorConfig};
///
/// let config = PredictorConfig::new(22, 5, 5, ohlcv_columns()).unwrap();
/// let model = EncoderDecoderForecaster::new(config, Hyperparameters::encoder_decoder()).unwrap();
/// assert_eq!(model.config().output_len(), 25);
/// ```
#[derive(Debug, Clone)]
pub struct EncoderDecoderForecaster {
    config: PredictorConfig,
    hyper: Hyperparameters,
    network: Option<EncoderDecoderNetwork>,
}

impl EncoderDecoderForecaster {
    pub fn new(config: PredictorConfig, hyper: Hyperparameters) -> Result<Self> {
        hyper.validate()?;
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

impl Predictor for EncoderDecoderForecaster {
    fn fit(
        &mut self,
        x: &Tensor3,
        y: &Tensor3,
        training: &TrainingConfig,
    ) -> Result<TrainingHistory> {
        self.config.check_input(x, "EncoderDecoder fit input")?;
        self.config
            .check_output(y, x.n_samples(), "EncoderDecoder fit target")?;

        let mut rng = training.rng();
        let mut network = EncoderDecoderNetwork::new(&self.config, &self.hyper, &mut rng);
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
        self.config.check_input(x, "EncoderDecoder predict input")?;
        let out = nn::predict(
            network,
            x,
            self.config.future_length,
            self.config.n_targets(),
        )?;
        self.config
            .check_output(&out, x.n_samples(), "EncoderDecoder prediction")?;
        Ok(out)
    }

    fn name(&self) -> &str {
        "EncoderDecoder"
    }

    fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn is_fitted(&self) -> bool {
        self.network.is_some()
    }
}

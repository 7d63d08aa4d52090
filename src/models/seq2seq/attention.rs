//! Encoder-decoder predictor with dot-product attention.

use super::{default_optimizer, repeat_summary};
use crate::core::Tensor3;
use crate::error::{ForecastError, Result};
use crate::models::nn::{
    self, sequence_inputs, Activation, Dense, Graph, LstmCell, NodeId, Parameters,
    SequenceNetwork, TrainingConfig, TrainingHistory,
};
use crate::models::traits::{Hyperparameters, Predictor, PredictorConfig};
use ndarray::{ArrayView1, ArrayView2, Axis};
use rand::Rng;

#[derive(Debug, Clone)]
struct AttentionNetwork {
    params: Parameters,
    encoder: LstmCell,
    decoder: LstmCell,
    head: Dense,
    future_length: usize,
}

impl AttentionNetwork {
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
        // Input is [context, decoder state].
        let head = Dense::new(
            &mut params,
            rng,
            "head",
            2 * hyper.units,
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

    /// Forward pass returning the attention weights of every decoder step
    /// alongside the stacked output.
    fn decode(&self, graph: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> (Vec<NodeId>, NodeId) {
        let inputs = sequence_inputs(graph, window);
        let initial = self.encoder.zero_state(graph);
        let (encoded, summary) = self.encoder.run(graph, &inputs, initial);

        let repeated = repeat_summary(summary, self.future_length);
        let (decoded, _) = self.decoder.run(graph, &repeated, summary);

        let mut weights = Vec::with_capacity(decoded.len());
        let mut rows = Vec::with_capacity(decoded.len());
        for h in decoded {
            let scores: Vec<NodeId> = encoded.iter().map(|&e| graph.dot(h, e)).collect();
            let scores = graph.concat(&scores);
            let attn = graph.softmax(scores);
            let context = graph.weighted_sum(attn, &encoded);
            let joined = graph.concat(&[context, h]);
            rows.push(self.head.forward(graph, joined));
            weights.push(attn);
        }
        (weights, graph.concat(&rows))
    }
}

impl SequenceNetwork for AttentionNetwork {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn forward(&self, graph: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> NodeId {
        self.decode(graph, window).1
    }
}

/// Encoder-decoder LSTM whose decoder attends over every encoder step.
#[derive(Debug, Clone)]
pub struct AttentionForecaster {
    config: PredictorConfig,
    hyper: Hyperparameters,
    network: Option<AttentionNetwork>,
}

impl AttentionForecaster {
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

    /// Attention weights over the past window for each forecast step of every
    /// input window, shaped `n × future_length × past_length`.
    pub fn attention_weights(&self, x: &Tensor3) -> Result<Tensor3> {
        let network = self.network.as_ref().ok_or(ForecastError::FitRequired)?;
        self.config.check_input(x, "Attention weights input")?;

        let mut out =
            Tensor3::with_sample_shape(self.config.future_length, self.config.past_length);
        for i in 0..x.n_samples() {
            let mut graph = Graph::new(&network.params);
            let (weights, _) = network.decode(&mut graph, x.sample(i));
            let rows: Vec<ArrayView1<'_, f64>> =
                weights.iter().map(|&w| graph.value(w).view()).collect();
            let sample = ndarray::stack(Axis(0), &rows)
                .map_err(|e| ForecastError::ComputationError(e.to_string()))?;
            out.push_sample(sample.view())?;
        }
        Ok(out)
    }
}

impl Predictor for AttentionForecaster {
    fn fit(
        &mut self,
        x: &Tensor3,
        y: &Tensor3,
        training: &TrainingConfig,
    ) -> Result<TrainingHistory> {
        self.config.check_input(x, "Attention fit input")?;
        self.config
            .check_output(y, x.n_samples(), "Attention fit target")?;

        let mut rng = training.rng();
        let mut network = AttentionNetwork::new(&self.config, &self.hyper, &mut rng);
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
        self.config.check_input(x, "Attention predict input")?;
        let out = nn::predict(
            network,
            x,
            self.config.future_length,
            self.config.n_targets(),
        )?;
        self.config
            .check_output(&out, x.n_samples(), "Attention prediction")?;
        Ok(out)
    }

    fn name(&self) -> &str {
        "Attention"
    }

    fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn is_fitted(&self) -> bool {
        self.network.is_some()
    }
}

//! Memory-gated recurrent predictor.

use super::{check_single_step, default_optimizer};
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
struct LstmNetwork {
    params: Parameters,
    cell: LstmCell,
    head: Dense,
}

impl LstmNetwork {
    fn new<R: Rng>(config: &PredictorConfig, hyper: &Hyperparameters, rng: &mut R) -> Self {
        let mut params = Parameters::new();
        let cell = LstmCell::new(
            &mut params,
            rng,
            "lstm",
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

impl SequenceNetwork for LstmNetwork {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    fn forward(&self, graph: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> NodeId {
        let inputs = sequence_inputs(graph, window);
        let initial = self.cell.zero_state(graph);
        let (_, last) = self.cell.run(graph, &inputs, initial);
        self.head.forward(graph, last.h)
    }
}

/// LSTM forecasting the next value of one column.
#[derive(Debug, Clone)]
pub struct LstmForecaster {
    config: PredictorConfig,
    hyper: Hyperparameters,
    network: Option<LstmNetwork>,
}

impl LstmForecaster {
    pub fn new(config: PredictorConfig, hyper: Hyperparameters) -> Result<Self> {
        check_single_step("LSTM", &config, &hyper)?;
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

impl Predictor for LstmForecaster {
    fn fit(
        &mut self,
        x: &Tensor3,
        y: &Tensor3,
        training: &TrainingConfig,
    ) -> Result<TrainingHistory> {
        self.config.check_input(x, "LSTM fit input")?;
        self.config.check_output(y, x.n_samples(), "LSTM fit target")?;

        let mut rng = training.rng();
        let mut network = LstmNetwork::new(&self.config, &self.hyper, &mut rng);
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
        self.config.check_input(x, "LSTM predict input")?;
        let out = nn::predict(network, x, 1, 1)?;
        self.config
            .check_output(&out, x.n_samples(), "LSTM prediction")?;
        Ok(out)
    }

    fn name(&self) -> &str {
        "LSTM"
    }

    fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn is_fitted(&self) -> bool {
        self.network.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnId;

    fn trend_windows(n: usize, past: usize, width: usize) -> (Tensor3, Tensor3) {
        let value = |i: usize| -0.8 + 1.6 * i as f64 / (n + past) as f64;
        let mut x = Vec::new();
        let mut y = Vec::new();
        for start in 0..n {
            for row in start..start + past {
                x.extend(std::iter::repeat(value(row)).take(width));
            }
            y.push(value(start + past));
        }
        (
            Tensor3::new([n, past, width], x).unwrap(),
            Tensor3::new([n, 1, 1], y).unwrap(),
        )
    }

    #[test]
    fn fits_multi_feature_windows() {
        let (x, y) = trend_windows(40, 5, 3);
        let config = PredictorConfig::new(5, 1, 3, vec![ColumnId::close()]).unwrap();
        let mut model = LstmForecaster::new(config, Hyperparameters::new(6, Activation::Tanh)).unwrap();
        let training = TrainingConfig::default()
            .with_epochs(20)
            .with_patience(20)
            .with_optimizer(nn::OptimizerConfig::rmsprop(0.01));

        let history = model.fit(&x, &y, &training).unwrap();
        assert!(history.train_loss[19] < history.train_loss[0]);

        let pred = model.predict(&x).unwrap();
        assert_eq!(pred.shape(), [40, 1, 1]);
    }

    #[test]
    fn identical_seeds_give_identical_predictions() {
        let (x, y) = trend_windows(20, 4, 1);
        let config = PredictorConfig::new(4, 1, 1, vec![ColumnId::close()]).unwrap();
        let training = TrainingConfig::default().with_epochs(3).with_seed(9);

        let run = || {
            let mut model =
                LstmForecaster::new(config.clone(), Hyperparameters::new(4, Activation::Tanh))
                    .unwrap();
            model.fit(&x, &y, &training).unwrap();
            model.predict(&x).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn rejects_several_targets() {
        let config =
            PredictorConfig::new(4, 1, 2, vec![ColumnId::close(), ColumnId::open()]).unwrap();
        assert!(LstmForecaster::new(config, Hyperparameters::lstm()).is_err());
    }
}

//! Mini-batch training with early stopping.

use crate::core::Tensor3;
use crate::error::{ForecastError, Result};
use crate::models::nn::graph::{Graph, Gradients, NodeId};
use crate::models::nn::optimizer::{Optimizer, OptimizerConfig};
use crate::models::nn::params::Parameters;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

/// Configuration for fitting a neural predictor.
///
/// # Example
///
/// ```
/// use anofox_seqcast::models::nn::TrainingConfig;
///
/// let config = TrainingConfig::default()
///     .with_epochs(10)
///     .with_patience(3)
///     .with_seed(7);
/// assert_eq!(config.batch_size, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Maximum number of passes over the training windows.
    pub epochs: usize,
    /// Windows per gradient update.
    pub batch_size: usize,
    /// Fraction of windows held out, taken from the chronological end.
    pub validation_fraction: f64,
    /// Epochs without improvement before stopping.
    pub patience: usize,
    /// Minimum decrease of the monitored loss that counts as improvement.
    pub min_delta: f64,
    /// Shuffle the training portion between epochs.
    pub shuffle: bool,
    /// Restore the weights of the best epoch once training ends.
    pub restore_best: bool,
    /// Seed for weight initialisation and shuffling.
    pub seed: Option<u64>,
    /// Optimizer override; each predictor has its own default.
    pub optimizer: Option<OptimizerConfig>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 20,
            validation_fraction: 0.2,
            patience: 5,
            min_delta: 0.0,
            shuffle: true,
            restore_best: false,
            seed: Some(42),
            optimizer: None,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_min_delta(mut self, min_delta: f64) -> Self {
        self.min_delta = min_delta;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_restore_best(mut self, restore_best: bool) -> Self {
        self.restore_best = restore_best;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn without_seed(mut self) -> Self {
        self.seed = None;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "epochs must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(ForecastError::InvalidParameter(format!(
                "validation_fraction must lie in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        if !self.min_delta.is_finite() || self.min_delta < 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "min_delta must be a non-negative number, got {}",
                self.min_delta
            )));
        }
        if let Some(optimizer) = &self.optimizer {
            optimizer.validate()?;
        }
        Ok(())
    }

    /// Build the random source used for initialisation.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Number of windows kept for training out of `n`; the rest validate.
    pub fn training_windows(&self, n: usize) -> usize {
        ((n as f64) * (1.0 - self.validation_fraction)).floor() as usize
    }
}

/// Per-epoch losses of one fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    /// Empty when no validation windows were held out.
    pub val_loss: Vec<f64>,
    /// Zero-based epoch with the lowest monitored loss.
    pub best_epoch: usize,
    pub stopped_early: bool,
}

impl TrainingHistory {
    pub fn epochs_run(&self) -> usize {
        self.train_loss.len()
    }

    /// Lowest monitored loss: validation if available, otherwise training.
    pub fn best_loss(&self) -> Option<f64> {
        let monitored = if self.val_loss.is_empty() {
            &self.train_loss
        } else {
            &self.val_loss
        };
        monitored.get(self.best_epoch).copied()
    }
}

/// A network mapping one past window to one flattened forecast.
pub trait SequenceNetwork {
    fn parameters(&self) -> &Parameters;

    fn parameters_mut(&mut self) -> &mut Parameters;

    /// Record the forward pass of a `steps × width` window and return the
    /// output node, flattened row-major.
    fn forward(&self, graph: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> NodeId;
}

/// Mean squared error of `net` over samples `indices`.
fn mean_loss<N: SequenceNetwork>(
    net: &N,
    x: &Tensor3,
    y: &Tensor3,
    indices: impl Iterator<Item = usize>,
) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for i in indices {
        let mut g = Graph::new(net.parameters());
        let out = net.forward(&mut g, x.sample(i));
        let l = g.mse(out, y.sample(i).iter().copied().collect());
        total += g.value(l)[0];
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

/// Fit `net` on aligned `x`/`y` windows.
///
/// The last `validation_fraction` of windows are held out in order; only the
/// training portion is ever shuffled.
pub fn train<N: SequenceNetwork>(
    net: &mut N,
    name: &str,
    x: &Tensor3,
    y: &Tensor3,
    config: &TrainingConfig,
    default_optimizer: OptimizerConfig,
) -> Result<TrainingHistory> {
    config.validate()?;
    let n = x.n_samples();
    if n == 0 {
        return Err(ForecastError::EmptyData);
    }
    if y.n_samples() != n {
        return Err(ForecastError::DimensionMismatch {
            expected: n,
            got: y.n_samples(),
        });
    }

    let n_train = config.training_windows(n);
    if n_train == 0 {
        let needed = (1.0 / (1.0 - config.validation_fraction)).ceil() as usize;
        return Err(ForecastError::InsufficientHistory {
            needed: needed.max(1),
            got: n,
        });
    }
    let n_val = n - n_train;
    if n_val == 0 {
        warn!(
            model = name,
            "no validation windows held out, monitoring training loss"
        );
    }

    let optimizer_config = config.optimizer.unwrap_or(default_optimizer);
    let mut optimizer = Optimizer::new(optimizer_config, net.parameters())?;
    let mut grads = Gradients::zeros_like(net.parameters());
    let mut rng = config.rng();

    info!(
        model = name,
        train_windows = n_train,
        val_windows = n_val,
        optimizer = optimizer_config.name(),
        learning_rate = optimizer_config.learning_rate(),
        "fitting"
    );

    let mut history = TrainingHistory::default();
    let mut best = f64::INFINITY;
    let mut best_params: Option<Parameters> = None;
    let mut wait = 0usize;
    let mut order: Vec<usize> = (0..n_train).collect();

    for epoch in 0..config.epochs {
        if config.shuffle {
            order.shuffle(&mut rng);
        }

        let mut epoch_loss = 0.0;
        for batch in order.chunks(config.batch_size) {
            grads.reset();
            let weight = 1.0 / batch.len() as f64;
            for &i in batch {
                let mut g = Graph::new(net.parameters());
                let out = net.forward(&mut g, x.sample(i));
                let l = g.mse(out, y.sample(i).iter().copied().collect());
                epoch_loss += g.value(l)[0];
                g.backward(l, weight, &mut grads);
            }
            optimizer.apply(net.parameters_mut(), &grads);
        }
        let train_loss = epoch_loss / n_train as f64;
        if !train_loss.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{} training loss became non-finite at epoch {}",
                name,
                epoch + 1
            )));
        }
        history.train_loss.push(train_loss);

        let monitored = if n_val > 0 {
            let val_loss = mean_loss(net, x, y, n_train..n);
            if !val_loss.is_finite() {
                return Err(ForecastError::ComputationError(format!(
                    "{} validation loss became non-finite at epoch {}",
                    name,
                    epoch + 1
                )));
            }
            history.val_loss.push(val_loss);
            val_loss
        } else {
            train_loss
        };
        trace!(
            model = name,
            epoch = epoch + 1,
            train_loss,
            monitored,
            "epoch finished"
        );

        if monitored < best - config.min_delta {
            best = monitored;
            history.best_epoch = epoch;
            wait = 0;
            if config.restore_best {
                best_params = Some(net.parameters().clone());
            }
        } else {
            wait += 1;
            if wait >= config.patience {
                history.stopped_early = true;
                warn!(
                    model = name,
                    epoch = epoch + 1,
                    best_epoch = history.best_epoch + 1,
                    "stopped early"
                );
                break;
            }
        }
    }

    if let Some(params) = best_params {
        *net.parameters_mut() = params;
    }

    info!(
        model = name,
        epochs = history.epochs_run(),
        best_loss = best,
        "fit finished"
    );
    Ok(history)
}

/// Run `net` over every sample of `x` and stack the outputs as
/// `n × steps × width`.
pub fn predict<N: SequenceNetwork>(
    net: &N,
    x: &Tensor3,
    steps: usize,
    width: usize,
) -> Result<Tensor3> {
    let mut out = Tensor3::with_sample_shape(steps, width);
    for i in 0..x.n_samples() {
        let mut g = Graph::new(net.parameters());
        let node = net.forward(&mut g, x.sample(i));
        let value = g.value(node);
        let sample = value.view().into_shape((steps, width)).map_err(|_| {
            ForecastError::DimensionMismatch {
                expected: steps * width,
                got: value.len(),
            }
        })?;
        out.push_sample(sample)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::nn::activation::Activation;
    use crate::models::nn::layers::Dense;
    use ndarray::array;

    /// Linear regression on the last step of each window.
    struct LastStep {
        params: Parameters,
        dense: Dense,
        steps: usize,
    }

    impl LastStep {
        fn new(seed: u64) -> Self {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut params = Parameters::new();
            let dense = Dense::new(&mut params, &mut rng, "out", 1, 1, Activation::Linear);
            Self {
                params,
                dense,
                steps: 3,
            }
        }
    }

    impl SequenceNetwork for LastStep {
        fn parameters(&self) -> &Parameters {
            &self.params
        }

        fn parameters_mut(&mut self) -> &mut Parameters {
            &mut self.params
        }

        fn forward(&self, graph: &mut Graph<'_>, window: ArrayView2<'_, f64>) -> NodeId {
            let last = graph.input(array![window[[self.steps - 1, 0]]]);
            self.dense.forward(graph, last)
        }
    }

    fn linear_data(n: usize) -> (Tensor3, Tensor3) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..n {
            let base = i as f64 / n as f64;
            x.extend([base - 0.2, base - 0.1, base]);
            y.push(2.0 * base - 0.5);
        }
        (
            Tensor3::new([n, 3, 1], x).unwrap(),
            Tensor3::new([n, 1, 1], y).unwrap(),
        )
    }

    #[test]
    fn learns_linear_map() {
        let (x, y) = linear_data(40);
        let mut net = LastStep::new(1);
        let config = TrainingConfig::default()
            .with_epochs(300)
            .with_batch_size(8)
            .with_patience(300);
        let history =
            train(&mut net, "last-step", &x, &y, &config, OptimizerConfig::adam(0.02)).unwrap();

        assert_eq!(history.epochs_run(), 300);
        assert_eq!(history.val_loss.len(), 300);
        assert!(history.train_loss[299] < history.train_loss[0]);
        assert!(history.best_loss().unwrap() < 1e-3);

        let pred = predict(&net, &x, 1, 1).unwrap();
        assert_eq!(pred.shape(), [40, 1, 1]);
    }

    #[test]
    fn early_stopping_halts_after_patience() {
        let (x, y) = linear_data(20);
        let mut net = LastStep::new(2);
        // Only the first epoch can clear a margin this wide.
        let config = TrainingConfig::default()
            .with_epochs(100)
            .with_patience(2)
            .with_min_delta(1e9)
            .with_optimizer(OptimizerConfig::rmsprop(0.01));
        let history = train(&mut net, "last-step", &x, &y, &config, OptimizerConfig::adam(0.01)).unwrap();

        assert!(history.stopped_early);
        assert_eq!(history.epochs_run(), 3);
        assert_eq!(history.best_epoch, 0);
    }

    #[test]
    fn seeded_training_is_reproducible() {
        let (x, y) = linear_data(30);
        let config = TrainingConfig::default().with_epochs(5).with_seed(11);
        let run = || {
            let mut net = LastStep::new(3);
            train(&mut net, "last-step", &x, &y, &config, OptimizerConfig::adam(0.01)).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn restore_best_keeps_best_weights() {
        let (x, y) = linear_data(20);
        let mut net = LastStep::new(4);
        let config = TrainingConfig::default()
            .with_epochs(30)
            .with_patience(30)
            .with_restore_best(true)
            .with_shuffle(false);
        let history = train(&mut net, "last-step", &x, &y, &config, OptimizerConfig::adam(0.5)).unwrap();

        let (_, x_val) = x.split_tail(4);
        let (_, y_val) = y.split_tail(4);
        let restored = mean_loss(&net, &x_val, &y_val, 0..4);
        let best = history.val_loss[history.best_epoch];
        assert!((restored - best).abs() < 1e-12);
    }

    #[test]
    fn rejects_too_few_windows() {
        let (x, y) = linear_data(1);
        let mut net = LastStep::new(5);
        let err = train(
            &mut net,
            "last-step",
            &x,
            &y,
            &TrainingConfig::default(),
            OptimizerConfig::adam(0.01),
        )
        .unwrap_err();
        assert_eq!(err, ForecastError::InsufficientHistory { needed: 2, got: 1 });
    }

    #[test]
    fn zero_validation_fraction_monitors_training_loss() {
        let (x, y) = linear_data(10);
        let mut net = LastStep::new(6);
        let config = TrainingConfig::default()
            .with_epochs(3)
            .with_validation_fraction(0.0);
        let history = train(&mut net, "last-step", &x, &y, &config, OptimizerConfig::adam(0.01)).unwrap();
        assert!(history.val_loss.is_empty());
        assert_eq!(history.train_loss.len(), 3);
    }

    #[test]
    fn config_validation() {
        assert!(TrainingConfig::default().validate().is_ok());
        assert!(TrainingConfig::default().with_epochs(0).validate().is_err());
        assert!(TrainingConfig::default().with_batch_size(0).validate().is_err());
        assert!(TrainingConfig::default()
            .with_validation_fraction(1.0)
            .validate()
            .is_err());
    }
}

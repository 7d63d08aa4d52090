//! Predictor trait defining the common interface for all sequence models.

use crate::core::{ColumnId, Tensor3};
use crate::error::{ForecastError, Result};
use crate::models::nn::{Activation, TrainingConfig, TrainingHistory};
use crate::transform::WindowSet;
use serde::{Deserialize, Serialize};

/// Common interface for all predictor variants.
///
/// Inputs and outputs are scaled tensors: `x` is `n × past_length × n_features`
/// and predictions are `n × future_length × n_targets`.
///
/// This trait is object-safe and can be used with `Box<dyn Predictor>`.
pub trait Predictor {
    /// Fit on aligned windows and return the per-epoch loss curves.
    fn fit(&mut self, x: &Tensor3, y: &Tensor3, training: &TrainingConfig)
        -> Result<TrainingHistory>;

    /// Predict one future window per input window.
    fn predict(&self, x: &Tensor3) -> Result<Tensor3>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Shape contract this predictor was built for.
    fn config(&self) -> &PredictorConfig;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool;
}

/// Type alias for boxed predictor trait objects.
pub type BoxedPredictor = Box<dyn Predictor>;

/// Window geometry a predictor is constructed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub past_length: usize,
    pub future_length: usize,
    /// Width of each input step.
    pub n_features: usize,
    pub target_columns: Vec<ColumnId>,
}

impl PredictorConfig {
    pub fn new(
        past_length: usize,
        future_length: usize,
        n_features: usize,
        target_columns: Vec<ColumnId>,
    ) -> Result<Self> {
        if past_length == 0 || future_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "past_length and future_length must be at least 1".to_string(),
            ));
        }
        if n_features == 0 {
            return Err(ForecastError::InvalidParameter(
                "a predictor needs at least one input feature".to_string(),
            ));
        }
        if target_columns.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "a predictor needs at least one target column".to_string(),
            ));
        }
        Ok(Self {
            past_length,
            future_length,
            n_features,
            target_columns,
        })
    }

    /// The geometry of an already built window set.
    pub fn from_windows(windows: &WindowSet) -> Result<Self> {
        Self::new(
            windows.past_length(),
            windows.future_length(),
            windows.n_features(),
            windows.target_columns.clone(),
        )
    }

    pub fn n_targets(&self) -> usize {
        self.target_columns.len()
    }

    /// Flattened length of one forecast.
    pub fn output_len(&self) -> usize {
        self.future_length * self.n_targets()
    }

    /// Check `x` is `[n, past_length, n_features]`.
    pub fn check_input(&self, x: &Tensor3, context: &str) -> Result<()> {
        let expected = [x.n_samples(), self.past_length, self.n_features];
        if x.shape() != expected {
            return Err(ForecastError::shape_mismatch(context, &expected, &x.shape()));
        }
        Ok(())
    }

    /// Check `y` is `[n, future_length, n_targets]`.
    pub fn check_output(&self, y: &Tensor3, n: usize, context: &str) -> Result<()> {
        let expected = [n, self.future_length, self.n_targets()];
        if y.shape() != expected {
            return Err(ForecastError::shape_mismatch(context, &expected, &y.shape()));
        }
        Ok(())
    }
}

/// Winning configuration for one variant, supplied by a hyperparameter search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Hidden units per recurrent layer.
    pub units: usize,
    pub activation: Activation,
}

impl Hyperparameters {
    pub fn new(units: usize, activation: Activation) -> Self {
        Self { units, activation }
    }

    /// 10 units, tanh.
    pub fn simple_rnn() -> Self {
        Self::new(10, Activation::Tanh)
    }

    /// 10 units, tanh.
    pub fn lstm() -> Self {
        Self::new(10, Activation::Tanh)
    }

    /// 100 units, elu.
    pub fn encoder_decoder() -> Self {
        Self::new(100, Activation::Elu)
    }

    /// Attention takes its width from the LSTM search and its activation
    /// from the encoder-decoder search.
    pub fn attention_from(lstm: Hyperparameters, encoder_decoder: Hyperparameters) -> Self {
        Self::new(lstm.units, encoder_decoder.activation)
    }

    pub fn validate(&self) -> Result<()> {
        if self.units == 0 {
            return Err(ForecastError::InvalidParameter(
                "units must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Named predictor factory for batch comparison.
///
/// Contains a factory building a fresh predictor for a given window geometry.
///
/// # Example
///
/// ```
/// use anofox_seqcast::core::ColumnId;
/// use anofox_seqcast::models::recurrent::LstmForecaster;
/// use anofox_seqcast::models::{Hyperparameters, PredictorConfig, PredictorSpec};
///
/// let spec = PredictorSpec::new("LSTM", |config| {
///     Ok(Box::new(LstmForecaster::new(config.clone(), Hyperparameters::lstm())?))
/// });
/// let config = PredictorConfig::new(22, 1, 5, vec![ColumnId::close()]).unwrap();
/// let model = spec.create(&config).unwrap();
/// assert!(!model.is_fitted());
/// ```
pub struct PredictorSpec {
    /// Display name of the predictor
    pub name: &'static str,
    factory: Box<dyn Fn(&PredictorConfig) -> Result<BoxedPredictor> + Send + Sync>,
}

impl PredictorSpec {
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&PredictorConfig) -> Result<BoxedPredictor> + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Box::new(factory),
        }
    }

    /// Create a new, unfitted predictor instance.
    pub fn create(&self, config: &PredictorConfig) -> Result<BoxedPredictor> {
        (self.factory)(config)
    }
}

impl std::fmt::Debug for PredictorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictorSpec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of predictor factories.
#[derive(Debug, Default)]
pub struct PredictorRegistry {
    specs: Vec<PredictorSpec>,
}

impl PredictorRegistry {
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// The two single-step variants.
    pub fn single_step(simple_rnn: Hyperparameters, lstm: Hyperparameters) -> Self {
        use crate::models::recurrent::{LstmForecaster, SimpleRnnForecaster};

        let mut registry = Self::new();
        registry.register(PredictorSpec::new("SimpleRNN", move |config| {
            Ok(Box::new(SimpleRnnForecaster::new(config.clone(), simple_rnn)?))
        }));
        registry.register(PredictorSpec::new("LSTM", move |config| {
            Ok(Box::new(LstmForecaster::new(config.clone(), lstm)?))
        }));
        registry
    }

    /// The two multi-step variants.
    pub fn multi_step(encoder_decoder: Hyperparameters, attention: Hyperparameters) -> Self {
        use crate::models::seq2seq::{AttentionForecaster, EncoderDecoderForecaster};

        let mut registry = Self::new();
        registry.register(PredictorSpec::new("EncoderDecoder", move |config| {
            Ok(Box::new(EncoderDecoderForecaster::new(
                config.clone(),
                encoder_decoder,
            )?))
        }));
        registry.register(PredictorSpec::new("Attention", move |config| {
            Ok(Box::new(AttentionForecaster::new(config.clone(), attention)?))
        }));
        registry
    }

    pub fn register(&mut self, spec: PredictorSpec) {
        self.specs.push(spec);
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PredictorSpec> {
        self.specs.iter()
    }
}

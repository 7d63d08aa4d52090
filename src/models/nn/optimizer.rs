//! Gradient-descent optimizers over a [`Parameters`] store.
//!
//! ```text
//! RMSprop: v = rho * v + (1 - rho) * g^2
//!          w = w - lr * g / (sqrt(v) + eps)
//!
//! Adam:    m = b1 * m + (1 - b1) * g
//!          v = b2 * v + (1 - b2) * g^2
//!          w = w - lr * m_hat / (sqrt(v_hat) + eps)
//! ```

use crate::error::{ForecastError, Result};
use crate::models::nn::graph::Gradients;
use crate::models::nn::params::Parameters;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Optimizer choice and hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    RmsProp {
        learning_rate: f64,
        rho: f64,
        epsilon: f64,
    },
    Adam {
        learning_rate: f64,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    },
}

impl OptimizerConfig {
    /// RMSprop with `rho = 0.9`, `epsilon = 1e-7`.
    pub fn rmsprop(learning_rate: f64) -> Self {
        OptimizerConfig::RmsProp {
            learning_rate,
            rho: 0.9,
            epsilon: 1e-7,
        }
    }

    /// Adam with `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-7`.
    pub fn adam(learning_rate: f64) -> Self {
        OptimizerConfig::Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::RmsProp { .. } => "rmsprop",
            OptimizerConfig::Adam { .. } => "adam",
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match *self {
            OptimizerConfig::RmsProp { learning_rate, .. } => learning_rate,
            OptimizerConfig::Adam { learning_rate, .. } => learning_rate,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            OptimizerConfig::RmsProp {
                learning_rate,
                rho,
                epsilon,
            } => learning_rate > 0.0 && (0.0..1.0).contains(&rho) && epsilon > 0.0,
            OptimizerConfig::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                learning_rate > 0.0
                    && (0.0..1.0).contains(&beta1)
                    && (0.0..1.0).contains(&beta2)
                    && epsilon > 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ForecastError::InvalidParameter(format!(
                "invalid {} optimizer settings: {:?}",
                self.name(),
                self
            )))
        }
    }
}

/// Optimizer state bound to one parameter layout.
#[derive(Debug, Clone)]
pub struct Optimizer {
    config: OptimizerConfig,
    first: Vec<Array2<f64>>,
    second: Vec<Array2<f64>>,
    step: u64,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig, params: &Parameters) -> Result<Self> {
        config.validate()?;
        let zeros = || {
            params
                .iter()
                .map(|p| Array2::zeros(p.values.raw_dim()))
                .collect()
        };
        Ok(Self {
            config,
            first: zeros(),
            second: zeros(),
            step: 0,
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn timestep(&self) -> u64 {
        self.step
    }

    /// Apply one update step.
    pub fn apply(&mut self, params: &mut Parameters, grads: &Gradients) {
        self.step += 1;
        match self.config {
            OptimizerConfig::RmsProp {
                learning_rate,
                rho,
                epsilon,
            } => {
                for ((p, g), v) in params.iter_mut().zip(grads.iter()).zip(&mut self.second) {
                    Zip::from(&mut p.values)
                        .and(g)
                        .and(v)
                        .for_each(|w, &gi, vi| {
                            *vi = rho * *vi + (1.0 - rho) * gi * gi;
                            *w -= learning_rate * gi / (vi.sqrt() + epsilon);
                        });
                }
            }
            OptimizerConfig::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let t = self.step as i32;
                let correction1 = 1.0 - beta1.powi(t);
                let correction2 = 1.0 - beta2.powi(t);
                let tensors = params
                    .iter_mut()
                    .zip(grads.iter())
                    .zip(self.first.iter_mut().zip(self.second.iter_mut()));
                for ((p, g), (m, v)) in tensors {
                    Zip::from(&mut p.values)
                        .and(g)
                        .and(m)
                        .and(v)
                        .for_each(|w, &gi, mi, vi| {
                            *mi = beta1 * *mi + (1.0 - beta1) * gi;
                            *vi = beta2 * *vi + (1.0 - beta2) * gi * gi;
                            let m_hat = *mi / correction1;
                            let v_hat = *vi / correction2;
                            *w -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
                        });
                }
            }
        }
    }
}

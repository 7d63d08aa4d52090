//! Utility functions shared across the crate.

pub mod metrics;

pub use metrics::{calculate_metrics, mae, mape, mse, rmse, AccuracyMetrics};

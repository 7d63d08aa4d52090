//! Experiment assembly: partition, scale, window, fit, evaluate.
//!
//! [`prepare`] performs every check that does not need a trained model, so
//! configuration errors surface before any long-running fit. A
//! [`PreparedExperiment`] can then run any number of predictors on the same
//! windows.
//!
//! # Example
//!
//! ```
//! use anofox_seqcast::core::{ColumnId, SeriesBuilder};
//! use anofox_seqcast::models::nn::TrainingConfig;
//! use anofox_seqcast::pipeline::{prepare, PipelineConfig};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let series = SeriesBuilder::new()
//!     .timestamps((0..60).map(|i| base + Duration::days(i)).collect())
//!     .column("Close", (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect())
//!     .build()
//!     .unwrap();
//!
//! let config = PipelineConfig::single_step()
//!     .with_past_length(5)
//!     .with_training(TrainingConfig::default().with_epochs(2));
//! let prepared = prepare(&series, &config).unwrap();
//! assert_eq!(prepared.test_windows().len(), prepared.partition().test.len());
//! ```

mod config;
mod report;

pub use config::PipelineConfig;
pub use report::ExperimentReport;

use crate::core::{Series, Tensor3};
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate, inverse_targets};
use crate::models::{Predictor, PredictorConfig, PredictorRegistry};
use crate::transform::{build_windows, split, Partition, ScalerRegistry, WindowSet};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Scaled, windowed data ready to be fed to predictors.
#[derive(Debug, Clone)]
pub struct PreparedExperiment {
    config: PipelineConfig,
    partition: Partition,
    scalers: ScalerRegistry,
    train_windows: WindowSet,
    test_windows: WindowSet,
    predictor_config: PredictorConfig,
}

/// Partition `series`, fit scalers on the training rows and build train and
/// test windows.
///
/// The test windows come from the test partition prefixed with the last
/// `past_length` training rows, so there is one window per test row that
/// has a full horizon ahead of it.
pub fn prepare(series: &Series, config: &PipelineConfig) -> Result<PreparedExperiment> {
    if series.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    config.validate_for(series)?;
    if series.has_missing_values() {
        return Err(ForecastError::MissingValues);
    }

    let spec = config.window_spec()?;
    let partition = split(series, config.train_ratio)?;
    if partition.train.len() < spec.min_rows() {
        return Err(ForecastError::InsufficientHistory {
            needed: spec.min_rows(),
            got: partition.train.len(),
        });
    }

    let scalers = ScalerRegistry::fit(&partition.train, config.feature_range)?;
    let scaled_train = scalers.transform_series(&partition.train)?;
    let scaled_test = scalers.transform_series(&partition.test_with_history(config.past_length)?)?;

    let train_windows = build_windows(&scaled_train, &spec)?;
    let test_windows = build_windows(&scaled_test, &spec)?;
    let predictor_config = PredictorConfig::from_windows(&train_windows)?;

    debug!(
        train_rows = partition.train.len(),
        test_rows = partition.test.len(),
        train_windows = train_windows.len(),
        test_windows = test_windows.len(),
        "prepared experiment"
    );

    Ok(PreparedExperiment {
        config: config.clone(),
        partition,
        scalers,
        train_windows,
        test_windows,
        predictor_config,
    })
}

impl PreparedExperiment {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn scalers(&self) -> &ScalerRegistry {
        &self.scalers
    }

    pub fn train_windows(&self) -> &WindowSet {
        &self.train_windows
    }

    pub fn test_windows(&self) -> &WindowSet {
        &self.test_windows
    }

    /// Geometry every predictor run on this experiment must be built for.
    pub fn predictor_config(&self) -> &PredictorConfig {
        &self.predictor_config
    }

    /// Calendar dates of the first `future_length` test rows, used to label
    /// horizon offsets.
    pub fn horizon_dates(&self) -> Vec<DateTime<Utc>> {
        self.partition
            .test
            .timestamps()
            .iter()
            .take(self.config.future_length)
            .copied()
            .collect()
    }

    /// Fit `predictor` on the training windows, predict the test windows and
    /// score the result in original units.
    pub fn run(&self, predictor: &mut dyn Predictor) -> Result<ExperimentReport> {
        self.check_predictor(predictor)?;

        let history = predictor.fit(
            &self.train_windows.x,
            &self.train_windows.y,
            &self.config.training,
        )?;
        let predictions = predictor.predict(&self.test_windows.x)?;
        if predictions.shape() != self.test_windows.y.shape() {
            return Err(ForecastError::shape_mismatch(
                predictor.name(),
                &self.test_windows.y.shape(),
                &predictions.shape(),
            ));
        }

        let targets = &self.test_windows.target_columns;
        let metrics = evaluate(&self.test_windows.y, &predictions, &self.scalers, targets)?
            .with_horizon_dates(&self.horizon_dates());

        info!(
            model = predictor.name(),
            epochs = history.epochs_run(),
            test_windows = predictions.n_samples(),
            "experiment finished"
        );

        Ok(ExperimentReport {
            name: predictor.name().to_string(),
            metrics,
            predictions: inverse_targets(&predictions, &self.scalers, targets)?,
            actuals: self.actuals()?,
            forecast_dates: self.test_windows.forecast_dates.clone(),
            target_columns: targets.clone(),
            history,
        })
    }

    /// Test targets in original units.
    pub fn actuals(&self) -> Result<Tensor3> {
        inverse_targets(
            &self.test_windows.y,
            &self.scalers,
            &self.test_windows.target_columns,
        )
    }

    fn check_predictor(&self, predictor: &dyn Predictor) -> Result<()> {
        let expected = &self.predictor_config;
        let got = predictor.config();
        if got.target_columns != expected.target_columns {
            return Err(ForecastError::InvalidParameter(format!(
                "{} targets {:?}, experiment targets {:?}",
                predictor.name(),
                got.target_columns,
                expected.target_columns
            )));
        }
        let expected_shape = [
            expected.past_length,
            expected.future_length,
            expected.n_features,
        ];
        let got_shape = [got.past_length, got.future_length, got.n_features];
        if got_shape != expected_shape {
            return Err(ForecastError::shape_mismatch(
                predictor.name(),
                &expected_shape,
                &got_shape,
            ));
        }
        Ok(())
    }
}

/// Run every predictor of `registry` on `prepared`.
///
/// All predictors are constructed before the first fit so a misconfigured
/// predictor fails before any training time is spent.
pub fn compare(
    prepared: &PreparedExperiment,
    registry: &PredictorRegistry,
) -> Result<Vec<ExperimentReport>> {
    let mut models = registry
        .iter()
        .map(|spec| spec.create(prepared.predictor_config()))
        .collect::<Result<Vec<_>>>()?;

    let mut reports = Vec::with_capacity(models.len());
    for model in &mut models {
        reports.push(prepared.run(model.as_mut())?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ohlcv_columns, ColumnId, SeriesBuilder};
    use crate::models::nn::TrainingConfig;
    use crate::models::recurrent::SimpleRnnForecaster;
    use crate::models::Hyperparameters;
    use chrono::{Duration, TimeZone};

    fn ohlcv(n: usize) -> Series {
        let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let wave = |i: usize, phase: f64| 100.0 + 10.0 * ((i as f64) * 0.2 + phase).sin();
        let mut builder =
            SeriesBuilder::new().timestamps((0..n).map(|i| base + Duration::days(i as i64)).collect());
        for (k, name) in ohlcv_columns().into_iter().enumerate() {
            builder = builder.column(name, (0..n).map(|i| wave(i, k as f64 * 0.1)).collect());
        }
        builder.build().unwrap()
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig::single_step()
            .with_past_length(4)
            .with_training(TrainingConfig::default().with_epochs(2))
    }

    #[test]
    fn prepare_builds_one_test_window_per_test_row() {
        let series = ohlcv(40);
        let prepared = prepare(&series, &small_config()).unwrap();

        assert_eq!(prepared.partition().train.len(), 28);
        assert_eq!(prepared.partition().test.len(), 12);
        assert_eq!(prepared.train_windows().len(), 28 - 4);
        assert_eq!(prepared.test_windows().len(), 12);
        assert_eq!(
            prepared.test_windows().forecast_dates[0],
            prepared.partition().test.timestamps()[0]
        );
        assert_eq!(prepared.scalers().len(), 5);
    }

    #[test]
    fn missing_values_fail_fast() {
        let series = ohlcv(40);
        let broken = series
            .map_columns(|column, values| {
                let mut v = values.to_vec();
                if column == &ColumnId::high() {
                    v[3] = f64::NAN;
                }
                Ok(v)
            })
            .unwrap();
        assert_eq!(
            prepare(&broken, &small_config()).unwrap_err(),
            ForecastError::MissingValues
        );
    }

    #[test]
    fn short_training_partition_fails_fast() {
        let series = ohlcv(30);
        let err = prepare(&series, &PipelineConfig::single_step()).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientHistory { needed: 23, got: 21 });
    }

    #[test]
    fn run_rejects_mismatched_predictor() {
        let series = ohlcv(40);
        let prepared = prepare(&series, &small_config()).unwrap();
        let other = PredictorConfig::new(6, 1, 5, vec![ColumnId::close()]).unwrap();
        let mut model = SimpleRnnForecaster::new(other, Hyperparameters::simple_rnn()).unwrap();

        assert!(matches!(
            prepared.run(&mut model),
            Err(ForecastError::ShapeMismatch { .. })
        ));
        assert!(!model.is_fitted());
    }

    #[test]
    fn run_reports_in_original_units() {
        let series = ohlcv(40);
        let prepared = prepare(&series, &small_config()).unwrap();
        let mut model = SimpleRnnForecaster::new(
            prepared.predictor_config().clone(),
            Hyperparameters::new(4, crate::models::nn::Activation::Tanh),
        )
        .unwrap();
        let report = prepared.run(&mut model).unwrap();

        assert_eq!(report.name, "SimpleRNN");
        assert_eq!(report.metrics.len(), 1);
        assert_eq!(report.predictions.shape(), [12, 1, 1]);
        let close = prepared.partition().test.column(&ColumnId::close()).unwrap();
        for (i, &v) in close.iter().enumerate() {
            assert!((report.actuals.get(i, 0, 0) - v).abs() < 1e-9);
        }
        let (pred, actual) = report.lane(&ColumnId::close(), 0).unwrap();
        assert_eq!(pred.len(), 12);
        assert_eq!(actual.len(), 12);
        assert!(report.lane(&ColumnId::open(), 0).is_none());
    }
}

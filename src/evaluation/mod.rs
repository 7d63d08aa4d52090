//! Evaluation of scaled forecasts in original units.
//!
//! Both tensors are mapped back through the fitted scaler of each target
//! column before scoring, and every `(column, horizon offset)` pair is scored
//! on its own since error grows with distance from the last observed day.

mod report;

pub use report::{MetricEntry, MetricsTable};

use crate::core::{ColumnId, Tensor3};
use crate::error::{ForecastError, Result};
use crate::transform::ScalerRegistry;
use crate::utils::metrics::calculate_metrics;
use tracing::debug;

/// Map a scaled `n × future_length × n_targets` tensor back to original units.
pub fn inverse_targets(
    scaled: &Tensor3,
    registry: &ScalerRegistry,
    target_columns: &[ColumnId],
) -> Result<Tensor3> {
    if scaled.width() != target_columns.len() {
        return Err(ForecastError::shape_mismatch(
            "inverse targets",
            &[scaled.n_samples(), scaled.steps(), target_columns.len()],
            &scaled.shape(),
        ));
    }

    let mut raw = scaled.clone();
    for (c, column) in target_columns.iter().enumerate() {
        for step in 0..scaled.steps() {
            let values = registry.inverse(&scaled.lane(step, c), column)?;
            raw.set_lane(step, c, &values)?;
        }
    }
    Ok(raw)
}

/// Score scaled predictions against scaled truth per column and offset.
///
/// # Example
///
/// ```
/// use anofox_seqcast::core::{ColumnId, SeriesBuilder, Tensor3};
/// use anofox_seqcast::evaluation::evaluate;
/// use anofox_seqcast::transform::ScalerRegistry;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let train = SeriesBuilder::new()
///     .timestamps((0..4).map(|i| base + Duration::days(i)).collect())
///     .column("Close", vec![10.0, 20.0, 30.0, 40.0])
///     .build()
///     .unwrap();
/// let registry = ScalerRegistry::fit(&train, (-1.0, 1.0)).unwrap();
///
/// let truth = Tensor3::new([2, 1, 1], vec![0.0, 1.0]).unwrap();
/// let table = evaluate(&truth, &truth, &registry, &[ColumnId::close()]).unwrap();
/// assert_eq!(table.get(&ColumnId::close(), 0).unwrap().metrics.mse, 0.0);
/// ```
pub fn evaluate(
    y_true: &Tensor3,
    y_pred: &Tensor3,
    registry: &ScalerRegistry,
    target_columns: &[ColumnId],
) -> Result<MetricsTable> {
    if y_true.shape() != y_pred.shape() {
        return Err(ForecastError::shape_mismatch(
            "evaluation",
            &y_true.shape(),
            &y_pred.shape(),
        ));
    }
    if y_true.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    let truth = inverse_targets(y_true, registry, target_columns)?;
    let pred = inverse_targets(y_pred, registry, target_columns)?;

    let future_length = y_true.steps();
    let mut entries = Vec::with_capacity(target_columns.len() * future_length);
    for (c, column) in target_columns.iter().enumerate() {
        for offset in 0..future_length {
            let metrics = calculate_metrics(&truth.lane(offset, c), &pred.lane(offset, c))?;
            entries.push(MetricEntry {
                column: column.clone(),
                offset,
                date: None,
                metrics,
            });
        }
    }

    debug!(
        windows = y_true.n_samples(),
        columns = target_columns.len(),
        future_length,
        "evaluated forecasts"
    );
    Ok(MetricsTable::new(
        target_columns.to_vec(),
        future_length,
        entries,
    ))
}

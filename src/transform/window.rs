//! Supervised window construction.
//!
//! Slices a (scaled) series into overlapping `(past, future)` pairs: the past
//! window holds every column, the future window only the target columns.
//! Offsets advance by one row and a trailing tail too short for a full pair is
//! dropped.

use crate::core::{ColumnId, Series, Tensor3};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Look-back length, horizon length and target columns of a window set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Rows of history fed to the predictor.
    pub past_length: usize,
    /// Rows to forecast.
    pub future_length: usize,
    /// Columns forming the future window, in output order.
    pub target_columns: Vec<ColumnId>,
}

impl WindowSpec {
    pub fn new(
        past_length: usize,
        future_length: usize,
        target_columns: Vec<ColumnId>,
    ) -> Result<Self> {
        if past_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "past_length must be positive".to_string(),
            ));
        }
        if future_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "future_length must be positive".to_string(),
            ));
        }
        if target_columns.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one target column is required".to_string(),
            ));
        }
        Ok(Self {
            past_length,
            future_length,
            target_columns,
        })
    }

    /// Rows needed to form a single window.
    pub fn min_rows(&self) -> usize {
        self.past_length + self.future_length
    }
}

/// Number of windows a series of `len` rows yields: `max(0, len - p - f + 1)`.
pub fn window_count(len: usize, past_length: usize, future_length: usize) -> usize {
    (len + 1).saturating_sub(past_length + future_length)
}

/// Aligned past/future tensors in increasing start-offset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSet {
    /// Past windows: `n × past_length × n_features`.
    pub x: Tensor3,
    /// Future windows: `n × future_length × n_targets`.
    pub y: Tensor3,
    /// Start offset of each window in the source series.
    pub starts: Vec<usize>,
    /// Timestamp of the first future row of each window.
    pub forecast_dates: Vec<DateTime<Utc>>,
    /// Feature columns of `x`, in order.
    pub feature_columns: Vec<ColumnId>,
    /// Target columns of `y`, in order.
    pub target_columns: Vec<ColumnId>,
}

impl WindowSet {
    pub fn len(&self) -> usize {
        self.x.n_samples()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn past_length(&self) -> usize {
        self.x.steps()
    }

    pub fn future_length(&self) -> usize {
        self.y.steps()
    }

    pub fn n_features(&self) -> usize {
        self.x.width()
    }

    pub fn n_targets(&self) -> usize {
        self.y.width()
    }
}

/// Build every complete window of `series` under `spec`.
///
/// Returns [`ForecastError::InsufficientHistory`] when no window fits, so a
/// zero-length dataset never reaches a fit call.
pub fn build_windows(series: &Series, spec: &WindowSpec) -> Result<WindowSet> {
    let n = window_count(series.len(), spec.past_length, spec.future_length);
    if n == 0 {
        return Err(ForecastError::InsufficientHistory {
            needed: spec.min_rows(),
            got: series.len(),
        });
    }

    let target_idx = spec
        .target_columns
        .iter()
        .map(|c| series.column_index(c))
        .collect::<Result<Vec<_>>>()?;

    let columns = series.values_by_column();
    let n_features = series.n_columns();
    let n_targets = target_idx.len();

    let x = Array3::from_shape_fn((n, spec.past_length, n_features), |(start, t, c)| {
        columns[c][start + t]
    });
    let y = Array3::from_shape_fn((n, spec.future_length, n_targets), |(start, t, c)| {
        columns[target_idx[c]][start + spec.past_length + t]
    });
    let starts: Vec<usize> = (0..n).collect();
    let forecast_dates = starts
        .iter()
        .map(|&start| series.timestamps()[start + spec.past_length])
        .collect();

    debug!(
        windows = n,
        past_length = spec.past_length,
        future_length = spec.future_length,
        rows = series.len(),
        "built windows"
    );

    Ok(WindowSet {
        x: Tensor3::from(x),
        y: Tensor3::from(y),
        starts,
        forecast_dates,
        feature_columns: series.columns().to_vec(),
        target_columns: spec.target_columns.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use crate::core::SeriesBuilder;
    use chrono::{Duration, TimeZone};

    fn make_series(n: usize) -> Series {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SeriesBuilder::new()
            .timestamps((0..n).map(|i| base + Duration::days(i as i64)).collect())
            .column("Open", (0..n).map(|i| i as f64).collect())
            .column("Close", (0..n).map(|i| 100.0 + i as f64).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn window_count_formula() {
        assert_eq!(window_count(10, 3, 2), 6);
        assert_eq!(window_count(5, 3, 2), 1);
        assert_eq!(window_count(4, 3, 2), 0);
        assert_eq!(window_count(0, 1, 1), 0);
    }

    #[test]
    fn builds_overlapping_windows() {
        let series = make_series(6);
        let spec = WindowSpec::new(3, 2, vec![ColumnId::close()]).unwrap();
        let windows = build_windows(&series, &spec).unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows.x.shape(), [2, 3, 2]);
        assert_eq!(windows.y.shape(), [2, 2, 1]);
        assert_eq!(windows.starts, vec![0, 1]);

        // First past window: rows 0..3, both columns.
        assert_eq!(
            windows.x.sample(0),
            array![[0.0, 100.0], [1.0, 101.0], [2.0, 102.0]]
        );
        // Future starts right after the past window ends.
        assert_eq!(windows.y.sample(0), array![[103.0], [104.0]]);
        assert_eq!(windows.y.sample(1), array![[104.0], [105.0]]);
        assert_eq!(windows.forecast_dates[0], series.timestamps()[3]);
    }

    #[test]
    fn target_order_follows_window_spec() {
        let series = make_series(4);
        let spec = WindowSpec::new(2, 1, vec![ColumnId::close(), ColumnId::open()]).unwrap();
        let windows = build_windows(&series, &spec).unwrap();
        assert_eq!(windows.y.sample(0), array![[102.0, 2.0]]);
    }

    #[test]
    fn short_series_is_insufficient_history() {
        let series = make_series(4);
        let spec = WindowSpec::new(3, 2, vec![ColumnId::close()]).unwrap();
        assert_eq!(
            build_windows(&series, &spec).unwrap_err(),
            ForecastError::InsufficientHistory { needed: 5, got: 4 }
        );
    }

    #[test]
    fn unknown_target_is_rejected() {
        let series = make_series(6);
        let spec = WindowSpec::new(2, 1, vec![ColumnId::volume()]).unwrap();
        assert!(matches!(
            build_windows(&series, &spec),
            Err(ForecastError::UnknownColumn(_))
        ));
    }

    #[test]
    fn window_geometry_is_validated() {
        assert!(WindowSpec::new(0, 1, vec![ColumnId::close()]).is_err());
        assert!(WindowSpec::new(1, 0, vec![ColumnId::close()]).is_err());
        assert!(WindowSpec::new(1, 1, vec![]).is_err());
    }
}

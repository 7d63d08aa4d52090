//! Multivariate series of time-indexed observations with named columns.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Column names of the daily price/volume records supplied by market data providers.
pub const OHLCV_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// Identifier of a named numeric field in a [`Series`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(String);

impl ColumnId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn open() -> Self {
        Self::new("Open")
    }

    pub fn high() -> Self {
        Self::new("High")
    }

    pub fn low() -> Self {
        Self::new("Low")
    }

    pub fn close() -> Self {
        Self::new("Close")
    }

    pub fn volume() -> Self {
        Self::new("Volume")
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ColumnId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The fixed Open/High/Low/Close/Volume column set, in provider order.
pub fn ohlcv_columns() -> Vec<ColumnId> {
    OHLCV_COLUMNS.iter().map(|&c| ColumnId::new(c)).collect()
}

/// An ordered, immutable sequence of observations sharing one column set.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    timestamps: Vec<DateTime<Utc>>,
    /// Values stored in column-major format: values[column][observation]
    values: Vec<Vec<f64>>,
    columns: Vec<ColumnId>,
}

/// Builder for constructing a [`Series`].
#[derive(Debug, Clone, Default)]
pub struct SeriesBuilder {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<Vec<f64>>,
    columns: Vec<ColumnId>,
}

impl SeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamps(mut self, timestamps: Vec<DateTime<Utc>>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Add a single named column.
    pub fn column(mut self, name: impl Into<ColumnId>, values: Vec<f64>) -> Self {
        self.columns.push(name.into());
        self.values.push(values);
        self
    }

    pub fn build(self) -> Result<Series> {
        Series::new(self.timestamps, self.values, self.columns)
    }
}

impl Series {
    /// Create a series from column-major values, validating timestamps and
    /// the column set.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<Vec<f64>>,
        columns: Vec<ColumnId>,
    ) -> Result<Self> {
        if timestamps.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ForecastError::TimestampError(
                "timestamps must be strictly increasing".to_string(),
            ));
        }

        if columns.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "a series needs at least one column".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column) {
                return Err(ForecastError::InvalidParameter(format!(
                    "duplicate column '{}'",
                    column
                )));
            }
        }

        if values.len() != columns.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: columns.len(),
                got: values.len(),
            });
        }
        for column in &values {
            if column.len() != timestamps.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: timestamps.len(),
                    got: column.len(),
                });
            }
        }

        Ok(Self {
            timestamps,
            values,
            columns,
        })
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of columns (features) per observation.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Position of a column in the field order.
    pub fn column_index(&self, column: &ColumnId) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| ForecastError::UnknownColumn(column.to_string()))
    }

    /// Values of a named column.
    pub fn column(&self, column: &ColumnId) -> Result<&[f64]> {
        let index = self.column_index(column)?;
        Ok(&self.values[index])
    }

    /// All values organized by column.
    pub fn values_by_column(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Get a row (observation at index across all columns).
    pub fn row(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index,
                size: self.len(),
            });
        }
        Ok(self.values.iter().map(|col| col[index]).collect())
    }

    /// Extract the contiguous rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Series> {
        if start > end {
            return Err(ForecastError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }

        Ok(Series {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self
                .values
                .iter()
                .map(|col| col[start..end].to_vec())
                .collect(),
            columns: self.columns.clone(),
        })
    }

    /// The last `n` rows.
    pub fn tail(&self, n: usize) -> Result<Series> {
        if n > self.len() {
            return Err(ForecastError::InsufficientHistory {
                needed: n,
                got: self.len(),
            });
        }
        self.slice(self.len() - n, self.len())
    }

    /// Append `other` after this series.
    ///
    /// Both series must share the same column order and `other` must start
    /// strictly after this series ends.
    pub fn concat(&self, other: &Series) -> Result<Series> {
        if self.columns != other.columns {
            return Err(ForecastError::InvalidParameter(
                "cannot concatenate series with different columns".to_string(),
            ));
        }
        if let (Some(last), Some(first)) = (self.timestamps.last(), other.timestamps.first()) {
            if first <= last {
                return Err(ForecastError::TimestampError(
                    "appended series must start after the current series ends".to_string(),
                ));
            }
        }

        let mut timestamps = Vec::with_capacity(self.len() + other.len());
        timestamps.extend_from_slice(&self.timestamps);
        timestamps.extend_from_slice(&other.timestamps);

        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| {
                let mut col = Vec::with_capacity(a.len() + b.len());
                col.extend_from_slice(a);
                col.extend_from_slice(b);
                col
            })
            .collect();

        Ok(Series {
            timestamps,
            values,
            columns: self.columns.clone(),
        })
    }

    /// Build a series with identical timestamps and columns whose values are
    /// produced column by column.
    pub fn map_columns<F>(&self, mut f: F) -> Result<Series>
    where
        F: FnMut(&ColumnId, &[f64]) -> Result<Vec<f64>>,
    {
        let values = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(id, col)| {
                let mapped = f(id, col)?;
                if mapped.len() != col.len() {
                    return Err(ForecastError::DimensionMismatch {
                        expected: col.len(),
                        got: mapped.len(),
                    });
                }
                Ok(mapped)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Series {
            timestamps: self.timestamps.clone(),
            values,
            columns: self.columns.clone(),
        })
    }

    /// Check if series has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        self.values
            .iter()
            .any(|col| col.iter().any(|v| !v.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_daily_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::days(i as i64)).collect()
    }

    fn make_series(n: usize) -> Series {
        SeriesBuilder::new()
            .timestamps(make_daily_timestamps(n))
            .column("Open", (0..n).map(|i| i as f64).collect())
            .column("Close", (0..n).map(|i| 10.0 + i as f64).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn series_constructs_from_columns() {
        let s = make_series(4);
        assert_eq!(s.len(), 4);
        assert_eq!(s.n_columns(), 2);
        assert_eq!(s.column(&ColumnId::close()).unwrap(), &[10.0, 11.0, 12.0, 13.0]);
        assert_eq!(s.row(1).unwrap(), vec![1.0, 11.0]);
    }

    #[test]
    fn series_rejects_non_increasing_timestamps() {
        let mut timestamps = make_daily_timestamps(3);
        timestamps.swap(1, 2);
        let result = SeriesBuilder::new()
            .timestamps(timestamps)
            .column("Close", vec![1.0, 2.0, 3.0])
            .build();
        assert!(matches!(result, Err(ForecastError::TimestampError(_))));
    }

    #[test]
    fn series_rejects_ragged_and_duplicate_columns() {
        let result = SeriesBuilder::new()
            .timestamps(make_daily_timestamps(3))
            .column("Close", vec![1.0, 2.0])
            .build();
        assert!(matches!(
            result,
            Err(ForecastError::DimensionMismatch { expected: 3, got: 2 })
        ));

        let result = SeriesBuilder::new()
            .timestamps(make_daily_timestamps(2))
            .column("Close", vec![1.0, 2.0])
            .column("Close", vec![1.0, 2.0])
            .build();
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));

        let result = Series::new(make_daily_timestamps(2), vec![vec![1.0, 2.0]], vec![]);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn series_slice_and_concat_round_trip() {
        let s = make_series(10);
        let head = s.slice(0, 6).unwrap();
        let rest = s.slice(6, 10).unwrap();
        assert_eq!(head.concat(&rest).unwrap(), s);
        assert_eq!(s.tail(3).unwrap(), s.slice(7, 10).unwrap());
    }

    #[test]
    fn concat_rejects_overlapping_timestamps() {
        let s = make_series(5);
        let result = s.slice(0, 3).unwrap().concat(&s.slice(2, 5).unwrap());
        assert!(matches!(result, Err(ForecastError::TimestampError(_))));
    }

    #[test]
    fn detects_missing_values() {
        let s = SeriesBuilder::new()
            .timestamps(make_daily_timestamps(3))
            .column("Close", vec![1.0, f64::NAN, 3.0])
            .build()
            .unwrap();
        assert!(s.has_missing_values());
        assert!(!make_series(3).has_missing_values());
    }

    #[test]
    fn ohlcv_column_order_is_stable() {
        let names: Vec<String> = ohlcv_columns().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["Open", "High", "Low", "Close", "Volume"]);
    }
}

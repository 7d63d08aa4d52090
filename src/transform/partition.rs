//! Chronological train/test partitioning.

use crate::core::Series;
use crate::error::{ForecastError, Result};
use tracing::debug;

/// A chronological cut of a series: `train` is a prefix, `test` the suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub train: Series,
    pub test: Series,
}

/// Rows assigned to the training prefix: `floor(ratio * len)`.
///
/// The product is taken in `f64`, so ratios without an exact binary
/// representation floor the rounded value: `0.7 * 90` evaluates to
/// `62.99999999999999` and gives 62 rows, not 63.
pub fn train_length(len: usize, ratio: f64) -> usize {
    ((ratio * len as f64).floor() as usize).min(len)
}

/// Split `series` at `floor(ratio * len)` without shuffling.
pub fn split(series: &Series, ratio: f64) -> Result<Partition> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(ForecastError::InvalidParameter(format!(
            "train ratio must lie in [0, 1], got {}",
            ratio
        )));
    }

    let cut = train_length(series.len(), ratio);
    let train = series.slice(0, cut)?;
    let test = series.slice(cut, series.len())?;
    debug!(train = train.len(), test = test.len(), ratio, "split series");

    Ok(Partition { train, test })
}

/// Prefix `test` with the last `past_length` rows of `train`.
///
/// The first window built from the result has its future window starting at
/// `test[0]`, so every test row can be predicted with a full history.
pub fn bridge(train: &Series, test: &Series, past_length: usize) -> Result<Series> {
    if past_length > train.len() {
        return Err(ForecastError::InsufficientHistory {
            needed: past_length,
            got: train.len(),
        });
    }
    train.tail(past_length)?.concat(test)
}

impl Partition {
    /// [`bridge`] applied to this partition.
    pub fn test_with_history(&self, past_length: usize) -> Result<Series> {
        bridge(&self.train, &self.test, past_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnId, SeriesBuilder};
    use chrono::{Duration, TimeZone, Utc};

    fn make_series(n: usize) -> Series {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        SeriesBuilder::new()
            .timestamps((0..n).map(|i| base + Duration::days(i as i64)).collect())
            .column("Close", (0..n).map(|i| i as f64).collect())
            .build()
            .unwrap()
    }

    #[test]
    fn train_length_floors_the_float_product() {
        assert_eq!(train_length(90, 0.7), 62);
        assert_eq!(train_length(30, 0.7), 21);
        assert_eq!(train_length(10, 1.0), 10);
        assert_eq!(train_length(10, 0.0), 0);
    }

    #[test]
    fn split_is_chronological() {
        let series = make_series(30);
        let partition = split(&series, 0.7).unwrap();

        assert_eq!(partition.train.len(), 21);
        assert_eq!(partition.test.len(), 9);
        assert_eq!(partition.train, series.slice(0, 21).unwrap());
        assert_eq!(
            partition.test.column(&ColumnId::close()).unwrap()[0],
            21.0
        );
    }

    #[test]
    fn split_extremes() {
        let series = make_series(5);
        assert_eq!(split(&series, 0.0).unwrap().train.len(), 0);
        assert_eq!(split(&series, 1.0).unwrap().test.len(), 0);
        assert!(split(&series, 1.5).is_err());
        assert!(split(&series, f64::NAN).is_err());
    }

    #[test]
    fn bridge_prepends_training_tail() {
        let series = make_series(30);
        let partition = split(&series, 0.7).unwrap();
        let bridged = partition.test_with_history(5).unwrap();

        assert_eq!(bridged.len(), 14);
        assert_eq!(bridged.column(&ColumnId::close()).unwrap()[0], 16.0);
        assert_eq!(bridged.column(&ColumnId::close()).unwrap()[5], 21.0);
    }

    #[test]
    fn bridge_needs_enough_training_rows() {
        let series = make_series(10);
        let partition = split(&series, 0.5).unwrap();
        assert_eq!(
            partition.test_with_history(6).unwrap_err(),
            ForecastError::InsufficientHistory { needed: 6, got: 5 }
        );
    }
}

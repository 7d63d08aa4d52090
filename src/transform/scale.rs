//! Min-max range scaling for a single column.
//!
//! The scaler is an affine map `x * scale + offset` fit once on training
//! values and reused unchanged for every later forward and inverse transform.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Default target range, matching the `tanh` output range of the predictors.
pub const DEFAULT_FEATURE_RANGE: (f64, f64) = (-1.0, 1.0);

/// Per-column min-max scaler with state `(data_min, data_max, feature_range)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: f64,
    data_max: f64,
    feature_range: (f64, f64),
    scale: f64,
    offset: f64,
}

impl MinMaxScaler {
    /// Fit on the given training values.
    ///
    /// A constant column cannot be stretched to the target range. It gets a
    /// unit-slope map centred on the range midpoint instead, so every training
    /// value lands on the midpoint and inverts back exactly.
    pub fn fit(values: &[f64], feature_range: (f64, f64)) -> Result<Self> {
        let (lo, hi) = feature_range;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(ForecastError::InvalidParameter(format!(
                "feature range must satisfy min < max, got ({}, {})",
                lo, hi
            )));
        }
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let data_min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let data_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let data_range = data_max - data_min;

        let (scale, offset) = if is_degenerate_range(data_min, data_max) {
            let midpoint = (lo + hi) / 2.0;
            (1.0, midpoint - data_min)
        } else {
            let scale = (hi - lo) / data_range;
            (scale, lo - data_min * scale)
        };

        Ok(Self {
            data_min,
            data_max,
            feature_range,
            scale,
            offset,
        })
    }

    pub fn data_min(&self) -> f64 {
        self.data_min
    }

    pub fn data_max(&self) -> f64 {
        self.data_max
    }

    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }

    /// Whether the training values were all equal.
    pub fn is_degenerate(&self) -> bool {
        is_degenerate_range(self.data_min, self.data_max)
    }

    /// Map one raw value into the feature range.
    ///
    /// Values outside the training extremes extrapolate along the same line.
    /// For a degenerate (constant) column the line has unit slope through the
    /// midpoint: the training constant maps to the midpoint and any other
    /// value `x` maps to `midpoint + (x - constant)`, which may leave the range.
    #[inline]
    pub fn transform_value(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            // Keep constant columns bit-exact on the midpoint.
            let midpoint = (self.feature_range.0 + self.feature_range.1) / 2.0;
            return midpoint + (x - self.data_min);
        }
        x * self.scale + self.offset
    }

    #[inline]
    pub fn inverse_value(&self, y: f64) -> f64 {
        if self.is_degenerate() {
            let midpoint = (self.feature_range.0 + self.feature_range.1) / 2.0;
            return (y - midpoint) + self.data_min;
        }
        (y - self.offset) / self.scale
    }

    /// Scale raw values into the feature range.
    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&x| self.transform_value(x)).collect()
    }

    /// Map scaled values back to original units.
    pub fn inverse(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&y| self.inverse_value(y)).collect()
    }
}

fn is_degenerate_range(min: f64, max: f64) -> bool {
    max - min <= f64::EPSILON * min.abs().max(max.abs()).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fit_maps_extremes_to_range_bounds() {
        let scaler = MinMaxScaler::fit(&[0.0, 50.0, 100.0], (-1.0, 1.0)).unwrap();
        let scaled = scaler.transform(&[0.0, 50.0, 100.0]);

        assert_relative_eq!(scaled[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(scaled[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(scaled[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn custom_range() {
        let scaler = MinMaxScaler::fit(&[10.0, 20.0, 30.0], (0.0, 1.0)).unwrap();
        assert_relative_eq!(scaler.transform_value(20.0), 0.5, epsilon = 1e-12);
        assert_eq!(scaler.feature_range(), (0.0, 1.0));
    }

    #[test]
    fn inverse_recovers_training_values() {
        let values = vec![1520.3, 1498.1, 1555.0, 1602.7, 1480.9];
        let scaler = MinMaxScaler::fit(&values, DEFAULT_FEATURE_RANGE).unwrap();
        let recovered = scaler.inverse(&scaler.transform(&values));

        for (orig, rec) in values.iter().zip(recovered.iter()) {
            assert_relative_eq!(orig, rec, max_relative = 1e-12);
        }
    }

    #[test]
    fn out_of_range_values_extrapolate_linearly() {
        let scaler = MinMaxScaler::fit(&[0.0, 10.0], (-1.0, 1.0)).unwrap();
        assert_relative_eq!(scaler.transform_value(20.0), 3.0, epsilon = 1e-12);
        assert_relative_eq!(scaler.transform_value(-10.0), -3.0, epsilon = 1e-12);
        assert_relative_eq!(scaler.inverse_value(3.0), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_column_maps_to_midpoint() {
        let values = vec![5.0; 8];
        let scaler = MinMaxScaler::fit(&values, (-1.0, 1.0)).unwrap();
        assert!(scaler.is_degenerate());

        let scaled = scaler.transform(&values);
        assert!(scaled.iter().all(|&v| v == 0.0));

        let recovered = scaler.inverse(&scaled);
        assert!(recovered.iter().all(|&v| v == 5.0));
    }

    #[test]
    fn constant_column_midpoint_of_asymmetric_range() {
        let scaler = MinMaxScaler::fit(&[3.0, 3.0], (0.0, 1.0)).unwrap();
        assert_eq!(scaler.transform_value(3.0), 0.5);
        assert_eq!(scaler.inverse_value(0.5), 3.0);
    }

    #[test]
    fn constant_column_shifts_unseen_values_with_unit_slope() {
        let scaler = MinMaxScaler::fit(&[5.0, 5.0, 5.0], (-1.0, 1.0)).unwrap();
        assert_relative_eq!(scaler.transform_value(7.5), 2.5, epsilon = 1e-12);
        assert_relative_eq!(scaler.transform_value(4.0), -1.0, epsilon = 1e-12);
        assert_relative_eq!(scaler.inverse_value(2.5), 7.5, epsilon = 1e-12);

        let unit = MinMaxScaler::fit(&[3.0, 3.0], (0.0, 1.0)).unwrap();
        assert_relative_eq!(unit.transform_value(3.25), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn fit_rejects_bad_input() {
        assert!(matches!(
            MinMaxScaler::fit(&[], (-1.0, 1.0)),
            Err(ForecastError::EmptyData)
        ));
        assert!(matches!(
            MinMaxScaler::fit(&[1.0, 2.0], (1.0, -1.0)),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(matches!(
            MinMaxScaler::fit(&[1.0, f64::NAN], (-1.0, 1.0)),
            Err(ForecastError::MissingValues)
        ));
    }
}

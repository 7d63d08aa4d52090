//! Registry of per-column scalers fit on the training partition.

use crate::core::{ColumnId, Series};
use crate::error::{ForecastError, Result};
use crate::transform::scale::MinMaxScaler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One independent [`MinMaxScaler`] per column, keyed by [`ColumnId`].
///
/// The registry is built once from training data and is read-only afterwards;
/// the same instances serve the forward transform of test data and the
/// inverse transform of predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerRegistry {
    feature_range: (f64, f64),
    scalers: BTreeMap<ColumnId, MinMaxScaler>,
}

impl ScalerRegistry {
    /// Fit one scaler per column of the training partition.
    pub fn fit(train: &Series, feature_range: (f64, f64)) -> Result<Self> {
        if train.is_empty() {
            return Err(ForecastError::EmptyData);
        }

        let mut scalers = BTreeMap::new();
        for (column, values) in train.columns().iter().zip(train.values_by_column()) {
            let scaler = MinMaxScaler::fit(values, feature_range)?;
            debug!(
                column = %column,
                min = scaler.data_min(),
                max = scaler.data_max(),
                degenerate = scaler.is_degenerate(),
                "fitted column scaler"
            );
            scalers.insert(column.clone(), scaler);
        }

        Ok(Self {
            feature_range,
            scalers,
        })
    }

    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }

    pub fn len(&self) -> usize {
        self.scalers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalers.is_empty()
    }

    pub fn contains(&self, column: &ColumnId) -> bool {
        self.scalers.contains_key(column)
    }

    /// Fitted columns in name order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnId> {
        self.scalers.keys()
    }

    /// The fitted scaler of a column.
    pub fn scaler(&self, column: &ColumnId) -> Result<&MinMaxScaler> {
        self.scalers
            .get(column)
            .ok_or_else(|| ForecastError::UnfitColumn(column.to_string()))
    }

    /// Scale one column of `series` with that column's fitted scaler.
    pub fn transform(&self, series: &Series, column: &ColumnId) -> Result<Vec<f64>> {
        let scaler = self.scaler(column)?;
        Ok(scaler.transform(series.column(column)?))
    }

    /// Scale every column of `series`.
    pub fn transform_series(&self, series: &Series) -> Result<Series> {
        series.map_columns(|column, values| Ok(self.scaler(column)?.transform(values)))
    }

    /// Map scaled values of `column` back to original units.
    pub fn inverse(&self, values: &[f64], column: &ColumnId) -> Result<Vec<f64>> {
        Ok(self.scaler(column)?.inverse(values))
    }
}

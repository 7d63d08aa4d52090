//! Per-column, per-horizon metrics table.

use crate::core::ColumnId;
use crate::utils::metrics::AccuracyMetrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Metrics of one target column at one horizon offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    pub column: ColumnId,
    /// Zero-based distance from the first forecast day.
    pub offset: usize,
    /// Calendar label of the offset, when known.
    pub date: Option<DateTime<Utc>>,
    pub metrics: AccuracyMetrics,
}

/// Metrics indexed by `(column, offset)`, column-major in target order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsTable {
    columns: Vec<ColumnId>,
    future_length: usize,
    entries: Vec<MetricEntry>,
}

impl MetricsTable {
    pub(crate) fn new(
        columns: Vec<ColumnId>,
        future_length: usize,
        entries: Vec<MetricEntry>,
    ) -> Self {
        debug_assert_eq!(entries.len(), columns.len() * future_length);
        Self {
            columns,
            future_length,
            entries,
        }
    }

    /// Attach a calendar label to each horizon offset; extra dates are ignored.
    pub fn with_horizon_dates(mut self, dates: &[DateTime<Utc>]) -> Self {
        for entry in &mut self.entries {
            entry.date = dates.get(entry.offset).copied();
        }
        self
    }

    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn future_length(&self) -> usize {
        self.future_length
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MetricEntry] {
        &self.entries
    }

    pub fn get(&self, column: &ColumnId, offset: usize) -> Option<&MetricEntry> {
        let c = self.columns.iter().position(|id| id == column)?;
        if offset >= self.future_length {
            return None;
        }
        self.entries.get(c * self.future_length + offset)
    }

    /// Entries of one column in offset order.
    pub fn for_column<'a>(&'a self, column: &'a ColumnId) -> impl Iterator<Item = &'a MetricEntry> {
        self.entries.iter().filter(move |e| &e.column == column)
    }

    /// Metrics of `column` averaged over all offsets.
    pub fn column_average(&self, column: &ColumnId) -> Option<AccuracyMetrics> {
        let cells: Vec<_> = self.for_column(column).map(|e| e.metrics).collect();
        if cells.is_empty() {
            return None;
        }
        let n = cells.len() as f64;
        let mean = |f: fn(&AccuracyMetrics) -> f64| cells.iter().map(f).sum::<f64>() / n;
        Some(AccuracyMetrics {
            mse: mean(|m| m.mse),
            mape: mean(|m| m.mape),
            mae: mean(|m| m.mae),
            rmse: mean(|m| m.rmse),
        })
    }
}

impl fmt::Display for MetricsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:<16} {:>14} {:>10} {:>12} {:>12}",
            "column", "day", "mse", "mape", "mae", "rmse"
        )?;
        for entry in &self.entries {
            let day = match entry.date {
                Some(date) => format!("Day {}", date.format("%Y-%m-%d")),
                None => format!("Day +{}", entry.offset),
            };
            writeln!(
                f,
                "{:<10} {:<16} {:>14.6} {:>10.6} {:>12.6} {:>12.6}",
                entry.column.as_str(),
                day,
                entry.metrics.mse,
                entry.metrics.mape,
                entry.metrics.mae,
                entry.metrics.rmse
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn cell(column: &str, offset: usize, mse: f64) -> MetricEntry {
        MetricEntry {
            column: ColumnId::new(column),
            offset,
            date: None,
            metrics: AccuracyMetrics {
                mse,
                mape: 0.01,
                mae: mse.sqrt(),
                rmse: mse.sqrt(),
            },
        }
    }

    fn table() -> MetricsTable {
        MetricsTable::new(
            vec![ColumnId::new("Open"), ColumnId::new("Close")],
            2,
            vec![
                cell("Open", 0, 1.0),
                cell("Open", 1, 4.0),
                cell("Close", 0, 9.0),
                cell("Close", 1, 16.0),
            ],
        )
    }

    #[test]
    fn lookup_by_column_and_offset() {
        let t = table();
        assert_eq!(t.len(), 4);
        assert_eq!(t.get(&ColumnId::close(), 1).unwrap().metrics.mse, 16.0);
        assert!(t.get(&ColumnId::close(), 2).is_none());
        assert!(t.get(&ColumnId::volume(), 0).is_none());
        assert_eq!(t.for_column(&ColumnId::open()).count(), 2);
    }

    #[test]
    fn column_average() {
        let avg = table().column_average(&ColumnId::close()).unwrap();
        assert_relative_eq!(avg.mse, 12.5);
        assert_relative_eq!(avg.rmse, 3.5);
    }

    #[test]
    fn renders_day_labels() {
        let d0 = Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap();
        let d1 = Utc.with_ymd_and_hms(2021, 3, 2, 0, 0, 0).unwrap();
        let text = table().with_horizon_dates(&[d0, d1]).to_string();
        assert!(text.contains("Day 2021-03-01"));
        assert!(text.contains("Day 2021-03-02"));
        assert_eq!(text.lines().count(), 5);

        let unlabeled = table().to_string();
        assert!(unlabeled.contains("Day +1"));
    }
}

//! Daily OHLCV records from comma-separated text.

use crate::core::{ohlcv_columns, Series};
use crate::data::MarketDataProvider;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse a `Date,Open,High,Low,Close,Volume` table.
///
/// Columns are located by header name (case-insensitive) and any other
/// column is ignored. Quoted fields may contain commas, which are read as
/// thousands separators in numeric cells. An empty cell becomes NaN so the
/// pipeline's missing-value gate can reject the series.
pub fn read_ohlcv_csv<R: Read>(reader: R) -> Result<Series> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let names: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    if names.iter().all(|h| h.is_empty()) {
        return Err(ForecastError::EmptyData);
    }
    let find = |name: &str| {
        names
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ForecastError::Parse {
                line: 1,
                message: format!("missing '{}' column", name),
            })
    };

    let date_idx = find("date").or_else(|_| find("datetime"))?;
    let columns = ohlcv_columns();
    let value_idx = columns
        .iter()
        .map(|c| find(&c.as_str().to_ascii_lowercase()))
        .collect::<Result<Vec<_>>>()?;

    let mut timestamps = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];

    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record_line(&record);
        let cell = |idx: usize| {
            record.get(idx).ok_or_else(|| ForecastError::Parse {
                line,
                message: format!("expected at least {} fields, got {}", idx + 1, record.len()),
            })
        };

        let raw_date = cell(date_idx)?;
        timestamps.push(parse_timestamp(raw_date).ok_or_else(|| ForecastError::Parse {
            line,
            message: format!("unrecognised date '{}'", raw_date),
        })?);
        for (column, &idx) in values.iter_mut().zip(&value_idx) {
            column.push(parse_number(cell(idx)?, line)?);
        }
    }

    if timestamps.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    debug!(rows = timestamps.len(), "read ohlcv records");
    Series::new(timestamps, values, columns)
}

/// Read an OHLCV file from disk.
pub fn load_ohlcv_csv<P: AsRef<Path>>(path: P) -> Result<Series> {
    let file = File::open(path.as_ref())
        .map_err(|e| ForecastError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
    read_ohlcv_csv(file)
}

fn record_line(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

fn csv_error(err: csv::Error) -> ForecastError {
    ForecastError::Parse {
        line: err.position().map_or(0, |p| p.line() as usize),
        message: err.to_string(),
    }
}

fn parse_number(raw: &str, line: usize) -> Result<f64> {
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.replace(',', "")
        .parse::<f64>()
        .map_err(|e| ForecastError::Parse {
            line,
            message: format!("'{}': {}", raw, e),
        })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Market data read from `<root>/<TICKER>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    root: PathBuf,
}

impl CsvProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.root.join(format!("{}.csv", ticker.to_ascii_uppercase()))
    }
}

impl MarketDataProvider for CsvProvider {
    fn history(&self, ticker: &str, lookback: Duration) -> Result<Series> {
        let series = load_ohlcv_csv(self.path_for(ticker))?;
        trim_to_lookback(&series, lookback)
    }
}

/// Keep the rows no older than `lookback` before the last observation.
pub(crate) fn trim_to_lookback(series: &Series, lookback: Duration) -> Result<Series> {
    let Some(&last) = series.timestamps().last() else {
        return Err(ForecastError::EmptyData);
    };
    let cutoff = last - lookback;
    let start = series.timestamps().partition_point(|t| *t < cutoff);
    series.slice(start, series.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnId;
    use chrono::TimeZone;
    use std::io::Cursor;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Volume,Dividends
2021-03-01,100.0,105.0,99.0,104.0,1200,0
2021-03-02,104.0,106.5,103.0,106.0,1500,0

2021-03-03,106.0,107.0,101.0,102.5,1700,0.5
";

    #[test]
    fn reads_ohlcv_and_ignores_extra_columns() {
        let series = read_ohlcv_csv(Cursor::new(SAMPLE)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.columns(), ohlcv_columns().as_slice());
        assert_eq!(
            series.column(&ColumnId::close()).unwrap(),
            &[104.0, 106.0, 102.5]
        );
        assert_eq!(
            series.timestamps()[2],
            Utc.with_ymd_and_hms(2021, 3, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn quoted_fields_keep_embedded_commas() {
        let text = "Date,Open,High,Low,Close,Volume\n2020-01-02,1,2,0.5,1.5,\"1,200\"\n";
        let series = read_ohlcv_csv(Cursor::new(text)).unwrap();
        assert_eq!(series.column(&ColumnId::volume()).unwrap(), &[1200.0]);
        assert_eq!(series.column(&ColumnId::close()).unwrap(), &[1.5]);

        let quoted_header = "\"Date\",\"Open\",\"High\",\"Low\",\"Close\",\"Volume\"\n\
                             2020-01-02,1,2,0.5,1.5,10\n";
        assert_eq!(read_ohlcv_csv(Cursor::new(quoted_header)).unwrap().len(), 1);
    }

    #[test]
    fn short_row_reports_its_line() {
        let text = "Date,Open,High,Low,Close,Volume\n2020-01-02,1,2,0.5,1.5,10\n2020-01-03,1,2\n";
        assert!(matches!(
            read_ohlcv_csv(Cursor::new(text)),
            Err(ForecastError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn header_order_does_not_matter() {
        let text = "volume,close,low,high,open,date\n10,4,1,5,2,2020-01-02\n";
        let series = read_ohlcv_csv(Cursor::new(text)).unwrap();
        assert_eq!(series.row(0).unwrap(), vec![2.0, 5.0, 1.0, 4.0, 10.0]);
    }

    #[test]
    fn empty_cell_becomes_missing_value() {
        let text = "Date,Open,High,Low,Close,Volume\n2020-01-02,1,2,0.5,,100\n";
        let series = read_ohlcv_csv(Cursor::new(text)).unwrap();
        assert!(series.has_missing_values());
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let text = "Date,Open,High,Low,Close,Volume\n2020-01-02,1,2,0.5,abc,100\n";
        assert!(matches!(
            read_ohlcv_csv(Cursor::new(text)),
            Err(ForecastError::Parse { line: 2, .. })
        ));

        let missing = "Date,Open,High,Low,Volume\n";
        assert!(matches!(
            read_ohlcv_csv(Cursor::new(missing)),
            Err(ForecastError::Parse { line: 1, .. })
        ));
        assert_eq!(
            read_ohlcv_csv(Cursor::new("")).unwrap_err(),
            ForecastError::EmptyData
        );
    }

    #[test]
    fn accepts_timestamps_with_offsets() {
        let ts = parse_timestamp("2021-03-01 00:00:00-05:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2021, 3, 1, 5, 0, 0).unwrap());
        assert!(parse_timestamp("03/01/2021").is_none());
    }

    #[test]
    fn lookback_keeps_recent_rows() {
        let series = read_ohlcv_csv(Cursor::new(SAMPLE)).unwrap();
        let recent = trim_to_lookback(&series, Duration::days(1)).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn provider_reports_missing_file() {
        let provider = CsvProvider::new("/nonexistent-market-data");
        assert_eq!(
            provider.path_for("goog"),
            PathBuf::from("/nonexistent-market-data/GOOG.csv")
        );
        assert!(matches!(
            provider.history("GOOG", Duration::days(365)),
            Err(ForecastError::Io(_))
        ));
    }
}

//! Sources of daily OHLCV history.

mod csv;

pub use self::csv::{load_ohlcv_csv, read_ohlcv_csv, CsvProvider};

use crate::core::Series;
use crate::error::Result;
use chrono::Duration;

/// Anything able to supply daily market history for a ticker.
pub trait MarketDataProvider {
    /// Rows for `ticker` covering `lookback` up to the most recent
    /// observation, oldest first.
    fn history(&self, ticker: &str, lookback: Duration) -> Result<Series>;
}

//! Core data structures: the observation series and window tensors.

mod series;
mod tensor;

pub use series::{ohlcv_columns, ColumnId, Series, SeriesBuilder, OHLCV_COLUMNS};
pub use tensor::Tensor3;

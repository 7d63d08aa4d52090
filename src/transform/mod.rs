//! Data preparation shared by every predictor.
//!
//! Provides the chronological partitioner, per-column range scaling and the
//! supervised window builder.
//!
//! # Example
//!
//! ```
//! use anofox_seqcast::core::{ColumnId, SeriesBuilder};
//! use anofox_seqcast::transform::{build_windows, split, ScalerRegistry, WindowSpec};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let series = SeriesBuilder::new()
//!     .timestamps((0..30).map(|i| base + Duration::days(i)).collect())
//!     .column("Close", (0..30).map(|i| 100.0 + i as f64).collect())
//!     .build()
//!     .unwrap();
//!
//! let partition = split(&series, 0.7).unwrap();
//! let scalers = ScalerRegistry::fit(&partition.train, (-1.0, 1.0)).unwrap();
//! let scaled_test = scalers
//!     .transform_series(&partition.test_with_history(5).unwrap())
//!     .unwrap();
//!
//! let spec = WindowSpec::new(5, 1, vec![ColumnId::close()]).unwrap();
//! let windows = build_windows(&scaled_test, &spec).unwrap();
//! assert_eq!(windows.len(), partition.test.len());
//! ```

pub mod partition;
pub mod registry;
pub mod scale;
pub mod window;

pub use partition::{bridge, split, train_length, Partition};
pub use registry::ScalerRegistry;
pub use scale::{MinMaxScaler, DEFAULT_FEATURE_RANGE};
pub use window::{build_windows, window_count, WindowSet, WindowSpec};

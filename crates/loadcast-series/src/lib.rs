//! loadcast-series: turns raw samples into a clean, regular series.
//!
//! # Aggregation
//!
//! ```text
//! raw (ts, value) pairs, unordered, possibly duplicated
//!   ├── dedup by timestamp (later-inserted wins)
//!   ├── sort ascending
//!   ├── bucket onto a fixed grid anchored at the first timestamp,
//!   │   bucket value = mean of its samples
//!   └── forward-fill empty buckets
//! ```

pub mod aggregate;
pub mod error;

pub use aggregate::{AggregatedSeries, MAX_BUCKETS, aggregate, aggregate_metric, raw_series};
pub use error::{SeriesError, SeriesResult};

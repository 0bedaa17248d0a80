//! loadcast-core: shared types and configuration.
//!
//! Everything the pipeline crates agree on lives here: the `Observation`
//! record produced by the sampler and persisted by the store, the `Metric`
//! selector, the `SeriesPoint` used by both aggregated and forecast series,
//! and the `LoadcastConfig` loaded from `loadcast.toml`.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    CostConfig, ForecastConfig, LoadcastConfig, SamplerConfig, StorageBackend, StorageConfig,
    ThresholdConfig, parse_duration,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;

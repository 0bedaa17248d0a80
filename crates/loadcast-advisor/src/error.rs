use thiserror::Error;

use loadcast_core::ConfigError;
use loadcast_series::SeriesError;
use loadcast_store::StoreError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdvisorError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Error)]
pub enum PlanError {
    /// Nothing has been collected yet; callers should report "no data".
    #[error("no observations in history")]
    EmptyHistory,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Advisor(#[from] AdvisorError),
}

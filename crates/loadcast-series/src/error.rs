use thiserror::Error;

pub type SeriesResult<T> = Result<T, SeriesError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// The raw series held no observations.
    #[error("no observations to aggregate")]
    EmptyHistory,

    #[error("grid step must be positive")]
    InvalidStep,

    /// The history spans more grid buckets than a series may hold.
    #[error("history spans {buckets} buckets, limit is {max}; use a coarser grid step")]
    TooManyBuckets { buckets: u64, max: usize },
}

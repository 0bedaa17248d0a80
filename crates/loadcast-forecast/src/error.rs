//! Model fitting failures. These never leave the engine as errors; they are
//! carried inside `FallbackReason::FitFailed`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitError {
    #[error("series is constant")]
    ConstantSeries,

    #[error("series too short for the requested order")]
    TooShort,

    #[error("singular least-squares system")]
    Singular,

    #[error("no candidate order could be fitted")]
    NoCandidate,

    #[error("non-finite value in fit or prediction")]
    NonFinite,
}

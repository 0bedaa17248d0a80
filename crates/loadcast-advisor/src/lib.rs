//! loadcast-advisor: predicted peaks to discrete, costed scaling advice.
//!
//! # Decision rule
//!
//! ```text
//! peak > threshold:
//!     Up   by max(1, ceil((peak - threshold) / 10)) servers, cost
//! peak < threshold - 20:
//!     Down by floor((threshold - peak) / 10) servers, saving (may be 0)
//! otherwise:
//!     no scaling (dead-band)
//! ```
//!
//! Amounts are `servers × cost_per_server` in USD and that times the
//! exchange rate in INR. CPU and memory are evaluated independently and
//! never merged into one server count.
//!
//! `CapacityPlanner` runs the whole pipeline per metric:
//! store → aggregate → forecast → peak → recommend.

pub mod advisor;
pub mod error;
pub mod planner;

pub use advisor::{CostModel, Recommendation, ScaleDirection, recommend};
pub use error::{AdvisorError, PlanError};
pub use planner::{CapacityPlanner, CapacityReport, MetricFailure, MetricReport};

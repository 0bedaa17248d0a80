//! loadcast-sampler: collects utilization observations from the local host.
//!
//! A `MetricSource` produces one `Observation` per call; `LiveSampler`
//! drives a source on a fixed interval for a bounded duration and stops
//! early when the shutdown signal fires.

pub mod sampler;
pub mod source;

pub use sampler::LiveSampler;
pub use source::{MetricSource, SystemSource};

//! Domain types shared across loadcast crates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single host utilization sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    /// Global CPU utilization in percent (0–100).
    pub cpu_usage: f64,
    /// Used memory in percent of total (0–100).
    pub memory_usage: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, cpu_usage: f64, memory_usage: f64) -> Self {
        Self {
            timestamp,
            cpu_usage,
            memory_usage,
        }
    }
}

/// The utilization metrics loadcast forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cpu,
    Memory,
}

impl Metric {
    /// All metrics, in report order.
    pub const ALL: [Metric; 2] = [Metric::Cpu, Metric::Memory];

    /// Extract this metric's value from an observation.
    pub fn value_of(&self, obs: &Observation) -> f64 {
        match self {
            Metric::Cpu => obs.cpu_usage,
            Metric::Memory => obs.memory_usage,
        }
    }

    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "Memory",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Metric::Cpu),
            "memory" | "mem" => Ok(Metric::Memory),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}

/// A timestamped value on a regular series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_value_of() {
        let obs = Observation::new(Utc::now(), 42.0, 61.5);
        assert_eq!(Metric::Cpu.value_of(&obs), 42.0);
        assert_eq!(Metric::Memory.value_of(&obs), 61.5);
    }

    #[test]
    fn metric_parse() {
        assert_eq!("cpu".parse::<Metric>(), Ok(Metric::Cpu));
        assert_eq!("Memory".parse::<Metric>(), Ok(Metric::Memory));
        assert_eq!("mem".parse::<Metric>(), Ok(Metric::Memory));
        assert!("disk".parse::<Metric>().is_err());
    }

    #[test]
    fn metric_serializes_snake_case() {
        let json = serde_json::to_string(&Metric::Memory).unwrap();
        assert_eq!(json, "\"memory\"");
    }
}

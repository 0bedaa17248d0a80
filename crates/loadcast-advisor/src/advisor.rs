//! Scaling advisor: turns a predicted peak into a server delta with cost.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use loadcast_core::{CostConfig, Metric};

use crate::error::AdvisorError;

/// Percentage points of utilization covered by one server.
const POINTS_PER_SERVER: f64 = 10.0;

/// How far below the threshold the peak must fall before scaling down.
const SCALE_DOWN_MARGIN: f64 = 20.0;

/// Direction of a scaling recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleDirection {
    Up,
    Down,
    None,
}

/// Per-server price (USD) and the USD to INR rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub cost_per_server: f64,
    pub exchange_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cost_per_server: 500.0,
            exchange_rate: 83.0,
        }
    }
}

impl From<&CostConfig> for CostModel {
    fn from(config: &CostConfig) -> Self {
        Self {
            cost_per_server: config.cost_per_server,
            exchange_rate: config.exchange_rate,
        }
    }
}

impl CostModel {
    pub fn validate(&self) -> Result<(), AdvisorError> {
        if !(self.cost_per_server.is_finite() && self.cost_per_server > 0.0) {
            return Err(AdvisorError::InvalidConfiguration(format!(
                "cost_per_server must be positive, got {}",
                self.cost_per_server
            )));
        }
        if !(self.exchange_rate.is_finite() && self.exchange_rate > 0.0) {
            return Err(AdvisorError::InvalidConfiguration(format!(
                "exchange_rate must be positive, got {}",
                self.exchange_rate
            )));
        }
        Ok(())
    }
}

/// Advice for one metric. For `Down` the amounts are savings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub metric: Metric,
    pub direction: ScaleDirection,
    pub server_delta: u32,
    pub cost_usd: f64,
    pub cost_inr: f64,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.metric.label();
        let (verb, amount) = match self.direction {
            ScaleDirection::Up => ("UP", "Cost"),
            ScaleDirection::Down => ("DOWN", "Saving"),
            ScaleDirection::None => return write!(f, "{label}: No scaling needed."),
        };
        write!(
            f,
            "{label}: Scale {verb} by {} server(s). {amount} ≈ ${} (~₹{}).",
            self.server_delta,
            format_usd(self.cost_usd),
            group_thousands(self.cost_inr),
        )
    }
}

/// Decide how many servers to add or remove for `metric`.
///
/// Above the threshold: add `max(1, ceil((peak - threshold) / 10))`.
/// More than 20 points below it: remove `floor((threshold - peak) / 10)`.
/// Anything in between is the dead-band and yields no change.
pub fn recommend(
    metric: Metric,
    peak: f64,
    threshold: f64,
    cost: &CostModel,
) -> Result<Recommendation, AdvisorError> {
    if !(threshold.is_finite() && (0.0..=100.0).contains(&threshold)) {
        return Err(AdvisorError::InvalidConfiguration(format!(
            "{metric} threshold must be within 0..=100, got {threshold}"
        )));
    }
    cost.validate()?;
    if !peak.is_finite() {
        return Err(AdvisorError::InvalidInput(format!(
            "{metric} peak is not a finite number: {peak}"
        )));
    }

    let (direction, servers) = if peak > threshold {
        let needed = ((peak - threshold) / POINTS_PER_SERVER).ceil().max(1.0);
        (ScaleDirection::Up, server_count(metric, needed)?)
    } else if peak < threshold - SCALE_DOWN_MARGIN {
        let excess = ((threshold - peak) / POINTS_PER_SERVER).floor();
        (ScaleDirection::Down, server_count(metric, excess)?)
    } else {
        (ScaleDirection::None, 0)
    };

    let cost_usd = f64::from(servers) * cost.cost_per_server;
    let recommendation = Recommendation {
        metric,
        direction,
        server_delta: servers,
        cost_usd,
        cost_inr: cost_usd * cost.exchange_rate,
    };

    debug!(
        %metric,
        peak,
        threshold,
        direction = ?recommendation.direction,
        servers,
        "scaling evaluated"
    );
    Ok(recommendation)
}

/// Whole server count; counts past `u32::MAX` are rejected, never capped.
fn server_count(metric: Metric, servers: f64) -> Result<u32, AdvisorError> {
    if servers > f64::from(u32::MAX) {
        return Err(AdvisorError::InvalidInput(format!(
            "{metric} peak implies {servers} servers, too many to recommend"
        )));
    }
    Ok(servers as u32)
}

/// Whole amounts print without decimals.
fn format_usd(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

/// Round to a whole number and separate thousands with commas.
fn group_thousands(amount: f64) -> String {
    let digits = format!("{:.0}", amount.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount.is_sign_negative() && digits != "0" {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

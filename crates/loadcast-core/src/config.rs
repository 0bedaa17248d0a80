//! loadcast.toml configuration parser.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadcastConfig {
    pub thresholds: ThresholdConfig,
    pub forecast: ForecastConfig,
    pub cost: CostConfig,
    pub sampler: SamplerConfig,
    pub storage: StorageConfig,
}

/// Scaling thresholds in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub cpu: f64,
    pub memory: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: 80.0,
            memory: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of hourly steps to predict.
    pub horizon: usize,
    /// Aggregation grid step (e.g., "5m").
    pub grid_step: String,
    /// Series shorter than this skip model fitting.
    pub min_points: usize,
    pub max_p: usize,
    pub max_q: usize,
    /// Upper bound on `p + q`.
    pub max_order: usize,
    pub max_d: usize,
    /// Optional deadline for a single model fit (e.g., "30s").
    pub fit_timeout: Option<String>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 24,
            grid_step: "5m".to_string(),
            min_points: 10,
            max_p: 3,
            max_q: 3,
            max_order: 5,
            max_d: 2,
            fit_timeout: None,
        }
    }
}

impl ForecastConfig {
    pub fn grid_step(&self) -> ConfigResult<Duration> {
        parse_duration(&self.grid_step)
    }

    pub fn fit_timeout(&self) -> ConfigResult<Option<Duration>> {
        self.fit_timeout.as_deref().map(parse_duration).transpose()
    }
}

/// Per-server price and the conversion rate into the secondary currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub cost_per_server: f64,
    pub exchange_rate: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            cost_per_server: 500.0,
            exchange_rate: 83.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub interval: String,
    pub duration: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: "5s".to_string(),
            duration: "2m".to_string(),
        }
    }
}

impl SamplerConfig {
    pub fn interval(&self) -> ConfigResult<Duration> {
        parse_duration(&self.interval)
    }

    pub fn duration(&self) -> ConfigResult<Duration> {
        parse_duration(&self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Redb,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Redb,
            path: PathBuf::from("loadcast.redb"),
        }
    }
}

impl LoadcastConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject values that would produce nonsensical forecasts or
    /// recommendations.
    pub fn validate(&self) -> ConfigResult<()> {
        check_threshold("thresholds.cpu", self.thresholds.cpu)?;
        check_threshold("thresholds.memory", self.thresholds.memory)?;

        let f = &self.forecast;
        if f.horizon < 1 {
            return Err(invalid("forecast.horizon must be at least 1"));
        }
        if f.min_points < 1 {
            return Err(invalid("forecast.min_points must be at least 1"));
        }
        if f.grid_step()?.is_zero() {
            return Err(invalid("forecast.grid_step must be positive"));
        }
        if let Some(timeout) = f.fit_timeout()?
            && timeout.is_zero()
        {
            return Err(invalid("forecast.fit_timeout must be positive"));
        }

        check_positive("cost.cost_per_server", self.cost.cost_per_server)?;
        check_positive("cost.exchange_rate", self.cost.exchange_rate)?;

        let interval = self.sampler.interval()?;
        let duration = self.sampler.duration()?;
        if interval.is_zero() {
            return Err(invalid("sampler.interval must be positive"));
        }
        if duration < interval {
            return Err(invalid("sampler.duration must be at least one interval"));
        }

        Ok(())
    }
}

fn check_threshold(name: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(invalid(&format!("{name} must be within [0, 100], got {value}")));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(&format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::InvalidConfiguration(msg.to_string())
}

/// Parse a duration string like "30s", "5m", "1h". A bare number is seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let (digits, unit_secs) = if let Some(v) = s.strip_suffix("ms") {
        let ms = v
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Parse(format!("invalid duration: {s:?}")))?;
        return Ok(Duration::from_millis(ms));
    } else if let Some(v) = s.strip_suffix('s') {
        (v, 1)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3600)
    } else {
        (s, 1)
    };

    let n = digits
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::Parse(format!("invalid duration: {s:?}")))?;
    n.checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Parse(format!("duration out of range: {s:?}")))
}

//! Forecast engine: model path with constant-repeat fallback.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use loadcast_core::{ForecastConfig, SeriesPoint};
use loadcast_series::AggregatedSeries;

use crate::arima::{ArimaOrder, ArimaSearch};
use crate::error::FitError;

/// Exactly `horizon` predicted points at a fixed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    points: Vec<SeriesPoint>,
}

impl ForecastSeries {
    fn from_values(last: DateTime<Utc>, step: TimeDelta, values: Vec<f64>) -> Self {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| SeriesPoint::new(last + step * (i as i32 + 1), value))
            .collect();
        Self { points }
    }

    fn constant(last: &SeriesPoint, step: TimeDelta, horizon: NonZeroUsize) -> Self {
        Self::from_values(last.timestamp, step, vec![last.value; horizon.get()])
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Maximum predicted value.
    pub fn peak(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Why the engine fell back to repeating the last observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    InsufficientData { points: usize, required: usize },
    FitFailed { error: FitError },
    TimedOut { after_ms: u64 },
    Aborted { message: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData { points, required } => {
                write!(f, "insufficient data ({points} of {required} points)")
            }
            Self::FitFailed { error } => write!(f, "model fit failed: {error}"),
            Self::TimedOut { after_ms } => write!(f, "model fit timed out after {after_ms}ms"),
            Self::Aborted { message } => write!(f, "model fit aborted: {message}"),
        }
    }
}

/// Outcome of one forecast: either the fitted model's predictions or the
/// constant fallback. Both carry a well-formed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Forecast {
    Model {
        series: ForecastSeries,
        order: ArimaOrder,
    },
    Fallback {
        series: ForecastSeries,
        reason: FallbackReason,
    },
}

impl Forecast {
    pub fn series(&self) -> &ForecastSeries {
        match self {
            Forecast::Model { series, .. } | Forecast::Fallback { series, .. } => series,
        }
    }

    pub fn into_series(self) -> ForecastSeries {
        match self {
            Forecast::Model { series, .. } | Forecast::Fallback { series, .. } => series,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Forecast::Fallback { .. })
    }

    /// Short description of how the forecast was produced.
    pub fn method(&self) -> String {
        match self {
            Forecast::Model { order, .. } => order.to_string(),
            Forecast::Fallback { reason, .. } => format!("last value repeated, {reason}"),
        }
    }
}

/// Produces forecasts from aggregated series.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    /// Series shorter than this skip model fitting.
    min_points: usize,
    search: ArimaSearch,
    /// Spacing of forecast timestamps.
    step: TimeDelta,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self {
            min_points: 10,
            search: ArimaSearch::default(),
            step: TimeDelta::hours(1),
        }
    }
}

impl ForecastEngine {
    pub fn new(min_points: usize, search: ArimaSearch) -> Self {
        Self {
            min_points,
            search,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ForecastConfig) -> Self {
        Self::new(
            config.min_points,
            ArimaSearch {
                max_p: config.max_p,
                max_q: config.max_q,
                max_order: config.max_order,
                max_d: config.max_d,
            },
        )
    }

    /// Override the spacing of forecast timestamps (hourly by default).
    pub fn with_step(mut self, step: TimeDelta) -> Self {
        self.step = step;
        self
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /// Forecast `horizon` steps past the end of `series`.
    ///
    /// Never fails: short series and fit failures yield the last value
    /// repeated, with the reason recorded in [`Forecast::Fallback`].
    pub fn forecast(&self, series: &AggregatedSeries, horizon: NonZeroUsize) -> Forecast {
        let last = *series.last();

        if series.len() < self.min_points {
            let reason = FallbackReason::InsufficientData {
                points: series.len(),
                required: self.min_points,
            };
            debug!(points = series.len(), %reason, "using fallback forecast");
            return self.fallback(&last, horizon, reason);
        }

        let values = series.values();
        let fitted = self
            .search
            .fit(&values)
            .and_then(|model| Ok((model.order(), model.forecast(horizon.get())?)));

        match fitted {
            Ok((order, predicted)) => {
                debug!(%order, horizon = horizon.get(), "model forecast produced");
                Forecast::Model {
                    series: ForecastSeries::from_values(last.timestamp, self.step, predicted),
                    order,
                }
            }
            Err(error) => {
                let reason = FallbackReason::FitFailed { error };
                warn!(points = series.len(), %reason, "using fallback forecast");
                self.fallback(&last, horizon, reason)
            }
        }
    }

    /// Like [`forecast`](Self::forecast), but gives up on the model after
    /// `timeout` and falls back. The fit runs on the blocking pool; a
    /// timed-out fit is left to finish in the background.
    pub async fn forecast_with_deadline(
        &self,
        series: AggregatedSeries,
        horizon: NonZeroUsize,
        timeout: Duration,
    ) -> Forecast {
        let last = *series.last();
        let engine = self.clone();
        let task = tokio::task::spawn_blocking(move || engine.forecast(&series, horizon));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(forecast)) => forecast,
            Ok(Err(join_err)) => {
                let reason = FallbackReason::Aborted {
                    message: join_err.to_string(),
                };
                warn!(%reason, "using fallback forecast");
                self.fallback(&last, horizon, reason)
            }
            Err(_) => {
                let reason = FallbackReason::TimedOut {
                    after_ms: timeout.as_millis() as u64,
                };
                warn!(%reason, "using fallback forecast");
                self.fallback(&last, horizon, reason)
            }
        }
    }

    fn fallback(&self, last: &SeriesPoint, horizon: NonZeroUsize, reason: FallbackReason) -> Forecast {
        Forecast::Fallback {
            series: ForecastSeries::constant(last, self.step, horizon),
            reason,
        }
    }
}

//! Capacity planner: history to per-metric forecasts and recommendations.
//!
//! Each metric runs through aggregate → forecast → peak → recommend on its
//! own; a failure in one metric is reported alongside the others rather
//! than aborting the whole plan.

use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use loadcast_core::{ConfigError, LoadcastConfig, Metric, Observation, ThresholdConfig};
use loadcast_forecast::{Forecast, ForecastEngine};
use loadcast_series::aggregate_metric;
use loadcast_store::SampleStore;

use crate::advisor::{CostModel, Recommendation, recommend};
use crate::error::PlanError;

/// Forecast and advice for a single metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: Metric,
    pub threshold: f64,
    /// Length of the aggregated history.
    pub points: usize,
    /// Most recent aggregated value.
    pub last_value: f64,
    pub forecast: Forecast,
    pub peak: f64,
    pub recommendation: Recommendation,
}

/// A metric that could not be planned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFailure {
    pub metric: Metric,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub generated_at: DateTime<Utc>,
    /// Raw observations the plan was computed from.
    pub observations: usize,
    pub metrics: Vec<MetricReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<MetricFailure>,
}

impl CapacityReport {
    pub fn metric(&self, metric: Metric) -> Option<&MetricReport> {
        self.metrics.iter().find(|r| r.metric == metric)
    }
}

/// Runs the forecasting pipeline with a validated configuration.
#[derive(Debug, Clone)]
pub struct CapacityPlanner {
    thresholds: ThresholdConfig,
    cost: CostModel,
    engine: ForecastEngine,
    grid_step: Duration,
    horizon: NonZeroUsize,
    fit_timeout: Option<Duration>,
}

impl CapacityPlanner {
    pub fn new(config: &LoadcastConfig) -> Result<Self, PlanError> {
        config.validate()?;

        let horizon = NonZeroUsize::new(config.forecast.horizon).ok_or_else(|| {
            ConfigError::InvalidConfiguration("forecast.horizon must be at least 1".to_string())
        })?;

        Ok(Self {
            thresholds: config.thresholds.clone(),
            cost: CostModel::from(&config.cost),
            engine: ForecastEngine::from_config(&config.forecast),
            grid_step: config.forecast.grid_step()?,
            horizon,
            fit_timeout: config.forecast.fit_timeout()?,
        })
    }

    pub fn threshold(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cpu => self.thresholds.cpu,
            Metric::Memory => self.thresholds.memory,
        }
    }

    pub fn horizon(&self) -> NonZeroUsize {
        self.horizon
    }

    /// Load the full history from `store` and plan over it.
    pub async fn plan_from_store(&self, store: &dyn SampleStore) -> Result<CapacityReport, PlanError> {
        let observations = store.load_all()?;
        self.plan(&observations).await
    }

    /// Forecast every metric and recommend scaling for each.
    pub async fn plan(&self, observations: &[Observation]) -> Result<CapacityReport, PlanError> {
        if observations.is_empty() {
            return Err(PlanError::EmptyHistory);
        }

        let mut metrics = Vec::with_capacity(Metric::ALL.len());
        let mut failures = Vec::new();

        for metric in Metric::ALL {
            match self.plan_metric(observations, metric).await {
                Ok(report) => {
                    info!(
                        %metric,
                        points = report.points,
                        method = %report.forecast.method(),
                        peak = report.peak,
                        direction = ?report.recommendation.direction,
                        servers = report.recommendation.server_delta,
                        "metric planned"
                    );
                    metrics.push(report);
                }
                Err(e) => {
                    warn!(%metric, error = %e, "metric planning failed");
                    failures.push(MetricFailure {
                        metric,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(CapacityReport {
            generated_at: Utc::now(),
            observations: observations.len(),
            metrics,
            failures,
        })
    }

    async fn plan_metric(
        &self,
        observations: &[Observation],
        metric: Metric,
    ) -> Result<MetricReport, PlanError> {
        let series = aggregate_metric(observations, metric, self.grid_step)?;
        let points = series.len();
        let last_value = series.last().value;

        let forecast = match self.fit_timeout {
            Some(timeout) => {
                self.engine
                    .forecast_with_deadline(series, self.horizon, timeout)
                    .await
            }
            None => self.engine.forecast(&series, self.horizon),
        };

        let peak = forecast.series().peak();
        let threshold = self.threshold(metric);
        let recommendation = recommend(metric, peak, threshold, &self.cost)?;

        Ok(MetricReport {
            metric,
            threshold,
            points,
            last_value,
            forecast,
            peak,
            recommendation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::ScaleDirection;
    use chrono::{TimeDelta, TimeZone};
    use loadcast_store::RedbSampleStore;

    fn history(cpu: &[f64], memory: &[f64]) -> Vec<Observation> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        cpu.iter()
            .zip(memory)
            .enumerate()
            .map(|(i, (&c, &m))| Observation::new(start + TimeDelta::minutes(5 * i as i64), c, m))
            .collect()
    }

    fn planner() -> CapacityPlanner {
        CapacityPlanner::new(&LoadcastConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn empty_history_is_reported() {
        let result = planner().plan(&[]).await;
        assert!(matches!(result, Err(PlanError::EmptyHistory)));
    }

    #[tokio::test]
    async fn short_history_uses_last_value() {
        let obs = history(&[90.0, 92.0, 95.0], &[40.0, 45.0, 50.0]);
        let report = planner().plan(&obs).await.unwrap();

        assert_eq!(report.observations, 3);
        assert!(report.failures.is_empty());

        let cpu = report.metric(Metric::Cpu).unwrap();
        assert_eq!(cpu.points, 3);
        assert_eq!(cpu.last_value, 95.0);
        assert!(cpu.forecast.is_fallback());
        assert_eq!(cpu.forecast.series().len(), 24);
        assert_eq!(cpu.peak, 95.0);
        assert_eq!(cpu.recommendation.direction, ScaleDirection::Up);
        assert_eq!(cpu.recommendation.server_delta, 2);

        let mem = report.metric(Metric::Memory).unwrap();
        assert_eq!(mem.threshold, 75.0);
        assert_eq!(mem.peak, 50.0);
        assert_eq!(mem.recommendation.direction, ScaleDirection::Down);
        assert_eq!(mem.recommendation.server_delta, 2);
    }

    #[tokio::test]
    async fn metrics_fail_independently() {
        let obs = history(&[f64::NAN, f64::NAN], &[60.0, 62.0]);
        let report = planner().plan(&obs).await.unwrap();

        assert_eq!(report.metrics.len(), 1);
        assert_eq!(report.metrics[0].metric, Metric::Memory);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].metric, Metric::Cpu);
    }

    #[tokio::test]
    async fn deadline_path_yields_full_horizon() {
        let mut config = LoadcastConfig::default();
        config.forecast.horizon = 6;
        config.forecast.fit_timeout = Some("30s".to_string());
        let planner = CapacityPlanner::new(&config).unwrap();

        let cpu: Vec<f64> = (0..40).map(|i| 50.0 + 10.0 * (i as f64 * 0.5).sin()).collect();
        let mem: Vec<f64> = (0..40).map(|i| 60.0 + (i % 7) as f64).collect();
        let report = planner.plan(&history(&cpu, &mem)).await.unwrap();

        assert_eq!(report.metrics.len(), 2);
        for metric in &report.metrics {
            assert_eq!(metric.points, 40);
            assert_eq!(metric.forecast.series().len(), 6);
        }
    }

    #[tokio::test]
    async fn plans_from_store() {
        let store = RedbSampleStore::open_in_memory().unwrap();
        store.append(&history(&[30.0, 35.0], &[70.0, 72.0])).unwrap();

        let report = planner().plan_from_store(&store).await.unwrap();
        let cpu = report.metric(Metric::Cpu).unwrap();
        assert_eq!(cpu.peak, 35.0);
        assert_eq!(cpu.recommendation.direction, ScaleDirection::Down);
        assert_eq!(cpu.recommendation.server_delta, 4);

        let mem = report.metric(Metric::Memory).unwrap();
        assert_eq!(mem.recommendation.direction, ScaleDirection::None);
    }

    #[tokio::test]
    async fn empty_store_is_empty_history() {
        let store = RedbSampleStore::open_in_memory().unwrap();
        let result = planner().plan_from_store(&store).await;
        assert!(matches!(result, Err(PlanError::EmptyHistory)));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = LoadcastConfig::default();
        config.thresholds.cpu = 150.0;
        assert!(matches!(
            CapacityPlanner::new(&config),
            Err(PlanError::Config(ConfigError::InvalidConfiguration(_)))
        ));
    }

    #[tokio::test]
    async fn report_serializes_to_json() {
        let report = planner()
            .plan(&history(&[90.0, 92.0], &[40.0, 45.0]))
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["metrics"][0]["metric"], "cpu");
        assert_eq!(json["metrics"][0]["forecast"]["method"], "fallback");
        assert!(json.get("failures").is_none());
    }
}

//! Fixed-step resampling of raw metric samples.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::debug;

use loadcast_core::{Metric, Observation, SeriesPoint};

use crate::error::{SeriesError, SeriesResult};

/// A gap-free series on a fixed time grid.
///
/// Invariant: non-empty, timestamps strictly increasing and exactly `step`
/// apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    step: Duration,
    points: Vec<SeriesPoint>,
}

impl AggregatedSeries {
    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a series produced by [`aggregate`].
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &SeriesPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &SeriesPoint {
        &self.points[self.points.len() - 1]
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Project one metric out of a batch of observations, preserving order.
pub fn raw_series(observations: &[Observation], metric: Metric) -> Vec<(DateTime<Utc>, f64)> {
    observations
        .iter()
        .map(|obs| (obs.timestamp, metric.value_of(obs)))
        .collect()
}

/// Aggregate one metric of a batch of observations onto a grid.
pub fn aggregate_metric(
    observations: &[Observation],
    metric: Metric,
    step: Duration,
) -> SeriesResult<AggregatedSeries> {
    let series = aggregate(&raw_series(observations, metric), step)?;
    debug!(
        %metric,
        raw = observations.len(),
        points = series.len(),
        "metric aggregated"
    );
    Ok(series)
}

/// Most buckets one aggregated series may span (about a year at 5 minutes).
pub const MAX_BUCKETS: usize = 100_000;

/// Resample a raw series onto a grid of width `step` anchored at its first
/// timestamp.
///
/// Duplicate timestamps keep the later entry. Each bucket holds the mean of
/// the samples in `[start + i*step, start + (i+1)*step)`; empty buckets take
/// the previous bucket's value.
pub fn aggregate(raw: &[(DateTime<Utc>, f64)], step: Duration) -> SeriesResult<AggregatedSeries> {
    let step_us = i64::try_from(step.as_micros()).map_err(|_| SeriesError::InvalidStep)?;
    if step_us <= 0 {
        return Err(SeriesError::InvalidStep);
    }

    // Inserting in order gives last-wins dedup; the map keeps keys sorted.
    let mut deduped: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for &(ts, value) in raw {
        deduped.insert(ts, value);
    }

    let (Some((&start, _)), Some((&end, _))) =
        (deduped.first_key_value(), deduped.last_key_value())
    else {
        return Err(SeriesError::EmptyHistory);
    };

    let span_us = end.timestamp_micros() - start.timestamp_micros();
    let buckets = (span_us / step_us) as u64 + 1;
    if buckets > MAX_BUCKETS as u64 {
        return Err(SeriesError::TooManyBuckets {
            buckets,
            max: MAX_BUCKETS,
        });
    }
    let bucket_count = buckets as usize;

    let mut sums = vec![(0.0_f64, 0_u32); bucket_count];
    for (ts, value) in &deduped {
        let idx = ((ts.timestamp_micros() - start.timestamp_micros()) / step_us) as usize;
        sums[idx].0 += value;
        sums[idx].1 += 1;
    }

    let step_delta = TimeDelta::microseconds(step_us);
    let mut points = Vec::with_capacity(bucket_count);
    let mut carry: Option<f64> = None;
    let mut bucket_start = start;

    for (sum, count) in sums {
        if count > 0 {
            carry = Some(sum / count as f64);
        }
        // Buckets before the first observed value stay out of the series.
        if let Some(value) = carry {
            points.push(SeriesPoint::new(bucket_start, value));
        }
        bucket_start += step_delta;
    }

    if points.is_empty() {
        return Err(SeriesError::EmptyHistory);
    }

    Ok(AggregatedSeries { step, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FIVE_MIN: Duration = Duration::from_secs(300);

    fn at(minute: i64, second: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
            + TimeDelta::minutes(minute)
            + TimeDelta::seconds(second)
    }

    #[test]
    fn empty_input_is_empty_history() {
        assert_eq!(aggregate(&[], FIVE_MIN), Err(SeriesError::EmptyHistory));
    }

    #[test]
    fn zero_step_rejected() {
        let raw = vec![(at(0, 0), 1.0)];
        assert_eq!(aggregate(&raw, Duration::ZERO), Err(SeriesError::InvalidStep));
    }

    #[test]
    fn fine_step_over_long_span_rejected() {
        let raw = vec![(at(0, 0), 1.0), (at(60 * 24, 0), 2.0)];
        let err = aggregate(&raw, Duration::from_millis(1)).unwrap_err();
        assert_eq!(
            err,
            SeriesError::TooManyBuckets {
                buckets: 86_400_001,
                max: MAX_BUCKETS,
            }
        );

        // The same day on a one-minute grid stays within the limit.
        assert_eq!(aggregate(&raw, Duration::from_secs(60)).unwrap().len(), 1441);
    }

    #[test]
    fn single_observation_yields_one_point() {
        let raw = vec![(at(3, 0), 42.0)];
        let series = aggregate(&raw, FIVE_MIN).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0], SeriesPoint::new(at(3, 0), 42.0));
    }

    #[test]
    fn buckets_average_samples() {
        let raw = vec![
            (at(0, 0), 10.0),
            (at(1, 0), 20.0),
            (at(4, 59), 30.0),
            (at(5, 0), 50.0),
        ];
        let series = aggregate(&raw, FIVE_MIN).unwrap();
        assert_eq!(series.values(), vec![20.0, 50.0]);
        assert_eq!(series.points()[1].timestamp, at(5, 0));
    }

    #[test]
    fn gaps_are_forward_filled() {
        let raw = vec![(at(0, 0), 10.0), (at(20, 0), 40.0)];
        let series = aggregate(&raw, FIVE_MIN).unwrap();
        assert_eq!(series.values(), vec![10.0, 10.0, 10.0, 10.0, 40.0]);

        for pair in series.points().windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, TimeDelta::minutes(5));
        }
    }

    #[test]
    fn duplicates_keep_later_value() {
        let raw = vec![(at(0, 0), 10.0), (at(0, 0), 70.0), (at(1, 0), 30.0)];
        let series = aggregate(&raw, FIVE_MIN).unwrap();
        // Later 70 replaces 10, then mean(70, 30).
        assert_eq!(series.values(), vec![50.0]);
    }

    #[test]
    fn unordered_input_is_sorted() {
        let raw = vec![(at(10, 0), 3.0), (at(0, 0), 1.0), (at(5, 0), 2.0)];
        let series = aggregate(&raw, FIVE_MIN).unwrap();
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.first().timestamp, at(0, 0));
        assert_eq!(series.last().timestamp, at(10, 0));
    }

    #[test]
    fn grid_covers_span_without_gaps() {
        let raw: Vec<_> = [0, 7, 9, 31, 32, 58]
            .iter()
            .map(|&m| (at(m, 0), m as f64))
            .collect();
        let series = aggregate(&raw, FIVE_MIN).unwrap();

        // 58 minutes from the anchor -> buckets 0..=11.
        assert_eq!(series.len(), 12);
        assert!(series.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let raw = vec![(at(2, 0), 5.0), (at(0, 0), 1.0), (at(2, 0), 9.0), (at(17, 3), 4.0)];
        assert_eq!(aggregate(&raw, FIVE_MIN), aggregate(&raw, FIVE_MIN));
    }

    #[test]
    fn aggregate_metric_projects_column() {
        let observations = vec![
            Observation::new(at(0, 0), 10.0, 60.0),
            Observation::new(at(1, 0), 30.0, 70.0),
        ];
        let cpu = aggregate_metric(&observations, Metric::Cpu, FIVE_MIN).unwrap();
        let mem = aggregate_metric(&observations, Metric::Memory, FIVE_MIN).unwrap();
        assert_eq!(cpu.values(), vec![20.0]);
        assert_eq!(mem.values(), vec![65.0]);
    }
}

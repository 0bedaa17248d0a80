//! Live sampler: bounded, cancellable collection loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use loadcast_core::{ConfigResult, Observation, SamplerConfig};

use crate::source::MetricSource;

/// Samples a source every `interval` until `duration` has elapsed.
pub struct LiveSampler<S> {
    source: S,
    interval: Duration,
    duration: Duration,
}

impl<S: MetricSource> LiveSampler<S> {
    pub fn new(source: S, interval: Duration, duration: Duration) -> Self {
        Self {
            source,
            interval,
            duration,
        }
    }

    pub fn from_config(source: S, config: &SamplerConfig) -> ConfigResult<Self> {
        Ok(Self::new(source, config.interval()?, config.duration()?))
    }

    /// Run the sampling loop and return everything collected.
    ///
    /// The first sample is taken immediately. Stops when `duration` elapses
    /// or `shutdown` changes; failed samples are logged and skipped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Vec<Observation> {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            duration_secs = self.duration.as_secs(),
            "sampler started"
        );

        let mut samples = Vec::new();
        if *shutdown.borrow() {
            return samples;
        }

        let deadline = Instant::now() + self.duration;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("sampler shutting down");
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => break,
                _ = ticker.tick() => match self.source.sample() {
                    Ok(obs) => {
                        debug!(cpu = obs.cpu_usage, memory = obs.memory_usage, "sample taken");
                        samples.push(obs);
                    }
                    Err(e) => warn!(error = %e, "sample failed"),
                },
            }
        }

        info!(samples = samples.len(), "sampler finished");
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    /// Yields a rising CPU reading; every `fail_every`th call errors.
    struct FakeSource {
        calls: u32,
        fail_every: Option<u32>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                calls: 0,
                fail_every: None,
            }
        }
    }

    impl MetricSource for FakeSource {
        fn sample(&mut self) -> anyhow::Result<Observation> {
            self.calls += 1;
            if let Some(n) = self.fail_every
                && self.calls % n == 0
            {
                anyhow::bail!("sensor unavailable");
            }
            let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + TimeDelta::seconds(i64::from(self.calls));
            Ok(Observation::new(ts, f64::from(self.calls), 50.0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_for_duration() {
        let (_tx, rx) = watch::channel(false);
        let sampler = LiveSampler::new(FakeSource::new(), Duration::from_secs(5), Duration::from_secs(20));

        let samples = sampler.run(rx).await;
        // Ticks at 0, 5, 10 and 15 seconds; the deadline wins at 20.
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[3].cpu_usage, 4.0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_early() {
        let (tx, rx) = watch::channel(false);
        let sampler = LiveSampler::new(FakeSource::new(), Duration::from_secs(5), Duration::from_secs(600));

        let handle = tokio::spawn(sampler.run(rx));
        tokio::time::sleep(Duration::from_secs(12)).await;
        tx.send(true).unwrap();

        let samples = handle.await.unwrap();
        assert_eq!(samples.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn already_shut_down_collects_nothing() {
        let (_tx, rx) = watch::channel(true);
        let sampler = LiveSampler::new(FakeSource::new(), Duration::from_secs(1), Duration::from_secs(10));
        assert!(sampler.run(rx).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_samples_are_skipped() {
        let (_tx, rx) = watch::channel(false);
        let source = FakeSource {
            calls: 0,
            fail_every: Some(2),
        };
        let sampler = LiveSampler::new(source, Duration::from_secs(1), Duration::from_secs(6));

        let samples = sampler.run(rx).await;
        // Six ticks, every second one fails.
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.cpu_usage as u32 % 2 == 1));
    }

    #[test]
    fn from_config_parses_durations() {
        let config = SamplerConfig {
            interval: "2s".to_string(),
            duration: "1m".to_string(),
        };
        let sampler = LiveSampler::from_config(FakeSource::new(), &config).unwrap();
        assert_eq!(sampler.interval, Duration::from_secs(2));
        assert_eq!(sampler.duration, Duration::from_secs(60));
    }
}

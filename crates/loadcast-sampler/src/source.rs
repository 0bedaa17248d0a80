//! Metric sources.

use chrono::Utc;
use sysinfo::System;

use loadcast_core::Observation;

/// Something that can be asked for the current utilization.
pub trait MetricSource: Send {
    fn sample(&mut self) -> anyhow::Result<Observation>;
}

/// Host-wide CPU and memory utilization via sysinfo.
///
/// CPU usage is measured between consecutive refreshes, so the first
/// reading after construction covers only the time since `new`.
pub struct SystemSource {
    system: System,
}

impl SystemSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemSource {
    fn sample(&mut self) -> anyhow::Result<Observation> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            anyhow::bail!("host reported zero total memory");
        }
        let memory = self.system.used_memory() as f64 / total as f64 * 100.0;
        let cpu = f64::from(self.system.global_cpu_usage());

        Ok(Observation::new(Utc::now(), cpu, memory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_source_reports_percentages() {
        let mut source = SystemSource::new();
        let obs = source.sample().unwrap();
        assert!((0.0..=100.0).contains(&obs.memory_usage));
        assert!(obs.cpu_usage >= 0.0);
    }
}

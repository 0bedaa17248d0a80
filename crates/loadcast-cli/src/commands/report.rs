use std::fmt::Write;

use loadcast_advisor::{CapacityPlanner, CapacityReport, PlanError};
use loadcast_core::LoadcastConfig;
use loadcast_store::open_store;

use crate::OutputFormat;

pub async fn report(
    mut config: LoadcastConfig,
    format: OutputFormat,
    cpu_threshold: Option<f64>,
    memory_threshold: Option<f64>,
    horizon: Option<usize>,
) -> anyhow::Result<()> {
    if let Some(t) = cpu_threshold {
        config.thresholds.cpu = t;
    }
    if let Some(t) = memory_threshold {
        config.thresholds.memory = t;
    }
    if let Some(h) = horizon {
        config.forecast.horizon = h;
    }

    let planner = CapacityPlanner::new(&config)?;
    let store = open_store(&config.storage)?;

    let report = match planner.plan_from_store(store.as_ref()).await {
        Ok(report) => report,
        Err(PlanError::EmptyHistory) => {
            println!("No data available");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", format_report(&report)),
    }
    Ok(())
}

/// Human-readable rendering: per-metric forecast summary, then the
/// recommendation lines.
pub fn format_report(report: &CapacityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Forecast from {} observations ({})",
        report.observations,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for m in &report.metrics {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} (threshold {}%)", m.metric, m.threshold);
        let _ = writeln!(
            out,
            "  History:  {} points, last {:.2}%",
            m.points, m.last_value
        );
        let _ = writeln!(
            out,
            "  Forecast: {} over {}h",
            m.forecast.method(),
            m.forecast.series().len()
        );
        let _ = writeln!(out, "  Predicted Peak {}: {:.2}%", m.metric, m.peak);
    }

    for failure in &report.failures {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}: unavailable ({})", failure.metric, failure.error);
    }

    if !report.metrics.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Recommendations:");
        for m in &report.metrics {
            let _ = writeln!(out, "  {}", m.recommendation);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use loadcast_core::Observation;

    #[tokio::test]
    async fn text_report_lists_peaks_and_recommendations() {
        let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let observations: Vec<_> = [(90.0, 40.0), (92.0, 42.0), (95.0, 44.0)]
            .iter()
            .enumerate()
            .map(|(i, &(cpu, mem))| Observation::new(start + TimeDelta::minutes(5 * i as i64), cpu, mem))
            .collect();

        let planner = CapacityPlanner::new(&LoadcastConfig::default()).unwrap();
        let report = planner.plan(&observations).await.unwrap();
        let text = format_report(&report);

        assert!(text.starts_with("Forecast from 3 observations"));
        assert!(text.contains("Predicted Peak CPU: 95.00%"));
        assert!(text.contains("Predicted Peak Memory: 44.00%"));
        assert!(text.contains("CPU: Scale UP by 2 server(s). Cost ≈ $1000 (~₹83,000)."));
        assert!(text.contains("Memory: Scale DOWN by 3 server(s). Saving ≈ $1500 (~₹124,500)."));
    }
}

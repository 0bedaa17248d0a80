use loadcast_advisor::CostModel;
use loadcast_core::{LoadcastConfig, Metric};

use crate::OutputFormat;

pub fn recommend(
    config: &LoadcastConfig,
    metric: Metric,
    peak: f64,
    threshold: Option<f64>,
    cost_per_server: Option<f64>,
    exchange_rate: Option<f64>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let threshold = threshold.unwrap_or(match metric {
        Metric::Cpu => config.thresholds.cpu,
        Metric::Memory => config.thresholds.memory,
    });

    let mut cost = CostModel::from(&config.cost);
    if let Some(c) = cost_per_server {
        cost.cost_per_server = c;
    }
    if let Some(r) = exchange_rate {
        cost.exchange_rate = r;
    }

    let recommendation = loadcast_advisor::recommend(metric, peak, threshold, &cost)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&recommendation)?),
        OutputFormat::Text => println!("{recommendation}"),
    }
    Ok(())
}

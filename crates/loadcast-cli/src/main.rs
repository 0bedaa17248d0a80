use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use loadcast_core::{LoadcastConfig, Metric, StorageBackend};

mod commands;

#[derive(Parser)]
#[command(
    name = "loadcast",
    about = "loadcast — CPU and memory forecasting with scaling advice",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sample store location (overrides [storage].path).
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Sample store backend (overrides [storage].backend).
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample host utilization and append it to the store
    Collect {
        /// Seconds between samples (overrides [sampler].interval).
        #[arg(short, long)]
        interval: Option<u64>,
        /// Minutes to sample for (overrides [sampler].duration).
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Forecast stored history and print scaling recommendations
    Report {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
        #[arg(long)]
        cpu_threshold: Option<f64>,
        #[arg(long)]
        memory_threshold: Option<f64>,
        /// Hours to forecast.
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Recommend scaling for a known peak, without forecasting
    Recommend {
        /// cpu or memory
        #[arg(short, long)]
        metric: Metric,
        /// Predicted peak utilization in percent.
        #[arg(short, long)]
        peak: f64,
        /// Threshold in percent (defaults to the configured one).
        #[arg(short, long)]
        threshold: Option<f64>,
        #[arg(long)]
        cost_per_server: Option<f64>,
        #[arg(long)]
        exchange_rate: Option<f64>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Append observations from a CSV file to the store
    Import {
        /// CSV with columns date,cpu_usage,memory_usage
        csv: PathBuf,
    },
    /// Append every stored observation to a CSV file
    Export {
        csv: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Redb,
    Csv,
}

impl From<Backend> for StorageBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Redb => StorageBackend::Redb,
            Backend::Csv => StorageBackend::Csv,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Collect { interval, duration } => {
            commands::collect::collect(config, interval, duration).await
        }
        Commands::Report {
            format,
            cpu_threshold,
            memory_threshold,
            horizon,
        } => {
            commands::report::report(config, format, cpu_threshold, memory_threshold, horizon).await
        }
        Commands::Recommend {
            metric,
            peak,
            threshold,
            cost_per_server,
            exchange_rate,
            format,
        } => commands::recommend::recommend(
            &config,
            metric,
            peak,
            threshold,
            cost_per_server,
            exchange_rate,
            format,
        ),
        Commands::Import { csv } => commands::transfer::import(&config, &csv),
        Commands::Export { csv } => commands::transfer::export(&config, &csv),
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("loadcast=info".parse()?);

    // Logs go to stderr so report output stays machine-readable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Load the config file (if any) and apply the global storage overrides.
fn load_config(cli: &Cli) -> anyhow::Result<LoadcastConfig> {
    let mut config = match &cli.config {
        Some(path) => LoadcastConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoadcastConfig::default(),
    };

    if let Some(backend) = cli.backend {
        config.storage.backend = backend.into();
    }
    if let Some(path) = &cli.data {
        config.storage.path = path.clone();
    }

    config.validate()?;
    Ok(config)
}

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use loadcast_core::LoadcastConfig;
use loadcast_sampler::{LiveSampler, SystemSource};
use loadcast_store::open_store;

pub async fn collect(
    mut config: LoadcastConfig,
    interval_secs: Option<u64>,
    duration_mins: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(secs) = interval_secs {
        config.sampler.interval = format!("{secs}s");
    }
    if let Some(mins) = duration_mins {
        config.sampler.duration = format!("{mins}m");
    }
    config.validate()?;

    // Open the store up front so a bad path fails before sampling starts.
    let store = open_store(&config.storage)
        .with_context(|| format!("opening store {}", config.storage.path.display()))?;
    let sampler = LiveSampler::from_config(SystemSource::new(), &config.sampler)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping sampler");
            let _ = shutdown_tx.send(true);
        }
    });

    println!(
        "Sampling every {} for {} (Ctrl-C to stop early)...",
        config.sampler.interval, config.sampler.duration
    );
    let samples = sampler.run(shutdown_rx).await;

    if samples.is_empty() {
        println!("No samples collected.");
        return Ok(());
    }

    store.append(&samples)?;
    println!(
        "✓ Saved {} samples to {}",
        samples.len(),
        config.storage.path.display()
    );
    Ok(())
}

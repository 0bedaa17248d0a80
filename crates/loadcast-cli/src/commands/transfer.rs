use std::path::Path;

use anyhow::Context;

use loadcast_core::LoadcastConfig;
use loadcast_store::{CsvSampleStore, SampleStore, open_store};

/// Copy observations from a CSV file into the configured store.
pub fn import(config: &LoadcastConfig, csv: &Path) -> anyhow::Result<()> {
    let observations = CsvSampleStore::new(csv)
        .load_all()
        .with_context(|| format!("reading {}", csv.display()))?;
    if observations.is_empty() {
        println!("No observations found in {}", csv.display());
        return Ok(());
    }

    let store = open_store(&config.storage)?;
    store.append(&observations)?;
    println!(
        "✓ Imported {} observations into {}",
        observations.len(),
        config.storage.path.display()
    );
    Ok(())
}

/// Append the configured store's observations, oldest first, to a CSV file.
pub fn export(config: &LoadcastConfig, csv: &Path) -> anyhow::Result<()> {
    let store = open_store(&config.storage)?;
    let mut observations = store.load_all()?;
    if observations.is_empty() {
        println!("No data available");
        return Ok(());
    }
    observations.sort_by_key(|obs| obs.timestamp);

    CsvSampleStore::new(csv)
        .append(&observations)
        .with_context(|| format!("writing {}", csv.display()))?;
    println!("✓ Exported {} observations to {}", observations.len(), csv.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use loadcast_core::{Observation, StorageBackend, StorageConfig};

    fn config_in(dir: &Path) -> LoadcastConfig {
        LoadcastConfig {
            storage: StorageConfig {
                backend: StorageBackend::Redb,
                path: dir.join("samples.redb"),
            },
            ..LoadcastConfig::default()
        }
    }

    #[test]
    fn import_then_export_keeps_observations() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let source = dir.path().join("in.csv");
        let later = Observation::new(Utc.with_ymd_and_hms(2024, 2, 1, 10, 5, 0).unwrap(), 20.0, 30.0);
        let earlier = Observation::new(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(), 10.0, 25.0);
        CsvSampleStore::new(&source).append(&[later, earlier]).unwrap();

        import(&config, &source).unwrap();

        let target = dir.path().join("out.csv");
        export(&config, &target).unwrap();

        let exported = CsvSampleStore::new(&target).load_all().unwrap();
        assert_eq!(exported, vec![earlier, later]);
    }

    #[test]
    fn export_of_empty_store_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let target = dir.path().join("out.csv");

        export(&config, &target).unwrap();
        assert!(!target.exists());
    }
}

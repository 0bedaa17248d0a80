//! loadcast-store: durable storage for raw utilization samples.
//!
//! Two backends implement the append-only `SampleStore` contract:
//!
//! - `RedbSampleStore` keeps JSON-encoded observations in a redb table
//!   keyed by timestamp (microseconds). Appending an existing timestamp
//!   replaces the earlier value.
//! - `CsvSampleStore` keeps the flat-file layout
//!   `date,cpu_usage,memory_usage`, header on first write only. Duplicate
//!   timestamps are kept and resolved later by the aggregator.

pub mod csv;
pub mod error;
pub mod store;
pub mod tables;

use loadcast_core::{Observation, StorageBackend, StorageConfig};

pub use crate::csv::CsvSampleStore;
pub use error::{StoreError, StoreResult};
pub use store::RedbSampleStore;

/// Append-only persistence for observations.
pub trait SampleStore: Send + Sync {
    /// Persist a batch of observations.
    fn append(&self, observations: &[Observation]) -> StoreResult<()>;

    /// Load everything ever appended. Order and uniqueness are not
    /// guaranteed.
    fn load_all(&self) -> StoreResult<Vec<Observation>>;
}

/// Open the backend selected by the storage config.
pub fn open_store(config: &StorageConfig) -> StoreResult<Box<dyn SampleStore>> {
    match config.backend {
        StorageBackend::Redb => Ok(Box::new(RedbSampleStore::open(&config.path)?)),
        StorageBackend::Csv => Ok(Box::new(CsvSampleStore::new(&config.path))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn open_store_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let obs = Observation::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), 10.0, 20.0);

        for (backend, file) in [
            (StorageBackend::Redb, "samples.redb"),
            (StorageBackend::Csv, "samples.csv"),
        ] {
            let config = StorageConfig {
                backend,
                path: dir.path().join(file),
            };
            let store = open_store(&config).unwrap();
            store.append(&[obs]).unwrap();
            assert_eq!(store.load_all().unwrap(), vec![obs]);
        }
    }
}

//! RedbSampleStore: redb-backed observation persistence.
//!
//! Observations are JSON-serialized into redb's `&[u8]` value column and
//! keyed by their timestamp in microseconds. The store supports both on-disk
//! and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::debug;

use loadcast_core::Observation;

use crate::SampleStore;
use crate::error::{StoreError, StoreResult};
use crate::tables::OBSERVATIONS;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Thread-safe sample store backed by redb.
#[derive(Clone)]
pub struct RedbSampleStore {
    db: Arc<Database>,
}

impl RedbSampleStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "sample store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory sample store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(OBSERVATIONS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Number of distinct timestamps stored.
    pub fn len(&self) -> StoreResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(OBSERVATIONS).map_err(map_err!(Table))?;
        table.len().map_err(map_err!(Read))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl SampleStore for RedbSampleStore {
    fn append(&self, observations: &[Observation]) -> StoreResult<()> {
        if observations.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(OBSERVATIONS).map_err(map_err!(Table))?;
            for obs in observations {
                let value = serde_json::to_vec(obs).map_err(map_err!(Serialize))?;
                table
                    .insert(obs.timestamp.timestamp_micros(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count = observations.len(), "observations appended");
        Ok(())
    }

    /// Load all observations in ascending timestamp order.
    fn load_all(&self) -> StoreResult<Vec<Observation>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(OBSERVATIONS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let obs: Observation =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(obs);
        }
        Ok(results)
    }
}

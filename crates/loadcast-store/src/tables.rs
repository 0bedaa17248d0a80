//! redb table definitions for the sample store.

use redb::TableDefinition;

/// Observations keyed by timestamp in microseconds since the Unix epoch.
/// Values are JSON-serialized `Observation`s.
pub const OBSERVATIONS: TableDefinition<i64, &[u8]> = TableDefinition::new("observations");

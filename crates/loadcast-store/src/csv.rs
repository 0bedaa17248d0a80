//! Flat-file sample store.
//!
//! One row per observation, columns `date,cpu_usage,memory_usage`. The
//! header is written only when the file is created; later batches append
//! rows without it. Rows are returned in file order, duplicates included.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use ::csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use loadcast_core::Observation;

use crate::SampleStore;
use crate::error::{StoreError, StoreResult};

pub const HEADER: &str = "date,cpu_usage,memory_usage";

/// One CSV row; field order defines the header.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    date: String,
    cpu_usage: f64,
    memory_usage: f64,
}

impl From<&Observation> for CsvRow {
    fn from(obs: &Observation) -> Self {
        Self {
            date: obs.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            cpu_usage: obs.cpu_usage,
            memory_usage: obs.memory_usage,
        }
    }
}

/// Append-only CSV file of observations.
#[derive(Debug, Clone)]
pub struct CsvSampleStore {
    path: PathBuf,
}

impl CsvSampleStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleStore for CsvSampleStore {
    fn append(&self, observations: &[Observation]) -> StoreResult<()> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        for obs in observations {
            writer
                .serialize(CsvRow::from(obs))
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }
        writer.flush()?;

        debug!(path = ?self.path, count = observations.len(), "observations appended");
        Ok(())
    }

    fn load_all(&self) -> StoreResult<Vec<Observation>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
        let headers = reader.headers().map_err(csv_error)?.clone();

        let mut results = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            let row: CsvRow = record
                .deserialize(Some(&headers))
                .map_err(|e| StoreError::Csv {
                    line,
                    message: e.to_string(),
                })?;
            let timestamp = parse_timestamp(&row.date).ok_or_else(|| StoreError::Csv {
                line,
                message: format!("bad timestamp {:?}", row.date),
            })?;
            results.push(Observation::new(timestamp, row.cpu_usage, row.memory_usage));
        }
        Ok(results)
    }
}

fn csv_error(e: ::csv::Error) -> StoreError {
    let line = e.position().map_or(0, |p| p.line() as usize);
    StoreError::Csv {
        line,
        message: e.to_string(),
    }
}

/// Accept RFC 3339 or a naive `YYYY-MM-DD HH:MM:SS[.f]` (taken as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn obs_at(second: i64, cpu: f64, mem: f64) -> Observation {
        let base = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        Observation::new(base + Duration::seconds(second), cpu, mem)
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSampleStore::new(dir.path().join("cpu_data.csv"));

        store.append(&[obs_at(0, 1.0, 2.0)]).unwrap();
        store.append(&[obs_at(5, 3.0, 4.0)]).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.matches(HEADER).count(), 1);
        assert!(text.starts_with(HEADER));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn round_trip_preserves_rows_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSampleStore::new(dir.path().join("samples.csv"));
        let rows = vec![obs_at(0, 12.5, 40.0), obs_at(5, 13.0, 41.25), obs_at(5, 14.0, 42.0)];

        store.append(&rows).unwrap();
        assert_eq!(store.load_all().unwrap(), rows);
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSampleStore::new(dir.path().join("absent.csv"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn accepts_naive_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(
            &path,
            "date,cpu_usage,memory_usage\n2024-03-10 08:00:00.250000,7.5,51.2\n2024-03-10 08:00:05,8,51.3\n",
        )
        .unwrap();

        let rows = CsvSampleStore::new(&path).load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, obs_at(0, 0.0, 0.0).timestamp + Duration::milliseconds(250));
        assert_eq!(rows[1].cpu_usage, 8.0);
    }

    #[test]
    fn accepts_quoted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quoted.csv");
        std::fs::write(
            &path,
            "\"date\",\"cpu_usage\",\"memory_usage\"\n\"2024-07-01 08:00:00\",\"50.5\",\"40\"\n",
        )
        .unwrap();

        let rows = CsvSampleStore::new(&path).load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap());
        assert_eq!(rows[0].cpu_usage, 50.5);
        assert_eq!(rows[0].memory_usage, 40.0);
    }

    #[test]
    fn wrong_column_count_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "date,cpu_usage,memory_usage\n2024-03-10T08:00:00Z,1\n").unwrap();

        let err = CsvSampleStore::new(&path).load_all().unwrap_err();
        assert!(matches!(err, StoreError::Csv { line: 2, .. }));
    }

    #[test]
    fn malformed_row_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "date,cpu_usage,memory_usage\n2024-03-10T08:00:00Z,abc,1\n").unwrap();

        let err = CsvSampleStore::new(&path).load_all().unwrap_err();
        assert!(matches!(err, StoreError::Csv { line: 2, .. }));
    }
}

//! Durable, bounded parcel history.
//!
//! One JSON file holding the most-recently-touched records, newest first.
//! Every write is a full-file rewrite through a temp file so a crashed
//! write cannot corrupt existing history. Concurrency is the engine's job:
//! the store sits behind a mutex and every read-modify-write happens under
//! it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::TrackerError;
use crate::models::parcel::ParcelRecord;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full record list. A missing or corrupt file degrades to an
    /// empty list with a warning; a parse error never reaches the caller.
    pub fn load(&self) -> Vec<ParcelRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %err, "failed to read history; starting empty");
                }
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "history file is corrupt; starting empty");
                Vec::new()
            }
        }
    }

    pub fn find(&self, number: &str) -> Option<ParcelRecord> {
        self.load()
            .into_iter()
            .find(|record| record.number == number)
    }

    /// Full-file rewrite: write to a temp file, then rename over the target.
    pub fn save(&self, records: &[ParcelRecord]) -> Result<(), TrackerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(persistence_err)?;
        }

        let body = serde_json::to_string_pretty(records).map_err(persistence_err)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(persistence_err)?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(persistence_err(err));
        }
        Ok(())
    }

    /// Replace any entry with the same tracking number, insert at the front,
    /// truncate to capacity.
    pub fn upsert(&self, record: ParcelRecord) -> Result<(), TrackerError> {
        let mut records = self.load();
        records.retain(|existing| existing.number != record.number);
        records.insert(0, record);
        records.truncate(self.capacity);
        self.save(&records)
    }

    pub fn remove(&self, number: &str) -> Result<(), TrackerError> {
        let mut records = self.load();
        records.retain(|record| record.number != number);
        self.save(&records)
    }

    pub fn clear(&self) -> Result<(), TrackerError> {
        self.save(&[])
    }
}

fn persistence_err(err: impl std::fmt::Display) -> TrackerError {
    TrackerError::Persistence(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{DEFAULT_HISTORY_LIMIT, HistoryStore};
    use crate::models::parcel::ParcelRecord;
    use crate::models::status::StatusCode;

    fn store_in(dir: &TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("history.json"), DEFAULT_HISTORY_LIMIT)
    }

    fn record(number: &str) -> ParcelRecord {
        let mut record = ParcelRecord::new("Keyboard", number, "CJ Logistics");
        record.last_status = StatusCode::InTransit;
        record
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().is_empty());
    }

    #[test]
    fn load_corrupt_file_returns_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(HistoryStore::new(path, DEFAULT_HISTORY_LIMIT).load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips_exactly() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let records = vec![record("A1"), record("B2")];

        store.save(&records).unwrap();
        assert_eq!(store.load(), records);
    }

    #[test]
    fn upsert_inserts_at_front() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("A1")).unwrap();
        store.upsert(record("B2")).unwrap();

        let numbers: Vec<String> = store.load().into_iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec!["B2", "A1"]);
    }

    #[test]
    fn upsert_replaces_instead_of_duplicating() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("A1")).unwrap();
        store.upsert(record("B2")).unwrap();

        let mut updated = record("A1");
        updated.last_status = StatusCode::Delivered;
        store.upsert(updated).unwrap();

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].number, "A1");
        assert_eq!(records[0].last_status, StatusCode::Delivered);
    }

    #[test]
    fn eleventh_record_evicts_the_oldest() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for i in 0..11 {
            store.upsert(record(&format!("P{i}"))).unwrap();
        }

        let records = store.load();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].number, "P10");
        assert!(!records.iter().any(|r| r.number == "P0"));
    }

    #[test]
    fn remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("A1")).unwrap();
        store.upsert(record("B2")).unwrap();

        store.remove("A1").unwrap();
        assert_eq!(store.load().len(), 1);
        assert!(store.find("A1").is_none());
        assert!(store.find("B2").is_some());

        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("A1")).unwrap();
        assert!(!dir.path().join("history.json.tmp").exists());
    }
}

//! Hit bookkeeping and persistence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::model::JumplinkId;
use crate::store::{HitRecorder, StoreError};

/// Hits recorded for one jumplink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRecord {
    pub hits: u64,
    pub last_hit: DateTime<Utc>,
}

/// A thread-safe hit ledger, optionally persisted as JSON.
///
/// Every recorded hit is flushed to disk when a persistence path is set, so
/// short-lived processes never lose bookkeeping. Saves are serialised across
/// clones and land through a temporary file, so a reader never sees a
/// partially written ledger.
#[derive(Debug, Clone, Default)]
pub struct HitLedger {
    inner: Arc<DashMap<JumplinkId, HitRecord>>,
    persistence_path: Option<PathBuf>,
    save_lock: Arc<Mutex<()>>,
}

impl HitLedger {
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
            save_lock: Arc::default(),
        }
    }

    /// Load from file if it exists.
    pub fn load_from_file(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let ledger = Self::new(Some(path.clone()));
        if path.exists() {
            let file = File::open(&path).map_err(|source| io_error(&path, source))?;
            let map: HashMap<JumplinkId, HitRecord> = serde_json::from_reader(BufReader::new(file))?;
            for (id, record) in map {
                ledger.inner.insert(id, record);
            }
            tracing::debug!(path = %path.display(), entries = ledger.inner.len(), "Loaded hit ledger");
        }
        Ok(ledger)
    }

    /// Write the ledger to its persistence path, if any.
    pub fn save_to_file(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let _guard = self.save_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Snapshot under the lock so the last save always carries every hit.
        let map: HashMap<JumplinkId, HitRecord> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();

        let staging = staging_path(path);
        let file = File::create(&staging).map_err(|source| io_error(&staging, source))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &map)?;
        writer.flush().map_err(|source| io_error(&staging, source))?;
        drop(writer);
        std::fs::rename(&staging, path).map_err(|source| io_error(path, source))?;

        tracing::debug!(path = %path.display(), entries = map.len(), "Saved hit ledger");
        Ok(())
    }

    /// Increment the count for `id` and stamp `at` as its last hit.
    pub fn record(&self, id: JumplinkId, at: DateTime<Utc>) -> HitRecord {
        let mut entry = self.inner.entry(id).or_insert(HitRecord { hits: 0, last_hit: at });
        entry.hits += 1;
        entry.last_hit = at;
        entry.clone()
    }

    pub fn get(&self, id: JumplinkId) -> Option<HitRecord> {
        self.inner.get(&id).map(|r| r.value().clone())
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// All records ordered by jumplink id.
    pub fn snapshot(&self) -> Vec<(JumplinkId, HitRecord)> {
        let mut records: Vec<_> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        records.sort_by_key(|(id, _)| *id);
        records
    }
}

impl HitRecorder for HitLedger {
    fn record_hit(&self, id: JumplinkId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let record = self.record(id, at);
        tracing::debug!(jumplink = %id, hits = record.hits, "Hit recorded");
        self.save_to_file()
    }
}

/// Sibling of `path` that is renamed over it once fully written.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

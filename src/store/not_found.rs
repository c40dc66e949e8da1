//! 404 monitor log.
//!
//! Unresolved requests are appended as JSON lines, one entry per miss.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::IncomingRequest;
use crate::store::{MissLogger, StoreError};

/// One logged miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundEntry {
    pub request_uri: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl NotFoundEntry {
    pub fn from_request(request: &IncomingRequest, logged_at: DateTime<Utc>) -> Self {
        Self {
            request_uri: request.uri.clone(),
            referrer: request.referrer.clone(),
            user_agent: request.user_agent.clone(),
            logged_at,
        }
    }
}

/// Append-only JSON-lines log of unresolved requests.
#[derive(Debug)]
pub struct NotFoundLog {
    path: PathBuf,
    /// Serialises appends from concurrent resolution passes.
    write_lock: Mutex<()>,
}

impl NotFoundLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &NotFoundEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(line.as_bytes())
            .map_err(|source| self.io_error(source))
    }

    /// Read every entry back. A missing file yields no entries.
    pub fn entries(&self) -> Result<Vec<NotFoundEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| self.io_error(source))?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl MissLogger for NotFoundLog {
    fn log_miss(&self, request: &IncomingRequest) -> Result<(), StoreError> {
        self.append(&NotFoundEntry::from_request(request, Utc::now()))?;
        tracing::debug!(uri = %request.uri, path = %self.path.display(), "Logged 404");
        Ok(())
    }
}

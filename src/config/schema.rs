//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file, and every section falls back to its defaults when omitted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fallback::DEFAULT_ACCEPTED_STATUS_CODES;
use crate::rewrite::{Cleaner, CleaningMode};

/// Root configuration for the redirect engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct JumplinksConfig {
    /// Request handling and resolution behaviour.
    pub engine: EngineConfig,

    /// Wildcard value cleaning.
    pub cleaning: CleaningConfig,

    /// Legacy domain fallback.
    pub legacy: LegacyConfig,

    /// File locations for rules and bookkeeping.
    pub storage: StorageConfig,

    pub observability: ObservabilityConfig,
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path the site is mounted at. Stripped from incoming requests.
    pub root_url: String,

    /// Prefixed to destinations that carry no scheme. Empty disables it.
    pub site_url: String,

    /// Resolve without redirecting through the legacy domain or touching
    /// bookkeeping.
    pub diagnostic_mode: bool,

    /// Log unresolved requests.
    pub not_found_log: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_url: "/".to_string(),
            site_url: String::new(),
            diagnostic_mode: false,
            not_found_log: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CleaningConfig {
    pub mode: CleaningMode,

    /// Split camel case and letter/digit boundaries.
    pub enhanced: bool,
}

impl CleaningConfig {
    pub fn cleaner(&self) -> Cleaner {
        Cleaner::new(self.mode, self.enhanced)
    }
}

/// Legacy domain fallback configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LegacyConfig {
    /// Base URL of the previous site. Empty disables the fallback.
    pub domain: String,

    /// Probe statuses that count as "the legacy page exists".
    pub accepted_status_codes: Vec<u16>,

    /// Upper bound on a single probe.
    pub timeout_secs: u64,
}

impl LegacyConfig {
    pub fn is_enabled(&self) -> bool {
        !self.domain.trim().is_empty()
    }
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            accepted_status_codes: DEFAULT_ACCEPTED_STATUS_CODES.to_vec(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// TOML rule table, re-read on every resolution.
    pub table_path: PathBuf,

    /// JSON hit ledger.
    pub hits_path: PathBuf,

    /// JSON-lines 404 log.
    pub not_found_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("jumplinks-table.toml"),
            hits_path: PathBuf::from("jumplinks-hits.json"),
            not_found_path: PathBuf::from("jumplinks-404.jsonl"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

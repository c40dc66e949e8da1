//! Storage collaborators.
//!
//! # Data Flow
//! ```text
//! Resolution pass start:
//!     RuleSource::load → jumplinks (stored order) + mapping collections
//!
//! Destination expansion:
//!     PageResolver (page:<id>) / SelectorResolver ([[selector]])
//!
//! Resolution pass end:
//!     live redirect → HitRecorder::record_hit   (blocking pool)
//!     no decision   → MissLogger::log_miss      (blocking pool)
//! ```
//!
//! # Design Decisions
//! - The engine only reads rules; bookkeeping goes through dedicated traits
//! - Bookkeeping failures are reported to the caller as `StoreError` and
//!   logged by the resolver, never turned into a failed resolution

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{IncomingRequest, Jumplink, JumplinkId};
use crate::rewrite::MappingCollection;

pub mod hits;
pub mod not_found;
pub mod table;

pub use hits::{HitLedger, HitRecord};
pub use not_found::{NotFoundEntry, NotFoundLog};
pub use table::{RuleTable, StaticPages, TableFile};

/// Errors raised by storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule table {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything read from storage at the start of a resolution pass.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Jumplinks in evaluation order.
    pub jumplinks: Vec<Jumplink>,
    pub collections: Vec<MappingCollection>,
}

/// Ordered read access to the stored jumplinks and collections.
pub trait RuleSource: Send + Sync {
    fn load(&self) -> Result<RuleSet, StoreError>;
}

/// Resolves `page:<id>` destinations to a path.
pub trait PageResolver: Send + Sync {
    fn resolve_page(&self, id: u64) -> Option<String>;
}

/// Resolves `[[selector]]` destination fragments to a path.
pub trait SelectorResolver: Send + Sync {
    fn resolve_selector(&self, selector: &str) -> Option<String>;
}

/// Persists hit bookkeeping for live redirects.
///
/// The resolver calls this on Tokio's blocking pool, so implementations may
/// do synchronous I/O.
pub trait HitRecorder: Send + Sync {
    fn record_hit(&self, id: JumplinkId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Persists unresolved requests. Called on Tokio's blocking pool.
pub trait MissLogger: Send + Sync {
    fn log_miss(&self, request: &IncomingRequest) -> Result<(), StoreError>;
}

/// Page resolver for hosts without pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPages;

impl PageResolver for NoPages {
    fn resolve_page(&self, _id: u64) -> Option<String> {
        None
    }
}

/// Selector resolver for hosts without selectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSelectors;

impl SelectorResolver for NoSelectors {
    fn resolve_selector(&self, _selector: &str) -> Option<String> {
        None
    }
}

/// Bookkeeping sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl HitRecorder for Discard {
    fn record_hit(&self, _id: JumplinkId, _at: DateTime<Utc>) -> Result<(), StoreError> {
        Ok(())
    }
}

impl MissLogger for Discard {
    fn log_miss(&self, _request: &IncomingRequest) -> Result<(), StoreError> {
        Ok(())
    }
}

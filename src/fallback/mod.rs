//! Legacy domain fallback.
//!
//! # Data Flow
//! ```text
//! Rule table exhausted with no active match
//!     → legacy domain configured?
//!     → legacy URL = domain + normalised request path
//!     → probe.rs (HEAD, no redirect following, bounded by timeout)
//!     → status in accepted list? → legacy URL
//! ```
//!
//! # Design Decisions
//! - Probe failures are never fatal; they count as a rejected status
//! - Legacy redirects are always temporary

pub mod probe;

use std::sync::Arc;

pub use probe::{HttpProbe, ProbeError, StatusProbe};

/// Default accepted legacy status codes.
pub const DEFAULT_ACCEPTED_STATUS_CODES: [u16; 3] = [200, 301, 302];

/// Outcome of a legacy probe that the resolver can act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyHit {
    pub url: String,
    pub status: u16,
}

/// Probes the legacy domain for requests no rule handled.
#[derive(Clone)]
pub struct LegacyFallback {
    domain: String,
    accepted: Vec<u16>,
    probe: Arc<dyn StatusProbe>,
}

impl LegacyFallback {
    pub fn new(domain: impl Into<String>, accepted: Vec<u16>, probe: Arc<dyn StatusProbe>) -> Self {
        Self {
            domain: domain.into(),
            accepted,
            probe,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `domain` and `path` joined by exactly one slash.
    pub fn legacy_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.domain.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.accepted.contains(&status)
    }

    /// Probe the legacy counterpart of `path`.
    pub async fn check(&self, path: &str) -> Option<LegacyHit> {
        let url = self.legacy_url(path);
        tracing::debug!(url = %url, "Probing legacy domain");

        match self.probe.probe(&url).await {
            Ok(status) if self.accepts(status) => {
                tracing::debug!(url = %url, status, "Legacy domain accepted request");
                Some(LegacyHit { url, status })
            }
            Ok(status) => {
                tracing::debug!(url = %url, status, "Legacy domain rejected request");
                None
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Legacy probe failed");
                None
            }
        }
    }
}

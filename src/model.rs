//! Core data types shared by the resolution subsystems.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a stored jumplink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JumplinkId(pub u64);

impl From<u64> for JumplinkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JumplinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single redirect rule as read from storage.
///
/// The engine never mutates a `Jumplink`; hit bookkeeping goes through
/// [`HitRecorder`](crate::store::HitRecorder).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Jumplink {
    pub id: JumplinkId,

    /// Source pattern in wildcard syntax.
    pub source: String,

    /// Destination template.
    pub destination: String,

    /// Raw activation start as stored. Malformed values count as absent.
    #[serde(default)]
    pub date_start: Option<String>,

    /// Raw activation end as stored. Malformed values count as absent.
    #[serde(default)]
    pub date_end: Option<String>,

    #[serde(default)]
    pub hits: u64,

    #[serde(default)]
    pub last_hit: Option<String>,
}

impl Jumplink {
    pub fn new(id: u64, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id: JumplinkId(id),
            source: source.into(),
            destination: destination.into(),
            date_start: None,
            date_end: None,
            hits: 0,
            last_hit: None,
        }
    }

    /// Set the activation window bounds.
    pub fn with_window(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.date_start = start.map(str::to_string);
        self.date_end = end.map(str::to_string);
        self
    }
}

/// The unresolved request handed to the engine by the host.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// Request URI (path plus optional query string), as received.
    pub uri: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl IncomingRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            referrer: None,
            user_agent: None,
        }
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// Redirect the client.
    Redirect {
        url: String,
        permanent: bool,
        /// `None` when the redirect did not come from a stored rule.
        matched_rule: Option<JumplinkId>,
    },
    /// The legacy domain accepted the request, but diagnostic mode
    /// suppressed the live redirect.
    WouldRedirect { url: String, status: u16 },
    /// Let the host render its 404 page.
    NoMatch,
}

impl Decision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Decision::Redirect { .. })
    }

    /// Target URL, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Decision::Redirect { url, .. } | Decision::WouldRedirect { url, .. } => Some(url),
            Decision::NoMatch => None,
        }
    }

    /// HTTP status the host should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Decision::Redirect { permanent: true, .. } => 301,
            Decision::Redirect { permanent: false, .. } => 302,
            Decision::WouldRedirect { .. } | Decision::NoMatch => 404,
        }
    }
}

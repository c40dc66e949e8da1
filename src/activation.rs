//! Timed activation.
//!
//! # States
//! - Unbounded: no start, no end. Always active, permanent redirect.
//! - Delayed: start only. Active from start onwards.
//! - Bounded: end only. Starts now, active until end.
//! - Windowed: both given.
//!
//! # Design Decisions
//! - Start-only windows get a synthetic end one hour past `now`, so every
//!   bounded state is checked with the same inclusive comparison
//! - Any bound makes the redirect temporary
//! - Malformed or placeholder timestamps count as absent

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::model::Jumplink;

/// Stored dates at or before this day are placeholders for "no date".
const LOWEST_DATE: (i32, u32, u32) = (1974, 10, 10);

/// Activation state derived from a jumplink's stored bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Unbounded,
    Delayed {
        start: DateTime<Utc>,
    },
    Bounded {
        end: DateTime<Utc>,
    },
    Windowed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Effective window for one evaluation instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// The end was synthesised because none was stored.
    pub open_ended: bool,
}

impl Activation {
    pub fn from_bounds(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        match (start, end) {
            (None, None) => Activation::Unbounded,
            (Some(start), None) => Activation::Delayed { start },
            (None, Some(end)) => Activation::Bounded { end },
            (Some(start), Some(end)) => Activation::Windowed { start, end },
        }
    }

    pub fn of(jumplink: &Jumplink) -> Self {
        Self::from_bounds(
            jumplink.date_start.as_deref().and_then(parse_timestamp),
            jumplink.date_end.as_deref().and_then(parse_timestamp),
        )
    }

    /// Window in effect at `now`; `None` when unbounded.
    pub fn window(&self, now: DateTime<Utc>) -> Option<Window> {
        match *self {
            Activation::Unbounded => None,
            Activation::Delayed { start } => Some(Window {
                start,
                end: now + Duration::hours(1),
                open_ended: true,
            }),
            Activation::Bounded { end } => Some(Window {
                start: now,
                end,
                open_ended: false,
            }),
            Activation::Windowed { start, end } => Some(Window {
                start,
                end,
                open_ended: false,
            }),
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.window(now)
            .map_or(true, |w| now >= w.start && now <= w.end)
    }

    /// Bounded activation redirects temporarily.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Activation::Unbounded)
    }
}

/// Parse a stored timestamp, treating malformed and placeholder values as absent.
///
/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS` (interpreted as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        })?;

    let (y, m, d) = LOWEST_DATE;
    let lowest = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    (parsed > Utc.from_utc_datetime(&lowest)).then_some(parsed)
}

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! IncomingRequest (uri, referrer, user agent)
//!     → matcher.rs (normalise path, bare index.php short-circuit)
//!     → resolver.rs, for each jumplink in stored order:
//!         compile source → match → activation window → expand destination
//!     → first active match: Redirect (hit recorded)
//!     → exhausted: legacy fallback → Redirect / WouldRedirect
//!     → otherwise: NoMatch (miss logged)
//! ```
//!
//! # Design Decisions
//! - Deterministic: same table, request and instant give the same decision
//! - First match wins, in stored order
//! - Anchored, case-insensitive matching

pub mod matcher;
pub mod resolver;

pub use matcher::{normalize, NormalizedRequest, PatternError, PatternMatcher};
pub use resolver::{Diagnosis, Resolver, RuleOutcome, RuleTrace};

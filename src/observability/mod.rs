//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with named fields (rule_id, path, destination, ...)
//!
//! Consumers:
//!     → logging.rs subscriber (stderr, filtered by RUST_LOG or config)
//! ```
//!
//! # Design Decisions
//! - Per-rule compilation and matching details are emitted at debug level
//! - Decisions are emitted at info level, bookkeeping failures at warn

pub mod logging;

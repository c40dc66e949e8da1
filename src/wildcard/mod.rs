//! Wildcard pattern subsystem.
//!
//! # Data Flow
//! ```text
//! Jumplink.source ("blog/{year}/{title}")
//!     → compiler.rs (escape, optional chars, non-capturing spans)
//!     → table.rs (smart wildcard aliases → typed wildcards)
//!     → table.rs (typed wildcards → regex fragments)
//!     → CompiledPattern { expression, captures }
//! ```
//!
//! # Design Decisions
//! - Patterns are compiled on every resolution pass, never cached
//! - Capture order is left-to-right order of appearance in the source

pub mod compiler;
pub mod table;

pub use compiler::{compile, CompiledPattern, WildcardCapture};

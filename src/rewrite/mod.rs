//! Destination rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! Jumplink.destination + captured values
//!     → template.rs (page reference, placeholders)
//!     → cleaning.rs (per value, unless suppressed with '!')
//!     → collections.rs (mapping references, uncleaned values)
//!     → template.rs (selectors, trailing slash, site URL)
//!     → final redirect URL
//! ```

pub mod cleaning;
pub mod collections;
pub mod template;

pub use cleaning::{Cleaner, CleaningMode};
pub use collections::{CollectionSet, MappingCollection};
pub use template::{Expansion, ExpansionError, TemplateExpander};

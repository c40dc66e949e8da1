//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → JumplinksConfig (validated, immutable)
//!     → Resolver and storage collaborators
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CleaningConfig, EngineConfig, JumplinksConfig, LegacyConfig, ObservabilityConfig, StorageConfig,
};
pub use validation::{validate_config, ValidationError};

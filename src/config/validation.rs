//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs and value ranges (status codes, timeouts)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: JumplinksConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use url::Url;

use crate::config::schema::JumplinksConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("engine.root_url `{0}` must start and end with '/'")]
    RootUrl(String),

    #[error("engine.site_url `{0}` is not an absolute URL")]
    SiteUrl(String),

    #[error("legacy.domain `{0}` is not an absolute http(s) URL")]
    LegacyDomain(String),

    #[error("legacy.accepted_status_codes contains invalid status {0}")]
    StatusCode(u16),

    #[error("legacy.timeout_secs must be greater than zero")]
    ZeroTimeout,
}

pub fn validate_config(config: &JumplinksConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let root = &config.engine.root_url;
    if !root.starts_with('/') || !root.ends_with('/') {
        errors.push(ValidationError::RootUrl(root.clone()));
    }

    let site = config.engine.site_url.trim();
    if !site.is_empty() && Url::parse(site).is_err() {
        errors.push(ValidationError::SiteUrl(site.to_string()));
    }

    let legacy = &config.legacy;
    if legacy.is_enabled() {
        let domain = legacy.domain.trim();
        let valid = Url::parse(domain)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::LegacyDomain(domain.to_string()));
        }
    }

    errors.extend(
        legacy
            .accepted_status_codes
            .iter()
            .filter(|code| !(100..=599).contains(*code))
            .map(|code| ValidationError::StatusCode(*code)),
    );

    if legacy.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

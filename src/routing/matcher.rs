//! Request matching logic.
//!
//! # Responsibilities
//! - Normalise the request URI (leading slash, mount path, `index.php`)
//! - Anchor a compiled pattern at both ends and match case-insensitively
//! - Return captured values in capture order
//!
//! # Design Decisions
//! - Query strings are part of the matched text
//! - A pattern the regex engine rejects is an error for the caller to log,
//!   never a panic

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::wildcard::compiler::{CompiledPattern, INDEX_SENTINEL};

/// Error raised when a compiled expression is not a valid regex.
#[derive(Debug, Error)]
#[error("expression `{expression}` rejected: {source}")]
pub struct PatternError {
    pub expression: String,
    #[source]
    pub source: regex::Error,
}

/// A request URI after normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedRequest {
    /// A bare request for `index.php`, answered with the site root.
    IndexRoot,
    /// Path to match against jumplink sources.
    Path(String),
}

/// Normalise a request URI for matching.
pub fn normalize(uri: &str, root_url: &str) -> NormalizedRequest {
    let mut path = uri.trim_start_matches('/');

    if root_url != "/" {
        let mount = root_url.trim_start_matches('/');
        if let Some(rest) = path.strip_prefix(mount) {
            path = rest;
        }
    }

    if path == "index.php" || path == "index.php/" {
        return NormalizedRequest::IndexRoot;
    }

    match path.strip_prefix("index.php") {
        Some(rest) if rest.starts_with('?') || rest.starts_with('/') => {
            NormalizedRequest::Path(format!("{INDEX_SENTINEL}{rest}"))
        }
        _ => NormalizedRequest::Path(path.to_string()),
    }
}

/// Matches normalised request paths against one compiled pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    /// Build an anchored, case-insensitive matcher.
    pub fn new(pattern: &CompiledPattern) -> Result<Self, PatternError> {
        let anchored = format!("^(?:{})$", pattern.expression);
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError {
                expression: pattern.expression.clone(),
                source,
            })?;
        Ok(Self { regex })
    }

    /// Captured values in group order, or `None` when the path does not match.
    ///
    /// Groups that did not participate yield an empty string.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

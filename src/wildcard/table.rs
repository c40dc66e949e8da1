//! Wildcard type registry.
//!
//! # Responsibilities
//! - Map a wildcard type (`num`, `segment`, ...) to its regex fragment
//! - Map informal smart-wildcard names (`{id}`, `{path}`) to a canonical type
//!
//! # Design Decisions
//! - Static tables, iteration order is significant for smart expansion
//! - Unknown types are not an error; callers leave the token untouched

/// Wildcard types and the fragment each one expands to.
pub const WILDCARDS: &[(&str, &str)] = &[
    ("all", ".*"),
    ("alpha", "[a-z]+"),
    ("alphanum", r"\w+"),
    ("any", r"[\w.\-_%=\s]+"),
    (
        "ext",
        "aspx|asp|cfm|cgi|fcgi|dll|html|htm|shtml|shtm|jhtml|phtml|xhtm|xhtml|rbml|jspx|jsp|phps|php4|php",
    ),
    ("num", r"\d+"),
    ("segment", r"[\w_-]+"),
    ("segments", r"[\w/_-]+"),
];

/// Smart-wildcard alias groups and the type each group expands to.
pub const SMART_WILDCARDS: &[(&[&str], &str)] = &[
    (&["all"], "all"),
    (&["ext"], "ext"),
    (
        &["name", "title", "page", "post", "user", "model", "entry"],
        "segment",
    ),
    (&["path", "segments"], "segments"),
    (&["year", "month", "day", "id", "num"], "num"),
];

/// Regex fragment for a wildcard type.
pub fn fragment(kind: &str) -> Option<&'static str> {
    WILDCARDS
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, fragment)| *fragment)
}

/// Canonical wildcard type for a smart-wildcard name (case-insensitive).
pub fn smart_type(name: &str) -> Option<&'static str> {
    SMART_WILDCARDS
        .iter()
        .find(|(aliases, _)| aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name)))
        .map(|(_, kind)| *kind)
}

/// Alternation of every known type name, in table order.
pub(crate) fn type_alternation() -> String {
    WILDCARDS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join("|")
}

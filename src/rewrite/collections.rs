//! Mapping collections.
//!
//! Named key → value tables referenced from destination templates as
//! `{name|collection}`. Lookups that miss fall back to the original value.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// `(value|collection)` marker written literally into a destination.
static MAPPING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(([\w\-/]+)\|([a-z]+)\)").expect("static pattern"));

/// A stored mapping collection, as read from the rule table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingCollection {
    pub name: String,
    /// Newline-delimited `key=value` lines.
    pub mappings: String,
}

impl MappingCollection {
    pub fn new(name: impl Into<String>, mappings: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: mappings.into(),
        }
    }

    /// Parse the mapping lines in order.
    ///
    /// Only the text between the first and second `=` is the value. Lines
    /// without `=` are skipped.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.mappings
            .lines()
            .filter_map(|line| {
                let mut parts = line.split('=');
                let key = parts.next()?.trim();
                let value = parts.next()?.trim();
                Some((key.to_string(), value.to_string()))
            })
            .collect()
    }
}

/// All collections of one resolution pass, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CollectionSet {
    tables: HashMap<String, HashMap<String, String>>,
}

impl CollectionSet {
    /// Build the lookup tables. Later keys override earlier ones, and a later
    /// collection with the same name replaces an earlier one.
    pub fn load(collections: &[MappingCollection]) -> Self {
        let tables = collections
            .iter()
            .map(|c| (c.name.clone(), c.entries().into_iter().collect()))
            .collect();
        Self { tables }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Mapped value for `key`, if both the collection and key exist.
    pub fn lookup(&self, collection: &str, key: &str) -> Option<&str> {
        self.tables.get(collection)?.get(key).map(String::as_str)
    }

    /// Resolve `key` through `collection`, falling back to `key` itself.
    pub fn map_or_original<'a>(&'a self, collection: &str, key: &'a str) -> &'a str {
        self.lookup(collection, key).unwrap_or(key)
    }

    /// Replace every `(value|collection)` marker in `text`.
    pub fn apply(&self, text: &str) -> String {
        MAPPING_MARKER
            .replace_all(text, |caps: &Captures<'_>| {
                let key = caps.get(1).map_or("", |m| m.as_str());
                let collection = caps.get(2).map_or("", |m| m.as_str());
                match self.lookup(collection, key) {
                    Some(mapped) => mapped.to_string(),
                    None => {
                        tracing::debug!(collection, key, "Mapping miss, keeping original value");
                        key.to_string()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> CollectionSet {
        CollectionSet::load(&[
            MappingCollection::new("colors", "red=ff0000\ngreen=00ff00"),
            MappingCollection::new("authors", "3=rockett\r\n7=smith"),
        ])
    }

    #[test]
    fn test_entries_parse_in_order() {
        let c = MappingCollection::new("c", "a=1\nb=2=extra\nnot a mapping\n c = 3 ");
        assert_eq!(
            c.entries(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let set = set();
        assert_eq!(set.lookup("colors", "red"), Some("ff0000"));
        assert_eq!(set.lookup("authors", "3"), Some("rockett"));
        assert_eq!(set.lookup("colors", "blue"), None);
        assert_eq!(set.lookup("sizes", "red"), None);
    }

    #[test]
    fn test_apply_markers() {
        let set = set();
        assert_eq!(set.apply("/people/(3|authors)"), "/people/rockett");
        assert_eq!(set.apply("/c/(blue|colors)"), "/c/blue");
        assert_eq!(set.apply("/c/(red|nothing)"), "/c/red");
        assert_eq!(set.apply("/c/(red|colors)/(7|authors)"), "/c/ff0000/smith");
    }

    #[test]
    fn test_later_keys_override() {
        let set = CollectionSet::load(&[MappingCollection::new("k", "a=1\na=2")]);
        assert_eq!(set.map_or_original("k", "a"), "2");
        assert_eq!(set.map_or_original("k", "z"), "z");
    }
}

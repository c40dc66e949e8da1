//! TOML rule table.
//!
//! The table file holds the stored jumplinks in evaluation order, the mapping
//! collections, and the page and selector paths the host would otherwise
//! resolve from its own content tree.
//!
//! ```toml
//! [[jumplinks]]
//! id = 1
//! source = "old/{name:segment}"
//! destination = "new/{name}/"
//!
//! [[collections]]
//! name = "authors"
//! mappings = "3=rockett"
//!
//! [pages]
//! 1042 = "/about/"
//!
//! [selectors]
//! "template=post, name=hello" = "/blog/hello/"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::Jumplink;
use crate::rewrite::MappingCollection;
use crate::store::{PageResolver, RuleSet, RuleSource, SelectorResolver, StoreError};

/// Parsed contents of a rule table file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleTable {
    pub jumplinks: Vec<Jumplink>,
    pub collections: Vec<MappingCollection>,
    /// Page id → path. Keys are strings in TOML.
    pub pages: BTreeMap<String, String>,
    /// Selector → path.
    pub selectors: BTreeMap<String, String>,
}

impl RuleTable {
    /// Read a table from disk. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Rule table not found, using an empty table");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table: Self = toml::from_str(&content).map_err(|source| StoreError::Table {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            jumplinks = table.jumplinks.len(),
            collections = table.collections.len(),
            "Rule table loaded"
        );
        Ok(table)
    }

    /// Page and selector lookups backed by this table.
    pub fn static_pages(&self) -> StaticPages {
        let mut pages = StaticPages::default();
        for (id, path) in &self.pages {
            match id.trim().parse::<u64>() {
                Ok(id) => pages = pages.with_page(id, path),
                Err(_) => tracing::warn!(page = %id, "Ignoring page entry with a non-numeric id"),
            }
        }
        for (selector, path) in &self.selectors {
            pages = pages.with_selector(selector, path);
        }
        pages
    }
}

impl RuleSource for RuleTable {
    fn load(&self) -> Result<RuleSet, StoreError> {
        Ok(RuleSet {
            jumplinks: self.jumplinks.clone(),
            collections: self.collections.clone(),
        })
    }
}

/// A rule table re-read from disk on every resolution pass.
#[derive(Debug, Clone)]
pub struct TableFile {
    path: PathBuf,
}

impl TableFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for TableFile {
    fn load(&self) -> Result<RuleSet, StoreError> {
        RuleSource::load(&RuleTable::load(&self.path)?)
    }
}

/// In-memory page and selector lookups.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: HashMap<u64, String>,
    selectors: HashMap<String, String>,
}

impl StaticPages {
    pub fn with_page(mut self, id: u64, path: impl Into<String>) -> Self {
        self.pages.insert(id, path.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>, path: impl Into<String>) -> Self {
        self.selectors.insert(selector.into(), path.into());
        self
    }
}

impl PageResolver for StaticPages {
    fn resolve_page(&self, id: u64) -> Option<String> {
        self.pages.get(&id).cloned()
    }
}

impl SelectorResolver for StaticPages {
    fn resolve_selector(&self, selector: &str) -> Option<String> {
        self.selectors.get(selector.trim()).cloned()
    }
}

//! Destination template expansion.
//!
//! # Responsibilities
//! - Resolve `page:<id>` destinations through the page resolver
//! - Inject captured values into `{name}` / `{!name}` placeholders
//! - Resolve `{name|collection}` mapping references from uncleaned values
//! - Resolve `[[selector]]` references through the selector resolver
//! - Normalise the trailing slash against the template
//!
//! # Design Decisions
//! - Suppression (`!`) is decided per placeholder occurrence, or for every
//!   occurrence when the source declared the wildcard as `{!name:type}`
//! - A page or selector that resolves to nothing fails the expansion, and the
//!   resolver skips the rule

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::rewrite::cleaning::Cleaner;
use crate::rewrite::collections::CollectionSet;
use crate::store::{PageResolver, SelectorResolver};
use crate::wildcard::WildcardCapture;

const PAGE_IDENTIFIER: &str = "page:";

/// `({name}|collection)`, the parenthesised authoring form of a mapping reference.
static PARENTHESISED_MAPPING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(\{!?([a-z]+)\}\|([a-z]+)\)").expect("static pattern"));

static SELECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[\[([\w\-/\s=",.']+)\]\]"#).expect("static pattern"));

/// Reasons a matched rule cannot produce a destination.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("invalid page identifier `{0}`")]
    InvalidPageId(String),

    #[error("page {0} does not exist")]
    UnresolvedPage(u64),

    #[error("selector `{0}` did not return a page")]
    UnresolvedSelector(String),
}

/// One wildcard injected into the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub name: String,
    pub captured: String,
    pub injected: String,
}

/// A fully expanded destination.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// Destination after page resolution, before substitution.
    pub template: String,
    pub url: String,
    pub substitutions: Vec<Substitution>,
}

/// Expands destination templates for one resolution pass.
pub struct TemplateExpander<'a> {
    cleaner: Cleaner,
    collections: &'a CollectionSet,
    pages: &'a dyn PageResolver,
    selectors: &'a dyn SelectorResolver,
    site_url: Option<&'a str>,
}

impl<'a> TemplateExpander<'a> {
    pub fn new(
        cleaner: Cleaner,
        collections: &'a CollectionSet,
        pages: &'a dyn PageResolver,
        selectors: &'a dyn SelectorResolver,
    ) -> Self {
        Self {
            cleaner,
            collections,
            pages,
            selectors,
            site_url: None,
        }
    }

    /// Prefix scheme-less destinations with `site_url`.
    pub fn with_site_url(mut self, site_url: &'a str) -> Self {
        self.site_url = Some(site_url).filter(|s| !s.trim().is_empty());
        self
    }

    /// Expand `destination` with `values`, aligned with `captures`.
    pub fn expand(
        &self,
        destination: &str,
        captures: &[WildcardCapture],
        values: &[String],
    ) -> Result<Expansion, ExpansionError> {
        let template = self.resolve_page(destination)?;
        let mut result = PARENTHESISED_MAPPING
            .replace_all(&template, "{${1}|${2}}")
            .into_owned();

        let mut substitutions = Vec::with_capacity(captures.len());
        let mut mapped = Vec::new();
        for (capture, captured) in captures.iter().zip(values) {
            let injected = self.substitute(&mut result, &mut mapped, capture, captured);
            tracing::debug!(
                wildcard = %capture.name,
                captured = %captured,
                injected = %injected,
                "Wildcard substituted"
            );
            substitutions.push(Substitution {
                name: capture.name.clone(),
                captured: captured.clone(),
                injected,
            });
        }

        let mut url = result.trim_end_matches('/').to_string();
        if template.ends_with('/') {
            url.push('/');
        }

        let mut url = self.collections.apply(&url);
        for (index, value) in mapped.iter().enumerate() {
            url = url.replace(&mapping_slot(index), value);
        }
        let url = self.resolve_selectors(&url)?;
        let url = self.absolutize(url);

        Ok(Expansion {
            template,
            url,
            substitutions,
        })
    }

    fn resolve_page(&self, destination: &str) -> Result<String, ExpansionError> {
        let Some(raw_id) = destination.strip_prefix(PAGE_IDENTIFIER) else {
            return Ok(destination.to_string());
        };
        let id: u64 = raw_id
            .trim()
            .parse()
            .map_err(|_| ExpansionError::InvalidPageId(raw_id.to_string()))?;
        self.pages
            .resolve_page(id)
            .ok_or(ExpansionError::UnresolvedPage(id))
    }

    /// Inject one captured value and return what was injected into `{name}`.
    ///
    /// `{name|collection}` references are resolved here from the uncleaned
    /// value, but only a slot is left in `result`; the mapped value is put in
    /// after the trailing slash has been normalised.
    fn substitute(
        &self,
        result: &mut String,
        mapped: &mut Vec<String>,
        capture: &WildcardCapture,
        captured: &str,
    ) -> String {
        let raw_placeholder = format!("{{!{}}}", capture.name);
        let placeholder = format!("{{{}}}", capture.name);

        let injected = if capture.raw {
            captured.to_string()
        } else {
            self.cleaner.apply(captured)
        };

        if result.contains(&raw_placeholder) {
            *result = result.replace(&raw_placeholder, captured);
        }
        if result.contains(&placeholder) {
            *result = result.replace(&placeholder, &injected);
        }

        let mapping = format!(r"(?i)\{{{}\|([a-z]+)\}}", regex::escape(&capture.name));
        if let Ok(mapping) = Regex::new(&mapping) {
            *result = mapping
                .replace_all(result.as_str(), |caps: &Captures<'_>| {
                    let collection = &caps[1];
                    if self.collections.lookup(collection, captured).is_none() {
                        tracing::debug!(collection, key = %captured, "Mapping miss, keeping original value");
                    }
                    mapped.push(self.collections.map_or_original(collection, captured).to_string());
                    mapping_slot(mapped.len() - 1)
                })
                .into_owned();
        }

        injected
    }

    fn resolve_selectors(&self, url: &str) -> Result<String, ExpansionError> {
        let mut missing = None;
        let resolved = SELECTOR.replace_all(url, |caps: &Captures<'_>| {
            let selector = &caps[1];
            match self.selectors.resolve_selector(selector) {
                Some(path) => path,
                None => {
                    missing.get_or_insert_with(|| selector.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(selector) => Err(ExpansionError::UnresolvedSelector(selector)),
            None => Ok(resolved.into_owned()),
        }
    }

    fn absolutize(&self, url: String) -> String {
        match self.site_url {
            Some(site) if Url::parse(&url).is_err() => {
                format!("{}/{}", site.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url,
        }
    }
}

/// Placeholder for the `index`th mapped value. Control characters never occur
/// in templates or captured request paths.
fn mapping_slot(index: usize) -> String {
    format!("\u{1}{index}\u{1}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::cleaning::CleaningMode;
    use crate::rewrite::collections::MappingCollection;
    use crate::store::{NoPages, NoSelectors, StaticPages};
    use crate::wildcard::compile;

    fn expand_with(
        cleaner: Cleaner,
        collections: &CollectionSet,
        source: &str,
        destination: &str,
        values: &[&str],
    ) -> Result<Expansion, ExpansionError> {
        let pattern = compile(source);
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        TemplateExpander::new(cleaner, collections, &NoPages, &NoSelectors).expand(
            destination,
            &pattern.captures,
            &values,
        )
    }

    fn full() -> Cleaner {
        Cleaner::new(CleaningMode::FullClean, false)
    }

    #[test]
    fn test_basic_substitution() {
        let set = CollectionSet::default();
        let out = expand_with(full(), &set, "{year:segment}/{id:num}", "/archive/{year}/{id}", &["2019", "42"])
            .unwrap();
        assert_eq!(out.url, "/archive/2019/42");
        assert_eq!(out.substitutions.len(), 2);
    }

    #[test]
    fn test_cleaning_applied_and_suppressed() {
        let set = CollectionSet::default();
        let out = expand_with(full(), &set, "{title:any}", "/a/{title}/b/{!title}", &["Hello World"]).unwrap();
        assert_eq!(out.url, "/a/hello-world/b/Hello World");
    }

    #[test]
    fn test_source_suppression_bypasses_cleaning() {
        let set = CollectionSet::default();
        let out = expand_with(full(), &set, "{!code:any}", "/c/{code}", &["AbC_1"]).unwrap();
        assert_eq!(out.url, "/c/AbC_1");
    }

    #[test]
    fn test_trailing_slash_follows_template() {
        let set = CollectionSet::default();
        let forced = expand_with(Cleaner::new(CleaningMode::Off, false), &set, "{p:segments}", "/to/{p}/", &["x/y"])
            .unwrap();
        assert_eq!(forced.url, "/to/x/y/");

        let stripped = expand_with(Cleaner::new(CleaningMode::Off, false), &set, "{p:segments}", "/to/{p}", &["x/y/"])
            .unwrap();
        assert_eq!(stripped.url, "/to/x/y");
    }

    #[test]
    fn test_mapping_uses_uncleaned_value() {
        let set = CollectionSet::load(&[MappingCollection::new("brands", "ACME=acme-corp")]);
        let out = expand_with(full(), &set, "{b:segment}", "/brand/{b|brands}", &["ACME"]).unwrap();
        assert_eq!(out.url, "/brand/acme-corp");

        let miss = expand_with(full(), &set, "{b:segment}", "/brand/{b|brands}", &["Other"]).unwrap();
        assert_eq!(miss.url, "/brand/Other");
    }

    #[test]
    fn test_mapping_keys_outside_word_characters() {
        let set = CollectionSet::load(&[MappingCollection::new("files", "a.b=new")]);
        let off = || Cleaner::new(CleaningMode::Off, false);

        let dotted = expand_with(off(), &set, "f/{f:any}", "/x/{f|files}", &["a.b"]).unwrap();
        assert_eq!(dotted.url, "/x/new");

        let unmapped = expand_with(off(), &set, "f/{f:any}", "/x/{f|files}", &["c.d"]).unwrap();
        assert_eq!(unmapped.url, "/x/c.d");

        let encoded = expand_with(full(), &set, "f/{f:any}", "/x/{f|files}", &["Hello%20World"]).unwrap();
        assert_eq!(encoded.url, "/x/Hello%20World");

        let parenthesised = expand_with(full(), &set, "f/{f:any}", "/x/({f}|files)/", &["a.b"]).unwrap();
        assert_eq!(parenthesised.url, "/x/new/");
    }

    #[test]
    fn test_parenthesised_mapping_form() {
        let set = CollectionSet::load(&[MappingCollection::new("authors", "3=rockett")]);
        let out = expand_with(full(), &set, "author/{id:num}", "/people/({id}|authors)", &["3"]).unwrap();
        assert_eq!(out.url, "/people/rockett");
    }

    #[test]
    fn test_page_destination() {
        let set = CollectionSet::default();
        let pages = StaticPages::default().with_page(1042, "/about/");
        let expander = TemplateExpander::new(full(), &set, &pages, &NoSelectors);
        let out = expander.expand("page:1042", &[], &[]).unwrap();
        assert_eq!(out.url, "/about/");

        assert_eq!(
            expander.expand("page:9", &[], &[]).unwrap_err(),
            ExpansionError::UnresolvedPage(9)
        );
        assert_eq!(
            expander.expand("page:abc", &[], &[]).unwrap_err(),
            ExpansionError::InvalidPageId("abc".into())
        );
    }

    #[test]
    fn test_selector_destination() {
        let set = CollectionSet::default();
        let pages = StaticPages::default().with_selector("template=post, name=hello", "/blog/hello/");
        let expander = TemplateExpander::new(full(), &set, &pages, &pages);
        let out = expander
            .expand("[[template=post, name={slug}]]", &compile("{slug:segment}").captures, &["hello".into()])
            .unwrap();
        assert_eq!(out.url, "/blog/hello/");

        let err = expander
            .expand("[[template=post, name={slug}]]", &compile("{slug:segment}").captures, &["nope".into()])
            .unwrap_err();
        assert_eq!(err, ExpansionError::UnresolvedSelector("template=post, name=nope".into()));
    }

    #[test]
    fn test_site_url_prefix() {
        let set = CollectionSet::default();
        let expander = TemplateExpander::new(full(), &set, &NoPages, &NoSelectors)
            .with_site_url("https://example.com/");
        assert_eq!(expander.expand("new/page", &[], &[]).unwrap().url, "https://example.com/new/page");
        assert_eq!(
            expander.expand("https://other.org/x", &[], &[]).unwrap().url,
            "https://other.org/x"
        );
    }
}

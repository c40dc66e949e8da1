//! Resolution orchestration.
//!
//! # Responsibilities
//! - Scan jumplinks in stored order, first active match wins
//! - Expand the matched destination and pick the redirect class
//! - Fall back to the legacy domain once the table is exhausted
//! - Record hits and log misses outside diagnostic mode
//!
//! # Design Decisions
//! - Patterns are recompiled on every pass; nothing is cached across requests
//! - A rule that cannot produce a destination is skipped, never fatal
//! - An inactive match is not terminal in either mode
//! - Bookkeeping failures are logged and never change the decision
//! - Hit and miss writes run on Tokio's blocking pool, so file-backed
//!   collaborators never stall the async worker

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::activation::Activation;
use crate::config::JumplinksConfig;
use crate::fallback::{HttpProbe, LegacyFallback, ProbeError};
use crate::model::{Decision, IncomingRequest, Jumplink, JumplinkId};
use crate::rewrite::template::Substitution;
use crate::rewrite::{Cleaner, CollectionSet, MappingCollection, TemplateExpander};
use crate::routing::matcher::{normalize, NormalizedRequest, PatternMatcher};
use crate::store::{
    Discard, HitRecorder, MissLogger, NoPages, NoSelectors, PageResolver, RuleSource,
    SelectorResolver, StoreError,
};
use crate::wildcard::compiler::{compile, strip_sentinel};

/// What happened to one rule during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// The regex engine rejected the compiled expression.
    InvalidPattern { error: String },
    NoMatch,
    /// Matched outside its activation window.
    Inactive {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    /// Matched, but the destination could not be expanded.
    Unresolved { error: String },
    Matched {
        url: String,
        permanent: bool,
        substitutions: Vec<Substitution>,
    },
}

/// Diagnostic record for one evaluated rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleTrace {
    pub rule: JumplinkId,
    pub source: String,
    pub expression: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// A decision plus the per-rule trace that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    /// Request path after normalisation.
    pub path: String,
    pub decision: Decision,
    pub trace: Vec<RuleTrace>,
}

/// Resolves unresolved requests against the jumplink table.
#[derive(Clone)]
pub struct Resolver {
    root_url: String,
    site_url: String,
    diagnostic_mode: bool,
    not_found_log: bool,
    cleaner: Cleaner,
    legacy: Option<LegacyFallback>,
    pages: Arc<dyn PageResolver>,
    selectors: Arc<dyn SelectorResolver>,
    hits: Arc<dyn HitRecorder>,
    misses: Arc<dyn MissLogger>,
}

impl Resolver {
    /// Resolver with no legacy fallback and no-op collaborators.
    pub fn new(config: &JumplinksConfig) -> Self {
        Self {
            root_url: config.engine.root_url.clone(),
            site_url: config.engine.site_url.clone(),
            diagnostic_mode: config.engine.diagnostic_mode,
            not_found_log: config.engine.not_found_log,
            cleaner: config.cleaning.cleaner(),
            legacy: None,
            pages: Arc::new(NoPages),
            selectors: Arc::new(NoSelectors),
            hits: Arc::new(Discard),
            misses: Arc::new(Discard),
        }
    }

    /// Like [`Resolver::new`], with an HTTP legacy probe when a legacy domain
    /// is configured.
    pub fn from_config(config: &JumplinksConfig) -> Result<Self, ProbeError> {
        let resolver = Self::new(config);
        if !config.legacy.is_enabled() {
            return Ok(resolver);
        }

        let timeout = std::time::Duration::from_secs(config.legacy.timeout_secs);
        let probe = HttpProbe::new(timeout)?;
        Ok(resolver.with_legacy(LegacyFallback::new(
            config.legacy.domain.trim(),
            config.legacy.accepted_status_codes.clone(),
            Arc::new(probe),
        )))
    }

    pub fn with_legacy(mut self, legacy: LegacyFallback) -> Self {
        self.legacy = Some(legacy);
        self
    }

    pub fn with_pages(mut self, pages: Arc<dyn PageResolver>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_selectors(mut self, selectors: Arc<dyn SelectorResolver>) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_hits(mut self, hits: Arc<dyn HitRecorder>) -> Self {
        self.hits = hits;
        self
    }

    pub fn with_misses(mut self, misses: Arc<dyn MissLogger>) -> Self {
        self.misses = misses;
        self
    }

    pub fn with_diagnostic_mode(mut self, enabled: bool) -> Self {
        self.diagnostic_mode = enabled;
        self
    }

    pub fn is_diagnostic(&self) -> bool {
        self.diagnostic_mode
    }

    /// Resolve `request` against `rules`, evaluated in slice order.
    pub async fn resolve(
        &self,
        request: &IncomingRequest,
        rules: &[Jumplink],
        collections: &[MappingCollection],
    ) -> Decision {
        self.resolve_at(request, rules, collections, Utc::now()).await
    }

    /// Resolve as if the current time were `now`.
    pub async fn resolve_at(
        &self,
        request: &IncomingRequest,
        rules: &[Jumplink],
        collections: &[MappingCollection],
        now: DateTime<Utc>,
    ) -> Decision {
        self.run(request, rules, collections, now, self.diagnostic_mode, None)
            .await
            .1
    }

    /// Read the rule table from `source`, then resolve.
    ///
    /// Only the table read can fail.
    pub async fn resolve_from(
        &self,
        source: &dyn RuleSource,
        request: &IncomingRequest,
    ) -> Result<Decision, StoreError> {
        let rules = source.load()?;
        Ok(self
            .resolve(request, &rules.jumplinks, &rules.collections)
            .await)
    }

    /// Resolve in diagnostic mode and return the per-rule trace.
    pub async fn diagnose(
        &self,
        request: &IncomingRequest,
        rules: &[Jumplink],
        collections: &[MappingCollection],
    ) -> Diagnosis {
        self.diagnose_at(request, rules, collections, Utc::now()).await
    }

    pub async fn diagnose_at(
        &self,
        request: &IncomingRequest,
        rules: &[Jumplink],
        collections: &[MappingCollection],
        now: DateTime<Utc>,
    ) -> Diagnosis {
        let mut trace = Vec::new();
        let (path, decision) = self
            .run(request, rules, collections, now, true, Some(&mut trace))
            .await;
        Diagnosis {
            path: strip_sentinel(&path),
            decision,
            trace,
        }
    }

    async fn run(
        &self,
        request: &IncomingRequest,
        rules: &[Jumplink],
        collections: &[MappingCollection],
        now: DateTime<Utc>,
        diagnostic: bool,
        trace: Option<&mut Vec<RuleTrace>>,
    ) -> (String, Decision) {
        let path = match normalize(&request.uri, &self.root_url) {
            NormalizedRequest::IndexRoot => {
                tracing::debug!(uri = %request.uri, "Bare index.php request, redirecting to root");
                let decision = Decision::Redirect {
                    url: self.root_url.clone(),
                    permanent: true,
                    matched_rule: None,
                };
                return (request.uri.clone(), decision);
            }
            NormalizedRequest::Path(path) => path,
        };

        tracing::debug!(
            uri = %request.uri,
            path = %strip_sentinel(&path),
            rules = rules.len(),
            diagnostic,
            "Resolving request"
        );

        if let Some(decision) = self.scan(&path, rules, collections, now, diagnostic, trace) {
            if let Decision::Redirect {
                matched_rule: Some(id),
                ..
            } = &decision
            {
                if !diagnostic {
                    self.record_hit(*id, now).await;
                }
            }
            return (path, decision);
        }

        if let Some(decision) = self.try_legacy(&path, diagnostic).await {
            return (path, decision);
        }

        tracing::debug!(uri = %request.uri, "No jumplink matched");
        if self.not_found_log && !diagnostic {
            self.log_miss(request).await;
        }
        (path, Decision::NoMatch)
    }

    async fn record_hit(&self, id: JumplinkId, now: DateTime<Utc>) {
        let hits = self.hits.clone();
        match tokio::task::spawn_blocking(move || hits.record_hit(id, now)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(rule_id = %id, error = %e, "Failed to record hit"),
            Err(e) => tracing::warn!(rule_id = %id, error = %e, "Hit recorder task failed"),
        }
    }

    async fn log_miss(&self, request: &IncomingRequest) {
        let misses = self.misses.clone();
        let owned = request.clone();
        match tokio::task::spawn_blocking(move || misses.log_miss(&owned)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(uri = %request.uri, error = %e, "Failed to log 404"),
            Err(e) => tracing::warn!(uri = %request.uri, error = %e, "Miss logger task failed"),
        }
    }

    fn scan(
        &self,
        path: &str,
        rules: &[Jumplink],
        collections: &[MappingCollection],
        now: DateTime<Utc>,
        diagnostic: bool,
        mut trace: Option<&mut Vec<RuleTrace>>,
    ) -> Option<Decision> {
        let collections = CollectionSet::load(collections);
        let expander = TemplateExpander::new(
            self.cleaner,
            &collections,
            self.pages.as_ref(),
            self.selectors.as_ref(),
        )
        .with_site_url(&self.site_url);

        for rule in rules {
            let pattern = compile(&rule.source);
            let expression = strip_sentinel(&pattern.expression);
            tracing::debug!(
                rule_id = %rule.id,
                source = %strip_sentinel(&rule.source),
                escaped = %strip_sentinel(&pattern.escaped),
                expression = %expression,
                "Compiled jumplink source"
            );

            let mut record = |outcome: RuleOutcome| {
                if let Some(trace) = trace.as_deref_mut() {
                    trace.push(RuleTrace {
                        rule: rule.id,
                        source: strip_sentinel(&rule.source),
                        expression: expression.clone(),
                        outcome,
                    });
                }
            };

            let matcher = match PatternMatcher::new(&pattern) {
                Ok(matcher) => matcher,
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id, error = %e, "Skipping jumplink with invalid pattern");
                    record(RuleOutcome::InvalidPattern { error: e.to_string() });
                    continue;
                }
            };

            let Some(values) = matcher.captures(path) else {
                record(RuleOutcome::NoMatch);
                continue;
            };

            let activation = Activation::of(rule);
            if !activation.is_active(now) {
                let window = activation.window(now);
                tracing::debug!(
                    rule_id = %rule.id,
                    start = ?window.map(|w| w.start),
                    end = ?window.map(|w| w.end),
                    "Jumplink matched outside its activation window"
                );
                record(RuleOutcome::Inactive {
                    start: window.map(|w| w.start),
                    end: window.filter(|w| !w.open_ended).map(|w| w.end),
                });
                continue;
            }

            let expansion = match expander.expand(&rule.destination, &pattern.captures, &values) {
                Ok(expansion) => expansion,
                Err(e) => {
                    tracing::debug!(rule_id = %rule.id, error = %e, "Skipping jumplink with unresolvable destination");
                    record(RuleOutcome::Unresolved { error: e.to_string() });
                    continue;
                }
            };

            let permanent = activation.is_permanent();
            tracing::info!(
                rule_id = %rule.id,
                path = %strip_sentinel(path),
                destination = %expansion.url,
                permanent,
                diagnostic,
                "Jumplink matched"
            );

            record(RuleOutcome::Matched {
                url: expansion.url.clone(),
                permanent,
                substitutions: expansion.substitutions,
            });

            return Some(Decision::Redirect {
                url: expansion.url,
                permanent,
                matched_rule: Some(rule.id),
            });
        }

        None
    }

    async fn try_legacy(&self, path: &str, diagnostic: bool) -> Option<Decision> {
        let legacy = self.legacy.as_ref()?;
        let hit = legacy.check(&strip_sentinel(path)).await?;

        if diagnostic {
            tracing::info!(url = %hit.url, status = hit.status, "Legacy domain would redirect");
            return Some(Decision::WouldRedirect {
                url: hit.url,
                status: hit.status,
            });
        }

        tracing::info!(url = %hit.url, status = hit.status, "Redirecting to legacy domain");
        Some(Decision::Redirect {
            url: hit.url,
            permanent: false,
            matched_rule: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StaticPages;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        hits: Mutex<Vec<JumplinkId>>,
        misses: Mutex<Vec<String>>,
    }

    impl HitRecorder for Recorder {
        fn record_hit(&self, id: JumplinkId, _at: DateTime<Utc>) -> Result<(), StoreError> {
            self.hits.lock().unwrap().push(id);
            Ok(())
        }
    }

    impl MissLogger for Recorder {
        fn log_miss(&self, request: &IncomingRequest) -> Result<(), StoreError> {
            self.misses.lock().unwrap().push(request.uri.clone());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn resolver_with(recorder: &Arc<Recorder>) -> Resolver {
        Resolver::new(&JumplinksConfig::default())
            .with_hits(recorder.clone())
            .with_misses(recorder.clone())
    }

    #[tokio::test]
    async fn test_first_match_wins_and_records_hit() {
        let recorder = Arc::new(Recorder::default());
        let rules = vec![
            Jumplink::new(1, "old/{name:segment}", "/first/{name}"),
            Jumplink::new(2, "old/{name:any}", "/second/{name}"),
        ];

        let decision = resolver_with(&recorder)
            .resolve_at(&IncomingRequest::new("/old/page"), &rules, &[], now())
            .await;

        assert_eq!(
            decision,
            Decision::Redirect {
                url: "/first/page".into(),
                permanent: true,
                matched_rule: Some(JumplinkId(1)),
            }
        );
        assert_eq!(*recorder.hits.lock().unwrap(), vec![JumplinkId(1)]);
        assert!(recorder.misses.lock().unwrap().is_empty());
    }

    #[derive(Default)]
    struct ThreadSpy(Mutex<Vec<std::thread::ThreadId>>);

    impl HitRecorder for ThreadSpy {
        fn record_hit(&self, _id: JumplinkId, _at: DateTime<Utc>) -> Result<(), StoreError> {
            self.0.lock().unwrap().push(std::thread::current().id());
            Ok(())
        }
    }

    impl MissLogger for ThreadSpy {
        fn log_miss(&self, _request: &IncomingRequest) -> Result<(), StoreError> {
            self.0.lock().unwrap().push(std::thread::current().id());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_bookkeeping_runs_off_the_async_worker() {
        let spy = Arc::new(ThreadSpy::default());
        let resolver = Resolver::new(&JumplinksConfig::default())
            .with_hits(spy.clone())
            .with_misses(spy.clone());
        let rules = vec![Jumplink::new(1, "a", "/b")];

        resolver
            .resolve_at(&IncomingRequest::new("a"), &rules, &[], now())
            .await;
        resolver
            .resolve_at(&IncomingRequest::new("z"), &rules, &[], now())
            .await;

        let worker = std::thread::current().id();
        let threads = spy.0.lock().unwrap();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != worker));
    }

    #[tokio::test]
    async fn test_inactive_match_continues_scan() {
        let recorder = Arc::new(Recorder::default());
        let future = (now() + Duration::days(1)).to_rfc3339();
        let rules = vec![
            Jumplink::new(1, "promo", "/sale").with_window(Some(&future), None),
            Jumplink::new(2, "promo", "/regular"),
        ];

        let decision = resolver_with(&recorder)
            .resolve_at(&IncomingRequest::new("promo"), &rules, &[], now())
            .await;
        assert_eq!(decision.url(), Some("/regular"));
    }

    #[tokio::test]
    async fn test_no_match_logs_miss() {
        let recorder = Arc::new(Recorder::default());
        let decision = resolver_with(&recorder)
            .resolve_at(&IncomingRequest::new("/nothing"), &[], &[], now())
            .await;

        assert_eq!(decision, Decision::NoMatch);
        assert_eq!(*recorder.misses.lock().unwrap(), vec!["/nothing".to_string()]);
    }

    #[tokio::test]
    async fn test_miss_log_disabled() {
        let recorder = Arc::new(Recorder::default());
        let mut config = JumplinksConfig::default();
        config.engine.not_found_log = false;
        let resolver = Resolver::new(&config).with_misses(recorder.clone());

        resolver
            .resolve_at(&IncomingRequest::new("/nothing"), &[], &[], now())
            .await;
        assert!(recorder.misses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_diagnostic_mode_has_no_side_effects() {
        let recorder = Arc::new(Recorder::default());
        let resolver = resolver_with(&recorder).with_diagnostic_mode(true);
        let rules = vec![Jumplink::new(1, "a", "/b")];

        let hit = resolver
            .resolve_at(&IncomingRequest::new("a"), &rules, &[], now())
            .await;
        let miss = resolver
            .resolve_at(&IncomingRequest::new("z"), &rules, &[], now())
            .await;

        assert!(hit.is_redirect());
        assert_eq!(miss, Decision::NoMatch);
        assert!(recorder.hits.lock().unwrap().is_empty());
        assert!(recorder.misses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_php_root_redirect() {
        let mut config = JumplinksConfig::default();
        config.engine.root_url = "/site/".into();
        let decision = Resolver::new(&config)
            .resolve_at(&IncomingRequest::new("/site/index.php"), &[], &[], now())
            .await;

        assert_eq!(
            decision,
            Decision::Redirect {
                url: "/site/".into(),
                permanent: true,
                matched_rule: None,
            }
        );
    }

    #[tokio::test]
    async fn test_index_php_query_matches_source() {
        let rules = vec![Jumplink::new(5, "index.php?id={id:num}", "/item/{id}/")];
        let decision = Resolver::new(&JumplinksConfig::default())
            .resolve_at(&IncomingRequest::new("/index.php?id=12"), &rules, &[], now())
            .await;
        assert_eq!(decision.url(), Some("/item/12/"));
    }

    #[tokio::test]
    async fn test_unresolved_page_is_skipped() {
        let pages = Arc::new(StaticPages::default().with_page(7, "/contact/"));
        let rules = vec![
            Jumplink::new(1, "contact", "page:99"),
            Jumplink::new(2, "contact", "page:7"),
        ];
        let decision = Resolver::new(&JumplinksConfig::default())
            .with_pages(pages)
            .resolve_at(&IncomingRequest::new("contact"), &rules, &[], now())
            .await;
        assert_eq!(decision.url(), Some("/contact/"));
    }

    #[tokio::test]
    async fn test_diagnose_traces_every_evaluated_rule() {
        let future = (now() + Duration::days(1)).to_rfc3339();
        let rules = vec![
            Jumplink::new(1, "other", "/x"),
            Jumplink::new(2, "news/{slug:segment}", "/n/{slug}").with_window(Some(&future), None),
            Jumplink::new(3, "news/{slug:segment}", "/articles/{slug}/"),
            Jumplink::new(4, "news/{slug:segment}", "/never"),
        ];

        let diagnosis = Resolver::new(&JumplinksConfig::default())
            .diagnose_at(&IncomingRequest::new("news/Hello"), &rules, &[], now())
            .await;

        let outcomes: Vec<_> = diagnosis.trace.iter().map(|t| t.rule).collect();
        assert_eq!(outcomes, vec![JumplinkId(1), JumplinkId(2), JumplinkId(3)]);
        assert_eq!(diagnosis.trace[0].outcome, RuleOutcome::NoMatch);
        assert!(matches!(diagnosis.trace[1].outcome, RuleOutcome::Inactive { end: None, .. }));
        assert_eq!(diagnosis.decision.url(), Some("/articles/hello/"));
    }

    #[tokio::test]
    async fn test_bounded_rule_is_temporary() {
        let end = (now() + Duration::hours(1)).to_rfc3339();
        let rules = vec![Jumplink::new(1, "sale", "/summer").with_window(None, Some(&end))];
        let decision = Resolver::new(&JumplinksConfig::default())
            .resolve_at(&IncomingRequest::new("sale"), &rules, &[], now())
            .await;
        assert_eq!(decision.status_code(), 302);
    }
}

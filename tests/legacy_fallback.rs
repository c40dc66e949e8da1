//! Legacy domain fallback against a live mock server.

mod common;

use std::sync::{Arc, Mutex};

use jumplinks::config::JumplinksConfig;
use jumplinks::store::{MissLogger, StoreError};
use jumplinks::{Decision, IncomingRequest, Jumplink, Resolver};

#[derive(Default)]
struct Misses(Mutex<Vec<String>>);

impl MissLogger for Misses {
    fn log_miss(&self, request: &IncomingRequest) -> Result<(), StoreError> {
        self.0.lock().unwrap().push(request.uri.clone());
        Ok(())
    }
}

fn config_for(domain: String) -> JumplinksConfig {
    let mut config = JumplinksConfig::default();
    config.legacy.domain = domain;
    config.legacy.timeout_secs = 1;
    config
}

#[tokio::test]
async fn test_accepted_status_redirects_temporarily() {
    let (addr, requests) = common::start_legacy_server(200).await;
    let resolver = Resolver::from_config(&config_for(format!("http://{}/", addr))).unwrap();

    let decision = resolver
        .resolve(&IncomingRequest::new("/old/page.html"), &[], &[])
        .await;

    assert_eq!(
        decision,
        Decision::Redirect {
            url: format!("http://{}/old/page.html", addr),
            permanent: false,
            matched_rule: None,
        }
    );
    assert_eq!(
        *requests.lock().unwrap(),
        vec!["HEAD /old/page.html HTTP/1.1".to_string()]
    );
}

#[tokio::test]
async fn test_redirect_status_is_not_followed() {
    let (addr, requests) = common::start_legacy_server(301).await;
    let resolver = Resolver::from_config(&config_for(format!("http://{}", addr))).unwrap();

    let decision = resolver
        .resolve(&IncomingRequest::new("moved"), &[], &[])
        .await;

    assert_eq!(decision.url(), Some(format!("http://{}/moved", addr).as_str()));
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_status_falls_through_to_miss() {
    let (addr, _) = common::start_legacy_server(404).await;
    let misses = Arc::new(Misses::default());
    let resolver = Resolver::from_config(&config_for(format!("http://{}/", addr)))
        .unwrap()
        .with_misses(misses.clone());

    let decision = resolver
        .resolve(&IncomingRequest::new("/gone"), &[], &[])
        .await;

    assert_eq!(decision, Decision::NoMatch);
    assert_eq!(*misses.0.lock().unwrap(), vec!["/gone".to_string()]);
}

#[tokio::test]
async fn test_custom_accepted_codes() {
    let (addr, _) = common::start_programmable_legacy_server(|path| {
        if path.starts_with("/archive") {
            410
        } else {
            200
        }
    })
    .await;
    let mut config = config_for(format!("http://{}/", addr));
    config.legacy.accepted_status_codes = vec![410];
    let resolver = Resolver::from_config(&config).unwrap();

    let archived = resolver
        .resolve(&IncomingRequest::new("archive/1"), &[], &[])
        .await;
    let live = resolver
        .resolve(&IncomingRequest::new("current"), &[], &[])
        .await;

    assert!(archived.is_redirect());
    assert_eq!(live, Decision::NoMatch);
}

#[tokio::test]
async fn test_network_failure_is_no_match() {
    let addr = common::closed_addr().await;
    let resolver = Resolver::from_config(&config_for(format!("http://{}/", addr))).unwrap();

    let decision = resolver
        .resolve(&IncomingRequest::new("anything"), &[], &[])
        .await;
    assert_eq!(decision, Decision::NoMatch);
}

#[tokio::test]
async fn test_probe_timeout_is_no_match() {
    let addr = common::start_silent_server().await;
    let resolver = Resolver::from_config(&config_for(format!("http://{}/", addr))).unwrap();

    let started = std::time::Instant::now();
    let decision = resolver
        .resolve(&IncomingRequest::new("slow"), &[], &[])
        .await;

    assert_eq!(decision, Decision::NoMatch);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_rules_take_precedence_over_legacy() {
    let (addr, requests) = common::start_legacy_server(200).await;
    let resolver = Resolver::from_config(&config_for(format!("http://{}/", addr))).unwrap();
    let rules = vec![Jumplink::new(1, "old/{slug:segment}", "/new/{slug}/")];

    let decision = resolver
        .resolve(&IncomingRequest::new("/old/post"), &rules, &[])
        .await;

    assert_eq!(decision.url(), Some("/new/post/"));
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_diagnostic_mode_reports_would_redirect() {
    let (addr, _) = common::start_legacy_server(302).await;
    let mut config = config_for(format!("http://{}/", addr));
    config.engine.diagnostic_mode = true;
    let misses = Arc::new(Misses::default());
    let resolver = Resolver::from_config(&config)
        .unwrap()
        .with_misses(misses.clone());

    let decision = resolver
        .resolve(&IncomingRequest::new("legacy/page"), &[], &[])
        .await;

    assert_eq!(
        decision,
        Decision::WouldRedirect {
            url: format!("http://{}/legacy/page", addr),
            status: 302,
        }
    );
    assert_eq!(decision.status_code(), 404);
    assert!(misses.0.lock().unwrap().is_empty());
}

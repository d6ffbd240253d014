//! Navigation Coordinator
//!
//! Turns navigation events into injection requests. The rule list is read
//! once per event and matching runs against that snapshot, so edits made
//! while a request is in flight do not affect it.
//!
//! Nothing here propagates: store and injection failures are logged and the
//! event is dropped.

use crate::matcher::Matcher;
use crate::store::{parse_rules, Store, RULES_KEY};
use crate::types::{InjectionRequest, NavigationEvent, Rule, TabStatus};
use crate::url::is_web_url;

/// Error type for page injection.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("Tab {0} is gone")]
    NoSuchTab(i32),
    #[error("Cannot access tab {tab_id}: {reason}")]
    Denied { tab_id: i32, reason: String },
    #[error("Injection failed: {0}")]
    Other(String),
}

/// Delivers a removal request into a page.
pub trait Injector {
    fn inject(&mut self, request: InjectionRequest) -> Result<(), InjectError>;
}

/// What handling one navigation event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not a qualifying event
    Ignored,
    /// No enabled rule matched the URL
    NoMatch,
    /// The rule at `rule_index` was sent to the page
    Injected { rule_index: usize },
    /// Store or injection failure, already logged
    Failed,
}

/// URL of a qualifying event: a completed tab load or a history-state
/// change, on http(s).
pub fn qualifying_url(event: &NavigationEvent) -> Option<&str> {
    let url = match event {
        NavigationEvent::TabUpdated {
            status: Some(TabStatus::Complete),
            url,
            ..
        } => url.as_deref()?,
        NavigationEvent::TabUpdated { .. } => return None,
        NavigationEvent::HistoryStateUpdated { url, .. } => url.as_deref()?,
    };
    is_web_url(url).then_some(url)
}

/// Pick the rule for `url` and build the request for `tab_id`.
pub fn plan_injection(tab_id: i32, url: &str, rules: &[Rule]) -> Option<(usize, InjectionRequest)> {
    let found = Matcher::new(rules).match_url(url)?;
    Some((
        found.index,
        InjectionRequest {
            tab_id,
            selectors: found.rule.selector.clone(),
        },
    ))
}

/// Background coordinator over a synchronous store.
pub struct Coordinator<S: Store, I: Injector> {
    store: S,
    injector: I,
}

impl<S: Store, I: Injector> Coordinator<S, I> {
    pub fn new(store: S, injector: I) -> Self {
        Self { store, injector }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    /// Handle one navigation event.
    pub fn handle(&mut self, event: &NavigationEvent) -> Outcome {
        let Some(url) = qualifying_url(event) else {
            return Outcome::Ignored;
        };
        self.apply_rules_for_tab(event.tab_id(), url)
    }

    /// Match `url` against a fresh read of the rule list and inject on a hit.
    pub fn apply_rules_for_tab(&mut self, tab_id: i32, url: &str) -> Outcome {
        let rules = match self.store.get(RULES_KEY).and_then(parse_rules) {
            Ok(rules) => rules,
            Err(e) => {
                log::error!("Loading rules for tab {} failed: {}", tab_id, e);
                return Outcome::Failed;
            }
        };

        let Some((rule_index, request)) = plan_injection(tab_id, url, &rules) else {
            log::trace!("No rule for {}", url);
            return Outcome::NoMatch;
        };

        log::debug!("Rule {} applies to {} (tab {})", rule_index, url, tab_id);
        match self.injector.inject(request) {
            Ok(()) => Outcome::Injected { rule_index },
            Err(e) => {
                log::error!("Content script injection error: {}", e);
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingInjector {
        requests: Vec<InjectionRequest>,
        fail: bool,
    }

    impl Injector for RecordingInjector {
        fn inject(&mut self, request: InjectionRequest) -> Result<(), InjectError> {
            if self.fail {
                return Err(InjectError::Denied {
                    tab_id: request.tab_id,
                    reason: "chrome:// page".to_string(),
                });
            }
            self.requests.push(request);
            Ok(())
        }
    }

    fn coordinator(rules: serde_json::Value) -> Coordinator<MemoryStore, RecordingInjector> {
        let store = MemoryStore::new().with_value(RULES_KEY, rules);
        Coordinator::new(store, RecordingInjector::default())
    }

    fn complete(tab_id: i32, url: &str) -> NavigationEvent {
        NavigationEvent::TabUpdated {
            tab_id,
            status: Some(TabStatus::Complete),
            url: Some(url.to_string()),
        }
    }

    #[test]
    fn test_qualifying_url() {
        assert_eq!(qualifying_url(&complete(1, "https://a.com/")), Some("https://a.com/"));
        assert_eq!(qualifying_url(&complete(1, "chrome://newtab")), None);

        let loading = NavigationEvent::TabUpdated {
            tab_id: 1,
            status: Some(TabStatus::Loading),
            url: Some("https://a.com/".to_string()),
        };
        assert_eq!(qualifying_url(&loading), None);

        let no_url = NavigationEvent::TabUpdated { tab_id: 1, status: Some(TabStatus::Complete), url: None };
        assert_eq!(qualifying_url(&no_url), None);

        let spa = NavigationEvent::HistoryStateUpdated { tab_id: 1, url: Some("http://a.com/next".to_string()) };
        assert_eq!(qualifying_url(&spa), Some("http://a.com/next"));
    }

    #[test]
    fn test_injects_first_enabled_match() {
        let mut c = coordinator(json!([
            {"url": "example.com", "selector": ".off", "enabled": false},
            {"url": "example.com", "selector": ".ad-banner, .promo"},
            {"url": "example", "selector": ".later"}
        ]));
        let outcome = c.handle(&complete(7, "https://www.example.com/home"));
        assert_eq!(outcome, Outcome::Injected { rule_index: 1 });
        assert_eq!(
            c.injector().requests,
            vec![InjectionRequest { tab_id: 7, selectors: ".ad-banner, .promo".to_string() }]
        );
    }

    #[test]
    fn test_no_match_issues_no_request() {
        let mut c = coordinator(json!([{"url": "example.com", "selector": ".ad"}]));
        assert_eq!(c.handle(&complete(1, "https://other.org/")), Outcome::NoMatch);
        assert!(c.injector().requests.is_empty());
    }

    #[test]
    fn test_ignored_event_reads_nothing() {
        let mut c = coordinator(json!([{"url": "example.com", "selector": ".ad"}]));
        c.store_mut().set_fail_reads(true);
        assert_eq!(c.handle(&complete(1, "file:///example.com")), Outcome::Ignored);
    }

    #[test]
    fn test_history_state_update_reapplies() {
        let mut c = coordinator(json!([{"url": "app.example/feed", "selector": "#promo"}]));
        let event = NavigationEvent::HistoryStateUpdated {
            tab_id: 3,
            url: Some("https://app.example/feed?page=2".to_string()),
        };
        assert_eq!(c.handle(&event), Outcome::Injected { rule_index: 0 });
    }

    #[test]
    fn test_failures_degrade() {
        let mut c = coordinator(json!({"not": "a list"}));
        assert_eq!(c.handle(&complete(1, "https://example.com/")), Outcome::Failed);

        let mut c = coordinator(json!([{"url": "example.com", "selector": ".ad"}]));
        c.store_mut().set_fail_reads(true);
        assert_eq!(c.handle(&complete(1, "https://example.com/")), Outcome::Failed);

        let store = MemoryStore::new().with_value(RULES_KEY, json!([{"url": "example.com", "selector": ".ad"}]));
        let mut c = Coordinator::new(store, RecordingInjector { fail: true, ..Default::default() });
        assert_eq!(c.handle(&complete(1, "https://example.com/")), Outcome::Failed);
    }

    #[test]
    fn test_unreadable_record_does_not_block_matching() {
        let mut c = coordinator(json!([
            {"url": "example.com", "enabled": "yes"},
            {"url": "example.com", "selector": "#cookie-wall"}
        ]));
        assert_eq!(c.handle(&complete(2, "https://example.com/")), Outcome::Injected { rule_index: 0 });
        assert_eq!(c.injector().requests[0].selectors, "#cookie-wall");
    }

    #[test]
    fn test_missing_rules_key_is_no_match() {
        let mut c = Coordinator::new(MemoryStore::new(), RecordingInjector::default());
        assert_eq!(c.handle(&complete(1, "https://example.com/")), Outcome::NoMatch);
    }
}

//! Rule Matcher
//!
//! Linear scan over the ordered rule list. List order is the tie-break:
//! at most one rule applies to a page.

use crate::types::{Rule, RuleMatch};

/// First-match rule selection over a snapshot of the rule list.
pub struct Matcher<'a> {
    rules: &'a [Rule],
}

impl<'a> Matcher<'a> {
    /// Create a matcher over the given rules.
    pub fn new(rules: &'a [Rule]) -> Self {
        Self { rules }
    }

    /// Find the first enabled rule whose fragment occurs in `url`.
    pub fn match_url(&self, url: &str) -> Option<RuleMatch<'a>> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| Self::applies(rule, url))
            .map(|(index, rule)| RuleMatch { index, rule })
    }

    fn applies(rule: &Rule, url: &str) -> bool {
        // An empty fragment is a substring of every URL
        rule.enabled && !rule.url.is_empty() && url.contains(rule.url.as_str())
    }
}

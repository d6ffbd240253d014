//! Core type definitions for Element Remover
//!
//! `Rule` maps directly to the record shape kept in the synced store and is
//! used throughout the matcher, the editing operations and the bindings.

use serde::{Deserialize, Serialize};

// =============================================================================
// Rule
// =============================================================================

/// A stored (url fragment, selector, enabled) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Fragment matched by substring against the full page URL
    pub url: String,
    /// One or more comma-separated CSS selectors
    pub selector: String,
    /// Disabled rules are skipped by the matcher
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Create an enabled rule.
    pub fn new(url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            selector: selector.into(),
            enabled: true,
        }
    }
}

// =============================================================================
// Scheme Masks
// =============================================================================

bitflags::bitflags! {
    /// URL scheme mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SchemeMask: u8 {
        const HTTP = 1 << 0;
        const HTTPS = 1 << 1;
        /// Schemes rules are applied on
        const WEB = Self::HTTP.bits() | Self::HTTPS.bits();
    }
}

// =============================================================================
// Navigation Events
// =============================================================================

/// Loading status reported by a tab update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    Loading,
    Complete,
    Other,
}

impl TabStatus {
    /// Parse from the browser's status string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "loading" => Self::Loading,
            "complete" => Self::Complete,
            _ => Self::Other,
        }
    }
}

/// A navigation event observed by the background coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// `tabs.onUpdated`; status and url are only present when they changed
    TabUpdated {
        tab_id: i32,
        status: Option<TabStatus>,
        url: Option<String>,
    },
    /// `webNavigation.onHistoryStateUpdated` (pushState/replaceState)
    HistoryStateUpdated {
        tab_id: i32,
        url: Option<String>,
    },
}

impl NavigationEvent {
    pub fn tab_id(&self) -> i32 {
        match self {
            Self::TabUpdated { tab_id, .. } | Self::HistoryStateUpdated { tab_id, .. } => *tab_id,
        }
    }
}

// =============================================================================
// Match Result
// =============================================================================

/// The rule chosen for a page, with its position in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub index: usize,
    pub rule: &'a Rule,
}

/// Request to run the removal procedure inside one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionRequest {
    pub tab_id: i32,
    /// Raw selector field of the matched rule
    pub selectors: String,
}

//! Persistent store model
//!
//! The synced key-value store holds two keys: `rules`, an ordered list of
//! rule records, and `darkMode`, the popup's display preference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rules::{self, EditSession, RuleError, Submitted};
use crate::types::Rule;

pub const RULES_KEY: &str = "rules";
pub const DARK_MODE_KEY: &str = "darkMode";
pub const DEFAULT_DARK_MODE: bool = true;

/// Error type for store access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage read failed: {0}")]
    Read(String),
    #[error("Storage write failed: {0}")]
    Write(String),
    #[error("Malformed stored data: {0}")]
    Malformed(String),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

// =============================================================================
// Records
// =============================================================================

/// Write shape of the `rules` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRules {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Write shape of the `darkMode` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPreferences {
    #[serde(rename = "darkMode", default = "default_dark_mode")]
    pub dark_mode: bool,
}

fn default_dark_mode() -> bool {
    DEFAULT_DARK_MODE
}

impl Default for StoredPreferences {
    fn default() -> Self {
        Self { dark_mode: DEFAULT_DARK_MODE }
    }
}

/// Rule records read from the store, with the count of records that could
/// not be decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRules {
    pub rules: Vec<Rule>,
    pub skipped: usize,
}

/// Decode a raw `rules` read record by record. A missing key is an empty list;
/// only a value that is not a list is fatal. Undecodable records are logged
/// and left out, so the next write drops them.
pub fn parse_rule_records(raw: Option<Value>) -> Result<ParsedRules, StoreError> {
    let records = match raw {
        None => return Ok(ParsedRules::default()),
        Some(Value::Array(records)) => records,
        Some(other) => {
            return Err(StoreError::Malformed(format!(
                "`{}` is not a list: {}",
                RULES_KEY, other
            )))
        }
    };

    let mut parsed = ParsedRules::default();
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Rule>(record) {
            Ok(rule) => parsed.rules.push(rule),
            Err(e) => {
                log::warn!("Skipping malformed rule record {}: {}", index, e);
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

/// Turn a raw `rules` read into the list of usable rules.
pub fn parse_rules(raw: Option<Value>) -> Result<Vec<Rule>, StoreError> {
    parse_rule_records(raw).map(|parsed| parsed.rules)
}

/// Turn a raw `darkMode` read into preferences. Anything but an explicit
/// `false` means dark mode is on.
pub fn parse_preferences(raw: Option<Value>) -> StoredPreferences {
    StoredPreferences {
        dark_mode: !matches!(raw, Some(Value::Bool(false))),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Key-value store seam.
pub trait Store {
    /// Read a key; `None` when it was never written.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key without counting it as a write.
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Read(format!("read of `{}` rejected", key)));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write(format!("write of `{}` rejected", key)));
        }
        self.values.insert(key.to_string(), value);
        self.writes += 1;
        Ok(())
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Read-modify-write access to the rule list and preferences.
///
/// Each mutation reads the whole list, applies one edit and writes the whole
/// list back. There is no guard against a concurrent writer between the read
/// and the write.
pub struct RuleRepository<S: Store> {
    store: S,
}

impl<S: Store> RuleRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn load_rules(&self) -> Result<Vec<Rule>, StoreError> {
        parse_rules(self.store.get(RULES_KEY)?)
    }

    pub fn load_rule_records(&self) -> Result<ParsedRules, StoreError> {
        parse_rule_records(self.store.get(RULES_KEY)?)
    }

    fn save_rules(&mut self, rules: &[Rule]) -> Result<(), StoreError> {
        let value = serde_json::to_value(rules)
            .map_err(|e| StoreError::Write(e.to_string()))?;
        self.store.set(RULES_KEY, value)
    }

    fn modify<T>(&mut self, edit: impl FnOnce(&mut Vec<Rule>) -> Result<T, RuleError>) -> Result<T, StoreError> {
        let mut rules = self.load_rules()?;
        let out = edit(&mut rules)?;
        self.save_rules(&rules)?;
        log::debug!("Saved {} rules", rules.len());
        Ok(out)
    }

    pub fn add(&mut self, url: &str, selector: &str) -> Result<usize, StoreError> {
        self.modify(|rules| rules::add_rule(rules, url, selector))
    }

    pub fn edit(&mut self, index: usize, url: &str, selector: &str) -> Result<(), StoreError> {
        self.modify(|rules| rules::edit_rule(rules, index, url, selector))
    }

    pub fn remove(&mut self, index: usize) -> Result<Rule, StoreError> {
        self.modify(|rules| rules::remove_rule(rules, index))
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<(), StoreError> {
        self.modify(|rules| rules::set_enabled(rules, index, enabled))
    }

    /// Submit the popup form through an edit session. The session leaves
    /// editing only once the list has been written.
    pub fn submit(&mut self, session: &mut EditSession, url: &str, selector: &str) -> Result<Submitted, StoreError> {
        let submitted = self.modify(|rules| session.apply(rules, url, selector))?;
        session.committed();
        Ok(submitted)
    }

    pub fn preferences(&self) -> Result<StoredPreferences, StoreError> {
        Ok(parse_preferences(self.store.get(DARK_MODE_KEY)?))
    }

    pub fn dark_mode(&self) -> Result<bool, StoreError> {
        self.preferences().map(|prefs| prefs.dark_mode)
    }

    pub fn set_dark_mode(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.store.set(DARK_MODE_KEY, Value::Bool(enabled))
    }
}

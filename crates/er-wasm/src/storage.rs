//! Async access to `chrome.storage.sync`
//!
//! Same keys, defaults and parsing as `er_core::store`; only the transport
//! differs.

use serde_json::Value;
use wasm_bindgen::JsValue;

use er_core::rules::RuleError;
use er_core::store::{
    parse_preferences, parse_rules, StoredPreferences, StoredRules, StoreError, DARK_MODE_KEY, RULES_KEY,
};
use er_core::Rule;

use crate::{chrome, get_property, js_error_message, to_js};

async fn read_key(key: &str) -> Result<Option<Value>, StoreError> {
    let items = chrome::storage_sync_get(&JsValue::from_str(key))
        .await
        .map_err(|e| StoreError::Read(js_error_message(&e)))?;
    match get_property(&items, key) {
        None => Ok(None),
        Some(raw) => serde_wasm_bindgen::from_value(raw)
            .map(Some)
            .map_err(|e| StoreError::Malformed(e.to_string())),
    }
}

async fn write_items(items: JsValue) -> Result<(), StoreError> {
    chrome::storage_sync_set(&items)
        .await
        .map(|_| ())
        .map_err(|e| StoreError::Write(js_error_message(&e)))
}

pub async fn load_rules() -> Result<Vec<Rule>, StoreError> {
    parse_rules(read_key(RULES_KEY).await?)
}

pub async fn save_rules(rules: Vec<Rule>) -> Result<(), StoreError> {
    let items = to_js(&StoredRules { rules }).map_err(StoreError::Write)?;
    write_items(items).await
}

/// One read-modify-write of the rule list. Nothing is written when `edit`
/// fails.
pub async fn modify_rules<T>(edit: impl FnOnce(&mut Vec<Rule>) -> Result<T, RuleError>) -> Result<T, StoreError> {
    let mut rules = load_rules().await?;
    let out = edit(&mut rules)?;
    let count = rules.len();
    save_rules(rules).await?;
    log::debug!("Saved {} rules", count);
    Ok(out)
}

pub async fn load_dark_mode() -> Result<bool, StoreError> {
    Ok(parse_preferences(read_key(DARK_MODE_KEY).await?).dark_mode)
}

pub async fn save_dark_mode(dark_mode: bool) -> Result<(), StoreError> {
    let items = to_js(&StoredPreferences { dark_mode }).map_err(StoreError::Write)?;
    write_items(items).await
}

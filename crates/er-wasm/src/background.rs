//! Background service worker
//!
//! Handles completed page loads and history-state changes, matches the tab
//! URL against a fresh read of the rule list and sends the matched selectors
//! to the page's content script, injecting the script first when the page has
//! none.
//!
//! The `chrome.*` listeners live in `background.js`: a service worker must
//! register them synchronously on its first run, before the module has been
//! instantiated. They wait for instantiation and call the exported handlers.

use serde_json::json;
use wasm_bindgen::prelude::*;

use er_core::coordinator::{plan_injection, qualifying_url, InjectError};
use er_core::{ContentMessage, InjectionRequest, NavigationEvent, TabStatus};

use crate::{chrome, get_i32, get_property, get_string, js_error_message, storage, to_js};

/// Content script bundle path, relative to the extension root.
pub const CONTENT_SCRIPT: &str = "content.js";

/// Whether delivery may inject the content script when no listener answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    InjectIfMissing,
    MessageOnly,
}

pub fn install() {
    log::info!("Element Remover background started");
}

/// `tabs.onUpdated` payload.
pub async fn on_tab_updated(tab_id: i32, change_info: JsValue, tab: JsValue) {
    let event = NavigationEvent::TabUpdated {
        tab_id,
        status: get_string(&change_info, "status").map(|s| TabStatus::from_str(&s)),
        url: get_string(&tab, "url"),
    };
    handle_event(event).await;
}

/// `webNavigation.onHistoryStateUpdated` payload.
pub async fn on_history_state(details: JsValue) {
    let Some(tab_id) = get_i32(&details, "tabId") else {
        return;
    };
    // The tab's own URL, not the frame's
    match chrome::tabs_get(tab_id).await {
        Ok(tab) => {
            let event = NavigationEvent::HistoryStateUpdated {
                tab_id,
                url: get_string(&tab, "url"),
            };
            handle_event(event).await;
        }
        Err(e) => log::warn!("tabs.get({}) failed: {}", tab_id, js_error_message(&e)),
    }
}

/// `runtime.onMessage` payload. Only `Ready` from a freshly injected content
/// script is handled.
pub async fn on_message(message: JsValue, sender: JsValue) {
    if let Ok(ContentMessage::Ready) = serde_wasm_bindgen::from_value(message) {
        let tab = get_property(&sender, "tab").unwrap_or(JsValue::UNDEFINED);
        if let (Some(tab_id), Some(url)) = (get_i32(&tab, "id"), get_string(&tab, "url")) {
            apply_rules_for_tab(tab_id, url, Delivery::MessageOnly).await;
        }
    }
}

async fn handle_event(event: NavigationEvent) {
    if let Some(url) = qualifying_url(&event) {
        apply_rules_for_tab(event.tab_id(), url.to_string(), Delivery::InjectIfMissing).await;
    }
}

async fn apply_rules_for_tab(tab_id: i32, url: String, delivery: Delivery) {
    let rules = match storage::load_rules().await {
        Ok(rules) => rules,
        Err(e) => {
            log::error!("Loading rules for tab {} failed: {}", tab_id, e);
            return;
        }
    };

    let Some((rule_index, request)) = plan_injection(tab_id, &url, &rules) else {
        return;
    };
    log::debug!("Rule {} applies to {} (tab {})", rule_index, url, tab_id);

    if let Err(e) = deliver(request, delivery).await {
        log::error!("Content script injection error: {}", e);
    }
}

async fn deliver(request: InjectionRequest, delivery: Delivery) -> Result<(), InjectError> {
    let tab_id = request.tab_id;
    let message = to_js(&ContentMessage::ApplySelectors { selectors: request.selectors })
        .map_err(InjectError::Other)?;

    match chrome::tabs_send_message(tab_id, &message).await {
        Ok(_) => Ok(()),
        // No receiver yet; the injected script announces itself with `Ready`
        Err(_) if delivery == Delivery::InjectIfMissing => inject_content_script(tab_id).await,
        Err(e) => Err(classify(tab_id, &js_error_message(&e))),
    }
}

async fn inject_content_script(tab_id: i32) -> Result<(), InjectError> {
    let injection = to_js(&json!({
        "target": { "tabId": tab_id },
        "files": [CONTENT_SCRIPT],
    }))
    .map_err(InjectError::Other)?;

    chrome::scripting_execute_script(&injection)
        .await
        .map(|_| ())
        .map_err(|e| classify(tab_id, &js_error_message(&e)))
}

fn classify(tab_id: i32, message: &str) -> InjectError {
    if message.contains("No tab with id") {
        InjectError::NoSuchTab(tab_id)
    } else if message.contains("Cannot access") || message.contains("cannot be scripted") {
        InjectError::Denied {
            tab_id,
            reason: message.to_string(),
        }
    } else {
        InjectError::Other(message.to_string())
    }
}

//! WebAssembly bindings for Element Remover
//!
//! One module serves all three extension surfaces. Each loader calls its own
//! entry point: `start_background` from the service worker, `start_content`
//! from the injected content script, `start_popup` from the popup page. The
//! service worker also forwards its events to the `handle_*` exports.

use std::sync::Once;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod background;
pub mod chrome;
pub mod content;
pub mod popup;
pub mod storage;

static LOGGER: Once = Once::new();

fn init_logging() {
    LOGGER.call_once(|| {
        console_error_panic_hook::set_once();
        let level = if cfg!(debug_assertions) {
            log::Level::Debug
        } else {
            log::Level::Info
        };
        wasm_logger::init(wasm_logger::Config::new(level));
    });
}

#[wasm_bindgen]
pub fn start_background() {
    init_logging();
    background::install();
}

#[wasm_bindgen]
pub fn start_content() {
    init_logging();
    content::install();
}

#[wasm_bindgen]
pub fn start_popup() -> Result<(), JsValue> {
    init_logging();
    popup::install().map_err(|e| {
        log::error!("Error initializing popup: {}", e);
        JsValue::from_str(&e)
    })
}

// Background event handlers. `background.js` registers the listeners and
// forwards each payload once the module is ready.

#[wasm_bindgen]
pub async fn handle_tab_updated(tab_id: i32, change_info: JsValue, tab: JsValue) {
    background::on_tab_updated(tab_id, change_info, tab).await;
}

#[wasm_bindgen]
pub async fn handle_history_state(details: JsValue) {
    background::on_history_state(details).await;
}

#[wasm_bindgen]
pub async fn handle_message(message: JsValue, sender: JsValue) {
    background::on_message(message, sender).await;
}

// =============================================================================
// JS interop helpers
// =============================================================================

/// Serialize to plain JS objects and arrays, as the extension APIs expect.
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| e.to_string())
}

pub(crate) fn js_error_message(err: &JsValue) -> String {
    if let Some(message) = get_string(err, "message") {
        return message;
    }
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

pub(crate) fn get_property(target: &JsValue, key: &str) -> Option<JsValue> {
    js_sys::Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

pub(crate) fn get_string(target: &JsValue, key: &str) -> Option<String> {
    get_property(target, key).and_then(|value| value.as_string())
}

pub(crate) fn get_i32(target: &JsValue, key: &str) -> Option<i32> {
    get_property(target, key)
        .and_then(|value| value.as_f64())
        .map(|n| n as i32)
}

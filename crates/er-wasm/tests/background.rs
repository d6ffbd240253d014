#![cfg(target_arch = "wasm32")]

use serde_json::json;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use er_wasm::{handle_message, handle_tab_updated};

wasm_bindgen_test_configure!(run_in_browser);

fn js(value: serde_json::Value) -> JsValue {
    serde_wasm_bindgen::to_value(&value).unwrap()
}

// Neither event reaches a `chrome.*` call, so both settle outside an
// extension page.

#[wasm_bindgen_test]
async fn test_loading_status_is_ignored() {
    handle_tab_updated(
        7,
        js(json!({ "status": "loading" })),
        js(json!({ "id": 7, "url": "https://example.com/" })),
    )
    .await;
}

#[wasm_bindgen_test]
async fn test_non_ready_message_is_ignored() {
    handle_message(
        js(json!({ "type": "applySelectors", "selectors": ".ad" })),
        js(json!({ "tab": { "id": 7, "url": "https://example.com/" } })),
    )
    .await;
    handle_message(JsValue::from_str("hello"), JsValue::UNDEFINED).await;
}

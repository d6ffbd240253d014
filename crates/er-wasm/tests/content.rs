#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::HtmlElement;

use er_core::run_removal_pass;
use er_wasm::content::{apply_selectors, WebDocument};

wasm_bindgen_test_configure!(run_in_browser);

fn fixture(html: &str) -> HtmlElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let root: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
    root.set_inner_html(html);
    document.body().unwrap().append_child(&root).unwrap();
    root
}

/// Wait a macrotask so queued mutation callbacks have run.
async fn settle() {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 10)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

fn count(selector: &str) -> u32 {
    let document = web_sys::window().unwrap().document().unwrap();
    document.query_selector_all(selector).unwrap().length()
}

fn insert(root: &HtmlElement, class: &str) {
    let document = web_sys::window().unwrap().document().unwrap();
    let el = document.create_element("div").unwrap();
    el.set_class_name(class);
    root.append_child(&el).unwrap();
}

#[wasm_bindgen_test]
fn test_removes_both_selector_groups() {
    let root = fixture(
        r#"<div class="ad-banner"></div><p class="promo"></p><p class="promo"></p><span class="keep"></span>"#,
    );
    let doc = WebDocument::current().unwrap();

    let report = run_removal_pass(&doc, ".ad-banner, .promo");
    assert_eq!(report.removed, 3);
    assert_eq!(root.child_element_count(), 1);
    root.remove();
}

#[wasm_bindgen_test]
fn test_invalid_selector_is_skipped() {
    let root = fixture(r#"<div id="sidebar"></div>"#);
    let doc = WebDocument::current().unwrap();

    let report = run_removal_pass(&doc, "[[, #sidebar");
    assert_eq!(report.failed_selectors, 1);
    assert_eq!(report.removed, 1);
    assert_eq!(root.child_element_count(), 0);
    root.remove();
}

#[wasm_bindgen_test]
async fn test_inserted_nodes_removed_by_observer() {
    let root = fixture(r#"<div class="late-ad"></div><div class="stay"></div>"#);
    apply_selectors(".late-ad".to_string()).unwrap();
    assert_eq!(count(".late-ad"), 0);

    insert(&root, "late-ad");
    insert(&root, "late-ad");
    settle().await;
    assert_eq!(count(".late-ad"), 0);
    assert_eq!(root.child_element_count(), 1);
    root.remove();
}

#[wasm_bindgen_test]
async fn test_new_selectors_replace_observer() {
    let root = fixture("");
    apply_selectors(".first-set".to_string()).unwrap();
    apply_selectors(".second-set".to_string()).unwrap();

    insert(&root, "first-set");
    insert(&root, "second-set");
    settle().await;
    assert_eq!(count(".first-set"), 1);
    assert_eq!(count(".second-set"), 0);
    root.remove();
}

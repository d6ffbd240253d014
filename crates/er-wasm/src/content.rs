//! Content script
//!
//! Runs the removal pass inside the page and keeps re-running it on every
//! DOM mutation so rules survive client-side re-rendering. The observer lives
//! until the page is unloaded or a new selector set replaces it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, MutationObserver, MutationObserverInit, Node};

use er_core::{run_removal_pass, ContentMessage, PageDocument};

use crate::{chrome, js_error_message, to_js};

/// `PageDocument` over the live DOM.
pub struct WebDocument {
    document: Document,
}

impl WebDocument {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The page's document, if running in a window.
    pub fn current() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }
}

impl PageDocument for WebDocument {
    type Node = Element;

    fn query_all(&self, selector: &str) -> Result<Vec<Element>, String> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(|e| js_error_message(&e))?;
        Ok((0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }
}

struct ActiveRule {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(Array, MutationObserver)>,
}

impl Drop for ActiveRule {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<ActiveRule>> = const { RefCell::new(None) };
    static LISTENING: Cell<bool> = const { Cell::new(false) };
}

pub fn install() {
    if !LISTENING.with(|listening| listening.replace(true)) {
        let on_message = Closure::<dyn FnMut(JsValue, JsValue, Function) -> JsValue>::new(
            |message: JsValue, _sender: JsValue, _send_response: Function| {
                if let Ok(ContentMessage::ApplySelectors { selectors }) = serde_wasm_bindgen::from_value(message) {
                    if let Err(e) = apply_selectors(selectors) {
                        log::error!("Element Remover content script error: {}", js_error_message(&e));
                    }
                }
                JsValue::FALSE
            },
        );
        chrome::add_message_listener(&on_message);
        on_message.forget();
    }

    spawn_local(async {
        let ready = match to_js(&ContentMessage::Ready) {
            Ok(ready) => ready,
            Err(e) => {
                log::error!("Encoding ready message failed: {}", e);
                return;
            }
        };
        if let Err(e) = chrome::runtime_send_message(&ready).await {
            log::debug!("Ready message not delivered: {}", js_error_message(&e));
        }
    });
}

/// Remove matches now and on every later mutation of the page.
pub fn apply_selectors(selectors: String) -> Result<(), JsValue> {
    let doc = Rc::new(WebDocument::current().ok_or_else(|| JsValue::from_str("no document"))?);

    let report = run_removal_pass(doc.as_ref(), &selectors);
    log::debug!("Removed {} elements for '{}'", report.removed, selectors);

    let target: Node = match doc.document.document_element() {
        Some(root) => root.into(),
        None => doc
            .document
            .body()
            .map(Into::into)
            .ok_or_else(|| JsValue::from_str("no element to observe"))?,
    };

    let pass_doc = Rc::clone(&doc);
    let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
        move |_records: Array, _observer: MutationObserver| {
            run_removal_pass(pass_doc.as_ref(), &selectors);
        },
    );
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;

    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer.observe_with_options(&target, &options)?;

    // Dropping the previous rule disconnects its observer
    ACTIVE.with(|active| {
        active.replace(Some(ActiveRule {
            observer,
            _callback: callback,
        }))
    });
    Ok(())
}

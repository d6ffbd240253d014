//! Popup rule editor
//!
//! Form-driven view over the stored rule list: add, edit, remove and
//! enable/disable rules, plus the dark-mode preference and the help overlay.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement};

use er_core::rules::{self, EditSession, Submitted};
use er_core::store::StoreError;
use er_core::url::suggest_fragment;
use er_core::{Rule, RuleError};

use crate::{chrome, get_string, js_error_message, storage, to_js};

const ADD_LABEL: &str = "Add Rule";
const SAVE_LABEL: &str = "Save Rule";
const DARK_MODE_CLASS: &str = "dark-mode";
const HIDDEN_CLASS: &str = "hidden";

type Listener = Closure<dyn FnMut(Event)>;

struct PopupElements {
    url_input: HtmlInputElement,
    selector_input: HtmlInputElement,
    add_rule: HtmlElement,
    add_current_page: HtmlElement,
    rules_list: Element,
    no_rules: Element,
    dark_toggle: Option<HtmlInputElement>,
    help_button: Option<Element>,
    help_overlay: Option<Element>,
    help_close: Option<Element>,
}

fn lookup<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    document.get_element_by_id(id)?.dyn_into::<T>().ok()
}

fn require<T: JsCast>(document: &Document, id: &str) -> Result<T, String> {
    lookup(document, id).ok_or_else(|| format!("Popup element #{} not found", id))
}

impl PopupElements {
    fn find(document: &Document) -> Result<Self, String> {
        Ok(Self {
            url_input: require(document, "url")?,
            selector_input: require(document, "selector")?,
            add_rule: require(document, "add-rule")?,
            add_current_page: require(document, "add-current-page")?,
            rules_list: require(document, "rules-list")?,
            no_rules: require(document, "no-rules")?,
            dark_toggle: lookup(document, "dark-toggle"),
            help_button: lookup(document, "help-button"),
            help_overlay: lookup(document, "help-overlay"),
            help_close: lookup(document, "help-close"),
        })
    }
}

struct Popup {
    document: Document,
    elements: PopupElements,
    session: RefCell<EditSession>,
    /// Listeners of the currently rendered rule rows
    row_listeners: RefCell<Vec<Listener>>,
}

fn listen(target: &EventTarget, event: &str, handler: impl FnMut(Event) + 'static) -> Result<Listener, String> {
    let closure = Listener::new(handler);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(|e| js_error_message(&e))?;
    Ok(closure)
}

/// Listener for the popup's lifetime.
fn listen_forever(target: &EventTarget, event: &str, handler: impl FnMut(Event) + 'static) -> Result<(), String> {
    listen(target, event, handler)?.forget();
    Ok(())
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

pub fn install() -> Result<(), String> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| "Popup has no document".to_string())?;
    let elements = PopupElements::find(&document)?;

    let popup = Rc::new(Popup {
        document,
        elements,
        session: RefCell::new(EditSession::new()),
        row_listeners: RefCell::new(Vec::new()),
    });

    let p = Rc::clone(&popup);
    listen_forever(&popup.elements.add_rule, "click", move |_| {
        spawn_local(submit_form(Rc::clone(&p)));
    })?;

    let p = Rc::clone(&popup);
    listen_forever(&popup.elements.add_current_page, "click", move |_| {
        spawn_local(use_current_page(Rc::clone(&p)));
    })?;

    install_dark_mode(&popup)?;
    install_help(&popup)?;

    spawn_local(load_rules(popup));
    Ok(())
}

// =============================================================================
// Rule list
// =============================================================================

async fn load_rules(popup: Rc<Popup>) {
    match storage::load_rules().await {
        Ok(rules) => {
            if let Err(e) = popup.render(&rules) {
                log::error!("Error while rendering rules: {}", e);
            }
        }
        Err(e) => {
            log::error!("Loading rules failed: {}", e);
            popup.elements.rules_list.set_inner_html("");
            if let Err(e) = append(&popup.elements.rules_list, &popup.elements.no_rules) {
                log::error!("Showing the empty-list message failed: {}", e);
            }
        }
    }
}

impl Popup {
    fn render(self: &Rc<Self>, rules: &[Rule]) -> Result<(), String> {
        let list = &self.elements.rules_list;
        self.row_listeners.borrow_mut().clear();
        list.set_inner_html("");

        if rules.is_empty() {
            list.append_child(&self.elements.no_rules)
                .map_err(|e| js_error_message(&e))?;
            return Ok(());
        }
        self.elements.no_rules.remove();

        for (index, rule) in rules.iter().enumerate() {
            // A broken row must not hide the rest of the list
            match self.rule_row(index, rule) {
                Ok(row) => {
                    list.append_child(&row).map_err(|e| js_error_message(&e))?;
                }
                Err(e) => log::error!("Error creating rule element: {}", e),
            }
        }
        Ok(())
    }

    fn create(&self, tag: &str, class: &str) -> Result<Element, String> {
        let el = self
            .document
            .create_element(tag)
            .map_err(|e| js_error_message(&e))?;
        if !class.is_empty() {
            el.set_class_name(class);
        }
        Ok(el)
    }

    fn rule_row(self: &Rc<Self>, index: usize, rule: &Rule) -> Result<Element, String> {
        let row = self.create("div", "rule-item")?;

        let text = self.create("div", "text")?;
        let url = self.create("strong", "")?;
        url.set_text_content(Some(&rule.url));
        let selector = self.create("span", "")?;
        selector.set_text_content(Some(&rule.selector));
        append(&text, &url)?;
        append(&text, &selector)?;
        append(&row, &text)?;

        let label = self.create("label", "rule-toggle")?;
        let toggle: HtmlInputElement = self
            .create("input", "")?
            .dyn_into()
            .map_err(|_| "input is not an HtmlInputElement".to_string())?;
        toggle.set_type("checkbox");
        toggle.set_checked(rule.enabled);
        toggle.set_title(if rule.enabled { "Turn rule off" } else { "Turn rule on" });
        let state = self.create("span", "rule-toggle-state")?;
        state.set_text_content(Some(if rule.enabled { "On" } else { "Off" }));
        append(&label, &toggle)?;
        append(&label, &state)?;
        append(&row, &label)?;

        let edit = self.create("button", "btn-edit")?;
        edit.set_text_content(Some("Edit"));
        append(&row, &edit)?;

        let remove = self.create("button", "btn-remove")?;
        remove.set_text_content(Some("Remove"));
        append(&row, &remove)?;

        let mut listeners = self.row_listeners.borrow_mut();

        let p = Rc::clone(self);
        let checkbox = toggle.clone();
        listeners.push(listen(&toggle, "change", move |_| {
            spawn_local(toggle_rule(Rc::clone(&p), index, checkbox.checked()));
        })?);

        let p = Rc::clone(self);
        let loaded = rule.clone();
        listeners.push(listen(&edit, "click", move |_| {
            p.begin_edit(index, &loaded);
        })?);

        let p = Rc::clone(self);
        listeners.push(listen(&remove, "click", move |_| {
            spawn_local(remove_rule(Rc::clone(&p), index));
        })?);

        Ok(row)
    }

    fn begin_edit(&self, index: usize, rule: &Rule) {
        self.session.borrow_mut().begin(index);
        self.elements.url_input.set_value(&rule.url);
        self.elements.selector_input.set_value(&rule.selector);
        self.elements.add_rule.set_text_content(Some(SAVE_LABEL));
        let _ = self.elements.url_input.focus();
    }

    fn reset_form(&self) {
        self.elements.url_input.set_value("");
        self.elements.selector_input.set_value("");
        self.elements.add_rule.set_text_content(Some(ADD_LABEL));
    }
}

fn append(parent: &Element, child: &Element) -> Result<(), String> {
    parent
        .append_child(child)
        .map(|_| ())
        .map_err(|e| js_error_message(&e))
}

async fn submit_form(popup: Rc<Popup>) {
    let url = popup.elements.url_input.value();
    let selector = popup.elements.selector_input.value();

    let session = *popup.session.borrow();
    let result = storage::modify_rules(|rules| session.apply(rules, &url, &selector)).await;
    match result {
        Ok(submitted) => {
            popup.session.borrow_mut().committed();
            match submitted {
                Submitted::Added(index) => log::debug!("Added rule {}", index),
                Submitted::Edited(index) => log::debug!("Edited rule {}", index),
            }
            popup.reset_form();
            load_rules(popup).await;
        }
        Err(StoreError::Rule(RuleError::EmptyUrl | RuleError::EmptySelector)) => {
            alert("Please fill in both the URL and Selector fields.");
        }
        Err(e) => {
            log::error!("Saving rule failed: {}", e);
            alert("Error saving rule.");
        }
    }
}

async fn remove_rule(popup: Rc<Popup>, index: usize) {
    match storage::modify_rules(|rules| rules::remove_rule(rules, index)).await {
        Ok(_) => {
            let was_editing = popup.session.borrow().editing().is_some();
            popup.session.borrow_mut().on_removed(index);
            if was_editing && popup.session.borrow().editing().is_none() {
                popup.reset_form();
            }
            load_rules(popup).await;
        }
        Err(e) => {
            log::error!("Removing rule {} failed: {}", index, e);
            alert("Error removing rule.");
        }
    }
}

async fn toggle_rule(popup: Rc<Popup>, index: usize, enabled: bool) {
    if let Err(e) = storage::modify_rules(|rules| rules::set_enabled(rules, index, enabled)).await {
        log::error!("Toggling rule {} failed: {}", index, e);
    }
    load_rules(popup).await;
}

async fn use_current_page(popup: Rc<Popup>) {
    let query = match to_js(&json!({ "active": true, "currentWindow": true })) {
        Ok(query) => query,
        Err(e) => {
            log::error!("Building tab query failed: {}", e);
            return;
        }
    };
    let tabs = match chrome::tabs_query(&query).await {
        Ok(tabs) => js_sys::Array::from(&tabs),
        Err(e) => {
            log::error!("tabs.query error: {}", js_error_message(&e));
            alert("Failed to get current tab.");
            return;
        }
    };
    match get_string(&tabs.get(0), "url") {
        Some(url) => popup.elements.url_input.set_value(&suggest_fragment(&url)),
        None => {
            log::warn!("No active tab found or URL missing.");
            alert("Could not get current page URL.");
        }
    }
}

// =============================================================================
// Dark mode
// =============================================================================

fn apply_dark_mode(popup: &Popup, enabled: bool) {
    if let Some(body) = popup.document.body() {
        let classes = body.class_list();
        let result = if enabled {
            classes.add_1(DARK_MODE_CLASS)
        } else {
            classes.remove_1(DARK_MODE_CLASS)
        };
        if let Err(e) = result {
            log::warn!("Updating body class failed: {}", js_error_message(&e));
        }
    }
    if let Some(toggle) = &popup.elements.dark_toggle {
        toggle.set_checked(enabled);
    }
}

fn install_dark_mode(popup: &Rc<Popup>) -> Result<(), String> {
    if let Some(toggle) = &popup.elements.dark_toggle {
        let p = Rc::clone(popup);
        let checkbox = toggle.clone();
        listen_forever(toggle, "change", move |_| {
            let enabled = checkbox.checked();
            apply_dark_mode(&p, enabled);
            spawn_local(async move {
                if let Err(e) = storage::save_dark_mode(enabled).await {
                    log::error!("darkMode storage set error: {}", e);
                }
            });
        })?;
    }

    let p = Rc::clone(popup);
    spawn_local(async move {
        let enabled = storage::load_dark_mode().await.unwrap_or_else(|e| {
            log::error!("darkMode storage get error: {}", e);
            true
        });
        apply_dark_mode(&p, enabled);
    });
    Ok(())
}

// =============================================================================
// Help overlay
// =============================================================================

fn set_hidden(el: &Element, hidden: bool) {
    let classes = el.class_list();
    let result = if hidden {
        classes.add_1(HIDDEN_CLASS)
    } else {
        classes.remove_1(HIDDEN_CLASS)
    };
    if let Err(e) = result {
        log::warn!("Toggling help overlay failed: {}", js_error_message(&e));
    }
}

fn install_help(popup: &Rc<Popup>) -> Result<(), String> {
    let Some(overlay) = popup.elements.help_overlay.clone() else {
        return Ok(());
    };

    if let Some(button) = &popup.elements.help_button {
        let target = overlay.clone();
        listen_forever(button, "click", move |_| set_hidden(&target, false))?;
    }
    if let Some(close) = &popup.elements.help_close {
        let target = overlay.clone();
        listen_forever(close, "click", move |_| set_hidden(&target, true))?;
    }

    // Clicking the backdrop closes the overlay
    let target = overlay.clone();
    listen_forever(&overlay, "click", move |event: Event| {
        let on_backdrop = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .is_some_and(|el| el == target);
        if on_backdrop {
            set_hidden(&target, true);
        }
    })?;
    Ok(())
}

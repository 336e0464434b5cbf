//! Batch wiring for every countdown on a page.

use std::rc::Rc;

use js_sys::{Array, Function, Reflect, WeakSet};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement};
use zero_hour_core::constants::{DONE_EVENT, ELEMENT_NAME};

use crate::dom;
use crate::errors::{DomResultExt, WebError, warn_on_err};

/// Options accepted by [`init_countdown_timers_with`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// CSS selector for the elements to wire; defaults to the element name.
    pub selector: Option<String>,
    /// Called once per element when it reports `done`, or immediately for
    /// elements that are already past their target.
    pub on_done: Option<Function>,
    /// A `CSSStyleSheet` or CSS text applied to every matched element.
    pub stylesheet: Option<JsValue>,
}

impl InitOptions {
    /// Read `{ selector, onDone, stylesheet }` from a JS options object.
    /// Missing, `null` or mistyped fields fall back to their defaults.
    #[must_use]
    pub fn from_js(options: &JsValue) -> Self {
        if !options.is_object() {
            return Self::default();
        }
        let field = |name: &str| {
            Reflect::get(options, &JsValue::from_str(name))
                .ok()
                .filter(|value| !value.is_undefined() && !value.is_null())
        };
        Self {
            selector: field("selector").and_then(|value| value.as_string()),
            on_done: field("onDone").and_then(|value| value.dyn_into::<Function>().ok()),
            stylesheet: field("stylesheet"),
        }
    }

    fn selector(&self) -> &str {
        self.selector.as_deref().unwrap_or(ELEMENT_NAME)
    }
}

/// Wire every element matching the selector and return them.
///
/// # Errors
/// Returns an error when the document is unavailable or the selector is
/// invalid.
pub fn init_countdown_timers_with(options: &InitOptions) -> Result<Vec<HtmlElement>, WebError> {
    let nodes = dom::document()?
        .query_selector_all(options.selector())
        .dom_op("querySelectorAll")?;
    let elements: Vec<HtmlElement> = (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
        .collect();

    if let Some(on_done) = &options.on_done {
        let notify = Rc::new(NotifyOnce::new(on_done.clone()));
        for element in &elements {
            watch_done(element, &notify);
        }
    }

    if let Some(stylesheet) = &options.stylesheet {
        let method = if stylesheet.is_string() {
            "adoptStyles"
        } else {
            "adoptStylesheet"
        };
        for element in &elements {
            call_method(element, method, stylesheet);
        }
    }

    log::debug!(
        "initialised {} countdown element(s) for {:?}",
        elements.len(),
        options.selector()
    );
    Ok(elements)
}

/// JS entry point: `initCountdownTimers({ selector, onDone, stylesheet })`.
///
/// # Errors
/// Rejects with the error message when the document or selector is unusable.
#[wasm_bindgen(js_name = initCountdownTimers)]
pub fn init_countdown_timers(options: JsValue) -> Result<Array, JsValue> {
    let elements = init_countdown_timers_with(&InitOptions::from_js(&options))?;
    Ok(elements.into_iter().collect())
}

/// Calls the user callback at most once per element.
struct NotifyOnce {
    callback: Function,
    notified: WeakSet,
}

impl NotifyOnce {
    fn new(callback: Function) -> Self {
        Self {
            callback,
            notified: WeakSet::new(),
        }
    }

    fn notify(&self, element: &Element) {
        let key: &js_sys::Object = element.unchecked_ref();
        if self.notified.has(key) {
            return;
        }
        self.notified.add(key);
        warn_on_err(self.callback.call1(&JsValue::NULL, element), "onDone");
    }
}

fn watch_done(element: &HtmlElement, notify: &Rc<NotifyOnce>) {
    let listener = {
        let notify = Rc::clone(notify);
        let target: Element = element.clone().into();
        Closure::<dyn FnMut()>::new(move || notify.notify(&target))
    };
    let added = element
        .add_event_listener_with_callback(DONE_EVENT, listener.as_ref().unchecked_ref());
    if warn_on_err(added, "addEventListener").is_some() {
        // lives as long as the element can fire `done`
        listener.forget();
    }

    let already_done = call_method(element, "isDone", &JsValue::UNDEFINED)
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    if already_done {
        notify.notify(element);
    }
}

/// Call `element[method](arg)` if such a method exists. Elements that are
/// not upgraded yet simply lack it.
fn call_method(element: &HtmlElement, method: &str, arg: &JsValue) -> Option<JsValue> {
    let function = Reflect::get(element, &JsValue::from_str(method))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    warn_on_err(function.call1(element, arg), "element method")
}

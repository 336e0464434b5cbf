use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, Window};

use crate::errors::{DomResultExt, WebError};

/// Retrieve the global `window` object.
///
/// # Errors
/// Returns [`WebError::MissingWindow`] outside of a browser context.
pub fn window() -> Result<Window, WebError> {
    web_sys::window().ok_or(WebError::MissingWindow)
}

/// Retrieve the document object for DOM interactions.
///
/// # Errors
/// Returns an error when no window or document is reachable.
pub fn document() -> Result<Document, WebError> {
    window()?.document().ok_or(WebError::MissingDocument)
}

/// Convert a JavaScript value into a readable string for error reporting.
#[must_use]
pub fn js_error_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|err| err.message().into())
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Create an `HtmlElement` with the given tag and class name.
///
/// # Errors
/// Returns an error if the element cannot be created.
pub fn create_element(
    document: &Document,
    tag: &str,
    class_name: &str,
) -> Result<HtmlElement, WebError> {
    let element = document
        .create_element(tag)
        .dom_op("createElement")?
        .dyn_into::<HtmlElement>()
        .map_err(|_| WebError::Dom {
            op: "createElement",
            message: format!("<{tag}> is not an HTMLElement"),
        })?;
    element.set_class_name(class_name);
    Ok(element)
}

/// Show or hide an element through its inline `display` property.
///
/// # Errors
/// Returns an error if the inline style cannot be updated.
pub fn set_displayed(element: &HtmlElement, visible: bool) -> Result<(), WebError> {
    let style = element.style();
    if visible {
        style.remove_property("display").dom_op("removeProperty")?;
    } else {
        style.set_property("display", "none").dom_op("setProperty")?;
    }
    Ok(())
}

/// Downcast an element found by a query into an `HtmlElement`.
#[must_use]
pub fn as_html(element: Option<Element>) -> Option<HtmlElement> {
    element.and_then(|el| el.dyn_into::<HtmlElement>().ok())
}

/// Schedule `callback` to run once after `delay_ms`. Returns the browser's
/// timeout id.
///
/// # Errors
/// Returns an error if the browser refuses to schedule the timer.
pub fn set_timeout(window: &Window, callback: &JsValue, delay_ms: u32) -> Result<i32, WebError> {
    let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
        .dom_op("setTimeout")
}

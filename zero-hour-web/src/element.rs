//! The `countdown-timer` custom element.
//!
//! The element class itself is a thin JavaScript shell (custom elements
//! must extend `HTMLElement` from JS). Every lifecycle callback and public
//! method forwards to a [`CountdownElement`] created by a Rust factory.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, HtmlElement};
use zero_hour_core::constants::{DONE_EVENT, ELEMENT_NAME, OBSERVED_ATTRIBUTES};
use zero_hour_core::{Configuration, Countdown, CountdownEvent};

use crate::dom;
use crate::errors::{DomResultExt, WebError};
use crate::host::{BrowserClock, HostAttributes, LocationQuery};
use crate::scheduler::{TimerCallback, WebScheduler};
use crate::styles::StylesInput;
use crate::surface::{ShadowSurface, TransitionCallback};

type Engine = Countdown<BrowserClock, WebScheduler, ShadowSurface>;

#[wasm_bindgen(inline_js = r#"
export function define_countdown_element(name, observed, factory) {
  if (customElements.get(name)) return false;
  class CountdownTimer extends HTMLElement {
    static get observedAttributes() { return observed; }
    constructor() { super(); this.__zh = factory(this); }
    connectedCallback() { this.__zh?.connected(); }
    disconnectedCallback() { this.__zh?.disconnected(); }
    attributeChangedCallback() { this.__zh?.attributeChanged(); }
    start() { this.__zh?.start(); }
    stop() { this.__zh?.stop(); }
    reset() { this.__zh?.reset(); }
    isRunning() { return this.__zh?.isRunning() ?? false; }
    isDone() { return this.__zh?.isDone() ?? false; }
    adoptStylesheet(sheet) { this.__zh?.adoptStyles(sheet); }
    adoptStyles(styles) { this.__zh?.adoptStyles(styles ?? null); }
  }
  customElements.define(name, CountdownTimer);
  return true;
}
"#)]
extern "C" {
    #[wasm_bindgen(catch)]
    fn define_countdown_element(
        name: &str,
        observed: &js_sys::Array,
        factory: &JsValue,
    ) -> Result<bool, JsValue>;
}

/// Register `countdown-timer` unless a definition already exists.
/// Returns whether this call performed the registration.
///
/// # Errors
/// Returns an error when the registry rejects the definition.
pub fn define_element() -> Result<bool, WebError> {
    let registry = dom::window()?.custom_elements();
    if !registry.get(ELEMENT_NAME).is_undefined() {
        return Ok(false);
    }

    let observed: js_sys::Array = OBSERVED_ATTRIBUTES
        .iter()
        .map(|name| JsValue::from_str(name))
        .collect();
    let factory = Closure::<dyn FnMut(HtmlElement) -> JsValue>::new(|host: HtmlElement| {
        match CountdownElement::create(host) {
            Ok(element) => JsValue::from(element),
            Err(err) => {
                log::error!("countdown-timer failed to initialise: {err}");
                JsValue::NULL
            }
        }
    });
    let defined = define_countdown_element(ELEMENT_NAME, &observed, factory.as_ref())
        .dom_op("customElements.define")?;
    if defined {
        // the definition lives as long as the page
        factory.forget();
        log::debug!("registered <{ELEMENT_NAME}>");
    }
    Ok(defined)
}

/// Per-instance state behind a `countdown-timer` element.
#[wasm_bindgen]
pub struct CountdownElement {
    host: HtmlElement,
    engine: Rc<RefCell<Engine>>,
}

impl CountdownElement {
    /// Build the shadow tree and engine for `host`.
    ///
    /// # Errors
    /// Returns an error when the shadow root cannot be attached or the page
    /// has no window.
    pub fn create(host: HtmlElement) -> Result<Self, WebError> {
        let window = dom::window()?;
        let mut surface = ShadowSurface::attach(&host)?;

        let engine = Rc::new_cyclic(|weak: &Weak<RefCell<Engine>>| {
            let timers: TimerCallback = {
                let weak = weak.clone();
                let host = host.clone();
                Rc::new(move |handle, kind| {
                    if let Some(engine) = weak.upgrade() {
                        pump(&engine, &host, |engine| engine.on_timer(handle, kind));
                    }
                })
            };
            let transitions: TransitionCallback = {
                let weak = weak.clone();
                let host = host.clone();
                Rc::new(move |token| {
                    if let Some(engine) = weak.upgrade() {
                        pump(&engine, &host, |engine| engine.on_transition_end(token));
                    }
                })
            };
            surface.set_transition_callback(transitions);
            RefCell::new(Countdown::new(
                BrowserClock,
                WebScheduler::new(window, timers),
                surface,
            ))
        });

        Ok(Self { host, engine })
    }

    fn resolve(&self) -> Configuration {
        Configuration::resolve(&HostAttributes(&self.host), &LocationQuery::current())
    }

    fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
        pump(&self.engine, &self.host, f)
    }
}

#[wasm_bindgen]
impl CountdownElement {
    pub fn connected(&self) {
        let config = self.resolve();
        self.with_engine(|engine| engine.connect(config));
    }

    pub fn disconnected(&self) {
        self.with_engine(Engine::disconnect);
    }

    #[wasm_bindgen(js_name = attributeChanged)]
    pub fn attribute_changed(&self) {
        let config = self.resolve();
        self.with_engine(|engine| engine.reconfigure(config));
    }

    pub fn start(&self) {
        self.with_engine(Engine::start);
    }

    pub fn stop(&self) {
        self.with_engine(Engine::stop);
    }

    pub fn reset(&self) {
        self.with_engine(Engine::reset);
    }

    #[wasm_bindgen(js_name = isRunning)]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.with_engine(|engine| engine.is_running()).unwrap_or(false)
    }

    #[wasm_bindgen(js_name = isDone)]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.with_engine(|engine| engine.is_done()).unwrap_or(false)
    }

    /// Accepts a `CSSStyleSheet`, CSS text, or `null` for the default sheet.
    #[wasm_bindgen(js_name = adoptStyles)]
    pub fn adopt_styles(&self, styles: JsValue) {
        let input = StylesInput::from_js(&styles);
        self.with_engine(|engine| engine.surface_mut().adopt_styles(&input));
    }
}

/// Run `f` against the engine, then dispatch whatever events it queued.
/// Dispatch happens after the borrow is released so listeners may call
/// back into the element.
fn pump<R>(
    engine: &Rc<RefCell<Engine>>,
    host: &HtmlElement,
    f: impl FnOnce(&mut Engine) -> R,
) -> Option<R> {
    let (result, events) = {
        let Ok(mut guard) = engine.try_borrow_mut() else {
            log::warn!("countdown-timer re-entered while busy; call dropped");
            return None;
        };
        let result = f(&mut *guard);
        (result, guard.drain_events())
    };
    for event in events {
        dispatch(host, event);
    }
    Some(result)
}

fn dispatch(host: &HtmlElement, event: CountdownEvent) {
    let name = match event {
        CountdownEvent::Done => DONE_EVENT,
    };
    match CustomEvent::new(name) {
        Ok(custom) => {
            if let Err(err) = host.dispatch_event(&custom) {
                log::warn!("{}", WebError::dom("dispatchEvent", &err));
            }
        }
        Err(err) => log::warn!("{}", WebError::dom("new CustomEvent", &err)),
    }
}

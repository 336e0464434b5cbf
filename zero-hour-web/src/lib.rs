#![forbid(unsafe_code)]
//! Browser shell for the Zero Hour countdown: registers the
//! `countdown-timer` custom element and binds the core engine to the DOM.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod dom;
pub mod element;
pub mod errors;
pub mod host;
pub mod init;
pub mod logging;
pub mod scheduler;
pub mod styles;
pub mod surface;

pub use element::{CountdownElement, define_element};
pub use errors::WebError;
pub use init::{InitOptions, init_countdown_timers, init_countdown_timers_with};
pub use styles::{DEFAULT_CSS, StylesInput};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    if let Err(err) = logging::init_logging(logging::default_level()) {
        web_sys::console::warn_1(&JsValue::from(err.to_string()));
    }
    if let Err(err) = define_element() {
        log::error!("countdown-timer registration failed: {err}");
    }
}

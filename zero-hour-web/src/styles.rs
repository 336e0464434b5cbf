//! Style adoption for the element's shadow root.
//!
//! Constructable sheets are preferred; roots without `adoptedStyleSheets`
//! get an inline `<style>` element instead.

use once_cell::sync::Lazy;
use regex::Regex;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CssStyleSheet, ShadowRoot};

/// Default stylesheet bundled with the element.
pub const DEFAULT_CSS: &str = include_str!("../static/zero-hour.css");

const ADOPTED_STYLE_SHEETS: &str = "adoptedStyleSheets";

static CSS_TIME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+))\s*(ms|s)?\s*$").ok());

thread_local! {
    static DEFAULT_SHEET: Option<CssStyleSheet> = constructable_sheet(DEFAULT_CSS);
}

/// What the host asked the element to style itself with.
#[derive(Debug, Clone, Default)]
pub enum StylesInput {
    /// A prepared constructable sheet.
    Sheet(CssStyleSheet),
    /// Raw CSS text.
    Text(String),
    /// The bundled default sheet.
    #[default]
    Default,
}

impl StylesInput {
    /// Interpret an arbitrary JS value: a string, a `CSSStyleSheet`, or
    /// anything else meaning "use the default".
    #[must_use]
    pub fn from_js(value: &JsValue) -> Self {
        if let Some(text) = value.as_string() {
            return Self::Text(text);
        }
        value
            .dyn_ref::<CssStyleSheet>()
            .map_or(Self::Default, |sheet| Self::Sheet(sheet.clone()))
    }

    /// The CSS text an inline `<style>` fallback should carry.
    #[must_use]
    pub fn fallback_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Sheet(_) | Self::Default => DEFAULT_CSS,
        }
    }
}

/// How a root ended up styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adoption {
    Adopted,
    Inline,
}

/// The bundled CSS, exposed for hosts that want to extend it.
#[wasm_bindgen(js_name = zeroHourCssText)]
#[must_use]
pub fn zero_hour_css_text() -> String {
    DEFAULT_CSS.to_string()
}

/// Whether `root` supports `adoptedStyleSheets`.
#[must_use]
pub fn supports_adopted(root: &ShadowRoot) -> bool {
    js_sys::Reflect::has(root, &JsValue::from_str(ADOPTED_STYLE_SHEETS)).unwrap_or(false)
}

/// Build a constructable sheet from text, or `None` when the browser has
/// no `CSSStyleSheet` constructor or rejects the text.
#[must_use]
pub fn constructable_sheet(css: &str) -> Option<CssStyleSheet> {
    let sheet = CssStyleSheet::new().ok()?;
    sheet.replace_sync(css).ok()?;
    Some(sheet)
}

/// Adopt `input` on `root` when possible. Returns [`Adoption::Inline`] when
/// the caller has to fall back to a `<style>` element.
pub fn adopt(root: &ShadowRoot, input: &StylesInput) -> Adoption {
    if !supports_adopted(root) {
        return Adoption::Inline;
    }
    let sheet = match input {
        StylesInput::Sheet(sheet) => Some(sheet.clone()),
        StylesInput::Text(text) => constructable_sheet(text),
        StylesInput::Default => DEFAULT_SHEET.with(Clone::clone),
    };
    let Some(sheet) = sheet else {
        return Adoption::Inline;
    };
    let sheets = js_sys::Array::of1(&sheet);
    match js_sys::Reflect::set(root, &JsValue::from_str(ADOPTED_STYLE_SHEETS), &sheets) {
        Ok(true) => Adoption::Adopted,
        Ok(false) => Adoption::Inline,
        Err(err) => {
            log::warn!(
                "adoptedStyleSheets rejected: {}",
                crate::dom::js_error_message(&err)
            );
            Adoption::Inline
        }
    }
}

/// Parse one CSS `<time>` value (`"0.3s"`, `"250ms"`, `"0"`) into
/// milliseconds.
#[must_use]
pub fn parse_css_time_ms(raw: &str) -> Option<f64> {
    let caps = CSS_TIME.as_ref()?.captures(raw)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2).map(|unit| unit.as_str()) {
        Some("s") => Some(value * 1_000.0),
        _ => Some(value),
    }
}

/// Total time of the first listed transition, from computed
/// `transition-duration` and `transition-delay` lists.
#[must_use]
pub fn transition_total_ms(durations: &str, delays: &str) -> Option<u32> {
    let first = |list: &str| list.split(',').next().map_or("", str::trim).to_string();
    let duration = parse_css_time_ms(&first(durations))?;
    let delay = parse_css_time_ms(&first(delays)).unwrap_or(0.0);
    let total = (duration + delay).max(0.0).round();
    num_to_u32(total)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked below
fn num_to_u32(value: f64) -> Option<u32> {
    if value.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Some(value as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_times_in_seconds_and_millis() {
        assert_eq!(parse_css_time_ms("0.3s"), Some(300.0));
        assert_eq!(parse_css_time_ms(" 250ms "), Some(250.0));
        assert_eq!(parse_css_time_ms("0"), Some(0.0));
        assert_eq!(parse_css_time_ms(".5s"), Some(500.0));
        assert_eq!(parse_css_time_ms("fast"), None);
        assert_eq!(parse_css_time_ms(""), None);
    }

    #[test]
    fn transition_total_uses_first_entry_plus_delay() {
        assert_eq!(transition_total_ms("0.32s, 1s", "50ms, 0s"), Some(370));
        assert_eq!(transition_total_ms("0s", ""), Some(0));
        assert_eq!(transition_total_ms("", "0s"), None);
    }

    #[test]
    fn bundled_css_defines_the_digit_classes() {
        for class in [
            zero_hour_core::constants::CLASS_DIGIT,
            zero_hour_core::constants::CLASS_DIGIT_TRACK,
            zero_hour_core::constants::CLASS_DIGIT_FACE,
            zero_hour_core::constants::CLASS_MODE_SCROLL,
            zero_hour_core::constants::CLASS_TEXT_FALLBACK,
            zero_hour_core::constants::CLASS_A11Y,
        ] {
            assert!(DEFAULT_CSS.contains(&format!(".{class}")), "missing .{class}");
        }
    }
}

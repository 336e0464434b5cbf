//! Browser implementations of the engine's read-only host capabilities.

use web_sys::{HtmlElement, UrlSearchParams};
use zero_hour_core::numbers::trunc_f64_to_i64;
use zero_hour_core::{AttributeSource, Clock, QuerySource};

/// Wall clock backed by `Date.now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> i64 {
        trunc_f64_to_i64(js_sys::Date::now())
    }
}

/// Attributes of the custom element itself.
#[derive(Debug, Clone, Copy)]
pub struct HostAttributes<'a>(pub &'a HtmlElement);

impl AttributeSource for HostAttributes<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }
}

/// Query string of the hosting page, read once per resolution pass.
#[derive(Debug, Default)]
pub struct LocationQuery {
    params: Option<UrlSearchParams>,
}

impl LocationQuery {
    /// Snapshot the current `location.search`. A page without a readable
    /// location yields no overrides.
    #[must_use]
    pub fn current() -> Self {
        let params = web_sys::window()
            .and_then(|win| win.location().search().ok())
            .and_then(|search| UrlSearchParams::new_with_str(&search).ok());
        Self { params }
    }
}

impl QuerySource for LocationQuery {
    fn query_param(&self, key: &str) -> Option<String> {
        self.params.as_ref().and_then(|params| params.get(key))
    }
}

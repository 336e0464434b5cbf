//! Zero Hour countdown engine
//!
//! Platform-agnostic core of the `countdown-timer` widget: configuration
//! resolution, second-aligned scheduling, duration decomposition and digit
//! reconciliation. The host (a browser element, a terminal, a test harness)
//! plugs in through the capability traits defined here and in [`surface`].

pub mod config;
pub mod constants;
pub mod countdown;
pub mod duration;
pub mod instant;
pub mod numbers;
pub mod reconciler;
pub mod scheduler;
pub mod surface;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod units;

use std::collections::{BTreeMap, HashMap};

// Re-export commonly used types
pub use config::{
    ConfigError, Configuration, QueryOverrides, TransitionMode, parse_bool_attribute,
    parse_time_lenient, parse_time_strict, parse_units, parse_utc_offset, parse_ymd_date,
};
pub use countdown::{Countdown, CountdownEvent};
pub use duration::{DecomposedDuration, decompose};
pub use instant::{CalendarDate, Instant, TimeOfDay, UtcOffset};
pub use reconciler::{DigitReconciler, Glyph, digit_chars};
pub use scheduler::{RunState, next_boundary_delay};
pub use surface::{CompletionSource, SlotAddr, Surface, TransitionToken};
pub use units::{UnitGroup, UnitsMask};

/// Source of wall-clock time, in UTC milliseconds since the epoch.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Identifies one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// What a scheduled callback is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Next second-boundary tick.
    Tick,
    /// Upper bound on how long a scroll transition may stay pending.
    TransitionGuard(TransitionToken),
}

/// Trait for abstracting one-shot timers.
/// Platform-specific implementations should provide this
///
/// When a timer fires the host must hand the same handle and kind back to
/// [`Countdown::on_timer`]. A cleared timer must never be delivered; a late
/// delivery after clearing is tolerated and ignored by the engine.
pub trait Scheduler {
    fn set_timeout(&mut self, delay_ms: u32, kind: TimerKind) -> TimerHandle;

    fn clear_timeout(&mut self, handle: TimerHandle);
}

/// Read access to the element's declarative attributes.
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<String>;
}

/// Read access to query-string overrides of the hosting page.
pub trait QuerySource {
    fn query_param(&self, key: &str) -> Option<String>;
}

/// A query source that never overrides anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQuery;

impl QuerySource for NoQuery {
    fn query_param(&self, _key: &str) -> Option<String> {
        None
    }
}

impl AttributeSource for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeSource for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl QuerySource for BTreeMap<String, String> {
    fn query_param(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl QuerySource for HashMap<String, String> {
    fn query_param(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

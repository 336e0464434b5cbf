//! Deterministic host doubles for driving the engine without a browser.
//!
//! [`ManualClock`] only moves when told to, [`ManualScheduler`] keeps its
//! timers in a queue that tests fire explicitly and [`RecordingSurface`]
//! models the digit tree while logging every operation it receives.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::config::TransitionMode;
use crate::countdown::Countdown;
use crate::reconciler::Glyph;
use crate::surface::{SlotAddr, Surface, TransitionToken};
use crate::units::UnitGroup;
use crate::{Clock, Scheduler, TimerHandle, TimerKind};

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(now_ms)),
        }
    }

    #[must_use]
    pub fn now(&self) -> i64 {
        self.now.get()
    }

    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get().saturating_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

/// A timer queue whose deadlines are measured against a [`ManualClock`].
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    next_id: u64,
    pending: BTreeMap<TimerHandle, (i64, TimerKind)>,
    cleared: usize,
}

impl ManualScheduler {
    #[must_use]
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            next_id: 1,
            pending: BTreeMap::new(),
            cleared: 0,
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn pending_ticks(&self) -> usize {
        self.pending
            .values()
            .filter(|(_, kind)| *kind == TimerKind::Tick)
            .count()
    }

    /// How many pending timers were cleared before firing.
    #[must_use]
    pub const fn cleared_count(&self) -> usize {
        self.cleared
    }

    /// The earliest pending timer. Ties go to the one scheduled first.
    #[must_use]
    pub fn next_due(&self) -> Option<(TimerHandle, i64, TimerKind)> {
        self.pending
            .iter()
            .map(|(handle, (due, kind))| (*handle, *due, *kind))
            .min_by_key(|(handle, due, _)| (*due, *handle))
    }

    /// Remove and return the earliest timer due at or before `now_ms`.
    pub fn take_due(&mut self, now_ms: i64) -> Option<(TimerHandle, i64, TimerKind)> {
        let next = self.next_due().filter(|(_, due, _)| *due <= now_ms)?;
        self.pending.remove(&next.0);
        Some(next)
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&mut self, delay_ms: u32, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle::new(self.next_id);
        self.next_id += 1;
        let due = self.clock.now().saturating_add(i64::from(delay_ms));
        self.pending.insert(handle, (due, kind));
        handle
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        if self.pending.remove(&handle).is_some() {
            self.cleared += 1;
        }
    }
}

impl<S: Surface> Countdown<ManualClock, ManualScheduler, S> {
    /// Move the clock forward by `ms`, firing every timer that falls due on
    /// the way in deadline order. Returns how many timers fired.
    pub fn advance_by(&mut self, ms: i64) -> usize {
        let end = self.clock().now().saturating_add(ms);
        let mut fired = 0;
        while let Some((handle, due, kind)) = self.scheduler_mut().take_due(end) {
            if due > self.clock().now() {
                self.clock().set(due);
            }
            self.on_timer(handle, kind);
            fired += 1;
        }
        self.clock().set(end);
        fired
    }

    /// Fire the earliest pending timer, moving the clock to its deadline.
    pub fn fire_next(&mut self) -> Option<TimerKind> {
        let (_, due, _) = self.scheduler().next_due()?;
        let now = self.clock().now().max(due);
        let (handle, _, kind) = self.scheduler_mut().take_due(now)?;
        self.clock().set(now);
        self.on_timer(handle, kind);
        Some(kind)
    }
}

/// Every call a [`RecordingSurface`] received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    SetProperty { name: String, value: Option<String> },
    SetClass { class: String, enabled: bool },
    SetGroupVisible { group: UnitGroup, visible: bool },
    SetSeparatorVisible { index: usize, visible: bool },
    SetSummary(String),
    PushSlot { group: UnitGroup, glyph: Glyph },
    PopSlot { group: UnitGroup },
    SetDigit { slot: SlotAddr, glyph: Glyph },
    BeginScroll { token: TransitionToken, glyph: Glyph },
    FinishScroll { slot: SlotAddr },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordedSlot {
    current: char,
    incoming: Option<char>,
}

/// An in-memory surface.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    groups: [Vec<RecordedSlot>; 4],
    group_visible: [bool; 4],
    separator_visible: [bool; 3],
    properties: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    summary: String,
    ops: Vec<SurfaceOp>,
    transition_ms: Option<u32>,
    scrolls: Vec<TransitionToken>,
    finished: usize,
    created: usize,
    removed: usize,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            groups: Default::default(),
            group_visible: [true; 4],
            separator_visible: [true; 3],
            properties: BTreeMap::new(),
            classes: BTreeSet::new(),
            summary: String::new(),
            ops: Vec::new(),
            transition_ms: None,
            scrolls: Vec::new(),
            finished: 0,
            created: 0,
            removed: 0,
        }
    }
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition time reported by [`Surface::begin_scroll`].
    pub const fn set_transition_ms(&mut self, ms: Option<u32>) {
        self.transition_ms = ms;
    }

    #[must_use]
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Committed characters of `group`, ignoring faces still sliding in.
    #[must_use]
    pub fn digits(&self, group: UnitGroup) -> String {
        self.groups[group.index()]
            .iter()
            .map(|slot| slot.current)
            .collect()
    }

    /// The face sliding into `slot`, if a scroll is in flight.
    #[must_use]
    pub fn incoming(&self, slot: SlotAddr) -> Option<char> {
        self.groups[slot.group.index()]
            .get(slot.index)
            .and_then(|recorded| recorded.incoming)
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    #[must_use]
    pub const fn group_visibility(&self) -> [bool; 4] {
        self.group_visible
    }

    #[must_use]
    pub const fn separator_visibility(&self) -> [bool; 3] {
        self.separator_visible
    }

    #[must_use]
    pub fn last_scroll_token(&self) -> Option<TransitionToken> {
        self.scrolls.last().copied()
    }

    #[must_use]
    pub const fn finished_scrolls(&self) -> usize {
        self.finished
    }

    #[must_use]
    pub const fn slots_created(&self) -> usize {
        self.created
    }

    #[must_use]
    pub const fn slots_removed(&self) -> usize {
        self.removed
    }
}

impl Surface for RecordingSurface {
    fn set_style_property(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.properties.insert(name.to_string(), value.to_string());
            }
            None => {
                self.properties.remove(name);
            }
        }
        self.ops.push(SurfaceOp::SetProperty {
            name: name.to_string(),
            value: value.map(str::to_string),
        });
    }

    fn set_class(&mut self, class: &str, enabled: bool) {
        if enabled {
            self.classes.insert(class.to_string());
        } else {
            self.classes.remove(class);
        }
        self.ops.push(SurfaceOp::SetClass {
            class: class.to_string(),
            enabled,
        });
    }

    fn set_group_visible(&mut self, group: UnitGroup, visible: bool) {
        self.group_visible[group.index()] = visible;
        self.ops.push(SurfaceOp::SetGroupVisible { group, visible });
    }

    fn set_separator_visible(&mut self, index: usize, visible: bool) {
        if let Some(slot) = self.separator_visible.get_mut(index) {
            *slot = visible;
        }
        self.ops.push(SurfaceOp::SetSeparatorVisible { index, visible });
    }

    fn set_summary(&mut self, text: &str) {
        text.clone_into(&mut self.summary);
        self.ops.push(SurfaceOp::SetSummary(text.to_string()));
    }

    fn push_slot(&mut self, group: UnitGroup, glyph: Glyph) {
        self.groups[group.index()].push(RecordedSlot {
            current: glyph.as_char(),
            incoming: None,
        });
        self.created += 1;
        self.ops.push(SurfaceOp::PushSlot { group, glyph });
    }

    fn pop_slot(&mut self, group: UnitGroup) {
        if self.groups[group.index()].pop().is_some() {
            self.removed += 1;
        }
        self.ops.push(SurfaceOp::PopSlot { group });
    }

    fn set_digit(&mut self, slot: SlotAddr, glyph: Glyph) {
        if let Some(recorded) = self.groups[slot.group.index()].get_mut(slot.index) {
            recorded.current = glyph.as_char();
        }
        self.ops.push(SurfaceOp::SetDigit { slot, glyph });
    }

    fn begin_scroll(&mut self, token: TransitionToken, next: Glyph) -> Option<u32> {
        if let Some(recorded) = self.groups[token.slot.group.index()].get_mut(token.slot.index) {
            recorded.incoming = Some(next.as_char());
        }
        self.scrolls.push(token);
        self.ops.push(SurfaceOp::BeginScroll { token, glyph: next });
        self.transition_ms
    }

    fn finish_scroll(&mut self, slot: SlotAddr, _mode: TransitionMode) {
        if let Some(recorded) = self.groups[slot.group.index()].get_mut(slot.index)
            && let Some(next) = recorded.incoming.take()
        {
            recorded.current = next;
        }
        self.finished += 1;
        self.ops.push(SurfaceOp::FinishScroll { slot });
    }
}

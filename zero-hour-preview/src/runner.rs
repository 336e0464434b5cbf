//! Real-time driver for the engine on a tokio runtime.

use std::collections::BTreeMap;
use std::time::Duration;

use zero_hour_core::{Clock, Countdown, CountdownEvent, Scheduler, TimerHandle, TimerKind};

use crate::terminal::TerminalSurface;

/// Timer queue with deadlines on the engine's clock. The run loop sleeps
/// until the earliest deadline and delivers it.
#[derive(Debug, Clone)]
pub struct QueueScheduler<C> {
    clock: C,
    next_handle: u64,
    pending: BTreeMap<TimerHandle, (i64, TimerKind)>,
}

impl<C: Clock> QueueScheduler<C> {
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            next_handle: 1,
            pending: BTreeMap::new(),
        }
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<i64> {
        self.pending.values().map(|(due, _)| *due).min()
    }

    /// Remove and return every timer due at `now_ms`, earliest first.
    pub fn take_due(&mut self, now_ms: i64) -> Vec<(TimerHandle, TimerKind)> {
        let mut due: Vec<(i64, TimerHandle, TimerKind)> = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now_ms)
            .map(|(handle, (deadline, kind))| (*deadline, *handle, *kind))
            .collect();
        due.sort_by_key(|(deadline, handle, _)| (*deadline, *handle));
        for (_, handle, _) in &due {
            self.pending.remove(handle);
        }
        due.into_iter()
            .map(|(_, handle, kind)| (handle, kind))
            .collect()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<C: Clock> Scheduler for QueueScheduler<C> {
    fn set_timeout(&mut self, delay_ms: u32, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle::new(self.next_handle);
        self.next_handle += 1;
        let due = self.clock.now_ms().saturating_add(i64::from(delay_ms));
        self.pending.insert(handle, (due, kind));
        handle
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle);
    }
}

pub type Preview<C> = Countdown<C, QueueScheduler<C>, TerminalSurface>;

/// What happened during one delivery round.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Round {
    pub ticks: usize,
    pub events: Vec<CountdownEvent>,
    pub redraw: bool,
}

/// Deliver every timer due now, end terminal scrolls at once and collect
/// the engine's events.
pub fn deliver_due<C: Clock>(countdown: &mut Preview<C>) -> Round {
    let now = countdown.clock().now_ms();
    let mut round = Round::default();
    for (handle, kind) in countdown.scheduler_mut().take_due(now) {
        if kind == TimerKind::Tick {
            round.ticks += 1;
        }
        countdown.on_timer(handle, kind);
        settle_scrolls(countdown);
    }
    round.events = countdown.drain_events();
    round.redraw = countdown.surface_mut().take_dirty();
    round
}

/// Report every started terminal scroll as finished.
pub fn settle_scrolls<C: Clock>(countdown: &mut Preview<C>) {
    for token in countdown.surface_mut().take_ended() {
        countdown.on_transition_end(token);
    }
}

/// Time to sleep before the next deadline, or `None` when nothing is
/// pending.
#[must_use]
pub fn sleep_for<C: Clock>(countdown: &Preview<C>) -> Option<Duration> {
    let deadline = countdown.scheduler().next_deadline()?;
    let wait = deadline.saturating_sub(countdown.clock().now_ms()).max(0);
    Some(Duration::from_millis(u64::try_from(wait).unwrap_or(0)))
}

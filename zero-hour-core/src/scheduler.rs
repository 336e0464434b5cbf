//! Run state and second-boundary scheduling.

use crate::constants::MS_PER_SECOND;
use crate::instant::Instant;
use crate::numbers::clamp_non_negative;
use crate::{Scheduler, TimerHandle, TimerKind};

/// Delay until the next wall-clock second boundary, in `1..=1000` ms.
///
/// Scheduling against the boundary rather than a fixed 1000 ms interval
/// keeps the display from drifting.
#[must_use]
pub fn next_boundary_delay(now_ms: i64) -> u32 {
    let into_second = now_ms.rem_euclid(MS_PER_SECOND);
    u32::try_from(MS_PER_SECOND - into_second).unwrap_or(1_000)
}

/// Per-instance run bookkeeping: the modelled duration, when the run
/// started, the one pending tick and whether the terminal signal fired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    duration_ms: i64,
    started_at: Option<i64>,
    pending_tick: Option<TimerHandle>,
    reached: bool,
}

impl RunState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            duration_ms: 0,
            started_at: None,
            pending_tick: None,
            reached: false,
        }
    }

    /// Running means a start instant is recorded and a tick is pending.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.started_at.is_some() && self.pending_tick.is_some()
    }

    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    #[must_use]
    pub const fn reached(&self) -> bool {
        self.reached
    }

    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    #[must_use]
    pub const fn pending_tick(&self) -> Option<TimerHandle> {
        self.pending_tick
    }

    /// Record a new run toward `target`. No target models a zero duration.
    pub fn begin(&mut self, now_ms: i64, target: Option<Instant>) {
        self.duration_ms = target.map_or(0, |target| target.millis_from(now_ms));
        self.started_at = Some(now_ms);
    }

    /// Forget the modelled duration without touching the run.
    pub const fn clear_duration(&mut self) {
        self.duration_ms = 0;
    }

    /// Cancel the pending tick and clear the start instant. Idempotent.
    pub fn stop(&mut self, scheduler: &mut impl Scheduler) {
        if let Some(handle) = self.pending_tick.take() {
            scheduler.clear_timeout(handle);
        }
        self.started_at = None;
    }

    /// Remaining milliseconds to show at `now_ms`, floored at zero.
    #[must_use]
    pub fn shown_ms(&self, now_ms: i64) -> u64 {
        let duration = clamp_non_negative(self.duration_ms);
        if duration == 0 {
            return 0;
        }
        let started = self.started_at.unwrap_or(now_ms);
        let elapsed = clamp_non_negative(now_ms.saturating_sub(started));
        duration.saturating_sub(elapsed)
    }

    /// Schedule the next tick at the coming second boundary, replacing any
    /// tick still pending so at most one is ever outstanding.
    pub fn schedule_next(&mut self, now_ms: i64, scheduler: &mut impl Scheduler) {
        if let Some(previous) = self.pending_tick.take() {
            scheduler.clear_timeout(previous);
        }
        let delay = next_boundary_delay(now_ms);
        self.pending_tick = Some(scheduler.set_timeout(delay, TimerKind::Tick));
        log::trace!("next tick in {delay}ms");
    }

    /// Accept a fired tick. Returns false for stale handles, which belong to
    /// a timer that was cleared or replaced.
    pub fn accept_tick(&mut self, handle: TimerHandle) -> bool {
        if self.pending_tick == Some(handle) {
            self.pending_tick = None;
            true
        } else {
            false
        }
    }

    /// Mark the terminal signal as fired. Returns true only the first time
    /// per run cycle.
    pub const fn mark_reached(&mut self) -> bool {
        if self.reached {
            return false;
        }
        self.reached = true;
        true
    }

    pub const fn clear_reached(&mut self) {
        self.reached = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, ManualScheduler};

    #[test]
    fn boundary_delay_aligns_to_next_second() {
        assert_eq!(next_boundary_delay(10_000), 1_000);
        assert_eq!(next_boundary_delay(10_001), 999);
        assert_eq!(next_boundary_delay(10_999), 1);
        assert_eq!(next_boundary_delay(-1), 1);
    }

    #[test]
    fn shown_counts_down_and_floors_at_zero() {
        let mut run = RunState::new();
        run.begin(1_000, Some(Instant::from_epoch_ms(11_000)));
        assert_eq!(run.shown_ms(1_000), 10_000);
        assert_eq!(run.shown_ms(4_500), 6_500);
        assert_eq!(run.shown_ms(20_000), 0);
        // clock stepping backwards never adds time
        assert_eq!(run.shown_ms(500), 10_000);
    }

    #[test]
    fn past_target_has_nothing_to_show() {
        let mut run = RunState::new();
        run.begin(5_000, Some(Instant::from_epoch_ms(1_000)));
        assert_eq!(run.duration_ms(), -4_000);
        assert_eq!(run.shown_ms(5_000), 0);
    }

    #[test]
    fn only_one_tick_is_ever_pending() {
        let clock = ManualClock::new(2_250);
        let mut scheduler = ManualScheduler::new(clock.clone());
        let mut run = RunState::new();
        run.begin(clock.now(), None);
        run.schedule_next(clock.now(), &mut scheduler);
        let first = run.pending_tick().unwrap();
        run.schedule_next(clock.now(), &mut scheduler);
        assert_eq!(scheduler.pending_count(), 1);
        assert!(!run.accept_tick(first));
        assert!(run.is_running());
        run.stop(&mut scheduler);
        run.stop(&mut scheduler);
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!run.is_running());
    }

    #[test]
    fn reached_flag_fires_once_until_cleared() {
        let mut run = RunState::new();
        assert!(run.mark_reached());
        assert!(!run.mark_reached());
        run.clear_reached();
        assert!(run.mark_reached());
    }
}

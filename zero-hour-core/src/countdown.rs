//! The countdown engine: one instance per mounted widget.

use crate::config::Configuration;
use crate::duration::{DecomposedDuration, decompose};
use crate::numbers::clamp_non_negative;
use crate::reconciler::DigitReconciler;
use crate::scheduler::RunState;
use crate::surface::{CompletionSource, Surface, TransitionToken};
use crate::{Clock, Scheduler, TimerHandle, TimerKind};

/// Signals produced by the engine for the host to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// The remaining duration reached zero. Emitted at most once per run.
    Done,
}

/// Drives a [`Surface`] from a [`Configuration`] using the host's clock and
/// timers.
///
/// The engine never calls back into the host synchronously for events;
/// they are queued and collected with [`Countdown::drain_events`].
#[derive(Debug)]
pub struct Countdown<C, T, S> {
    clock: C,
    scheduler: T,
    surface: S,
    config: Configuration,
    run: RunState,
    reconciler: DigitReconciler,
    displayed: DecomposedDuration,
    connected: bool,
    events: Vec<CountdownEvent>,
}

impl<C: Clock, T: Scheduler, S: Surface> Countdown<C, T, S> {
    pub fn new(clock: C, scheduler: T, surface: S) -> Self {
        Self {
            clock,
            scheduler,
            surface,
            config: Configuration::default(),
            run: RunState::new(),
            reconciler: DigitReconciler::new(),
            displayed: DecomposedDuration::ZERO,
            connected: false,
            events: Vec::new(),
        }
    }

    /// Mount onto the surface and apply `config`. Starts immediately when
    /// autostart is on, otherwise shows a static snapshot.
    pub fn connect(&mut self, config: Configuration) {
        self.connected = true;
        self.reconciler.mount(&mut self.surface, &mut self.scheduler);
        self.apply(config);
        if self.config.autostart {
            self.start();
        } else {
            self.render_static();
        }
    }

    /// Unmount: cancel the tick and settle any running transitions.
    pub fn disconnect(&mut self) {
        self.run.stop(&mut self.scheduler);
        self.reconciler.settle(&mut self.surface, &mut self.scheduler);
        self.connected = false;
    }

    /// Apply a fresh resolution pass. While disconnected the configuration
    /// is only stored for the next [`connect`](Self::connect).
    pub fn reconfigure(&mut self, config: Configuration) {
        if !self.connected {
            self.config = config;
            return;
        }
        let was_running = self.is_running();
        self.apply(config);
        self.run.clear_reached();
        if was_running && self.config.autostart {
            self.start();
        } else {
            self.run.stop(&mut self.scheduler);
            self.render_static();
        }
    }

    /// Begin a run toward the configured target. Restarts when already
    /// running; does nothing without a digits asset.
    pub fn start(&mut self) {
        self.run.stop(&mut self.scheduler);
        if !self.config.has_digits() {
            return;
        }
        let now = self.clock.now_ms();
        self.run.begin(now, self.config.target);
        self.tick();
        if self.run.is_started() {
            self.run.schedule_next(self.clock.now_ms(), &mut self.scheduler);
        }
    }

    pub fn stop(&mut self) {
        self.run.stop(&mut self.scheduler);
    }

    /// Re-arm the terminal signal, then restart or show a static snapshot.
    pub fn reset(&mut self) {
        self.run.clear_reached();
        if self.config.autostart {
            self.start();
        } else {
            self.run.stop(&mut self.scheduler);
            self.render_static();
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.run.is_running()
    }

    /// True once the configured target lies in the past. Always false
    /// without a digits asset or a target.
    #[must_use]
    pub fn is_done(&self) -> bool {
        if !self.config.has_digits() {
            return false;
        }
        self.config
            .target
            .is_some_and(|target| self.clock.now_ms() >= target.epoch_ms())
    }

    /// Deliver a fired timer. Stale handles are ignored.
    pub fn on_timer(&mut self, handle: TimerHandle, kind: TimerKind) {
        match kind {
            TimerKind::Tick => {
                if !self.run.accept_tick(handle) {
                    log::trace!("ignoring stale tick {}", handle.raw());
                    return;
                }
                self.tick();
                if self.run.is_started() {
                    self.run.schedule_next(self.clock.now_ms(), &mut self.scheduler);
                }
            }
            TimerKind::TransitionGuard(token) => {
                self.reconciler.complete(
                    token,
                    CompletionSource::GuardTimeout,
                    &mut self.surface,
                    &mut self.scheduler,
                );
            }
        }
    }

    /// Deliver the host's end-of-transition signal. Returns false when the
    /// transition had already been finished.
    pub fn on_transition_end(&mut self, token: TransitionToken) -> bool {
        self.reconciler.complete(
            token,
            CompletionSource::TransitionEnd,
            &mut self.surface,
            &mut self.scheduler,
        )
    }

    /// Take the events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<CountdownEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// The value of the most recent render.
    #[must_use]
    pub const fn displayed(&self) -> &DecomposedDuration {
        &self.displayed
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub const fn reconciler(&self) -> &DigitReconciler {
        &self.reconciler
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub const fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub const fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn apply(&mut self, config: Configuration) {
        self.config = config;
        self.run.clear_duration();
        if self.config.has_digits() {
            self.reconciler
                .apply_configuration(&self.config, &mut self.surface);
        } else {
            self.reconciler.show_fallback(&mut self.surface);
        }
    }

    fn tick(&mut self) {
        if !self.config.has_digits() {
            return;
        }
        let shown = self.run.shown_ms(self.clock.now_ms());
        let value = decompose(shown);
        self.show(value, true);
        log::trace!("tick: {} seconds remaining", value.total_seconds);
        if value.is_zero() {
            self.fire_done_once();
            self.run.stop(&mut self.scheduler);
        }
    }

    fn render_static(&mut self) {
        if !self.config.has_digits() {
            return;
        }
        let now = self.clock.now_ms();
        let remaining = self
            .config
            .target
            .map_or(0, |target| clamp_non_negative(target.millis_from(now)));
        self.show(decompose(remaining), false);
    }

    fn show(&mut self, value: DecomposedDuration, animate: bool) {
        self.reconciler
            .render(&value, animate, &mut self.surface, &mut self.scheduler);
        self.displayed = value;
    }

    fn fire_done_once(&mut self) {
        if self.run.mark_reached() {
            log::info!("countdown reached zero");
            self.events.push(CountdownEvent::Done);
        }
    }
}

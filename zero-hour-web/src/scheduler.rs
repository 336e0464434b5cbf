//! `setTimeout`-backed [`Scheduler`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::closure::Closure;
use web_sys::Window;
use zero_hour_core::{Scheduler, TimerHandle, TimerKind};

use crate::dom;

/// Receives every timer that fires, with the handle it was scheduled as.
pub type TimerCallback = Rc<dyn Fn(TimerHandle, TimerKind)>;

type TimerClosure = Closure<dyn FnMut()>;

#[derive(Default)]
struct Timers {
    active: HashMap<TimerHandle, (i32, TimerClosure)>,
    // the closure that fired last; it may still be on the stack
    spent: Option<TimerClosure>,
}

/// One-shot browser timers keyed by engine handles.
///
/// The scheduler owns every timer closure. A cleared timer's closure is
/// dropped right away; a fired one is retired and dropped when the next
/// timer fires.
pub struct WebScheduler {
    window: Window,
    callback: TimerCallback,
    next_handle: u64,
    timers: Rc<RefCell<Timers>>,
}

impl std::fmt::Debug for WebScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebScheduler")
            .field("next_handle", &self.next_handle)
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

impl WebScheduler {
    #[must_use]
    pub fn new(window: Window, callback: TimerCallback) -> Self {
        Self {
            window,
            callback,
            next_handle: 1,
            timers: Rc::new(RefCell::new(Timers::default())),
        }
    }

    /// Number of timers scheduled and not yet fired or cleared.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers.borrow().active.len()
    }

    /// Number of timer closures still held, including a retired one.
    #[must_use]
    pub fn retained_closures(&self) -> usize {
        let timers = self.timers.borrow();
        timers.active.len() + usize::from(timers.spent.is_some())
    }
}

fn retire(timers: &Weak<RefCell<Timers>>, handle: TimerHandle) {
    let Some(timers) = timers.upgrade() else {
        return;
    };
    let Ok(mut timers) = timers.try_borrow_mut() else {
        return;
    };
    let fired = timers.active.remove(&handle).map(|(_, closure)| closure);
    // drops the previously retired closure, which has returned by now
    timers.spent = fired;
}

impl Scheduler for WebScheduler {
    fn set_timeout(&mut self, delay_ms: u32, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle::new(self.next_handle);
        self.next_handle += 1;

        let timers = Rc::downgrade(&self.timers);
        let callback = Rc::clone(&self.callback);
        let fire: TimerClosure = Closure::new(move || {
            retire(&timers, handle);
            callback(handle, kind);
        });

        match dom::set_timeout(&self.window, fire.as_ref(), delay_ms) {
            Ok(id) => {
                self.timers.borrow_mut().active.insert(handle, (id, fire));
            }
            Err(err) => log::warn!("timer {} not scheduled: {err}", handle.raw()),
        }
        handle
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        let removed = self.timers.borrow_mut().active.remove(&handle);
        if let Some((id, closure)) = removed {
            self.window.clear_timeout_with_handle(id);
            drop(closure);
        }
    }
}

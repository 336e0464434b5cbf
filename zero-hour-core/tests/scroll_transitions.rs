use std::collections::BTreeMap;

use zero_hour_core::constants::CLASS_MODE_SCROLL;
use zero_hour_core::testing::{ManualClock, ManualScheduler, RecordingSurface, SurfaceOp};
use zero_hour_core::{Configuration, Countdown, NoQuery, SlotAddr, TimerKind, UnitGroup};

type TestCountdown = Countdown<ManualClock, ManualScheduler, RecordingSurface>;

fn scroll_countdown(transition_ms: Option<u32>) -> TestCountdown {
    let clock = ManualClock::new(0);
    let scheduler = ManualScheduler::new(clock.clone());
    let mut surface = RecordingSurface::new();
    surface.set_transition_ms(transition_ms);
    let attrs: BTreeMap<String, String> = [
        ("digits-url", "digits.png"),
        ("date", "1970-01-01"),
        ("time", "00:01:05"),
        ("mode", "Scroll "),
    ]
    .iter()
    .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
    .collect();
    let mut countdown = Countdown::new(clock, scheduler, surface);
    countdown.connect(Configuration::resolve(&attrs, &NoQuery));
    countdown
}

fn seconds_ones() -> SlotAddr {
    SlotAddr::new(UnitGroup::Seconds, 1)
}

#[test]
fn first_render_is_static_even_in_scroll_mode() {
    let countdown = scroll_countdown(None);
    assert!(countdown.surface().has_class(CLASS_MODE_SCROLL));
    assert_eq!(countdown.reconciler().pending_transitions(), 0);
    assert_eq!(countdown.surface().digits(UnitGroup::Seconds), "05");
    assert!(
        !countdown
            .surface()
            .ops()
            .iter()
            .any(|op| matches!(op, SurfaceOp::BeginScroll { .. }))
    );
}

#[test]
fn transition_end_wins_and_guard_becomes_no_op() {
    let mut countdown = scroll_countdown(Some(250));
    countdown.advance_by(1_000);

    let token = countdown.surface().last_scroll_token().unwrap();
    assert_eq!(token.slot, seconds_ones());
    assert_eq!(countdown.surface().incoming(token.slot), Some('4'));
    assert_eq!(countdown.surface().digits(UnitGroup::Seconds), "05");

    assert!(countdown.on_transition_end(token));
    assert_eq!(countdown.surface().digits(UnitGroup::Seconds), "04");
    assert!(!countdown.on_transition_end(token));
    assert_eq!(countdown.scheduler().pending_ticks(), 1);
    assert_eq!(countdown.scheduler().pending_count(), 1);
    assert_eq!(countdown.surface().finished_scrolls(), 1);
}

#[test]
fn guard_wins_when_transition_end_never_arrives() {
    let mut countdown = scroll_countdown(Some(250));
    countdown.advance_by(1_000);
    let token = countdown.surface().last_scroll_token().unwrap();

    assert_eq!(
        countdown.fire_next(),
        Some(TimerKind::TransitionGuard(token))
    );
    assert_eq!(countdown.clock().now(), 1_400);
    assert_eq!(countdown.surface().digits(UnitGroup::Seconds), "04");
    assert!(!countdown.on_transition_end(token));
    assert_eq!(countdown.surface().finished_scrolls(), 1);
}

#[test]
fn unknown_transition_time_uses_fallback_guard() {
    let mut countdown = scroll_countdown(None);
    countdown.advance_by(1_000);
    let (_, due, kind) = countdown.scheduler().next_due().unwrap();
    assert!(matches!(kind, TimerKind::TransitionGuard(_)));
    assert_eq!(due, 1_800);
}

#[test]
fn next_tick_finalises_a_stalled_transition_first() {
    let mut countdown = scroll_countdown(Some(2_000));
    countdown.advance_by(1_000);
    let stale = countdown.surface().last_scroll_token().unwrap();

    countdown.advance_by(1_000);
    assert_eq!(countdown.surface().finished_scrolls(), 1);
    let fresh = countdown.surface().last_scroll_token().unwrap();
    assert!(fresh.generation > stale.generation);
    assert_eq!(countdown.surface().incoming(fresh.slot), Some('3'));
    assert_eq!(countdown.surface().digits(UnitGroup::Seconds), "04");
    assert!(!countdown.on_transition_end(stale));
    assert_eq!(countdown.reconciler().pending_transitions(), 1);
}

#[test]
fn rolling_over_a_minute_animates_only_changed_slots() {
    let mut countdown = scroll_countdown(Some(100));
    countdown.advance_by(5_000);
    countdown.surface_mut().clear_ops();
    countdown.advance_by(1_000);

    let scrolled: Vec<SlotAddr> = countdown
        .surface()
        .ops()
        .iter()
        .filter_map(|op| match op {
            SurfaceOp::BeginScroll { token, .. } => Some(token.slot),
            _ => None,
        })
        .collect();
    assert_eq!(
        scrolled,
        vec![
            SlotAddr::new(UnitGroup::Minutes, 1),
            SlotAddr::new(UnitGroup::Seconds, 0),
            SlotAddr::new(UnitGroup::Seconds, 1),
        ]
    );
    assert_eq!(countdown.surface().slots_created(), 8);
    assert_eq!(countdown.surface().slots_removed(), 0);
}

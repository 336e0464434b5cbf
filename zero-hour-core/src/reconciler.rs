//! Incremental digit reconciliation.
//!
//! The reconciler keeps its own model of every slot the surface shows and
//! only issues operations for slots whose digit actually changed. In scroll
//! mode a change starts a transition that ends through exactly one of two
//! competing completion sources (the host's transition end or a guard
//! timer); both route into [`DigitReconciler::complete`], which acts only for
//! the current generation.

use crate::config::{Configuration, TransitionMode};
use crate::constants::{
    CLASS_MODE_SCROLL, CLASS_TEXT_FALLBACK, CLOCK_DIGITS, MIN_DAY_DIGITS, MIN_HOUR_DIGITS,
    PROP_DIGITS_URL, PROP_GROUPS, PROP_SEPARATOR_URL, SEPARATOR_SLOTS, TEXT_EMPTY, TEXT_FALLBACK,
    TEXT_SEPARATOR, TRANSITION_GUARD_FALLBACK_MS, TRANSITION_GUARD_SLACK_MS,
};
use crate::duration::DecomposedDuration;
use crate::surface::{CompletionSource, SlotAddr, Surface, TransitionToken};
use crate::units::{UnitGroup, UnitsMask};
use crate::{Scheduler, TimerHandle, TimerKind};

/// One displayed character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Glyph(pub char);

impl Glyph {
    #[must_use]
    pub const fn as_char(self) -> char {
        self.0
    }

    /// Column of this character in the digit sprite sheet. Anything that is
    /// not an ASCII digit maps to the first column.
    #[must_use]
    pub const fn sheet_index(self) -> u8 {
        match self.0.to_digit(10) {
            #[allow(clippy::cast_possible_truncation)] // a decimal digit fits
            Some(value) => value as u8,
            None => 0,
        }
    }
}

/// Zero padded characters for `value` with at least `min_digits` digits.
#[must_use]
pub fn digit_chars(value: u64, min_digits: usize) -> Vec<char> {
    format!("{value:0>min_digits$}").chars().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingScroll {
    generation: u64,
    next: char,
    guard: TimerHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SlotState {
    shown: char,
    pending: Option<PendingScroll>,
}

/// Model of the rendered digit grid.
#[derive(Debug, Clone, Default)]
pub struct DigitReconciler {
    groups: [Vec<SlotState>; 4],
    units: UnitsMask,
    mode: TransitionMode,
    rendered: bool,
    generation: u64,
    summary: String,
}

impl DigitReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn slot_count(&self, group: UnitGroup) -> usize {
        self.groups[group.index()].len()
    }

    /// The characters currently committed in `group`.
    #[must_use]
    pub fn digits(&self, group: UnitGroup) -> String {
        self.groups[group.index()]
            .iter()
            .map(|slot| slot.shown)
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[must_use]
    pub const fn mode(&self) -> TransitionMode {
        self.mode
    }

    #[must_use]
    pub fn pending_transitions(&self) -> usize {
        self.groups
            .iter()
            .flatten()
            .filter(|slot| slot.pending.is_some())
            .count()
    }

    /// Prepare a freshly mounted surface: an all-zero grid with no motion.
    /// The next render is treated as the first one and never animates.
    pub fn mount(&mut self, surface: &mut impl Surface, scheduler: &mut impl Scheduler) {
        self.render(&DecomposedDuration::ZERO, false, surface, scheduler);
        self.rendered = false;
    }

    /// Replace the digit grid's summary with the text-only fallback.
    pub fn show_fallback(&mut self, surface: &mut impl Surface) {
        TEXT_FALLBACK.clone_into(&mut self.summary);
        surface.set_class(CLASS_TEXT_FALLBACK, true);
        surface.set_summary(TEXT_FALLBACK);
    }

    /// Apply the rendering hints of a resolution pass: sprite references,
    /// unit and separator visibility and the transition-mode class.
    pub fn apply_configuration(&mut self, config: &Configuration, surface: &mut impl Surface) {
        self.units = config.units;
        self.mode = config.mode;
        surface.set_class(CLASS_TEXT_FALLBACK, false);

        if let Some(url) = config.digits_url.as_deref() {
            surface.set_style_property(PROP_DIGITS_URL, Some(&css_url(url)));
        }
        match config.separator_url.as_deref() {
            Some(url) => surface.set_style_property(PROP_SEPARATOR_URL, Some(&css_url(url))),
            None => surface.set_style_property(PROP_SEPARATOR_URL, None),
        }

        for group in UnitGroup::ALL {
            surface.set_group_visible(group, config.units.shows(group));
        }

        let separators = if config.has_separator() {
            let count = config.units.visible_count().to_string();
            surface.set_style_property(PROP_GROUPS, Some(&count));
            config.units.separators()
        } else {
            [false; SEPARATOR_SLOTS]
        };
        for (index, visible) in separators.into_iter().enumerate() {
            surface.set_separator_visible(index, visible);
        }

        surface.set_class(CLASS_MODE_SCROLL, self.mode == TransitionMode::Scroll);
    }

    /// Bring every group in line with `value`. Hidden groups are kept in
    /// sync as well so toggling visibility never shows stale digits.
    pub fn render(
        &mut self,
        value: &DecomposedDuration,
        animate: bool,
        surface: &mut impl Surface,
        scheduler: &mut impl Scheduler,
    ) {
        let animate = animate && self.rendered;
        let sequences = [
            digit_chars(value.days, MIN_DAY_DIGITS),
            digit_chars(u64::from(value.hours), MIN_HOUR_DIGITS),
            digit_chars(u64::from(value.minutes), CLOCK_DIGITS),
            digit_chars(u64::from(value.seconds), CLOCK_DIGITS),
        ];

        for (group, chars) in UnitGroup::ALL.into_iter().zip(&sequences) {
            self.sync_group(group, chars, animate, surface, scheduler);
        }

        let parts: Vec<String> = self
            .units
            .visible_groups()
            .map(|group| sequences[group.index()].iter().collect())
            .collect();
        self.summary = if parts.is_empty() {
            TEXT_EMPTY.to_string()
        } else {
            parts.join(TEXT_SEPARATOR)
        };
        surface.set_summary(&self.summary);
        self.rendered = true;
    }

    /// Finish the transition identified by `token`. Returns false when the
    /// token is stale: the transition was already completed by the other
    /// source, superseded, or its slot no longer exists.
    pub fn complete(
        &mut self,
        token: TransitionToken,
        source: CompletionSource,
        surface: &mut impl Surface,
        scheduler: &mut impl Scheduler,
    ) -> bool {
        let mode = self.mode;
        let Some(slot) = self.groups[token.slot.group.index()].get_mut(token.slot.index) else {
            return false;
        };
        let current = slot
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == token.generation);
        if !current {
            return false;
        }
        let Some(pending) = slot.pending.take() else {
            return false;
        };
        if source != CompletionSource::GuardTimeout {
            scheduler.clear_timeout(pending.guard);
        }
        slot.shown = pending.next;
        surface.finish_scroll(token.slot, mode);
        log::trace!("scroll on {:?} settled via {source:?}", token.slot);
        true
    }

    /// Finish every pending transition at once, e.g. before unmounting.
    pub fn settle(&mut self, surface: &mut impl Surface, scheduler: &mut impl Scheduler) {
        let tokens: Vec<TransitionToken> = UnitGroup::ALL
            .into_iter()
            .flat_map(|group| {
                self.groups[group.index()]
                    .iter()
                    .enumerate()
                    .filter_map(move |(index, slot)| {
                        slot.pending.as_ref().map(|pending| TransitionToken {
                            slot: SlotAddr::new(group, index),
                            generation: pending.generation,
                        })
                    })
            })
            .collect();
        for token in tokens {
            self.complete(token, CompletionSource::Superseded, surface, scheduler);
        }
    }

    fn sync_group(
        &mut self,
        group: UnitGroup,
        chars: &[char],
        animate: bool,
        surface: &mut impl Surface,
        scheduler: &mut impl Scheduler,
    ) {
        let slots = &mut self.groups[group.index()];
        while slots.len() < chars.len() {
            let ch = chars[slots.len()];
            slots.push(SlotState {
                shown: ch,
                pending: None,
            });
            surface.push_slot(group, Glyph(ch));
        }
        while slots.len() > chars.len() {
            if let Some(pending) = slots.pop().and_then(|slot| slot.pending) {
                scheduler.clear_timeout(pending.guard);
            }
            surface.pop_slot(group);
        }

        for (index, &ch) in chars.iter().enumerate() {
            self.sync_slot(SlotAddr::new(group, index), ch, animate, surface, scheduler);
        }
    }

    fn sync_slot(
        &mut self,
        addr: SlotAddr,
        ch: char,
        animate: bool,
        surface: &mut impl Surface,
        scheduler: &mut impl Scheduler,
    ) {
        let pending_generation = self.groups[addr.group.index()][addr.index]
            .pending
            .as_ref()
            .map(|pending| pending.generation);
        if let Some(generation) = pending_generation {
            let token = TransitionToken {
                slot: addr,
                generation,
            };
            self.complete(token, CompletionSource::Superseded, surface, scheduler);
        }

        let mode = self.mode;
        let slot = &mut self.groups[addr.group.index()][addr.index];
        if slot.shown == ch {
            return;
        }
        if !animate || mode != TransitionMode::Scroll {
            slot.shown = ch;
            surface.set_digit(addr, Glyph(ch));
            return;
        }

        self.generation += 1;
        let token = TransitionToken {
            slot: addr,
            generation: self.generation,
        };
        let guard_ms = surface
            .begin_scroll(token, Glyph(ch))
            .map_or(TRANSITION_GUARD_FALLBACK_MS, |ms| {
                ms.saturating_add(TRANSITION_GUARD_SLACK_MS)
            });
        let guard = scheduler.set_timeout(guard_ms, TimerKind::TransitionGuard(token));
        self.groups[addr.group.index()][addr.index].pending = Some(PendingScroll {
            generation: token.generation,
            next: ch,
            guard,
        });
    }
}

fn css_url(url: &str) -> String {
    format!("url(\"{url}\")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose;
    use crate::testing::{ManualClock, ManualScheduler, RecordingSurface, SurfaceOp};

    fn harness() -> (DigitReconciler, RecordingSurface, ManualScheduler) {
        let scheduler = ManualScheduler::new(ManualClock::new(0));
        (DigitReconciler::new(), RecordingSurface::new(), scheduler)
    }

    fn config(mode: TransitionMode) -> Configuration {
        Configuration {
            digits_url: Some(String::from("digits.png")),
            separator_url: Some(String::from("sep.png")),
            mode,
            ..Configuration::default()
        }
    }

    fn seconds(total: u64) -> DecomposedDuration {
        decompose(total * 1_000)
    }

    #[test]
    fn sheet_index_maps_digits_and_defaults_others() {
        assert_eq!(Glyph('0').sheet_index(), 0);
        assert_eq!(Glyph('7').sheet_index(), 7);
        assert_eq!(Glyph('-').sheet_index(), 0);
    }

    #[test]
    fn digit_chars_pad_but_never_truncate() {
        assert_eq!(digit_chars(5, 2), vec!['0', '5']);
        assert_eq!(digit_chars(123, 2), vec!['1', '2', '3']);
    }

    #[test]
    fn mount_builds_two_slots_per_group() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.mount(&mut surface, &mut scheduler);
        for group in UnitGroup::ALL {
            assert_eq!(reconciler.slot_count(group), 2);
            assert_eq!(surface.digits(group), "00");
        }
        assert_eq!(surface.summary(), "00:00:00:00");
    }

    #[test]
    fn unchanged_slots_are_not_touched() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(65), true, &mut surface, &mut scheduler);
        surface.clear_ops();
        reconciler.render(&seconds(64), true, &mut surface, &mut scheduler);
        let digit_ops: Vec<&SurfaceOp> = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, SurfaceOp::SetDigit { .. }))
            .collect();
        assert_eq!(
            digit_ops,
            vec![&SurfaceOp::SetDigit {
                slot: SlotAddr::new(UnitGroup::Seconds, 1),
                glyph: Glyph('4'),
            }]
        );
    }

    #[test]
    fn days_group_widens_and_narrows() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(100 * 86_400), true, &mut surface, &mut scheduler);
        assert_eq!(reconciler.slot_count(UnitGroup::Days), 3);
        assert_eq!(surface.digits(UnitGroup::Days), "100");
        reconciler.render(&seconds(99 * 86_400), true, &mut surface, &mut scheduler);
        assert_eq!(reconciler.slot_count(UnitGroup::Days), 2);
        assert_eq!(surface.digits(UnitGroup::Days), "99");
    }

    #[test]
    fn visibility_follows_mask_and_separator_asset() {
        let (mut reconciler, mut surface, _) = harness();
        let mut cfg = config(TransitionMode::Static);
        cfg.units = crate::parse_units(Some("h:s"));
        reconciler.apply_configuration(&cfg, &mut surface);
        assert_eq!(surface.group_visibility(), [false, true, false, true]);
        assert_eq!(surface.separator_visibility(), [false, false, true]);
        assert_eq!(surface.property(PROP_GROUPS), Some("2"));
        assert_eq!(
            surface.property(PROP_SEPARATOR_URL),
            Some("url(\"sep.png\")")
        );

        cfg.separator_url = None;
        reconciler.apply_configuration(&cfg, &mut surface);
        assert_eq!(surface.separator_visibility(), [false, false, false]);
        assert_eq!(surface.property(PROP_SEPARATOR_URL), None);
    }

    #[test]
    fn summary_lists_only_visible_units() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        let mut cfg = config(TransitionMode::Static);
        cfg.units = crate::parse_units(Some("h:m"));
        reconciler.apply_configuration(&cfg, &mut surface);
        reconciler.render(&seconds(3_723), false, &mut surface, &mut scheduler);
        assert_eq!(reconciler.summary(), "01:02");
        assert_eq!(surface.summary(), "01:02");
    }

    #[test]
    fn first_render_after_mount_never_animates() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.apply_configuration(&config(TransitionMode::Scroll), &mut surface);
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(5), true, &mut surface, &mut scheduler);
        assert_eq!(reconciler.pending_transitions(), 0);
        assert_eq!(surface.digits(UnitGroup::Seconds), "05");
    }

    #[test]
    fn scroll_change_completes_once_from_either_source() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.apply_configuration(&config(TransitionMode::Scroll), &mut surface);
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(5), true, &mut surface, &mut scheduler);
        reconciler.render(&seconds(4), true, &mut surface, &mut scheduler);

        assert_eq!(reconciler.pending_transitions(), 1);
        assert_eq!(scheduler.pending_count(), 1);
        let token = surface.last_scroll_token().unwrap();
        assert_eq!(surface.incoming(token.slot), Some('4'));

        assert!(reconciler.complete(
            token,
            CompletionSource::TransitionEnd,
            &mut surface,
            &mut scheduler
        ));
        assert!(!reconciler.complete(
            token,
            CompletionSource::GuardTimeout,
            &mut surface,
            &mut scheduler
        ));
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(surface.digits(UnitGroup::Seconds), "04");
        assert_eq!(surface.incoming(token.slot), None);
        assert_eq!(surface.finished_scrolls(), 1);
    }

    #[test]
    fn guard_uses_reported_transition_time() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        surface.set_transition_ms(Some(300));
        reconciler.apply_configuration(&config(TransitionMode::Scroll), &mut surface);
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(5), true, &mut surface, &mut scheduler);
        reconciler.render(&seconds(4), true, &mut surface, &mut scheduler);
        let (_, due, _) = scheduler.next_due().unwrap();
        assert_eq!(due, 450);

        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.apply_configuration(&config(TransitionMode::Scroll), &mut surface);
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(5), true, &mut surface, &mut scheduler);
        reconciler.render(&seconds(4), true, &mut surface, &mut scheduler);
        let (_, due, _) = scheduler.next_due().unwrap();
        assert_eq!(due, 800);
    }

    #[test]
    fn new_change_supersedes_pending_transition() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.apply_configuration(&config(TransitionMode::Scroll), &mut surface);
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(5), true, &mut surface, &mut scheduler);
        reconciler.render(&seconds(4), true, &mut surface, &mut scheduler);
        let stale = surface.last_scroll_token().unwrap();
        reconciler.render(&seconds(3), true, &mut surface, &mut scheduler);

        assert_eq!(reconciler.pending_transitions(), 1);
        assert_eq!(scheduler.pending_count(), 1);
        assert!(!reconciler.complete(
            stale,
            CompletionSource::TransitionEnd,
            &mut surface,
            &mut scheduler
        ));
        let fresh = surface.last_scroll_token().unwrap();
        assert!(fresh.generation > stale.generation);
        assert_eq!(surface.incoming(fresh.slot), Some('3'));
    }

    #[test]
    fn static_mode_updates_in_place() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.apply_configuration(&config(TransitionMode::Static), &mut surface);
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(5), true, &mut surface, &mut scheduler);
        reconciler.render(&seconds(4), true, &mut surface, &mut scheduler);
        assert_eq!(reconciler.pending_transitions(), 0);
        assert_eq!(scheduler.pending_count(), 0);
        assert!(!surface.has_class(CLASS_MODE_SCROLL));
    }

    #[test]
    fn settle_finishes_everything_pending() {
        let (mut reconciler, mut surface, mut scheduler) = harness();
        reconciler.apply_configuration(&config(TransitionMode::Scroll), &mut surface);
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&seconds(59), true, &mut surface, &mut scheduler);
        reconciler.render(&seconds(60), true, &mut surface, &mut scheduler);
        assert_eq!(reconciler.pending_transitions(), 3);
        reconciler.settle(&mut surface, &mut scheduler);
        assert_eq!(reconciler.pending_transitions(), 0);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(surface.digits(UnitGroup::Minutes), "01");
        assert_eq!(surface.digits(UnitGroup::Seconds), "00");
    }

    #[test]
    fn fallback_replaces_summary() {
        let (mut reconciler, mut surface, _) = harness();
        reconciler.show_fallback(&mut surface);
        assert_eq!(surface.summary(), TEXT_FALLBACK);
        assert_eq!(reconciler.summary(), TEXT_FALLBACK);
        assert!(surface.has_class(CLASS_TEXT_FALLBACK));
        reconciler.apply_configuration(&config(TransitionMode::Static), &mut surface);
        assert!(!surface.has_class(CLASS_TEXT_FALLBACK));
    }
}

//! Text rendering of the countdown for a terminal.

use std::collections::BTreeMap;

use colored::Colorize;
use zero_hour_core::constants::{CLASS_TEXT_FALLBACK, TEXT_SEPARATOR};
use zero_hour_core::{Glyph, SlotAddr, Surface, TransitionMode, TransitionToken, UnitGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DigitCell {
    shown: char,
    incoming: Option<char>,
}

/// A [`Surface`] that keeps the digit grid in memory and renders it as a
/// single line.
///
/// Every scroll is queued for [`TerminalSurface::take_ended`] as soon as
/// it begins.
#[derive(Debug, Clone)]
pub struct TerminalSurface {
    groups: [Vec<DigitCell>; 4],
    group_visible: [bool; 4],
    separator_visible: [bool; 3],
    properties: BTreeMap<String, String>,
    text_only: bool,
    summary: String,
    ended: Vec<TransitionToken>,
    dirty: bool,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self {
            groups: Default::default(),
            group_visible: [true; 4],
            separator_visible: [true; 3],
            properties: BTreeMap::new(),
            text_only: false,
            summary: String::new(),
            ended: Vec::new(),
            dirty: true,
        }
    }
}

impl TerminalSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scrolls started since the last call. A terminal has nothing to
    /// animate, so the caller ends them right away.
    pub fn take_ended(&mut self) -> Vec<TransitionToken> {
        std::mem::take(&mut self.ended)
    }

    /// Whether anything visible changed since the last call.
    pub const fn take_dirty(&mut self) -> bool {
        let dirty = self.dirty;
        self.dirty = false;
        dirty
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Render the visible groups. Separators are drawn only where the
    /// widget would show a separator image; elsewhere groups are spaced.
    #[must_use]
    pub fn render_line(&self) -> String {
        if self.text_only {
            return self.summary.clone();
        }
        let mut line = String::new();
        let mut previous: Option<UnitGroup> = None;
        for group in UnitGroup::ALL {
            if !self.group_visible[group.index()] {
                continue;
            }
            if previous.is_some() {
                let slot = group.index().saturating_sub(1).min(2);
                if self.separator_visible[slot] {
                    line.push_str(&TEXT_SEPARATOR.dimmed().to_string());
                } else {
                    line.push(' ');
                }
            }
            for cell in &self.groups[group.index()] {
                let ch = cell.shown.to_string();
                if cell.incoming.is_some() {
                    line.push_str(&ch.yellow().to_string());
                } else {
                    line.push_str(&ch.bright_green().bold().to_string());
                }
            }
            previous = Some(group);
        }
        line
    }

    fn cell_mut(&mut self, slot: SlotAddr) -> Option<&mut DigitCell> {
        self.groups[slot.group.index()].get_mut(slot.index)
    }
}

impl Surface for TerminalSurface {
    fn set_style_property(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(value) => self.properties.insert(name.to_string(), value.to_string()),
            None => self.properties.remove(name),
        };
    }

    fn set_class(&mut self, class: &str, enabled: bool) {
        if class == CLASS_TEXT_FALLBACK {
            self.text_only = enabled;
            self.dirty = true;
        }
    }

    fn set_group_visible(&mut self, group: UnitGroup, visible: bool) {
        self.group_visible[group.index()] = visible;
        self.dirty = true;
    }

    fn set_separator_visible(&mut self, index: usize, visible: bool) {
        if let Some(flag) = self.separator_visible.get_mut(index) {
            *flag = visible;
            self.dirty = true;
        }
    }

    fn set_summary(&mut self, text: &str) {
        if self.summary != text {
            text.clone_into(&mut self.summary);
            self.dirty = true;
        }
    }

    fn push_slot(&mut self, group: UnitGroup, glyph: Glyph) {
        self.groups[group.index()].push(DigitCell {
            shown: glyph.as_char(),
            incoming: None,
        });
        self.dirty = true;
    }

    fn pop_slot(&mut self, group: UnitGroup) {
        self.groups[group.index()].pop();
        self.dirty = true;
    }

    fn set_digit(&mut self, slot: SlotAddr, glyph: Glyph) {
        if let Some(cell) = self.cell_mut(slot) {
            cell.shown = glyph.as_char();
            self.dirty = true;
        }
    }

    fn begin_scroll(&mut self, token: TransitionToken, next: Glyph) -> Option<u32> {
        if let Some(cell) = self.cell_mut(token.slot) {
            cell.incoming = Some(next.as_char());
        }
        self.ended.push(token);
        Some(0)
    }

    fn finish_scroll(&mut self, slot: SlotAddr, _mode: TransitionMode) {
        if let Some(cell) = self.cell_mut(slot)
            && let Some(next) = cell.incoming.take()
        {
            cell.shown = next;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zero_hour_core::testing::{ManualClock, ManualScheduler};
    use zero_hour_core::{DigitReconciler, decompose};

    #[test]
    fn renders_visible_groups_with_separators() {
        colored::control::set_override(false);
        let mut surface = TerminalSurface::new();
        let mut scheduler = ManualScheduler::new(ManualClock::new(0));
        let mut reconciler = DigitReconciler::new();
        reconciler.mount(&mut surface, &mut scheduler);
        reconciler.render(&decompose(93_784_000), false, &mut surface, &mut scheduler);
        assert_eq!(surface.render_line(), "01:02:03:04");

        surface.set_group_visible(UnitGroup::Days, false);
        surface.set_separator_visible(0, false);
        surface.set_separator_visible(1, false);
        assert_eq!(surface.render_line(), "02 03:04");
    }

    #[test]
    fn text_fallback_replaces_the_grid() {
        colored::control::set_override(false);
        let mut surface = TerminalSurface::new();
        let mut reconciler = DigitReconciler::new();
        reconciler.show_fallback(&mut surface);
        assert_eq!(surface.render_line(), zero_hour_core::constants::TEXT_FALLBACK);
    }

    #[test]
    fn scrolls_are_reported_as_ended_immediately() {
        let mut surface = TerminalSurface::new();
        surface.push_slot(UnitGroup::Seconds, Glyph('5'));
        let token = TransitionToken {
            slot: SlotAddr::new(UnitGroup::Seconds, 0),
            generation: 1,
        };
        assert_eq!(surface.begin_scroll(token, Glyph('4')), Some(0));
        assert_eq!(surface.take_ended(), vec![token]);
        assert!(surface.take_ended().is_empty());
        surface.finish_scroll(token.slot, TransitionMode::Scroll);
        assert!(surface.take_dirty());
        assert!(!surface.take_dirty());
    }
}

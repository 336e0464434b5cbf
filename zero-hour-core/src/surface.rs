//! The rendering surface the reconciler drives.
//!
//! A surface owns the actual visual tree (shadow DOM, terminal, test
//! recorder). The reconciler only ever issues incremental operations, so a
//! surface never needs to rebuild unaffected slots.

use crate::config::TransitionMode;
use crate::reconciler::Glyph;
use crate::units::UnitGroup;

/// Address of one digit slot inside its unit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAddr {
    pub group: UnitGroup,
    pub index: usize,
}

impl SlotAddr {
    #[must_use]
    pub const fn new(group: UnitGroup, index: usize) -> Self {
        Self { group, index }
    }
}

/// Identifies one scroll transition on one slot. A newer transition on the
/// same slot carries a higher generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionToken {
    pub slot: SlotAddr,
    pub generation: u64,
}

/// Which signal ended a scroll transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    /// The host reported the end of the visual transition.
    TransitionEnd,
    /// The guard timer expired first.
    GuardTimeout,
    /// A newer digit arrived before either signal.
    Superseded,
}

pub trait Surface {
    /// Set (`Some`) or remove (`None`) a custom style property on the root.
    fn set_style_property(&mut self, name: &str, value: Option<&str>);

    fn set_class(&mut self, class: &str, enabled: bool);

    fn set_group_visible(&mut self, group: UnitGroup, visible: bool);

    fn set_separator_visible(&mut self, index: usize, visible: bool);

    /// Replace the plain-text summary kept for assistive technology.
    fn set_summary(&mut self, text: &str);

    /// Append a slot showing `glyph` to the end of `group`.
    fn push_slot(&mut self, group: UnitGroup, glyph: Glyph);

    /// Remove the last slot of `group`.
    fn pop_slot(&mut self, group: UnitGroup);

    /// Show `glyph` in place, without motion.
    fn set_digit(&mut self, slot: SlotAddr, glyph: Glyph);

    /// Start sliding `next` into the slot above the current face.
    ///
    /// Returns the transition time in milliseconds when the surface knows
    /// it. The host should report the end of the motion through
    /// [`Countdown::on_transition_end`](crate::Countdown::on_transition_end)
    /// with the same token.
    fn begin_scroll(&mut self, token: TransitionToken, next: Glyph) -> Option<u32>;

    /// Drop the outgoing face and reset motion state after a scroll.
    fn finish_scroll(&mut self, slot: SlotAddr, mode: TransitionMode);
}

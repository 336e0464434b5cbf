//! Unit groups and the visibility mask that selects among them.

use crate::constants::SEPARATOR_SLOTS;

/// One of the four displayed unit groups, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitGroup {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl UnitGroup {
    pub const ALL: [Self; 4] = [Self::Days, Self::Hours, Self::Minutes, Self::Seconds];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Days => 0,
            Self::Hours => 1,
            Self::Minutes => 2,
            Self::Seconds => 3,
        }
    }

    #[must_use]
    pub const fn token(self) -> char {
        match self {
            Self::Days => 'd',
            Self::Hours => 'h',
            Self::Minutes => 'm',
            Self::Seconds => 's',
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Hours => "hours",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        }
    }
}

/// Which unit groups are displayed. Never empty once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitsMask {
    pub days: bool,
    pub hours: bool,
    pub minutes: bool,
    pub seconds: bool,
}

impl Default for UnitsMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl UnitsMask {
    pub const ALL: Self = Self {
        days: true,
        hours: true,
        minutes: true,
        seconds: true,
    };

    pub const NONE: Self = Self {
        days: false,
        hours: false,
        minutes: false,
        seconds: false,
    };

    #[must_use]
    pub const fn shows(self, group: UnitGroup) -> bool {
        match group {
            UnitGroup::Days => self.days,
            UnitGroup::Hours => self.hours,
            UnitGroup::Minutes => self.minutes,
            UnitGroup::Seconds => self.seconds,
        }
    }

    pub const fn set(&mut self, group: UnitGroup, visible: bool) {
        match group {
            UnitGroup::Days => self.days = visible,
            UnitGroup::Hours => self.hours = visible,
            UnitGroup::Minutes => self.minutes = visible,
            UnitGroup::Seconds => self.seconds = visible,
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.days || self.hours || self.minutes || self.seconds)
    }

    pub fn visible_groups(self) -> impl Iterator<Item = UnitGroup> {
        UnitGroup::ALL
            .into_iter()
            .filter(move |group| self.shows(*group))
    }

    #[must_use]
    pub fn visible_count(self) -> usize {
        self.visible_groups().count()
    }

    /// Separator slots that sit between two consecutive visible groups.
    ///
    /// The separator in front of the right-hand group is used, with its
    /// index clamped into the fixed separator slots.
    #[must_use]
    pub fn separators(self) -> [bool; SEPARATOR_SLOTS] {
        let mut used = [false; SEPARATOR_SLOTS];
        let visible: Vec<usize> = self.visible_groups().map(UnitGroup::index).collect();
        for pair in visible.windows(2) {
            let slot = pair[1].saturating_sub(1).min(SEPARATOR_SLOTS - 1);
            used[slot] = true;
        }
        used
    }
}

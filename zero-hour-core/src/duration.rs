//! Fixed-radix breakdown of a remaining duration.
//!
//! Days are always 24 hours, hours 60 minutes and minutes 60 seconds; there
//! is no calendar awareness here.

use crate::constants::{HOURS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};

/// A duration split into display units.
///
/// `days * 86400 + hours * 3600 + minutes * 60 + seconds == total_seconds`
/// always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecomposedDuration {
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub total_seconds: u64,
}

impl DecomposedDuration {
    pub const ZERO: Self = Self {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
        total_seconds: 0,
    };

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.total_seconds == 0
    }
}

/// Split `ms` into days, hours, minutes and seconds. Sub-second remainders
/// are floored away.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // remainders are below their radix
pub const fn decompose(ms: u64) -> DecomposedDuration {
    let total_seconds = ms / 1_000;
    let total_hours = total_seconds / SECONDS_PER_HOUR;

    DecomposedDuration {
        days: total_hours / HOURS_PER_DAY,
        hours: (total_hours % HOURS_PER_DAY) as u8,
        minutes: ((total_seconds / SECONDS_PER_MINUTE) % 60) as u8,
        seconds: (total_seconds % SECONDS_PER_MINUTE) as u8,
        total_seconds,
    }
}

//! Absolute instants built from calendar fields and a fixed UTC offset.
//!
//! Only a fixed offset model is supported: there is no timezone database and
//! no daylight-saving awareness. Fields outside their natural range roll over
//! into the next larger field, so `2024-01-32` is the first of February.

use chrono::NaiveDate;

use crate::constants::{MS_PER_MINUTE, MS_PER_SECOND};

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

/// A point in time, in UTC milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(i64);

impl Instant {
    #[must_use]
    pub const fn from_epoch_ms(ms: i64) -> Self {
        Self(ms)
    }

    #[must_use]
    pub const fn epoch_ms(self) -> i64 {
        self.0
    }

    /// Milliseconds remaining from `now_ms` until this instant. Negative once
    /// the instant has passed.
    #[must_use]
    pub const fn millis_from(self, now_ms: i64) -> i64 {
        self.0.saturating_sub(now_ms)
    }

    /// Build the instant at which a wall clock running at `offset` shows
    /// `date` and `time`.
    ///
    /// Returns `None` when the fields overflow the representable range.
    #[must_use]
    pub fn from_civil(date: CalendarDate, time: TimeOfDay, offset: UtcOffset) -> Option<Self> {
        let utc_ms = civil_to_epoch_ms(date, time)?;
        let offset_ms = offset.minutes().checked_mul(MS_PER_MINUTE)?;
        utc_ms.checked_sub(offset_ms).map(Self)
    }
}

/// A calendar date as written, before any rollover is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    #[must_use]
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }
}

/// Time of day; components are not range checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeOfDay {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    #[must_use]
    pub const fn new(hours: i64, minutes: i64, seconds: i64) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    fn as_millis(self) -> Option<i64> {
        let hours = self.hours.checked_mul(MS_PER_HOUR)?;
        let minutes = self.minutes.checked_mul(MS_PER_MINUTE)?;
        let seconds = self.seconds.checked_mul(MS_PER_SECOND)?;
        hours.checked_add(minutes)?.checked_add(seconds)
    }
}

/// Signed offset from UTC in minutes. Positive offsets are east of Greenwich.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UtcOffset(i64);

impl UtcOffset {
    pub const UTC: Self = Self(0);

    #[must_use]
    pub const fn from_minutes(minutes: i64) -> Self {
        Self(minutes)
    }

    #[must_use]
    pub const fn minutes(self) -> i64 {
        self.0
    }
}

fn civil_to_epoch_ms(date: CalendarDate, time: TimeOfDay) -> Option<i64> {
    // Month is 1-based as written; "00" rolls back into the previous year.
    let month_index = i64::from(date.month) - 1;
    let year = i64::from(date.year).checked_add(month_index.div_euclid(12))?;
    let month = u32::try_from(month_index.rem_euclid(12) + 1).ok()?;
    let year = i32::try_from(year).ok()?;

    let month_start = NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)?
        .and_utc()
        .timestamp_millis();
    let day_offset = (i64::from(date.day) - 1).checked_mul(MS_PER_DAY)?;

    month_start
        .checked_add(day_offset)?
        .checked_add(time.as_millis()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midnight_utc_matches_known_epoch() {
        let instant = Instant::from_civil(
            CalendarDate::new(2030, 6, 15),
            TimeOfDay::MIDNIGHT,
            UtcOffset::UTC,
        )
        .unwrap();
        assert_eq!(instant.epoch_ms(), 1_907_712_000_000);
    }

    #[test]
    fn positive_offset_moves_instant_earlier() {
        let utc = Instant::from_civil(
            CalendarDate::new(2030, 1, 1),
            TimeOfDay::new(12, 0, 0),
            UtcOffset::UTC,
        )
        .unwrap();
        let plus_two = Instant::from_civil(
            CalendarDate::new(2030, 1, 1),
            TimeOfDay::new(12, 0, 0),
            UtcOffset::from_minutes(120),
        )
        .unwrap();
        assert_eq!(utc.epoch_ms() - plus_two.epoch_ms(), 2 * 60 * 60 * 1000);
    }

    #[test]
    fn out_of_range_fields_roll_over() {
        let rolled = Instant::from_civil(
            CalendarDate::new(2024, 13, 32),
            TimeOfDay::new(25, 0, 0),
            UtcOffset::UTC,
        )
        .unwrap();
        let expected = Instant::from_civil(
            CalendarDate::new(2025, 2, 2),
            TimeOfDay::new(1, 0, 0),
            UtcOffset::UTC,
        )
        .unwrap();
        assert_eq!(rolled, expected);

        let month_zero = Instant::from_civil(
            CalendarDate::new(2024, 0, 1),
            TimeOfDay::MIDNIGHT,
            UtcOffset::UTC,
        )
        .unwrap();
        let december = Instant::from_civil(
            CalendarDate::new(2023, 12, 1),
            TimeOfDay::MIDNIGHT,
            UtcOffset::UTC,
        )
        .unwrap();
        assert_eq!(month_zero, december);
    }

    #[test]
    fn millis_from_goes_negative_after_the_instant() {
        let instant = Instant::from_epoch_ms(10_000);
        assert_eq!(instant.millis_from(4_000), 6_000);
        assert_eq!(instant.millis_from(12_500), -2_500);
    }
}

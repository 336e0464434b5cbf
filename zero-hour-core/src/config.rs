//! Configuration resolution from declarative attributes and query overrides.
//!
//! Every field is resolved independently: a valid query override wins, then
//! the attribute, then the built-in default. Nothing here fails outright;
//! malformed input is logged and degrades to the next source.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::constants::{
    ATTR_AUTOSTART, ATTR_DATE, ATTR_DIGITS_URL, ATTR_MODE, ATTR_SEPARATOR_URL, ATTR_TIME,
    ATTR_UNITS, ATTR_UTC, QUERY_DATE, QUERY_TIME, QUERY_UNITS, QUERY_UTC,
};
use crate::instant::{CalendarDate, Instant, TimeOfDay, UtcOffset};
use crate::numbers::{parse_loose_number, trunc_f64_to_i64};
use crate::units::{UnitGroup, UnitsMask};
use crate::{AttributeSource, QuerySource};

static DATE_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").ok());

static STRICT_TIME_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").ok());

/// Errors raised while parsing a single configuration value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("date {0:?} is not in YYYY-MM-DD form")]
    MalformedDate(String),
    #[error("time {0:?} is not in H[H]:MM[:SS] form")]
    MalformedTime(String),
    #[error("{field} {value} is outside 0..={max}")]
    TimeOutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("utc offset {0:?} is not in [utc][+/-]H[:MM] form")]
    MalformedOffset(String),
}

/// How a digit change is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionMode {
    #[default]
    Static,
    Scroll,
}

impl TransitionMode {
    /// Anything other than `scroll` (case-insensitive) is static.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if value == "scroll" => Self::Scroll,
            _ => Self::Static,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Scroll => "scroll",
        }
    }
}

/// Query-string values that may override attributes. Blank values are
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOverrides {
    pub date: Option<String>,
    pub time: Option<String>,
    pub utc: Option<String>,
    pub units: Option<String>,
}

impl QueryOverrides {
    pub fn read<Q: QuerySource + ?Sized>(source: &Q) -> Self {
        let get = |key: &str| {
            source
                .query_param(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            date: get(QUERY_DATE),
            time: get(QUERY_TIME),
            utc: get(QUERY_UTC),
            units: get(QUERY_UNITS),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none() && self.utc.is_none() && self.units.is_none()
    }
}

/// Fully resolved widget configuration. Rebuilt on every resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub target: Option<Instant>,
    pub units: UnitsMask,
    pub autostart: bool,
    pub digits_url: Option<String>,
    pub separator_url: Option<String>,
    pub mode: TransitionMode,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            target: None,
            units: UnitsMask::ALL,
            autostart: true,
            digits_url: None,
            separator_url: None,
            mode: TransitionMode::Static,
        }
    }
}

impl Configuration {
    /// Resolve a configuration from element attributes and query overrides.
    pub fn resolve<A, Q>(attributes: &A, query: &Q) -> Self
    where
        A: AttributeSource + ?Sized,
        Q: QuerySource + ?Sized,
    {
        let overrides = QueryOverrides::read(query);
        Self::resolve_with(attributes, &overrides)
    }

    /// Resolve against already extracted overrides.
    pub fn resolve_with<A: AttributeSource + ?Sized>(
        attributes: &A,
        overrides: &QueryOverrides,
    ) -> Self {
        let attr = |name: &str| attributes.attribute(name);

        let units_raw = overrides.units.clone().or_else(|| attr(ATTR_UNITS));
        let units = parse_units(units_raw.as_deref());

        let date = pick(
            overrides.date.as_deref().map(parse_ymd_date),
            attr(ATTR_DATE).as_deref().map(parse_ymd_date),
            "date",
        );
        let time = overrides
            .time
            .as_deref()
            .map(parse_time_strict)
            .and_then(|parsed| log_fallback(parsed, "query time"))
            .unwrap_or_else(|| parse_time_lenient(attr(ATTR_TIME).as_deref()));
        let offset = pick(
            overrides.utc.as_deref().map(parse_utc_offset),
            attr(ATTR_UTC).as_deref().map(parse_utc_offset),
            "utc",
        )
        .unwrap_or(UtcOffset::UTC);

        let target = date.and_then(|date| Instant::from_civil(date, time, offset));

        let config = Self {
            target,
            units,
            autostart: parse_bool_attribute(attr(ATTR_AUTOSTART).as_deref(), true),
            digits_url: non_empty(attr(ATTR_DIGITS_URL)),
            separator_url: non_empty(attr(ATTR_SEPARATOR_URL)),
            mode: TransitionMode::parse(attr(ATTR_MODE).as_deref()),
        };
        log::debug!(
            "resolved countdown config: target={:?} units={:?} autostart={} mode={} digits={}",
            config.target.map(Instant::epoch_ms),
            config.units,
            config.autostart,
            config.mode.as_str(),
            config.digits_url.is_some(),
        );
        config
    }

    #[must_use]
    pub const fn has_digits(&self) -> bool {
        self.digits_url.is_some()
    }

    #[must_use]
    pub const fn has_separator(&self) -> bool {
        self.separator_url.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn log_fallback<T>(parsed: Result<T, ConfigError>, what: &str) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("ignoring {what}: {err}");
            None
        }
    }
}

fn pick<T>(
    query: Option<Result<T, ConfigError>>,
    attribute: Option<Result<T, ConfigError>>,
    field: &str,
) -> Option<T> {
    query
        .and_then(|parsed| log_fallback(parsed, &format!("query {field}")))
        .or_else(|| {
            attribute.and_then(|parsed| log_fallback(parsed, &format!("{field} attribute")))
        })
}

/// Parse a strict `YYYY-MM-DD` date. Field ranges are not checked; the
/// instant construction rolls them over.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedDate`] when the value does not match the pattern.
pub fn parse_ymd_date(raw: &str) -> Result<CalendarDate, ConfigError> {
    let malformed = || ConfigError::MalformedDate(raw.to_string());
    let caps = DATE_PATTERN
        .as_ref()
        .and_then(|re| re.captures(raw.trim()))
        .ok_or_else(malformed)?;
    let field = |index: usize| caps.get(index).map(|m| m.as_str()).ok_or_else(malformed);
    let year = field(1)?.parse::<i32>().map_err(|_| malformed())?;
    let month = field(2)?.parse::<u32>().map_err(|_| malformed())?;
    let day = field(3)?.parse::<u32>().map_err(|_| malformed())?;
    Ok(CalendarDate::new(year, month, day))
}

/// Lenient attribute time: split on `:`, each missing or non-numeric part
/// counts as zero and fractions are truncated.
#[must_use]
pub fn parse_time_lenient(raw: Option<&str>) -> TimeOfDay {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return TimeOfDay::MIDNIGHT;
    };
    let mut parts = trimmed.split(':');
    let mut next = || {
        parts
            .next()
            .and_then(parse_loose_number)
            .map_or(0, trunc_f64_to_i64)
    };
    let hours = next();
    let minutes = next();
    let seconds = next();
    TimeOfDay::new(hours, minutes, seconds)
}

/// Strict override time `H[H]:MM[:SS]` with range checks. Rejected input is
/// never partially applied.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedTime`] for a pattern mismatch and
/// [`ConfigError::TimeOutOfRange`] for a field outside its range.
pub fn parse_time_strict(raw: &str) -> Result<TimeOfDay, ConfigError> {
    let malformed = || ConfigError::MalformedTime(raw.to_string());
    let caps = STRICT_TIME_PATTERN
        .as_ref()
        .and_then(|re| re.captures(raw.trim()))
        .ok_or_else(malformed)?;
    let field = |index: usize, name: &'static str, max: u32| -> Result<i64, ConfigError> {
        let value = caps
            .get(index)
            .map_or(Ok(0), |m| m.as_str().parse::<u32>())
            .map_err(|_| malformed())?;
        if value > max {
            return Err(ConfigError::TimeOutOfRange {
                field: name,
                value,
                max,
            });
        }
        Ok(i64::from(value))
    };
    Ok(TimeOfDay::new(
        field(1, "hours", 23)?,
        field(2, "minutes", 59)?,
        field(3, "seconds", 59)?,
    ))
}

/// Parse `[utc][+|-]H[:MM]` into a signed offset in minutes.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedOffset`] when no numeric offset remains
/// after the prefix and sign are stripped.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let malformed = || ConfigError::MalformedOffset(raw.to_string());
    let mut rest = raw.trim();
    if rest.is_empty() {
        return Err(malformed());
    }
    if rest
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("utc"))
    {
        rest = &rest[3..];
    }

    let mut sign = 1.0;
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('-') {
        sign = -1.0;
        rest = stripped;
    }
    if rest.is_empty() {
        return Err(malformed());
    }

    let mut parts = rest.split(':');
    let hours = parts
        .next()
        .and_then(parse_loose_number)
        .ok_or_else(malformed)?;
    let minutes = parts.next().map_or(Some(0.0), parse_loose_number);
    let minutes = minutes.ok_or_else(malformed)?;

    Ok(UtcOffset::from_minutes(trunc_f64_to_i64(
        sign * (hours * 60.0 + minutes),
    )))
}

/// Parse a colon separated `d:h:m:s` subset. Empty, unknown or all-absent
/// patterns show every unit.
#[must_use]
pub fn parse_units(raw: Option<&str>) -> UnitsMask {
    let pattern = raw.unwrap_or_default().trim().to_ascii_lowercase();
    let mut mask = UnitsMask::NONE;
    for token in pattern.split(':').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(group) = UnitGroup::ALL
            .into_iter()
            .find(|group| token.len() == 1 && token.starts_with(group.token()))
        {
            mask.set(group, true);
        }
    }
    if mask.is_empty() {
        UnitsMask::ALL
    } else {
        mask
    }
}

/// Boolean attribute convention: absent uses `default`, present is true
/// unless the value is exactly `false`.
#[must_use]
pub fn parse_bool_attribute(raw: Option<&str>, default: bool) -> bool {
    raw.map_or(default, |value| value != "false")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn date_requires_strict_shape() {
        assert_eq!(
            parse_ymd_date(" 2099-01-01 ").unwrap(),
            CalendarDate::new(2099, 1, 1)
        );
        assert!(parse_ymd_date("2099-1-01").is_err());
        assert!(parse_ymd_date("99-01-01").is_err());
        assert!(parse_ymd_date("2099/01/01").is_err());
        assert!(parse_ymd_date("").is_err());
    }

    #[test]
    fn lenient_time_defaults_missing_parts() {
        assert_eq!(parse_time_lenient(None), TimeOfDay::MIDNIGHT);
        assert_eq!(parse_time_lenient(Some("  ")), TimeOfDay::MIDNIGHT);
        assert_eq!(parse_time_lenient(Some("7")), TimeOfDay::new(7, 0, 0));
        assert_eq!(parse_time_lenient(Some("7:x:9")), TimeOfDay::new(7, 0, 9));
        assert_eq!(parse_time_lenient(Some("30:75")), TimeOfDay::new(30, 75, 0));
        assert_eq!(parse_time_lenient(Some("1.9:2")), TimeOfDay::new(1, 2, 0));
    }

    #[test]
    fn strict_time_rejects_out_of_range_and_shape() {
        assert_eq!(parse_time_strict("9:05").unwrap(), TimeOfDay::new(9, 5, 0));
        assert_eq!(
            parse_time_strict("23:59:59").unwrap(),
            TimeOfDay::new(23, 59, 59)
        );
        assert_eq!(
            parse_time_strict("24:00"),
            Err(ConfigError::TimeOutOfRange {
                field: "hours",
                value: 24,
                max: 23
            })
        );
        assert!(parse_time_strict("12:60").is_err());
        assert!(parse_time_strict("12:00:60").is_err());
        assert!(parse_time_strict("12").is_err());
        assert!(parse_time_strict("12:5").is_err());
    }

    #[test]
    fn offsets_accept_prefix_sign_and_minutes() {
        assert_eq!(parse_utc_offset("+00:00").unwrap().minutes(), 0);
        assert_eq!(parse_utc_offset("UTC+2").unwrap().minutes(), 120);
        assert_eq!(parse_utc_offset("utc-5:30").unwrap().minutes(), -330);
        assert_eq!(parse_utc_offset("9").unwrap().minutes(), 540);
        assert!(parse_utc_offset("utc").is_err());
        assert!(parse_utc_offset("-").is_err());
        assert!(parse_utc_offset("east").is_err());
        assert!(parse_utc_offset("").is_err());
    }

    #[test]
    fn units_pattern_is_a_mask() {
        let mask = parse_units(Some("h:m"));
        assert!(!mask.days && mask.hours && mask.minutes && !mask.seconds);
        assert_eq!(parse_units(Some("S : D")), {
            let mut expected = UnitsMask::NONE;
            expected.set(UnitGroup::Days, true);
            expected.set(UnitGroup::Seconds, true);
            expected
        });
        assert_eq!(parse_units(Some("xyz")), UnitsMask::ALL);
        assert_eq!(parse_units(Some(":::")), UnitsMask::ALL);
        assert_eq!(parse_units(None), UnitsMask::ALL);
        assert_eq!(parse_units(Some("days:hours")), UnitsMask::ALL);
    }

    #[test]
    fn autostart_follows_boolean_attribute_convention() {
        assert!(parse_bool_attribute(None, true));
        assert!(parse_bool_attribute(Some(""), true));
        assert!(parse_bool_attribute(Some("no"), true));
        assert!(parse_bool_attribute(Some("FALSE"), true));
        assert!(!parse_bool_attribute(Some("false"), true));
    }

    #[test]
    fn query_date_beats_attribute_date() {
        let attributes = attrs(&[("date", "2020-01-01"), ("digits-url", "digits.png")]);
        let query = attrs(&[("date", "2030-06-15")]);
        let config = Configuration::resolve(&attributes, &query);
        assert_eq!(config.target.unwrap().epoch_ms(), 1_907_712_000_000);
    }

    #[test]
    fn fields_mix_query_and_attribute_sources() {
        let attributes = attrs(&[("date", "2020-01-01"), ("time", "12:30")]);
        let query = attrs(&[("date", "2030-06-15"), ("time", "99:99"), ("utc", "bogus")]);
        let config = Configuration::resolve(&attributes, &query);
        let expected = Instant::from_civil(
            CalendarDate::new(2030, 6, 15),
            TimeOfDay::new(12, 30, 0),
            UtcOffset::UTC,
        );
        assert_eq!(config.target, expected);
    }

    #[test]
    fn invalid_query_offset_falls_back_to_attribute() {
        let attributes = attrs(&[("date", "2030-06-15"), ("utc", "+1")]);
        let query = attrs(&[("utc", "garbage")]);
        let config = Configuration::resolve(&attributes, &query);
        assert_eq!(
            config.target.unwrap().epoch_ms(),
            1_907_712_000_000 - 60 * 60 * 1000
        );
    }

    #[test]
    fn missing_date_means_no_target() {
        let attributes = attrs(&[("time", "10:00"), ("date", "soon")]);
        let config = Configuration::resolve(&attributes, &BTreeMap::new());
        assert!(config.target.is_none());
        assert!(config.autostart);
        assert!(!config.has_digits());
    }

    #[test]
    fn blank_query_values_are_ignored() {
        let attributes = attrs(&[("units", "h:m")]);
        let query = attrs(&[("units", "   ")]);
        let overrides = QueryOverrides::read(&query);
        assert!(overrides.is_empty());
        let config = Configuration::resolve(&attributes, &query);
        assert!(!config.units.days);
    }

    #[test]
    fn mode_and_assets_resolve() {
        let attributes = attrs(&[
            ("mode", " Scroll "),
            ("digits-url", "d.png"),
            ("separator-url", ""),
            ("autostart", "false"),
        ]);
        let config = Configuration::resolve(&attributes, &BTreeMap::new());
        assert_eq!(config.mode, TransitionMode::Scroll);
        assert_eq!(config.digits_url.as_deref(), Some("d.png"));
        assert!(!config.has_separator());
        assert!(!config.autostart);
    }
}

//! Centralized names and timing constants for the countdown widget.
//!
//! Attribute names, class names and custom properties form the contract
//! between the engine, the host markup and the stylesheet. Keeping them in
//! one place means a rename only ever happens here.

// Element ------------------------------------------------------------------
pub const ELEMENT_NAME: &str = "countdown-timer";
pub const DONE_EVENT: &str = "done";

// Attributes ---------------------------------------------------------------
pub const ATTR_DIGITS_URL: &str = "digits-url";
pub const ATTR_SEPARATOR_URL: &str = "separator-url";
pub const ATTR_AUTOSTART: &str = "autostart";
pub const ATTR_DATE: &str = "date";
pub const ATTR_TIME: &str = "time";
pub const ATTR_UTC: &str = "utc";
pub const ATTR_UNITS: &str = "units";
pub const ATTR_MODE: &str = "mode";

/// Every attribute whose change triggers a reconfiguration.
pub const OBSERVED_ATTRIBUTES: [&str; 8] = [
    ATTR_DIGITS_URL,
    ATTR_SEPARATOR_URL,
    ATTR_AUTOSTART,
    ATTR_DATE,
    ATTR_TIME,
    ATTR_UTC,
    ATTR_UNITS,
    ATTR_MODE,
];

// Query override keys ------------------------------------------------------
pub const QUERY_DATE: &str = "date";
pub const QUERY_TIME: &str = "time";
pub const QUERY_UTC: &str = "utc";
pub const QUERY_UNITS: &str = "units";

// Rendering hints ----------------------------------------------------------
pub const PROP_DIGITS_URL: &str = "--zh-digits-url";
pub const PROP_SEPARATOR_URL: &str = "--zh-sep-url";
pub const PROP_GROUPS: &str = "--zh-groups";
pub const PROP_SHEET_INDEX: &str = "--zh-sheet-index";
pub const CLASS_ROOT: &str = "zh";
pub const CLASS_MODE_SCROLL: &str = "zh--mode-scroll";
pub const CLASS_TEXT_FALLBACK: &str = "zh--text";
pub const CLASS_GROUP: &str = "zh__group";
pub const CLASS_SEPARATOR: &str = "zh__sep";
pub const CLASS_A11Y: &str = "zh__a11y";
pub const CLASS_DIGIT: &str = "zh__digit";
pub const CLASS_DIGIT_TRACK: &str = "zh__digit-track";
pub const CLASS_DIGIT_FACE: &str = "zh__digit-face";
pub const CLASS_FACE_CURRENT: &str = "zh__digit-face--current";
pub const CLASS_FACE_NEXT: &str = "zh__digit-face--next";
pub const DATA_DIGIT: &str = "data-zh-digit";

// Text ---------------------------------------------------------------------
/// Shown instead of the digit grid when no digits sprite is configured.
pub const TEXT_FALLBACK: &str = "\u{2014}:\u{2014}:\u{2014}:\u{2014}";
/// Summary text when no unit group is visible.
pub const TEXT_EMPTY: &str = "\u{2014}";
pub const TEXT_SEPARATOR: &str = ":";

// Timing -------------------------------------------------------------------
pub const MS_PER_SECOND: i64 = 1_000;
pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const HOURS_PER_DAY: u64 = 24;
pub const MS_PER_MINUTE: i64 = 60_000;
/// Added to the computed transition time before the guard gives up waiting.
pub const TRANSITION_GUARD_SLACK_MS: u32 = 150;
/// Guard used when the host cannot report a transition time.
pub const TRANSITION_GUARD_FALLBACK_MS: u32 = 800;

// Digit layout -------------------------------------------------------------
pub const MIN_DAY_DIGITS: usize = 2;
pub const MIN_HOUR_DIGITS: usize = 2;
pub const CLOCK_DIGITS: usize = 2;
pub const SEPARATOR_SLOTS: usize = 3;

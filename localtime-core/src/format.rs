//! Formatting helpers: relative phrases and long calendar dates.
//!
//! Every function takes `now` explicitly; nothing here reads the wall clock.

use crate::error::{Error, Result};
use crate::locale::LocaleTag;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text shown for a timestamp that does not parse.
pub const INVALID_DATE: &str = "Invalid Date";

/// Naive layouts accepted after RFC 3339 and RFC 2822; interpreted as UTC.
const NAIVE_DATETIME_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Display style selected by the `data-local-time` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Duration phrase such as "2 hours ago"
    Relative,
    /// Long calendar date such as "January 1, 2024"
    #[serde(alias = "date")]
    AbsoluteDate,
}

impl Mode {
    /// Canonical markup literal for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Relative => "relative",
            Mode::AbsoluteDate => "absolute-date",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    /// Parses the exact literal; `date` is accepted for `absolute-date`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "relative" => Ok(Mode::Relative),
            "absolute-date" | "date" => Ok(Mode::AbsoluteDate),
            other => Err(Error::UnrecognizedMode(other.to_string())),
        }
    }
}

/// Zone in which the calendar date of an instant is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayZone {
    #[default]
    Utc,
    /// The host's local offset
    Local,
}

impl FromStr for DisplayZone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utc" => Ok(DisplayZone::Utc),
            "local" => Ok(DisplayZone::Local),
            other => Err(Error::Config(format!(
                "unknown display zone {other:?} (expected \"utc\" or \"local\")"
            ))),
        }
    }
}

/// Unit of a relative time phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl RelativeUnit {
    /// Length of one unit in seconds
    pub fn seconds(self) -> u64 {
        match self {
            RelativeUnit::Second => 1,
            RelativeUnit::Minute => 60,
            RelativeUnit::Hour => 3_600,
            RelativeUnit::Day => 86_400,
        }
    }

    /// Unit used for a distance of `abs_seconds`.
    pub fn for_distance(abs_seconds: u64) -> Self {
        if abs_seconds < 60 {
            RelativeUnit::Second
        } else if abs_seconds < 3_600 {
            RelativeUnit::Minute
        } else if abs_seconds < 86_400 {
            RelativeUnit::Hour
        } else {
            RelativeUnit::Day
        }
    }

    fn noun(self, count: u64) -> &'static str {
        let (singular, plural) = match self {
            RelativeUnit::Second => ("second", "seconds"),
            RelativeUnit::Minute => ("minute", "minutes"),
            RelativeUnit::Hour => ("hour", "hours"),
            RelativeUnit::Day => ("day", "days"),
        };
        if count == 1 {
            singular
        } else {
            plural
        }
    }
}

/// A rounded distance between two instants, e.g. "3 days ago".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTime {
    pub magnitude: u64,
    pub unit: RelativeUnit,
    /// True when the target lies before `now`
    pub past: bool,
}

impl RelativeTime {
    /// Distance from `now` to `target`.
    pub fn between(target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let delta = whole_seconds_between(target, now);
        let distance = delta.unsigned_abs();
        let unit = RelativeUnit::for_distance(distance);
        let magnitude = (distance as f64 / unit.seconds() as f64).round() as u64;

        Self {
            magnitude,
            unit,
            past: delta < 0,
        }
    }
}

impl fmt::Display for RelativeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.past { "ago" } else { "from now" };
        write!(
            f,
            "{} {} {}",
            self.magnitude,
            self.unit.noun(self.magnitude),
            suffix
        )
    }
}

/// Signed `target - now`, rounded to the nearest second.
pub fn whole_seconds_between(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = target.signed_duration_since(now).num_milliseconds();
    (millis as f64 / 1000.0).round() as i64
}

/// Format a timestamp relative to `now` (e.g., "2 hours ago", "45 seconds from now").
pub fn format_relative_time(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    RelativeTime::between(target, now).to_string()
}

/// Format a timestamp as a long calendar date in the given locale.
pub fn format_long_date(target: DateTime<Utc>, locale: &LocaleTag, zone: DisplayZone) -> String {
    let pattern = locale.long_date_pattern();
    let chrono_locale = locale.chrono_locale();

    match zone {
        DisplayZone::Utc => target.format_localized(pattern, chrono_locale).to_string(),
        DisplayZone::Local => target
            .with_timezone(&Local)
            .format_localized(pattern, chrono_locale)
            .to_string(),
    }
}

/// Format `target` in `mode`, taking calendar dates in UTC.
pub fn format(target: DateTime<Utc>, mode: Mode, now: DateTime<Utc>, locale: &LocaleTag) -> String {
    TimeFormatter::new(locale.clone(), DisplayZone::Utc).format(target, mode, now)
}

/// Parse a `datetime` attribute value into an instant.
///
/// Accepts RFC 3339, RFC 2822, naive date-times (taken as UTC) and bare
/// `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, layout) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(Error::InvalidTimestamp(value.to_string()))
}

/// Viewer settings applied to every timestamp of a bind pass.
#[derive(Debug, Clone, Default)]
pub struct TimeFormatter {
    locale: LocaleTag,
    zone: DisplayZone,
}

impl TimeFormatter {
    pub fn new(locale: LocaleTag, zone: DisplayZone) -> Self {
        Self { locale, zone }
    }

    pub fn locale(&self) -> &LocaleTag {
        &self.locale
    }

    pub fn zone(&self) -> DisplayZone {
        self.zone
    }

    /// Format `target` in `mode` as seen at `now`.
    pub fn format(&self, target: DateTime<Utc>, mode: Mode, now: DateTime<Utc>) -> String {
        match mode {
            Mode::Relative => format_relative_time(target, now),
            Mode::AbsoluteDate => format_long_date(target, &self.locale, self.zone),
        }
    }
}

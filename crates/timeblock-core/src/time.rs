//! Time value types used by the planner.
//!
//! Wall-clock values (`"HH:MM"`) are parsed once into [`ClockTime`] and
//! compared as minutes since midnight. Conversion to absolute instants
//! happens in [`localize`], with the calendar's time zone supplied by the
//! caller; everything past that boundary ([`TimeSlot`], [`BusyPeriod`]) is
//! plain UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Error returned when a string is not a valid `"HH:MM"` time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time '{value}', expected HH:MM")]
pub struct ClockTimeError {
    value: String,
}

impl ClockTimeError {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// A time of day with minute precision, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    /// Creates a clock time from hours and minutes.
    ///
    /// Returns `None` when the hour is not in `0..24` or the minute not in `0..60`.
    pub fn from_hm(hours: u16, minutes: u16) -> Option<Self> {
        (hours < 24 && minutes < 60).then(|| Self(hours * 60 + minutes))
    }

    /// Creates a clock time from minutes since midnight.
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    /// Parses an `"HH:MM"` string. A single-digit hour (`"9:30"`) is accepted.
    pub fn parse(value: &str) -> Result<Self, ClockTimeError> {
        let trimmed = value.trim();
        let (hours, minutes) = trimmed
            .split_once(':')
            .ok_or_else(|| ClockTimeError::new(value))?;

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
            return Err(ClockTimeError::new(value));
        }

        let hours: u16 = hours.parse().map_err(|_| ClockTimeError::new(value))?;
        let minutes: u16 = minutes.parse().map_err(|_| ClockTimeError::new(value))?;
        Self::from_hm(hours, minutes).ok_or_else(|| ClockTimeError::new(value))
    }

    /// Minutes elapsed since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hours_part(self) -> u16 {
        self.0 / 60
    }

    pub fn minutes_part(self) -> u16 {
        self.0 % 60
    }

    /// Converts to a chrono [`NaiveTime`].
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(u32::from(self.0) * 60, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours_part(), self.minutes_part())
    }
}

impl FromStr for ClockTime {
    type Err = ClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ClockTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Resolves a calendar date and wall-clock time in `tz` to a UTC instant.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant.
/// Returns `None` for local times skipped by a DST transition.
pub fn localize<Tz: TimeZone>(tz: &Tz, day: NaiveDate, time: ClockTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&day.and_time(time.to_naive_time()))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Position of a day within a multi-day run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayRole {
    /// The run covers exactly this one day.
    Single,
    /// First day of a run spanning several days.
    First,
    /// Last day of a run spanning several days.
    Last,
    /// Any day strictly between the first and the last.
    Interior,
}

impl DayRole {
    /// Classifies `day` relative to the inclusive run `[start, end]`.
    pub fn classify(day: NaiveDate, start: NaiveDate, end: NaiveDate) -> Self {
        match (day == start, day == end) {
            (true, true) => Self::Single,
            (true, false) => Self::First,
            (false, true) => Self::Last,
            (false, false) => Self::Interior,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::First => "first",
            Self::Last => "last",
            Self::Interior => "interior",
        }
    }
}

impl fmt::Display for DayRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The effective wall-clock range for one day, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl DayRange {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// True when the range holds no time at all (`end <= start`).
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Length of the range in minutes, zero when empty.
    pub fn len_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Returns true when the half-open intervals `[a_start, a_end)` and
/// `[b_start, b_end)` share interior time. Touching endpoints do not overlap.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// A candidate block, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// True when this slot shares interior time with `busy`.
    pub fn overlaps(&self, busy: &BusyPeriod) -> bool {
        intervals_overlap(self.start, self.end, busy.start, busy.end)
    }
}

/// An occupied interval reported by the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    fn t(s: &str) -> ClockTime {
        ClockTime::parse(s).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
    }

    #[test]
    fn clock_time_parse_valid() {
        assert_eq!(t("09:00").minutes(), 540);
        assert_eq!(t("9:05").minutes(), 545);
        assert_eq!(t("00:00").minutes(), 0);
        assert_eq!(t("23:59").minutes(), 1439);
        assert_eq!(t(" 17:30 ").minutes(), 1050);
    }

    #[test]
    fn clock_time_parse_invalid() {
        for bad in ["", "9", "24:00", "12:60", "12:5", "ab:cd", "-1:00", "123:00", "12:00:00"] {
            assert!(ClockTime::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn clock_time_display_pads() {
        assert_eq!(t("9:05").to_string(), "09:05");
        assert_eq!(ClockTime::from_minutes(75).unwrap().to_string(), "01:15");
        assert!(ClockTime::from_minutes(1440).is_none());
    }

    #[test]
    fn clock_time_serde_as_string() {
        let json = serde_json::to_string(&t("08:15")).unwrap();
        assert_eq!(json, "\"08:15\"");
        let back: ClockTime = serde_json::from_str("\"8:15\"").unwrap();
        assert_eq!(back, t("08:15"));
        assert!(serde_json::from_str::<ClockTime>("\"25:00\"").is_err());
    }

    #[test]
    fn clock_time_to_naive_time() {
        let nt = t("13:45").to_naive_time();
        assert_eq!((nt.hour(), nt.minute()), (13, 45));
    }

    #[test]
    fn localize_uses_zone_offset() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let bogota = chrono_tz::America::Bogota;
        assert_eq!(localize(&bogota, day, t("09:00")), Some(at(14, 0)));
        assert_eq!(localize(&Utc, day, t("09:00")), Some(at(9, 0)));
    }

    #[test]
    fn localize_skipped_local_time_is_none() {
        // Clocks jump from 02:00 to 03:00 in New York on 2024-03-10.
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert!(localize(&chrono_tz::America::New_York, day, t("02:30")).is_none());
    }

    #[test]
    fn day_role_classification() {
        let d = |n| NaiveDate::from_ymd_opt(2024, 3, n).unwrap();
        assert_eq!(DayRole::classify(d(1), d(1), d(1)), DayRole::Single);
        assert_eq!(DayRole::classify(d(1), d(1), d(3)), DayRole::First);
        assert_eq!(DayRole::classify(d(2), d(1), d(3)), DayRole::Interior);
        assert_eq!(DayRole::classify(d(3), d(1), d(3)), DayRole::Last);
    }

    #[test]
    fn day_range_emptiness() {
        assert!(!DayRange::new(t("09:00"), t("10:00")).is_empty());
        assert!(DayRange::new(t("10:00"), t("10:00")).is_empty());
        assert!(DayRange::new(t("11:00"), t("10:00")).is_empty());
        assert_eq!(DayRange::new(t("11:00"), t("10:00")).len_minutes(), 0);
        assert_eq!(DayRange::new(t("09:00"), t("10:30")).len_minutes(), 90);
    }

    #[test]
    fn overlap_is_half_open() {
        let slot = TimeSlot::new(at(10, 0), at(10, 30));
        assert!(slot.overlaps(&BusyPeriod::new(at(10, 15), at(11, 0))));
        assert!(slot.overlaps(&BusyPeriod::new(at(9, 0), at(12, 0))));
        assert!(!slot.overlaps(&BusyPeriod::new(at(10, 30), at(11, 0))));
        assert!(!slot.overlaps(&BusyPeriod::new(at(9, 30), at(10, 0))));
        assert_eq!(slot.duration(), Duration::minutes(30));
    }
}

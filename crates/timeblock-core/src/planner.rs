//! Per-day range resolution and slot generation.
//!
//! A run places blocks inside two independent constraints: the daily
//! working hours and the task window. The task window only bounds the
//! first day's start and the last day's end; days in between use the full
//! working hours.

use chrono::{Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::time::{ClockTime, DayRange, DayRole, TimeSlot, localize};

/// The four wall-clock bounds shared by every day of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHours {
    pub workday_start: ClockTime,
    pub workday_end: ClockTime,
    pub task_start: ClockTime,
    pub task_end: ClockTime,
}

impl DailyHours {
    pub fn new(
        workday_start: ClockTime,
        workday_end: ClockTime,
        task_start: ClockTime,
        task_end: ClockTime,
    ) -> Self {
        Self {
            workday_start,
            workday_end,
            task_start,
            task_end,
        }
    }
}

/// Returns the later of two clock times.
pub fn max_time(a: ClockTime, b: ClockTime) -> ClockTime {
    if a.minutes() >= b.minutes() { a } else { b }
}

/// Returns the earlier of two clock times.
pub fn min_time(a: ClockTime, b: ClockTime) -> ClockTime {
    if a.minutes() <= b.minutes() { a } else { b }
}

/// Resolves the effective range for a day with the given role.
///
/// The result may be empty (`end <= start`); callers skip such days.
pub fn resolve_day_range(role: DayRole, hours: &DailyHours) -> DayRange {
    let (start, end) = match role {
        DayRole::Single => (
            max_time(hours.workday_start, hours.task_start),
            min_time(hours.workday_end, hours.task_end),
        ),
        DayRole::First => (
            max_time(hours.workday_start, hours.task_start),
            hours.workday_end,
        ),
        DayRole::Last => (
            hours.workday_start,
            min_time(hours.workday_end, hours.task_end),
        ),
        DayRole::Interior => (hours.workday_start, hours.workday_end),
    };
    DayRange::new(start, end)
}

/// Splits `range` on `day` into consecutive slots of exactly `duration`.
///
/// Slots start at `range.start` and are contiguous. A trailing remainder
/// shorter than `duration` is dropped. Empty ranges, non-positive durations
/// and local times that do not exist in `tz` yield no slots.
pub fn generate_slots<Tz: TimeZone>(
    tz: &Tz,
    day: NaiveDate,
    range: DayRange,
    duration: Duration,
) -> Vec<TimeSlot> {
    if range.is_empty() || duration <= Duration::zero() {
        return Vec::new();
    }

    let (Some(range_start), Some(range_end)) = (
        localize(tz, day, range.start),
        localize(tz, day, range.end),
    ) else {
        warn!(%day, %range, "range does not exist in the calendar time zone");
        return Vec::new();
    };

    let mut slots = Vec::new();
    let mut cursor = range_start;
    while cursor + duration <= range_end {
        slots.push(TimeSlot::new(cursor, cursor + duration));
        cursor += duration;
    }

    debug!(%day, %range, count = slots.len(), "generated slots");
    slots
}

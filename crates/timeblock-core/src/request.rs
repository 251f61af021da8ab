//! Scheduling requests and their validation.
//!
//! [`SchedulingRequest`] is the raw, string-typed form accepted at the
//! invocation surface (CLI flags or a JSON document). [`SchedulingRequest::validate`]
//! turns it into a [`TaskWindow`], the typed form the scheduler works with.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::planner::DailyHours;
use crate::time::{ClockTime, DayRole};

/// Errors found while validating a [`SchedulingRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A required field is absent or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A time field is not a valid `HH:MM` value.
    #[error("invalid time for {field}: '{value}' (expected HH:MM)")]
    InvalidTime { field: &'static str, value: String },

    /// A date field is not a valid `YYYY-MM-DD` value.
    #[error("invalid date for {field}: '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    /// The end date precedes the start date.
    #[error("dateEnd {end} is before dateStart {start}")]
    DateRangeReversed { start: NaiveDate, end: NaiveDate },

    /// The configured slot duration is not positive.
    #[error("slot duration must be at least one minute, got {0}")]
    InvalidSlotDuration(i64),
}

/// A scheduling request as supplied by the user.
///
/// Every field except `event_color` is required; absence is reported by
/// [`validate`](Self::validate) before anything touches the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingRequest {
    pub event_name: Option<String>,
    pub event_color: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    pub workday_start: Option<String>,
    pub workday_end: Option<String>,
    pub task_start: Option<String>,
    pub task_end: Option<String>,
}

impl SchedulingRequest {
    /// Checks every field and converts the request to a [`TaskWindow`].
    pub fn validate(&self) -> Result<TaskWindow, RequestError> {
        let event_name = required("eventName", &self.event_name)?.to_string();
        let date_start = parse_date("dateStart", required("dateStart", &self.date_start)?)?;
        let date_end = parse_date("dateEnd", required("dateEnd", &self.date_end)?)?;
        let workday_start =
            parse_time("workdayStart", required("workdayStart", &self.workday_start)?)?;
        let workday_end = parse_time("workdayEnd", required("workdayEnd", &self.workday_end)?)?;
        let task_start = parse_time("taskStart", required("taskStart", &self.task_start)?)?;
        let task_end = parse_time("taskEnd", required("taskEnd", &self.task_end)?)?;

        if date_end < date_start {
            return Err(RequestError::DateRangeReversed {
                start: date_start,
                end: date_end,
            });
        }

        let event_color = self
            .event_color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        Ok(TaskWindow {
            event_name,
            event_color,
            date_start,
            date_end,
            hours: DailyHours::new(workday_start, workday_end, task_start, task_end),
        })
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, RequestError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(RequestError::MissingField(field))
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, RequestError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| RequestError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn parse_time(field: &'static str, value: &str) -> Result<ClockTime, RequestError> {
    ClockTime::parse(value).map_err(|_| RequestError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskWindow {
    pub event_name: String,
    pub event_color: Option<String>,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub hours: DailyHours,
}

impl TaskWindow {
    /// Number of calendar days in the inclusive run.
    pub fn day_count(&self) -> i64 {
        (self.date_end - self.date_start).num_days() + 1
    }

    /// Iterates the days of the run in order, each with its role.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, DayRole)> + '_ {
        self.date_start
            .iter_days()
            .take_while(|day| *day <= self.date_end)
            .map(|day| (day, DayRole::classify(day, self.date_start, self.date_end)))
    }
}

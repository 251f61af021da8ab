//! Core types: clock times, slots, day planning, availability filtering
//!
//! Everything in this crate is pure: no I/O, no clocks, no network. The
//! scheduler in `timeblock-client` composes these pieces with the calendar
//! gateway from `timeblock-providers`.

pub mod availability;
pub mod planner;
pub mod request;
pub mod run;
pub mod time;
pub mod tracing;

pub use availability::filter_free;
pub use planner::{DailyHours, generate_slots, max_time, min_time, resolve_day_range};
pub use request::{RequestError, SchedulingRequest, TaskWindow};
pub use run::{RunResult, RunTally};
pub use time::{
    BusyPeriod, ClockTime, ClockTimeError, DayRange, DayRole, TimeSlot, intervals_overlap,
    localize,
};
pub use self::tracing::{TracingConfig, TracingError, init_tracing};

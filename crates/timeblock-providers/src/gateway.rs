//! Seams between the scheduler and the outside world.
//!
//! The scheduler only talks to two traits:
//!
//! - [`AccessTokenSource`] hands out a bearer token that is valid right now
//! - [`CalendarGateway`] runs the two remote calendar operations
//!
//! Both use boxed futures so they stay object-safe and can be swapped for
//! in-memory fakes in tests.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use timeblock_core::{BusyPeriod, TimeSlot};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Using boxed futures keeps the traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can produce a currently valid access token.
pub trait AccessTokenSource: Send + Sync {
    /// Returns a valid bearer token, refreshing or re-authorizing if needed.
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>>;
}

/// Parameters of a free/busy query for one calendar and one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyQuery<'a> {
    pub calendar_id: &'a str,
    /// Start of the queried window (the day's resolved range start).
    pub time_min: chrono::DateTime<chrono::Utc>,
    /// End of the queried window (the day's resolved range end).
    pub time_max: chrono::DateTime<chrono::Utc>,
    /// IANA time zone name sent along with the query.
    pub time_zone: &'a str,
}

/// A single event to create for exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent<'a> {
    pub calendar_id: &'a str,
    pub title: &'a str,
    pub slot: TimeSlot,
    pub time_zone: &'a str,
    /// Opaque color tag forwarded to the calendar as-is.
    pub color_id: Option<&'a str>,
}

/// What the calendar returned for a created event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReceipt {
    pub id: Option<String>,
    pub html_link: Option<String>,
}

/// Remote calendar operations.
///
/// Each call is a single request with no local retry.
pub trait CalendarGateway: Send + Sync {
    /// Returns the busy intervals of one calendar within the query window.
    fn query_busy<'a>(
        &'a self,
        token: &'a str,
        query: BusyQuery<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<BusyPeriod>>>;

    /// Creates one calendar event covering `event.slot`.
    fn create_event<'a>(
        &'a self,
        token: &'a str,
        event: NewEvent<'a>,
    ) -> BoxFuture<'a, ProviderResult<EventReceipt>>;
}

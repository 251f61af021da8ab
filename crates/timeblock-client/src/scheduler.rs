//! Day-by-day scheduling run.
//!
//! [`Scheduler::run`] validates the request, obtains an access token, then
//! walks the days in order. The token source is consulted again before every
//! later remote call, so a token expiring mid-run is refreshed. For each day it resolves the usable range,
//! generates slots, asks the calendar for busy time, and creates one event
//! per free slot. Days and events are processed strictly one after the
//! other; the first failure ends the run.

use chrono_tz::Tz;
use timeblock_core::{
    RunResult, RunTally, SchedulingRequest, TaskWindow, filter_free, generate_slots,
    localize, resolve_day_range,
};
use timeblock_providers::{AccessTokenSource, BusyQuery, CalendarGateway, NewEvent};
use tracing::{Instrument, debug, info, info_span};

use crate::config::ScheduleSettings;
use crate::error::ClientResult;

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOptions {
    pub calendar_id: String,
    pub time_zone: Tz,
    pub slot_length: chrono::Duration,
    /// Query and filter, but create nothing.
    pub dry_run: bool,
}

impl ScheduleOptions {
    /// Resolves settings, applying defaults for anything left blank.
    pub fn from_settings(settings: &ScheduleSettings) -> ClientResult<Self> {
        let calendar_id = match settings.calendar_id.trim() {
            "" => crate::config::DEFAULT_CALENDAR_ID.to_string(),
            id => id.to_string(),
        };
        Ok(Self {
            calendar_id,
            time_zone: settings.time_zone()?,
            slot_length: settings.slot_duration()?,
            dry_run: false,
        })
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Drives one scheduling run against a token source and a calendar.
pub struct Scheduler<'a> {
    tokens: &'a dyn AccessTokenSource,
    calendar: &'a dyn CalendarGateway,
    options: ScheduleOptions,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        tokens: &'a dyn AccessTokenSource,
        calendar: &'a dyn CalendarGateway,
        options: ScheduleOptions,
    ) -> Self {
        Self {
            tokens,
            calendar,
            options,
        }
    }

    /// Runs the request to completion or to the first error.
    pub async fn run(&self, request: &SchedulingRequest) -> ClientResult<RunResult> {
        let window = request.validate()?;
        let span = info_span!(
            "schedule",
            event = %window.event_name,
            from = %window.date_start,
            to = %window.date_end,
            dry_run = self.options.dry_run,
        );
        self.run_window(&window).instrument(span).await
    }

    async fn run_window(&self, window: &TaskWindow) -> ClientResult<RunResult> {
        let mut upfront = Some(self.tokens.access_token().await?);
        let time_zone = self.options.time_zone.name();
        let mut tally = RunTally::default();

        for (day, role) in window.days() {
            let range = resolve_day_range(role, &window.hours);
            let slots = generate_slots(&self.options.time_zone, day, range, self.options.slot_length);
            if slots.is_empty() {
                info!(%day, %role, %range, "no usable time, skipping day");
                tally.days_skipped += 1;
                continue;
            }

            let (Some(time_min), Some(time_max)) = (
                localize(&self.options.time_zone, day, range.start),
                localize(&self.options.time_zone, day, range.end),
            ) else {
                tally.days_skipped += 1;
                continue;
            };

            let token = self.token(&mut upfront).await?;
            let busy = self
                .calendar
                .query_busy(
                    &token,
                    BusyQuery {
                        calendar_id: &self.options.calendar_id,
                        time_min,
                        time_max,
                        time_zone,
                    },
                )
                .await?;

            let free = filter_free(&slots, &busy);
            info!(
                %day,
                %role,
                %range,
                slots = slots.len(),
                busy = busy.len(),
                free = free.len(),
                "planned day"
            );

            tally.total_slots += slots.len();
            tally.total_free += free.len();
            tally.days_processed += 1;

            if self.options.dry_run {
                continue;
            }

            for slot in free {
                let token = self.token(&mut upfront).await?;
                let receipt = self
                    .calendar
                    .create_event(
                        &token,
                        NewEvent {
                            calendar_id: &self.options.calendar_id,
                            title: &window.event_name,
                            slot,
                            time_zone,
                            color_id: window.event_color.as_deref(),
                        },
                    )
                    .await?;
                tally.total_created += 1;
                debug!(
                    start = %slot.start,
                    id = receipt.id.as_deref().unwrap_or("?"),
                    "created event"
                );
            }
        }

        let result = tally.finish(self.options.dry_run);
        info!("{}", result.message);
        Ok(result)
    }

    /// The token fetched up front for the first remote call, a fresh one after.
    async fn token(&self, upfront: &mut Option<String>) -> ClientResult<String> {
        match upfront.take() {
            Some(token) => Ok(token),
            None => Ok(self.tokens.access_token().await?),
        }
    }
}

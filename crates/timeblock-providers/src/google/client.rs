//! Google Calendar API client.
//!
//! Implements [`CalendarGateway`] over the v3 REST API: `freeBusy` for busy
//! intervals and `events.insert` for event creation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use timeblock_core::{BusyPeriod, TimeSlot};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::gateway::{BoxFuture, BusyQuery, CalendarGateway, EventReceipt, NewEvent};

use super::config::GoogleConfig;

/// Maps a transport failure to a network error.
pub(super) fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout").with_source(e)
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e)).with_source(e)
    } else {
        ProviderError::network(format!("request failed: {}", e)).with_source(e)
    }
}

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a client for the configured API base.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        Ok(Self {
            http_client: config.http_client()?,
            api_base: config.endpoints.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Runs a free/busy query for one calendar.
    pub async fn free_busy(
        &self,
        token: &str,
        query: &BusyQuery<'_>,
    ) -> ProviderResult<Vec<BusyPeriod>> {
        let url = format!("{}/freeBusy", self.api_base);
        let body = FreeBusyRequest {
            time_min: query.time_min.to_rfc3339(),
            time_max: query.time_max.to_rfc3339(),
            time_zone: query.time_zone,
            items: vec![FreeBusyItem {
                id: query.calendar_id,
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::availability_query(format!(
                "free/busy query failed ({}): {}",
                status, text
            )));
        }

        let parsed: FreeBusyResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse free/busy response: {}", e))
        })?;

        let Some(calendar) = parsed.calendars.get(query.calendar_id) else {
            warn!(
                "free/busy response has no entry for calendar {}",
                query.calendar_id
            );
            return Ok(Vec::new());
        };

        if let Some(error) = calendar.errors.first() {
            return Err(ProviderError::availability_query(format!(
                "free/busy query rejected for calendar {}: {}",
                query.calendar_id,
                error.reason.as_deref().unwrap_or("unknown reason")
            )));
        }

        let busy = calendar
            .busy
            .iter()
            .map(|interval| {
                Ok(BusyPeriod::new(
                    parse_instant(&interval.start)?,
                    parse_instant(&interval.end)?,
                ))
            })
            .collect::<ProviderResult<Vec<_>>>()?;

        debug!(
            "calendar {} has {} busy period(s) between {} and {}",
            query.calendar_id,
            busy.len(),
            query.time_min,
            query.time_max
        );
        Ok(busy)
    }

    /// Inserts one event.
    pub async fn insert_event(
        &self,
        token: &str,
        event: &NewEvent<'_>,
    ) -> ProviderResult<EventReceipt> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(event.calendar_id)
        );
        let body = EventInsert {
            summary: event.title,
            start: EventDateTime::at(event.slot.start, event.time_zone),
            end: EventDateTime::at(event.slot.end, event.time_zone),
            color_id: event.color_id,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::event_creation(format!(
                "event creation failed ({}): {}",
                status, text
            )));
        }

        // The receipt is informational; an unexpected body is not a failure.
        let receipt: EventReceipt = serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("could not read created event: {}", e);
            EventReceipt::default()
        });
        debug!(
            "created event {} for slot {}",
            receipt.id.as_deref().unwrap_or("?"),
            slot_label(&event.slot)
        );
        Ok(receipt)
    }
}

impl CalendarGateway for GoogleCalendarClient {
    fn query_busy<'a>(
        &'a self,
        token: &'a str,
        query: BusyQuery<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<BusyPeriod>>> {
        Box::pin(async move { self.free_busy(token, &query).await })
    }

    fn create_event<'a>(
        &'a self,
        token: &'a str,
        event: NewEvent<'a>,
    ) -> BoxFuture<'a, ProviderResult<EventReceipt>> {
        Box::pin(async move { self.insert_event(token, &event).await })
    }
}

fn parse_instant(raw: &str) -> ProviderResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProviderError::invalid_response(format!("bad busy time '{}': {}", raw, e)))
}

fn slot_label(slot: &TimeSlot) -> String {
    format!("{}..{}", slot.start.to_rfc3339(), slot.end.to_rfc3339())
}

// API request/response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: String,
    time_max: String,
    time_zone: &'a str,
    items: Vec<FreeBusyItem<'a>>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyInterval>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct BusyInterval {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventInsert<'a> {
    summary: &'a str,
    start: EventDateTime<'a>,
    end: EventDateTime<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime<'a> {
    date_time: String,
    time_zone: &'a str,
}

impl<'a> EventDateTime<'a> {
    /// Renders `instant` with the offset of `time_zone` when it is a known
    /// IANA zone, otherwise in UTC. Both denote the same instant.
    fn at(instant: DateTime<Utc>, time_zone: &'a str) -> Self {
        let date_time = match time_zone.parse::<chrono_tz::Tz>() {
            Ok(tz) => instant.with_timezone(&tz).to_rfc3339(),
            Err(_) => instant.to_rfc3339(),
        };
        Self {
            date_time,
            time_zone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorCode;
    use crate::google::config::GoogleEndpoints;
    use chrono::TimeZone;
    use mockito::Matcher;
    use serde_json::json;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        // 2024-03-15 in Bogota (UTC-5).
        Utc.with_ymd_and_hms(2024, 3, 15, h + 5, m, 0).unwrap()
    }

    fn client(server: &mockito::Server) -> GoogleCalendarClient {
        let config = GoogleConfig::new().with_endpoints(GoogleEndpoints::under(&server.url()));
        GoogleCalendarClient::new(&config).unwrap()
    }

    fn query() -> BusyQuery<'static> {
        BusyQuery {
            calendar_id: "primary",
            time_min: at(9, 0),
            time_max: at(12, 0),
            time_zone: "America/Bogota",
        }
    }

    #[tokio::test]
    async fn query_busy_maps_intervals() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendar/v3/freeBusy")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "timeMin": "2024-03-15T14:00:00+00:00",
                "timeMax": "2024-03-15T17:00:00+00:00",
                "timeZone": "America/Bogota",
                "items": [{"id": "primary"}]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "kind": "calendar#freeBusy",
                    "calendars": {
                        "primary": {
                            "busy": [
                                {"start": "2024-03-15T10:00:00-05:00", "end": "2024-03-15T10:30:00-05:00"}
                            ]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let busy = client(&server).query_busy("tok", query()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(busy, vec![BusyPeriod::new(at(10, 0), at(10, 30))]);
    }

    #[tokio::test]
    async fn query_busy_failure_surfaces_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/calendar/v3/freeBusy")
            .with_status(403)
            .with_body("insufficient permissions")
            .create_async()
            .await;

        let err = client(&server).query_busy("tok", query()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AvailabilityQueryFailed);
        assert!(err.message().contains("insufficient permissions"));
    }

    #[tokio::test]
    async fn calendar_level_error_fails_query() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/calendar/v3/freeBusy")
            .with_status(200)
            .with_body(
                json!({"calendars": {"primary": {"errors": [{"domain": "global", "reason": "notFound"}]}}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server).query_busy("tok", query()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AvailabilityQueryFailed);
        assert!(err.message().contains("notFound"));
    }

    #[tokio::test]
    async fn missing_calendar_means_no_busy_time() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/calendar/v3/freeBusy")
            .with_status(200)
            .with_body(r#"{"calendars":{}}"#)
            .create_async()
            .await;

        let busy = client(&server).query_busy("tok", query()).await.unwrap();
        assert!(busy.is_empty());
    }

    #[tokio::test]
    async fn create_event_posts_slot() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendar/v3/calendars/team%40example.com/events")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({
                "summary": "Deep work",
                "start": {"dateTime": "2024-03-15T09:00:00-05:00", "timeZone": "America/Bogota"},
                "end": {"dateTime": "2024-03-15T09:30:00-05:00", "timeZone": "America/Bogota"},
                "colorId": "5"
            })))
            .with_status(200)
            .with_body(r#"{"id":"evt1","htmlLink":"https://calendar.google.com/event?eid=evt1","status":"confirmed"}"#)
            .create_async()
            .await;

        let receipt = client(&server)
            .create_event(
                "tok",
                NewEvent {
                    calendar_id: "team@example.com",
                    title: "Deep work",
                    slot: TimeSlot::new(at(9, 0), at(9, 30)),
                    time_zone: "America/Bogota",
                    color_id: Some("5"),
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(receipt.id.as_deref(), Some("evt1"));
        assert!(receipt.html_link.is_some());
    }

    #[tokio::test]
    async fn create_event_omits_absent_color() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .match_body(Matcher::Json(json!({
                "summary": "Focus",
                "start": {"dateTime": "2024-03-15T14:00:00+00:00", "timeZone": "Not/AZone"},
                "end": {"dateTime": "2024-03-15T14:30:00+00:00", "timeZone": "Not/AZone"}
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client(&server)
            .create_event(
                "tok",
                NewEvent {
                    calendar_id: "primary",
                    title: "Focus",
                    slot: TimeSlot::new(at(9, 0), at(9, 30)),
                    time_zone: "Not/AZone",
                    color_id: None,
                },
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_event_failure_is_event_creation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid colorId"}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .create_event(
                "tok",
                NewEvent {
                    calendar_id: "primary",
                    title: "Focus",
                    slot: TimeSlot::new(at(9, 0), at(9, 30)),
                    time_zone: "America/Bogota",
                    color_id: Some("99"),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::EventCreationFailed);
        assert!(err.message().contains("Invalid colorId"));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let config = GoogleConfig::new().with_endpoints(GoogleEndpoints::under("http://127.0.0.1:1"));
        let err = GoogleCalendarClient::new(&config)
            .unwrap()
            .query_busy("tok", query())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }
}

//! Google Calendar API v3 client.
//!
//! Wraps `events.list` and maps the API's event resources onto
//! [`CalendarEvent`].

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use nomorelateness_core::{Attendee, CalendarEvent, ConferenceEntryPoint, EventTime, ResponseStatus};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Largest page `events.list` accepts.
const MAX_PAGE_SIZE: usize = 2500;

/// Time bounds and limits for one `events.list` call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: Option<usize>,
}

/// Google Calendar API client.
#[derive(Debug)]
pub(crate) struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(
        access_token: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
        })
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Lists single (expanded) events of one calendar ordered by start time,
    /// following pagination until `max_results` events are collected.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        query: EventQuery,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(calendar_id, query, page_token.as_deref())
                .await?;

            events.extend(page.items.into_iter().filter_map(convert_event));

            if let Some(max) = query.max_results
                && events.len() >= max
            {
                events.truncate(max);
                break;
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(calendar_id, count = events.len(), "fetched events");
        Ok(events)
    }

    async fn list_events_page(
        &self,
        calendar_id: &str,
        query: EventQuery,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let page_size = query.max_results.map_or(MAX_PAGE_SIZE, |max| max.min(MAX_PAGE_SIZE));
        let mut params = vec![
            ("timeMin", query.time_min.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("showDeleted", "false".to_string()),
            ("maxResults", page_size.to_string()),
        ];
        if let Some(time_max) = query.time_max {
            params.push(("timeMax", time_max.to_rfc3339()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&params);

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("unexpected events.list body: {}", e))
        })
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        "calendar request timed out".to_string()
    } else if e.is_connect() {
        format!("cannot reach the calendar API: {}", e)
    } else {
        format!("calendar request failed: {}", e)
    };
    ProviderError::network(message).with_source(e)
}

/// Builds the error for a non-2xx answer, keeping any `Retry-After` seconds.
async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    let error = ProviderError::from_http_status(status, &body);
    match retry_after {
        Some(delay) => error.with_retry_after(delay),
        None => error,
    }
}

/// Converts an API event into a [`CalendarEvent`].
///
/// Cancelled events and events without an ID are dropped. A start or end
/// that cannot be parsed is kept as "no time" so the event still shows up
/// and is skipped later by the join logic.
fn convert_event(event: ApiEvent) -> Option<CalendarEvent> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let Some(id) = event.id else {
        warn!("skipping event without an id");
        return None;
    };

    let start = event.start.as_ref().and_then(|t| parse_event_time(&id, "start", t));
    let end = event.end.as_ref().and_then(|t| parse_event_time(&id, "end", t));

    let (entry_points, conference_notes) = match event.conference_data {
        Some(data) => (
            data.entry_points
                .unwrap_or_default()
                .into_iter()
                .filter_map(|ep| Some(ConferenceEntryPoint::new(ep.entry_point_type, ep.uri?)))
                .collect(),
            data.notes,
        ),
        None => (Vec::new(), None),
    };

    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let attendee = Attendee::new(a.email?, response_status(a.response_status.as_deref()));
            Some(if a.is_self.unwrap_or(false) {
                attendee.as_self()
            } else {
                attendee
            })
        })
        .collect();

    Some(CalendarEvent {
        id,
        summary: event.summary.unwrap_or_default(),
        location: event.location.unwrap_or_default(),
        description: event.description.unwrap_or_default(),
        start,
        end,
        entry_points,
        conference_notes,
        attendees,
    })
}

fn parse_event_time(id: &str, which: &str, time: &ApiEventTime) -> Option<EventTime> {
    if let Some(ref dt) = time.date_time {
        return EventTime::parse_rfc3339(dt)
            .map_err(|e| warn!(event_id = id, which, value = %dt, error = %e, "unparseable event time"))
            .ok();
    }
    if let Some(ref date) = time.date {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(EventTime::from_date)
            .map_err(|e| warn!(event_id = id, which, value = %date, error = %e, "unparseable event date"))
            .ok();
    }
    warn!(event_id = id, which, "event has no time");
    None
}

fn response_status(status: Option<&str>) -> ResponseStatus {
    match status {
        Some("accepted") => ResponseStatus::Accepted,
        Some("declined") => ResponseStatus::Declined,
        Some("tentative") => ResponseStatus::Tentative,
        Some("needsAction") => ResponseStatus::NeedsAction,
        _ => ResponseStatus::Unknown,
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    status: Option<String>,
    attendees: Option<Vec<ApiAttendee>>,
    conference_data: Option<ApiConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    #[serde(rename = "self")]
    is_self: Option<bool>,
    response_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiConferenceData {
    entry_points: Option<Vec<ApiEntryPoint>>,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEntryPoint {
    entry_point_type: String,
    uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn parse(json: &str) -> Option<CalendarEvent> {
        convert_event(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "items": [
                {
                    "id": "event1",
                    "summary": "Test Meeting",
                    "start": {"dateTime": "2024-03-15T10:00:00Z"},
                    "end": {"dateTime": "2024-03-15T11:00:00Z"},
                    "status": "confirmed"
                }
            ],
            "nextPageToken": "page-2"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn converts_full_event() {
        let event = parse(
            r#"{
                "id": "event1",
                "summary": "Weekly sync",
                "location": "Room 4",
                "description": "Join https://acme.zoom.us/j/123456789",
                "start": {"dateTime": "2024-03-15T10:00:00+01:00", "timeZone": "Europe/Paris"},
                "end": {"dateTime": "2024-03-15T11:00:00+01:00"},
                "attendees": [
                    {"email": "me@example.com", "self": true, "responseStatus": "tentative"},
                    {"email": "you@example.com", "responseStatus": "accepted"},
                    {"responseStatus": "accepted"}
                ],
                "conferenceData": {
                    "conferenceSolution": {"name": "Zoom Meeting"},
                    "entryPoints": [
                        {"entryPointType": "video", "uri": "https://acme.zoom.us/j/123456789"},
                        {"entryPointType": "more"}
                    ],
                    "notes": "Passcode: 424242"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(event.id, "event1");
        assert_eq!(event.location, "Room 4");
        assert_eq!(
            event.start.and_then(|t| t.as_datetime()),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap())
        );
        assert_eq!(
            event.entry_points,
            vec![ConferenceEntryPoint::new("video", "https://acme.zoom.us/j/123456789")]
        );
        assert_eq!(event.conference_notes.as_deref(), Some("Passcode: 424242"));
        assert_eq!(event.attendees.len(), 2);
        assert_eq!(event.response_for(None), ResponseStatus::Tentative);
        assert_eq!(
            event.response_for(Some("you@example.com")),
            ResponseStatus::Accepted
        );
    }

    #[test]
    fn all_day_event_keeps_date() {
        let event = parse(
            r#"{"id": "e", "summary": "Holiday", "start": {"date": "2024-03-15"}, "end": {"date": "2024-03-16"}}"#,
        )
        .unwrap();
        assert!(event.start.unwrap().is_all_day());
    }

    #[test]
    fn malformed_start_becomes_missing() {
        let event = parse(
            r#"{"id": "e", "summary": "Broken", "start": {"dateTime": "soon"}, "end": {"dateTime": "2024-03-15T11:00:00Z"}}"#,
        )
        .unwrap();
        assert!(event.start.is_none());
        assert!(event.end.is_some());
    }

    #[test]
    fn cancelled_and_anonymous_events_are_dropped() {
        assert!(parse(r#"{"id": "e", "status": "cancelled"}"#).is_none());
        assert!(parse(r#"{"summary": "no id"}"#).is_none());
    }

    #[test]
    fn missing_text_fields_are_empty() {
        let event = parse(r#"{"id": "e"}"#).unwrap();
        assert_eq!(event.summary, "");
        assert_eq!(event.description, "");
        assert!(event.start.is_none());
        assert!(event.entry_points.is_empty());
        assert!(event.conference_notes.is_none());
    }

    #[test]
    fn response_status_mapping() {
        assert_eq!(response_status(Some("accepted")), ResponseStatus::Accepted);
        assert_eq!(response_status(Some("declined")), ResponseStatus::Declined);
        assert_eq!(response_status(Some("needsAction")), ResponseStatus::NeedsAction);
        assert_eq!(response_status(Some("bogus")), ResponseStatus::Unknown);
        assert_eq!(response_status(None), ResponseStatus::Unknown);
    }
}

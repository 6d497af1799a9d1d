//! Time handling for calendar events.
//!
//! This module provides [`EventTime`] for event start/end times (a specific
//! datetime or an all-day date), start-time extraction for the join flow, and
//! the join-window check in [`is_soon`].

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::CalendarEvent;

/// Half-width of the join window around a meeting's start, in minutes.
pub const JOIN_WINDOW_MINUTES: i64 = 5;

/// Errors from reading event times.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The event has no timed start (all-day, missing or malformed).
    #[error("event {event_id:?} does not have a start datetime")]
    MissingStartTime { event_id: String },
}

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (stored as UTC)
/// - **AllDay**: A date without a specific time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Parses an RFC 3339 timestamp as sent by the Google Calendar API.
    pub fn parse_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(Self::from_local)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::AllDay(_) => None,
        }
    }
}

/// Returns the timed start of an event.
///
/// All-day events and events whose provider could not supply a start
/// datetime fail with [`TimeError::MissingStartTime`]. Callers skip those
/// events and carry on with the rest of the batch.
pub fn start_time(event: &CalendarEvent) -> Result<DateTime<Utc>, TimeError> {
    event
        .start
        .and_then(|start| start.as_datetime())
        .ok_or_else(|| TimeError::MissingStartTime {
            event_id: event.id.clone(),
        })
}

/// Returns true if `start` lies strictly within the join window around `now`.
///
/// The window is the open interval of five minutes either side of the start:
/// a meeting exactly five minutes away, or that started exactly five minutes
/// ago, is not soon.
pub fn is_soon(start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let window = Duration::minutes(JOIN_WINDOW_MINUTES);
    let until_start = start - now;
    -window < until_start && until_start < window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap()
    }

    mod join_window {
        use super::*;

        #[test]
        fn just_inside_before_start() {
            let start = utc(10, 0, 0);
            let now = start - Duration::minutes(4) - Duration::seconds(59);
            assert!(is_soon(start, now));
        }

        #[test]
        fn just_inside_after_start() {
            let start = utc(10, 0, 0);
            let now = start + Duration::minutes(4) + Duration::seconds(59);
            assert!(is_soon(start, now));
        }

        #[test]
        fn boundaries_are_excluded() {
            let start = utc(10, 0, 0);
            assert!(!is_soon(start, start - Duration::minutes(5)));
            assert!(!is_soon(start, start + Duration::minutes(5)));
        }

        #[test]
        fn exact_start_is_soon() {
            let start = utc(10, 0, 0);
            assert!(is_soon(start, start));
        }

        #[test]
        fn far_away_is_not_soon() {
            let start = utc(10, 0, 0);
            assert!(!is_soon(start, start - Duration::hours(1)));
            assert!(!is_soon(start, start + Duration::hours(1)));
        }

        #[test]
        fn follows_the_clock() {
            let start = utc(10, 0, 0);
            let early = start - Duration::minutes(10);
            let later = start - Duration::minutes(2);
            assert!(!is_soon(start, early));
            assert!(is_soon(start, later));
        }
    }

    mod start_extraction {
        use super::*;

        #[test]
        fn timed_event() {
            let event = CalendarEvent::new("evt-1", "Standup")
                .with_start(EventTime::from_utc(utc(9, 30, 0)));
            assert_eq!(start_time(&event), Ok(utc(9, 30, 0)));
        }

        #[test]
        fn all_day_event_has_no_start_time() {
            let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
            let event =
                CalendarEvent::new("evt-2", "Holiday").with_start(EventTime::from_date(date));
            assert_eq!(
                start_time(&event),
                Err(TimeError::MissingStartTime {
                    event_id: "evt-2".to_string()
                })
            );
        }

        #[test]
        fn missing_start() {
            let event = CalendarEvent::new("evt-3", "Broken");
            let err = start_time(&event).unwrap_err();
            assert!(err.to_string().contains("evt-3"));
        }
    }

    mod event_time {
        use super::*;

        #[test]
        fn parses_rfc3339_with_offset() {
            let time = EventTime::parse_rfc3339("2025-03-10T11:30:00+01:00").unwrap();
            assert_eq!(time.as_datetime(), Some(utc(10, 30, 0)));
            assert!(!time.is_all_day());
        }

        #[test]
        fn rejects_garbage() {
            assert!(EventTime::parse_rfc3339("tomorrow-ish").is_err());
        }
    }
}

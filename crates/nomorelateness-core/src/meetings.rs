//! Batch assembly of resolved meetings.

use tracing::{debug, warn};

use crate::event::{CalendarEvent, MeetingEvent};
use crate::links::LinkResolver;
use crate::time::{self, EventTime};

/// Resolves a batch of events into meetings, keeping the input order.
///
/// Events without a conferencing link are left out. Events whose start time
/// cannot be read are logged and left out; the rest of the batch still goes
/// through. `attendee` selects whose response status is reported (see
/// [`CalendarEvent::response_for`]).
pub fn collect_meetings(
    resolver: &LinkResolver,
    events: &[CalendarEvent],
    attendee: Option<&str>,
) -> Vec<MeetingEvent> {
    events
        .iter()
        .filter_map(|event| meeting_for(resolver, event, attendee))
        .collect()
}

fn meeting_for(
    resolver: &LinkResolver,
    event: &CalendarEvent,
    attendee: Option<&str>,
) -> Option<MeetingEvent> {
    let Some((provider, link)) = resolver.resolve_event(event).into_link() else {
        debug!(event_id = %event.id, summary = %event.summary, "no conferencing link");
        return None;
    };

    let start = match time::start_time(event) {
        Ok(start) => start,
        Err(e) => {
            warn!(error = %e, summary = %event.summary, "skipping event");
            return None;
        }
    };

    Some(MeetingEvent {
        id: event.id.clone(),
        summary: event.summary.clone(),
        start,
        end: event.end.as_ref().and_then(EventTime::as_datetime),
        provider,
        link,
        response: event.response_for(attendee),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::event::{Attendee, ConferenceEntryPoint, MeetingProvider, ResponseStatus};

    fn at(h: u32, m: u32) -> EventTime {
        EventTime::from_utc(Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap())
    }

    fn zoom_event(id: &str, meeting_id: u32, start: EventTime) -> CalendarEvent {
        CalendarEvent::new(id, format!("Meeting {id}"))
            .with_description(format!("https://acme.zoom.us/j/{meeting_id}"))
            .with_start(start)
    }

    #[test]
    fn malformed_start_does_not_abort_batch() {
        let events = vec![
            zoom_event("a", 1, at(9, 0)),
            zoom_event("b", 2, at(10, 0)),
            CalendarEvent::new("c", "Broken").with_description("https://acme.zoom.us/j/3"),
            zoom_event("d", 4, at(11, 0)),
            zoom_event("e", 5, at(12, 0)),
        ];

        let meetings = collect_meetings(&LinkResolver::new(), &events, None);
        let ids: Vec<_> = meetings.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn all_day_event_is_skipped() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let events = vec![zoom_event("a", 1, EventTime::from_date(date))];
        assert!(collect_meetings(&LinkResolver::new(), &events, None).is_empty());
    }

    #[test]
    fn events_without_link_are_omitted() {
        let events = vec![
            CalendarEvent::new("lunch", "Lunch").with_start(at(12, 0)),
            zoom_event("sync", 42, at(13, 0)),
        ];

        let meetings = collect_meetings(&LinkResolver::new(), &events, None);
        assert_eq!(meetings.len(), 1);
        assert_eq!(meetings[0].provider, MeetingProvider::Zoom);
        assert_eq!(
            meetings[0].link.as_str(),
            "zoommtg://zoom.us/join?confno=42"
        );
    }

    #[test]
    fn carries_times_and_response() {
        let event = CalendarEvent::new("evt", "Design review")
            .with_start(at(14, 0))
            .with_end(at(15, 0))
            .with_entry_point(ConferenceEntryPoint::new(
                "video",
                "https://teams.microsoft.com/l/meetup-join/abc",
            ))
            .with_description("<https://teams.microsoft.com/l/meetup-join/abc>")
            .with_attendee(Attendee::new("me@example.com", ResponseStatus::Tentative).as_self())
            .with_attendee(Attendee::new("you@example.com", ResponseStatus::Accepted));

        let meetings = collect_meetings(&LinkResolver::new(), &[event.clone()], None);
        let meeting = &meetings[0];
        assert_eq!(meeting.provider, MeetingProvider::Teams);
        assert_eq!(meeting.start, at(14, 0).as_datetime().unwrap());
        assert_eq!(meeting.end, at(15, 0).as_datetime());
        assert_eq!(meeting.response, ResponseStatus::Tentative);

        let meetings =
            collect_meetings(&LinkResolver::new(), &[event], Some("you@example.com"));
        assert_eq!(meetings[0].response, ResponseStatus::Accepted);
    }

    #[test]
    fn soon_is_evaluated_against_given_clock() {
        let events = vec![zoom_event("a", 1, at(9, 0))];
        let meetings = collect_meetings(&LinkResolver::new(), &events, None);
        let now: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 3, 10, 8, 57, 0).unwrap();
        assert!(meetings[0].is_soon_at(now));
        assert!(!meetings[0].is_soon_at(now - chrono::Duration::hours(1)));
    }
}

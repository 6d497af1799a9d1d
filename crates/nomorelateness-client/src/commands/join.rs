//! The `join` command: open every meeting that is about to start.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use nomorelateness_core::{LinkResolver, MeetingEvent, collect_meetings};
use nomorelateness_providers::CalendarProvider;
use tracing::{debug, warn};

use crate::actions;
use crate::config::ClientConfig;
use crate::error::ClientResult;

const START_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Opens each soon meeting and prints a line for it.
///
/// A link that fails to open does not stop the others; the first failure is
/// returned once every meeting has been handled.
pub async fn run(
    provider: &dyn CalendarProvider,
    config: &ClientConfig,
    dry_run: bool,
) -> ClientResult<()> {
    let now = Utc::now();
    let meetings = fetch_meetings(provider, config, now).await?;

    let mut first_failure = None;
    for meeting in select_joinable(&meetings, now) {
        if !dry_run && let Err(e) = actions::open_meeting(meeting) {
            warn!(summary = %meeting.summary, error = %e, "could not open meeting");
            if first_failure.is_none() {
                first_failure = Some(e);
            }
        }
        println!("{}", join_line(meeting, &Local));
    }

    first_failure.map_or(Ok(()), Err)
}

/// Fetches events and keeps the ones with a join link.
pub async fn fetch_meetings(
    provider: &dyn CalendarProvider,
    config: &ClientConfig,
    now: DateTime<Utc>,
) -> ClientResult<Vec<MeetingEvent>> {
    let events = provider.fetch_events(config.fetch.options(now)).await?;
    let meetings = collect_meetings(
        &LinkResolver::default(),
        &events,
        config.view.attendee_address.as_deref(),
    );
    debug!(events = events.len(), meetings = meetings.len(), "fetched meetings");
    Ok(meetings)
}

/// Meetings inside the join window at `now`, in calendar order.
pub fn select_joinable(meetings: &[MeetingEvent], now: DateTime<Utc>) -> Vec<&MeetingEvent> {
    meetings.iter().filter(|m| m.is_soon_at(now)).collect()
}

/// `summary,(start),<url>`
pub fn join_line<Tz>(meeting: &MeetingEvent, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{},({}),<{}>",
        meeting.summary,
        meeting.start.with_timezone(tz).format(START_FORMAT),
        meeting.link
    )
}

//! The `view` command: a table of upcoming online meetings.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use nomorelateness_core::{LinkResolver, TableOptions, collect_meetings, format_table};
use nomorelateness_providers::CalendarProvider;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Command-line overrides for `view`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewArgs {
    pub attendee_address: Option<String>,
    pub limit: Option<usize>,
}

/// Fetches upcoming events and prints them as a table in local time.
pub async fn run(
    provider: &dyn CalendarProvider,
    config: &ClientConfig,
    args: &ViewArgs,
) -> ClientResult<()> {
    let table = render(provider, config, args, Utc::now(), &Local).await?;
    print!("{}", table);
    Ok(())
}

/// Builds the `view` output as seen at `now`, with start times shown in `tz`.
///
/// No events, or no events with a conferencing link, gives an empty string.
pub async fn render<Tz>(
    provider: &dyn CalendarProvider,
    config: &ClientConfig,
    args: &ViewArgs,
    now: DateTime<Utc>,
    tz: &Tz,
) -> ClientResult<String>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut options = config.fetch.options(now);
    if let Some(limit) = args.limit {
        options = options.with_max_results(limit);
    }

    let events = provider.fetch_events(options).await?;
    let attendee = args
        .attendee_address
        .as_deref()
        .or(config.view.attendee_address.as_deref());
    let meetings = collect_meetings(&LinkResolver::default(), &events, attendee);
    debug!(
        provider = provider.name(),
        events = events.len(),
        meetings = meetings.len(),
        "rendering view"
    );

    let table_options = TableOptions::default()
        .with_max_link_length(config.view.max_link_length)
        .with_emphasis(config.view.emphasis());
    Ok(format_table(&meetings, now, tz, &table_options))
}

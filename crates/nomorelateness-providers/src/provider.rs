//! CalendarProvider trait definition.
//!
//! A provider turns a calendar backend into a list of
//! [`CalendarEvent`]s, owning authentication and paging along the way.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Duration, Utc};
use nomorelateness_core::CalendarEvent;

use crate::error::ProviderResult;

/// Options for fetching events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Lower bound (exclusive) for an event's end time.
    pub time_min: DateTime<Utc>,
    /// Upper bound (exclusive) for an event's start time.
    pub time_max: Option<DateTime<Utc>>,
    /// Maximum number of events to return.
    pub max_results: Option<usize>,
    /// Only fetch events from these calendars; `None` uses the provider's own list.
    pub calendar_ids: Option<Vec<String>>,
}

impl FetchOptions {
    /// Default number of events fetched for the CLI.
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    /// Default look-back so meetings that started recently are still listed.
    pub const DEFAULT_LOOKBACK_MINUTES: i64 = 60;

    /// Creates fetch options starting at `time_min`.
    pub fn new(time_min: DateTime<Utc>) -> Self {
        Self {
            time_min,
            time_max: None,
            max_results: None,
            calendar_ids: None,
        }
    }

    /// Upcoming events as seen at `now`: an hour of look-back and five events.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self::new(now - Duration::minutes(Self::DEFAULT_LOOKBACK_MINUTES))
            .with_max_results(Self::DEFAULT_MAX_RESULTS)
    }

    pub fn with_time_max(mut self, time_max: DateTime<Utc>) -> Self {
        self.time_max = Some(time_max);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    pub fn with_calendar_ids(mut self, ids: Vec<String>) -> Self {
        self.calendar_ids = Some(ids);
        self
    }
}

/// A boxed future for async trait methods.
///
/// Boxing keeps [`CalendarProvider`] usable as a trait object.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The abstraction for calendar backends.
///
/// Events come back ordered by start time, recurring events expanded into
/// single instances and cancelled events left out. Pagination is handled
/// inside the provider.
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g., "google:default").
    fn name(&self) -> &str;

    /// Fetches events matching `options`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures, etc.
    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>>;

    /// Refreshes the authentication tokens.
    ///
    /// Returns an error if refresh fails (e.g., refresh token is invalid).
    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>>;

    /// Checks if the provider holds usable credentials.
    fn is_authenticated(&self) -> bool;
}

/// A provider serving a fixed list of events.
///
/// Applies `time_min` against each event's end (or start) and `max_results`
/// the way a real backend would, which makes it handy in tests and for
/// replaying exported events.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: String,
    events: Vec<CalendarEvent>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, events: Vec<CalendarEvent>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }

    fn select(&self, options: &FetchOptions) -> Vec<CalendarEvent> {
        let mut events: Vec<CalendarEvent> = self
            .events
            .iter()
            .filter(|event| {
                let end = event.end.or(event.start).and_then(|t| t.as_datetime());
                end.is_none_or(|end| end > options.time_min)
            })
            .filter(|event| match (options.time_max, event.start.and_then(|t| t.as_datetime())) {
                (Some(max), Some(start)) => start < max,
                _ => true,
            })
            .cloned()
            .collect();

        events.sort_by_key(|event| event.start.and_then(|t| t.as_datetime()));
        if let Some(max) = options.max_results {
            events.truncate(max);
        }
        events
    }
}

impl CalendarProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        let events = self.select(&options);
        Box::pin(async move { Ok(events) })
    }

    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}

//! Core types: events, meeting link resolution, join window, formatting

pub mod event;
pub mod format;
pub mod links;
pub mod meetings;
pub mod time;
pub mod tracing;

pub use event::{
    Attendee, CalendarEvent, ConferenceEntryPoint, EventText, MeetingEvent, MeetingProvider,
    ResolvedMeeting, ResponseStatus,
};
pub use format::{TableOptions, format_table, truncate};
pub use links::{LinkResolver, MatchInput, MeetingMatcher, TeamsMatcher, WebexMatcher, ZoomMatcher};
pub use meetings::collect_meetings;
pub use time::{EventTime, JOIN_WINDOW_MINUTES, TimeError, is_soon, start_time};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

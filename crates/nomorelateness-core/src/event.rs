//! Event types for calendar events and resolved meetings.
//!
//! This module provides the core types shared by the resolver, the providers
//! and the CLI:
//! - [`CalendarEvent`]: an event as handed over by a calendar provider
//! - [`EventText`]: the borrowed text fields the link resolver works on
//! - [`ResolvedMeeting`]: the outcome of resolving one event's join link
//! - [`MeetingEvent`]: a resolved meeting paired with its event details

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::time::{self, EventTime};

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    NeedsAction,
    /// Unknown response status.
    #[default]
    Unknown,
}

impl ResponseStatus {
    /// Returns the label shown in the GOING column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "yes",
            Self::Declined => "no",
            Self::Tentative => "maybe",
            Self::NeedsAction => "?",
            Self::Unknown => "",
        }
    }
}

/// The conferencing provider a join link was resolved for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingProvider {
    Zoom,
    Teams,
    Webex,
    /// No provider matched.
    #[default]
    None,
}

impl MeetingProvider {
    /// Returns a human-readable name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Zoom => "Zoom",
            Self::Teams => "Microsoft Teams",
            Self::Webex => "Cisco Webex",
            Self::None => "None",
        }
    }
}

/// A structured conferencing entry point attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceEntryPoint {
    /// The type of entry point (e.g., "video", "phone", "sip").
    pub entry_point_type: String,
    /// The URI for this entry point.
    pub uri: String,
}

impl ConferenceEntryPoint {
    pub fn new(entry_point_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            entry_point_type: entry_point_type.into(),
            uri: uri.into(),
        }
    }

    /// Returns true for `video` entry points.
    pub fn is_video(&self) -> bool {
        self.entry_point_type == "video"
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// The attendee's email address.
    pub email: String,
    /// Whether this attendee entry represents the authenticated user.
    pub is_self: bool,
    /// The attendee's response status.
    pub response_status: ResponseStatus,
}

impl Attendee {
    pub fn new(email: impl Into<String>, response_status: ResponseStatus) -> Self {
        Self {
            email: email.into(),
            is_self: false,
            response_status,
        }
    }

    /// Marks this attendee as the authenticated user.
    pub fn as_self(mut self) -> Self {
        self.is_self = true;
        self
    }
}

/// A calendar event as delivered by a provider.
///
/// Text fields default to empty strings rather than `None`; the resolver
/// treats a missing location the same as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Provider-specific event identifier.
    pub id: String,
    /// The event title.
    pub summary: String,
    /// Free-text location.
    pub location: String,
    /// Free-text description (may contain HTML or angle-bracketed URLs).
    pub description: String,
    /// When the event starts, if the provider supplied a usable value.
    pub start: Option<EventTime>,
    /// When the event ends, if known.
    pub end: Option<EventTime>,
    /// Structured conferencing entry points, in provider order.
    #[serde(default)]
    pub entry_points: Vec<ConferenceEntryPoint>,
    /// Free-text notes attached to the conference data.
    pub conference_notes: Option<String>,
    /// Event attendees.
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl CalendarEvent {
    /// Creates a new event with an ID and title.
    pub fn new(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_start(mut self, start: EventTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: EventTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_entry_point(mut self, entry_point: ConferenceEntryPoint) -> Self {
        self.entry_points.push(entry_point);
        self
    }

    pub fn with_conference_notes(mut self, notes: impl Into<String>) -> Self {
        self.conference_notes = Some(notes.into());
        self
    }

    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Returns the text fields used for link resolution.
    pub fn text(&self) -> EventText<'_> {
        EventText {
            location: &self.location,
            description: &self.description,
            entry_points: &self.entry_points,
            conference_notes: self.conference_notes.as_deref(),
        }
    }

    /// Returns the response status of the given attendee.
    ///
    /// Without an address, the attendee flagged as `self` is used. Email
    /// comparison ignores ASCII case.
    pub fn response_for(&self, attendee: Option<&str>) -> ResponseStatus {
        self.attendees
            .iter()
            .find(|a| match attendee {
                Some(email) => a.email.eq_ignore_ascii_case(email),
                None => a.is_self,
            })
            .map(|a| a.response_status)
            .unwrap_or_default()
    }
}

/// The borrowed, unstructured text of one event.
#[derive(Debug, Clone, Copy)]
pub struct EventText<'a> {
    pub location: &'a str,
    pub description: &'a str,
    pub entry_points: &'a [ConferenceEntryPoint],
    pub conference_notes: Option<&'a str>,
}

impl<'a> EventText<'a> {
    /// Creates event text with no conference notes.
    pub fn new(
        location: &'a str,
        description: &'a str,
        entry_points: &'a [ConferenceEntryPoint],
    ) -> Self {
        Self {
            location,
            description,
            entry_points,
            conference_notes: None,
        }
    }

    pub fn with_conference_notes(mut self, notes: &'a str) -> Self {
        self.conference_notes = Some(notes);
        self
    }
}

/// The result of resolving an event's join link.
///
/// An unmatched result always carries [`MeetingProvider::None`] and no URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMeeting {
    /// The provider that matched.
    pub provider: MeetingProvider,
    /// The validated join URL.
    pub join_url: Option<Url>,
}

impl ResolvedMeeting {
    /// Validates a candidate link for the given provider.
    ///
    /// A candidate that does not parse as a URL yields an unmatched result.
    pub fn parse(provider: MeetingProvider, candidate: &str) -> Self {
        match Url::parse(candidate) {
            Ok(url) => Self {
                provider,
                join_url: Some(url),
            },
            Err(e) => {
                tracing::debug!(
                    provider = provider.display_name(),
                    candidate,
                    error = %e,
                    "matched link is not a valid URL"
                );
                Self::unmatched()
            }
        }
    }

    /// Returns the "no link found" result.
    pub fn unmatched() -> Self {
        Self::default()
    }

    /// Returns true if a provider matched and produced a valid URL.
    pub fn is_matched(&self) -> bool {
        self.provider != MeetingProvider::None && self.join_url.is_some()
    }

    /// Splits a matched result into its provider and URL.
    pub fn into_link(self) -> Option<(MeetingProvider, Url)> {
        match (self.provider, self.join_url) {
            (MeetingProvider::None, _) | (_, None) => None,
            (provider, Some(url)) => Some((provider, url)),
        }
    }
}

/// A calendar event that resolved to a join link.
///
/// Imminence is not stored: it is computed against the clock each time it is
/// asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingEvent {
    /// Provider-specific event identifier.
    pub id: String,
    /// The event title.
    pub summary: String,
    /// When the meeting starts.
    pub start: DateTime<Utc>,
    /// When the meeting ends, if known.
    pub end: Option<DateTime<Utc>>,
    /// The conferencing provider.
    pub provider: MeetingProvider,
    /// The join link.
    pub link: Url,
    /// The viewer's response to the invitation.
    pub response: ResponseStatus,
}

impl MeetingEvent {
    /// Returns true if the meeting is inside the join window at `now`.
    pub fn is_soon_at(&self, now: DateTime<Utc>) -> bool {
        time::is_soon(self.start, now)
    }

    /// Returns true if the meeting is inside the join window right now.
    pub fn is_soon(&self) -> bool {
        self.is_soon_at(Utc::now())
    }

    /// Returns true if the meeting has not started yet at `now`.
    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        self.start >= now
    }
}

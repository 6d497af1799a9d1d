//! Meeting link resolution.
//!
//! Turns the unstructured text of a calendar event into a single launchable
//! join link. Providers are tried in a fixed order by a [`LinkResolver`]; the
//! first [`MeetingMatcher`] that claims the event wins:
//!
//! 1. [`ZoomMatcher`] rewrites `https://<host>.zoom.us/j/<id>` links into a
//!    `zoommtg://` deep link, recovering the passcode when it can
//! 2. [`TeamsMatcher`] keeps `teams.microsoft.com` links as they are
//! 3. [`WebexMatcher`] keeps `webex.com/.../j.php` links as they are
//!
//! # Example
//!
//! ```
//! use nomorelateness_core::links::resolve;
//! use nomorelateness_core::{EventText, MeetingProvider};
//!
//! let text = EventText::new("", "Join: https://acme.zoom.us/j/12345?pwd=abc123", &[]);
//! let meeting = resolve(&text);
//! assert_eq!(meeting.provider, MeetingProvider::Zoom);
//! assert_eq!(
//!     meeting.join_url.unwrap().as_str(),
//!     "zoommtg://zoom.us/join?confno=12345&pwd=abc123"
//! );
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::event::{CalendarEvent, ConferenceEntryPoint, EventText, MeetingProvider, ResolvedMeeting};

/// Regex for Zoom join links: a numeric meeting ID or a personal link alias.
static ZOOM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://.*?zoom\.us/(?:j/(\d+)|my/(\S+))").expect("Invalid Zoom regex")
});

/// Regex for a passcode carried in a Zoom join link's `pwd` query parameter.
static ZOOM_PASSCODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://.*?zoom\.us/j/\S*?[?&]pwd=([^\s&#>"']+)"#)
        .expect("Invalid Zoom passcode regex")
});

/// Regex for Microsoft Teams links, up to the end of the line.
static TEAMS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://.*?teams\.microsoft\.com/.*").expect("Invalid Teams regex")
});

/// Regex for Cisco Webex `j.php` links closed by an angle bracket.
static WEBEX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://.*?webex\.com/.*j\.php.*>").expect("Invalid Webex regex")
});

/// Deep-link prefix that opens the native Zoom client.
const ZOOM_DEEP_LINK: &str = "zoommtg://zoom.us/join?confno=";

/// Word that marks the passcode line in conference notes.
const NOTES_PASSCODE_MARKER: &str = "Passcode";

/// Provider tokens that promote a video entry point into the search text.
const ENTRY_POINT_TOKENS: [&str; 2] = ["zoom", "teams"];

/// The text a matcher searches, assembled once per event.
#[derive(Debug, Clone)]
pub struct MatchInput<'a> {
    /// Video entry point URI (if any), location and description.
    search_text: String,
    /// The raw description.
    description: &'a str,
    /// Conference notes, if present.
    conference_notes: Option<&'a str>,
}

impl<'a> MatchInput<'a> {
    /// Builds the search text for an event.
    ///
    /// The searchable text is `location + " " + description`. A video entry
    /// point pointing at Zoom or Teams is put in front of it so structured
    /// conference data wins over free text without hiding the free text.
    pub fn new(text: &EventText<'a>) -> Self {
        let mut search_text = format!("{} {}", text.location, text.description);
        if let Some(uri) = video_entry_point_uri(text.entry_points) {
            search_text = format!("{} {}", uri, search_text);
        }

        Self {
            search_text,
            description: text.description,
            conference_notes: text.conference_notes,
        }
    }

    /// Returns the combined search text.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Returns the raw description.
    pub fn description(&self) -> &str {
        self.description
    }

    /// Returns the conference notes, if any.
    pub fn conference_notes(&self) -> Option<&str> {
        self.conference_notes
    }
}

/// A provider-specific link matcher.
///
/// Returning `Some` claims the event and stops the cascade, even when the
/// claimed link then fails URL validation. Returning `None` hands the event
/// to the next matcher.
pub trait MeetingMatcher: fmt::Debug + Send + Sync {
    /// The provider this matcher recognizes.
    fn provider(&self) -> MeetingProvider;

    /// Tries to extract a join link from the event text.
    fn try_match(&self, input: &MatchInput<'_>) -> Option<ResolvedMeeting>;
}

/// Matches Zoom links and builds `zoommtg://` deep links.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZoomMatcher;

impl MeetingMatcher for ZoomMatcher {
    fn provider(&self) -> MeetingProvider {
        MeetingProvider::Zoom
    }

    fn try_match(&self, input: &MatchInput<'_>) -> Option<ResolvedMeeting> {
        let caps = ZOOM_REGEX.captures(input.search_text())?;

        let Some(meeting_id) = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|id| id.parse::<u64>().is_ok())
        else {
            // TODO: decide whether personal links (zoom.us/my/<alias>) should
            // resolve to their https form instead of falling through.
            debug!(link = &caps[0], "zoom link without a meeting ID, trying next provider");
            return None;
        };

        let passcode = passcode_from_url(input.description()).or_else(|| {
            input
                .conference_notes()
                .and_then(passcode_from_notes)
                .map(|p| urlencoding::encode(&p).into_owned())
        });

        let mut link = format!("{}{}", ZOOM_DEEP_LINK, meeting_id);
        if let Some(ref pwd) = passcode {
            link.push_str("&pwd=");
            link.push_str(pwd);
        }

        debug!(meeting_id, has_passcode = passcode.is_some(), "matched zoom meeting");
        Some(ResolvedMeeting::parse(self.provider(), &link))
    }
}

/// Matches Microsoft Teams links in the description.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeamsMatcher;

impl MeetingMatcher for TeamsMatcher {
    fn provider(&self) -> MeetingProvider {
        MeetingProvider::Teams
    }

    fn try_match(&self, input: &MatchInput<'_>) -> Option<ResolvedMeeting> {
        let m = TEAMS_REGEX.find(input.description())?;
        let link = strip_closing_bracket(m.as_str());
        debug!(link, "matched teams meeting");
        Some(ResolvedMeeting::parse(self.provider(), link))
    }
}

/// Matches Cisco Webex links in the description.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebexMatcher;

impl MeetingMatcher for WebexMatcher {
    fn provider(&self) -> MeetingProvider {
        MeetingProvider::Webex
    }

    fn try_match(&self, input: &MatchInput<'_>) -> Option<ResolvedMeeting> {
        let m = WEBEX_REGEX.find(input.description())?;
        let link = strip_closing_bracket(m.as_str());
        debug!(link, "matched webex meeting");
        Some(ResolvedMeeting::parse(self.provider(), link))
    }
}

/// Ordered cascade of meeting matchers.
///
/// The resolver holds no state besides its matchers, so resolving the same
/// text twice always gives the same result.
#[derive(Debug)]
pub struct LinkResolver {
    matchers: Vec<Box<dyn MeetingMatcher>>,
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkResolver {
    /// Creates a resolver trying Zoom, then Teams, then Webex.
    pub fn new() -> Self {
        Self::with_matchers(vec![
            Box::new(ZoomMatcher),
            Box::new(TeamsMatcher),
            Box::new(WebexMatcher),
        ])
    }

    /// Creates a resolver with a custom matcher order.
    pub fn with_matchers(matchers: Vec<Box<dyn MeetingMatcher>>) -> Self {
        Self { matchers }
    }

    /// Returns the providers in the order they are tried.
    pub fn providers(&self) -> Vec<MeetingProvider> {
        self.matchers.iter().map(|m| m.provider()).collect()
    }

    /// Resolves the join link for the given event text.
    pub fn resolve(&self, text: &EventText<'_>) -> ResolvedMeeting {
        let input = MatchInput::new(text);

        for matcher in &self.matchers {
            trace!(provider = matcher.provider().display_name(), "trying matcher");
            if let Some(resolved) = matcher.try_match(&input) {
                return resolved;
            }
        }

        trace!("no meeting link found");
        ResolvedMeeting::unmatched()
    }

    /// Resolves the join link for a calendar event.
    pub fn resolve_event(&self, event: &CalendarEvent) -> ResolvedMeeting {
        self.resolve(&event.text())
    }
}

/// Process-wide resolver with the default cascade.
static DEFAULT_RESOLVER: LazyLock<LinkResolver> = LazyLock::new(LinkResolver::new);

/// Convenience function to resolve event text with the default cascade.
///
/// See [`LinkResolver::resolve`] for details.
pub fn resolve(text: &EventText<'_>) -> ResolvedMeeting {
    DEFAULT_RESOLVER.resolve(text)
}

/// Convenience function to resolve a calendar event with the default cascade.
pub fn resolve_event(event: &CalendarEvent) -> ResolvedMeeting {
    DEFAULT_RESOLVER.resolve_event(event)
}

/// Returns the URI of the first video entry point pointing at Zoom or Teams.
fn video_entry_point_uri(entry_points: &[ConferenceEntryPoint]) -> Option<&str> {
    entry_points
        .iter()
        .inspect(|ep| trace!(entry_point_type = %ep.entry_point_type, uri = %ep.uri, "entry point"))
        .find(|ep| ep.is_video() && ENTRY_POINT_TOKENS.iter().any(|t| ep.uri.contains(t)))
        .map(|ep| ep.uri.as_str())
}

/// Extracts the `pwd` value of the first Zoom join link in `text`.
fn passcode_from_url(text: &str) -> Option<String> {
    ZOOM_PASSCODE_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extracts a passcode from conference notes.
///
/// Looks at the first line mentioning `Passcode` and takes what follows the
/// next colon. Lines without a colon or with an empty value give `None`.
fn passcode_from_notes(notes: &str) -> Option<String> {
    let line = notes.lines().find(|l| l.contains(NOTES_PASSCODE_MARKER))?;
    let marker = line.find(NOTES_PASSCODE_MARKER)?;
    let (_, value) = line[marker..].split_once(':')?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Drops one trailing `>` left over from `<url>` wrapping in calendar text.
fn strip_closing_bracket(link: &str) -> &str {
    let link = link.trim_end();
    link.strip_suffix('>').unwrap_or(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(text: &str) -> ResolvedMeeting {
        resolve(&EventText::new("", text, &[]))
    }

    fn url_of(resolved: &ResolvedMeeting) -> &str {
        resolved.join_url.as_ref().map(|u| u.as_str()).unwrap_or("")
    }

    mod zoom {
        use super::*;

        #[test]
        fn builds_deep_link_without_passcode() {
            let resolved = description("Join https://x.zoom.us/j/12345");
            assert_eq!(resolved.provider, MeetingProvider::Zoom);
            assert_eq!(url_of(&resolved), "zoommtg://zoom.us/join?confno=12345");
        }

        #[test]
        fn url_passcode_is_appended() {
            let resolved = description("Join https://x.zoom.us/j/12345?pwd=abc123");
            assert_eq!(
                url_of(&resolved),
                "zoommtg://zoom.us/join?confno=12345&pwd=abc123"
            );
        }

        #[test]
        fn url_passcode_wins_over_notes() {
            let text = EventText::new("", "https://x.zoom.us/j/12345?pwd=abc123", &[])
                .with_conference_notes("Passcode: fromnotes");
            let resolved = resolve(&text);
            assert_eq!(
                url_of(&resolved),
                "zoommtg://zoom.us/join?confno=12345&pwd=abc123"
            );
        }

        #[test]
        fn notes_passcode_is_used_as_fallback() {
            let text = EventText::new("", "https://x.zoom.us/j/12345", &[])
                .with_conference_notes("Meeting details\nPasscode: 987654\n");
            let resolved = resolve(&text);
            assert_eq!(
                url_of(&resolved),
                "zoommtg://zoom.us/join?confno=12345&pwd=987654"
            );
        }

        #[test]
        fn notes_without_colon_degrade_to_id_only() {
            let text = EventText::new("", "https://x.zoom.us/j/12345", &[])
                .with_conference_notes("Passcode will be shared in chat");
            let resolved = resolve(&text);
            assert_eq!(url_of(&resolved), "zoommtg://zoom.us/join?confno=12345");
        }

        #[test]
        fn notes_with_empty_passcode_degrade_to_id_only() {
            let text = EventText::new("", "https://x.zoom.us/j/12345", &[])
                .with_conference_notes("Passcode:   ");
            let resolved = resolve(&text);
            assert_eq!(url_of(&resolved), "zoommtg://zoom.us/join?confno=12345");
        }

        #[test]
        fn only_first_link_is_used() {
            let resolved =
                description("https://a.zoom.us/j/111 and later https://b.zoom.us/j/222");
            assert_eq!(url_of(&resolved), "zoommtg://zoom.us/join?confno=111");
        }

        #[test]
        fn matches_in_location() {
            let text = EventText::new("https://acme.zoom.us/j/4242", "Weekly sync", &[]);
            let resolved = resolve(&text);
            assert_eq!(url_of(&resolved), "zoommtg://zoom.us/join?confno=4242");
        }

        #[test]
        fn video_entry_point_takes_priority() {
            let entry_points = [
                ConferenceEntryPoint::new("phone", "tel:+1-555-0100"),
                ConferenceEntryPoint::new("video", "https://acme.zoom.us/j/999"),
            ];
            let text = EventText::new("https://acme.zoom.us/j/111", "", &entry_points);
            let resolved = resolve(&text);
            assert_eq!(url_of(&resolved), "zoommtg://zoom.us/join?confno=999");
        }

        #[test]
        fn non_video_entry_point_is_ignored() {
            let entry_points = [ConferenceEntryPoint::new("more", "https://acme.zoom.us/j/999")];
            let text = EventText::new("", "nothing here", &entry_points);
            assert!(!resolve(&text).is_matched());
        }

        #[test]
        fn personal_link_without_fallback_is_unmatched() {
            let resolved = description("My room: https://acme.zoom.us/my/jdoe");
            assert!(!resolved.is_matched());
            assert_eq!(resolved.provider, MeetingProvider::None);
        }

        #[test]
        fn personal_link_falls_through_to_teams() {
            let resolved = description(
                "https://acme.zoom.us/my/jdoe\n<https://teams.microsoft.com/l/meetup-join/abc>",
            );
            assert_eq!(resolved.provider, MeetingProvider::Teams);
            assert_eq!(
                url_of(&resolved),
                "https://teams.microsoft.com/l/meetup-join/abc"
            );
        }

        #[test]
        fn oversized_meeting_id_falls_through() {
            let resolved = description("https://x.zoom.us/j/123456789012345678901234567890");
            assert!(!resolved.is_matched());
        }
    }

    mod teams {
        use super::*;

        #[test]
        fn strips_trailing_bracket() {
            let resolved = description(
                "Click here to join\n<https://contoso.teams.microsoft.com/l/meetup-join/19%3ameeting_abc%40thread.v2/0>\n",
            );
            assert_eq!(resolved.provider, MeetingProvider::Teams);
            assert_eq!(
                url_of(&resolved),
                "https://contoso.teams.microsoft.com/l/meetup-join/19%3ameeting_abc%40thread.v2/0"
            );
        }

        #[test]
        fn keeps_link_without_bracket() {
            let resolved =
                description("https://teams.microsoft.com/l/meetup-join/19%3ameeting_x/0");
            assert_eq!(
                url_of(&resolved),
                "https://teams.microsoft.com/l/meetup-join/19%3ameeting_x/0"
            );
        }

        #[test]
        fn location_is_not_searched() {
            let text = EventText::new("https://teams.microsoft.com/l/meetup-join/abc", "", &[]);
            assert!(!resolve(&text).is_matched());
        }

        #[test]
        fn link_runs_to_end_of_line() {
            let resolved = description(
                "<https://teams.microsoft.com/l/meetup-join/abc> or dial in\nnext line",
            );
            assert_eq!(
                url_of(&resolved),
                "https://teams.microsoft.com/l/meetup-join/abc%3E%20or%20dial%20in"
            );
        }

        #[test]
        fn zoom_wins_over_teams() {
            let resolved = description(
                "https://teams.microsoft.com/l/meetup-join/abc\nhttps://x.zoom.us/j/12345",
            );
            assert_eq!(resolved.provider, MeetingProvider::Zoom);
        }
    }

    mod webex {
        use super::*;

        #[test]
        fn matches_bracketed_join_link() {
            let resolved =
                description("Join meeting <https://acme.webex.com/acme/j.php?MTID=m1234abcd>");
            assert_eq!(resolved.provider, MeetingProvider::Webex);
            assert_eq!(
                url_of(&resolved),
                "https://acme.webex.com/acme/j.php?MTID=m1234abcd"
            );
        }

        #[test]
        fn requires_closing_bracket() {
            let resolved = description("https://acme.webex.com/acme/j.php?MTID=m1234abcd");
            assert!(!resolved.is_matched());
        }

        #[test]
        fn link_runs_to_last_bracket_on_line() {
            let resolved =
                description("Join <https://acme.webex.com/acme/j.php?MTID=m1> or <call>");
            assert_eq!(
                url_of(&resolved),
                "https://acme.webex.com/acme/j.php?MTID=m1%3E%20or%20%3Ccall"
            );
        }

        #[test]
        fn teams_wins_over_webex() {
            let resolved = description(
                "<https://acme.webex.com/acme/j.php?MTID=m1>\n<https://teams.microsoft.com/l/meetup-join/abc>",
            );
            assert_eq!(resolved.provider, MeetingProvider::Teams);
        }
    }

    mod cascade {
        use super::*;

        #[test]
        fn no_provider_is_unmatched() {
            let entry_points = [ConferenceEntryPoint::new("video", "https://meet.google.com/abc")];
            let text = EventText::new("Room 101", "Lunch with https://example.com", &entry_points);
            let resolved = resolve(&text);
            assert!(!resolved.is_matched());
            assert_eq!(resolved, ResolvedMeeting::unmatched());
        }

        #[test]
        fn resolution_is_idempotent() {
            let text = EventText::new("", "https://x.zoom.us/j/12345?pwd=abc123", &[])
                .with_conference_notes("Passcode: other");
            assert_eq!(resolve(&text), resolve(&text));
        }

        #[test]
        fn invalid_url_claims_and_stops() {
            // The Teams match is not a URL; Webex must not be tried.
            let resolved = description(
                "https://bad host teams.microsoft.com/x\n<https://acme.webex.com/acme/j.php?MTID=m1>",
            );
            assert!(!resolved.is_matched());
        }

        #[test]
        fn custom_matcher_order() {
            let resolver =
                LinkResolver::with_matchers(vec![Box::new(TeamsMatcher), Box::new(ZoomMatcher)]);
            assert_eq!(
                resolver.providers(),
                vec![MeetingProvider::Teams, MeetingProvider::Zoom]
            );

            let text = EventText::new(
                "",
                "https://teams.microsoft.com/l/meetup-join/abc\nhttps://x.zoom.us/j/12345",
                &[],
            );
            assert_eq!(resolver.resolve(&text).provider, MeetingProvider::Teams);
        }

        #[test]
        fn resolves_calendar_event() {
            let event = CalendarEvent::new("evt-1", "Standup")
                .with_entry_point(ConferenceEntryPoint::new("video", "https://acme.zoom.us/j/777"))
                .with_conference_notes("Passcode: s3cret");
            let resolved = resolve_event(&event);
            assert_eq!(
                url_of(&resolved),
                "zoommtg://zoom.us/join?confno=777&pwd=s3cret"
            );
        }
    }

    mod passcodes {
        use super::*;

        #[test]
        fn notes_passcode_after_marker() {
            assert_eq!(
                passcode_from_notes("Meeting ID: 123 456 Passcode: xyz"),
                Some("xyz".to_string())
            );
        }

        #[test]
        fn notes_without_marker() {
            assert_eq!(passcode_from_notes("Meeting ID: 123"), None);
        }

        #[test]
        fn notes_passcode_is_percent_encoded_in_link() {
            let text = EventText::new("", "https://x.zoom.us/j/12345", &[])
                .with_conference_notes("Passcode: a&b");
            let resolved = resolve(&text);
            assert_eq!(
                url_of(&resolved),
                "zoommtg://zoom.us/join?confno=12345&pwd=a%26b"
            );
        }

        #[test]
        fn url_passcode_stops_at_next_parameter() {
            assert_eq!(
                passcode_from_url("https://x.zoom.us/j/1?pwd=abc&uname=me"),
                Some("abc".to_string())
            );
        }

        #[test]
        fn url_passcode_requires_join_link() {
            assert_eq!(passcode_from_url("https://x.zoom.us/my/me?pwd=abc"), None);
        }
    }
}

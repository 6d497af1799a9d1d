//! Meeting actions: launching join links.

use nomorelateness_core::MeetingEvent;
use tracing::info;

use crate::error::{ClientError, ClientResult};

/// Opens a meeting's join link with the system handler.
///
/// `zoommtg://` links go straight to the Zoom client; https links open in
/// the default browser.
pub fn open_meeting(meeting: &MeetingEvent) -> ClientResult<()> {
    info!(summary = %meeting.summary, url = %meeting.link, "opening meeting link");
    open::that(meeting.link.as_str()).map_err(|e| {
        ClientError::Action(format!("failed to open {}: {}", meeting.link, e))
    })
}

//! Table rendering for the `view` command.
//!
//! Columns are `START SOON EVENT GOING LINK`, left aligned on terminal
//! display width and separated by two spaces. With emphasis enabled, rows that are soon and the first row
//! that has not started yet are wrapped in ANSI bold.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use unicode_width::UnicodeWidthStr;

use crate::event::MeetingEvent;

/// Column headers, in display order.
pub const HEADERS: [&str; 5] = ["START", "SOON", "EVENT", "GOING", "LINK"];

const COLUMN_SEPARATOR: &str = "  ";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Options controlling table output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    /// Links longer than this many characters are cut.
    pub max_link_length: usize,
    /// Whether to emphasise rows with ANSI bold.
    pub emphasis: bool,
    /// strftime format for the START column.
    pub time_format: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            max_link_length: 80,
            emphasis: false,
            time_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl TableOptions {
    #[must_use]
    pub fn with_emphasis(mut self, emphasis: bool) -> Self {
        self.emphasis = emphasis;
        self
    }

    #[must_use]
    pub fn with_max_link_length(mut self, max_link_length: usize) -> Self {
        self.max_link_length = max_link_length;
        self
    }
}

/// Renders meetings as a table, with start times shown in `tz`.
///
/// Returns an empty string when there is nothing to show.
pub fn format_table<Tz>(
    meetings: &[MeetingEvent],
    now: DateTime<Utc>,
    tz: &Tz,
    options: &TableOptions,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if meetings.is_empty() {
        return String::new();
    }

    let rows: Vec<[String; 5]> = meetings
        .iter()
        .map(|m| {
            [
                m.start
                    .with_timezone(tz)
                    .format(&options.time_format)
                    .to_string(),
                m.is_soon_at(now).to_string(),
                m.summary.clone(),
                m.response.label().to_string(),
                truncate(m.link.as_str(), options.max_link_length).into_owned(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.width());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let mut out = render_line(&HEADERS, &widths);
    out.push('\n');

    let mut upcoming = 0;
    for (meeting, row) in meetings.iter().zip(&rows) {
        if meeting.is_upcoming_at(now) {
            upcoming += 1;
        }
        let line = render_line(row, &widths);
        if options.emphasis && (meeting.is_soon_at(now) || upcoming == 1) {
            out.push_str(BOLD);
            out.push_str(&line);
            out.push_str(RESET);
        } else {
            out.push_str(&line);
        }
        out.push('\n');
    }

    out
}

fn render_line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let last = cells.len().saturating_sub(1);
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            let cell = cell.as_ref();
            if i == last {
                cell.to_string()
            } else {
                // `{:<w$}` pads by chars, wide glyphs take two columns
                let pad = width.saturating_sub(cell.width());
                format!("{}{}", cell, " ".repeat(pad))
            }
        })
        .collect::<Vec<_>>()
        .join(COLUMN_SEPARATOR);
    line.trim_end().to_string()
}

/// Cuts `s` to at most `max_len` characters.
pub fn truncate(s: &str, max_len: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => Cow::Borrowed(&s[..idx]),
        None => Cow::Borrowed(s),
    }
}

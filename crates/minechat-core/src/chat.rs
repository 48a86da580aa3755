//! Chat lines and their persisted history form.

use chrono::{DateTime, TimeZone};
use std::fmt;

/// `strftime` pattern for history timestamps (`DD.MM.YY HH:MM`).
pub const HISTORY_TIMESTAMP_FORMAT: &str = "%d.%m.%y %H:%M";

/// One line read from the live feed.
///
/// Immutable once read; trailing whitespace (including the line terminator)
/// has already been stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    text: String,
}

impl ChatLine {
    /// Creates a line, stripping trailing whitespace.
    pub fn new(raw: &str) -> Self {
        Self {
            text: raw.trim_end().to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A history log entry: timestamp taken at write time plus the line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEntry {
    pub timestamp: String,
    pub text: String,
}

impl PersistedEntry {
    /// Builds an entry stamped with the given wall-clock time.
    pub fn at<Tz>(text: impl Into<String>, now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            timestamp: now.format(HISTORY_TIMESTAMP_FORMAT).to_string(),
            text: text.into(),
        }
    }

    /// Renders the entry as one newline-terminated log line.
    pub fn to_line(&self) -> String {
        format!("[{}] {}\n", self.timestamp, self.text)
    }
}

/// Formats `text` as a history log line stamped with `now`.
pub fn format_entry<Tz>(text: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    PersistedEntry::at(text, now).to_line()
}

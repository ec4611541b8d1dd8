//! Server-time parsing and formatting for the IRCv3 `server-time` capability.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::message::ParsedLine;

/// Parse an IRCv3 server-time string.
///
/// Accepts RFC 3339 timestamps like `2023-01-01T12:00:00.000Z`.
pub fn parse_server_time(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a time as an IRCv3 server-time string (`2023-01-01T12:00:00.000Z`).
pub fn format_server_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp that is either unix seconds or RFC 3339.
///
/// Ban lists and WHOIS replies use unix seconds; some servers send RFC 3339
/// instead. Zero and negative unix values are rejected.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(unix) = value.parse::<i64>() {
        return if unix > 0 {
            DateTime::from_timestamp(unix, 0)
        } else {
            None
        };
    }
    parse_server_time(value)
}

/// Time a line was sent: its `time` tag when that parses, else `received`.
pub fn line_time(line: &ParsedLine, received: DateTime<Utc>) -> DateTime<Utc> {
    line.tag("time")
        .and_then(parse_server_time)
        .unwrap_or(received)
}

//! Message events delivered to subscribers and collected from history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::ircv3::server_time::line_time;
use crate::message::ParsedLine;

/// Tag keys carrying the id of the message being replied or reacted to.
pub const REPLY_TAGS: &[&str] = &["+draft/reply", "+reply", "reply"];
/// Tag keys carrying a reaction.
pub const REACT_TAGS: &[&str] = &["+draft/react", "+react", "react"];

/// A channel `PRIVMSG` or `TAGMSG`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageEvent {
    /// Target as sent (a channel, or our nick for private messages).
    pub channel: String,
    pub author: String,
    /// Message text; empty for `TAGMSG`.
    pub content: String,
    /// Server-assigned `msgid` tag.
    pub msgid: Option<String>,
    pub reply_to: Option<String>,
    pub reaction: Option<String>,
    pub tags: HashMap<String, String>,
    /// `time` tag when present and valid, otherwise the receive time.
    pub timestamp: DateTime<Utc>,
}

/// A message replayed inside a `chathistory` batch.
pub type HistoryMessage = MessageEvent;

impl MessageEvent {
    /// Build an event from a `PRIVMSG`/`TAGMSG` line.
    pub fn from_line(line: &ParsedLine, received: DateTime<Utc>) -> MessageEvent {
        MessageEvent {
            channel: line.param(0).to_string(),
            author: line.nickname().to_string(),
            content: line.trailing.clone(),
            msgid: line.tag_any(&["msgid"]).map(str::to_string),
            reply_to: line.tag_any(REPLY_TAGS).map(str::to_string),
            reaction: line.tag_any(REACT_TAGS).map(str::to_string),
            tags: line.tags.clone(),
            timestamp: line_time(line, received),
        }
    }

    /// Whether `line` carries a message event.
    pub fn is_message(line: &ParsedLine) -> bool {
        line.is("PRIVMSG") || line.is("TAGMSG")
    }
}

//! IRCv3 capability negotiation support.
//!
//! The client requests capabilities one at a time with `CAP REQ` and only
//! records a capability once the server ACKs it.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use crate::message::ParsedLine;

/// Capabilities requested after `CAP LS`, in request order.
pub const REQUESTED_CAPABILITIES: &[&str] = &[
    "message-tags",
    "echo-message",
    "draft/message-redaction",
    "server-time",
    "batch",
    "draft/chathistory",
];

/// Server verdict on a `CAP REQ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapStatus {
    Ack,
    Nak,
}

/// A parsed `CAP <target> ACK|NAK :<caps>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapReply {
    pub status: CapStatus,
    /// Capability names with any `~`/`-` modifier stripped.
    pub names: Vec<String>,
}

impl CapReply {
    /// Decode an ACK/NAK line; `None` for any other line.
    pub fn from_line(line: &ParsedLine) -> Option<CapReply> {
        if !line.is("CAP") {
            return None;
        }
        let status = match line.param(1).to_ascii_uppercase().as_str() {
            "ACK" => CapStatus::Ack,
            "NAK" => CapStatus::Nak,
            _ => return None,
        };
        let names = line
            .text_from(2)
            .split(' ')
            .filter(|cap| !cap.is_empty())
            .map(|cap| strip_modifier(cap).to_string())
            .collect();
        Some(CapReply { status, names })
    }

    /// Whether this reply covers capability `name`.
    pub fn covers(&self, name: &str) -> bool {
        let name = strip_modifier(name);
        self.names.iter().any(|cap| cap.eq_ignore_ascii_case(name))
    }
}

fn strip_modifier(cap: &str) -> &str {
    cap.strip_prefix(['~', '-']).unwrap_or(cap)
}

/// Whether `line` is a `CAP <target> LS` reply.
pub fn is_ls_reply(line: &ParsedLine) -> bool {
    line.is("CAP") && line.param(1).eq_ignore_ascii_case("LS")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_ack_with_modifiers() {
        let line = ParsedLine::parse(":srv CAP me ACK :~echo-message -batch");
        let reply = CapReply::from_line(&line).unwrap();
        assert_eq!(reply.status, CapStatus::Ack);
        assert!(reply.covers("echo-message"));
        assert!(reply.covers("batch"));
        assert!(!reply.covers("server-time"));
    }

    #[test]
    fn test_cap_nak_is_case_insensitive() {
        let line = ParsedLine::parse(":srv CAP * nak :draft/chathistory");
        let reply = CapReply::from_line(&line).unwrap();
        assert_eq!(reply.status, CapStatus::Nak);
        assert!(reply.covers("draft/chathistory"));
    }

    #[test]
    fn test_cap_payload_without_trailing() {
        let line = ParsedLine::parse(":srv CAP * ACK server-time");
        let reply = CapReply::from_line(&line).unwrap();
        assert!(reply.covers("server-time"));
    }

    #[test]
    fn test_ls_is_not_a_reply() {
        let line = ParsedLine::parse(":srv CAP * LS :batch server-time");
        assert!(CapReply::from_line(&line).is_none());
        assert!(is_ls_reply(&line));
    }
}

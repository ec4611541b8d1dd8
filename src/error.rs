//! Error types for the IRC client.
//!
//! Parsing never fails, so the only protocol-level errors are framing
//! problems raised by the byte-stream codec. Request/response operations
//! report through [`WaitError`] and [`Reply`]; only `connect()` surfaces a
//! hard error.

use std::time::Duration;

use thiserror::Error;

use crate::message::ParsedLine;
use crate::response::Response;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Framing errors on a line-oriented byte stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded maximum allowed length.
    #[error("message too long: {0} bytes")]
    MessageTooLong(usize),

    /// Illegal control character in an outbound line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),
}

/// Why a waiter finished without a match.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum WaitError {
    /// No line matched before the deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The connection closed while waiting.
    #[error("connection closed")]
    Closed,

    /// The transport reported an error while waiting.
    #[error("transport error: {0}")]
    Transport(String),
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout(_))
    }
}

/// Errors returned by `Client::connect`.
#[cfg(feature = "tokio")]
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The transport could not be opened.
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Registration did not complete.
    #[error("registration failed: {0}")]
    Registration(#[source] WaitError),

    /// Another `connect()` is already in progress.
    #[error("connect already in progress")]
    Busy,
}

/// An authoritative negative answer from the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Refusal {
    /// A numeric error reply such as `482 ERR_CHANOPRIVSNEEDED`.
    Numeric(Response),
    /// An IRCv3 `FAIL <command> <code> ...` standard reply.
    Fail { command: String, code: String },
}

impl Refusal {
    /// Decode a refusal from a numeric error or `FAIL` line.
    pub fn from_line(line: &ParsedLine) -> Option<Refusal> {
        if line.is("FAIL") {
            return Some(Refusal::Fail {
                command: line.param(0).to_string(),
                code: line.param(1).to_string(),
            });
        }
        Response::from_line(line)
            .filter(Response::is_error)
            .map(Refusal::Numeric)
    }
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Refusal::Numeric(resp) => write!(f, "{}", resp),
            Refusal::Fail { command, code } => write!(f, "FAIL {} {}", command, code),
        }
    }
}

/// Outcome of a request the server either confirms or refuses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply<T> {
    Confirmed(T),
    Refused(Refusal),
}

impl<T> Reply<T> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Reply::Confirmed(_))
    }

    /// The confirmed value, discarding a refusal.
    pub fn confirmed(self) -> Option<T> {
        match self {
            Reply::Confirmed(value) => Some(value),
            Reply::Refused(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_from_numeric() {
        let line = ParsedLine::parse(":srv 482 me #chan :You're not channel operator");
        assert_eq!(
            Refusal::from_line(&line),
            Some(Refusal::Numeric(Response::ERR_CHANOPRIVSNEEDED))
        );
        let ok = ParsedLine::parse(":srv 332 me #chan :topic");
        assert_eq!(Refusal::from_line(&ok), None);
    }

    #[test]
    fn test_refusal_from_fail() {
        let line = ParsedLine::parse(":srv FAIL REDACT UNKNOWN_MSGID #chan abc :No such message");
        let refusal = Refusal::from_line(&line).unwrap();
        assert_eq!(refusal.to_string(), "FAIL REDACT UNKNOWN_MSGID");
    }

    #[test]
    fn test_reply_helpers() {
        let reply: Reply<u8> = Reply::Confirmed(3);
        assert!(reply.is_confirmed());
        assert_eq!(reply.confirmed(), Some(3));
        let refused: Reply<u8> = Reply::Refused(Refusal::Numeric(Response::ERR_NOSUCHCHANNEL));
        assert_eq!(refused.confirmed(), None);
    }

    #[test]
    fn test_wait_error_display() {
        let err = WaitError::Timeout(Duration::from_secs(5));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timed out after 5s");
    }
}

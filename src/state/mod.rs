//! Sans-IO connection state for the IRC client.
//!
//! This module holds the passive half of the client: a [`Session`] consumes
//! parsed lines and produces actions (lines to send, messages to deliver).
//! It does not perform I/O, keep timers or know about waiters, which keeps
//! it easy to unit test without a network.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use chrono::Utc;
//! use slirc_client::state::{Session, SessionAction};
//! use slirc_client::ParsedLine;
//!
//! let mut session = Session::new("testbot", "irc.example.com");
//!
//! let ping = ParsedLine::parse("PING :irc.example.com");
//! let actions = session.feed(&ping, Instant::now(), Utc::now());
//! assert_eq!(actions[0], SessionAction::Send("PONG :irc.example.com".into()));
//!
//! let join = ParsedLine::parse(":testbot!bot@host JOIN #rust");
//! let _ = session.feed(&join, Instant::now(), Utc::now());
//! let names = ParsedLine::parse(":srv 366 testbot #rust :End of /NAMES list.");
//! let _ = session.feed(&names, Instant::now(), Utc::now());
//! assert!(session.channels().is_joined("#rust"));
//! ```

mod channels;
mod event;
mod session;

pub use self::channels::{ChannelTable, CollectorOwner, NamesCollector};
pub use self::event::{HistoryMessage, MessageEvent, REACT_TAGS, REPLY_TAGS};
pub use self::session::{is_registration_signal, PendingPing, Session, SessionAction};

/// Lifecycle of one client connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// Initial state, not yet connected.
    #[default]
    Disconnected,
    /// Transport open, CAP negotiation and registration in progress.
    Registering,
    /// Registration complete.
    Connected,
    /// Closed by `disconnect()` or by the transport.
    Closed,
}

impl ConnectionState {
    /// Whether a new `connect()` may start from this state.
    pub fn can_connect(self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed)
    }
}

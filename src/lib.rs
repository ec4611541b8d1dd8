//! # slirc-client
//!
//! An IRCv3 client adapter: it drives one connection over a line-oriented
//! transport and turns the server's asynchronous line stream into typed
//! request/response operations.
//!
//! ## Features
//!
//! - Tolerant line parsing with IRCv3 tags, prefixes and trailing text
//! - Capability negotiation (`CAP LS 302` / `CAP REQ` / `CAP END`)
//! - `chathistory` batches, echoed messages, replies, reactions and redaction
//! - Waiters that correlate each request with the numeric or echo answering it
//! - Channel membership tracking with NAMES collection
//! - Latency probes and automatic PONG replies
//! - TCP, TLS, WebSocket and in-memory transports (with the `tokio` feature)
//!
//! The sans-IO layers ([`message`], [`caps`], [`ircv3`], [`state`]) compile
//! without any runtime; [`client`] and [`transport`] need the `tokio` feature.

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing and building lines
//!
//! ```rust
//! use slirc_client::{build_command, ParsedLine};
//!
//! let line = ParsedLine::parse("@msgid=abc :nick!user@host PRIVMSG #rust :Hello!");
//! assert_eq!(line.command, "PRIVMSG");
//! assert_eq!(line.nickname(), "nick");
//! assert_eq!(line.tag("msgid"), Some("abc"));
//!
//! assert_eq!(build_command("PRIVMSG", &["#rust"], Some("hi there")), "PRIVMSG #rust :hi there");
//! ```
//!
//! ### Talking to a server
//!
//! ```no_run
//! use slirc_client::{Client, ClientConfig, TcpTransport};
//!
//! # async fn run() -> Result<(), slirc_client::ClientError> {
//! let client = Client::new(ClientConfig::new("ferris"), TcpTransport::new("irc.example.com", 6667));
//! client.connect().await?;
//! if client.join_channel("#rust").await {
//!     let msgid = client.send_message("#rust", "hello from Rust").await;
//!     println!("sent {:?}", msgid);
//! }
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod caps;
pub mod casemap;
pub mod chan;
pub mod error;
pub mod ircv3;
pub mod message;
pub mod prefix;
pub mod response;
pub mod state;

#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::caps::{CapReply, CapStatus, REQUESTED_CAPABILITIES};
pub use self::casemap::irc_eq;
pub use self::chan::{ban_mask_for, normalize_channel, MemberRank, NamesEntry};
pub use self::error::{ProtocolError, Refusal, Reply, WaitError};
pub use self::ircv3::{format_server_time, generate_ping_token, parse_server_time};
pub use self::message::{
    build_command, build_tag_string, check_outbound, with_tags, ParsedLine, MAX_IRC_LINE_LEN,
};
pub use self::prefix::parse_nickname;
pub use self::response::Response;
pub use self::state::{ConnectionState, HistoryMessage, MessageEvent, Session};

#[cfg(feature = "tokio")]
pub use self::client::{BanEntry, Client, ClientConfig, HistoryCursor, Timeouts, WhoisInfo};
#[cfg(feature = "tokio")]
pub use self::error::ClientError;
#[cfg(feature = "tokio")]
pub use self::transport::{
    MemoryListener, MemoryServer, MemoryTransport, TcpTransport, Transport, TransportError,
    WebSocketTransport,
};

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::casemap::irc_eq;
use crate::ircv3::batch::{closing_ref, BatchTable};
use crate::ircv3::generate_ping_token;
use crate::message::{build_command, ParsedLine};
use crate::response::Response;

use super::channels::ChannelTable;
use super::event::MessageEvent;

/// Actions produced by [`Session::feed`].
///
/// The caller is responsible for carrying them out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Send this line to the server.
    Send(String),
    /// Deliver a live message to subscribers.
    Deliver(MessageEvent),
    /// The line was fully handled here (PING, batched message) and must not
    /// be offered to waiters.
    Absorbed,
}

/// An outstanding latency probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPing {
    pub token: String,
    pub sent_at: Instant,
}

fn registration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\s(001|376|422)\s").ok())
        .as_ref()
}

/// Whether `line` signals completed registration: `001`, `376` or `422`,
/// either as the parsed command or anywhere in the raw text between
/// whitespace (tolerates lines the parser could not make sense of).
pub fn is_registration_signal(line: &ParsedLine) -> bool {
    if Response::from_line(line).is_some_and(|r| r.is_registration_signal()) {
        return true;
    }
    registration_pattern().is_some_and(|re| re.is_match(&line.raw))
}

/// Passive per-connection protocol state.
///
/// Every inbound line is fed through [`Session::feed`], independent of any
/// waiter that may also consume it. The session tracks our nickname and
/// user modes, negotiated capabilities, channel membership and NAMES
/// collection, open history batches and the latency probe.
#[derive(Clone, Debug)]
pub struct Session {
    nick: String,
    user_modes: String,
    capabilities: HashSet<String>,
    channels: ChannelTable,
    batches: BatchTable,
    pending_ping: Option<PendingPing>,
    latency: Option<Duration>,
    saw_registration: bool,
    server_name: String,
}

impl Session {
    #[must_use]
    pub fn new(nick: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user_modes: String::new(),
            capabilities: HashSet::new(),
            channels: ChannelTable::new(),
            batches: BatchTable::new(),
            pending_ping: None,
            latency: None,
            saw_registration: false,
            server_name: server_name.into(),
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn user_modes(&self) -> &str {
        &self.user_modes
    }

    /// Last measured round-trip time.
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn pending_ping(&self) -> Option<&PendingPing> {
        self.pending_ping.as_ref()
    }

    /// Whether a registration signal has been seen on this connection.
    pub fn saw_registration(&self) -> bool {
        self.saw_registration
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut ChannelTable {
        &mut self.channels
    }

    pub fn batches(&self) -> &BatchTable {
        &self.batches
    }

    pub fn batches_mut(&mut self) -> &mut BatchTable {
        &mut self.batches
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// Negotiated capabilities, sorted.
    pub fn capabilities(&self) -> Vec<String> {
        let mut caps: Vec<_> = self.capabilities.iter().cloned().collect();
        caps.sort();
        caps
    }

    /// Record a capability the server ACKed.
    pub fn enable_capability(&mut self, name: &str) {
        self.capabilities.insert(name.to_string());
    }

    /// Whether `nick` is us.
    pub fn is_me(&self, nick: &str) -> bool {
        irc_eq(nick, &self.nick)
    }

    /// Forget per-connection state before a new connection is registered.
    ///
    /// The nickname and user modes survive.
    pub fn reset(&mut self) {
        self.capabilities.clear();
        self.channels.clear();
        self.batches.clear();
        self.pending_ping = None;
        self.saw_registration = false;
    }

    /// Start a latency probe and return the `PING` line to send.
    ///
    /// Returns `None` while another probe is outstanding, unless that probe
    /// is older than `stale_after`.
    pub fn begin_probe(&mut self, now: Instant, stale_after: Duration) -> Option<String> {
        if let Some(pending) = &self.pending_ping {
            if now.saturating_duration_since(pending.sent_at) < stale_after {
                return None;
            }
        }
        let token = generate_ping_token();
        let line = build_command::<&str>("PING", &[], Some(token.as_str()));
        self.pending_ping = Some(PendingPing {
            token,
            sent_at: now,
        });
        Some(line)
    }

    /// Feed an inbound line to the tracker.
    ///
    /// `now` times latency probes; `received` stamps messages that carry no
    /// `time` tag.
    #[must_use]
    pub fn feed(
        &mut self,
        line: &ParsedLine,
        now: Instant,
        received: DateTime<Utc>,
    ) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if is_registration_signal(line) {
            self.saw_registration = true;
        }

        match line.command.to_ascii_uppercase().as_str() {
            "PING" => {
                let token = match line.text_from(0) {
                    token if token.is_empty() => self.server_name.clone(),
                    token => token,
                };
                actions.push(SessionAction::Send(build_command::<&str>(
                    "PONG",
                    &[],
                    Some(token.as_str()),
                )));
                actions.push(SessionAction::Absorbed);
            }
            "PONG" => self.on_pong(line, now),
            "001" if !line.param(0).is_empty() => self.nick = line.param(0).to_string(),
            "NICK" if self.is_me(line.nickname()) => {
                let next = line.text_from(0);
                if !next.is_empty() {
                    self.nick = next;
                }
            }
            "221" => {
                self.user_modes = match line.param(1) {
                    "" => line.trailing.clone(),
                    modes => modes.to_string(),
                };
            }
            "MODE" if self.is_me(line.param(0)) => {
                let change = line.text_from(1);
                self.user_modes = apply_mode_change(&self.user_modes, &change);
            }
            "JOIN" if self.is_me(line.nickname()) => {
                let channel = match line.trailing.as_str() {
                    "" => line.param(0),
                    channel => channel,
                };
                self.channels.on_self_join(channel);
            }
            "PART" if self.is_me(line.nickname()) => {
                self.channels.on_self_part(line.param(0));
            }
            "KICK" if self.is_me(line.param(1)) => {
                self.channels.on_self_part(line.param(0));
            }
            "353" => self.channels.on_names_reply(line.param(2), &line.trailing),
            "366" => {
                self.channels.on_end_of_names(line.param(1));
            }
            "BATCH" => self.batches.open(line),
            "PRIVMSG" | "TAGMSG" => {
                if self.batches.absorb(line, received) {
                    actions.push(SessionAction::Absorbed);
                } else {
                    actions.push(SessionAction::Deliver(MessageEvent::from_line(
                        line, received,
                    )));
                }
            }
            _ => {}
        }

        actions
    }

    /// Finish processing `line` after waiters have seen it: a history batch
    /// closed without a waiter to claim it is discarded.
    pub fn settle(&mut self, line: &ParsedLine) {
        if let Some(reference) = closing_ref(line) {
            self.batches.close(reference);
        }
    }

    fn on_pong(&mut self, line: &ParsedLine, now: Instant) {
        let Some(pending) = &self.pending_ping else {
            return;
        };
        let token = match line.trailing.as_str() {
            "" => line.param(1),
            token => token,
        };
        if token == pending.token {
            self.latency = Some(now.saturating_duration_since(pending.sent_at));
            self.pending_ping = None;
        }
    }
}

/// Apply a `+x-y` style change to a user mode string like `+iw`.
fn apply_mode_change(current: &str, change: &str) -> String {
    let mut modes: Vec<char> = current.chars().filter(|c| *c != '+').collect();
    let mut adding = true;
    for c in change.chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            ' ' => break,
            c if adding => {
                if !modes.contains(&c) {
                    modes.push(c);
                }
            }
            c => modes.retain(|m| *m != c),
        }
    }
    if modes.is_empty() {
        String::new()
    } else {
        std::iter::once('+').chain(modes).collect()
    }
}

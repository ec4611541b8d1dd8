//! Async client over a single [`Transport`].
//!
//! A [`Client`] owns one connection at a time. Inbound lines are handled by
//! a reader task in three steps: the passive [`Session`] tracker runs first
//! (PING/PONG, nick and channel bookkeeping, batches), then message
//! subscribers are notified, then the line is offered to pending waiters.
//!
//! Every request/response operation registers a waiter before sending its
//! command, so an answer cannot race past it. Those operations never return
//! an error: a timeout, refusal or missing connection collapses into a
//! negative result (`false`, `None`, an empty list). Only
//! [`connect`](Client::connect) reports failure.
//!
//! # Example
//!
//! ```no_run
//! use slirc_client::client::{Client, ClientConfig};
//! use slirc_client::transport::TcpTransport;
//!
//! # async fn run() -> Result<(), slirc_client::ClientError> {
//! let client = Client::new(ClientConfig::new("ferris"), TcpTransport::new("irc.libera.chat", 6667));
//! client.connect().await?;
//! client.join_channel("#rust").await;
//! client.send_message("#rust", "hello").await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::caps::{is_ls_reply, CapReply, CapStatus};
use crate::error::{ClientError, WaitError};
use crate::message::{build_command, ParsedLine};
use crate::state::{is_registration_signal, ConnectionState, MessageEvent, Session, SessionAction};
use crate::transport::{LineSender, Transport, TransportError, TransportEvent};

mod channels;
mod config;
mod events;
mod messaging;
mod moderation;
mod query;
mod waiter;

pub use self::channels::HistoryCursor;
pub use self::config::{ClientConfig, Timeouts};
pub use self::events::{Direction, RawLogEntry, Subscription, RAW_LOG_CAPACITY};
pub use self::messaging::MessageWait;
pub use self::moderation::BanEntry;
pub use self::query::WhoisInfo;
pub use self::waiter::Waiting;

use self::events::{EventHub, RawLog};
use self::waiter::{Ticket, WaiterRegistry};

/// State shared between client handles and background tasks.
pub(crate) struct Shared {
    config: ClientConfig,
    transport: Box<dyn Transport>,
    pub(crate) state: Mutex<State>,
}

pub(crate) struct State {
    session: Session,
    pub(crate) waiters: WaiterRegistry,
    messages: EventHub<MessageEvent>,
    raw_log: RawLog,
    link: Option<LineSender>,
    lifecycle: ConnectionState,
    connected_at: Option<DateTime<Utc>>,
    /// Bumped on every `connect()`; events from older connections are ignored.
    generation: u64,
    reader: Option<JoinHandle<()>>,
    prober: Option<JoinHandle<()>>,
}

impl State {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        let link = self.link.as_ref().ok_or(TransportError::NotConnected)?;
        link.send(line)?;
        self.raw_log.record(Direction::Out, line);
        Ok(())
    }

    fn shutdown(&mut self, err: WaitError) {
        if let Some(prober) = self.prober.take() {
            prober.abort();
        }
        if let Some(link) = self.link.take() {
            link.close();
        }
        self.waiters.reject_all(err);
        self.messages.drop_transient();
        self.lifecycle = ConnectionState::Closed;
    }
}

impl Shared {
    fn handle_line(&self, raw: &str, generation: u64) {
        let line = ParsedLine::parse(raw);
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.generation != generation {
            return;
        }
        state.raw_log.record(Direction::In, raw);

        let actions = state
            .session
            .feed(&line, Instant::now().into_std(), Utc::now());
        let mut absorbed = false;
        for action in actions {
            match action {
                SessionAction::Send(reply) => {
                    if let Err(err) = state.send(&reply) {
                        debug!(error = %err, "automatic reply not sent");
                    }
                }
                SessionAction::Deliver(event) => state.messages.publish(&event),
                SessionAction::Absorbed => absorbed = true,
            }
        }

        state.waiters.expire(Instant::now());
        if !absorbed {
            state.waiters.dispatch(&line, &mut state.session);
        }
        state.session.settle(&line);
        if line.is("BATCH") {
            debug!(batch = line.param(0), open = state.session.batches().len(), "batch marker");
        }
    }

    fn handle_error(&self, err: &TransportError, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        warn!(error = %err, "transport error");
        state.waiters.reject_all(WaitError::Transport(err.to_string()));
    }

    fn handle_closed(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        if state.link.is_some() {
            info!("connection closed by transport");
        }
        state.shutdown(WaitError::Closed);
        state.reader = None;
    }

    fn probe(&self) {
        let mut state = self.state.lock();
        if state.lifecycle != ConnectionState::Connected {
            return;
        }
        let stale_after = self.config.timeouts.latency_interval;
        if let Some(ping) = state.session.begin_probe(Instant::now().into_std(), stale_after) {
            if let Err(err) = state.send(&ping) {
                debug!(error = %err, "latency probe not sent");
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(task) = state.prober.take() {
            task.abort();
        }
        if let Some(task) = state.reader.take() {
            task.abort();
        }
        if let Some(link) = state.link.take() {
            link.close();
        }
    }
}

async fn read_loop(
    owner: Weak<Shared>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    generation: u64,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = owner.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Line(raw) => shared.handle_line(&raw, generation),
            TransportEvent::Error(err) => shared.handle_error(&err, generation),
            TransportEvent::Closed => break,
        }
    }
    if let Some(shared) = owner.upgrade() {
        shared.handle_closed(generation);
    }
}

async fn probe_latency(owner: Weak<Shared>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(shared) = owner.upgrade() else {
            return;
        };
        shared.probe();
    }
}

/// Handle to an IRC connection. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("nick", &self.current_nick())
            .field("state", &self.state())
            .finish()
    }
}

impl Client {
    pub fn new(config: ClientConfig, transport: impl Transport) -> Client {
        let session = Session::new(config.nickname.clone(), config.server_name.clone());
        let state = State {
            session,
            waiters: WaiterRegistry::new(),
            messages: EventHub::new(),
            raw_log: RawLog::new(RAW_LOG_CAPACITY),
            link: None,
            lifecycle: ConnectionState::Disconnected,
            connected_at: None,
            generation: 0,
            reader: None,
            prober: None,
        };
        Client {
            shared: Arc::new(Shared {
                config,
                transport: Box::new(transport),
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Open the transport, negotiate capabilities and register.
    ///
    /// Resolves once the server sends `001`, `376` or `422`. Calling it
    /// again while connected is a no-op; calling it after the connection
    /// closed starts a fresh connection with fresh per-connection state.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let generation = {
            let mut state = self.lock();
            match state.lifecycle {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Registering => return Err(ClientError::Busy),
                ConnectionState::Disconnected | ConnectionState::Closed => {}
            }
            state.lifecycle = ConnectionState::Registering;
            state.generation += 1;
            state.session.reset();
            state.connected_at = None;
            if let Some(task) = state.reader.take() {
                task.abort();
            }
            state.generation
        };

        let config = &self.shared.config;
        info!(nick = %config.nickname, "connecting");
        let link = match self.shared.transport.connect().await {
            Ok(link) => link,
            Err(err) => {
                warn!(error = %err, "transport failed to open");
                let mut state = self.lock();
                if state.generation == generation {
                    state.lifecycle = ConnectionState::Closed;
                }
                return Err(err.into());
            }
        };

        let (registered, cap_ls) = {
            let mut state = self.lock();
            if state.lifecycle != ConnectionState::Registering {
                link.sender.close();
                return Err(ClientError::Registration(WaitError::Closed));
            }
            state.link = Some(link.sender);
            let registered = state
                .waiters
                .register(config.timeouts.registration, |line, _| {
                    is_registration_signal(line).then_some(())
                });
            let cap_ls = state
                .waiters
                .register(config.timeouts.cap_ls, |line, _| is_ls_reply(line).then_some(()));
            state.reader = Some(tokio::spawn(read_loop(
                Arc::downgrade(&self.shared),
                link.events,
                generation,
            )));

            let mut handshake = vec!["CAP LS 302".to_string()];
            if let Some(password) = &config.password {
                handshake.push(build_command::<&str>("PASS", &[], Some(password.as_str())));
            }
            handshake.push(build_command("NICK", &[&config.nickname], None));
            handshake.push(build_command(
                "USER",
                &[config.username.as_str(), "0", "*"],
                Some(config.realname.as_str()),
            ));
            for line in &handshake {
                if let Err(err) = state.send(line) {
                    debug!(error = %err, "handshake line not sent");
                }
            }
            (self.waiting(registered), self.waiting(cap_ls))
        };

        if cap_ls.wait().await.is_ok() {
            self.negotiate_capabilities().await;
        } else {
            debug!("no CAP LS reply, registering without capabilities");
        }
        if let Err(err) = self.send_raw("CAP END") {
            debug!(error = %err, "CAP END not sent");
        }

        let outcome = registered.wait().await;
        let saw_registration = self.lock().session.saw_registration();

        let mut state = self.lock();
        if let Err(err) = outcome {
            if !saw_registration {
                warn!(error = %err, "registration failed");
                if state.lifecycle == ConnectionState::Registering {
                    state.shutdown(WaitError::Closed);
                }
                return Err(ClientError::Registration(err));
            }
            warn!(error = %err, "registration waiter failed after a registration signal; continuing");
        }
        if state.lifecycle != ConnectionState::Registering {
            return Err(ClientError::Registration(WaitError::Closed));
        }

        state.lifecycle = ConnectionState::Connected;
        state.connected_at = Some(Utc::now());
        let period = config.timeouts.latency_interval;
        if !period.is_zero() {
            state.prober = Some(tokio::spawn(probe_latency(
                Arc::downgrade(&self.shared),
                period,
            )));
        }
        info!(nick = %state.session.nick(), caps = ?state.session.capabilities(), "registered");
        Ok(())
    }

    async fn negotiate_capabilities(&self) {
        let timeout = self.shared.config.timeouts.cap_reply;
        for name in &self.shared.config.request_caps {
            let wanted = name.clone();
            let request = build_command("CAP", &["REQ"], Some(name.as_str()));
            let Some(waiting) = self.request(&request, timeout, move |line, _| {
                CapReply::from_line(line)
                    .filter(|reply| reply.covers(&wanted))
                    .map(|reply| reply.status)
            }) else {
                return;
            };
            match waiting.wait().await {
                Ok(CapStatus::Ack) => {
                    self.lock().session.enable_capability(name);
                    debug!(capability = %name, "capability acknowledged");
                }
                Ok(CapStatus::Nak) => debug!(capability = %name, "capability rejected"),
                Err(err) => debug!(capability = %name, error = %err, "no reply to capability request"),
            }
        }
    }

    /// Close the connection. Idempotent.
    ///
    /// Pending waiters are rejected with [`WaitError::Closed`].
    pub fn disconnect(&self) {
        let mut state = self.lock();
        if state.link.is_some() {
            info!("disconnecting");
        }
        state.shutdown(WaitError::Closed);
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().lifecycle
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Our nickname as last confirmed by the server.
    pub fn current_nick(&self) -> String {
        self.lock().session.nick().to_string()
    }

    pub fn user_modes(&self) -> String {
        self.lock().session.user_modes().to_string()
    }

    /// Round-trip time of the last answered latency probe.
    pub fn latency(&self) -> Option<Duration> {
        self.lock().session.latency()
    }

    /// When registration last completed.
    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.lock().connected_at
    }

    /// Capabilities acknowledged on this connection, sorted.
    pub fn capabilities(&self) -> Vec<String> {
        self.lock().session.capabilities()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.lock().session.has_capability(name)
    }

    /// Channels we are in, sorted.
    pub fn joined_channels(&self) -> Vec<String> {
        self.lock().session.channels().joined_channels()
    }

    /// The most recent raw lines in both directions, oldest first.
    pub fn raw_log(&self) -> Vec<RawLogEntry> {
        self.lock().raw_log.snapshot()
    }

    /// Number of waiters still pending.
    pub fn pending_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Subscribe to every channel or private `PRIVMSG`/`TAGMSG` outside a
    /// history batch. The subscription outlives reconnects.
    pub fn on_message(&self) -> Subscription<MessageEvent> {
        self.lock().messages.subscribe()
    }

    /// Subscribe to raw lines as they are received and sent.
    pub fn on_raw_line(&self) -> Subscription<RawLogEntry> {
        self.lock().raw_log.subscribe()
    }

    /// Send a raw protocol line.
    pub fn send_raw(&self, line: &str) -> Result<(), TransportError> {
        self.lock().send(line)
    }

    /// Wait for the first inbound line accepted by `predicate`.
    ///
    /// The waiter is registered immediately, so a command sent after this
    /// call cannot race past it.
    pub fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Waiting<ParsedLine>
    where
        F: FnMut(&ParsedLine) -> bool + Send + 'static,
    {
        let ticket = self
            .lock()
            .waiters
            .register(timeout, move |line, _| predicate(line).then(|| line.clone()));
        self.waiting(ticket)
    }

    /// Send a latency probe now, unless one is already outstanding.
    pub fn measure_latency(&self) {
        self.shared.probe();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock()
    }

    fn timeouts(&self) -> &Timeouts {
        &self.shared.config.timeouts
    }

    fn waiting<T>(&self, ticket: Ticket<T>) -> Waiting<T> {
        ticket.into_waiting(Arc::downgrade(&self.shared))
    }

    /// Register `matcher`, then send `line`. `None` when the line could not
    /// be sent.
    fn request<T, F>(&self, line: &str, timeout: Duration, matcher: F) -> Option<Waiting<T>>
    where
        T: Send + 'static,
        F: FnMut(&ParsedLine, &mut Session) -> Option<T> + Send + 'static,
    {
        let ticket = {
            let mut state = self.lock();
            let ticket = state.waiters.register(timeout, matcher);
            if let Err(err) = state.send(line) {
                debug!(error = %err, "request not sent");
                state.waiters.remove(ticket.id());
                return None;
            }
            ticket
        };
        Some(self.waiting(ticket))
    }
}

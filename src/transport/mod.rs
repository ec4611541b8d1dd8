//! Line-oriented transports.
//!
//! The client needs only a duplex stream of already-framed lines. A
//! [`Transport`] opens one and hands back a [`Link`]: a [`LineSender`] for
//! outbound lines and a single-consumer receiver of [`TransportEvent`]s.
//!
//! Shipped implementations:
//! - [`TcpTransport`]: plain TCP or TLS (`tokio-rustls`) framed by [`LineCodec`]
//! - [`WebSocketTransport`]: text frames over `tokio-tungstenite`
//! - [`MemoryTransport`]: an in-process pair for tests and demos

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::message::check_outbound;

mod codec;
mod error;
mod memory;
mod tcp;
mod websocket;

pub use self::codec::LineCodec;
pub use self::error::TransportError;
pub use self::memory::{MemoryListener, MemoryServer, MemoryTransport};
pub use self::tcp::TcpTransport;
pub use self::websocket::WebSocketTransport;

pub use crate::message::MAX_IRC_LINE_LEN;

/// Something that can open a line-oriented connection to a server.
pub trait Transport: Send + Sync + 'static {
    /// Open the connection. Resolves once it is established.
    fn connect(&self) -> BoxFuture<'_, Result<Link, TransportError>>;
}

/// Events delivered by an open connection, in order.
#[derive(Debug)]
#[non_exhaustive]
pub enum TransportEvent {
    /// One complete inbound line, without its terminator.
    Line(String),
    /// The connection failed. A `Closed` event follows.
    Error(TransportError),
    /// The connection is gone.
    Closed,
}

/// An open connection.
#[derive(Debug)]
pub struct Link {
    pub sender: LineSender,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

#[derive(Debug)]
pub(crate) enum Outgoing {
    Line(String),
    Close,
}

/// Handle for writing lines to an open connection.
#[derive(Clone, Debug)]
pub struct LineSender {
    tx: mpsc::UnboundedSender<Outgoing>,
    closed: Arc<AtomicBool>,
}

impl LineSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue `line` for sending.
    ///
    /// Fails once the connection is closed, and with
    /// [`TransportError::Protocol`] for a line that cannot be framed (see
    /// [`check_outbound`]). A refused line leaves the connection open.
    pub fn send(&self, line: impl Into<String>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::NotConnected);
        }
        let line = line.into();
        check_outbound(&line)?;
        self.tx
            .send(Outgoing::Line(line))
            .map_err(|_| TransportError::NotConnected)
    }

    /// Ask the connection to close. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(Outgoing::Close);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

/// Wire a split duplex connection to a [`Link`].
///
/// Spawns a reader task forwarding decoded lines and a writer task draining
/// the outbound queue. The writer shuts the connection down on
/// [`LineSender::close`] or when every sender is dropped.
pub(crate) fn spawn_link<R, W, E>(mut reader: R, writer: W) -> Link
where
    R: Stream<Item = Result<String, E>> + Send + Unpin + 'static,
    W: Sink<String> + Send + Unpin + 'static,
    W::Error: Into<TransportError>,
    E: Into<TransportError>,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let reader_events = event_tx.clone();
    let read_task = tokio::spawn(async move {
        while let Some(item) = reader.next().await {
            match item {
                Ok(line) => {
                    trace!("<- {}", line);
                    if reader_events.send(TransportEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let err = err.into();
                    warn!("transport read failed: {}", err);
                    let _ = reader_events.send(TransportEvent::Error(err));
                    break;
                }
            }
        }
        let _ = reader_events.send(TransportEvent::Closed);
    });

    tokio::spawn(write_loop(writer, out_rx, event_tx, read_task));

    Link {
        sender: LineSender::new(out_tx),
        events: event_rx,
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<TransportEvent>,
    read_task: JoinHandle<()>,
) where
    W: Sink<String> + Unpin,
    W::Error: Into<TransportError>,
{
    while let Some(item) = outgoing.recv().await {
        match item {
            Outgoing::Line(line) => {
                if let Err(err) = check_outbound(&line) {
                    warn!("dropping outbound line: {}", err);
                    continue;
                }
                trace!("-> {}", line);
                if let Err(err) = writer.send(line).await {
                    let err = err.into();
                    if let TransportError::Protocol(err) = &err {
                        warn!("dropping outbound line: {}", err);
                        continue;
                    }
                    warn!("transport write failed: {}", err);
                    let _ = events.send(TransportEvent::Error(err));
                    break;
                }
            }
            Outgoing::Close => break,
        }
    }
    let _ = writer.close().await;
    read_task.abort();
    let _ = events.send(TransportEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use futures_util::{sink, stream};

    fn recording_link() -> (Link, mpsc::UnboundedReceiver<String>) {
        let (written_tx, written_rx) = mpsc::unbounded_channel::<String>();
        let reader = stream::pending::<Result<String, TransportError>>();
        let writer = Box::pin(sink::unfold(written_tx, |tx, line: String| async move {
            tx.send(line).map_err(|_| TransportError::NotConnected)?;
            Ok::<_, TransportError>(tx)
        }));
        (spawn_link(reader, writer), written_rx)
    }

    #[tokio::test]
    async fn test_refused_line_leaves_link_open() {
        let (link, mut written) = recording_link();
        assert!(matches!(
            link.sender.send("PRIVMSG #c :a\r\nQUIT"),
            Err(TransportError::Protocol(ProtocolError::IllegalControlChar('\r')))
        ));
        assert!(matches!(
            link.sender.send("x".repeat(MAX_IRC_LINE_LEN + 1)),
            Err(TransportError::Protocol(ProtocolError::MessageTooLong(_)))
        ));
        assert!(!link.sender.is_closed());

        link.sender.send("PRIVMSG #c :ok").unwrap();
        assert_eq!(written.recv().await.as_deref(), Some("PRIVMSG #c :ok"));
    }

    #[tokio::test]
    async fn test_writer_skips_unframeable_line() {
        let (mut link, mut written) = recording_link();
        link.sender
            .tx
            .send(Outgoing::Line("PRIVMSG #c :a\0b".into()))
            .unwrap();
        link.sender.send("PRIVMSG #c :next").unwrap();
        assert_eq!(written.recv().await.as_deref(), Some("PRIVMSG #c :next"));
        assert!(link.events.try_recv().is_err());
    }
}

//! In-process transport.
//!
//! Every `connect()` creates a fresh channel pair and hands the server half
//! to the [`MemoryListener`], so a test can script a server line by line and
//! observe reconnects.

use futures_util::future::BoxFuture;
use futures_util::{sink, stream};
use tokio::sync::mpsc;

use super::{spawn_link, Link, Transport, TransportError};

type ToClient = mpsc::UnboundedSender<Result<String, TransportError>>;

/// Client half of an in-process connection.
#[derive(Debug)]
pub struct MemoryTransport {
    accept_tx: mpsc::UnboundedSender<MemoryServer>,
}

/// Accepts the server half of each connection opened by a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryListener {
    accept_rx: mpsc::UnboundedReceiver<MemoryServer>,
}

/// Server half of one in-process connection.
#[derive(Debug)]
pub struct MemoryServer {
    to_client: Option<ToClient>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryTransport {
    pub fn pair() -> (MemoryTransport, MemoryListener) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        (MemoryTransport { accept_tx }, MemoryListener { accept_rx })
    }
}

impl Transport for MemoryTransport {
    fn connect(&self) -> BoxFuture<'_, Result<Link, TransportError>> {
        Box::pin(async move {
            let (to_client, client_rx) = mpsc::unbounded_channel();
            let (client_tx, from_client) = mpsc::unbounded_channel::<String>();

            self.accept_tx
                .send(MemoryServer {
                    to_client: Some(to_client),
                    from_client,
                })
                .map_err(|_| TransportError::NotConnected)?;

            let reader = Box::pin(stream::unfold(client_rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }));
            let writer = Box::pin(sink::unfold(client_tx, |tx, line: String| async move {
                tx.send(line).map_err(|_| TransportError::NotConnected)?;
                Ok::<_, TransportError>(tx)
            }));

            Ok(spawn_link(reader, writer))
        })
    }
}

impl MemoryListener {
    /// Wait for the client to connect. `None` once the transport is dropped.
    pub async fn accept(&mut self) -> Option<MemoryServer> {
        self.accept_rx.recv().await
    }
}

impl MemoryServer {
    /// Next line written by the client; `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// A line the client already wrote, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Deliver `line` to the client. Returns `false` once the connection is gone.
    pub fn send(&self, line: impl Into<String>) -> bool {
        match &self.to_client {
            Some(tx) => tx.send(Ok(line.into())).is_ok(),
            None => false,
        }
    }

    /// Close the connection from the server side.
    pub fn close(&mut self) {
        self.to_client = None;
    }

    /// Fail the connection with `err`, then close it.
    pub fn fail(&mut self, err: TransportError) {
        if let Some(tx) = self.to_client.take() {
            let _ = tx.send(Err(err));
        }
    }
}

//! Transport error types.

use thiserror::Error;

use crate::error::ProtocolError;

/// Errors raised while opening or using a transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A framing error occurred.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The WebSocket layer failed.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The TLS handshake failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// The transport is not (or no longer) connected.
    #[error("not connected")]
    NotConnected,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

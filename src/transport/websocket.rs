//! WebSocket transport.
//!
//! Each text frame may carry one line, several `\n`-separated lines, or a
//! line without a terminator; all of them are delivered as complete lines.
//! Outbound lines go out one per text frame without a CRLF; a line with an
//! embedded CR or LF is refused by [`LineSender::send`](super::LineSender::send).

use futures_util::future::{self, BoxFuture};
use futures_util::{stream, SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::error::ProtocolError;

use super::{spawn_link, Link, Transport, TransportError, MAX_IRC_LINE_LEN};

/// Subprotocol for text-frame IRC over WebSocket.
pub const IRCV3_TEXT_SUBPROTOCOL: &str = "text.ircv3.net";

/// Line transport over a WebSocket (`ws://` or `wss://`).
#[derive(Clone, Debug)]
pub struct WebSocketTransport {
    url: String,
    subprotocol: Option<String>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subprotocol: Some(IRCV3_TEXT_SUBPROTOCOL.to_string()),
        }
    }

    /// Override (or with `None`, omit) the requested subprotocol.
    pub fn with_subprotocol(mut self, subprotocol: Option<String>) -> Self {
        self.subprotocol = subprotocol;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Split one text frame into lines.
fn frame_lines(text: &str) -> Vec<Result<String, TransportError>> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.len() > MAX_IRC_LINE_LEN {
                Err(ProtocolError::MessageTooLong(line.len()).into())
            } else {
                Ok(line.to_string())
            }
        })
        .collect()
}

impl Transport for WebSocketTransport {
    fn connect(&self) -> BoxFuture<'_, Result<Link, TransportError>> {
        Box::pin(async move {
            let mut request = self.url.as_str().into_client_request()?;
            if let Some(subprotocol) = &self.subprotocol {
                let value = HeaderValue::from_str(subprotocol)
                    .map_err(|e| TransportError::WebSocket(e.to_string()))?;
                request.headers_mut().insert("Sec-WebSocket-Protocol", value);
            }

            let (socket, _response) = connect_async(request).await?;
            debug!(url = %self.url, "websocket connected");
            let (write, read) = socket.split::<WsMessage>();

            let lines = read
                .map(|frame| match frame {
                    Ok(WsMessage::Text(text)) => frame_lines(&text),
                    Ok(WsMessage::Binary(_)) => {
                        warn!("Ignoring binary WebSocket frame (IRC is text-only)");
                        Vec::new()
                    }
                    Ok(_) => Vec::new(),
                    Err(e) => vec![Err(TransportError::from(e))],
                })
                .flat_map(stream::iter);

            // Lines reaching the writer have passed `check_outbound`, so a
            // frame never carries a line break.
            let writer = write.with(|line: String| {
                future::ready(Ok::<_, tokio_tungstenite::tungstenite::Error>(
                    WsMessage::Text(line),
                ))
            });

            Ok(spawn_link(Box::pin(lines), Box::pin(writer)))
        })
    }
}

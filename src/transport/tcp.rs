//! TCP and TLS transport.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use super::{spawn_link, LineCodec, Link, Transport, TransportError};

struct TlsSettings {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

/// Line transport over TCP, optionally wrapped in TLS.
pub struct TcpTransport {
    host: String,
    port: u16,
    tls: Option<TlsSettings>,
}

impl TcpTransport {
    /// Plain-text connection to `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: None,
        }
    }

    /// TLS connection to `host:port`, verifying the certificate against `host`.
    pub fn tls(
        host: impl Into<String>,
        port: u16,
        connector: TlsConnector,
    ) -> Result<Self, TransportError> {
        let host = host.into();
        let server_name = ServerName::try_from(host.as_str())
            .map(|name| name.to_owned())
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        Ok(Self::new(host, port).with_tls(connector, server_name))
    }

    /// Use TLS with an explicit server name.
    pub fn with_tls(mut self, connector: TlsConnector, server_name: ServerName<'static>) -> Self {
        self.tls = Some(TlsSettings {
            connector,
            server_name,
        });
        self
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.is_tls())
            .finish()
    }
}

fn framed_link<S>(stream: S) -> Link
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (sink, stream) = Framed::new(stream, LineCodec::new()).split::<String>();
    spawn_link(stream, sink)
}

impl Transport for TcpTransport {
    fn connect(&self) -> BoxFuture<'_, Result<Link, TransportError>> {
        Box::pin(async move {
            let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
            if let Err(e) = Self::enable_keepalive(&stream) {
                warn!("failed to enable TCP keepalive: {}", e);
            }

            let Some(tls) = &self.tls else {
                debug!(host = %self.host, port = self.port, "tcp connected");
                return Ok(framed_link(stream));
            };

            let stream = tls
                .connector
                .connect(tls.server_name.clone(), stream)
                .await
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            debug!(host = %self.host, port = self.port, "tls connected");
            Ok(framed_link(stream))
        })
    }
}

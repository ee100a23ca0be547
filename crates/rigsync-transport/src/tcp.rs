//! TCP transport for rig daemons.
//!
//! [`TcpTransport`] implements [`Transport`] over a `tokio` socket and is
//! what the rigctld driver runs on. [`TcpConnector`] is the
//! production [`Connector`] that creates them.
//!
//! # Example
//!
//! ```no_run
//! use rigsync_transport::TcpTransport;
//! use rigsync_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> rigsync_core::Result<()> {
//! let mut transport = TcpTransport::connect("localhost:4532").await?;
//! transport.send(b"f\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use rigsync_core::error::{ConnectFailureReason, Error, Result};
use rigsync_core::transport::{Connector, Transport};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport to a rig daemon.
#[derive(Debug)]
pub struct TcpTransport {
    /// `None` after `close()`.
    stream: Option<TcpStream>,
    addr: String,
}

impl TcpTransport {
    /// Connect to `host:port` with the default timeout.
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to `host:port`, giving up after `timeout`.
    ///
    /// Failures are reported as [`Error::Connect`] with the reason the
    /// settings UI needs: host not found, refused, or timed out.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        tracing::debug!(
            addr = %addr,
            timeout_ms = timeout.as_millis(),
            "Connecting to TCP endpoint"
        );

        let stream = tokio::time::timeout(timeout, connect_any(addr))
            .await
            .map_err(|_| {
                tracing::warn!(addr = %addr, "TCP connection timed out");
                Error::Connect(ConnectFailureReason::Timeout)
            })??;

        // Rig commands are small and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        tracing::info!(addr = %addr, "TCP connection established");

        Ok(Self {
            stream: Some(stream),
            addr: addr.to_string(),
        })
    }

    /// Wrap an already-connected stream (e.g. accepted in a test).
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        tracing::debug!(addr = %addr, "Wrapping existing TCP stream");
        Self {
            stream: Some(stream),
            addr,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

/// Resolve `addr` and try each resolved address in turn.
async fn connect_any(addr: &str) -> Result<TcpStream> {
    let resolved: Vec<SocketAddr> = tokio::net::lookup_host(addr)
        .await
        .map_err(|e| {
            tracing::warn!(addr = %addr, error = %e, "Host lookup failed");
            Error::Connect(ConnectFailureReason::HostNotFound)
        })?
        .collect();
    if resolved.is_empty() {
        return Err(Error::Connect(ConnectFailureReason::HostNotFound));
    }

    let mut last_err = None;
    for socket_addr in resolved {
        match TcpStream::connect(socket_addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(addr = %socket_addr, error = %e, "TCP connect attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(match last_err {
        Some(e) => map_connect_error(e),
        None => Error::Connect(ConnectFailureReason::HostNotFound),
    })
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(addr = %self.addr, bytes = data.len(), "Sending data");

        stream.write_all(data).await.map_err(|e| {
            tracing::warn!(addr = %self.addr, error = %e, "Failed to send data");
            map_io_error(e)
        })?;
        stream.flush().await.map_err(map_io_error)?;
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, stream.read(buf)).await {
            Ok(Ok(0)) => {
                tracing::warn!(addr = %self.addr, "Peer closed connection (0 bytes read)");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(addr = %self.addr, bytes = n, "Received data");
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::warn!(addr = %self.addr, error = %e, "Failed to receive data");
                Err(map_io_error(e))
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!(addr = %self.addr, "Closing TCP connection");
            if let Err(e) = stream.shutdown().await {
                tracing::debug!(
                    addr = %self.addr,
                    error = %e,
                    "Failed to shutdown TCP stream (continuing anyway)"
                );
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Opens [`TcpTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: &str, timeout: Duration) -> Result<Box<dyn Transport>> {
        let transport = TcpTransport::connect_with_timeout(addr, timeout).await?;
        Ok(Box::new(transport))
    }
}

/// Map a connection-time I/O error to a connect failure reason.
fn map_connect_error(e: std::io::Error) -> Error {
    let reason = match e.kind() {
        ErrorKind::ConnectionRefused => ConnectFailureReason::Refused,
        ErrorKind::TimedOut => ConnectFailureReason::Timeout,
        ErrorKind::AddrInUse | ErrorKind::PermissionDenied => ConnectFailureReason::DeviceBusy,
        _ => ConnectFailureReason::Other(e.to_string()),
    };
    Error::Connect(reason)
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected
        | ErrorKind::ConnectionAborted
        | ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn test_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn connect_send_receive() {
        let (listener, addr) = test_listener().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"f\n");
            stream.write_all(b"14074000\n").await.unwrap();
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        assert!(transport.is_connected());
        transport.send(b"f\n").await.unwrap();

        let mut buf = [0u8; 256];
        let n = transport
            .receive(&mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"14074000\n");

        transport.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused_reports_reason() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpTransport::connect(&addr).await.unwrap_err();
        assert!(
            matches!(err, Error::Connect(ConnectFailureReason::Refused)),
            "expected Refused, got: {err:?}"
        );
    }

    #[tokio::test]
    async fn connect_unresolvable_host() {
        let err = TcpTransport::connect_with_timeout("no-such-host.invalid:4532", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::Connect(ConnectFailureReason::HostNotFound | ConnectFailureReason::Timeout)
            ),
            "expected HostNotFound, got: {err:?}"
        );
    }

    #[tokio::test]
    async fn receive_timeout() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        let mut buf = [0u8; 256];
        let result = transport
            .receive(&mut buf, Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(Error::Timeout)));

        transport.close().await.unwrap();
        server.abort();
    }

    #[tokio::test]
    async fn peer_close_is_connection_lost() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        server.await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut buf = [0u8; 256];
        let result = transport.receive(&mut buf, Duration::from_secs(2)).await;
        assert!(
            matches!(result, Err(Error::ConnectionLost)),
            "expected ConnectionLost, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        transport.close().await.unwrap();
        assert!(matches!(
            transport.send(b"f\n").await,
            Err(Error::NotConnected)
        ));

        server.abort();
    }

    #[tokio::test]
    async fn connector_returns_boxed_transport() {
        let (listener, addr) = test_listener().await;
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
        });

        let transport = TcpConnector
            .connect(&addr, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(transport.is_connected());
        server.await.unwrap();
    }
}

//! Mock TCP server for socket-level testing.
//!
//! [`MockTcpServer`] listens on a random localhost port and plays back
//! scripted request/response pairs to the first client that connects, so a
//! driver can be exercised over a real `TcpTransport`.
//!
//! # Example
//!
//! ```
//! use rigsync_test_harness::MockTcpServer;
//!
//! # async fn example() -> rigsync_core::Result<()> {
//! let mut server = MockTcpServer::new().await?;
//! server.expect(b"f\n", b"14074000\n");
//! let addr = server.addr().to_string();
//! server.start();
//! // ... connect a client to `addr` ...
//! server.wait().await.unwrap();
//! # Ok(())
//! # }
//! ```

use rigsync_core::error::{Error, Result};
use std::collections::VecDeque;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct TcpExpectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// A scripted TCP peer.
///
/// After the script is exhausted the server closes the connection, which
/// the client sees as `ConnectionLost`.
pub struct MockTcpServer {
    addr: String,
    listener: Option<TcpListener>,
    expectations: VecDeque<TcpExpectation>,
    server_handle: Option<JoinHandle<std::result::Result<(), String>>>,
}

impl MockTcpServer {
    /// Bind to a random localhost port. Nothing is accepted until
    /// [`start`](MockTcpServer::start).
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock TCP server: {e}")))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();
        Ok(Self {
            addr,
            listener: Some(listener),
            expectations: VecDeque::new(),
            server_handle: None,
        })
    }

    /// When the client sends `request`, reply with `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(TcpExpectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The port part of [`addr`](Self::addr).
    pub fn port(&self) -> u16 {
        self.addr
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0)
    }

    /// Accept one client and play the script in a background task.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let expectations: Vec<TcpExpectation> = self.expectations.drain(..).collect();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener
                .accept()
                .await
                .map_err(|e| format!("failed to accept connection: {e}"))?;

            for (i, expectation) in expectations.iter().enumerate() {
                let mut buf = vec![0u8; expectation.request.len()];
                let mut total_read = 0;
                while total_read < expectation.request.len() {
                    let n = stream
                        .read(&mut buf[total_read..])
                        .await
                        .map_err(|e| format!("expectation {i}: read error: {e}"))?;
                    if n == 0 {
                        return Err(format!(
                            "expectation {i}: client disconnected after {total_read} bytes (expected {})",
                            expectation.request.len()
                        ));
                    }
                    total_read += n;
                }

                if buf != expectation.request {
                    return Err(format!(
                        "expectation {i}: request mismatch: expected {:?}, got {:?}",
                        String::from_utf8_lossy(&expectation.request),
                        String::from_utf8_lossy(&buf)
                    ));
                }

                stream
                    .write_all(&expectation.response)
                    .await
                    .map_err(|e| format!("expectation {i}: write error: {e}"))?;
                stream
                    .flush()
                    .await
                    .map_err(|e| format!("expectation {i}: flush error: {e}"))?;
            }

            Ok(())
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the script to finish and report any mismatch.
    pub async fn wait(self) -> std::result::Result<(), String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("server task panicked: {e}"))?,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn plays_script_to_client() {
        let mut server = MockTcpServer::new().await.unwrap();
        server.expect(b"f\n", b"7074000\n");
        let addr = server.addr().to_string();
        assert!(server.port() > 0);
        server.start();

        let mut client = TcpStream::connect(&addr).await.unwrap();
        client.write_all(b"f\n").await.unwrap();
        let mut buf = [0u8; 32];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"7074000\n");

        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn reports_mismatch() {
        let mut server = MockTcpServer::new().await.unwrap();
        server.expect(b"f\n", b"0\n");
        let addr = server.addr().to_string();
        server.start();

        let mut client = TcpStream::connect(&addr).await.unwrap();
        client.write_all(b"m\n").await.unwrap();

        let err = server.wait().await.unwrap_err();
        assert!(err.contains("request mismatch"), "{err}");
    }
}

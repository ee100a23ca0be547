//! Buffered framing over a [`Transport`].
//!
//! Text daemons answer in frames that may arrive split across several
//! reads, or glued to the tail of a previous answer. [`FramedTransport`]
//! keeps the receive buffer between calls and cuts frames out of it by
//! delimiter, each under a single deadline.

use bytes::{Buf, BytesMut};
use rigsync_core::error::{Error, Result};
use rigsync_core::transport::Transport;
use std::time::Duration;
use tokio::time::Instant;

/// Receive buffer ceiling; a peer that never sends a delimiter is broken.
const MAX_BUF: usize = 64 * 1024;

/// A transport plus its unconsumed receive bytes.
pub struct FramedTransport {
    inner: Box<dyn Transport>,
    buf: BytesMut,
}

impl FramedTransport {
    pub fn new(inner: Box<dyn Transport>) -> Self {
        FramedTransport {
            inner,
            buf: BytesMut::with_capacity(1024),
        }
    }

    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.inner.send(data).await
    }

    /// Read one `\n`-terminated line, without the terminator (a trailing
    /// `\r` is stripped as well).
    pub async fn read_line(&mut self, timeout: Duration) -> Result<String> {
        let raw = self.read_until(b"\n", timeout).await?;
        let text = String::from_utf8(raw)
            .map_err(|_| Error::Protocol("reply is not valid UTF-8".into()))?;
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read up to and including `delimiter`. The delimiter is part of the
    /// returned bytes.
    pub async fn read_until(&mut self, delimiter: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(pos) = find(&self.buf, delimiter) {
                let frame = self.buf.split_to(pos + delimiter.len());
                return Ok(frame.to_vec());
            }
            self.fill(deadline).await?;
        }
    }

    /// Drop buffered bytes plus anything already queued on the socket.
    ///
    /// Called before a request on a stream that timed out earlier, so a
    /// late answer is not taken as the reply to the next request.
    pub async fn discard_pending(&mut self) -> Result<usize> {
        let mut discarded = self.buf.len();
        self.buf.clear();
        let mut scratch = [0u8; 1024];
        loop {
            match self.inner.receive(&mut scratch, Duration::from_millis(1)).await {
                Ok(n) => discarded += n,
                Err(Error::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        if discarded > 0 {
            tracing::debug!(bytes = discarded, "Discarded stale reply bytes");
        }
        Ok(discarded)
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    pub async fn close(&mut self) {
        self.buf.clear();
        if let Err(e) = self.inner.close().await {
            tracing::debug!(error = %e, "Error closing transport (ignored)");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn fill(&mut self, deadline: Instant) -> Result<()> {
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout);
        }
        let mut chunk = [0u8; 1024];
        let n = self.inner.receive(&mut chunk, deadline - now).await?;
        self.buf.extend_from_slice(&chunk[..n]);
        if self.buf.len() > MAX_BUF {
            tracing::warn!("receive buffer overflow, clearing");
            self.buf.advance(self.buf.len());
            return Err(Error::Protocol("reply exceeds buffer limit".into()));
        }
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

//! Mock transport for deterministic testing of wire codecs.
//!
//! [`MockTransport`] implements [`Transport`] with pre-loaded
//! request/response pairs. Clones share the same state, so a test can hand
//! one clone to a driver and keep another to inspect what was sent.
//!
//! # Example
//!
//! ```
//! use rigsync_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.expect(b"f\n", b"14074000\n");
//! let probe = mock.clone();
//! // ... hand `mock` to a driver ...
//! assert_eq!(probe.remaining_expectations(), 1);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rigsync_core::error::{Error, Result};
use rigsync_core::transport::Transport;

/// What happens after a matching request is sent.
#[derive(Debug, Clone)]
enum Reply {
    /// Deliver these bytes on the following receives.
    Bytes(Vec<u8>),
    /// Never answer; receives time out.
    Silence,
    /// The peer hangs up; the next receive fails with `ConnectionLost`.
    HangUp,
}

#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    reply: Reply,
}

#[derive(Debug)]
struct Inner {
    expectations: VecDeque<Expectation>,
    pending: Vec<u8>,
    hung_up: bool,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
}

/// A scripted [`Transport`].
///
/// Expectations are consumed in order. A `send()` that does not match the
/// next expectation, or arrives when none are left, fails with
/// [`Error::Protocol`]. Receives with nothing pending fail with
/// [`Error::Timeout`] immediately.
#[derive(Debug, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(Inner {
                expectations: VecDeque::new(),
                pending: Vec::new(),
                hung_up: false,
                connected: true,
                sent_log: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, request: &[u8], reply: Reply) {
        self.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            reply,
        });
    }

    /// When `request` is sent, answer with `response`.
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.push(request, Reply::Bytes(response.to_vec()));
    }

    /// When `request` is sent, never answer.
    pub fn expect_silence(&self, request: &[u8]) {
        self.push(request, Reply::Silence);
    }

    /// When `request` is sent, drop the connection.
    pub fn expect_hang_up(&self, request: &[u8]) {
        self.push(request, Reply::HangUp);
    }

    /// Queue bytes that arrive without a request (late or unsolicited data).
    pub fn inject(&self, data: &[u8]) {
        self.lock().pending.extend_from_slice(data);
    }

    /// Every `send()` payload so far, in order.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.lock().sent_log.clone()
    }

    /// Total number of bytes sent.
    pub fn bytes_sent(&self) -> usize {
        self.lock().sent_log.iter().map(Vec::len).sum()
    }

    pub fn remaining_expectations(&self) -> usize {
        self.lock().expectations.len()
    }

    /// Force the connected state. While disconnected, `send()` and
    /// `receive()` fail with [`Error::NotConnected`].
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        if inner.hung_up {
            return Err(Error::ConnectionLost);
        }
        inner.sent_log.push(data.to_vec());

        let expectation = inner
            .expectations
            .pop_front()
            .ok_or_else(|| Error::Protocol("no more expectations in mock transport".into()))?;
        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }
        match expectation.reply {
            Reply::Bytes(bytes) => inner.pending.extend_from_slice(&bytes),
            Reply::Silence => {}
            Reply::HangUp => inner.hung_up = true,
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::NotConnected);
        }
        if inner.pending.is_empty() {
            return Err(if inner.hung_up {
                Error::ConnectionLost
            } else {
                Error::Timeout
            });
        }
        let n = inner.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&inner.pending[..n]);
        inner.pending.drain(..n);
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.connected = false;
        inner.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

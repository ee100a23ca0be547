//! A [`Connector`] that hands out scripted transports.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rigsync_core::error::{ConnectFailureReason, Error, Result};
use rigsync_core::transport::{Connector, Transport};

use crate::mock_transport::MockTransport;

/// Each `connect()` pops the next queued [`MockTransport`]. Once the queue
/// is empty, connects fail with `Connect(Refused)`, or hang forever after
/// [`stall_when_empty`](Self::stall_when_empty).
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    queue: Arc<Mutex<VecDeque<MockTransport>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    stall: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transport for the next successful connect.
    pub fn push(&self, transport: MockTransport) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(transport);
        }
    }

    /// A host that swallows connection attempts: once the queue is empty,
    /// `connect()` never returns, whatever timeout it was given.
    pub fn stall_when_empty(&self) {
        self.stall.store(true, Ordering::SeqCst);
    }

    /// Addresses of every connect attempt, successful or not.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, addr: &str, _timeout: Duration) -> Result<Box<dyn Transport>> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(addr.to_string());
        }
        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(transport) => Ok(Box::new(transport)),
            None if self.stall.load(Ordering::SeqCst) => std::future::pending().await,
            None => Err(Error::Connect(ConnectFailureReason::Refused)),
        }
    }
}

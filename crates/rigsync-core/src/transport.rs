//! Transport trait for byte-stream rig links.
//!
//! The network drivers (rigctld, flrig) run their codecs over a
//! [`Transport`] rather than a raw socket, so they can be tested with the
//! `MockTransport` from `rigsync-test-harness`. A [`Connector`] creates
//! transports, which lets a driver reconnect on its own.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a rig or rig daemon.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes. Returns once every byte has been written.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes into `buf`, waiting up to `timeout`.
    ///
    /// Returns the number of bytes read, [`Error::Timeout`](crate::Error::Timeout)
    /// if nothing arrived, or [`Error::ConnectionLost`](crate::Error::ConnectionLost)
    /// if the peer closed the stream.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the connection. Later calls fail with `NotConnected`.
    async fn close(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;
}

/// Opens transports to `host:port` addresses.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `addr`, failing with
    /// [`Error::Connect`](crate::Error::Connect) if it cannot be reached
    /// within `timeout`.
    async fn connect(&self, addr: &str, timeout: Duration) -> Result<Box<dyn Transport>>;
}

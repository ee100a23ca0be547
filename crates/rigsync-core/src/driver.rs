//! The `RigDriver` trait -- the capability interface every protocol driver
//! implements.
//!
//! The facade and polling engine program against `Box<dyn RigDriver>` and
//! never learn which protocol is behind it. A driver is owned by exactly
//! one worker task and is never called concurrently, so every method takes
//! `&mut self`.
//!
//! Setters only talk to the rig. They never report the new value back into
//! a [`RigState`](crate::state::RigState); the next poll cycle reads it
//! through the normal query path.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::profile::{Capabilities, RigProfile};
use crate::types::{Mode, Vfo};

#[async_trait]
pub trait RigDriver: Send {
    /// Short driver name for logs (`"rigctld"`, `"hamlib"`).
    fn name(&self) -> &'static str;

    /// Establish the connection described by `profile`.
    ///
    /// Fails with [`Error::Connect`] carrying the reason (refused, host not
    /// found, timeout, device busy, bridge not running, ...).
    async fn open(&mut self, profile: &RigProfile) -> Result<()>;

    /// Release the connection. Idempotent and infallible.
    async fn close(&mut self);

    /// What this driver can do with the rig it opened, before the profile's
    /// own flags are applied. Only meaningful after a successful `open()`.
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Dial frequency of `vfo` in hertz, without RIT/XIT.
    async fn query_frequency(&mut self, vfo: Vfo) -> Result<u64>;

    async fn query_mode(&mut self) -> Result<Mode>;

    async fn query_vfo(&mut self) -> Result<Vfo> {
        Err(Error::Unsupported("query_vfo".into()))
    }

    /// `true` while transmitting.
    async fn query_ptt(&mut self) -> Result<bool> {
        Err(Error::Unsupported("query_ptt".into()))
    }

    /// Split state and, if the rig reports it, the transmit VFO.
    async fn query_split(&mut self) -> Result<(bool, Option<Vfo>)> {
        Err(Error::Unsupported("query_split".into()))
    }

    /// RIT offset in hertz, 0 when RIT is off.
    async fn query_rit(&mut self) -> Result<i32> {
        Err(Error::Unsupported("query_rit".into()))
    }

    /// XIT offset in hertz, 0 when XIT is off.
    async fn query_xit(&mut self) -> Result<i32> {
        Err(Error::Unsupported("query_xit".into()))
    }

    /// Output power in watts.
    async fn query_power(&mut self) -> Result<f32> {
        Err(Error::Unsupported("query_power".into()))
    }

    async fn set_frequency(&mut self, vfo: Vfo, freq_hz: u64) -> Result<()>;

    async fn set_mode(&mut self, mode: Mode) -> Result<()>;

    async fn set_ptt(&mut self, _on: bool) -> Result<()> {
        Err(Error::Unsupported("set_ptt".into()))
    }

    async fn send_morse(&mut self, _text: &str) -> Result<()> {
        Err(Error::Unsupported("send_morse".into()))
    }

    async fn stop_morse(&mut self) -> Result<()> {
        Err(Error::Unsupported("stop_morse".into()))
    }

    async fn set_key_speed(&mut self, _wpm: u16) -> Result<()> {
        Err(Error::Unsupported("set_key_speed".into()))
    }

    /// Check that the rig behind the connection is alive.
    ///
    /// Drivers that talk to a daemon use this to tell "daemon up, radio off"
    /// (a transient error such as [`Error::Timeout`]) from "daemon gone"
    /// ([`Error::ConnectionLost`]). The default does nothing.
    async fn probe(&mut self) -> Result<()> {
        Ok(())
    }
}

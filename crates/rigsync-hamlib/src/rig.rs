//! [`HamlibDriver`]: the `RigDriver` over the Hamlib CAT library.
//!
//! Every library call blocks, so the opened [`CatSession`] lives on its own
//! thread and the driver forwards calls to it. Operations the backend
//! answers with "not implemented" or "not available" are latched off in
//! [`capabilities`](RigDriver::capabilities) so they are not retried.

use async_trait::async_trait;
use std::sync::Arc;

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{Error, Operation, Result};
use rigsync_core::helpers::hz_from_f64;
use rigsync_core::profile::{Capabilities, RigProfile};
use rigsync_core::types::{Mode, Vfo};
use rigsync_transport::BlockingSession;

use crate::ffi::{RIG_LEVEL_KEYSPD, RIG_LEVEL_RFPOWER, RIG_VFO_CURR};
use crate::mode::{mode_from_hamlib, mode_to_hamlib, vfo_from_hamlib, vfo_to_hamlib};
use crate::session::{CatResult, CatSession, LibrarySession};

/// Opens a session for a profile. Runs on the session thread.
pub type SessionOpener = Arc<dyn Fn(&RigProfile) -> Result<Box<dyn CatSession>> + Send + Sync>;

pub struct HamlibDriver {
    opener: SessionOpener,
    session: Option<BlockingSession<Box<dyn CatSession>>>,
    caps: Capabilities,
}

impl HamlibDriver {
    /// A driver backed by the system Hamlib library.
    pub fn new() -> Self {
        Self::with_opener(Arc::new(|profile: &RigProfile| -> Result<Box<dyn CatSession>> {
            LibrarySession::open(profile).map(|s| Box::new(s) as Box<dyn CatSession>)
        }))
    }

    /// A driver whose sessions come from `opener` instead of the library.
    pub fn with_opener(opener: SessionOpener) -> Self {
        HamlibDriver {
            opener,
            session: None,
            caps: Capabilities::NONE,
        }
    }

    /// Run `f` on the session thread.
    async fn call<R, F>(&mut self, op: Operation, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn CatSession) -> CatResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let session = self.session.as_ref().ok_or(Error::NotConnected)?;
        match session.call(move |s| f(&mut **s)).await? {
            Ok(value) => Ok(value),
            Err(status) => {
                if status.is_unsupported() {
                    self.latch_off(op);
                }
                Err(status.into_error(op.name()))
            }
        }
    }

    fn latch_off(&mut self, op: Operation) {
        if self.caps.disable(op) {
            tracing::info!(operation = %op, "Hamlib backend lacks {}, disabling", op);
        }
    }
}

impl Default for HamlibDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RigDriver for HamlibDriver {
    fn name(&self) -> &'static str {
        "hamlib"
    }

    async fn open(&mut self, profile: &RigProfile) -> Result<()> {
        self.close().await;

        let opener = self.opener.clone();
        let owned = profile.clone();
        let session = BlockingSession::spawn("hamlib", move || opener(&owned)).await?;

        let has_power = session
            .call(|s| s.has_get_level(RIG_LEVEL_RFPOWER))
            .await?;
        let has_keyspd = session
            .call(|s| s.has_set_level(RIG_LEVEL_KEYSPD))
            .await?;
        if !has_keyspd {
            tracing::info!("Hamlib backend cannot set keyer speed, CW over CAT off");
        }

        // The morse flag gates the keyer as a whole: sending without speed
        // control is not offered.
        self.caps = Capabilities {
            power: has_power,
            morse: has_keyspd,
            ..Capabilities::ALL
        };
        self.session = Some(session);
        tracing::info!(model = profile.model, "Hamlib driver open");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown();
            tracing::debug!("Hamlib driver closed");
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    async fn query_frequency(&mut self, vfo: Vfo) -> Result<u64> {
        let target = vfo_to_hamlib(vfo);
        let hz = self
            .call(Operation::QueryFrequency, move |s| s.get_freq(target))
            .await?;
        hz_from_f64(hz)
    }

    async fn query_mode(&mut self) -> Result<Mode> {
        let (bits, _width) = self
            .call(Operation::QueryMode, |s| s.get_mode(RIG_VFO_CURR))
            .await?;
        Ok(mode_from_hamlib(bits))
    }

    async fn query_vfo(&mut self) -> Result<Vfo> {
        let vfo = self.call(Operation::QueryVfo, |s| s.get_vfo()).await?;
        Ok(vfo_from_hamlib(vfo))
    }

    async fn query_ptt(&mut self) -> Result<bool> {
        self.caps.require(Operation::QueryPtt)?;
        self.call(Operation::QueryPtt, |s| s.get_ptt(RIG_VFO_CURR))
            .await
    }

    async fn query_split(&mut self) -> Result<(bool, Option<Vfo>)> {
        self.caps.require(Operation::QuerySplit)?;
        let (on, tx) = self
            .call(Operation::QuerySplit, |s| s.get_split(RIG_VFO_CURR))
            .await?;
        let tx = match vfo_from_hamlib(tx) {
            Vfo::Current => None,
            vfo => Some(vfo),
        };
        Ok((on, tx))
    }

    async fn query_rit(&mut self) -> Result<i32> {
        self.caps.require(Operation::QueryRit)?;
        let rit = self
            .call(Operation::QueryRit, |s| s.get_rit(RIG_VFO_CURR))
            .await?;
        offset_hz(rit)
    }

    async fn query_xit(&mut self) -> Result<i32> {
        self.caps.require(Operation::QueryXit)?;
        let xit = self
            .call(Operation::QueryXit, |s| s.get_xit(RIG_VFO_CURR))
            .await?;
        offset_hz(xit)
    }

    /// RFPOWER is a fraction of full scale; `rig_power2mW` scales it with
    /// the rig's power table for the current band and mode.
    async fn query_power(&mut self) -> Result<f32> {
        self.caps.require(Operation::QueryPower)?;
        let mw = self
            .call(Operation::QueryPower, |s| {
                let level = s.get_level_f(RIG_VFO_CURR, RIG_LEVEL_RFPOWER)?;
                let freq = s.get_freq(RIG_VFO_CURR)?;
                let (mode, _) = s.get_mode(RIG_VFO_CURR)?;
                s.power_to_mw(level, freq, mode)
            })
            .await?;
        Ok(mw as f32 / 1000.0)
    }

    async fn set_frequency(&mut self, vfo: Vfo, freq_hz: u64) -> Result<()> {
        let target = vfo_to_hamlib(vfo);
        self.call(Operation::SetFrequency, move |s| {
            s.set_freq(target, freq_hz as f64)
        })
        .await
    }

    async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        let bits = mode_to_hamlib(mode)
            .ok_or_else(|| Error::InvalidParameter(format!("cannot set mode {mode}")))?;
        self.call(Operation::SetMode, move |s| s.set_mode(RIG_VFO_CURR, bits))
            .await
    }

    async fn set_ptt(&mut self, on: bool) -> Result<()> {
        self.caps.require(Operation::SetPtt)?;
        self.call(Operation::SetPtt, move |s| s.set_ptt(RIG_VFO_CURR, on))
            .await
    }

    async fn send_morse(&mut self, text: &str) -> Result<()> {
        self.caps.require(Operation::SendMorse)?;
        let text = text.to_string();
        self.call(Operation::SendMorse, move |s| {
            s.send_morse(RIG_VFO_CURR, &text)
        })
        .await
    }

    async fn stop_morse(&mut self) -> Result<()> {
        self.caps.require(Operation::StopMorse)?;
        self.call(Operation::StopMorse, |s| s.stop_morse(RIG_VFO_CURR))
            .await
    }

    async fn set_key_speed(&mut self, wpm: u16) -> Result<()> {
        self.caps.require(Operation::SetKeySpeed)?;
        self.call(Operation::SetKeySpeed, move |s| {
            s.set_level_i(RIG_VFO_CURR, RIG_LEVEL_KEYSPD, i32::from(wpm))
        })
        .await
    }
}

fn offset_hz(value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Protocol(format!("offset {value} Hz out of range")))
}

//! [`OmniRigDriver`]: the `RigDriver` over a running OmniRig.
//!
//! OmniRig owns the serial port and polls the rig itself; the driver reads
//! and writes the cached properties of one rig slot. The automation object
//! must stay on the thread that created it, so it lives in a
//! [`BlockingSession`].
//!
//! OmniRig keeps answering while the rig is unreachable and reports that
//! through its status instead. Queries during an outage fail with
//! `Timeout`; an outage longer than [`OFFLINE_GRACE`] is a lost connection.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{ConnectFailureReason, Error, Operation, Result};
use rigsync_core::profile::{Capabilities, RigProfile};
use rigsync_core::types::{Mode, Vfo};
use rigsync_transport::BlockingSession;

use crate::bridge::params::*;
use crate::bridge::{
    OmniRigBridge, RigStatus, ServerVersion, mode_from_params, mode_to_params, property,
    writable_modes,
};

/// How long a rig may stay offline before the connection counts as lost.
pub const OFFLINE_GRACE: Duration = Duration::from_secs(10);

/// Attaches to a rig slot. Runs on the session thread.
pub type BridgeOpener = Arc<dyn Fn(u32) -> Result<Box<dyn OmniRigBridge>> + Send + Sync>;

type Session = BlockingSession<Box<dyn OmniRigBridge>>;

pub struct OmniRigDriver {
    version: ServerVersion,
    opener: BridgeOpener,
    session: Option<Session>,
    slot: u32,
    readable: i32,
    writeable: i32,
    offline_since: Option<Instant>,
    caps: Capabilities,
}

impl OmniRigDriver {
    /// A driver attached to the installed OmniRig 1.x.
    pub fn new() -> Self {
        Self::installed(ServerVersion::V1)
    }

    /// A driver attached to the installed Omni-Rig V2.
    pub fn v2() -> Self {
        Self::installed(ServerVersion::V2)
    }

    fn installed(version: ServerVersion) -> Self {
        Self::with_opener(version, Arc::new(move |slot: u32| open_installed(version, slot)))
    }

    pub fn with_opener(version: ServerVersion, opener: BridgeOpener) -> Self {
        OmniRigDriver {
            version,
            opener,
            session: None,
            slot: 1,
            readable: 0,
            writeable: 0,
            offline_since: None,
            caps: Capabilities::NONE,
        }
    }

    pub fn version(&self) -> ServerVersion {
        self.version
    }

    /// Modes the attached rig accepts in `set_mode`. Empty until opened.
    pub fn available_modes(&self) -> Vec<Mode> {
        writable_modes(self.writeable)
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::NotConnected)
    }

    async fn get(&self, name: &'static str) -> Result<i32> {
        self.session()?.call(move |b| b.get(name)).await?
    }

    async fn put(&self, name: &'static str, value: i32) -> Result<()> {
        self.session()?.call(move |b| b.put(name, value)).await?
    }

    /// Fail unless the rig is online. Tracks how long it has been offline.
    async fn ensure_online(&mut self) -> Result<()> {
        let status = RigStatus::from_code(self.get(property::STATUS).await?);
        if status.is_online() {
            if self.offline_since.take().is_some() {
                tracing::info!(slot = self.slot, "OmniRig rig back online");
            }
            return Ok(());
        }

        let since = *self.offline_since.get_or_insert_with(|| {
            tracing::warn!(slot = self.slot, status = ?status, "OmniRig rig went offline");
            Instant::now()
        });
        if since.elapsed() > OFFLINE_GRACE {
            tracing::warn!(slot = self.slot, "OmniRig rig offline for over {:?}", OFFLINE_GRACE);
            Err(Error::ConnectionLost)
        } else {
            Err(Error::Timeout)
        }
    }

    async fn read(&mut self, op: Operation, mask: i32, name: &'static str) -> Result<i32> {
        if self.readable & mask == 0 {
            return Err(Error::Unsupported(format!("rig cannot report {}", op)));
        }
        self.ensure_online().await?;
        self.get(name).await
    }

    fn writable(&self, op: Operation, mask: i32) -> Result<()> {
        if self.writeable & mask == 0 {
            Err(Error::Unsupported(format!("rig cannot {}", op)))
        } else {
            Ok(())
        }
    }

    async fn current_vfo_is_b(&mut self) -> Result<bool> {
        if self.readable & (VFO_A_MASK | VFO_B_MASK) == 0 {
            return Ok(false);
        }
        Ok(self.get(property::VFO).await? & VFO_B_MASK != 0)
    }

    /// The offset shared by RIT and XIT, when `flag` says it is on.
    async fn offset_if(&mut self, op: Operation, name: &'static str, on: i32) -> Result<i32> {
        self.caps.require(op)?;
        let state = self.read(op, on, name).await?;
        if state & on == 0 {
            return Ok(0);
        }
        self.get(property::RIT_OFFSET).await
    }
}

impl Default for OmniRigDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
fn open_installed(version: ServerVersion, slot: u32) -> Result<Box<dyn OmniRigBridge>> {
    crate::com::ComBridge::open(version, slot).map(|b| Box::new(b) as Box<dyn OmniRigBridge>)
}

#[cfg(not(windows))]
fn open_installed(_version: ServerVersion, _slot: u32) -> Result<Box<dyn OmniRigBridge>> {
    Err(Error::Connect(ConnectFailureReason::BridgeNotRunning))
}

fn freq_from(value: i32) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::Protocol(format!("negative frequency {value}")))
}

#[async_trait]
impl RigDriver for OmniRigDriver {
    fn name(&self) -> &'static str {
        self.version.driver_kind().name()
    }

    async fn open(&mut self, profile: &RigProfile) -> Result<()> {
        self.close().await;

        let slot = profile.model;
        let slots = self.version.slots();
        if !slots.contains(&slot) {
            return Err(Error::Connect(ConnectFailureReason::InvalidProfile(format!(
                "{} has no rig slot {slot}",
                self.name()
            ))));
        }
        let opener = self.opener.clone();
        let session = BlockingSession::spawn("omnirig", move || opener(slot)).await?;

        let info = session
            .call(|b| -> Result<(i32, String, String, i32, i32)> {
                Ok((
                    b.get(property::STATUS)?,
                    b.text(property::STATUS_STR)?,
                    b.text(property::RIG_TYPE)?,
                    b.get(property::READABLE_PARAMS)?,
                    b.get(property::WRITEABLE_PARAMS)?,
                ))
            })
            .await?;
        let (status, status_text, rig_type, readable, writeable) = info.map_err(|e| match e {
            Error::Connect(reason) => Error::Connect(reason),
            other => Error::Connect(ConnectFailureReason::Other(other.to_string())),
        })?;

        let status = RigStatus::from_code(status);
        match status {
            RigStatus::NotConfigured | RigStatus::Disabled => {
                tracing::warn!(slot, "OmniRig slot not usable: {}", status_text);
                return Err(Error::Connect(ConnectFailureReason::NoRigConfigured));
            }
            RigStatus::PortBusy => {
                return Err(Error::Connect(ConnectFailureReason::DeviceBusy));
            }
            RigStatus::NotResponding | RigStatus::Unknown(_) => {
                tracing::warn!(slot, "OmniRig rig not responding yet: {}", status_text);
                self.offline_since = Some(Instant::now());
            }
            RigStatus::Online => self.offline_since = None,
        }

        self.slot = slot;
        self.readable = readable;
        self.writeable = writeable;
        self.caps = Capabilities {
            ptt: readable & (PM_TX | PM_RX) != 0,
            split: readable & (PM_SPLITON | PM_SPLITOFF) != 0,
            morse: false,
            rit_xit: readable & PM_RITOFFSET != 0
                && readable & (PM_RITON | PM_RITOFF | PM_XITON | PM_XITOFF) != 0,
            power: false,
        };
        self.session = Some(session);
        tracing::info!(
            slot,
            server = ?self.version,
            rig = %rig_type,
            readable = %format!("{readable:#x}"),
            writeable = %format!("{writeable:#x}"),
            "Attached to OmniRig"
        );
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown();
            tracing::debug!(slot = self.slot, "OmniRig driver closed");
        }
        self.offline_since = None;
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// OmniRig reports 0 for a VFO-specific frequency on rigs that only
    /// expose the generic one.
    async fn query_frequency(&mut self, vfo: Vfo) -> Result<u64> {
        let use_b = match vfo {
            Vfo::A => false,
            Vfo::B => true,
            Vfo::Current => {
                self.ensure_online().await?;
                self.current_vfo_is_b().await?
            }
        };
        let (mask, name) = if use_b {
            (PM_FREQB, property::FREQ_B)
        } else {
            (PM_FREQA, property::FREQ_A)
        };

        let mut hz = 0;
        if self.readable & mask != 0 {
            hz = self.read(Operation::QueryFrequency, mask, name).await?;
        }
        if hz == 0 {
            hz = self
                .read(Operation::QueryFrequency, PM_FREQ, property::FREQ)
                .await?;
        }
        freq_from(hz)
    }

    async fn query_mode(&mut self) -> Result<Mode> {
        let value = self
            .read(Operation::QueryMode, MODE_MASK, property::MODE)
            .await?;
        Ok(mode_from_params(value))
    }

    async fn query_vfo(&mut self) -> Result<Vfo> {
        let value = self
            .read(Operation::QueryVfo, VFO_A_MASK | VFO_B_MASK, property::VFO)
            .await?;
        Ok(if value & VFO_B_MASK != 0 {
            Vfo::B
        } else if value & VFO_A_MASK != 0 {
            Vfo::A
        } else {
            Vfo::Current
        })
    }

    async fn query_ptt(&mut self) -> Result<bool> {
        self.caps.require(Operation::QueryPtt)?;
        let value = self
            .read(Operation::QueryPtt, PM_TX | PM_RX, property::TX)
            .await?;
        Ok(value & PM_TX != 0)
    }

    /// `VfoAB`/`VfoBA` name the transmit VFO directly; otherwise split
    /// transmits on the VFO not receiving.
    async fn query_split(&mut self) -> Result<(bool, Option<Vfo>)> {
        self.caps.require(Operation::QuerySplit)?;
        let split = self
            .read(Operation::QuerySplit, PM_SPLITON | PM_SPLITOFF, property::SPLIT)
            .await?;
        if split & PM_SPLITON == 0 {
            return Ok((false, None));
        }
        if self.readable & (VFO_A_MASK | VFO_B_MASK) == 0 {
            return Ok((true, None));
        }
        let vfo = self.get(property::VFO).await?;
        let tx = if vfo & (PM_VFOAB | PM_VFOBB) != 0 {
            Vfo::B
        } else if vfo & (PM_VFOBA | PM_VFOAA) != 0 {
            Vfo::A
        } else if vfo & PM_VFOB != 0 {
            Vfo::A
        } else {
            Vfo::B
        };
        Ok((true, Some(tx)))
    }

    async fn query_rit(&mut self) -> Result<i32> {
        self.offset_if(Operation::QueryRit, property::RIT, PM_RITON)
            .await
    }

    async fn query_xit(&mut self) -> Result<i32> {
        self.offset_if(Operation::QueryXit, property::XIT, PM_XITON)
            .await
    }

    async fn set_frequency(&mut self, vfo: Vfo, freq_hz: u64) -> Result<()> {
        let hz = i32::try_from(freq_hz).map_err(|_| {
            Error::OutOfRange(format!("{freq_hz} Hz is beyond OmniRig's range"))
        })?;
        let use_b = match vfo {
            Vfo::A => false,
            Vfo::B => true,
            Vfo::Current => self.current_vfo_is_b().await?,
        };
        let (mask, name) = if use_b {
            (PM_FREQB, property::FREQ_B)
        } else {
            (PM_FREQA, property::FREQ_A)
        };
        if self.writeable & mask != 0 {
            self.put(name, hz).await
        } else if vfo == Vfo::Current {
            self.writable(Operation::SetFrequency, PM_FREQ)?;
            self.put(property::FREQ, hz).await
        } else {
            Err(Error::Unsupported(format!("rig cannot set VFO {vfo}")))
        }
    }

    async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        let value = mode_to_params(mode)
            .filter(|value| self.writeable & value != 0)
            .ok_or_else(|| Error::InvalidParameter(format!("rig cannot be set to {mode}")))?;
        self.put(property::MODE, value).await
    }

    async fn set_ptt(&mut self, on: bool) -> Result<()> {
        self.caps.require(Operation::SetPtt)?;
        let value = if on { PM_TX } else { PM_RX };
        self.writable(Operation::SetPtt, value)?;
        self.put(property::TX, value).await
    }

    async fn probe(&mut self) -> Result<()> {
        self.ensure_online().await
    }
}

//! A simulated rig behind the [`RigDriver`] trait.
//!
//! [`SimulatedRig`] is the "front panel": tests turn its knobs, inject
//! faults, and read back what the driver was asked to do. [`ScriptedDriver`]
//! is the driver the facade owns; every clone of the rig shares the same
//! state, so the test keeps a handle after handing the driver over.
//!
//! # Example
//!
//! ```
//! use rigsync_test_harness::SimulatedRig;
//! use rigsync_core::Vfo;
//!
//! let rig = SimulatedRig::new();
//! let driver = rig.driver();
//! rig.tune(Vfo::A, 7_074_000);
//! rig.time_out_frequency(5);
//! // ... connect a facade with `driver` ...
//! assert_eq!(rig.transport_calls(), 0);
//! ```

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{ConnectFailureReason, Error, Operation, Result};
use rigsync_core::profile::{Capabilities, RigProfile};
use rigsync_core::types::{Mode, Vfo};

#[derive(Debug, Clone)]
struct FrontPanel {
    freq_a: u64,
    freq_b: u64,
    active: Vfo,
    mode: Mode,
    ptt: bool,
    split: bool,
    rit: i32,
    xit: i32,
    power_watts: f32,
    key_speed: u16,
    morse: Vec<String>,
}

#[derive(Debug)]
struct SimInner {
    panel: FrontPanel,
    honor_sets: bool,
    capabilities: Capabilities,
    declared: Capabilities,
    open_failure: Option<ConnectFailureReason>,
    frequency_timeouts: u32,
    rejections: u32,
    lose_transport_after: Option<u32>,
    stalled: bool,
    open: bool,
    open_count: usize,
    close_count: usize,
    transport_calls: usize,
    calls: Vec<Operation>,
}

/// Shared state of a simulated transceiver.
#[derive(Debug, Clone)]
pub struct SimulatedRig {
    inner: Arc<Mutex<SimInner>>,
}

impl SimulatedRig {
    /// A rig on 14.074 MHz USB, VFO A, receiving, 100 W, honoring every set.
    pub fn new() -> Self {
        SimulatedRig {
            inner: Arc::new(Mutex::new(SimInner {
                panel: FrontPanel {
                    freq_a: 14_074_000,
                    freq_b: 14_074_000,
                    active: Vfo::A,
                    mode: Mode::USB,
                    ptt: false,
                    split: false,
                    rit: 0,
                    xit: 0,
                    power_watts: 100.0,
                    key_speed: 20,
                    morse: Vec::new(),
                },
                honor_sets: true,
                capabilities: Capabilities::ALL,
                declared: Capabilities::ALL,
                open_failure: None,
                frequency_timeouts: 0,
                rejections: 0,
                lose_transport_after: None,
                stalled: false,
                open: false,
                open_count: 0,
                close_count: 0,
                transport_calls: 0,
                calls: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A driver bound to this rig.
    pub fn driver(&self) -> ScriptedDriver {
        ScriptedDriver { rig: self.clone() }
    }

    // -----------------------------------------------------------------
    // Front panel
    // -----------------------------------------------------------------

    /// Turn the dial of `vfo` (`Current` means the active VFO).
    pub fn tune(&self, vfo: Vfo, freq_hz: u64) {
        let mut inner = self.lock();
        let target = resolve(vfo, inner.panel.active);
        match target {
            Vfo::B => inner.panel.freq_b = freq_hz,
            _ => inner.panel.freq_a = freq_hz,
        }
    }

    pub fn select_mode(&self, mode: Mode) {
        self.lock().panel.mode = mode;
    }

    pub fn select_vfo(&self, vfo: Vfo) {
        self.lock().panel.active = vfo;
    }

    pub fn key(&self, ptt: bool) {
        self.lock().panel.ptt = ptt;
    }

    /// Split on: transmit on the VFO that is not active.
    pub fn set_split(&self, on: bool) {
        self.lock().panel.split = on;
    }

    pub fn set_rit(&self, offset_hz: i32) {
        self.lock().panel.rit = offset_hz;
    }

    pub fn set_xit(&self, offset_hz: i32) {
        self.lock().panel.xit = offset_hz;
    }

    pub fn set_power(&self, watts: f32) {
        self.lock().panel.power_watts = watts;
    }

    pub fn frequency(&self, vfo: Vfo) -> u64 {
        let inner = self.lock();
        match resolve(vfo, inner.panel.active) {
            Vfo::B => inner.panel.freq_b,
            _ => inner.panel.freq_a,
        }
    }

    pub fn mode(&self) -> Mode {
        self.lock().panel.mode
    }

    pub fn ptt(&self) -> bool {
        self.lock().panel.ptt
    }

    pub fn key_speed(&self) -> u16 {
        self.lock().panel.key_speed
    }

    /// Text passed to `send_morse`, oldest first.
    pub fn morse_sent(&self) -> Vec<String> {
        self.lock().panel.morse.clone()
    }

    // -----------------------------------------------------------------
    // Scripting
    // -----------------------------------------------------------------

    /// Whether set commands change the front panel (default `true`).
    pub fn honor_sets(&self, honor: bool) {
        self.lock().honor_sets = honor;
    }

    /// What the driver reports as negotiated after open.
    pub fn set_capabilities(&self, caps: Capabilities) {
        self.lock().capabilities = caps;
    }

    /// Make the next `open()` fail with `reason`.
    pub fn fail_open(&self, reason: ConnectFailureReason) {
        self.lock().open_failure = Some(reason);
    }

    /// The next `count` frequency queries time out.
    pub fn time_out_frequency(&self, count: u32) {
        self.lock().frequency_timeouts = count;
    }

    /// The next `count` mode queries are rejected by the rig.
    pub fn reject_mode_queries(&self, count: u32) {
        self.lock().rejections = count;
    }

    /// After `calls` more transport calls succeed, the link drops.
    pub fn lose_transport_after(&self, calls: u32) {
        self.lock().lose_transport_after = Some(calls);
    }

    /// While stalled, every transport call hangs forever.
    pub fn stall(&self, stalled: bool) {
        self.lock().stalled = stalled;
    }

    // -----------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------

    /// Number of calls that reached the (simulated) transport.
    pub fn transport_calls(&self) -> usize {
        self.lock().transport_calls
    }

    /// Operations that reached the transport, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    /// How many times `op` reached the transport.
    pub fn count(&self, op: Operation) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(vfo: Vfo, active: Vfo) -> Vfo {
    match vfo {
        Vfo::Current => active,
        other => other,
    }
}

/// The [`RigDriver`] half of a [`SimulatedRig`].
#[derive(Debug)]
pub struct ScriptedDriver {
    rig: SimulatedRig,
}

impl ScriptedDriver {
    /// Gate on the profile's flags, then count a transport call and apply
    /// transport-level faults.
    async fn enter(&self, op: Operation) -> Result<()> {
        let stalled = {
            let mut inner = self.rig.lock();
            if !inner.open {
                return Err(Error::NotConnected);
            }
            inner.declared.require(op)?;
            inner.capabilities.require(op)?;
            inner.transport_calls += 1;
            inner.calls.push(op);
            if let Some(remaining) = inner.lose_transport_after.as_mut() {
                if *remaining == 0 {
                    inner.open = false;
                    return Err(Error::ConnectionLost);
                }
                *remaining -= 1;
            }
            inner.stalled
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[async_trait]
impl RigDriver for ScriptedDriver {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn open(&mut self, profile: &RigProfile) -> Result<()> {
        let mut inner = self.rig.lock();
        inner.open_count += 1;
        if let Some(reason) = inner.open_failure.take() {
            return Err(Error::Connect(reason));
        }
        inner.declared = profile.capabilities;
        inner.open = true;
        Ok(())
    }

    async fn close(&mut self) {
        let mut inner = self.rig.lock();
        if inner.open {
            inner.open = false;
            inner.close_count += 1;
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.rig.lock().capabilities
    }

    async fn query_frequency(&mut self, vfo: Vfo) -> Result<u64> {
        self.enter(Operation::QueryFrequency).await?;
        let mut inner = self.rig.lock();
        if inner.frequency_timeouts > 0 {
            inner.frequency_timeouts -= 1;
            return Err(Error::Timeout);
        }
        Ok(match resolve(vfo, inner.panel.active) {
            Vfo::B => inner.panel.freq_b,
            _ => inner.panel.freq_a,
        })
    }

    async fn query_mode(&mut self) -> Result<Mode> {
        self.enter(Operation::QueryMode).await?;
        let mut inner = self.rig.lock();
        if inner.rejections > 0 {
            inner.rejections -= 1;
            return Err(Error::Rejected("mode query rejected".into()));
        }
        Ok(inner.panel.mode)
    }

    async fn query_vfo(&mut self) -> Result<Vfo> {
        self.enter(Operation::QueryVfo).await?;
        Ok(self.rig.lock().panel.active)
    }

    async fn query_ptt(&mut self) -> Result<bool> {
        self.enter(Operation::QueryPtt).await?;
        Ok(self.rig.lock().panel.ptt)
    }

    async fn query_split(&mut self) -> Result<(bool, Option<Vfo>)> {
        self.enter(Operation::QuerySplit).await?;
        let inner = self.rig.lock();
        let tx = match inner.panel.active {
            Vfo::B => Vfo::A,
            _ => Vfo::B,
        };
        Ok((inner.panel.split, inner.panel.split.then_some(tx)))
    }

    async fn query_rit(&mut self) -> Result<i32> {
        self.enter(Operation::QueryRit).await?;
        Ok(self.rig.lock().panel.rit)
    }

    async fn query_xit(&mut self) -> Result<i32> {
        self.enter(Operation::QueryXit).await?;
        Ok(self.rig.lock().panel.xit)
    }

    async fn query_power(&mut self) -> Result<f32> {
        self.enter(Operation::QueryPower).await?;
        Ok(self.rig.lock().panel.power_watts)
    }

    async fn set_frequency(&mut self, vfo: Vfo, freq_hz: u64) -> Result<()> {
        self.enter(Operation::SetFrequency).await?;
        if freq_hz == 0 || freq_hz > 60_000_000 {
            return Err(Error::OutOfRange(format!("{freq_hz} Hz")));
        }
        let mut inner = self.rig.lock();
        if inner.honor_sets {
            match resolve(vfo, inner.panel.active) {
                Vfo::B => inner.panel.freq_b = freq_hz,
                _ => inner.panel.freq_a = freq_hz,
            }
        }
        Ok(())
    }

    async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.enter(Operation::SetMode).await?;
        let mut inner = self.rig.lock();
        if inner.honor_sets {
            inner.panel.mode = mode;
        }
        Ok(())
    }

    async fn set_ptt(&mut self, on: bool) -> Result<()> {
        self.enter(Operation::SetPtt).await?;
        let mut inner = self.rig.lock();
        if inner.honor_sets {
            inner.panel.ptt = on;
        }
        Ok(())
    }

    async fn send_morse(&mut self, text: &str) -> Result<()> {
        self.enter(Operation::SendMorse).await?;
        self.rig.lock().panel.morse.push(text.to_string());
        Ok(())
    }

    async fn stop_morse(&mut self) -> Result<()> {
        self.enter(Operation::StopMorse).await
    }

    async fn set_key_speed(&mut self, wpm: u16) -> Result<()> {
        self.enter(Operation::SetKeySpeed).await?;
        self.rig.lock().panel.key_speed = wpm;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigsync_core::profile::DriverKind;

    fn profile(caps: Capabilities) -> RigProfile {
        RigProfile::builder(DriverKind::Rigctld)
            .capabilities(caps)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn honors_sets_and_counts_calls() {
        let rig = SimulatedRig::new();
        let mut driver = rig.driver();
        driver.open(&profile(Capabilities::ALL)).await.unwrap();

        driver.set_frequency(Vfo::A, 14_200_000).await.unwrap();
        assert_eq!(driver.query_frequency(Vfo::A).await.unwrap(), 14_200_000);
        assert_eq!(rig.transport_calls(), 2);
        assert_eq!(
            rig.calls(),
            vec![Operation::SetFrequency, Operation::QueryFrequency]
        );
    }

    #[tokio::test]
    async fn undeclared_capability_never_reaches_transport() {
        let rig = SimulatedRig::new();
        let mut driver = rig.driver();
        driver.open(&profile(Capabilities::default())).await.unwrap();

        let err = driver.send_morse("CQ").await.unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert_eq!(rig.transport_calls(), 0);
        assert!(rig.morse_sent().is_empty());
    }

    #[tokio::test]
    async fn scripted_timeouts_then_recovery() {
        let rig = SimulatedRig::new();
        let mut driver = rig.driver();
        driver.open(&profile(Capabilities::ALL)).await.unwrap();
        rig.time_out_frequency(2);

        assert!(matches!(
            driver.query_frequency(Vfo::Current).await,
            Err(Error::Timeout)
        ));
        assert!(matches!(
            driver.query_frequency(Vfo::Current).await,
            Err(Error::Timeout)
        ));
        assert_eq!(
            driver.query_frequency(Vfo::Current).await.unwrap(),
            14_074_000
        );
    }

    #[tokio::test]
    async fn transport_loss_closes_link() {
        let rig = SimulatedRig::new();
        let mut driver = rig.driver();
        driver.open(&profile(Capabilities::ALL)).await.unwrap();
        rig.lose_transport_after(1);

        assert!(driver.query_mode().await.is_ok());
        assert!(matches!(
            driver.query_ptt().await,
            Err(Error::ConnectionLost)
        ));
        assert!(!rig.is_open());
        assert!(matches!(
            driver.query_ptt().await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn open_failure_is_one_shot() {
        let rig = SimulatedRig::new();
        let mut driver = rig.driver();
        rig.fail_open(ConnectFailureReason::DeviceBusy);
        assert!(matches!(
            driver.open(&profile(Capabilities::ALL)).await,
            Err(Error::Connect(ConnectFailureReason::DeviceBusy))
        ));
        assert!(driver.open(&profile(Capabilities::ALL)).await.is_ok());
        assert_eq!(rig.open_count(), 2);
    }

    #[tokio::test]
    async fn split_reports_other_vfo() {
        let rig = SimulatedRig::new();
        let mut driver = rig.driver();
        driver.open(&profile(Capabilities::ALL)).await.unwrap();
        rig.set_split(true);
        assert_eq!(driver.query_split().await.unwrap(), (true, Some(Vfo::B)));
    }
}

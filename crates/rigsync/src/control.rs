//! [`RigControl`]: the one object the application talks to.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, oneshot};

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{ConnectFailureReason, Error, Operation, RigError};
use rigsync_core::events::RigEvent;
use rigsync_core::profile::{Capabilities, RigProfile};
use rigsync_core::state::RigState;
use rigsync_core::types::{ConnectionState, Mode, Vfo};

use crate::command::RigCommand;
use crate::drivers;
use crate::engine::{self, Job, Worker};
use crate::hub::EventHub;

/// How long `disconnect()` waits for the worker to release the driver.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type RigResult<T> = std::result::Result<T, RigError>;

struct Session {
    profile: RigProfile,
    worker: Worker,
}

/// Facade over one rig connection.
///
/// `RigControl` owns the connection lifecycle:
///
/// ```text
/// Disconnected -> Connecting -> Connected <-> Erroring
///       ^             |             |            |
///       +-------------+-------------+------------+
/// ```
///
/// All I/O happens on a worker task. The methods here only queue work and
/// wait for results, so they are safe to call from any task, and
/// [`current_state`](Self::current_state) never waits at all.
///
/// # Example
///
/// ```no_run
/// use rigsync::{DriverKind, RigControl, RigEvent, RigProfile, Vfo};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let rig = RigControl::new();
/// let mut events = rig.subscribe();
/// rig.connect(RigProfile::builder(DriverKind::Rigctld).build()?).await?;
/// rig.set_frequency(Vfo::Current, 14_074_000).await?;
///
/// while let Some(RigEvent::StateChanged(change)) = events.recv().await {
///     println!("{} Hz", change.state.transmit_frequency_hz);
/// }
/// # Ok(())
/// # }
/// ```
pub struct RigControl {
    hub: Arc<EventHub>,
    session: Mutex<Option<Session>>,
}

impl RigControl {
    pub fn new() -> Self {
        RigControl {
            hub: Arc::new(EventHub::new()),
            session: Mutex::new(None),
        }
    }

    /// Open the rig described by `profile` with the driver it names.
    ///
    /// An existing connection is closed first.
    pub async fn connect(&self, profile: RigProfile) -> RigResult<()> {
        if let Err(e) = profile.validate() {
            return Err(RigError::ConnectFailure {
                reason: ConnectFailureReason::InvalidProfile(e.to_string()),
            });
        }
        let driver = drivers::create(profile.driver).map_err(|reason| {
            tracing::warn!(driver = %profile.driver, "Driver not available: {}", reason);
            RigError::ConnectFailure { reason }
        })?;
        self.connect_with_driver(profile, driver).await
    }

    /// Open `profile` with a driver built by the caller.
    pub async fn connect_with_driver(
        &self,
        profile: RigProfile,
        mut driver: Box<dyn RigDriver>,
    ) -> RigResult<()> {
        let mut session = self.session.lock().await;
        if let Some(old) = session.take() {
            self.stop(old).await;
        }

        tracing::info!(
            rig = %profile.name,
            driver = driver.name(),
            address = ?profile.connection.address(),
            "Connecting"
        );
        self.hub.reset(ConnectionState::Connecting);

        let limit = profile.connect_timeout + Duration::from_secs(1);
        let opened = match tokio::time::timeout(limit, driver.open(&profile)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Connect(ConnectFailureReason::Timeout)),
        };
        if let Err(e) = opened {
            driver.close().await;
            let err = RigError::from_driver(Operation::Open, e);
            tracing::warn!(rig = %profile.name, "Connect failed: {}", err);
            self.hub.reset(ConnectionState::Disconnected);
            self.hub.publish_error(err.clone());
            return Err(err);
        }

        let caps = profile.capabilities.intersect(&driver.capabilities());
        tracing::info!(rig = %profile.name, capabilities = ?caps, "Connected");
        self.hub.set_connection(ConnectionState::Connected);

        let worker = engine::spawn(driver, profile.clone(), caps, self.hub.clone());
        *session = Some(Session { profile, worker });
        Ok(())
    }

    /// Close the connection. The state is `Disconnected` when this returns;
    /// queued and in-flight requests are abandoned.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        if let Some(old) = session.take() {
            tracing::info!(rig = %old.profile.name, "Disconnecting");
            self.stop(old).await;
        }
    }

    async fn stop(&self, session: Session) {
        let Worker {
            jobs, cancel, task, ..
        } = session.worker;
        // Callers whose reply channel closes from here on must already see
        // Disconnected.
        self.hub.reset(ConnectionState::Disconnected);
        cancel.cancel();
        drop(jobs);
        if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
            tracing::warn!("Rig worker still busy after disconnect; leaving it to finish");
        }
    }

    /// The latest snapshot.
    pub fn current_state(&self) -> RigState {
        self.hub.current()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.hub.connection_state()
    }

    /// Every event from now on, in order. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RigEvent> {
        self.hub.subscribe()
    }

    /// Effective capabilities of the live connection; `NONE` when not
    /// connected.
    pub async fn capabilities(&self) -> Capabilities {
        match self.session.lock().await.as_ref() {
            Some(session) if self.hub.connection_state().accepts_commands() => *session
                .worker
                .caps
                .lock()
                .unwrap_or_else(|p| p.into_inner()),
            _ => Capabilities::NONE,
        }
    }

    /// The profile of the live connection.
    pub async fn profile(&self) -> Option<RigProfile> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.profile.clone())
    }

    /// Queue `command` and wait for the rig to carry it out.
    ///
    /// Fails with `NotConfigured` unless the connection is `Connected` or
    /// `Erroring`, and with `CapabilityUnsupported` before anything is sent
    /// when the capability is off.
    pub async fn issue_command(&self, command: RigCommand) -> RigResult<()> {
        let operation = command.operation();
        let (jobs, caps) = {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(session) if self.hub.connection_state().accepts_commands() => (
                    session.worker.jobs.clone(),
                    *session
                        .worker
                        .caps
                        .lock()
                        .unwrap_or_else(|p| p.into_inner()),
                ),
                _ => return Err(RigError::NotConfigured),
            }
        };
        if !caps.supports(operation) {
            tracing::debug!(operation = %operation, "Capability off, not sending");
            return Err(RigError::CapabilityUnsupported { operation });
        }

        let (reply, result) = oneshot::channel();
        jobs.send(Job { command, reply })
            .await
            .map_err(|_| RigError::NotConfigured)?;
        match result.await {
            Ok(result) => result,
            Err(_) if self.hub.connection_state() == ConnectionState::Disconnected => {
                Err(RigError::NotConfigured)
            }
            Err(_) => Err(RigError::TransportLost),
        }
    }

    pub async fn set_frequency(&self, vfo: Vfo, freq_hz: u64) -> RigResult<()> {
        self.issue_command(RigCommand::SetFrequency { vfo, freq_hz })
            .await
    }

    pub async fn set_mode(&self, mode: Mode) -> RigResult<()> {
        self.issue_command(RigCommand::SetMode(mode)).await
    }

    pub async fn set_ptt(&self, on: bool) -> RigResult<()> {
        self.issue_command(RigCommand::SetPtt(on)).await
    }

    pub async fn send_morse(&self, text: &str) -> RigResult<()> {
        self.issue_command(RigCommand::SendMorse(text.to_string()))
            .await
    }

    pub async fn stop_morse(&self) -> RigResult<()> {
        self.issue_command(RigCommand::StopMorse).await
    }

    pub async fn set_key_speed(&self, wpm: u16) -> RigResult<()> {
        self.issue_command(RigCommand::SetKeySpeed(wpm)).await
    }
}

impl Default for RigControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RigControl {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            self.hub.reset(ConnectionState::Disconnected);
            session.worker.cancel.cancel();
            tracing::debug!(rig = %session.profile.name, "RigControl dropped, worker cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigsync_core::band::Band;
    use rigsync_core::profile::DriverKind;
    use rigsync_core::state::ChangedFields;
    use rigsync_test_harness::SimulatedRig;

    fn profile(caps: Capabilities) -> RigProfile {
        RigProfile::builder(DriverKind::Rigctld)
            .capabilities(caps)
            .poll_interval(Duration::from_millis(50))
            .liveness_interval(Duration::from_secs(3600))
            .build()
            .unwrap()
    }

    async fn connected(rig: &SimulatedRig, caps: Capabilities) -> RigControl {
        let control = RigControl::new();
        control
            .connect_with_driver(profile(caps), Box::new(rig.driver()))
            .await
            .unwrap();
        control
    }

    /// Wait for a state change matching `pred`.
    async fn wait_for(
        events: &mut mpsc::UnboundedReceiver<RigEvent>,
        pred: impl Fn(&RigState) -> bool,
    ) -> RigState {
        loop {
            match events.recv().await {
                Some(RigEvent::StateChanged(change)) if pred(&change.state) => {
                    return change.state;
                }
                Some(_) => {}
                None => panic!("event stream ended"),
            }
        }
    }

    fn connection_states(events: &mut mpsc::UnboundedReceiver<RigEvent>) -> Vec<ConnectionState> {
        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let RigEvent::StateChanged(change) = event {
                if change.changed.contains(ChangedFields::CONNECTION) {
                    states.push(change.state.connection_state);
                }
            }
        }
        states
    }

    // ===============================================================
    // Connection lifecycle
    // ===============================================================

    #[tokio::test(start_paused = true)]
    async fn connect_polls_and_publishes() {
        let rig = SimulatedRig::new();
        let control = RigControl::new();
        let mut events = control.subscribe();
        control
            .connect_with_driver(profile(Capabilities::ALL), Box::new(rig.driver()))
            .await
            .unwrap();

        let state = wait_for(&mut events, |s| s.transmit_frequency_hz != 0).await;
        assert_eq!(state.transmit_frequency_hz, 14_074_000);
        assert_eq!(state.mode, Mode::USB);
        assert_eq!(state.band(), Some(Band::Band20m));
        assert_eq!(state.power_watts, Some(100.0));
        assert_eq!(state.connection_state, ConnectionState::Connected);
        assert_eq!(control.current_state(), state);
    }

    #[tokio::test(start_paused = true)]
    async fn open_failure_goes_back_to_disconnected() {
        let rig = SimulatedRig::new();
        rig.fail_open(ConnectFailureReason::BridgeNotRunning);
        let control = RigControl::new();
        let mut events = control.subscribe();

        let err = control
            .connect_with_driver(profile(Capabilities::ALL), Box::new(rig.driver()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RigError::ConnectFailure {
                reason: ConnectFailureReason::BridgeNotRunning
            }
        );
        assert_eq!(control.connection_state(), ConnectionState::Disconnected);

        let mut states = Vec::new();
        let mut last_error = None;
        while let Ok(event) = events.try_recv() {
            match event {
                RigEvent::StateChanged(change) => states.push(change.state.connection_state),
                RigEvent::Error(err) => last_error = Some(err),
            }
        }
        assert_eq!(
            states,
            vec![ConnectionState::Connecting, ConnectionState::Disconnected]
        );
        assert_eq!(last_error, Some(err));
    }

    #[tokio::test]
    async fn invalid_profile_is_a_connect_failure() {
        let control = RigControl::new();
        let mut profile = profile(Capabilities::ALL);
        profile.failure_threshold = 0;
        assert!(matches!(
            control.connect(profile).await,
            Err(RigError::ConnectFailure {
                reason: ConnectFailureReason::InvalidProfile(_)
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn state_machine_only_takes_defined_edges() {
        let rig = SimulatedRig::new();
        let control = RigControl::new();
        let mut events = control.subscribe();
        let mut recorder = control.subscribe();
        control
            .connect_with_driver(profile(Capabilities::ALL), Box::new(rig.driver()))
            .await
            .unwrap();

        rig.time_out_frequency(5);
        wait_for(&mut events, |s| s.connection_state == ConnectionState::Erroring).await;
        wait_for(&mut events, |s| s.connection_state == ConnectionState::Connected).await;
        rig.lose_transport_after(0);
        wait_for(&mut events, |s| s.connection_state == ConnectionState::Disconnected).await;

        let fresh = SimulatedRig::new();
        control
            .connect_with_driver(profile(Capabilities::ALL), Box::new(fresh.driver()))
            .await
            .unwrap();
        control.disconnect().await;

        let mut path = vec![ConnectionState::Disconnected];
        path.extend(connection_states(&mut recorder));
        assert_eq!(
            path,
            vec![
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Erroring,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
            ]
        );
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "illegal edge {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_synchronous_and_closes_driver() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        control.disconnect().await;
        assert_eq!(control.connection_state(), ConnectionState::Disconnected);
        assert_eq!(control.current_state(), RigState::default());
        assert_eq!(rig.close_count(), 1);
        assert!(!rig.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_closes_previous_session() {
        let first = SimulatedRig::new();
        let second = SimulatedRig::new();
        second.tune(Vfo::A, 7_074_000);
        let control = connected(&first, Capabilities::ALL).await;
        let mut events = control.subscribe();

        control
            .connect_with_driver(profile(Capabilities::ALL), Box::new(second.driver()))
            .await
            .unwrap();
        assert_eq!(first.close_count(), 1);
        let state = wait_for(&mut events, |s| s.receive_frequency_hz == 7_074_000).await;
        assert_eq!(state.band(), Some(Band::Band40m));
    }

    // ===============================================================
    // Commands
    // ===============================================================

    #[tokio::test]
    async fn commands_need_a_connection() {
        let control = RigControl::new();
        assert_eq!(
            control.set_frequency(Vfo::A, 14_200_000).await,
            Err(RigError::NotConfigured)
        );
        assert_eq!(control.set_ptt(true).await, Err(RigError::NotConfigured));
        assert_eq!(control.capabilities().await, Capabilities::NONE);
    }

    #[tokio::test(start_paused = true)]
    async fn set_frequency_round_trips_through_poll() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();

        control.set_frequency(Vfo::A, 14_200_000).await.unwrap();
        let state = wait_for(&mut events, |s| s.receive_frequency_hz == 14_200_000).await;
        assert_eq!(state.transmit_frequency_hz, 14_200_000);
        assert_eq!(rig.frequency(Vfo::A), 14_200_000);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_capability_never_reaches_driver() {
        let rig = SimulatedRig::new();
        let caps = Capabilities {
            morse: false,
            ..Capabilities::ALL
        };
        let control = connected(&rig, caps).await;
        let before = control.connection_state();

        assert_eq!(
            control.send_morse("CQ").await,
            Err(RigError::CapabilityUnsupported {
                operation: Operation::SendMorse
            })
        );
        assert_eq!(control.connection_state(), before);
        assert_eq!(rig.count(Operation::SendMorse), 0);
        assert!(rig.morse_sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn driver_capabilities_narrow_the_profile() {
        let rig = SimulatedRig::new();
        rig.set_capabilities(Capabilities {
            power: false,
            ..Capabilities::ALL
        });
        let control = connected(&rig, Capabilities::ALL).await;
        let caps = control.capabilities().await;
        assert!(!caps.power);
        assert!(caps.morse);

        control.send_morse("CQ TEST").await.unwrap();
        control.set_key_speed(28).await.unwrap();
        assert_eq!(rig.morse_sent(), vec!["CQ TEST".to_string()]);
        assert_eq!(rig.key_speed(), 28);
        assert_eq!(rig.count(Operation::QueryPower), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_command_is_reported() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        match control.set_frequency(Vfo::A, 0).await {
            Err(RigError::CommandRejected { operation, .. }) => {
                assert_eq!(operation, Operation::SetFrequency)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(control.connection_state(), ConnectionState::Connected);
    }

    // ===============================================================
    // Failure policy
    // ===============================================================

    #[tokio::test(start_paused = true)]
    async fn five_timeouts_degrade_then_recover() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();
        rig.time_out_frequency(5);

        let degraded =
            wait_for(&mut events, |s| s.connection_state == ConnectionState::Erroring).await;
        assert_eq!(degraded.connection_state, ConnectionState::Erroring);
        assert!(rig.count(Operation::QueryFrequency) >= 5);

        // Still taking commands while degraded.
        control.set_mode(Mode::CW).await.unwrap();
        assert_eq!(rig.mode(), Mode::CW);
        let recovered =
            wait_for(&mut events, |s| s.connection_state == ConnectionState::Connected).await;
        assert_eq!(recovered.transmit_frequency_hz, 14_074_000);
    }

    #[tokio::test(start_paused = true)]
    async fn fewer_timeouts_than_threshold_stay_connected() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();
        rig.time_out_frequency(4);
        rig.select_mode(Mode::LSB);
        wait_for(&mut events, |s| s.mode == Mode::LSB).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(control.connection_state(), ConnectionState::Connected);
        assert!(connection_states(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_loss_disconnects() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();
        rig.lose_transport_after(2);

        let mut lost = false;
        while let Some(event) = events.recv().await {
            match event {
                RigEvent::Error(RigError::TransportLost) => {
                    lost = true;
                    break;
                }
                RigEvent::StateChanged(change) => {
                    if change.state.connection_state == ConnectionState::Disconnected {
                        assert_eq!(change.state, RigState::default());
                    }
                }
                RigEvent::Error(other) => panic!("unexpected {other:?}"),
            }
        }
        assert!(lost);
        assert_eq!(control.connection_state(), ConnectionState::Disconnected);
        assert_eq!(
            control.set_frequency(Vfo::A, 7_000_000).await,
            Err(RigError::NotConfigured)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_poll_field_is_dropped() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();
        rig.set_capabilities(Capabilities {
            rit_xit: false,
            ..Capabilities::ALL
        });

        rig.select_mode(Mode::CW);
        wait_for(&mut events, |s| s.mode == Mode::CW).await;
        let rit_calls = rig.count(Operation::QueryRit);
        rig.select_mode(Mode::AM);
        wait_for(&mut events, |s| s.mode == Mode::AM).await;
        assert_eq!(rig.count(Operation::QueryRit), rit_calls);
        assert!(!control.capabilities().await.rit_xit);
        assert_eq!(control.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_stalled_call() {
        let rig = SimulatedRig::new();
        let control = Arc::new(connected(&rig, Capabilities::ALL).await);
        let mut events = control.subscribe();
        wait_for(&mut events, |s| s.transmit_frequency_hz != 0).await;

        rig.stall(true);
        let pending = {
            let control = control.clone();
            tokio::spawn(async move { control.set_ptt(true).await })
        };
        tokio::task::yield_now().await;

        control.disconnect().await;
        assert_eq!(control.connection_state(), ConnectionState::Disconnected);
        assert_eq!(pending.await.unwrap(), Err(RigError::NotConfigured));
        assert!(!rig.ptt());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn command_racing_disconnect_is_not_configured() {
        for _ in 0..25 {
            let rig = SimulatedRig::new();
            let control = connected(&rig, Capabilities::ALL).await;
            let (result, ()) = tokio::join!(
                control.set_frequency(Vfo::A, 7_030_000),
                control.disconnect()
            );
            assert!(
                matches!(result, Ok(()) | Err(RigError::NotConfigured)),
                "unexpected {result:?}"
            );
            assert_eq!(control.connection_state(), ConnectionState::Disconnected);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn commands_queued_behind_transport_loss_are_not_configured() {
        let rig = SimulatedRig::new();
        let control = Arc::new(connected(&rig, Capabilities::ALL).await);
        let mut events = control.subscribe();
        rig.lose_transport_after(2);

        let pending: Vec<_> = (0..8)
            .map(|_| {
                let control = control.clone();
                tokio::spawn(async move { control.set_mode(Mode::CW).await })
            })
            .collect();
        let mut lost = 0;
        for task in pending {
            match task.await.unwrap() {
                Ok(()) | Err(RigError::NotConfigured) => {}
                Err(RigError::TransportLost) => lost += 1,
                Err(other) => panic!("unexpected {other:?}"),
            }
        }
        // Only the command that was executing when the link dropped.
        assert!(lost <= 1, "{lost} commands saw TransportLost");
        tokio::time::timeout(
            Duration::from_secs(5),
            wait_for(&mut events, |s| s.connection_state == ConnectionState::Disconnected),
        )
        .await
        .unwrap();
    }

    #[cfg(feature = "rigctld")]
    #[tokio::test(start_paused = true)]
    async fn unreachable_rigctld_ends_disconnected() {
        use rigsync_rigctld::RigctldDriver;
        use rigsync_test_harness::{MockConnector, MockTransport};

        let link = MockTransport::new();
        link.expect(b"\\set_vfo_opt 1\n", b"RPRT 0\n");
        link.expect_hang_up(b"f currVFO\n");
        let connector = MockConnector::new();
        connector.push(link);
        connector.stall_when_empty();

        let profile = RigProfile::builder(DriverKind::Rigctld)
            .network("localhost", 4532)
            .poll_interval(Duration::from_millis(50))
            .liveness_interval(Duration::from_secs(3600))
            .build()
            .unwrap();
        let control = RigControl::new();
        let mut events = control.subscribe();
        control
            .connect_with_driver(
                profile,
                Box::new(RigctldDriver::with_connector(Arc::new(connector.clone()))),
            )
            .await
            .unwrap();

        let mut states = Vec::new();
        let ended = tokio::time::timeout(Duration::from_secs(60), async {
            while let Some(event) = events.recv().await {
                match event {
                    RigEvent::StateChanged(change) => {
                        states.push(change.state.connection_state);
                        if change.state.connection_state == ConnectionState::Disconnected {
                            return true;
                        }
                    }
                    RigEvent::Error(err) => assert_eq!(err, RigError::TransportLost),
                }
            }
            false
        })
        .await;
        assert!(matches!(ended, Ok(true)), "states so far: {states:?}");
        assert!(!states.contains(&ConnectionState::Erroring));
        assert!(connector.attempts().len() >= 2);
        assert_eq!(control.set_ptt(true).await, Err(RigError::NotConfigured));
    }

    // ===============================================================
    // State model
    // ===============================================================

    #[tokio::test(start_paused = true)]
    async fn band_always_matches_transmit_frequency() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..25 {
            let hz = rng.gen_range(100_000..60_000_000);
            rig.tune(Vfo::A, hz);
            rig.set_xit(rng.gen_range(-9_999..9_999));
            let state = wait_for(&mut events, |s| {
                s.transmit_frequency_hz != 0 && s.receive_frequency_hz == hz
            })
            .await;
            assert_eq!(state.band(), Band::from_freq(state.transmit_frequency_hz));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn split_reports_transmit_vfo() {
        let rig = SimulatedRig::new();
        rig.tune(Vfo::B, 14_030_000);
        rig.tune(Vfo::A, 14_025_000);
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();
        rig.set_split(true);
        let state = wait_for(&mut events, |s| s.split).await;
        assert_eq!(state.receive_frequency_hz, 14_025_000);
        assert_eq!(state.transmit_frequency_hz, 14_030_000);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_polls_frequency_mode_ptt_first() {
        let rig = SimulatedRig::new();
        let control = connected(&rig, Capabilities::ALL).await;
        let mut events = control.subscribe();
        wait_for(&mut events, |s| s.power_watts.is_some()).await;

        let calls = rig.calls();
        assert_eq!(
            calls[..8],
            [
                Operation::QueryFrequency,
                Operation::QueryMode,
                Operation::QueryPtt,
                Operation::QueryVfo,
                Operation::QuerySplit,
                Operation::QueryRit,
                Operation::QueryXit,
                Operation::QueryPower,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_offsets_when_rit_not_polled() {
        let rig = SimulatedRig::new();
        let mut profile = profile(Capabilities::ALL);
        profile.poll.rit = false;
        profile.poll.xit = false;
        profile.fixed_rit_offset_hz = 600;
        let control = RigControl::new();
        let mut events = control.subscribe();
        control
            .connect_with_driver(profile, Box::new(rig.driver()))
            .await
            .unwrap();
        let state = wait_for(&mut events, |s| s.receive_frequency_hz != 0).await;
        assert_eq!(state.receive_frequency_hz, 14_074_600);
        assert_eq!(state.rit_offset_hz, 600);
        assert_eq!(rig.count(Operation::QueryRit), 0);
    }
}

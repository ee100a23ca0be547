//! The polling engine: one worker task per connection.
//!
//! The worker owns the driver exclusively. It runs poll cycles on a timer
//! and executes queued commands between cycles, never inside one. Every
//! driver call is bounded by a timeout and abandoned as soon as the
//! connection is cancelled.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{Error, Operation, Result, RigError};
use rigsync_core::profile::{Capabilities, PollFields, RigProfile};
use rigsync_core::state::RigState;
use rigsync_core::types::{ConnectionState, Mode, Vfo};

use crate::command::RigCommand;
use crate::hub::EventHub;

/// Slack on top of the driver's own timeouts before the engine gives up
/// on a call.
const CALL_MARGIN: Duration = Duration::from_millis(500);

/// Commands waiting for the worker.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// A command and where to send its result.
pub(crate) struct Job {
    pub command: RigCommand,
    pub reply: oneshot::Sender<std::result::Result<(), RigError>>,
}

/// Handle to a running worker.
pub(crate) struct Worker {
    pub jobs: mpsc::Sender<Job>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
    /// Effective capabilities; shrinks when the rig turns out not to
    /// support something.
    pub caps: Arc<Mutex<Capabilities>>,
}

pub(crate) fn spawn(
    driver: Box<dyn RigDriver>,
    profile: RigProfile,
    caps: Capabilities,
    hub: Arc<EventHub>,
) -> Worker {
    let (jobs, job_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let cancel = CancellationToken::new();
    let caps = Arc::new(Mutex::new(caps));

    let engine = Engine {
        call_limit: profile.command_timeout + profile.connect_timeout + CALL_MARGIN,
        poll: profile.poll,
        readings: Readings::default(),
        failures: 0,
        next_probe: Instant::now() + profile.liveness_interval,
        driver,
        profile,
        hub,
        caps: caps.clone(),
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(engine.run(job_rx));

    Worker {
        jobs,
        cancel,
        task,
        caps,
    }
}

/// Last successfully read values. A failed query keeps the previous one.
#[derive(Debug, Clone, Default)]
struct Readings {
    dial_hz: u64,
    /// Transmit VFO dial frequency while split with a known transmit VFO.
    tx_dial_hz: Option<u64>,
    mode: Mode,
    vfo: Vfo,
    ptt: bool,
    split: bool,
    rit_hz: i32,
    xit_hz: i32,
    power_watts: Option<f32>,
}

impl Readings {
    fn apply(&self, current: &RigState) -> RigState {
        let tx_dial = self.tx_dial_hz.unwrap_or(self.dial_hz);
        RigState {
            receive_frequency_hz: offset(self.dial_hz, self.rit_hz),
            transmit_frequency_hz: offset(tx_dial, self.xit_hz),
            mode: self.mode,
            active_vfo: self.vfo,
            ptt: self.ptt,
            split: self.split,
            rit_offset_hz: self.rit_hz,
            xit_offset_hz: self.xit_hz,
            power_watts: self.power_watts,
            connection_state: current.connection_state,
        }
    }
}

/// `dial + offset`, clamped at 0. An unknown dial stays unknown.
fn offset(dial_hz: u64, offset_hz: i32) -> u64 {
    if dial_hz == 0 {
        return 0;
    }
    dial_hz.saturating_add_signed(i64::from(offset_hz))
}

/// How a driver call went, from the engine's point of view.
enum Outcome<T> {
    Value(T),
    /// Counted toward the failure threshold.
    Failed,
    /// The field is not available; stop polling it.
    Unsupported,
}

/// Why the worker stops.
enum Stop {
    Cancelled,
    TransportLost(Error),
}

struct Engine {
    driver: Box<dyn RigDriver>,
    profile: RigProfile,
    hub: Arc<EventHub>,
    caps: Arc<Mutex<Capabilities>>,
    cancel: CancellationToken,
    call_limit: Duration,
    poll: PollFields,
    readings: Readings,
    failures: u32,
    next_probe: Instant,
}

/// Run `fut` unless the connection is cancelled first or it overruns
/// `limit`.
async fn bounded<T>(
    cancel: &CancellationToken,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        },
    }
}

impl Engine {
    /// Main loop, modelled on a biased select: cancellation first, then
    /// queued commands, then the poll timer.
    async fn run(mut self, mut jobs: mpsc::Receiver<Job>) {
        let mut ticker = tokio::time::interval(self.profile.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let stop = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break Stop::Cancelled,

                job = jobs.recv() => match job {
                    Some(job) => {
                        if let Err(stop) = self.execute(job).await {
                            break stop;
                        }
                    }
                    None => {
                        debug!("all command senders dropped, stopping worker");
                        break Stop::Cancelled;
                    }
                },

                _ = ticker.tick() => {
                    if let Err(stop) = self.cycle().await {
                        break stop;
                    }
                }
            }
        };

        match stop {
            Stop::Cancelled => debug!(driver = self.driver.name(), "Worker cancelled"),
            Stop::TransportLost(e) => {
                tracing::error!(driver = self.driver.name(), "Lost connection to rig: {}", e);
                let cancel = self.cancel.clone();
                self.hub.update(|_| {
                    (!cancel.is_cancelled()).then(|| RigState {
                        connection_state: ConnectionState::Disconnected,
                        ..RigState::default()
                    })
                });
                self.hub.publish_error(RigError::TransportLost);
            }
        }

        // Disconnected is visible before anything still queued is
        // discarded, so those callers see NotConfigured.
        jobs.close();
        drop(jobs);

        let limit = self.profile.connect_timeout;
        if tokio::time::timeout(limit, self.driver.close()).await.is_err() {
            tracing::warn!(driver = self.driver.name(), "Driver close timed out");
        }
    }

    fn caps(&self) -> Capabilities {
        *self.caps.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn disable(&self, op: Operation) {
        let mut caps = self.caps.lock().unwrap_or_else(|p| p.into_inner());
        if caps.disable(op) {
            tracing::info!(operation = %op, "Rig does not support {}, disabling", op);
        }
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    async fn execute(&mut self, job: Job) -> std::result::Result<(), Stop> {
        let Job { command, reply } = job;
        let op = command.operation();
        debug!(command = %command, "Executing command");

        let result = bounded(
            &self.cancel,
            self.call_limit,
            command.execute(self.driver.as_mut()),
        )
        .await;

        match result {
            Ok(()) => {
                let _ = reply.send(Ok(()));
                Ok(())
            }
            Err(Error::Cancelled) => Err(Stop::Cancelled),
            Err(e) if e.is_transport_fatal() => {
                let _ = reply.send(Err(RigError::TransportLost));
                Err(Stop::TransportLost(e))
            }
            Err(e) => {
                tracing::warn!(command = %command, "Command failed: {}", e);
                if matches!(e, Error::Unsupported(_)) {
                    self.disable(op);
                }
                let _ = reply.send(Err(RigError::from_driver(op, e)));
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------
    // Poll cycle
    // -----------------------------------------------------------------

    /// Classify the result of one query.
    fn outcome<T>(&self, op: Operation, result: Result<T>) -> std::result::Result<Outcome<T>, Stop> {
        match result {
            Ok(value) => Ok(Outcome::Value(value)),
            Err(Error::Cancelled) => Err(Stop::Cancelled),
            Err(e) if e.is_transport_fatal() => Err(Stop::TransportLost(e)),
            Err(Error::Unsupported(_)) => {
                self.disable(op);
                Ok(Outcome::Unsupported)
            }
            Err(e) => {
                debug!(operation = %op, "Poll query failed: {}", e);
                Ok(Outcome::Failed)
            }
        }
    }

    /// Whether `op` should be polled this cycle.
    fn wanted(&self, enabled: bool, op: Operation) -> bool {
        enabled && self.caps().supports(op)
    }

    /// Query frequency, mode and PTT first, then VFO, split, RIT, XIT and
    /// power. Publishes at most one change for the whole cycle.
    async fn cycle(&mut self) -> std::result::Result<(), Stop> {
        let cancel = self.cancel.clone();
        let limit = self.call_limit;
        let mut failed = false;

        if self.poll.frequency {
            let r = bounded(&cancel, limit, self.driver.query_frequency(Vfo::Current)).await;
            match self.outcome(Operation::QueryFrequency, r)? {
                Outcome::Value(hz) => self.readings.dial_hz = hz,
                Outcome::Failed => failed = true,
                Outcome::Unsupported => self.poll.frequency = false,
            }
        }

        if self.poll.mode {
            let r = bounded(&cancel, limit, self.driver.query_mode()).await;
            match self.outcome(Operation::QueryMode, r)? {
                Outcome::Value(mode) => self.readings.mode = mode,
                Outcome::Failed => failed = true,
                Outcome::Unsupported => self.poll.mode = false,
            }
        }

        if self.wanted(self.poll.ptt, Operation::QueryPtt) {
            let r = bounded(&cancel, limit, self.driver.query_ptt()).await;
            match self.outcome(Operation::QueryPtt, r)? {
                Outcome::Value(ptt) => self.readings.ptt = ptt,
                Outcome::Failed => failed = true,
                Outcome::Unsupported => self.poll.ptt = false,
            }
        }

        if self.poll.vfo {
            let r = bounded(&cancel, limit, self.driver.query_vfo()).await;
            match self.outcome(Operation::QueryVfo, r)? {
                Outcome::Value(vfo) => self.readings.vfo = vfo,
                Outcome::Failed => failed = true,
                Outcome::Unsupported => self.poll.vfo = false,
            }
        }

        if self.wanted(self.poll.split, Operation::QuerySplit) {
            let r = bounded(&cancel, limit, self.driver.query_split()).await;
            match self.outcome(Operation::QuerySplit, r)? {
                Outcome::Value((split, tx_vfo)) => {
                    self.readings.split = split;
                    self.readings.tx_dial_hz = None;
                    if let (true, Some(vfo)) = (split, tx_vfo) {
                        let r = bounded(&cancel, limit, self.driver.query_frequency(vfo)).await;
                        match self.outcome(Operation::QueryFrequency, r)? {
                            Outcome::Value(hz) => self.readings.tx_dial_hz = Some(hz),
                            Outcome::Failed => failed = true,
                            Outcome::Unsupported => {}
                        }
                    }
                }
                Outcome::Failed => failed = true,
                Outcome::Unsupported => self.poll.split = false,
            }
        }

        if self.wanted(self.poll.rit, Operation::QueryRit) {
            let r = bounded(&cancel, limit, self.driver.query_rit()).await;
            match self.outcome(Operation::QueryRit, r)? {
                Outcome::Value(hz) => self.readings.rit_hz = hz,
                Outcome::Failed => failed = true,
                Outcome::Unsupported => self.poll.rit = false,
            }
        } else {
            self.readings.rit_hz = self.profile.fixed_rit_offset_hz;
        }

        if self.wanted(self.poll.xit, Operation::QueryXit) {
            let r = bounded(&cancel, limit, self.driver.query_xit()).await;
            match self.outcome(Operation::QueryXit, r)? {
                Outcome::Value(hz) => self.readings.xit_hz = hz,
                Outcome::Failed => failed = true,
                Outcome::Unsupported => self.poll.xit = false,
            }
        } else {
            self.readings.xit_hz = self.profile.fixed_xit_offset_hz;
        }

        if self.wanted(self.poll.power, Operation::QueryPower) {
            let r = bounded(&cancel, limit, self.driver.query_power()).await;
            match self.outcome(Operation::QueryPower, r)? {
                Outcome::Value(watts) => self.readings.power_watts = Some(watts),
                Outcome::Failed => failed = true,
                Outcome::Unsupported => {
                    self.poll.power = false;
                    self.readings.power_watts = None;
                }
            }
        }

        if Instant::now() >= self.next_probe {
            self.next_probe = Instant::now() + self.profile.liveness_interval;
            let r = bounded(&cancel, limit, self.driver.probe()).await;
            if let Err(e) = r {
                match e {
                    Error::Cancelled => return Err(Stop::Cancelled),
                    e if e.is_transport_fatal() => return Err(Stop::TransportLost(e)),
                    e => {
                        tracing::warn!(driver = self.driver.name(), "Liveness probe failed: {}", e);
                        failed = true;
                    }
                }
            }
        }

        self.finish_cycle(failed);
        Ok(())
    }

    /// Fold the cycle into the failure count and publish the new snapshot.
    fn finish_cycle(&mut self, failed: bool) {
        let threshold = self.profile.failure_threshold;
        if failed {
            self.failures = self.failures.saturating_add(1);
        } else {
            self.failures = 0;
        }

        let readings = &self.readings;
        let failures = self.failures;
        let cancel = &self.cancel;
        self.hub.update(|current| {
            if cancel.is_cancelled() || current.connection_state == ConnectionState::Disconnected {
                return None;
            }
            let mut next = readings.apply(current);
            next.connection_state = match current.connection_state {
                ConnectionState::Connected if failures >= threshold => {
                    tracing::warn!(failures, "Rig not answering, connection degraded");
                    ConnectionState::Erroring
                }
                ConnectionState::Erroring if failures == 0 => {
                    tracing::info!("Rig answering again");
                    ConnectionState::Connected
                }
                other => other,
            };
            Some(next)
        });
    }
}

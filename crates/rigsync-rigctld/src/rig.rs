//! [`RigctldDriver`]: the `RigDriver` over a `rigctld` daemon.
//!
//! One request is in flight at a time. A reply that does not arrive in time
//! leaves the stream desynchronised; whatever the daemon sends late is
//! thrown away before the next request goes out, so it cannot be mistaken
//! for the next answer. A dropped connection is re-established (bounded
//! attempts with backoff, all within `connect_timeout`) and the interrupted
//! request is replayed once, so a request that reconnects still finishes
//! within `connect_timeout + command_timeout`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use rigsync_core::driver::RigDriver;
use rigsync_core::error::{ConnectFailureReason, Error, Operation, Result};
use rigsync_core::profile::{Capabilities, RigProfile};
use rigsync_core::transport::Connector;
use rigsync_core::types::{Mode, Vfo};
use rigsync_hamlib::HamlibStatus;
use rigsync_transport::backoff::jittered_retry_delay;
use rigsync_transport::{FramedTransport, TcpConnector};

use crate::protocol::{self, parse_status};

/// Reconnect attempts after a dropped connection before giving up.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// A reply: the value lines, or the status the daemon reported instead.
type Reply = std::result::Result<Vec<String>, HamlibStatus>;

pub struct RigctldDriver {
    connector: Arc<dyn Connector>,
    link: Option<FramedTransport>,
    addr: String,
    connect_timeout: Duration,
    reply_timeout: Duration,
    opened: bool,
    /// `\set_vfo_opt 1` was accepted; commands carry a VFO argument.
    vfo_mode: bool,
    /// A request was sent and its reply not fully read.
    desynced: bool,
    caps: Capabilities,
}

impl RigctldDriver {
    pub fn new() -> Self {
        Self::with_connector(Arc::new(TcpConnector))
    }

    /// Use `connector` to reach the daemon instead of plain TCP.
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        RigctldDriver {
            connector,
            link: None,
            addr: String::new(),
            connect_timeout: Duration::from_secs(5),
            reply_timeout: Duration::from_secs(1),
            opened: false,
            vfo_mode: false,
            desynced: false,
            caps: Capabilities::NONE,
        }
    }

    /// Whether the daemon accepted VFO-addressed commands.
    pub fn vfo_mode(&self) -> bool {
        self.vfo_mode
    }

    /// Open a socket and (re)negotiate VFO mode on it.
    async fn connect_once(&mut self, negotiate: bool, timeout: Duration) -> Result<()> {
        let transport = self.connector.connect(&self.addr, timeout).await?;
        let mut link = FramedTransport::new(transport);

        if negotiate || self.vfo_mode {
            link.send(&protocol::cmd_set_vfo_opt()).await?;
            let reply = link
                .read_line(self.reply_timeout)
                .await
                .map_err(|e| match e {
                    Error::Timeout => Error::Connect(ConnectFailureReason::Timeout),
                    other => other,
                })?;
            match parse_status(&reply) {
                Some(Ok(())) => self.vfo_mode = true,
                Some(Err(status)) => {
                    tracing::debug!(addr = %self.addr, "rigctld refused VFO mode: {}", status);
                    self.vfo_mode = false;
                }
                None => {
                    return Err(Error::Protocol(format!(
                        "unexpected reply to set_vfo_opt: {reply:?}"
                    )));
                }
            }
        }

        self.link = Some(link);
        self.desynced = false;
        Ok(())
    }

    /// Re-establish the link. Every attempt, backoff included, shares one
    /// `connect_timeout` budget.
    async fn reconnect(&mut self) -> Result<()> {
        if let Some(mut link) = self.link.take() {
            link.close().await;
        }
        let budget = self.connect_timeout;
        match tokio::time::timeout(budget, self.reconnect_attempts()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => {
                tracing::warn!(
                    addr = %self.addr,
                    "Giving up on rigctld after {} attempts", MAX_RECONNECT_ATTEMPTS
                );
                Err(Error::ConnectionLost)
            }
            Err(_) => {
                tracing::warn!(addr = %self.addr, budget = ?budget, "rigctld reconnect timed out");
                Err(Error::ConnectionLost)
            }
        }
    }

    async fn reconnect_attempts(&mut self) -> Result<()> {
        let per_attempt = self.connect_timeout / MAX_RECONNECT_ATTEMPTS;
        let mut last = Error::ConnectionLost;
        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            tokio::time::sleep(jittered_retry_delay(attempt)).await;
            match self.connect_once(false, per_attempt).await {
                Ok(()) => {
                    tracing::info!(addr = %self.addr, attempt, "Reconnected to rigctld");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(addr = %self.addr, attempt, "rigctld reconnect failed: {}", e);
                    last = e;
                }
            }
        }
        Err(last)
    }

    /// Send one command and read `lines` value lines (or one status line
    /// when `lines` is 0).
    async fn exchange(&mut self, cmd: &[u8], lines: usize) -> Result<Reply> {
        let timeout = self.reply_timeout;
        let link = self.link.as_mut().ok_or(Error::ConnectionLost)?;

        if self.desynced {
            let stale = link.discard_pending().await?;
            if stale > 0 {
                tracing::debug!(bytes = stale, "Discarded late rigctld reply");
            }
        }

        self.desynced = true;
        link.send(cmd).await?;
        let first = link.read_line(timeout).await?;

        if let Some(status) = parse_status(&first) {
            self.desynced = false;
            return match status {
                Ok(()) if lines == 0 => Ok(Ok(Vec::new())),
                Ok(()) => Err(Error::Protocol("expected a value, got RPRT 0".into())),
                Err(status) => Ok(Err(status)),
            };
        }
        if lines == 0 {
            self.desynced = false;
            return Err(Error::Protocol(format!("expected a status line, got {first:?}")));
        }

        let mut out = Vec::with_capacity(lines);
        out.push(first);
        while out.len() < lines {
            out.push(link.read_line(timeout).await?);
        }
        self.desynced = false;
        Ok(Ok(out))
    }

    /// [`exchange`](Self::exchange) with reconnect-and-replay on a dropped
    /// connection, and status codes translated for `op`.
    async fn request(&mut self, op: Operation, cmd: Vec<u8>, lines: usize) -> Result<Vec<String>> {
        if !self.opened {
            return Err(Error::NotConnected);
        }

        let reply = match self.exchange(&cmd, lines).await {
            Err(e) if e.is_transport_fatal() => {
                tracing::warn!(addr = %self.addr, operation = %op, "rigctld connection lost: {}", e);
                self.reconnect().await?;
                match self.exchange(&cmd, lines).await {
                    Err(e) if e.is_transport_fatal() => {
                        self.link = None;
                        return Err(Error::ConnectionLost);
                    }
                    other => other?,
                }
            }
            other => other?,
        };

        reply.map_err(|status| {
            if status.is_unsupported() && self.caps.disable(op) {
                tracing::info!(operation = %op, "rigctld backend lacks {}, disabling", op);
            }
            status.into_error(op.name())
        })
    }

    async fn request_line(&mut self, op: Operation, cmd: Vec<u8>) -> Result<String> {
        let lines = self.request(op, cmd, 1).await?;
        Ok(lines.into_iter().next().unwrap_or_default())
    }

    async fn command(&mut self, op: Operation, cmd: Vec<u8>) -> Result<()> {
        self.request(op, cmd, 0).await.map(|_| ())
    }

    /// The VFO argument for `vfo`. Without VFO mode only the current VFO
    /// can be addressed.
    fn target(&self, vfo: Vfo) -> Result<Option<Vfo>> {
        match (self.vfo_mode, vfo) {
            (true, vfo) => Ok(Some(vfo)),
            (false, Vfo::Current) => Ok(None),
            (false, _) => Err(Error::Unsupported(
                "per-VFO access needs rigctld VFO mode".into(),
            )),
        }
    }

    fn current(&self) -> Option<Vfo> {
        self.vfo_mode.then_some(Vfo::Current)
    }
}

impl Default for RigctldDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RigDriver for RigctldDriver {
    fn name(&self) -> &'static str {
        "rigctld"
    }

    async fn open(&mut self, profile: &RigProfile) -> Result<()> {
        self.close().await;

        self.addr = profile.connection.address().ok_or_else(|| {
            Error::Connect(ConnectFailureReason::InvalidProfile(
                "rigctld needs a network connection".into(),
            ))
        })?;
        self.connect_timeout = profile.connect_timeout;
        self.reply_timeout = profile.command_timeout;

        let timeout = self.connect_timeout;
        self.connect_once(true, timeout).await.map_err(|e| match e {
            Error::Connect(reason) => Error::Connect(reason),
            other => Error::Connect(ConnectFailureReason::Other(other.to_string())),
        })?;
        self.opened = true;
        self.caps = Capabilities::ALL;
        tracing::info!(addr = %self.addr, vfo_mode = self.vfo_mode, "Connected to rigctld");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close().await;
            tracing::debug!(addr = %self.addr, "rigctld connection closed");
        }
        self.opened = false;
        self.desynced = false;
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    async fn query_frequency(&mut self, vfo: Vfo) -> Result<u64> {
        let target = self.target(vfo)?;
        let line = self
            .request_line(Operation::QueryFrequency, protocol::cmd_get_freq(target))
            .await?;
        protocol::parse_u64(&line)
    }

    async fn query_mode(&mut self) -> Result<Mode> {
        let lines = self
            .request(Operation::QueryMode, protocol::cmd_get_mode(self.current()), 2)
            .await?;
        Ok(protocol::mode_from_name(&lines[0]))
    }

    async fn query_vfo(&mut self) -> Result<Vfo> {
        let line = self
            .request_line(Operation::QueryVfo, protocol::cmd_get_vfo())
            .await?;
        Ok(protocol::parse_vfo(&line).unwrap_or(Vfo::Current))
    }

    async fn query_ptt(&mut self) -> Result<bool> {
        self.caps.require(Operation::QueryPtt)?;
        let line = self
            .request_line(Operation::QueryPtt, protocol::cmd_get_ptt(self.current()))
            .await?;
        protocol::parse_bool(&line)
    }

    async fn query_split(&mut self) -> Result<(bool, Option<Vfo>)> {
        self.caps.require(Operation::QuerySplit)?;
        let lines = self
            .request(Operation::QuerySplit, protocol::cmd_get_split(self.current()), 2)
            .await?;
        let on = protocol::parse_bool(&lines[0])?;
        let tx = protocol::parse_vfo(&lines[1]).filter(|v| *v != Vfo::Current);
        Ok((on, tx))
    }

    async fn query_rit(&mut self) -> Result<i32> {
        self.caps.require(Operation::QueryRit)?;
        let line = self
            .request_line(Operation::QueryRit, protocol::cmd_get_rit(self.current()))
            .await?;
        protocol::parse_i32(&line)
    }

    async fn query_xit(&mut self) -> Result<i32> {
        self.caps.require(Operation::QueryXit)?;
        let line = self
            .request_line(Operation::QueryXit, protocol::cmd_get_xit(self.current()))
            .await?;
        protocol::parse_i32(&line)
    }

    /// RFPOWER is relative; the daemon's `power2mW` converts it with the
    /// rig's power table for the current frequency and mode.
    async fn query_power(&mut self) -> Result<f32> {
        self.caps.require(Operation::QueryPower)?;
        let vfo = self.current();
        let level = protocol::parse_f32(
            &self
                .request_line(Operation::QueryPower, protocol::cmd_get_rfpower(vfo))
                .await?,
        )?;
        let freq = protocol::parse_u64(
            &self
                .request_line(Operation::QueryPower, protocol::cmd_get_freq(vfo))
                .await?,
        )?;
        let mode = self
            .request(Operation::QueryPower, protocol::cmd_get_mode(vfo), 2)
            .await?;
        let mw = protocol::parse_u64(
            &self
                .request_line(
                    Operation::QueryPower,
                    protocol::cmd_power2mw(level, freq, mode[0].trim()),
                )
                .await?,
        )?;
        Ok(mw as f32 / 1000.0)
    }

    async fn set_frequency(&mut self, vfo: Vfo, freq_hz: u64) -> Result<()> {
        let target = self.target(vfo)?;
        self.command(Operation::SetFrequency, protocol::cmd_set_freq(target, freq_hz))
            .await
    }

    async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        let name = protocol::mode_name(mode)
            .ok_or_else(|| Error::InvalidParameter(format!("cannot set mode {mode}")))?;
        self.command(Operation::SetMode, protocol::cmd_set_mode(self.current(), name))
            .await
    }

    async fn set_ptt(&mut self, on: bool) -> Result<()> {
        self.caps.require(Operation::SetPtt)?;
        self.command(Operation::SetPtt, protocol::cmd_set_ptt(self.current(), on))
            .await
    }

    async fn send_morse(&mut self, text: &str) -> Result<()> {
        self.caps.require(Operation::SendMorse)?;
        self.command(
            Operation::SendMorse,
            protocol::cmd_send_morse(self.current(), text),
        )
        .await
    }

    async fn stop_morse(&mut self) -> Result<()> {
        self.caps.require(Operation::StopMorse)?;
        self.command(Operation::StopMorse, protocol::cmd_stop_morse(self.current()))
            .await
    }

    async fn set_key_speed(&mut self, wpm: u16) -> Result<()> {
        self.caps.require(Operation::SetKeySpeed)?;
        self.command(
            Operation::SetKeySpeed,
            protocol::cmd_set_keyspd(self.current(), wpm),
        )
        .await
    }

    /// `\get_powerstat`: `0` means the daemon is up but the radio is off.
    async fn probe(&mut self) -> Result<()> {
        match self
            .request_line(Operation::Open, protocol::cmd_get_powerstat())
            .await
        {
            Ok(line) => {
                if protocol::parse_bool(&line)? {
                    Ok(())
                } else {
                    Err(Error::Rejected("rig is powered off".into()))
                }
            }
            // Backends without power control cannot tell; assume it is on.
            Err(Error::Unsupported(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigsync_core::profile::DriverKind;
    use rigsync_test_harness::{MockConnector, MockTcpServer, MockTransport};

    fn profile() -> RigProfile {
        RigProfile::builder(DriverKind::Rigctld)
            .network("localhost", 4532)
            .build()
            .unwrap()
    }

    /// A transport that has already accepted VFO mode.
    fn vfo_link() -> MockTransport {
        let mock = MockTransport::new();
        mock.expect(b"\\set_vfo_opt 1\n", b"RPRT 0\n");
        mock
    }

    async fn open_with(links: &[MockTransport]) -> (RigctldDriver, MockConnector) {
        let connector = MockConnector::new();
        for link in links {
            connector.push(link.clone());
        }
        let mut driver = RigctldDriver::with_connector(Arc::new(connector.clone()));
        driver.open(&profile()).await.unwrap();
        (driver, connector)
    }

    // ===============================================================
    // Open
    // ===============================================================

    #[tokio::test]
    async fn open_negotiates_vfo_mode() {
        let link = vfo_link();
        let (driver, connector) = open_with(&[link.clone()]).await;
        assert!(driver.vfo_mode());
        assert_eq!(connector.attempts(), vec!["localhost:4532".to_string()]);
        assert_eq!(link.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn open_refused() {
        let mut driver = RigctldDriver::with_connector(Arc::new(MockConnector::new()));
        let err = driver.open(&profile()).await.unwrap_err();
        assert!(matches!(err, Error::Connect(ConnectFailureReason::Refused)));
    }

    #[tokio::test]
    async fn open_silent_daemon_times_out() {
        let link = MockTransport::new();
        link.expect_silence(b"\\set_vfo_opt 1\n");
        let connector = MockConnector::new();
        connector.push(link);
        let mut driver = RigctldDriver::with_connector(Arc::new(connector));
        let err = driver.open(&profile()).await.unwrap_err();
        assert!(matches!(err, Error::Connect(ConnectFailureReason::Timeout)));
    }

    #[tokio::test]
    async fn older_daemon_without_vfo_mode() {
        let link = MockTransport::new();
        link.expect(b"\\set_vfo_opt 1\n", b"RPRT -1\n");
        link.expect(b"f\n", b"7074000\n");
        let (mut driver, _) = open_with(&[link]).await;
        assert!(!driver.vfo_mode());
        assert_eq!(driver.query_frequency(Vfo::Current).await.unwrap(), 7_074_000);
        assert!(matches!(
            driver.query_frequency(Vfo::B).await,
            Err(Error::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn queries_before_open_fail() {
        let mut driver = RigctldDriver::with_connector(Arc::new(MockConnector::new()));
        assert!(matches!(
            driver.query_mode().await,
            Err(Error::NotConnected)
        ));
    }

    // ===============================================================
    // Queries
    // ===============================================================

    #[tokio::test]
    async fn frequency_and_mode() {
        let link = vfo_link();
        link.expect(b"f VFOA\n", b"14074000\n");
        link.expect(b"m currVFO\n", b"PKTUSB\n3000\n");
        link.expect(b"v\n", b"VFOA\n");
        let (mut driver, _) = open_with(&[link]).await;

        assert_eq!(driver.query_frequency(Vfo::A).await.unwrap(), 14_074_000);
        assert_eq!(driver.query_mode().await.unwrap(), Mode::DataUSB);
        assert_eq!(driver.query_vfo().await.unwrap(), Vfo::A);
    }

    #[tokio::test]
    async fn split_with_tx_vfo() {
        let link = vfo_link();
        link.expect(b"s currVFO\n", b"1\nVFOB\n");
        let (mut driver, _) = open_with(&[link]).await;
        assert_eq!(driver.query_split().await.unwrap(), (true, Some(Vfo::B)));
    }

    #[tokio::test]
    async fn rit_and_xit() {
        let link = vfo_link();
        link.expect(b"j currVFO\n", b"-120\n");
        link.expect(b"z currVFO\n", b"0\n");
        let (mut driver, _) = open_with(&[link]).await;
        assert_eq!(driver.query_rit().await.unwrap(), -120);
        assert_eq!(driver.query_xit().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn power_via_power2mw() {
        let link = vfo_link();
        link.expect(b"l currVFO RFPOWER\n", b"0.5\n");
        link.expect(b"f currVFO\n", b"14074000\n");
        link.expect(b"m currVFO\n", b"USB\n2400\n");
        link.expect(b"\\power2mW 0.5 14074000 USB\n", b"50000\n");
        let (mut driver, _) = open_with(&[link]).await;
        let watts = driver.query_power().await.unwrap();
        assert!((watts - 50.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn not_available_latches_capability() {
        let link = vfo_link();
        link.expect(b"t currVFO\n", b"RPRT -11\n");
        let (mut driver, _) = open_with(&[link.clone()]).await;

        assert!(matches!(driver.query_ptt().await, Err(Error::Unsupported(_))));
        assert!(!driver.capabilities().ptt);

        let sent = link.sent_data().len();
        assert!(matches!(driver.query_ptt().await, Err(Error::Unsupported(_))));
        assert_eq!(link.sent_data().len(), sent);
    }

    // ===============================================================
    // Commands
    // ===============================================================

    #[tokio::test]
    async fn set_commands() {
        let link = vfo_link();
        link.expect(b"F VFOA 14200000\n", b"RPRT 0\n");
        link.expect(b"M currVFO CW 0\n", b"RPRT 0\n");
        link.expect(b"T currVFO 1\n", b"RPRT 0\n");
        link.expect(b"b currVFO CQ TEST\n", b"RPRT 0\n");
        link.expect(b"L currVFO KEYSPD 22\n", b"RPRT 0\n");
        link.expect(b"\\stop_morse currVFO\n", b"RPRT 0\n");
        let (mut driver, _) = open_with(&[link.clone()]).await;

        driver.set_frequency(Vfo::A, 14_200_000).await.unwrap();
        driver.set_mode(Mode::CW).await.unwrap();
        driver.set_ptt(true).await.unwrap();
        driver.send_morse("CQ TEST").await.unwrap();
        driver.set_key_speed(22).await.unwrap();
        driver.stop_morse().await.unwrap();
        assert_eq!(link.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn rejected_command() {
        let link = vfo_link();
        link.expect(b"F currVFO 99000000000\n", b"RPRT -9\n");
        let (mut driver, _) = open_with(&[link]).await;
        assert!(matches!(
            driver.set_frequency(Vfo::Current, 99_000_000_000).await,
            Err(Error::Rejected(_))
        ));
    }

    // ===============================================================
    // Desync and reconnect
    // ===============================================================

    #[tokio::test]
    async fn late_reply_is_discarded() {
        let link = vfo_link();
        link.expect_silence(b"f currVFO\n");
        link.expect(b"m currVFO\n", b"LSB\n2400\n");
        let (mut driver, _) = open_with(&[link.clone()]).await;

        assert!(matches!(
            driver.query_frequency(Vfo::Current).await,
            Err(Error::Timeout)
        ));
        // The daemon answers the timed-out request after all.
        link.inject(b"14074000\n");
        assert_eq!(driver.query_mode().await.unwrap(), Mode::LSB);
    }

    #[tokio::test]
    async fn reconnects_and_replays() {
        let first = vfo_link();
        first.expect_hang_up(b"f currVFO\n");
        let second = vfo_link();
        second.expect(b"f currVFO\n", b"21074000\n");
        let (mut driver, connector) = open_with(&[first, second.clone()]).await;

        assert_eq!(
            driver.query_frequency(Vfo::Current).await.unwrap(),
            21_074_000
        );
        assert_eq!(connector.attempts().len(), 2);
        assert_eq!(second.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn reconnect_gives_up() {
        let link = vfo_link();
        link.expect_hang_up(b"f currVFO\n");
        let (mut driver, connector) = open_with(&[link]).await;

        assert!(matches!(
            driver.query_frequency(Vfo::Current).await,
            Err(Error::ConnectionLost)
        ));
        assert_eq!(
            connector.attempts().len(),
            1 + MAX_RECONNECT_ATTEMPTS as usize
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_to_silent_host_fits_connect_timeout() {
        let link = vfo_link();
        link.expect_hang_up(b"f currVFO\n");
        let (mut driver, connector) = open_with(&[link]).await;
        connector.stall_when_empty();

        let started = tokio::time::Instant::now();
        assert!(matches!(
            driver.query_frequency(Vfo::Current).await,
            Err(Error::ConnectionLost)
        ));
        assert!(started.elapsed() <= profile().connect_timeout);
        assert!(connector.attempts().len() >= 2);
    }

    // ===============================================================
    // Liveness
    // ===============================================================

    #[tokio::test]
    async fn probe_reports_radio_off() {
        let link = vfo_link();
        link.expect(b"\\get_powerstat\n", b"1\n");
        link.expect(b"\\get_powerstat\n", b"0\n");
        link.expect(b"\\get_powerstat\n", b"RPRT -4\n");
        let (mut driver, _) = open_with(&[link]).await;

        assert!(driver.probe().await.is_ok());
        let err = driver.probe().await.unwrap_err();
        assert!(matches!(err, Error::Rejected(_)));
        assert!(!err.is_transport_fatal());
        assert!(driver.probe().await.is_ok());
    }

    // ===============================================================
    // Real socket
    // ===============================================================

    #[tokio::test]
    async fn talks_to_a_tcp_daemon() {
        let mut server = MockTcpServer::new().await.unwrap();
        server.expect(b"\\set_vfo_opt 1\n", b"RPRT 0\n");
        server.expect(b"f currVFO\n", b"3573000\n");
        server.expect(b"M currVFO PKTUSB 0\n", b"RPRT 0\n");
        let port = server.port();
        server.start();

        let profile = RigProfile::builder(DriverKind::Rigctld)
            .network("127.0.0.1", port)
            .build()
            .unwrap();
        let mut driver = RigctldDriver::new();
        driver.open(&profile).await.unwrap();
        assert_eq!(driver.query_frequency(Vfo::Current).await.unwrap(), 3_573_000);
        driver.set_mode(Mode::DataUSB).await.unwrap();
        driver.close().await;

        server.wait().await.unwrap();
    }
}

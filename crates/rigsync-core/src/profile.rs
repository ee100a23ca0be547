//! Rig profiles: everything needed to open and poll one rig.
//!
//! A [`RigProfile`] is configuration-owned and read-only to this crate. The
//! facade keeps its own copy for the lifetime of a connection.
//!
//! # Example
//!
//! ```
//! use rigsync_core::profile::{DriverKind, RigProfile};
//! use std::time::Duration;
//!
//! let profile = RigProfile::builder(DriverKind::Rigctld)
//!     .network("localhost", 4532)
//!     .poll_interval(Duration::from_millis(250))
//!     .morse(true)
//!     .build()
//!     .unwrap();
//! assert!(profile.capabilities.morse);
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Operation, Result};

/// Default interval between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest poll interval a profile may request.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Which protocol driver a profile selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    /// The Hamlib CAT library, loaded at runtime.
    Hamlib,
    /// A `rigctld` daemon over its line-oriented TCP protocol.
    Rigctld,
    /// flrig over XML-RPC.
    Flrig,
    /// The OmniRig COM automation bridge (Windows).
    OmniRig,
    /// Omni-Rig V2, the four-slot successor of OmniRig.
    OmniRigV2,
}

impl DriverKind {
    pub fn name(&self) -> &'static str {
        match self {
            DriverKind::Hamlib => "hamlib",
            DriverKind::Rigctld => "rigctld",
            DriverKind::Flrig => "flrig",
            DriverKind::OmniRig => "omnirig",
            DriverKind::OmniRigV2 => "omnirig2",
        }
    }

    /// Rig slots the bridge publishes (`Rig1`..`RigN`), for the bridge
    /// drivers.
    pub fn rig_slots(&self) -> Option<RangeInclusive<u32>> {
        match self {
            DriverKind::OmniRig => Some(1..=2),
            DriverKind::OmniRigV2 => Some(1..=4),
            DriverKind::Hamlib | DriverKind::Rigctld | DriverKind::Flrig => None,
        }
    }

    /// The TCP port the daemon listens on out of the box, if any.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DriverKind::Rigctld => Some(4532),
            DriverKind::Flrig => Some(12345),
            DriverKind::Hamlib | DriverKind::OmniRig | DriverKind::OmniRigV2 => None,
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DriverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hamlib" => Ok(DriverKind::Hamlib),
            "rigctld" => Ok(DriverKind::Rigctld),
            "flrig" => Ok(DriverKind::Flrig),
            "omnirig" => Ok(DriverKind::OmniRig),
            "omnirig2" | "omnirigv2" => Ok(DriverKind::OmniRigV2),
            _ => Err(Error::InvalidParameter(format!("unknown driver: {s}"))),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

/// Serial line settings. The port name is an opaque string (`COM3`,
/// `/dev/ttyUSB0`); this crate never enumerates devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialParams {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

impl SerialParams {
    /// 9600-8-N-1, no flow control.
    pub fn new(port: &str) -> Self {
        SerialParams {
            port: port.to_string(),
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// How the driver reaches the rig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Serial(SerialParams),
    Network { host: String, port: u16 },
    /// The driver locates the rig itself (automation bridges).
    Local,
}

impl Connection {
    /// `host:port` for network connections.
    pub fn address(&self) -> Option<String> {
        match self {
            Connection::Network { host, port } => Some(format!("{host}:{port}")),
            _ => None,
        }
    }
}

/// Capability flags.
///
/// The profile declares what the operator says the rig can do; after
/// `open()` the driver narrows it to what it actually negotiated, and the
/// facade works from [`Capabilities::intersect`] of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub ptt: bool,
    pub split: bool,
    /// Morse over CAT: `send_morse`, `stop_morse`, `set_key_speed`.
    pub morse: bool,
    pub rit_xit: bool,
    pub power: bool,
}

impl Capabilities {
    /// Everything on.
    pub const ALL: Capabilities = Capabilities {
        ptt: true,
        split: true,
        morse: true,
        rit_xit: true,
        power: true,
    };

    /// Everything off.
    pub const NONE: Capabilities = Capabilities {
        ptt: false,
        split: false,
        morse: false,
        rit_xit: false,
        power: false,
    };

    pub fn intersect(&self, other: &Capabilities) -> Capabilities {
        Capabilities {
            ptt: self.ptt && other.ptt,
            split: self.split && other.split,
            morse: self.morse && other.morse,
            rit_xit: self.rit_xit && other.rit_xit,
            power: self.power && other.power,
        }
    }

    /// Whether `op` may be attempted at all.
    pub fn supports(&self, op: Operation) -> bool {
        match op {
            Operation::QueryPtt | Operation::SetPtt => self.ptt,
            Operation::QuerySplit => self.split,
            Operation::SendMorse | Operation::StopMorse | Operation::SetKeySpeed => self.morse,
            Operation::QueryRit | Operation::QueryXit => self.rit_xit,
            Operation::QueryPower => self.power,
            Operation::Open
            | Operation::QueryFrequency
            | Operation::QueryMode
            | Operation::QueryVfo
            | Operation::SetFrequency
            | Operation::SetMode => true,
        }
    }

    /// Turn off the flag gating `op`. Returns `true` if it was on.
    ///
    /// Drivers call this when the rig answers "not implemented", so the
    /// operation is not attempted again for the rest of the session.
    pub fn disable(&mut self, op: Operation) -> bool {
        let flag = match op {
            Operation::QueryPtt | Operation::SetPtt => &mut self.ptt,
            Operation::QuerySplit => &mut self.split,
            Operation::SendMorse | Operation::StopMorse | Operation::SetKeySpeed => {
                &mut self.morse
            }
            Operation::QueryRit | Operation::QueryXit => &mut self.rit_xit,
            Operation::QueryPower => &mut self.power,
            _ => return false,
        };
        std::mem::replace(flag, false)
    }

    /// `Err(Unsupported)` unless `op` is supported.
    pub fn require(&self, op: Operation) -> Result<()> {
        if self.supports(op) {
            Ok(())
        } else {
            Err(Error::Unsupported(op.to_string()))
        }
    }
}

impl Default for Capabilities {
    /// PTT only; everything else must be declared.
    fn default() -> Self {
        Capabilities {
            ptt: true,
            ..Capabilities::NONE
        }
    }
}

/// Which state fields the polling engine queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFields {
    pub frequency: bool,
    pub mode: bool,
    pub vfo: bool,
    pub ptt: bool,
    pub split: bool,
    pub rit: bool,
    pub xit: bool,
    pub power: bool,
}

impl Default for PollFields {
    fn default() -> Self {
        PollFields {
            frequency: true,
            mode: true,
            vfo: true,
            ptt: true,
            split: true,
            rit: true,
            xit: true,
            power: true,
        }
    }
}

/// A validated rig profile.
#[derive(Debug, Clone, PartialEq)]
pub struct RigProfile {
    /// Display name for logs and the UI.
    pub name: String,
    pub driver: DriverKind,
    /// Driver-specific model identifier: the Hamlib model number, or the
    /// OmniRig rig slot (`1`-`2`, `1`-`4` for Omni-Rig V2). Unused by the
    /// network daemons.
    pub model: u32,
    pub connection: Connection,
    pub capabilities: Capabilities,
    pub poll: PollFields,
    pub poll_interval: Duration,
    /// Budget for a single query or command.
    pub command_timeout: Duration,
    pub connect_timeout: Duration,
    /// Consecutive failing poll cycles before the connection is `Erroring`.
    pub failure_threshold: u32,
    /// How often the driver's liveness probe runs.
    pub liveness_interval: Duration,
    /// RIT reported when RIT is not polled.
    pub fixed_rit_offset_hz: i32,
    /// XIT reported when XIT is not polled.
    pub fixed_xit_offset_hz: i32,
}

impl RigProfile {
    pub fn builder(driver: DriverKind) -> RigProfileBuilder {
        RigProfileBuilder::new(driver)
    }

    /// Check the profile for values no driver could work with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(Error::InvalidParameter(format!(
                "poll interval {:?} is below the {:?} minimum",
                self.poll_interval, MIN_POLL_INTERVAL
            )));
        }
        if self.command_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(Error::InvalidParameter("timeouts must be non-zero".into()));
        }
        if self.failure_threshold == 0 {
            return Err(Error::InvalidParameter(
                "failure threshold must be at least 1".into(),
            ));
        }
        match (&self.connection, self.driver) {
            (Connection::Serial(params), _) if params.port.trim().is_empty() => Err(
                Error::InvalidParameter("serial port name is empty".into()),
            ),
            (Connection::Serial(params), _) if params.baud_rate == 0 => {
                Err(Error::InvalidParameter("baud rate must be non-zero".into()))
            }
            (Connection::Network { host, .. }, _) if host.trim().is_empty() => {
                Err(Error::InvalidParameter("host name is empty".into()))
            }
            (Connection::Network { port: 0, .. }, _) => {
                Err(Error::InvalidParameter("port must be non-zero".into()))
            }
            (Connection::Local, driver) => match driver.rig_slots() {
                Some(slots) if slots.contains(&self.model) => Ok(()),
                Some(slots) => Err(Error::InvalidParameter(format!(
                    "{driver} rig slot must be {}-{}, got {}",
                    slots.start(),
                    slots.end(),
                    self.model
                ))),
                None => Err(Error::InvalidParameter(format!(
                    "{driver} needs a serial or network connection"
                ))),
            },
            (_, DriverKind::Rigctld | DriverKind::Flrig)
                if !matches!(self.connection, Connection::Network { .. }) =>
            {
                Err(Error::InvalidParameter(format!(
                    "{} needs a network connection",
                    self.driver
                )))
            }
            (_, DriverKind::OmniRig | DriverKind::OmniRigV2) => Err(Error::InvalidParameter(
                format!("{} profiles use a local connection", self.driver),
            )),
            _ => Ok(()),
        }
    }
}

/// Fluent builder for [`RigProfile`].
#[derive(Debug, Clone)]
pub struct RigProfileBuilder {
    profile: RigProfile,
}

impl RigProfileBuilder {
    /// Start a profile for `driver` with defaults: 500 ms polling, 1 s
    /// command timeout, 5 s connect timeout, threshold of 5 failing cycles,
    /// and the daemon's default port on `localhost` for network drivers.
    pub fn new(driver: DriverKind) -> Self {
        let connection = match driver.default_port() {
            Some(port) => Connection::Network {
                host: "localhost".into(),
                port,
            },
            None => Connection::Local,
        };
        RigProfileBuilder {
            profile: RigProfile {
                name: driver.name().to_string(),
                driver,
                model: driver.rig_slots().map_or(0, |slots| *slots.start()),
                connection,
                capabilities: Capabilities::default(),
                poll: PollFields::default(),
                poll_interval: DEFAULT_POLL_INTERVAL,
                command_timeout: Duration::from_secs(1),
                connect_timeout: Duration::from_secs(5),
                failure_threshold: 5,
                liveness_interval: Duration::from_secs(5),
                fixed_rit_offset_hz: 0,
                fixed_xit_offset_hz: 0,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.profile.name = name.to_string();
        self
    }

    /// Hamlib model number, or OmniRig rig slot.
    pub fn model(mut self, model: u32) -> Self {
        self.profile.model = model;
        self
    }

    pub fn serial(mut self, params: SerialParams) -> Self {
        self.profile.connection = Connection::Serial(params);
        self
    }

    pub fn network(mut self, host: &str, port: u16) -> Self {
        self.profile.connection = Connection::Network {
            host: host.to_string(),
            port,
        };
        self
    }

    pub fn capabilities(mut self, caps: Capabilities) -> Self {
        self.profile.capabilities = caps;
        self
    }

    pub fn ptt(mut self, on: bool) -> Self {
        self.profile.capabilities.ptt = on;
        self
    }

    pub fn split(mut self, on: bool) -> Self {
        self.profile.capabilities.split = on;
        self
    }

    pub fn morse(mut self, on: bool) -> Self {
        self.profile.capabilities.morse = on;
        self
    }

    pub fn rit_xit(mut self, on: bool) -> Self {
        self.profile.capabilities.rit_xit = on;
        self
    }

    pub fn power(mut self, on: bool) -> Self {
        self.profile.capabilities.power = on;
        self
    }

    pub fn poll_fields(mut self, fields: PollFields) -> Self {
        self.profile.poll = fields;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.profile.poll_interval = interval;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.profile.command_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.profile.connect_timeout = timeout;
        self
    }

    pub fn failure_threshold(mut self, cycles: u32) -> Self {
        self.profile.failure_threshold = cycles;
        self
    }

    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.profile.liveness_interval = interval;
        self
    }

    /// Offsets reported when RIT/XIT are not polled.
    pub fn fixed_offsets(mut self, rit_hz: i32, xit_hz: i32) -> Self {
        self.profile.fixed_rit_offset_hz = rit_hz;
        self.profile.fixed_xit_offset_hz = xit_hz;
        self
    }

    pub fn build(self) -> Result<RigProfile> {
        self.profile.validate()?;
        Ok(self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let p = RigProfile::builder(DriverKind::Rigctld).build().unwrap();
        assert_eq!(p.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(p.failure_threshold, 5);
        assert_eq!(
            p.connection,
            Connection::Network {
                host: "localhost".into(),
                port: 4532
            }
        );
        assert!(p.capabilities.ptt);
        assert!(!p.capabilities.morse);
    }

    #[test]
    fn hamlib_requires_a_connection() {
        let result = RigProfile::builder(DriverKind::Hamlib).model(1035).build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let p = RigProfile::builder(DriverKind::Hamlib)
            .model(1035)
            .serial(SerialParams::new("/dev/ttyUSB0"))
            .build()
            .unwrap();
        assert_eq!(p.model, 1035);
    }

    #[test]
    fn rejects_tiny_poll_interval() {
        let result = RigProfile::builder(DriverKind::Flrig)
            .poll_interval(Duration::from_millis(10))
            .build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn rejects_zero_threshold() {
        let result = RigProfile::builder(DriverKind::Flrig)
            .failure_threshold(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rigctld_rejects_serial() {
        let result = RigProfile::builder(DriverKind::Rigctld)
            .serial(SerialParams::new("COM3"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn omnirig_slot_must_be_one_or_two() {
        assert!(RigProfile::builder(DriverKind::OmniRig).build().is_ok());
        assert!(RigProfile::builder(DriverKind::OmniRig).model(2).build().is_ok());
        assert!(RigProfile::builder(DriverKind::OmniRig).model(3).build().is_err());
    }

    #[test]
    fn omnirig_v2_has_four_slots() {
        let profile = RigProfile::builder(DriverKind::OmniRigV2).build().unwrap();
        assert_eq!(profile.model, 1);
        assert_eq!(profile.connection, Connection::Local);
        for slot in 1..=4 {
            assert!(RigProfile::builder(DriverKind::OmniRigV2).model(slot).build().is_ok());
        }
        assert!(RigProfile::builder(DriverKind::OmniRigV2).model(0).build().is_err());
        assert!(RigProfile::builder(DriverKind::OmniRigV2).model(5).build().is_err());
        assert!(
            RigProfile::builder(DriverKind::OmniRigV2)
                .network("localhost", 4532)
                .build()
                .is_err()
        );
    }

    #[test]
    fn capability_gating() {
        let caps = Capabilities::default();
        assert!(caps.supports(Operation::SetPtt));
        assert!(caps.supports(Operation::SetFrequency));
        assert!(!caps.supports(Operation::SendMorse));
        assert!(matches!(
            caps.require(Operation::SetKeySpeed),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn disable_latches_the_gating_flag() {
        let mut caps = Capabilities::ALL;
        assert!(caps.disable(Operation::QueryXit));
        assert!(!caps.rit_xit);
        assert!(!caps.supports(Operation::QueryRit));
        assert!(!caps.disable(Operation::QueryRit));
        assert!(!caps.disable(Operation::SetFrequency));
        assert!(caps.supports(Operation::SetFrequency));
    }

    #[test]
    fn capability_intersection() {
        let declared = Capabilities::ALL;
        let negotiated = Capabilities {
            morse: false,
            ..Capabilities::ALL
        };
        let effective = declared.intersect(&negotiated);
        assert!(!effective.morse);
        assert!(effective.rit_xit);
    }

    #[test]
    fn driver_kind_from_str() {
        assert_eq!("OmniRig".parse::<DriverKind>().unwrap(), DriverKind::OmniRig);
        assert_eq!("omnirig2".parse::<DriverKind>().unwrap(), DriverKind::OmniRigV2);
        assert!("hrd".parse::<DriverKind>().is_err());
    }
}

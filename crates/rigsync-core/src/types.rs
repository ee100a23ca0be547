//! Canonical value types shared by every driver.
//!
//! Drivers translate their wire vocabulary into these types; nothing above
//! the driver layer ever sees a protocol-specific mode string or VFO code.

use std::fmt;
use std::str::FromStr;

/// Operating mode of the transceiver.
///
/// Covers the analog modes plus the data sub-modes used by sound-card
/// digital software. A mode a driver cannot place is reported as
/// [`Mode::Unknown`] rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Upper sideband voice.
    USB,
    /// Lower sideband voice.
    LSB,
    /// CW with upper sideband offset.
    CW,
    /// CW reverse (lower sideband offset).
    CWR,
    /// Amplitude modulation.
    AM,
    /// Frequency modulation.
    FM,
    /// Radio teletype (FSK), upper sideband.
    RTTY,
    /// Radio teletype (FSK), reverse.
    RTTYR,
    /// Data mode using upper sideband (AFSK, sound-card digital).
    DataUSB,
    /// Data mode using lower sideband.
    DataLSB,
    /// Data mode using FM.
    DataFM,
    /// Data mode using AM.
    DataAM,
    /// Not yet polled, or a driver value with no canonical equivalent.
    #[default]
    Unknown,
}

impl Mode {
    /// Every concrete mode, excluding [`Mode::Unknown`].
    pub const ALL: [Mode; 12] = [
        Mode::USB,
        Mode::LSB,
        Mode::CW,
        Mode::CWR,
        Mode::AM,
        Mode::FM,
        Mode::RTTY,
        Mode::RTTYR,
        Mode::DataUSB,
        Mode::DataLSB,
        Mode::DataFM,
        Mode::DataAM,
    ];

    /// Whether this is a sound-card data sub-mode.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Mode::DataUSB | Mode::DataLSB | Mode::DataFM | Mode::DataAM
        )
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::USB => "USB",
            Mode::LSB => "LSB",
            Mode::CW => "CW",
            Mode::CWR => "CWR",
            Mode::AM => "AM",
            Mode::FM => "FM",
            Mode::RTTY => "RTTY",
            Mode::RTTYR => "RTTYR",
            Mode::DataUSB => "DATA-USB",
            Mode::DataLSB => "DATA-LSB",
            Mode::DataFM => "DATA-FM",
            Mode::DataAM => "DATA-AM",
            Mode::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode: {}", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    /// Parses the canonical names only. Drivers map their own vocabularies.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USB" => Ok(Mode::USB),
            "LSB" => Ok(Mode::LSB),
            "CW" => Ok(Mode::CW),
            "CWR" => Ok(Mode::CWR),
            "AM" => Ok(Mode::AM),
            "FM" => Ok(Mode::FM),
            "RTTY" => Ok(Mode::RTTY),
            "RTTYR" => Ok(Mode::RTTYR),
            "DATA-USB" | "DATAUSB" => Ok(Mode::DataUSB),
            "DATA-LSB" | "DATALSB" => Ok(Mode::DataLSB),
            "DATA-FM" | "DATAFM" => Ok(Mode::DataFM),
            "DATA-AM" | "DATAAM" => Ok(Mode::DataAM),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// VFO selector.
///
/// `Current` addresses whichever VFO the rig is using; drivers that expose
/// main/sub receivers normalize them to `A`/`B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Vfo {
    #[default]
    Current,
    A,
    B,
}

impl fmt::Display for Vfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vfo::Current => write!(f, "current VFO"),
            Vfo::A => write!(f, "VFO-A"),
            Vfo::B => write!(f, "VFO-B"),
        }
    }
}

/// Connection state of a rig facade.
///
/// ```text
/// Disconnected -> Connecting -> Connected <-> Erroring
///       ^             |             |            |
///       +-------------+-------------+------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Soft-degraded: several poll cycles in a row failed, polling continues.
    Erroring,
}

impl ConnectionState {
    /// Whether the state machine has an edge from `self` to `next`.
    ///
    /// Staying in the same state is not a transition and returns `false`.
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Erroring)
                | (Connected, Disconnected)
                | (Erroring, Connected)
                | (Erroring, Disconnected)
        )
    }

    /// Whether commands may be queued in this state.
    pub fn accepts_commands(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Erroring)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Erroring => "erroring",
        };
        write!(f, "{s}")
    }
}

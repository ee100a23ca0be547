//! The OmniRig automation surface the driver depends on.
//!
//! OmniRig exposes each configured rig (`Rig1`, `Rig2`, and on Omni-Rig V2
//! also `Rig3`, `Rig4`) as an automation object with integer properties.
//! [`OmniRigBridge`] is that object reduced to property get/put, so the
//! driver can be exercised without Windows.

use std::ops::RangeInclusive;

use rigsync_core::error::Result;
use rigsync_core::profile::DriverKind;
use rigsync_core::types::Mode;

/// Which automation server a driver attaches to. Both publish the same
/// `RigParamX` property surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerVersion {
    /// OmniRig 1.x.
    V1,
    /// Omni-Rig V2.
    V2,
}

impl ServerVersion {
    /// COM ProgID of the server's `OmniRigX` class.
    pub fn prog_id(&self) -> &'static str {
        match self {
            ServerVersion::V1 => "OmniRig.OmniRigX",
            ServerVersion::V2 => "OmniRigV2.OmniRigX",
        }
    }

    pub fn driver_kind(&self) -> DriverKind {
        match self {
            ServerVersion::V1 => DriverKind::OmniRig,
            ServerVersion::V2 => DriverKind::OmniRigV2,
        }
    }

    pub fn slots(&self) -> RangeInclusive<u32> {
        match self {
            ServerVersion::V1 => 1..=2,
            ServerVersion::V2 => 1..=4,
        }
    }
}

/// `RigParamX` flags from the OmniRig type library.
pub mod params {
    pub const PM_UNKNOWN: i32 = 0x0000_0001;
    pub const PM_FREQ: i32 = 0x0000_0002;
    pub const PM_FREQA: i32 = 0x0000_0004;
    pub const PM_FREQB: i32 = 0x0000_0008;
    pub const PM_PITCH: i32 = 0x0000_0010;
    pub const PM_RITOFFSET: i32 = 0x0000_0020;
    pub const PM_RIT0: i32 = 0x0000_0040;
    pub const PM_VFOAA: i32 = 0x0000_0080;
    pub const PM_VFOAB: i32 = 0x0000_0100;
    pub const PM_VFOBA: i32 = 0x0000_0200;
    pub const PM_VFOBB: i32 = 0x0000_0400;
    pub const PM_VFOA: i32 = 0x0000_0800;
    pub const PM_VFOB: i32 = 0x0000_1000;
    pub const PM_VFOEQUAL: i32 = 0x0000_2000;
    pub const PM_VFOSWAP: i32 = 0x0000_4000;
    pub const PM_SPLITON: i32 = 0x0000_8000;
    pub const PM_SPLITOFF: i32 = 0x0001_0000;
    pub const PM_RITON: i32 = 0x0002_0000;
    pub const PM_RITOFF: i32 = 0x0004_0000;
    pub const PM_XITON: i32 = 0x0008_0000;
    pub const PM_XITOFF: i32 = 0x0010_0000;
    pub const PM_RX: i32 = 0x0020_0000;
    pub const PM_TX: i32 = 0x0040_0000;
    pub const PM_CW_U: i32 = 0x0080_0000;
    pub const PM_CW_L: i32 = 0x0100_0000;
    pub const PM_SSB_U: i32 = 0x0200_0000;
    pub const PM_SSB_L: i32 = 0x0400_0000;
    pub const PM_DIG_U: i32 = 0x0800_0000;
    pub const PM_DIG_L: i32 = 0x1000_0000;
    pub const PM_AM: i32 = 0x2000_0000;
    pub const PM_FM: i32 = 0x4000_0000;

    pub const FREQ_MASK: i32 = PM_FREQ | PM_FREQA | PM_FREQB;
    /// Receiving on A.
    pub const VFO_A_MASK: i32 = PM_VFOA | PM_VFOAA | PM_VFOAB;
    /// Receiving on B.
    pub const VFO_B_MASK: i32 = PM_VFOB | PM_VFOBA | PM_VFOBB;
    pub const MODE_MASK: i32 =
        PM_CW_U | PM_CW_L | PM_SSB_U | PM_SSB_L | PM_DIG_U | PM_DIG_L | PM_AM | PM_FM;
}

use params::*;

/// Automation property names.
pub mod property {
    pub const STATUS: &str = "Status";
    pub const STATUS_STR: &str = "StatusStr";
    pub const RIG_TYPE: &str = "RigType";
    pub const READABLE_PARAMS: &str = "ReadableParams";
    pub const WRITEABLE_PARAMS: &str = "WriteableParams";
    pub const FREQ: &str = "Freq";
    pub const FREQ_A: &str = "FreqA";
    pub const FREQ_B: &str = "FreqB";
    pub const MODE: &str = "Mode";
    pub const VFO: &str = "Vfo";
    pub const TX: &str = "Tx";
    pub const SPLIT: &str = "Split";
    pub const RIT: &str = "Rit";
    pub const XIT: &str = "Xit";
    pub const RIT_OFFSET: &str = "RitOffset";
}

/// One rig slot of a running OmniRig.
///
/// Calls block. Implementations are created and used on a single thread.
pub trait OmniRigBridge {
    fn get(&mut self, property: &str) -> Result<i32>;
    fn put(&mut self, property: &str, value: i32) -> Result<()>;
    fn text(&mut self, property: &str) -> Result<String>;
}

/// `RigStatusX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigStatus {
    NotConfigured,
    Disabled,
    PortBusy,
    NotResponding,
    Online,
    Unknown(i32),
}

impl RigStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => RigStatus::NotConfigured,
            1 => RigStatus::Disabled,
            2 => RigStatus::PortBusy,
            3 => RigStatus::NotResponding,
            4 => RigStatus::Online,
            other => RigStatus::Unknown(other),
        }
    }

    pub fn is_online(&self) -> bool {
        *self == RigStatus::Online
    }
}

// ---------------------------------------------------------------
// Modes
// ---------------------------------------------------------------

/// OmniRig's `CW_U` is the reversed sideband.
pub fn mode_from_params(value: i32) -> Mode {
    match value & MODE_MASK {
        PM_CW_U => Mode::CWR,
        PM_CW_L => Mode::CW,
        PM_SSB_U => Mode::USB,
        PM_SSB_L => Mode::LSB,
        PM_DIG_U => Mode::DataUSB,
        PM_DIG_L => Mode::DataLSB,
        PM_AM => Mode::AM,
        PM_FM => Mode::FM,
        _ => Mode::Unknown,
    }
}

/// One canonical mode per `RigParamX` mode flag, in flag order.
pub const SETTABLE_MODES: [Mode; 8] = [
    Mode::CWR,
    Mode::CW,
    Mode::USB,
    Mode::LSB,
    Mode::DataUSB,
    Mode::DataLSB,
    Mode::AM,
    Mode::FM,
];

/// The modes whose flag is set in a `WriteableParams` mask.
pub fn writable_modes(writeable: i32) -> Vec<Mode> {
    SETTABLE_MODES
        .into_iter()
        .filter(|mode| mode_to_params(*mode).is_some_and(|flag| writeable & flag != 0))
        .collect()
}

/// RTTY goes out as the matching digital sideband; OmniRig has no FSK
/// mode of its own.
pub fn mode_to_params(mode: Mode) -> Option<i32> {
    match mode {
        Mode::CWR => Some(PM_CW_U),
        Mode::CW => Some(PM_CW_L),
        Mode::USB => Some(PM_SSB_U),
        Mode::LSB => Some(PM_SSB_L),
        Mode::DataUSB | Mode::RTTYR => Some(PM_DIG_U),
        Mode::DataLSB | Mode::RTTY => Some(PM_DIG_L),
        Mode::AM => Some(PM_AM),
        Mode::FM => Some(PM_FM),
        Mode::DataFM | Mode::DataAM | Mode::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(RigStatus::from_code(0), RigStatus::NotConfigured);
        assert_eq!(RigStatus::from_code(2), RigStatus::PortBusy);
        assert!(RigStatus::from_code(4).is_online());
        assert_eq!(RigStatus::from_code(9), RigStatus::Unknown(9));
    }

    #[test]
    fn versions_match_profile_slots() {
        for version in [ServerVersion::V1, ServerVersion::V2] {
            assert_eq!(Some(version.slots()), version.driver_kind().rig_slots());
        }
        assert_ne!(ServerVersion::V1.prog_id(), ServerVersion::V2.prog_id());
    }

    #[test]
    fn writable_modes_follow_mask() {
        assert_eq!(
            writable_modes(PM_FREQA | PM_SSB_U | PM_SSB_L | PM_CW_L),
            vec![Mode::CW, Mode::USB, Mode::LSB]
        );
        assert!(writable_modes(PM_FREQ | PM_TX).is_empty());
        assert_eq!(writable_modes(MODE_MASK).len(), SETTABLE_MODES.len());
    }

    #[test]
    fn modes() {
        assert_eq!(mode_from_params(PM_CW_U), Mode::CWR);
        assert_eq!(mode_from_params(PM_DIG_U), Mode::DataUSB);
        assert_eq!(mode_from_params(PM_UNKNOWN), Mode::Unknown);
        assert_eq!(mode_to_params(Mode::RTTY), Some(PM_DIG_L));
        assert_eq!(mode_to_params(Mode::DataFM), None);
        for mode in [Mode::USB, Mode::LSB, Mode::CW, Mode::CWR, Mode::AM, Mode::FM] {
            assert_eq!(mode_from_params(mode_to_params(mode).unwrap()), mode);
        }
    }
}

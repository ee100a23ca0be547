//! The normalized rig state snapshot and its change bitset.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::band::Band;
use crate::types::{ConnectionState, Mode, Vfo};

/// A snapshot of everything known about the rig.
///
/// Snapshots are values: the facade replaces its snapshot whenever a poll
/// cycle detects a change and hands out clones. A frequency of `0` means
/// "not yet polled".
///
/// The band is not a field. [`RigState::band`] derives it from
/// `transmit_frequency_hz` on every call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RigState {
    /// Frequency the operator hears, including RIT.
    pub receive_frequency_hz: u64,
    /// Frequency the rig transmits on, including split and XIT.
    pub transmit_frequency_hz: u64,
    pub mode: Mode,
    pub active_vfo: Vfo,
    pub ptt: bool,
    pub split: bool,
    /// RIT offset in hertz, 0 when RIT is off.
    pub rit_offset_hz: i32,
    /// XIT offset in hertz, 0 when XIT is off.
    pub xit_offset_hz: i32,
    /// Output power, `None` when the rig cannot report it.
    pub power_watts: Option<f32>,
    pub connection_state: ConnectionState,
}

impl RigState {
    /// The band of the transmit frequency per the shared band plan.
    pub fn band(&self) -> Option<Band> {
        Band::from_freq(self.transmit_frequency_hz)
    }

    /// Which fields differ between `self` and `next`.
    pub fn diff(&self, next: &RigState) -> ChangedFields {
        let mut changed = ChangedFields::empty();
        if self.receive_frequency_hz != next.receive_frequency_hz {
            changed |= ChangedFields::RECEIVE_FREQUENCY;
        }
        if self.transmit_frequency_hz != next.transmit_frequency_hz {
            changed |= ChangedFields::TRANSMIT_FREQUENCY;
        }
        if self.band() != next.band() {
            changed |= ChangedFields::BAND;
        }
        if self.mode != next.mode {
            changed |= ChangedFields::MODE;
        }
        if self.active_vfo != next.active_vfo {
            changed |= ChangedFields::VFO;
        }
        if self.ptt != next.ptt {
            changed |= ChangedFields::PTT;
        }
        if self.split != next.split {
            changed |= ChangedFields::SPLIT;
        }
        if self.rit_offset_hz != next.rit_offset_hz {
            changed |= ChangedFields::RIT;
        }
        if self.xit_offset_hz != next.xit_offset_hz {
            changed |= ChangedFields::XIT;
        }
        if self.power_watts != next.power_watts {
            changed |= ChangedFields::POWER;
        }
        if self.connection_state != next.connection_state {
            changed |= ChangedFields::CONNECTION;
        }
        changed
    }
}

/// Set of [`RigState`] fields that changed between two snapshots.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChangedFields(u16);

impl ChangedFields {
    pub const RECEIVE_FREQUENCY: ChangedFields = ChangedFields(1 << 0);
    pub const TRANSMIT_FREQUENCY: ChangedFields = ChangedFields(1 << 1);
    pub const BAND: ChangedFields = ChangedFields(1 << 2);
    pub const MODE: ChangedFields = ChangedFields(1 << 3);
    pub const VFO: ChangedFields = ChangedFields(1 << 4);
    pub const PTT: ChangedFields = ChangedFields(1 << 5);
    pub const SPLIT: ChangedFields = ChangedFields(1 << 6);
    pub const RIT: ChangedFields = ChangedFields(1 << 7);
    pub const XIT: ChangedFields = ChangedFields(1 << 8);
    pub const POWER: ChangedFields = ChangedFields(1 << 9);
    pub const CONNECTION: ChangedFields = ChangedFields(1 << 10);

    /// Both frequencies and the band: what a bandmap listens to.
    pub const FREQUENCY: ChangedFields = ChangedFields(
        Self::RECEIVE_FREQUENCY.0 | Self::TRANSMIT_FREQUENCY.0 | Self::BAND.0,
    );

    const NAMES: [(ChangedFields, &'static str); 11] = [
        (Self::RECEIVE_FREQUENCY, "receive_frequency"),
        (Self::TRANSMIT_FREQUENCY, "transmit_frequency"),
        (Self::BAND, "band"),
        (Self::MODE, "mode"),
        (Self::VFO, "vfo"),
        (Self::PTT, "ptt"),
        (Self::SPLIT, "split"),
        (Self::RIT, "rit"),
        (Self::XIT, "xit"),
        (Self::POWER, "power"),
        (Self::CONNECTION, "connection"),
    ];

    pub const fn empty() -> Self {
        ChangedFields(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// `true` if every field in `other` is set in `self`.
    pub fn contains(&self, other: ChangedFields) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` if any field in `other` is set in `self`.
    pub fn intersects(&self, other: ChangedFields) -> bool {
        self.0 & other.0 != 0
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    /// Names of the set fields, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
    }
}

impl BitOr for ChangedFields {
    type Output = ChangedFields;

    fn bitor(self, rhs: Self) -> Self::Output {
        ChangedFields(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangedFields {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ChangedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl fmt::Display for ChangedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        write!(f, "{}", names.join(","))
    }
}

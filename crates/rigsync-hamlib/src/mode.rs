//! Hamlib `rmode_t` bits and their canonical modes.

use rigsync_core::types::{Mode, Vfo};

use crate::ffi::{RIG_VFO_A, RIG_VFO_B, RIG_VFO_CURR, RIG_VFO_MAIN, RIG_VFO_SUB, rmode_t, vfo_t};

pub const RIG_MODE_AM: rmode_t = 1 << 0;
pub const RIG_MODE_CW: rmode_t = 1 << 1;
pub const RIG_MODE_USB: rmode_t = 1 << 2;
pub const RIG_MODE_LSB: rmode_t = 1 << 3;
pub const RIG_MODE_RTTY: rmode_t = 1 << 4;
pub const RIG_MODE_FM: rmode_t = 1 << 5;
pub const RIG_MODE_WFM: rmode_t = 1 << 6;
pub const RIG_MODE_CWR: rmode_t = 1 << 7;
pub const RIG_MODE_RTTYR: rmode_t = 1 << 8;
pub const RIG_MODE_AMS: rmode_t = 1 << 9;
pub const RIG_MODE_PKTLSB: rmode_t = 1 << 10;
pub const RIG_MODE_PKTUSB: rmode_t = 1 << 11;
pub const RIG_MODE_PKTFM: rmode_t = 1 << 12;
pub const RIG_MODE_PKTAM: rmode_t = 1 << 22;

/// Translate a mode reported by the library.
pub fn mode_from_hamlib(mode: rmode_t) -> Mode {
    match mode {
        RIG_MODE_USB => Mode::USB,
        RIG_MODE_LSB => Mode::LSB,
        RIG_MODE_CW => Mode::CW,
        RIG_MODE_CWR => Mode::CWR,
        RIG_MODE_AM | RIG_MODE_AMS => Mode::AM,
        RIG_MODE_FM | RIG_MODE_WFM => Mode::FM,
        RIG_MODE_RTTY => Mode::RTTY,
        RIG_MODE_RTTYR => Mode::RTTYR,
        RIG_MODE_PKTUSB => Mode::DataUSB,
        RIG_MODE_PKTLSB => Mode::DataLSB,
        RIG_MODE_PKTFM => Mode::DataFM,
        RIG_MODE_PKTAM => Mode::DataAM,
        _ => Mode::Unknown,
    }
}

/// The bit to request for `mode`. `None` for [`Mode::Unknown`].
pub fn mode_to_hamlib(mode: Mode) -> Option<rmode_t> {
    let bits = match mode {
        Mode::USB => RIG_MODE_USB,
        Mode::LSB => RIG_MODE_LSB,
        Mode::CW => RIG_MODE_CW,
        Mode::CWR => RIG_MODE_CWR,
        Mode::AM => RIG_MODE_AM,
        Mode::FM => RIG_MODE_FM,
        Mode::RTTY => RIG_MODE_RTTY,
        Mode::RTTYR => RIG_MODE_RTTYR,
        Mode::DataUSB => RIG_MODE_PKTUSB,
        Mode::DataLSB => RIG_MODE_PKTLSB,
        Mode::DataFM => RIG_MODE_PKTFM,
        Mode::DataAM => RIG_MODE_PKTAM,
        Mode::Unknown => return None,
    };
    Some(bits)
}

pub fn vfo_to_hamlib(vfo: Vfo) -> vfo_t {
    match vfo {
        Vfo::Current => RIG_VFO_CURR,
        Vfo::A => RIG_VFO_A,
        Vfo::B => RIG_VFO_B,
    }
}

/// Main/Sub rigs report their receivers instead of A/B.
pub fn vfo_from_hamlib(vfo: vfo_t) -> Vfo {
    match vfo {
        RIG_VFO_A | RIG_VFO_MAIN => Vfo::A,
        RIG_VFO_B | RIG_VFO_SUB => Vfo::B,
        _ => Vfo::Current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_maps_back() {
        for mode in Mode::ALL {
            let bits = mode_to_hamlib(mode).unwrap();
            assert_eq!(mode_from_hamlib(bits), mode);
        }
        assert_eq!(mode_to_hamlib(Mode::Unknown), None);
    }

    #[test]
    fn aliases_fold_into_canonical_modes() {
        assert_eq!(mode_from_hamlib(RIG_MODE_AMS), Mode::AM);
        assert_eq!(mode_from_hamlib(RIG_MODE_WFM), Mode::FM);
        assert_eq!(mode_from_hamlib(1 << 15), Mode::Unknown);
        assert_eq!(mode_from_hamlib(0), Mode::Unknown);
    }

    #[test]
    fn main_sub_vfos() {
        assert_eq!(vfo_from_hamlib(RIG_VFO_MAIN), Vfo::A);
        assert_eq!(vfo_from_hamlib(RIG_VFO_SUB), Vfo::B);
        assert_eq!(vfo_from_hamlib(RIG_VFO_CURR), Vfo::Current);
        assert_eq!(vfo_to_hamlib(Vfo::B), RIG_VFO_B);
    }
}

//! flrig mode names.
//!
//! flrig passes the rig's own mode names through unchanged, so the same
//! canonical mode is called `USB-D` on a Yaesu, `DATA-U` on an Elecraft,
//! `PKT-U` on some Icoms and `DIGU` on a FlexRadio. The driver asks flrig
//! for the rig's mode list at open and picks the matching spelling.

use rigsync_core::types::Mode;

/// Accepted spellings for each mode, most common first.
fn spellings(mode: Mode) -> &'static [&'static str] {
    match mode {
        Mode::USB => &["USB"],
        Mode::LSB => &["LSB"],
        Mode::CW => &["CW", "CW-U", "CWU", "CW-USB"],
        Mode::CWR => &["CW-R", "CWR", "CW-L", "CWL", "CW-LSB"],
        Mode::AM => &["AM", "AM-N", "AMN", "AM-W"],
        Mode::FM => &["FM", "FM-N", "FMN", "NFM", "WFM"],
        Mode::RTTY => &["RTTY", "FSK", "RTTY-L", "RTTY-LSB"],
        Mode::RTTYR => &["RTTY-R", "RTTYR", "FSK-R", "RTTY-U", "RTTY-USB"],
        Mode::DataUSB => &[
            "USB-D", "DATA-U", "PKT-U", "DIGU", "USB-D1", "D-USB", "DATA-USB", "PKTUSB", "DATA",
        ],
        Mode::DataLSB => &[
            "LSB-D", "DATA-L", "PKT-L", "DIGL", "LSB-D1", "D-LSB", "DATA-LSB", "PKTLSB",
        ],
        Mode::DataFM => &["FM-D", "DATA-FM", "PKT-FM", "PKTFM", "D-FM", "FM-D1"],
        Mode::DataAM => &["AM-D", "DATA-AM", "PKT-AM", "PKTAM", "D-AM", "AM-D1"],
        Mode::Unknown => &[],
    }
}

/// Translate a mode name reported by flrig.
pub fn mode_from_flrig(name: &str) -> Mode {
    let name = name.trim().to_ascii_uppercase();
    Mode::ALL
        .into_iter()
        .find(|mode| spellings(*mode).contains(&name.as_str()))
        .unwrap_or(Mode::Unknown)
}

/// The name to send for `mode`, preferring one from the rig's `available`
/// list. Without a list the most common spelling is used. `None` when the
/// rig has no spelling for the mode at all.
pub fn mode_to_flrig(mode: Mode, available: &[String]) -> Option<String> {
    let candidates = spellings(mode);
    if available.is_empty() {
        return candidates.first().map(|s| s.to_string());
    }
    available
        .iter()
        .find(|name| candidates.contains(&name.trim().to_ascii_uppercase().as_str()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn vendor_spellings() {
        assert_eq!(mode_from_flrig("USB-D"), Mode::DataUSB);
        assert_eq!(mode_from_flrig("DATA-U"), Mode::DataUSB);
        assert_eq!(mode_from_flrig("digl"), Mode::DataLSB);
        assert_eq!(mode_from_flrig("CW-R"), Mode::CWR);
        assert_eq!(mode_from_flrig("RTTY-R"), Mode::RTTYR);
        assert_eq!(mode_from_flrig("C4FM"), Mode::Unknown);
    }

    #[test]
    fn every_mode_has_a_default_spelling() {
        for mode in Mode::ALL {
            let name = mode_to_flrig(mode, &[]).unwrap();
            assert_eq!(mode_from_flrig(&name), mode);
        }
        assert_eq!(mode_to_flrig(Mode::Unknown, &[]), None);
    }

    #[test]
    fn picks_the_rigs_spelling() {
        let yaesu = list(&["LSB", "USB", "CW-U", "FM", "AM", "RTTY-L", "CW-L", "DATA-L", "RTTY-U", "DATA-FM", "FM-N", "DATA-U"]);
        assert_eq!(mode_to_flrig(Mode::DataUSB, &yaesu).as_deref(), Some("DATA-U"));
        assert_eq!(mode_to_flrig(Mode::CW, &yaesu).as_deref(), Some("CW-U"));
        assert_eq!(mode_to_flrig(Mode::DataAM, &yaesu), None);

        let flex = list(&["LSB", "USB", "AM", "CW", "DIGL", "DIGU", "SAM", "FM", "NFM", "DFM", "RTTY"]);
        assert_eq!(mode_to_flrig(Mode::DataUSB, &flex).as_deref(), Some("DIGU"));
    }
}

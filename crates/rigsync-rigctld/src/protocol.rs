//! rigctld command builders and reply parsers.
//!
//! rigctld speaks Hamlib's `rigctl` command language over TCP, one command
//! per line. Queries answer with one value per line; set commands answer
//! with a status line:
//!
//! ```text
//! f currVFO\n          ->  14074000\n
//! m currVFO\n          ->  USB\n2400\n
//! F VFOA 14200000\n    ->  RPRT 0\n
//! t currVFO\n          ->  RPRT -11\n      (not available)
//! ```
//!
//! With `\set_vfo_opt 1` every VFO-bound command carries the VFO as its
//! first argument, so the daemon never has to switch VFOs behind the
//! operator's back. All functions here are pure.

use rigsync_core::error::{Error, Result};
use rigsync_core::types::{Mode, Vfo};
use rigsync_hamlib::HamlibStatus;

/// Status line prefix.
pub const STATUS_PREFIX: &str = "RPRT ";

// ---------------------------------------------------------------
// Command builders
// ---------------------------------------------------------------

/// rigctld name of a VFO argument.
fn vfo_token(vfo: Vfo) -> &'static str {
    match vfo {
        Vfo::Current => "currVFO",
        Vfo::A => "VFOA",
        Vfo::B => "VFOB",
    }
}

/// Join a command, its optional VFO argument, and its parameters.
fn command(name: &str, vfo: Option<Vfo>, args: &[&str]) -> Vec<u8> {
    let mut line = String::from(name);
    if let Some(vfo) = vfo {
        line.push(' ');
        line.push_str(vfo_token(vfo));
    }
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line.push('\n');
    line.into_bytes()
}

/// Turn VFO mode on for this connection.
pub fn cmd_set_vfo_opt() -> Vec<u8> {
    b"\\set_vfo_opt 1\n".to_vec()
}

pub fn cmd_get_freq(vfo: Option<Vfo>) -> Vec<u8> {
    command("f", vfo, &[])
}

pub fn cmd_set_freq(vfo: Option<Vfo>, freq_hz: u64) -> Vec<u8> {
    command("F", vfo, &[&freq_hz.to_string()])
}

pub fn cmd_get_mode(vfo: Option<Vfo>) -> Vec<u8> {
    command("m", vfo, &[])
}

/// Set the mode with passband `0` (the backend's default for the mode).
pub fn cmd_set_mode(vfo: Option<Vfo>, mode: &str) -> Vec<u8> {
    command("M", vfo, &[mode, "0"])
}

pub fn cmd_get_vfo() -> Vec<u8> {
    command("v", None, &[])
}

pub fn cmd_get_ptt(vfo: Option<Vfo>) -> Vec<u8> {
    command("t", vfo, &[])
}

pub fn cmd_set_ptt(vfo: Option<Vfo>, on: bool) -> Vec<u8> {
    command("T", vfo, &[if on { "1" } else { "0" }])
}

/// Answers two lines: split on/off and the transmit VFO.
pub fn cmd_get_split(vfo: Option<Vfo>) -> Vec<u8> {
    command("s", vfo, &[])
}

pub fn cmd_get_rit(vfo: Option<Vfo>) -> Vec<u8> {
    command("j", vfo, &[])
}

pub fn cmd_get_xit(vfo: Option<Vfo>) -> Vec<u8> {
    command("z", vfo, &[])
}

/// RF power as a fraction of full scale.
pub fn cmd_get_rfpower(vfo: Option<Vfo>) -> Vec<u8> {
    command("l", vfo, &["RFPOWER"])
}

/// Ask the daemon to convert a power fraction to milliwatts for the
/// current band and mode.
pub fn cmd_power2mw(level: f32, freq_hz: u64, mode: &str) -> Vec<u8> {
    command(
        "\\power2mW",
        None,
        &[&level.to_string(), &freq_hz.to_string(), mode],
    )
}

/// Send CW. Line breaks would end the command early, so they become spaces.
pub fn cmd_send_morse(vfo: Option<Vfo>, text: &str) -> Vec<u8> {
    let text: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    command("b", vfo, &[text.trim_end()])
}

pub fn cmd_stop_morse(vfo: Option<Vfo>) -> Vec<u8> {
    command("\\stop_morse", vfo, &[])
}

pub fn cmd_set_keyspd(vfo: Option<Vfo>, wpm: u16) -> Vec<u8> {
    command("L", vfo, &["KEYSPD", &wpm.to_string()])
}

/// Whether the radio behind the daemon is powered.
pub fn cmd_get_powerstat() -> Vec<u8> {
    b"\\get_powerstat\n".to_vec()
}

// ---------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------

/// Parse a status line. `None` if `line` is not one.
pub fn parse_status(line: &str) -> Option<std::result::Result<(), HamlibStatus>> {
    let code = line.strip_prefix(STATUS_PREFIX)?.trim().parse::<i32>().ok()?;
    Some(HamlibStatus::check(code))
}

pub fn parse_u64(line: &str) -> Result<u64> {
    let text = line.trim();
    // Some backends report frequencies as "14074000.000000".
    match text.parse::<u64>() {
        Ok(v) => Ok(v),
        Err(_) => text
            .parse::<f64>()
            .map_err(|_| Error::Protocol(format!("expected a number, got {text:?}")))
            .and_then(rigsync_core::helpers::hz_from_f64),
    }
}

pub fn parse_i32(line: &str) -> Result<i32> {
    let text = line.trim();
    text.parse::<i32>()
        .map_err(|_| Error::Protocol(format!("expected an integer, got {text:?}")))
}

pub fn parse_f32(line: &str) -> Result<f32> {
    let text = line.trim();
    text.parse::<f32>()
        .map_err(|_| Error::Protocol(format!("expected a number, got {text:?}")))
}

pub fn parse_bool(line: &str) -> Result<bool> {
    Ok(parse_i32(line)? != 0)
}

pub fn parse_vfo(line: &str) -> Option<Vfo> {
    match line.trim() {
        "VFOA" | "Main" | "MainA" => Some(Vfo::A),
        "VFOB" | "Sub" | "MainB" => Some(Vfo::B),
        "currVFO" => Some(Vfo::Current),
        _ => None,
    }
}

// ---------------------------------------------------------------
// Mode names
// ---------------------------------------------------------------

/// Translate a rigctld mode name.
pub fn mode_from_name(name: &str) -> Mode {
    match name.trim() {
        "USB" => Mode::USB,
        "LSB" => Mode::LSB,
        "CW" => Mode::CW,
        "CWR" => Mode::CWR,
        "AM" | "AMS" => Mode::AM,
        "FM" | "WFM" => Mode::FM,
        "RTTY" => Mode::RTTY,
        "RTTYR" => Mode::RTTYR,
        "PKTUSB" => Mode::DataUSB,
        "PKTLSB" => Mode::DataLSB,
        "PKTFM" => Mode::DataFM,
        "PKTAM" => Mode::DataAM,
        _ => Mode::Unknown,
    }
}

/// The rigctld name for `mode`. `None` for [`Mode::Unknown`].
pub fn mode_name(mode: Mode) -> Option<&'static str> {
    let name = match mode {
        Mode::USB => "USB",
        Mode::LSB => "LSB",
        Mode::CW => "CW",
        Mode::CWR => "CWR",
        Mode::AM => "AM",
        Mode::FM => "FM",
        Mode::RTTY => "RTTY",
        Mode::RTTYR => "RTTYR",
        Mode::DataUSB => "PKTUSB",
        Mode::DataLSB => "PKTLSB",
        Mode::DataFM => "PKTFM",
        Mode::DataAM => "PKTAM",
        Mode::Unknown => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===============================================================
    // Builders
    // ===============================================================

    #[test]
    fn vfo_mode_commands() {
        assert_eq!(cmd_get_freq(Some(Vfo::Current)), b"f currVFO\n");
        assert_eq!(cmd_get_freq(Some(Vfo::A)), b"f VFOA\n");
        assert_eq!(cmd_set_freq(Some(Vfo::B), 7_074_000), b"F VFOB 7074000\n");
        assert_eq!(cmd_set_mode(Some(Vfo::Current), "PKTUSB"), b"M currVFO PKTUSB 0\n");
        assert_eq!(cmd_set_ptt(Some(Vfo::Current), true), b"T currVFO 1\n");
        assert_eq!(cmd_set_keyspd(Some(Vfo::Current), 25), b"L currVFO KEYSPD 25\n");
    }

    #[test]
    fn plain_commands() {
        assert_eq!(cmd_get_freq(None), b"f\n");
        assert_eq!(cmd_get_mode(None), b"m\n");
        assert_eq!(cmd_get_vfo(), b"v\n");
        assert_eq!(cmd_set_vfo_opt(), b"\\set_vfo_opt 1\n");
        assert_eq!(cmd_power2mw(0.5, 14_074_000, "USB"), b"\\power2mW 0.5 14074000 USB\n");
    }

    #[test]
    fn morse_text_stays_on_one_line() {
        assert_eq!(
            cmd_send_morse(Some(Vfo::Current), "CQ TEST\nDE K1ABC\n"),
            b"b currVFO CQ TEST DE K1ABC\n"
        );
    }

    // ===============================================================
    // Parsers
    // ===============================================================

    #[test]
    fn status_lines() {
        assert_eq!(parse_status("RPRT 0"), Some(Ok(())));
        assert_eq!(parse_status("RPRT -11"), Some(Err(HamlibStatus::NotAvailable)));
        assert_eq!(parse_status("14074000"), None);
        assert_eq!(parse_status("RPRT x"), None);
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_u64("14074000").unwrap(), 14_074_000);
        assert_eq!(parse_u64("14074000.000000").unwrap(), 14_074_000);
        assert!(parse_u64("VFOA").is_err());
        assert_eq!(parse_i32("-150").unwrap(), -150);
        assert!(parse_bool("1").unwrap());
        assert!((parse_f32("0.390000").unwrap() - 0.39).abs() < 1e-6);
    }

    #[test]
    fn vfo_names() {
        assert_eq!(parse_vfo("VFOB"), Some(Vfo::B));
        assert_eq!(parse_vfo("Main"), Some(Vfo::A));
        assert_eq!(parse_vfo("None"), None);
    }

    #[test]
    fn mode_names() {
        for mode in Mode::ALL {
            assert_eq!(mode_from_name(mode_name(mode).unwrap()), mode);
        }
        assert_eq!(mode_from_name("WFM"), Mode::FM);
        assert_eq!(mode_from_name("AMS"), Mode::AM);
        assert_eq!(mode_from_name("FAX"), Mode::Unknown);
        assert_eq!(mode_name(Mode::Unknown), None);
    }
}

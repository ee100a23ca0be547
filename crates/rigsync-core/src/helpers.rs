//! Frequency unit conversion and formatting helpers.
//!
//! Wire formats disagree on units: rigctld and Hamlib use hertz as a float,
//! flrig sends integer hertz as a string, loggers display MHz. Everything
//! inside rigsync is integer hertz.

use crate::error::{Error, Result};

/// Format a frequency in hertz as a human-readable MHz string.
///
/// ```
/// use rigsync_core::format_freq_mhz;
///
/// assert_eq!(format_freq_mhz(14_074_000), "14.074000 MHz");
/// ```
pub fn format_freq_mhz(freq_hz: u64) -> String {
    let mhz = freq_hz as f64 / 1_000_000.0;
    format!("{mhz:.6} MHz")
}

/// Round a floating-point hertz value to integer hertz.
///
/// Negative, NaN and infinite values are protocol errors.
pub fn hz_from_f64(hz: f64) -> Result<u64> {
    if !hz.is_finite() || hz < 0.0 {
        return Err(Error::Protocol(format!("invalid frequency: {hz}")));
    }
    Ok(hz.round() as u64)
}

/// Parse a frequency given as text in `unit_hz` units (1 for Hz, 1000 for
/// kHz, 1_000_000 for MHz). Accepts integer or decimal notation.
///
/// ```
/// use rigsync_core::helpers::parse_freq;
///
/// assert_eq!(parse_freq("14074000", 1).unwrap(), 14_074_000);
/// assert_eq!(parse_freq("14074.5", 1_000).unwrap(), 14_074_500);
/// assert_eq!(parse_freq("14.074", 1_000_000).unwrap(), 14_074_000);
/// ```
pub fn parse_freq(text: &str, unit_hz: u64) -> Result<u64> {
    let text = text.trim();
    if let Ok(whole) = text.parse::<u64>() {
        return whole
            .checked_mul(unit_hz)
            .ok_or_else(|| Error::Protocol(format!("frequency overflow: {text}")));
    }
    let value: f64 = text
        .parse()
        .map_err(|_| Error::Protocol(format!("not a frequency: {text:?}")))?;
    hz_from_f64(value * unit_hz as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_freq_mhz_hf() {
        assert_eq!(format_freq_mhz(14_074_000), "14.074000 MHz");
        assert_eq!(format_freq_mhz(1_840_000), "1.840000 MHz");
    }

    #[test]
    fn format_freq_mhz_zero() {
        assert_eq!(format_freq_mhz(0), "0.000000 MHz");
    }

    #[test]
    fn parse_freq_hz_variants() {
        assert_eq!(parse_freq("14074000", 1).unwrap(), 14_074_000);
        assert_eq!(parse_freq("14074000.000000", 1).unwrap(), 14_074_000);
        assert_eq!(parse_freq(" 7000000\n", 1).unwrap(), 7_000_000);
    }

    #[test]
    fn parse_freq_scaled() {
        assert_eq!(parse_freq("14074", 1_000).unwrap(), 14_074_000);
        assert_eq!(parse_freq("432.1", 1_000_000).unwrap(), 432_100_000);
    }

    #[test]
    fn parse_freq_rejects_garbage() {
        assert!(matches!(parse_freq("VFOA", 1), Err(Error::Protocol(_))));
        assert!(matches!(parse_freq("-5", 1), Err(Error::Protocol(_))));
        assert!(parse_freq("", 1).is_err());
    }

    #[test]
    fn hz_from_f64_rounds() {
        assert_eq!(hz_from_f64(14_074_000.4).unwrap(), 14_074_000);
        assert_eq!(hz_from_f64(14_074_000.6).unwrap(), 14_074_001);
        assert!(hz_from_f64(f64::NAN).is_err());
    }
}

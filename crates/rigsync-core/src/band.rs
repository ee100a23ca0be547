//! Amateur radio band plan.
//!
//! [`Band::from_freq`] is the single lookup the rest of the application
//! shares: [`RigState::band`](crate::state::RigState::band) is evaluated
//! through it, so a band can never disagree with the frequency it came from.
//!
//! # Example
//!
//! ```
//! use rigsync_core::Band;
//!
//! let band = Band::from_freq(14_074_000).unwrap();
//! assert_eq!(band, Band::Band20m);
//! assert_eq!(band.to_string(), "20m");
//! ```

use std::fmt;
use std::str::FromStr;

/// A frequency range with inclusive edges, in hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BandRange {
    /// Lower edge in hertz (inclusive).
    pub low_hz: u64,
    /// Upper edge in hertz (inclusive).
    pub high_hz: u64,
}

impl BandRange {
    pub const fn new(low_hz: u64, high_hz: u64) -> Self {
        BandRange { low_hz, high_hz }
    }

    /// Check whether a frequency (in hertz) falls within this range.
    pub fn contains(&self, freq_hz: u64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

impl fmt::Display for BandRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} Hz", self.low_hz, self.high_hz)
    }
}

/// Amateur radio band, 2190 meters through 3 centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Band2190m,
    Band630m,
    Band160m,
    Band80m,
    Band60m,
    Band40m,
    /// WARC band.
    Band30m,
    Band20m,
    /// WARC band.
    Band17m,
    Band15m,
    /// WARC band.
    Band12m,
    Band10m,
    Band6m,
    Band4m,
    Band2m,
    Band1_25m,
    Band70cm,
    Band33cm,
    Band23cm,
    Band13cm,
    Band6cm,
    Band3cm,
}

/// The band plan table in frequency order, lowest first.
const BAND_PLAN: &[(Band, BandRange)] = &[
    (Band::Band2190m, BandRange::new(134_000, 140_000)),
    (Band::Band630m, BandRange::new(470_000, 490_000)),
    (Band::Band160m, BandRange::new(1_800_000, 2_000_000)),
    (Band::Band80m, BandRange::new(3_500_000, 4_000_000)),
    (Band::Band60m, BandRange::new(5_330_500, 5_450_000)),
    (Band::Band40m, BandRange::new(7_000_000, 7_300_000)),
    (Band::Band30m, BandRange::new(10_100_000, 10_150_000)),
    (Band::Band20m, BandRange::new(14_000_000, 14_350_000)),
    (Band::Band17m, BandRange::new(18_068_000, 18_168_000)),
    (Band::Band15m, BandRange::new(21_000_000, 21_450_000)),
    (Band::Band12m, BandRange::new(24_890_000, 24_990_000)),
    (Band::Band10m, BandRange::new(28_000_000, 29_700_000)),
    (Band::Band6m, BandRange::new(50_000_000, 54_000_000)),
    (Band::Band4m, BandRange::new(70_000_000, 71_000_000)),
    (Band::Band2m, BandRange::new(144_000_000, 148_000_000)),
    (Band::Band1_25m, BandRange::new(222_000_000, 225_000_000)),
    (Band::Band70cm, BandRange::new(420_000_000, 450_000_000)),
    (Band::Band33cm, BandRange::new(902_000_000, 928_000_000)),
    (Band::Band23cm, BandRange::new(1_240_000_000, 1_300_000_000)),
    (Band::Band13cm, BandRange::new(2_300_000_000, 2_450_000_000)),
    (Band::Band6cm, BandRange::new(5_650_000_000, 5_850_000_000)),
    (Band::Band3cm, BandRange::new(10_000_000_000, 11_000_000_000)),
];

impl Band {
    /// Returns the band containing the given frequency, or `None` outside
    /// every amateur allocation (including 0, the "unknown" frequency).
    pub fn from_freq(freq_hz: u64) -> Option<Band> {
        BAND_PLAN
            .iter()
            .find(|(_, range)| range.contains(freq_hz))
            .map(|(band, _)| *band)
    }

    /// Returns the band edges.
    pub fn freq_range(&self) -> BandRange {
        BAND_PLAN
            .iter()
            .find(|(band, _)| band == self)
            .map(|(_, range)| *range)
            .unwrap_or(BandRange::new(0, 0))
    }

    /// Returns `true` for the WARC bands (30m, 17m, 12m).
    pub fn is_warc(&self) -> bool {
        matches!(self, Band::Band30m | Band::Band17m | Band::Band12m)
    }

    /// Returns the short band name (e.g. "20m", "70cm").
    pub fn name(&self) -> &'static str {
        match self {
            Band::Band2190m => "2190m",
            Band::Band630m => "630m",
            Band::Band160m => "160m",
            Band::Band80m => "80m",
            Band::Band60m => "60m",
            Band::Band40m => "40m",
            Band::Band30m => "30m",
            Band::Band20m => "20m",
            Band::Band17m => "17m",
            Band::Band15m => "15m",
            Band::Band12m => "12m",
            Band::Band10m => "10m",
            Band::Band6m => "6m",
            Band::Band4m => "4m",
            Band::Band2m => "2m",
            Band::Band1_25m => "1.25m",
            Band::Band70cm => "70cm",
            Band::Band33cm => "33cm",
            Band::Band23cm => "23cm",
            Band::Band13cm => "13cm",
            Band::Band6cm => "6cm",
            Band::Band3cm => "3cm",
        }
    }

    /// Iterates all bands in frequency order (lowest first).
    pub fn all() -> impl Iterator<Item = Band> {
        BAND_PLAN.iter().map(|(band, _)| *band)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a string cannot be parsed into a [`Band`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBandError(String);

impl fmt::Display for ParseBandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown band: '{}'", self.0)
    }
}

impl std::error::Error for ParseBandError {}

impl FromStr for Band {
    type Err = ParseBandError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Band::all()
            .find(|band| band.name() == lower)
            .ok_or_else(|| ParseBandError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_freq_lf_mf() {
        assert_eq!(Band::from_freq(136_000), Some(Band::Band2190m));
        assert_eq!(Band::from_freq(473_000), Some(Band::Band630m));
    }

    #[test]
    fn from_freq_hf_bands() {
        assert_eq!(Band::from_freq(1_900_000), Some(Band::Band160m));
        assert_eq!(Band::from_freq(3_600_000), Some(Band::Band80m));
        assert_eq!(Band::from_freq(5_357_000), Some(Band::Band60m));
        assert_eq!(Band::from_freq(7_100_000), Some(Band::Band40m));
        assert_eq!(Band::from_freq(10_110_000), Some(Band::Band30m));
        assert_eq!(Band::from_freq(14_200_000), Some(Band::Band20m));
        assert_eq!(Band::from_freq(18_100_000), Some(Band::Band17m));
        assert_eq!(Band::from_freq(21_100_000), Some(Band::Band15m));
        assert_eq!(Band::from_freq(24_900_000), Some(Band::Band12m));
        assert_eq!(Band::from_freq(28_100_000), Some(Band::Band10m));
    }

    #[test]
    fn from_freq_vhf_and_up() {
        assert_eq!(Band::from_freq(50_100_000), Some(Band::Band6m));
        assert_eq!(Band::from_freq(70_100_000), Some(Band::Band4m));
        assert_eq!(Band::from_freq(144_100_000), Some(Band::Band2m));
        assert_eq!(Band::from_freq(222_100_000), Some(Band::Band1_25m));
        assert_eq!(Band::from_freq(430_100_000), Some(Band::Band70cm));
        assert_eq!(Band::from_freq(902_100_000), Some(Band::Band33cm));
        assert_eq!(Band::from_freq(1_240_100_000), Some(Band::Band23cm));
        assert_eq!(Band::from_freq(10_368_000_000), Some(Band::Band3cm));
    }

    #[test]
    fn from_freq_band_edges() {
        assert_eq!(Band::from_freq(1_800_000), Some(Band::Band160m));
        assert_eq!(Band::from_freq(2_000_000), Some(Band::Band160m));
        assert_eq!(Band::from_freq(14_350_000), Some(Band::Band20m));
        assert_eq!(Band::from_freq(1_799_999), None);
        assert_eq!(Band::from_freq(14_350_001), None);
    }

    #[test]
    fn from_freq_out_of_band() {
        assert_eq!(Band::from_freq(0), None);
        assert_eq!(Band::from_freq(13_500_000), None);
        assert_eq!(Band::from_freq(100_000_000), None);
    }

    #[test]
    fn display_round_trip() {
        for band in Band::all() {
            let parsed: Band = band.to_string().parse().expect("should round-trip");
            assert_eq!(band, parsed);
        }
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("160M".parse::<Band>().unwrap(), Band::Band160m);
        assert_eq!("1.25m".parse::<Band>().unwrap(), Band::Band1_25m);
        assert!("99m".parse::<Band>().is_err());
    }

    #[test]
    fn plan_in_frequency_order() {
        let bands: Vec<Band> = Band::all().collect();
        assert_eq!(bands.len(), 22);
        for pair in bands.windows(2) {
            assert!(
                pair[1].freq_range().low_hz > pair[0].freq_range().high_hz,
                "{} should be above {}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn midpoints_map_back() {
        for band in Band::all() {
            let range = band.freq_range();
            let mid = (range.low_hz + range.high_hz) / 2;
            assert_eq!(Band::from_freq(mid), Some(band), "midpoint of {band}");
        }
    }

    #[test]
    fn warc_bands() {
        assert!(Band::Band30m.is_warc());
        assert!(Band::Band17m.is_warc());
        assert!(Band::Band12m.is_warc());
        assert!(!Band::Band20m.is_warc());
    }
}

//! Clock frequencies with unit parsing and conversion to simulation periods.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds in one second.
const FS_PER_S: f64 = 1e15;

/// A clock frequency stored in Hertz.
///
/// Parses strings like `"50MHz"`, `"32.768KHz"`, `"1GHz"` and bare numbers
/// (Hz).
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }

    /// Returns the clock period rounded to whole femtoseconds, or `None` if
    /// the frequency is not positive or the period rounds to zero.
    pub fn period_fs(&self) -> Option<u64> {
        if self.0.is_nan() || self.0 <= 0.0 {
            return None;
        }
        let fs = (FS_PER_S / self.0).round();
        (fs >= 1.0 && fs <= u64::MAX as f64).then_some(fs as u64)
    }

    /// Builds the frequency whose period is `period_fs` femtoseconds.
    pub fn from_period_fs(period_fs: u64) -> Self {
        Self(FS_PER_S / period_fs as f64)
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1e9 {
            write!(f, "{}GHz", hz / 1e9)
        } else if hz >= 1e6 {
            write!(f, "{}MHz", hz / 1e6)
        } else if hz >= 1e3 {
            write!(f, "{}KHz", hz / 1e3)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error returned for an unparseable frequency string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();
        let (num, scale) = [("ghz", 1e9), ("mhz", 1e6), ("khz", 1e3), ("hz", 1.0)]
            .iter()
            .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((lower.as_str(), 1.0));
        let val: f64 = num.trim().parse().map_err(|_| err())?;
        if !val.is_finite() || val < 0.0 {
            return Err(err());
        }
        Ok(Frequency(val * scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!("1GHz".parse::<Frequency>().unwrap().hz(), 1e9);
        assert_eq!("50MHz".parse::<Frequency>().unwrap().hz(), 50e6);
        assert_eq!("100khz".parse::<Frequency>().unwrap().hz(), 100e3);
        assert_eq!("48000Hz".parse::<Frequency>().unwrap().hz(), 48e3);
        assert_eq!("25000000".parse::<Frequency>().unwrap().mhz(), 25.0);
    }

    #[test]
    fn parse_invalid() {
        assert!("fast".parse::<Frequency>().is_err());
        assert!("-5MHz".parse::<Frequency>().is_err());
    }

    #[test]
    fn period_in_femtoseconds() {
        assert_eq!(Frequency::new(100e6).period_fs(), Some(10_000_000));
        assert_eq!(Frequency::new(1e9).period_fs(), Some(1_000_000));
        // 3 MHz does not divide evenly; the period rounds.
        assert_eq!(Frequency::new(3e6).period_fs(), Some(333_333_333));
        assert_eq!(Frequency::new(0.0).period_fs(), None);
    }

    #[test]
    fn period_roundtrip() {
        let f = Frequency::from_period_fs(20_000_000);
        assert_eq!(f.mhz(), 50.0);
    }

    #[test]
    fn display_selects_best_unit() {
        assert_eq!(Frequency::new(1e9).to_string(), "1GHz");
        assert_eq!(Frequency::new(50e6).to_string(), "50MHz");
        assert_eq!(Frequency::new(44_100.0).to_string(), "44.1KHz");
        assert_eq!(Frequency::new(500.0).to_string(), "500Hz");
    }
}

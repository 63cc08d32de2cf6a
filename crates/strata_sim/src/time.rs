//! Simulated time with femtosecond resolution.
//!
//! [`SimTime`] pairs a femtosecond timestamp with the number of delta cycles
//! executed at that timestamp. [`parse_duration`] reads human-written
//! durations such as `"10ns"` for configuration files and the command line.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// A point in simulated time.
///
/// Ordered by timestamp first and delta count second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Timestamp in femtoseconds.
    pub fs: u64,
    /// Delta cycles executed at this timestamp.
    pub delta: u32,
}

impl SimTime {
    /// Time zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A timestamp with no delta cycles.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// A timestamp in nanoseconds.
    pub fn from_ns(ns: u64) -> Self {
        Self::from_fs(ns * FS_PER_NS)
    }

    /// The same timestamp after `count` more delta cycles.
    pub fn plus_deltas(self, count: u32) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta.saturating_add(count),
        }
    }

    /// Moves to a later timestamp, clearing the delta count.
    pub fn advance_to(self, fs: u64) -> Self {
        debug_assert!(fs >= self.fs, "cannot advance backwards: {} -> {fs}", self.fs);
        Self::from_fs(fs)
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fs(self.fs))?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

const UNITS: [(&str, u64); 6] = [
    ("s", FS_PER_S),
    ("ms", FS_PER_MS),
    ("us", FS_PER_US),
    ("ns", FS_PER_NS),
    ("ps", FS_PER_PS),
    ("fs", 1),
];

/// Formats a femtosecond count in the largest unit that divides it exactly.
pub fn format_fs(fs: u64) -> String {
    if fs == 0 {
        return "0 fs".to_string();
    }
    for (unit, scale) in UNITS {
        if fs % scale == 0 {
            return format!("{} {unit}", fs / scale);
        }
    }
    format!("{fs} fs")
}

/// A duration string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration '{input}': expected a number followed by fs, ps, ns, us, ms or s")]
pub struct ParseDurationError {
    input: String,
}

/// Parses `"10ns"`, `"2.5 us"` or `"100fs"` into femtoseconds.
///
/// Fractional values must come out as a whole number of femtoseconds.
pub fn parse_duration(input: &str) -> Result<u64, ParseDurationError> {
    let err = || ParseDurationError {
        input: input.to_string(),
    };
    let s = input.trim();
    let split = s.find(|c: char| c.is_ascii_alphabetic()).ok_or_else(err)?;
    let (number, unit) = (s[..split].trim(), s[split..].trim());
    let scale = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, scale)| *scale)
        .ok_or_else(err)?;

    match number.split_once('.') {
        None => number.parse::<u64>().ok().and_then(|n| n.checked_mul(scale)).ok_or_else(err),
        Some((whole, frac)) => {
            if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| err())? };
            let mut frac_fs: u64 = 0;
            let mut place = scale;
            for digit in frac.bytes() {
                place /= 10;
                let d = (digit - b'0') as u64;
                if place == 0 {
                    if d != 0 {
                        return Err(err());
                    }
                    continue;
                }
                frac_fs += d * place;
            }
            whole
                .checked_mul(scale)
                .and_then(|w| w.checked_add(frac_fs))
                .ok_or_else(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_by_fs_then_delta() {
        let a = SimTime { fs: 100, delta: 5 };
        let b = SimTime { fs: 100, delta: 6 };
        let c = SimTime { fs: 200, delta: 0 };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn advance_clears_deltas() {
        let t = SimTime::from_ns(1).plus_deltas(3);
        assert_eq!(t.delta, 3);
        assert_eq!(t.advance_to(2 * FS_PER_NS), SimTime::from_ns(2));
    }

    #[test]
    fn display_picks_exact_unit() {
        assert_eq!(SimTime::zero().to_string(), "0 fs");
        assert_eq!(SimTime::from_ns(10).to_string(), "10 ns");
        assert_eq!(SimTime::from_fs(1500).to_string(), "1500 fs");
        assert_eq!(SimTime::from_fs(2 * FS_PER_MS).to_string(), "2 ms");
        assert_eq!(SimTime::from_ns(1).plus_deltas(3).to_string(), "1 ns+d3");
    }

    #[test]
    fn parse_whole_durations() {
        assert_eq!(parse_duration("10ns"), Ok(10 * FS_PER_NS));
        assert_eq!(parse_duration(" 1 us "), Ok(FS_PER_US));
        assert_eq!(parse_duration("7fs"), Ok(7));
        assert_eq!(parse_duration("1s"), Ok(FS_PER_S));
    }

    #[test]
    fn parse_fractional_durations() {
        assert_eq!(parse_duration("2.5ns"), Ok(2_500_000));
        assert_eq!(parse_duration(".5ps"), Ok(500));
        assert!(parse_duration("1.0001fs").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("ns").is_err());
        assert!(parse_duration("10 parsecs").is_err());
        assert!(parse_duration("-1ns").is_err());
        assert!(parse_duration("1.ns").is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime { fs: 12345, delta: 7 };
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(serde_json::from_str::<SimTime>(&json).unwrap(), t);
    }
}

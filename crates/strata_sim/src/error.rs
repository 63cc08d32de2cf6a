//! Simulation error types.
//!
//! All errors that can occur while driving a simulation are variants of
//! [`SimError`]. Divergence is terminal: once a simulator has diverged every
//! later operation reports the same divergence again.

use std::io;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Combinational logic did not reach a fixed point within the configured
    /// number of delta cycles.
    #[error("design did not settle at {time_fs} fs after {deltas} delta cycles; still changing: {}", unstable.join(", "))]
    Diverged {
        /// Simulated time of the failed settle.
        time_fs: u64,
        /// Delta cycles executed before giving up.
        deltas: u32,
        /// Paths of the signals that changed in the last delta cycle.
        unstable: Vec<String>,
    },

    /// A value was read while pokes or combinational updates were pending.
    #[error("cannot read '{signal}': design is not settled")]
    NotSettled {
        /// Path of the signal being read.
        signal: String,
    },

    /// A poke or clock generator targeted a signal that something else drives.
    #[error("cannot drive '{signal}': it is driven by {driver}")]
    DrivenSignal {
        /// Signal path.
        signal: String,
        /// Description of the existing driver.
        driver: String,
    },

    /// A signal identity does not belong to the simulated design.
    #[error("signal #{id} is not part of the simulated design")]
    UnknownSignal {
        /// Raw signal identity.
        id: u32,
    },

    /// A domain identity does not belong to the simulated design.
    #[error("clock domain #{id} is not part of the simulated design")]
    UnknownDomain {
        /// Raw domain identity.
        id: u32,
    },

    /// A poked value has a different width than its signal.
    #[error("cannot poke {actual}-bit value into '{signal}', which is {expected} bits wide")]
    WidthMismatch {
        /// Signal path.
        signal: String,
        /// Signal width.
        expected: u32,
        /// Width of the poked value.
        actual: u32,
    },

    /// A clock period too short to produce two distinct edges.
    #[error("clock period of domain '{domain}' must be at least 2 fs, got {period_fs}")]
    InvalidPeriod {
        /// Domain name.
        domain: String,
        /// Requested period.
        period_fs: u64,
    },

    /// A domain was given a second clock generator.
    #[error("domain '{domain}' already has a clock")]
    DuplicateClock {
        /// Domain name.
        domain: String,
    },

    /// An attempt to move simulated time backwards.
    #[error("cannot move time back from {now_fs} fs to {target_fs} fs")]
    TimeRewind {
        /// Current time.
        now_fs: u64,
        /// Requested time.
        target_fs: u64,
    },

    /// A testbench expectation did not hold.
    #[error("assertion failed in process '{process}' at {time_fs} fs: {message}")]
    AssertionFailed {
        /// Simulated time of the check.
        time_fs: u64,
        /// Name of the failing process.
        process: String,
        /// Description of the mismatch.
        message: String,
    },

    /// A testbench process awaited something other than a simulator event.
    #[error("process '{process}' is waiting on a future the simulator cannot resume")]
    ProcessStalled {
        /// Process name.
        process: String,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diverged_lists_unstable_signals() {
        let e = SimError::Diverged {
            time_fs: 0,
            deltas: 10_000,
            unstable: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            e.to_string(),
            "design did not settle at 0 fs after 10000 delta cycles; still changing: a, b"
        );
    }

    #[test]
    fn assertion_failed_display() {
        let e = SimError::AssertionFailed {
            time_fs: 500,
            process: "bench".into(),
            message: "count != 3".into(),
        };
        assert_eq!(
            e.to_string(),
            "assertion failed in process 'bench' at 500 fs: count != 3"
        );
    }

    #[test]
    fn driven_signal_display() {
        let e = SimError::DrivenSignal {
            signal: "q".into(),
            driver: "domain 'sync' of 'top'".into(),
        };
        assert_eq!(e.to_string(), "cannot drive 'q': it is driven by domain 'sync' of 'top'");
    }

    #[test]
    fn waveform_io_display() {
        let e = SimError::WaveformIo(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(e.to_string().contains("waveform I/O error"));
    }

    #[test]
    fn time_rewind_display() {
        let e = SimError::TimeRewind {
            now_fs: 20,
            target_fs: 10,
        };
        assert_eq!(e.to_string(), "cannot move time back from 20 fs to 10 fs");
    }
}

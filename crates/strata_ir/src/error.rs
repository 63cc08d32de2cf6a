//! Errors raised while constructing IR.

use thiserror::Error;

/// A malformed construct rejected at build time, before it can enter a
/// fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    /// A slice range that is reversed or exceeds the operand width.
    #[error("slice {start}..{end} is out of range for a value of width {width}")]
    SliceOutOfRange {
        /// Requested start bit.
        start: i64,
        /// Requested end bit (exclusive).
        end: i64,
        /// Width of the sliced value.
        width: u32,
    },

    /// A bit index outside the operand.
    #[error("bit index {index} is out of range for a value of width {width}")]
    BitOutOfRange {
        /// Requested index.
        index: i64,
        /// Width of the indexed value.
        width: u32,
    },

    /// A switch pattern that cannot be interpreted against its selector.
    #[error("invalid pattern '{pattern}' for a {width}-bit selector: {reason}")]
    BadPattern {
        /// Pattern as written.
        pattern: String,
        /// Selector width.
        width: u32,
        /// What is wrong with it.
        reason: String,
    },

    /// A variable shift whose amount is too wide to bound the result width.
    #[error("shift amount of width {width} is too wide (at most {max} bits)")]
    ShiftTooWide {
        /// Width of the shift amount.
        width: u32,
        /// Largest accepted width.
        max: u32,
    },

    /// A second clock domain with an already used name.
    #[error("clock domain '{name}' is already defined")]
    DuplicateDomain {
        /// Domain name.
        name: String,
    },

    /// A clock or reset signal that is not exactly one bit wide.
    #[error("{role} signal '{signal}' of domain '{domain}' must be 1 bit wide, found {width}")]
    ControlNotOneBit {
        /// Domain name.
        domain: String,
        /// `"clock"` or `"reset"`.
        role: &'static str,
        /// Signal name.
        signal: String,
        /// Actual width.
        width: u32,
    },

    /// An instance binding whose port is not a port of the instantiated
    /// fragment's interface.
    #[error("instance '{instance}': '{port}' is not a port of fragment '{fragment}'")]
    NotAPort {
        /// Instance name.
        instance: String,
        /// Name of the bound signal.
        port: String,
        /// Instantiated fragment.
        fragment: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let e = IrError::SliceOutOfRange {
            start: 2,
            end: 9,
            width: 8,
        };
        assert_eq!(
            e.to_string(),
            "slice 2..9 is out of range for a value of width 8"
        );
        let e = IrError::ControlNotOneBit {
            domain: "sync".into(),
            role: "clock",
            signal: "clk".into(),
            width: 2,
        };
        assert!(e.to_string().contains("'clk'"));
    }
}

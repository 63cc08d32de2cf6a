//! Source locations of the Rust code that built a piece of the design.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

/// The file, line and column of the builder call that created an IR item.
///
/// Captured with `#[track_caller]`, so errors about a statement or signal
/// point at the user's circuit description rather than at this crate.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SrcLoc {
    /// Source file path as reported by the compiler.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl SrcLoc {
    /// Captures the location of the caller.
    #[track_caller]
    pub fn caller() -> Self {
        let loc = Location::caller();
        Self {
            file: loc.file().to_string(),
            line: loc.line(),
            column: loc.column(),
        }
    }

    /// A placeholder location for items synthesized by the toolkit itself.
    pub fn internal() -> Self {
        Self {
            file: "<internal>".to_string(),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for SrcLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_points_here() {
        let loc = SrcLoc::caller();
        assert!(loc.file.ends_with("loc.rs"));
        assert!(loc.line > 0);
    }

    #[test]
    fn display_format() {
        let loc = SrcLoc {
            file: "top.rs".into(),
            line: 3,
            column: 9,
        };
        assert_eq!(loc.to_string(), "top.rs:3:9");
    }
}

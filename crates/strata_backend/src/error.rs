//! Backend error types.

use std::fmt;
use std::io;

/// Errors raised while rendering a netlist.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Formatting into the output buffer failed.
    #[error("failed to format netlist: {0}")]
    Format(#[from] fmt::Error),

    /// An `unindent` without a matching `indent`.
    #[error("code writer indentation underflow")]
    IndentUnderflow,
}

/// Errors raised while running the external synthesis tool. These are
/// distinct from elaboration and simulation errors.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// The tool executable could not be started.
    #[error("could not find '{program}' {}", not_found_hint(.from_env))]
    ToolNotFound {
        /// Program that was looked up.
        program: String,
        /// Whether the program came from the `YOSYS` variable.
        from_env: bool,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("synthesis tool failed ({}): {stderr}", status_text(.status))]
    ToolFailed {
        /// Exit code, if the tool exited normally.
        status: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// Communicating with the tool failed.
    #[error("synthesis tool I/O error: {0}")]
    Io(#[from] io::Error),
}

fn not_found_hint(from_env: &bool) -> &'static str {
    if *from_env {
        "as specified via the YOSYS environment variable"
    } else {
        "in PATH; place it in PATH or set the YOSYS environment variable"
    }
}

fn status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "killed by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_mentions_source() {
        let from_path = SynthError::ToolNotFound {
            program: "yosys".into(),
            from_env: false,
        };
        assert!(from_path.to_string().contains("in PATH"));
        let from_env = SynthError::ToolNotFound {
            program: "/opt/yosys".into(),
            from_env: true,
        };
        assert!(from_env.to_string().contains("YOSYS environment variable"));
    }

    #[test]
    fn tool_failed_display() {
        let e = SynthError::ToolFailed {
            status: Some(1),
            stderr: "ERROR: syntax error".into(),
        };
        assert_eq!(e.to_string(), "synthesis tool failed (exit status 1): ERROR: syntax error");
    }
}

//! External synthesis tool invocation.
//!
//! The generated Verilog is piped to a Yosys-compatible tool as a script on
//! standard input (`<tool> -q -`), using a heredoc for the netlist text.
//! The tool's standard output is returned as-is.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::SynthError;

/// Environment variable that overrides the tool executable.
pub const TOOL_ENV_VAR: &str = "YOSYS";

const DEFAULT_PROGRAM: &str = "yosys";

const DEFAULT_PASSES: &[&str] = &["proc_init", "proc_arst", "proc_dff", "proc_clean", "write_verilog -norename"];

/// How to run the synthesis tool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolConfig {
    /// Executable to run when `YOSYS` is unset. Defaults to `yosys`.
    pub program: Option<String>,
    /// Commands run after the netlist is read. Defaults to a process
    /// cleanup followed by `write_verilog -norename`.
    pub script: Vec<String>,
}

impl ToolConfig {
    /// The executable to run and whether it came from the environment.
    fn program(&self, env: Option<String>) -> (String, bool) {
        match env.filter(|p| !p.is_empty()) {
            Some(p) => (p, true),
            None => (
                self.program.clone().unwrap_or_else(|| DEFAULT_PROGRAM.to_string()),
                false,
            ),
        }
    }
}

/// Builds the script fed to the tool's standard input.
pub fn build_script(verilog: &str, passes: &[String]) -> String {
    let mut script = String::from("# Read the generated netlist.\nread_verilog <<verilog\n");
    script.push_str(verilog);
    if !verilog.ends_with('\n') {
        script.push('\n');
    }
    script.push_str("verilog\n");
    if passes.is_empty() {
        for pass in DEFAULT_PASSES {
            script.push_str(pass);
            script.push('\n');
        }
    } else {
        for pass in passes {
            script.push_str(pass);
            script.push('\n');
        }
    }
    script
}

/// Runs the synthesis tool on `verilog` and returns its standard output.
///
/// The executable is taken from the `YOSYS` environment variable if set,
/// then from `config`, then `yosys` on `PATH`.
pub fn run_tool(config: &ToolConfig, verilog: &str) -> Result<String, SynthError> {
    let (program, from_env) = config.program(std::env::var(TOOL_ENV_VAR).ok());
    let script = build_script(verilog, &config.script);
    run_program(&program, from_env, &script)
}

fn run_program(program: &str, from_env: bool, script: &str) -> Result<String, SynthError> {
    tracing::info!(program, "running synthesis tool");
    let mut child = Command::new(program)
        .args(["-q", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SynthError::ToolNotFound {
                program: program.to_string(),
                from_env,
            },
            _ => SynthError::Io(e),
        })?;

    // Write on a separate thread so a tool that fills its output pipe
    // before draining stdin cannot deadlock us.
    let writer = child.stdin.take().map(|mut stdin| {
        let script = script.to_string();
        std::thread::spawn(move || stdin.write_all(script.as_bytes()))
    });
    let output = child.wait_with_output()?;
    if let Some(writer) = writer {
        match writer.join() {
            Ok(Ok(())) => {}
            // The tool may exit without reading everything; its status says why.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(SynthError::Io(e)),
            Err(_) => return Err(SynthError::Io(std::io::Error::other("stdin writer panicked"))),
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(program, status = ?output.status.code(), "synthesis tool failed");
        return Err(SynthError::ToolFailed {
            status: output.status.code(),
            stderr,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

//! Strata CLI: the command-line front end for a design built in Rust.
//!
//! A design crate builds its [`Design`] and hands it to [`main`], which
//! provides `generate` for writing a Verilog netlist (optionally passed
//! through an external synthesis tool) and `simulate` for running the design
//! against free-running clocks with an optional VCD trace.

#![warn(missing_docs)]

mod generate;
mod project;
mod simulate;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use strata_ir::Design;
use tracing_subscriber::EnvFilter;

/// Generate or simulate a Strata design.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata hardware design tool")]
pub struct Cli {
    /// Increase log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a `strata.toml` configuration file. Defaults to
    /// `./strata.toml` if it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a netlist from the design.
    Generate(GenerateArgs),
    /// Simulate the design.
    Simulate(SimulateArgs),
}

/// Arguments for the `generate` subcommand.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Output language.
    #[arg(short = 't', long = "type", value_enum, default_value_t = OutputLanguage::Verilog)]
    pub lang: OutputLanguage,

    /// Write generated code to FILE instead of standard output.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Pass the netlist through the synthesis tool and emit its output.
    #[arg(long)]
    pub synth: bool,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Simulate for COUNT periods of the `sync` clock.
    #[arg(short = 'c', long = "clocks", value_name = "COUNT")]
    pub clocks: u64,

    /// Clock period for every domain, e.g. `10ns`. Defaults to the
    /// configured clocks, then 1us.
    #[arg(short, long, value_name = "TIME")]
    pub period: Option<String>,

    /// Write an execution trace to VCD-FILE.
    #[arg(long = "vcd", value_name = "VCD-FILE")]
    pub vcd: Option<PathBuf>,
}

/// Netlist language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputLanguage {
    /// Verilog-2001.
    #[value(name = "v")]
    Verilog,
}

/// Parses the command line, runs the requested command on `design` and
/// exits the process.
pub fn main(design: Design) -> ! {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(&cli, &design) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Runs an already parsed command line. Returns the process exit code.
pub fn run(cli: &Cli, design: &Design) -> Result<i32, Box<dyn std::error::Error>> {
    let project = project::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Generate(args) => generate::run(args, design, project.as_ref()),
        Command::Simulate(args) => simulate::run(args, design, project.as_ref()),
    }
}

fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs a stderr subscriber. `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbosity)));
    // A subscriber may already be installed by an embedding program.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

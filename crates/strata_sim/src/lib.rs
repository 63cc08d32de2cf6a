//! Event-driven, two-state simulator for elaborated Strata designs.
//!
//! The [`Simulator`] keeps one value per flat signal. Pokes and clock
//! toggles are applied at the next settle point, where combinational
//! processes are re-evaluated in delta cycles until nothing changes and
//! registers update atomically on active clock edges. Testbench processes
//! are `async` blocks driven cooperatively by the simulator (see
//! [`ProcessContext`]); settled values stream to [`WaveformSink`]s such as
//! the [`VcdRecorder`].
//!
//! [`run_simulation`] wraps the whole cycle for a batch run: attach clocks,
//! register testbenches, run to a deadline and report the outcome.

#![warn(missing_docs)]

pub mod error;
pub mod evaluator;
pub mod kernel;
pub mod process;
pub mod simulator;
pub mod time;
pub mod value;
pub mod waveform;

use std::future::Future;

use serde::{Deserialize, Serialize};
use strata_elaborate::ElaboratedDesign;
use strata_ir::DomainId;

pub use error::SimError;
pub use kernel::{SettleStats, SimState};
pub use process::{ProcessContext, ProcessFuture, Wait};
pub use simulator::Simulator;
pub use time::{format_fs, parse_duration, SimTime, FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US};
pub use value::{PokeValue, SignalRef};
pub use waveform::{TraceBuffer, TraceEvent, TracedSignal, VcdRecorder, WaveformSink};

/// Simulator tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Delta cycles allowed per settle before the design counts as
    /// diverged.
    pub max_delta_cycles: u32,
    /// Whether an asserted asynchronous reset forces its registers at once
    /// rather than at the next edge.
    pub async_reset_applies_immediately: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_delta_cycles: 10_000,
            async_reset_applies_immediately: true,
        }
    }
}

/// A clock to attach before a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSpec {
    /// Domain whose clock signal is driven.
    pub domain: DomainId,
    /// Full period in femtoseconds.
    pub period_fs: u64,
    /// Time of the first active edge.
    pub phase_fs: u64,
}

impl ClockSpec {
    /// A clock whose first active edge falls half a period in.
    pub fn new(domain: DomainId, period_fs: u64) -> Self {
        Self {
            domain,
            period_fs,
            phase_fs: period_fs / 2,
        }
    }
}

/// Parameters of a batch run.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    /// Clocks to attach.
    pub clocks: Vec<ClockSpec>,
    /// Simulated time after which the run stops.
    pub max_duration_fs: u64,
    /// Simulator tuning.
    pub sim: SimConfig,
    /// Whether to return the settled-value stream in the report.
    pub capture_waveform: bool,
}

/// A named testbench process for a batch run.
pub struct Testbench {
    name: String,
    body: Box<dyn FnOnce(ProcessContext) -> ProcessFuture>,
}

impl Testbench {
    /// Wraps an `async` testbench body.
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(ProcessContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), SimError>> + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(move |ctx| -> ProcessFuture { Box::pin(body(ctx)) }),
        }
    }

    /// The process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, Box<dyn FnOnce(ProcessContext) -> ProcessFuture>) {
        (self.name, self.body)
    }
}

/// How a batch run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every check held.
    Passed,
    /// A testbench assertion failed.
    Failed {
        /// Simulated time of the failure.
        time_fs: u64,
        /// Failing process.
        process: String,
        /// Failure message.
        message: String,
    },
}

/// The result of [`run_simulation`].
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Pass or fail.
    pub outcome: RunOutcome,
    /// Simulated time when the run stopped.
    pub final_time: SimTime,
    /// The settled-value stream, if requested.
    pub waveform: Option<Vec<TraceEvent>>,
    /// Processes still suspended when the run stopped.
    pub unfinished: Vec<String>,
}

impl RunReport {
    /// Returns `true` if no assertion failed.
    pub fn passed(&self) -> bool {
        self.outcome == RunOutcome::Passed
    }
}

/// Simulates `design` with the given clocks and testbenches.
///
/// The run stops at `max_duration_fs`, or earlier once every testbench has
/// finished. A failed assertion ends the run with
/// [`RunOutcome::Failed`]; any other simulation error is returned as `Err`.
pub fn run_simulation(
    design: &ElaboratedDesign,
    config: &RunConfig,
    testbenches: Vec<Testbench>,
) -> Result<RunReport, SimError> {
    let mut sim = Simulator::new(design, config.sim);
    for clock in &config.clocks {
        sim.add_clock(clock.domain, clock.period_fs, clock.phase_fs)?;
    }
    let buffer = config.capture_waveform.then(TraceBuffer::new);
    if let Some(buffer) = &buffer {
        sim.add_sink(Box::new(buffer.clone()))?;
    }
    for tb in testbenches {
        sim.add_testbench(tb);
    }

    let outcome = match sim.run_until_done(config.max_duration_fs) {
        Ok(()) => RunOutcome::Passed,
        Err(SimError::AssertionFailed {
            time_fs,
            process,
            message,
        }) => RunOutcome::Failed {
            time_fs,
            process,
            message,
        },
        Err(e) => return Err(e),
    };
    sim.finish()?;

    let report = RunReport {
        outcome,
        final_time: sim.now(),
        waveform: buffer.map(|b| b.events()),
        unfinished: sim.unfinished_processes(),
    };
    tracing::info!(
        design = %design.top_name(),
        time = %report.final_time,
        passed = report.passed(),
        unfinished = report.unfinished.len(),
        "simulation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_elaborate::elaborate;
    use strata_ir::{Design, DomainOptions, Shape, Statement};

    fn toggler() -> (ElaboratedDesign, DomainId) {
        let mut d = Design::new();
        let top = d.fragment("top");
        let sync = d.add_domain("sync", DomainOptions::new().reset_less()).unwrap();
        let q = d.output(top, "q", Shape::unsigned(1));
        d.sync(top, sync, Statement::assign(q, !q));
        d.set_top(top);
        (elaborate(&d).unwrap(), sync)
    }

    #[test]
    fn default_config() {
        let c = SimConfig::default();
        assert_eq!(c.max_delta_cycles, 10_000);
        assert!(c.async_reset_applies_immediately);
        let parsed: SimConfig = serde_json::from_str(r#"{"max_delta_cycles": 5}"#).unwrap();
        assert_eq!(parsed.max_delta_cycles, 5);
        assert!(parsed.async_reset_applies_immediately);
    }

    #[test]
    fn clock_spec_defaults_to_half_period_phase() {
        let c = ClockSpec::new(DomainId::from_raw(0), 10);
        assert_eq!(c.phase_fs, 5);
    }

    #[test]
    fn run_without_testbenches_reaches_deadline() {
        let (design, sync) = toggler();
        let config = RunConfig {
            clocks: vec![ClockSpec::new(sync, 10)],
            max_duration_fs: 100,
            capture_waveform: true,
            ..RunConfig::default()
        };
        let report = run_simulation(&design, &config, Vec::new()).unwrap();
        assert!(report.passed());
        assert_eq!(report.final_time.fs, 100);
        let q = design.find_signal("q").unwrap();
        let q_changes: Vec<u64> = report
            .waveform
            .unwrap()
            .iter()
            .filter(|e| e.signal == q)
            .map(|e| e.time_fs)
            .collect();
        assert_eq!(q_changes, vec![0, 5, 15, 25, 35, 45, 55, 65, 75, 85, 95]);
    }

    #[test]
    fn failed_assertion_becomes_outcome() {
        let (design, sync) = toggler();
        let q = design.find_signal("q").unwrap();
        let config = RunConfig {
            clocks: vec![ClockSpec::new(sync, 10)],
            max_duration_fs: 1_000,
            ..RunConfig::default()
        };
        let bench = Testbench::new("bench", move |ctx| async move {
            ctx.tick(sync).await?;
            ctx.assert_eq(q, 0u64, "q after first edge")
        });
        let report = run_simulation(&design, &config, vec![bench]).unwrap();
        match report.outcome {
            RunOutcome::Failed { time_fs, process, .. } => {
                assert_eq!(time_fs, 5);
                assert_eq!(process, "bench");
            }
            RunOutcome::Passed => panic!("expected failure"),
        }
    }

    #[test]
    fn unfinished_testbenches_are_reported() {
        let (design, sync) = toggler();
        let config = RunConfig {
            max_duration_fs: 50,
            ..RunConfig::default()
        };
        // No clock is attached, so the tick never comes.
        let bench = Testbench::new("waiter", move |ctx| async move { ctx.tick(sync).await });
        let report = run_simulation(&design, &config, vec![bench]).unwrap();
        assert!(report.passed());
        assert_eq!(report.unfinished, vec!["waiter".to_string()]);
        assert_eq!(report.final_time.fs, 50);
        assert!(report.waveform.is_none());
    }
}

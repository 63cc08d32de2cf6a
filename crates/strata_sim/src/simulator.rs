//! The public simulator handle.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use strata_common::Bits;
use strata_elaborate::ElaboratedDesign;
use strata_ir::{DomainId, SignalId};

use crate::error::SimError;
use crate::kernel::{Kernel, SettleStats, SimState};
use crate::process::{poll_round, ProcessContext, ProcessSlot};
use crate::time::SimTime;
use crate::value::{PokeValue, SignalRef};
use crate::waveform::WaveformSink;
use crate::{SimConfig, Testbench};

/// An event-driven, two-state simulator for one elaborated design.
///
/// Values start at their reset values with every combinational process
/// queued; nothing is readable until the first settle. Time only moves
/// through [`advance`](Self::advance) and [`run_until`](Self::run_until).
pub struct Simulator {
    kernel: Rc<RefCell<Kernel>>,
    processes: Vec<ProcessSlot>,
    max_rounds: u32,
}

impl Simulator {
    /// Creates a simulator. The design is copied, so the caller may keep
    /// using it.
    pub fn new(design: &ElaboratedDesign, config: SimConfig) -> Self {
        Self {
            kernel: Rc::new(RefCell::new(Kernel::new(design, config))),
            processes: Vec::new(),
            max_rounds: config.max_delta_cycles,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.kernel.borrow().now()
    }

    /// Where the design is in its update cycle.
    pub fn state(&self) -> SimState {
        self.kernel.borrow().state()
    }

    /// Looks up a live signal by hierarchical path, following port aliases.
    pub fn find_signal(&self, path: &str) -> Option<SignalId> {
        self.kernel.borrow().design().find_signal(path)
    }

    /// Drives the clock of `domain` with a square wave of `period_fs`,
    /// starting at the inactive level with the first active edge at
    /// `now + phase_fs`.
    pub fn add_clock(&mut self, domain: DomainId, period_fs: u64, phase_fs: u64) -> Result<(), SimError> {
        self.kernel.borrow_mut().add_clock(domain, period_fs, phase_fs)
    }

    /// Attaches a consumer of the settled-value stream.
    pub fn add_sink(&mut self, sink: Box<dyn WaveformSink>) -> Result<(), SimError> {
        self.kernel.borrow_mut().add_sink(sink)
    }

    /// Registers a testbench process. It first runs at the next call to
    /// [`run_until`](Self::run_until) or [`advance`](Self::advance).
    pub fn add_process<F, Fut>(&mut self, name: &str, body: F)
    where
        F: FnOnce(ProcessContext) -> Fut,
        Fut: Future<Output = Result<(), SimError>> + 'static,
    {
        tracing::debug!(process = name, "process added");
        self.processes.push(ProcessSlot::new(&self.kernel, name, body));
    }

    /// Registers a boxed testbench.
    pub fn add_testbench(&mut self, testbench: Testbench) {
        let (name, body) = testbench.into_parts();
        self.add_process(&name, body);
    }

    /// Schedules a write to an undriven signal for the next settle.
    pub fn poke(&mut self, signal: impl SignalRef, value: impl PokeValue) -> Result<(), SimError> {
        let mut kernel = self.kernel.borrow_mut();
        let id = kernel.resolve(signal.signal_id())?;
        let bits = value.into_bits(kernel.design().signal(id).shape);
        kernel.poke(id, bits)
    }

    /// Reads a settled value. Fails with [`SimError::NotSettled`] while
    /// pokes or combinational work are pending.
    pub fn peek(&self, signal: impl SignalRef) -> Result<Bits, SimError> {
        self.kernel.borrow().peek(signal.signal_id())
    }

    /// Reads a settled value as an unsigned integer, or `None` if it does
    /// not fit in 64 bits.
    pub fn peek_u64(&self, signal: impl SignalRef) -> Result<Option<u64>, SimError> {
        Ok(self.peek(signal)?.to_u64())
    }

    /// Applies pending pokes and brings the design to a fixed point at the
    /// current time, processing any clock edges that result.
    pub fn settle(&mut self) -> Result<SettleStats, SimError> {
        self.kernel.borrow_mut().settle()
    }

    /// Runs for `duration_fs` femtoseconds.
    pub fn advance(&mut self, duration_fs: u64) -> Result<(), SimError> {
        let target = self.now().fs.saturating_add(duration_fs);
        self.run(target, false)
    }

    /// Runs until simulated time reaches `deadline_fs`, processing every
    /// event scheduled at or before it.
    pub fn run_until(&mut self, deadline_fs: u64) -> Result<(), SimError> {
        self.run(deadline_fs, false)
    }

    /// Like [`run_until`](Self::run_until), but stops as soon as every
    /// registered process has finished.
    pub fn run_until_done(&mut self, deadline_fs: u64) -> Result<(), SimError> {
        self.run(deadline_fs, true)
    }

    /// Names of registered processes that have not finished.
    pub fn unfinished_processes(&self) -> Vec<String> {
        self.processes
            .iter()
            .filter(|p| !p.is_finished())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Flushes every waveform sink.
    pub fn finish(&mut self) -> Result<(), SimError> {
        self.kernel.borrow_mut().finish_sinks()
    }

    fn all_finished(&self) -> bool {
        !self.processes.is_empty() && self.processes.iter().all(ProcessSlot::is_finished)
    }

    fn run(&mut self, deadline_fs: u64, until_done: bool) -> Result<(), SimError> {
        let now = self.now().fs;
        if deadline_fs < now {
            return Err(SimError::TimeRewind {
                now_fs: now,
                target_fs: deadline_fs,
            });
        }
        self.step_now()?;
        loop {
            if until_done && self.all_finished() {
                return Ok(());
            }
            match self.next_event() {
                Some(t) if t <= deadline_fs => {
                    self.kernel.borrow_mut().advance_to(t);
                    self.step_now()?;
                }
                _ => break,
            }
        }
        if self.now().fs < deadline_fs {
            self.kernel.borrow_mut().advance_to(deadline_fs);
            self.step_now()?;
        }
        Ok(())
    }

    fn next_event(&self) -> Option<u64> {
        let now = self.now().fs;
        let clocks = self.kernel.borrow().next_clock_event();
        let wakes = self.processes.iter().filter_map(ProcessSlot::wake_time).filter(|&t| t > now);
        clocks.into_iter().chain(wakes).min()
    }

    /// Alternates settling and process rounds until neither has work left at
    /// the current timestamp.
    fn step_now(&mut self) -> Result<(), SimError> {
        let mut rounds = 0u32;
        loop {
            self.kernel.borrow_mut().settle()?;
            if !poll_round(&self.kernel, &mut self.processes)? {
                return Ok(());
            }
            rounds += 1;
            if rounds > self.max_rounds {
                return Err(SimError::Diverged {
                    time_fs: self.now().fs,
                    deltas: rounds,
                    unstable: self.unfinished_processes(),
                });
            }
        }
    }
}

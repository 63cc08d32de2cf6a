//! The simulation kernel: signal storage, delta-cycle settling, clock edges
//! and clock generators.
//!
//! Combinational processes are scheduled through a work set ordered by their
//! position in the dependency graph's topological order. Each delta cycle
//! evaluates the whole pending batch against the values committed by the
//! previous delta, then commits every change at once. A design that still
//! has pending work after `max_delta_cycles` deltas has diverged, and the
//! kernel refuses any further operation.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use strata_common::Bits;
use strata_elaborate::{ElaboratedDesign, SignalRole};
use strata_ir::{DomainId, Edge, ResetKind, SignalId};

use crate::error::SimError;
use crate::evaluator::{exec_statements, Assignments};
use crate::time::SimTime;
use crate::waveform::{TraceEvent, TracedSignal, WaveformSink};
use crate::SimConfig;

/// Where the kernel is in its update cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SimState {
    /// Stimulus or combinational work is pending; values are not readable.
    Idle,
    /// A settle is in progress.
    Settling,
    /// All values are at a fixed point.
    Settled,
    /// A settle exceeded the delta-cycle limit. Terminal.
    Diverged,
}

/// Work done by one call to settle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SettleStats {
    /// Delta cycles executed.
    pub deltas: u32,
    /// Signal value changes committed, including register updates.
    pub changes: usize,
    /// Active clock edges processed.
    pub edges: usize,
}

#[derive(Clone, Debug)]
struct Divergence {
    time_fs: u64,
    deltas: u32,
    unstable: Vec<String>,
}

impl Divergence {
    fn to_error(&self) -> SimError {
        SimError::Diverged {
            time_fs: self.time_fs,
            deltas: self.deltas,
            unstable: self.unstable.clone(),
        }
    }
}

/// A free-running clock attached to a domain.
#[derive(Clone, Debug)]
struct ClockGen {
    domain: DomainId,
    signal: SignalId,
    period_fs: u64,
    active_level: bool,
    next_toggle: u64,
    next_level: bool,
}

impl ClockGen {
    /// Time the clock stays at `level` before toggling.
    fn hold_time(&self, level: bool) -> u64 {
        let high = self.period_fs / 2;
        if level == self.active_level {
            high
        } else {
            self.period_fs - high
        }
    }
}

pub(crate) struct Kernel {
    design: ElaboratedDesign,
    config: SimConfig,
    values: Vec<Bits>,
    pending: BTreeMap<SignalId, Bits>,
    order: Vec<usize>,
    rank: Vec<Option<usize>>,
    work: BTreeSet<usize>,
    registers: Vec<Vec<SignalId>>,
    last_clk: Vec<bool>,
    edge_counts: Vec<u64>,
    clocks: Vec<ClockGen>,
    loaded: bool,
    now: SimTime,
    state: SimState,
    divergence: Option<Divergence>,
    traced: Vec<TracedSignal>,
    emitted: Vec<Option<Bits>>,
    sinks: Vec<Box<dyn WaveformSink>>,
}

fn idx(id: SignalId) -> usize {
    id.as_raw() as usize
}

fn didx(id: DomainId) -> usize {
    id.as_raw() as usize
}

impl Kernel {
    pub(crate) fn new(design: &ElaboratedDesign, config: SimConfig) -> Self {
        let design = design.clone();
        let values: Vec<Bits> = design.signals().values().map(|s| s.reset.clone()).collect();

        let order: Vec<usize> = design.graph().comb_order().iter().map(|p| p.index()).collect();
        let mut rank = vec![None; design.processes().len()];
        for (r, &p) in order.iter().enumerate() {
            rank[p] = Some(r);
        }

        let domain_count = design.domains().len();
        let mut registers = vec![Vec::new(); domain_count];
        for (id, signal) in design.live_signals() {
            if let SignalRole::Sync { domain, .. } = signal.role {
                registers[didx(domain)].push(id);
            }
        }
        let last_clk = design
            .domains()
            .values()
            .map(|d| values[idx(d.clk)].get(0))
            .collect();

        let traced: Vec<TracedSignal> = design
            .live_signals()
            .map(|(id, s)| TracedSignal {
                id,
                path: s.path.clone(),
                width: s.shape.width,
            })
            .collect();

        let signal_count = values.len();
        tracing::debug!(
            design = %design.top_name(),
            signals = traced.len(),
            processes = design.processes().len(),
            "simulation kernel created"
        );
        Self {
            work: (0..order.len()).collect(),
            design,
            config,
            values,
            pending: BTreeMap::new(),
            order,
            rank,
            registers,
            last_clk,
            edge_counts: vec![0; domain_count],
            clocks: Vec::new(),
            loaded: false,
            now: SimTime::zero(),
            state: SimState::Idle,
            divergence: None,
            traced,
            emitted: vec![None; signal_count],
            sinks: Vec::new(),
        }
    }

    pub(crate) fn design(&self) -> &ElaboratedDesign {
        &self.design
    }

    pub(crate) fn now(&self) -> SimTime {
        self.now
    }

    pub(crate) fn state(&self) -> SimState {
        self.state
    }

    fn is_settled(&self) -> bool {
        self.pending.is_empty() && self.work.is_empty()
    }

    fn check_diverged(&self) -> Result<(), SimError> {
        match &self.divergence {
            Some(d) => Err(d.to_error()),
            None => Ok(()),
        }
    }

    fn path(&self, id: SignalId) -> String {
        self.design.signal(id).path.clone()
    }

    /// Validates `id` and follows port aliases.
    pub(crate) fn resolve(&self, id: SignalId) -> Result<SignalId, SimError> {
        match self.design.signals().try_get(id) {
            Some(s) if !matches!(s.role, SignalRole::Unused) => Ok(self.design.resolve(id)),
            _ => Err(SimError::UnknownSignal { id: id.as_raw() }),
        }
    }

    pub(crate) fn check_domain(&self, id: DomainId) -> Result<(), SimError> {
        match self.design.domains().try_get(id) {
            Some(_) => Ok(()),
            None => Err(SimError::UnknownDomain { id: id.as_raw() }),
        }
    }

    pub(crate) fn edge_count(&self, domain: DomainId) -> Result<u64, SimError> {
        self.check_domain(domain)?;
        Ok(self.edge_counts[didx(domain)])
    }

    fn driver_of(&self, id: SignalId) -> Option<String> {
        if let Some(clock) = self.clocks.iter().find(|c| c.signal == id) {
            return Some(format!(
                "the clock generator of domain '{}'",
                self.design.domain(clock.domain).name
            ));
        }
        match self.design.signal(id).role {
            SignalRole::Comb(p) | SignalRole::Sync { process: p, .. } => Some(self.design.process(p).label.clone()),
            _ => None,
        }
    }

    /// Schedules `bits` to be written to an undriven signal at the next
    /// settle.
    pub(crate) fn poke(&mut self, id: SignalId, bits: Bits) -> Result<(), SimError> {
        self.check_diverged()?;
        let id = self.resolve(id)?;
        if let Some(driver) = self.driver_of(id) {
            return Err(SimError::DrivenSignal {
                signal: self.path(id),
                driver,
            });
        }
        let expected = self.design.signal(id).shape.width;
        if bits.width() != expected {
            return Err(SimError::WidthMismatch {
                signal: self.path(id),
                expected,
                actual: bits.width(),
            });
        }
        tracing::trace!(signal = %self.path(id), value = %bits, "poke");
        self.pending.insert(id, bits);
        self.state = SimState::Idle;
        Ok(())
    }

    pub(crate) fn peek(&self, id: SignalId) -> Result<Bits, SimError> {
        self.check_diverged()?;
        let id = self.resolve(id)?;
        if !self.is_settled() {
            return Err(SimError::NotSettled { signal: self.path(id) });
        }
        Ok(self.values[idx(id)].clone())
    }

    /// Brings the design to a fixed point, processing any clock edges that
    /// settling produces, and reports the result to the waveform sinks.
    pub(crate) fn settle(&mut self) -> Result<SettleStats, SimError> {
        self.check_diverged()?;
        let mut stats = SettleStats::default();
        self.settle_comb(&mut stats)?;
        if !self.loaded {
            // Levels reached by the initial load are not edges.
            self.sync_clock_levels();
            self.loaded = true;
        }
        let mut rounds = 0u32;
        while self.commit_edges(&mut stats) {
            rounds += 1;
            if rounds > self.config.max_delta_cycles {
                let unstable = self
                    .design
                    .domains()
                    .values()
                    .map(|d| self.path(d.clk))
                    .collect();
                return Err(self.diverge(rounds, unstable));
            }
            self.settle_comb(&mut stats)?;
        }
        self.state = SimState::Settled;
        self.emit_trace()?;
        if stats.deltas > 0 || stats.edges > 0 {
            tracing::trace!(
                time = %self.now,
                deltas = stats.deltas,
                changes = stats.changes,
                edges = stats.edges,
                "settled"
            );
        }
        Ok(stats)
    }

    fn sync_clock_levels(&mut self) {
        for (i, d) in self.design.domains().values().enumerate() {
            self.last_clk[i] = self.values[idx(d.clk)].get(0);
        }
    }

    fn diverge(&mut self, deltas: u32, unstable: Vec<String>) -> SimError {
        let d = Divergence {
            time_fs: self.now.fs,
            deltas,
            unstable,
        };
        tracing::error!(time = %self.now, deltas, unstable = ?d.unstable, "design diverged");
        let err = d.to_error();
        self.divergence = Some(d);
        self.state = SimState::Diverged;
        err
    }

    /// Writes `updates`, returning the signals whose value changed.
    fn apply(&mut self, updates: Assignments) -> Vec<SignalId> {
        let mut changed = Vec::new();
        for (id, bits) in updates {
            let slot = &mut self.values[idx(id)];
            if *slot != bits {
                *slot = bits;
                changed.push(id);
            }
        }
        changed
    }

    fn schedule_readers(&mut self, changed: &[SignalId]) {
        for &id in changed {
            for p in self.design.graph().readers(id) {
                if let Some(r) = self.rank[p.index()] {
                    self.work.insert(r);
                }
            }
        }
    }

    fn reset_asserted(&self, domain: DomainId) -> bool {
        let d = self.design.domain(domain);
        d.rst.is_some_and(|r| d.polarity.is_asserted(self.values[idx(r)].get(0)))
    }

    /// Holds the registers of every async-reset domain whose reset is
    /// asserted at their reset values.
    fn enforce_async_resets(&mut self) -> Vec<SignalId> {
        if !self.config.async_reset_applies_immediately {
            return Vec::new();
        }
        let mut updates = Assignments::new();
        for (domain, d) in self.design.domains().iter() {
            if d.reset_kind != ResetKind::Async || !self.reset_asserted(domain) {
                continue;
            }
            for &r in &self.registers[didx(domain)] {
                let s = self.design.signal(r);
                if !s.reset_less {
                    updates.insert(r, s.reset.clone());
                }
            }
        }
        self.apply(updates)
    }

    fn settle_comb(&mut self, stats: &mut SettleStats) -> Result<(), SimError> {
        self.state = SimState::Settling;
        let pokes: Assignments = mem::take(&mut self.pending);
        let mut changed = self.apply(pokes);
        changed.extend(self.enforce_async_resets());
        self.schedule_readers(&changed);
        stats.changes += changed.len();

        let mut deltas = 0u32;
        while !self.work.is_empty() {
            if deltas >= self.config.max_delta_cycles {
                let unstable = changed.iter().map(|&id| self.path(id)).collect();
                return Err(self.diverge(deltas, unstable));
            }
            deltas += 1;

            let batch: Vec<usize> = mem::take(&mut self.work).into_iter().map(|r| self.order[r]).collect();
            let mut updates = Assignments::new();
            let reset = |id: SignalId| self.design.signal(id).reset.clone();
            for p in batch {
                let process = &self.design.processes()[p];
                let mut out = Assignments::new();
                exec_statements(&self.values, &process.statements, &reset, &mut out);
                // Unassigned comb outputs fall back to their reset value.
                for &d in &process.drives {
                    let v = out.remove(&d).unwrap_or_else(|| reset(d));
                    updates.insert(d, v);
                }
            }

            changed = self.apply(updates);
            changed.extend(self.enforce_async_resets());
            self.schedule_readers(&changed);
            stats.changes += changed.len();
        }
        stats.deltas += deltas;
        self.now = self.now.plus_deltas(deltas);
        Ok(())
    }

    /// Detects active edges since the last call and updates the registers of
    /// the triggered domains. Returns `false` if no domain triggered.
    fn commit_edges(&mut self, stats: &mut SettleStats) -> bool {
        let mut triggered = Vec::new();
        for (domain, d) in self.design.domains().iter() {
            let level = self.values[idx(d.clk)].get(0);
            let prev = mem::replace(&mut self.last_clk[didx(domain)], level);
            let edge = match d.edge {
                Edge::Posedge => !prev && level,
                Edge::Negedge => prev && !level,
            };
            if edge {
                triggered.push(domain);
            }
        }
        if triggered.is_empty() {
            return false;
        }

        // Every triggered domain samples the pre-edge state.
        let mut updates = Assignments::new();
        let hold = |id: SignalId| self.values[idx(id)].clone();
        for &domain in &triggered {
            for (_, process) in self.design.sync_processes(domain) {
                exec_statements(&self.values, &process.statements, &hold, &mut updates);
            }
            if self.reset_asserted(domain) {
                for &r in &self.registers[didx(domain)] {
                    let s = self.design.signal(r);
                    if !s.reset_less {
                        updates.insert(r, s.reset.clone());
                    }
                }
            }
        }
        for &domain in &triggered {
            self.edge_counts[didx(domain)] += 1;
            tracing::trace!(domain = %self.design.domain(domain).name, time = %self.now, "clock edge");
        }

        let changed = self.apply(updates);
        self.schedule_readers(&changed);
        stats.changes += changed.len();
        stats.edges += triggered.len();
        true
    }

    fn emit_trace(&mut self) -> Result<(), SimError> {
        let mut events = Vec::new();
        for t in &self.traced {
            let value = &self.values[idx(t.id)];
            if self.emitted[idx(t.id)].as_ref() != Some(value) {
                events.push(TraceEvent {
                    time_fs: self.now.fs,
                    signal: t.id,
                    value: value.clone(),
                });
            }
        }
        for e in &events {
            self.emitted[idx(e.signal)] = Some(e.value.clone());
            for sink in &mut self.sinks {
                sink.change(e)?;
            }
        }
        Ok(())
    }

    /// Attaches a sink. A sink attached after the first settle receives the
    /// last emitted value of every signal at the current time.
    pub(crate) fn add_sink(&mut self, mut sink: Box<dyn WaveformSink>) -> Result<(), SimError> {
        sink.begin(self.design.top_name(), &self.traced)?;
        for t in &self.traced {
            if let Some(value) = &self.emitted[idx(t.id)] {
                sink.change(&TraceEvent {
                    time_fs: self.now.fs,
                    signal: t.id,
                    value: value.clone(),
                })?;
            }
        }
        self.sinks.push(sink);
        Ok(())
    }

    pub(crate) fn finish_sinks(&mut self) -> Result<(), SimError> {
        for sink in &mut self.sinks {
            sink.finish()?;
        }
        Ok(())
    }

    /// Drives the clock of `domain` with a square wave. The clock starts at
    /// its inactive level; active edges fall at `now + phase + k * period`.
    pub(crate) fn add_clock(&mut self, domain: DomainId, period_fs: u64, phase_fs: u64) -> Result<(), SimError> {
        self.check_diverged()?;
        self.check_domain(domain)?;
        let d = self.design.domain(domain);
        if self.clocks.iter().any(|c| c.domain == domain) {
            return Err(SimError::DuplicateClock { domain: d.name.clone() });
        }
        if period_fs < 2 {
            return Err(SimError::InvalidPeriod {
                domain: d.name.clone(),
                period_fs,
            });
        }
        let signal = d.clk;
        if let Some(driver) = self.driver_of(signal) {
            return Err(SimError::DrivenSignal {
                signal: self.path(signal),
                driver,
            });
        }

        let active_level = d.edge == Edge::Posedge;
        tracing::debug!(domain = %d.name, period_fs, phase_fs, "clock added");
        if self.values[idx(signal)].get(0) == active_level {
            self.pending.insert(signal, Bits::from_bool(!active_level));
            self.state = SimState::Idle;
        }
        self.clocks.push(ClockGen {
            domain,
            signal,
            period_fs,
            active_level,
            next_toggle: self.now.fs + phase_fs,
            next_level: active_level,
        });
        Ok(())
    }

    /// The earliest pending clock toggle.
    pub(crate) fn next_clock_event(&self) -> Option<u64> {
        self.clocks.iter().map(|c| c.next_toggle).min()
    }

    /// Moves time forward to `fs`, queueing every clock toggle due then.
    pub(crate) fn advance_to(&mut self, fs: u64) {
        if fs > self.now.fs {
            self.now = self.now.advance_to(fs);
        }
        for c in &mut self.clocks {
            while c.next_toggle <= fs {
                self.pending.insert(c.signal, Bits::from_bool(c.next_level));
                c.next_toggle += c.hold_time(c.next_level);
                c.next_level = !c.next_level;
            }
        }
        if !self.pending.is_empty() {
            self.state = SimState::Idle;
        }
    }
}

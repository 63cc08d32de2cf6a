//! Scenario helpers for Strata conformance tests.
//!
//! Each builder returns an elaborated design together with the handles a
//! test needs to drive and observe it. The stepping helpers run a
//! [`Simulator`] edge by edge or to a deadline and collect what the tests
//! assert on.

#![warn(missing_docs)]

use strata_common::ContentHash;
use strata_elaborate::{elaborate, ElaboratedDesign};
use strata_ir::{Design, DomainId, DomainOptions, Shape, Signal, SignalId, SignalOptions, Statement, Target};
use strata_sim::{ClockSpec, SimConfig, SimError, SignalRef, Simulator, TraceBuffer, TraceEvent};

/// Result of building a scenario design.
pub type BuildResult<T> = Result<T, Box<dyn std::error::Error>>;

/// A free-running counter in the `sync` domain.
pub struct Counter {
    /// The elaborated design.
    pub design: ElaboratedDesign,
    /// The counter's domain.
    pub sync: DomainId,
    /// The domain reset.
    pub rst: SignalId,
    /// The count register.
    pub count: Signal,
}

/// Builds `count <= count + 1` of the given width.
pub fn counter(width: u32, options: DomainOptions) -> BuildResult<Counter> {
    let mut d = Design::new();
    let top = d.fragment("counter");
    let sync = d.add_domain("sync", options)?;
    let count = d.output(top, "count", Shape::unsigned(width));
    d.sync(top, sync, Statement::assign(count, count + 1u32));
    d.set_top(top);
    let design = elaborate(&d)?;
    let rst = design.domain(sync).rst.ok_or("counter domain has no reset")?;
    Ok(Counter {
        design,
        sync,
        rst,
        count,
    })
}

/// A one-bit register that inverts itself on every edge.
pub struct Toggle {
    /// The elaborated design.
    pub design: ElaboratedDesign,
    /// The register's domain.
    pub sync: DomainId,
    /// The toggling register.
    pub q: Signal,
}

/// Builds `q <= !q` with the given reset value.
pub fn toggle(reset: i64) -> BuildResult<Toggle> {
    let mut d = Design::new();
    let top = d.fragment("toggle");
    let sync = d.add_domain("sync", DomainOptions::new().reset_less())?;
    let q = d.output_with(top, "q", Shape::unsigned(1), SignalOptions::new().reset(reset));
    d.sync(top, sync, Statement::assign(q, !q));
    d.set_top(top);
    Ok(Toggle {
        design: elaborate(&d)?,
        sync,
        q,
    })
}

/// Builds `a = !b`, `b = !a`, which has no combinational fixed point.
pub fn cross_coupled_inverters() -> BuildResult<(ElaboratedDesign, Signal, Signal)> {
    let mut d = Design::new();
    let top = d.fragment("ring");
    let a = d.output(top, "a", Shape::unsigned(1));
    let b = d.output(top, "b", Shape::unsigned(1));
    d.comb(top, Statement::assign(a, !b));
    d.comb(top, Statement::assign(b, !a));
    d.set_top(top);
    Ok((elaborate(&d)?, a, b))
}

/// Two counters in domains named `slow` and `fast`.
pub struct TwoClocks {
    /// The elaborated design.
    pub design: ElaboratedDesign,
    /// The slow domain.
    pub slow: DomainId,
    /// The fast domain.
    pub fast: DomainId,
    /// Counter in the slow domain.
    pub slow_count: Signal,
    /// Counter in the fast domain.
    pub fast_count: Signal,
}

/// Builds one 16-bit counter per domain.
pub fn two_clock_counters() -> BuildResult<TwoClocks> {
    let mut d = Design::new();
    let top = d.fragment("top");
    let slow = d.add_domain("slow", DomainOptions::new().reset_less())?;
    let fast = d.add_domain("fast", DomainOptions::new().reset_less())?;
    let slow_count = d.output(top, "slow_count", Shape::unsigned(16));
    let fast_count = d.output(top, "fast_count", Shape::unsigned(16));
    d.sync(top, slow, Statement::assign(slow_count, slow_count + 1u32));
    d.sync(top, fast, Statement::assign(fast_count, fast_count + 1u32));
    d.set_top(top);
    Ok(TwoClocks {
        design: elaborate(&d)?,
        slow,
        fast,
        slow_count,
        fast_count,
    })
}

/// A combinational output assigned only while `en` is high.
pub struct Guarded {
    /// The elaborated design.
    pub design: ElaboratedDesign,
    /// The enable input.
    pub en: Signal,
    /// The 4-bit output, reset value `0b0101`.
    pub y: Signal,
}

/// Builds `when en { y = 9 }`, or `when en { y[2..4] = 0b11 }` when
/// `partial` is set.
pub fn guarded(partial: bool) -> BuildResult<Guarded> {
    let mut d = Design::new();
    let top = d.fragment("guarded");
    let en = d.input(top, "en", Shape::unsigned(1));
    let y = d.output_with(top, "y", Shape::unsigned(4), SignalOptions::new().reset(0b0101));
    let body = if partial {
        Statement::assign(Target::slice(y, 2, 4)?, 0b11u32)
    } else {
        Statement::assign(y, 9u32)
    };
    d.comb(top, Statement::when(en, vec![body]));
    d.set_top(top);
    Ok(Guarded {
        design: elaborate(&d)?,
        en,
        y,
    })
}

/// Builds `depth` nested fragments. Each level instantiates the one below
/// and inverts its output, so the top output is the input inverted `depth`
/// times. Returns the design and the top-level input and output.
pub fn inverter_chain(depth: usize) -> BuildResult<(ElaboratedDesign, Signal, Signal)> {
    let mut d = Design::new();
    let leaf = d.fragment("level0");
    let mut child_in = d.input(leaf, "i", Shape::unsigned(1));
    let mut child_out = d.output(leaf, "o", Shape::unsigned(1));
    d.comb(leaf, Statement::assign(child_out, !child_in));
    let mut child = leaf;

    for level in 1..depth.max(1) {
        let frag = d.fragment(&format!("level{level}"));
        let i = d.input(frag, "i", Shape::unsigned(1));
        let o = d.output(frag, "o", Shape::unsigned(1));
        let t = d.signal(frag, "t", Shape::unsigned(1));
        d.instance(frag, "u0", child, [(child_in, i), (child_out, t)])?;
        d.comb(frag, Statement::assign(o, !t));
        child = frag;
        child_in = i;
        child_out = o;
    }
    d.set_top(child);
    Ok((elaborate(&d)?, child_in, child_out))
}

/// Runs to the first active edge of `clock` and then `edges - 1` periods
/// further, reading `signal` after each edge has settled.
pub fn sample_after_edges(
    sim: &mut Simulator,
    clock: ClockSpec,
    signal: impl SignalRef,
    edges: usize,
) -> Result<Vec<u64>, SimError> {
    sample_after_edges_with(sim, clock, signal, edges, |_, _| Ok(()))
}

/// Like [`sample_after_edges`], calling `after_edge(sim, index)` once each
/// sample is taken so the test can change inputs for the next edge.
pub fn sample_after_edges_with(
    sim: &mut Simulator,
    clock: ClockSpec,
    signal: impl SignalRef,
    edges: usize,
    mut after_edge: impl FnMut(&mut Simulator, usize) -> Result<(), SimError>,
) -> Result<Vec<u64>, SimError> {
    let mut samples = Vec::with_capacity(edges);
    let mut at = sim.now().fs + clock.phase_fs;
    for index in 0..edges {
        sim.run_until(at)?;
        let value = sim.peek(&signal)?;
        samples.push(value.to_u64().unwrap_or(u64::MAX));
        after_edge(sim, index)?;
        at += clock.period_fs;
    }
    Ok(samples)
}

/// Simulates `design` with `clocks` until `deadline_fs` and returns the
/// settled-value stream.
pub fn trace(design: &ElaboratedDesign, clocks: &[ClockSpec], deadline_fs: u64) -> Result<Vec<TraceEvent>, SimError> {
    let mut sim = Simulator::new(design, SimConfig::default());
    let buffer = TraceBuffer::new();
    sim.add_sink(Box::new(buffer.clone()))?;
    for clock in clocks {
        sim.add_clock(clock.domain, clock.period_fs, clock.phase_fs)?;
    }
    sim.run_until(deadline_fs)?;
    sim.finish()?;
    Ok(buffer.events())
}

/// Digest of [`trace`].
pub fn trace_digest(design: &ElaboratedDesign, clocks: &[ClockSpec], deadline_fs: u64) -> Result<ContentHash, SimError> {
    Ok(strata_sim::waveform::digest(&trace(design, clocks, deadline_fs)?))
}

//! The flattened, validated view of a design.

use crate::graph::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use strata_common::Bits;
use strata_ir::{Arena, Domain, DomainId, Edge, PortDirection, ResetKind, ResetPolarity, Shape, SignalId, SrcLoc, Statement};

/// Identity of a process: the statements of one fragment instance in one
/// domain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Creates an ID from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Returns the index as `usize`, for slice indexing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a flattened signal gets its value.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SignalRole {
    /// Not driven by any logic; set by the testbench or a clock generator.
    Input,
    /// Driven by a combinational process.
    Comb(ProcessId),
    /// A register updated by a synchronous process.
    Sync {
        /// Governing domain.
        domain: DomainId,
        /// Driving process.
        process: ProcessId,
    },
    /// A child port bound to a parent signal; all uses refer to the target.
    Alias(SignalId),
    /// Declared by a fragment that is never instantiated.
    Unused,
}

/// A signal of the flattened design.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FlatSignal {
    /// Hierarchical path, `.`-separated below the top fragment.
    pub path: String,
    /// Width and signedness.
    pub shape: Shape,
    /// Reset value.
    pub reset: Bits,
    /// Excluded from domain resets.
    pub reset_less: bool,
    /// Declaration site.
    pub loc: SrcLoc,
    /// Driver classification.
    pub role: SignalRole,
}

impl FlatSignal {
    /// Returns `false` for aliases and signals of uninstantiated fragments,
    /// which carry no state of their own.
    pub fn is_live(&self) -> bool {
        !matches!(self.role, SignalRole::Alias(_) | SignalRole::Unused)
    }
}

/// The statements of one fragment instance in one domain.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Process {
    /// Human-readable description, e.g. `comb logic of 'top.u1'`.
    pub label: String,
    /// Hierarchical path of the owning instance.
    pub scope: String,
    /// Governing domain.
    pub domain: Domain,
    /// Statements with signals renamed to flat identities.
    pub statements: Vec<Statement>,
    /// Signals assigned anywhere in the statements.
    pub drives: Vec<SignalId>,
    /// Signals read anywhere in the statements.
    pub reads: Vec<SignalId>,
}

/// A clock domain of the flattened design.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FlatDomain {
    /// Domain name.
    pub name: String,
    /// Clock signal.
    pub clk: SignalId,
    /// Reset signal, if any.
    pub rst: Option<SignalId>,
    /// Active edge.
    pub edge: Edge,
    /// Reset polarity.
    pub polarity: ResetPolarity,
    /// Reset timing.
    pub reset_kind: ResetKind,
}

/// A port of the top fragment.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FlatPort {
    /// Port name.
    pub name: String,
    /// Direction.
    pub direction: PortDirection,
    /// Flat signal behind the port.
    pub signal: SignalId,
}

/// A design after elaboration: one flat signal namespace, processes grouped
/// by instance and domain, and the combinational dependency graph.
///
/// Read-only; the simulator and the netlist backend may share one instance.
#[derive(Clone, Debug)]
pub struct ElaboratedDesign {
    pub(crate) name: String,
    pub(crate) signals: Arena<SignalId, FlatSignal>,
    pub(crate) processes: Vec<Process>,
    pub(crate) domains: Arena<DomainId, FlatDomain>,
    pub(crate) ports: Vec<FlatPort>,
    pub(crate) graph: DependencyGraph,
}

impl ElaboratedDesign {
    /// Name of the top fragment.
    pub fn top_name(&self) -> &str {
        &self.name
    }

    /// Every flat signal, including aliases and unused declarations.
    pub fn signals(&self) -> &Arena<SignalId, FlatSignal> {
        &self.signals
    }

    /// Signals that carry state, in identity order.
    pub fn live_signals(&self) -> impl Iterator<Item = (SignalId, &FlatSignal)> {
        self.signals.iter().filter(|(_, s)| s.is_live())
    }

    /// A flat signal.
    pub fn signal(&self, id: SignalId) -> &FlatSignal {
        &self.signals[id]
    }

    /// Follows port aliases to the signal that holds the value.
    pub fn resolve(&self, mut id: SignalId) -> SignalId {
        while let SignalRole::Alias(target) = self.signals[id].role {
            id = target;
        }
        id
    }

    /// Looks up a live signal by hierarchical path.
    pub fn find_signal(&self, path: &str) -> Option<SignalId> {
        self.signals
            .iter()
            .find(|(_, s)| s.path == path && !matches!(s.role, SignalRole::Unused))
            .map(|(id, _)| self.resolve(id))
    }

    /// All processes.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// One process.
    pub fn process(&self, id: ProcessId) -> &Process {
        &self.processes[id.index()]
    }

    /// Combinational processes in declaration order.
    pub fn comb_processes(&self) -> impl Iterator<Item = (ProcessId, &Process)> {
        self.processes_in(|d| d == Domain::Comb)
    }

    /// Synchronous processes of one domain in declaration order.
    pub fn sync_processes(&self, domain: DomainId) -> impl Iterator<Item = (ProcessId, &Process)> {
        self.processes_in(move |d| d == Domain::Sync(domain))
    }

    fn processes_in(&self, pred: impl Fn(Domain) -> bool) -> impl Iterator<Item = (ProcessId, &Process)> {
        self.processes
            .iter()
            .enumerate()
            .filter(move |(_, p)| pred(p.domain))
            .map(|(i, p)| (ProcessId::from_raw(i as u32), p))
    }

    /// Clock domains, indexed by the same IDs as in the source design.
    pub fn domains(&self) -> &Arena<DomainId, FlatDomain> {
        &self.domains
    }

    /// One clock domain.
    pub fn domain(&self, id: DomainId) -> &FlatDomain {
        &self.domains[id]
    }

    /// Ports of the top fragment.
    pub fn ports(&self) -> &[FlatPort] {
        &self.ports
    }

    /// The combinational dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// A short human-readable summary of the design's interface and
    /// contents.
    pub fn fragment_info(&self) -> String {
        let names = |dir: PortDirection| -> Vec<&str> {
            self.ports
                .iter()
                .filter(|p| p.direction == dir)
                .map(|p| p.name.as_str())
                .collect()
        };
        let (mut inputs, mut comb, mut registered) = (0, 0, 0);
        for (_, s) in self.live_signals() {
            match s.role {
                SignalRole::Input => inputs += 1,
                SignalRole::Comb(_) => comb += 1,
                SignalRole::Sync { .. } => registered += 1,
                SignalRole::Alias(_) | SignalRole::Unused => {}
            }
        }
        let sync_count = self.processes.iter().filter(|p| p.domain != Domain::Comb).count();

        let mut out = String::new();
        let _ = writeln!(out, "top: {}", self.name);
        let _ = writeln!(out, "inputs: {}", names(PortDirection::Input).join(" "));
        let _ = writeln!(out, "outputs: {}", names(PortDirection::Output).join(" "));
        let _ = writeln!(
            out,
            "signals: {} ({registered} registered, {comb} combinational, {inputs} undriven)",
            inputs + comb + registered
        );
        let _ = writeln!(
            out,
            "processes: {} combinational, {sync_count} synchronous",
            self.processes.len() - sync_count
        );
        for (_, d) in self.domains.iter() {
            let edge = match d.edge {
                Edge::Posedge => "posedge",
                Edge::Negedge => "negedge",
            };
            let reset = match (d.rst, d.reset_kind) {
                (None, _) => "no reset".to_string(),
                (Some(r), kind) => format!(
                    "{} reset '{}'",
                    if kind == ResetKind::Async { "async" } else { "sync" },
                    self.signals[r].path
                ),
            };
            let _ = writeln!(
                out,
                "domain {}: clock '{}' {edge}, {reset}",
                d.name, self.signals[d.clk].path
            );
        }
        out
    }
}

//! Combinational dependency graph.
//!
//! Nodes are live signals and combinational processes. An edge runs from each
//! signal to every process that reads it and from each process to every
//! signal it drives. Synchronous processes are left out: a register breaks
//! the combinational path.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use strata_ir::{Arena, Domain, DomainId, SignalId};

use crate::errors::ElabError;
use crate::flat::{FlatDomain, FlatSignal, Process, ProcessId, SignalRole};

/// A node of the [`DependencyGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DepNode {
    /// A live signal.
    Signal(SignalId),
    /// A combinational process.
    Process(ProcessId),
}

/// Which combinational processes must be re-evaluated when a signal changes.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    graph: DiGraph<DepNode, ()>,
    signal_nodes: HashMap<SignalId, NodeIndex>,
    readers: HashMap<SignalId, Vec<ProcessId>>,
    comb_order: Vec<ProcessId>,
    cycles: Vec<Vec<SignalId>>,
}

impl DependencyGraph {
    pub(crate) fn build(signals: &Arena<SignalId, FlatSignal>, processes: &[Process]) -> Self {
        let mut graph = DiGraph::new();
        let mut signal_nodes = HashMap::new();
        for (id, signal) in signals.iter() {
            if signal.is_live() {
                signal_nodes.insert(id, graph.add_node(DepNode::Signal(id)));
            }
        }

        let mut readers: HashMap<SignalId, Vec<ProcessId>> = HashMap::new();
        for (index, process) in processes.iter().enumerate() {
            if process.domain != Domain::Comb {
                continue;
            }
            let pid = ProcessId::from_raw(index as u32);
            let node = graph.add_node(DepNode::Process(pid));
            for id in &process.reads {
                if let Some(&sig) = signal_nodes.get(id) {
                    graph.add_edge(sig, node, ());
                }
                readers.entry(*id).or_default().push(pid);
            }
            for id in &process.drives {
                if let Some(&sig) = signal_nodes.get(id) {
                    graph.add_edge(node, sig, ());
                }
            }
        }

        // Tarjan yields strongly connected components in reverse topological
        // order.
        let mut comb_order = Vec::new();
        let mut cycles = Vec::new();
        for component in tarjan_scc(&graph).into_iter().rev() {
            let mut procs: Vec<ProcessId> = Vec::new();
            let mut sigs: Vec<SignalId> = Vec::new();
            for node in &component {
                match graph[*node] {
                    DepNode::Process(p) => procs.push(p),
                    DepNode::Signal(s) => sigs.push(s),
                }
            }
            procs.sort();
            comb_order.extend(procs);
            if component.len() > 1 {
                sigs.sort();
                let names: Vec<&str> = sigs.iter().map(|s| signals[*s].path.as_str()).collect();
                tracing::warn!(signals = ?names, "combinational loop");
                cycles.push(sigs);
            }
        }

        Self {
            graph,
            signal_nodes,
            readers,
            comb_order,
            cycles,
        }
    }

    /// Combinational processes that read `signal`, in declaration order.
    pub fn readers(&self, signal: SignalId) -> &[ProcessId] {
        self.readers.get(&signal).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every combinational process, ordered so that a process comes after
    /// the processes driving its inputs wherever the graph is acyclic.
    pub fn comb_order(&self) -> &[ProcessId] {
        &self.comb_order
    }

    /// Signal sets that form combinational loops.
    pub fn cycles(&self) -> &[Vec<SignalId>] {
        &self.cycles
    }

    /// Signals in the combinational fan-in cone of `signal`, excluding
    /// `signal` itself, in identity order.
    pub fn fan_in(&self, signal: SignalId) -> Vec<SignalId> {
        let Some(&start) = self.signal_nodes.get(&signal) else {
            return Vec::new();
        };
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut out = Vec::new();
        while let Some(node) = dfs.next(reversed) {
            if let DepNode::Signal(s) = self.graph[node] {
                if s != signal {
                    out.push(s);
                }
            }
        }
        out.sort();
        out
    }

    /// The underlying graph.
    pub fn graph(&self) -> &DiGraph<DepNode, ()> {
        &self.graph
    }
}

/// Rejects domains whose clock or reset depends, through combinational
/// logic or directly, on a register of the same domain.
pub(crate) fn check_domains(
    signals: &Arena<SignalId, FlatSignal>,
    domains: &Arena<DomainId, FlatDomain>,
    graph: &DependencyGraph,
) -> Result<(), ElabError> {
    for (id, domain) in domains.iter() {
        for (role, control) in [("clock", Some(domain.clk)), ("reset", domain.rst)] {
            let Some(control) = control else { continue };
            let mut cone = graph.fan_in(control);
            cone.insert(0, control);
            let offender = cone
                .into_iter()
                .find(|s| matches!(signals[*s].role, SignalRole::Sync { domain: d, .. } if d == id));
            if let Some(signal) = offender {
                return Err(ElabError::DomainSelfDependency {
                    domain: domain.name.clone(),
                    role,
                    signal: signals[signal].path.clone(),
                });
            }
        }
    }
    Ok(())
}

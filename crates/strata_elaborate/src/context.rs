//! Mutable state for the recursive flattening walk.
//!
//! [`FlattenContext`] copies the design's signal arena, renames signals by
//! hierarchical path, allocates fresh identities for repeated instances and
//! keeps the instance stack for recursion detection.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use strata_ir::{Arena, Design, Domain, FragmentId, PortDirection, SignalId, SrcLoc, Statement};

use crate::errors::ElabError;
use crate::flat::{FlatSignal, Process, SignalRole};

/// Signal renaming for one fragment instance.
type SignalMap = HashMap<SignalId, SignalId>;

/// A parent signal bound to an instance's input port. Only logic outside
/// the instance may drive it.
#[derive(Debug, Clone)]
pub(crate) struct BoundInput {
    pub(crate) actual: SignalId,
    pub(crate) port: String,
    /// Hierarchical path of the instance.
    pub(crate) scope: String,
    pub(crate) loc: SrcLoc,
    /// Indices of the processes flattened out of the instance's subtree.
    pub(crate) processes: Range<usize>,
}

pub(crate) struct FlattenContext<'d> {
    design: &'d Design,
    signals: Arena<SignalId, FlatSignal>,
    processes: Vec<Process>,
    bound_inputs: Vec<BoundInput>,
    /// Fragments on the current instantiation path.
    stack: Vec<FragmentId>,
    /// Fragments instantiated at least once.
    visited: HashSet<FragmentId>,
}

impl<'d> FlattenContext<'d> {
    pub(crate) fn new(design: &'d Design) -> Self {
        let mut signals = Arena::new();
        for decl in design.signals().values() {
            signals.alloc(FlatSignal {
                path: design.name(decl.name).to_string(),
                shape: decl.shape,
                reset: decl.reset.clone(),
                reset_less: decl.reset_less,
                loc: decl.loc.clone(),
                role: SignalRole::Input,
            });
        }
        Self {
            design,
            signals,
            processes: Vec::new(),
            bound_inputs: Vec::new(),
            stack: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Flattens `frag` and its subtree. `prefix` is prepended to every local
    /// signal name and `bound` maps the fragment's bound ports to parent
    /// signals.
    pub(crate) fn flatten(
        &mut self,
        frag: FragmentId,
        prefix: &str,
        bound: &SignalMap,
        loc: &SrcLoc,
    ) -> Result<(), ElabError> {
        let design = self.design;
        let def = design.fragment_def(frag);
        let scope = if prefix.is_empty() {
            design.name(def.name).to_string()
        } else {
            prefix.trim_end_matches('.').to_string()
        };
        if self.stack.contains(&frag) {
            return Err(ElabError::RecursiveInstance {
                fragment: design.name(def.name).to_string(),
                path: scope,
                loc: loc.clone(),
            });
        }
        self.stack.push(frag);
        let first = self.visited.insert(frag);

        let mut map = SignalMap::new();
        for &sig in &def.signals {
            let path = format!("{prefix}{}", design.signal_name(sig));
            let flat = match bound.get(&sig) {
                Some(&actual) => {
                    if first {
                        self.signals[sig].path = path;
                        self.signals[sig].role = SignalRole::Alias(actual);
                    }
                    actual
                }
                None if first => {
                    self.signals[sig].path = path;
                    sig
                }
                None => {
                    let mut copy = self.signals[sig].clone();
                    copy.path = path;
                    copy.role = SignalRole::Input;
                    self.signals.alloc(copy)
                }
            };
            map.insert(sig, flat);
        }

        for ds in &def.statements {
            let mut bad = None;
            let mut check = |id: SignalId| {
                if bad.is_none() && self.lookup(&map, id).is_none() {
                    bad = Some(id);
                }
            };
            ds.stmt.visit_reads(&mut check);
            ds.stmt.visit_targets(&mut |id, _| check(id));
            if let Some(id) = bad {
                return Err(self.foreign(id, &scope, ds.stmt.loc()));
            }
        }

        for domain in def.domains() {
            if let Domain::Sync(d) = domain {
                if design.domains().try_get(d).is_none() {
                    let loc = def
                        .statements
                        .iter()
                        .find(|s| s.domain == domain)
                        .map(|s| s.stmt.loc().clone())
                        .unwrap_or_else(SrcLoc::internal);
                    return Err(ElabError::UnknownDomain {
                        fragment: scope,
                        loc,
                    });
                }
            }
            let statements: Vec<Statement> = def
                .statements_in(domain)
                .map(|s| s.map_signals(&|id| self.lookup(&map, id).unwrap_or(id)))
                .collect();
            self.push_process(&scope, domain, statements);
        }

        for inst in &def.instances {
            let child = design.fragment_def(inst.fragment);
            let inst_path = format!("{prefix}{}", design.name(inst.name));
            let mut child_bound = SignalMap::new();
            let mut inputs = Vec::new();
            for binding in &inst.bindings {
                let Some(port) = child.port(binding.port) else {
                    return Err(ElabError::UnresolvedPort {
                        instance: inst_path,
                        port: design.signal_name(binding.port).to_string(),
                        fragment: design.name(child.name).to_string(),
                        loc: inst.loc.clone(),
                    });
                };
                let actual = self
                    .lookup(&map, binding.actual)
                    .ok_or_else(|| self.foreign(binding.actual, &scope, &inst.loc))?;
                let port_shape = design.signal_decl(binding.port).shape;
                let actual_shape = self.signals[actual].shape;
                if port_shape != actual_shape {
                    return Err(ElabError::PortShapeMismatch {
                        instance: inst_path,
                        port: design.signal_name(binding.port).to_string(),
                        port_shape,
                        actual: self.signals[actual].path.clone(),
                        actual_shape,
                        loc: inst.loc.clone(),
                    });
                }
                if port.direction == PortDirection::Input {
                    inputs.push((actual, design.name(port.name).to_string()));
                }
                child_bound.insert(binding.port, actual);
            }
            if let Some(port) = child
                .ports
                .iter()
                .find(|p| p.direction == PortDirection::Input && !child_bound.contains_key(&p.signal))
            {
                return Err(ElabError::UnboundInput {
                    instance: inst_path,
                    port: design.name(port.name).to_string(),
                    loc: inst.loc.clone(),
                });
            }
            let start = self.processes.len();
            self.flatten(inst.fragment, &format!("{inst_path}."), &child_bound, &inst.loc)?;
            let processes = start..self.processes.len();
            for (actual, port) in inputs {
                self.bound_inputs.push(BoundInput {
                    actual,
                    port,
                    scope: inst_path.clone(),
                    loc: inst.loc.clone(),
                    processes: processes.clone(),
                });
            }
        }

        self.stack.pop();
        Ok(())
    }

    /// Maps a signal referenced inside a fragment to its flat identity:
    /// owned signals through `map`, design-level signals to themselves.
    fn lookup(&self, map: &SignalMap, id: SignalId) -> Option<SignalId> {
        match map.get(&id) {
            Some(&flat) => Some(flat),
            None => {
                let decl = self.design.signals().try_get(id)?;
                decl.owner.is_none().then_some(id)
            }
        }
    }

    fn foreign(&self, id: SignalId, scope: &str, loc: &SrcLoc) -> ElabError {
        let signal = match self.design.signals().try_get(id) {
            Some(decl) => self.design.name(decl.name).to_string(),
            None => format!("#{}", id.as_raw()),
        };
        ElabError::ForeignSignal {
            signal,
            fragment: scope.to_string(),
            loc: loc.clone(),
        }
    }

    fn push_process(&mut self, scope: &str, domain: Domain, statements: Vec<Statement>) {
        let label = match domain {
            Domain::Comb => format!("comb logic of '{scope}'"),
            Domain::Sync(d) => {
                let name = self.design.name(self.design.domain(d).name);
                format!("domain '{name}' of '{scope}'")
            }
        };
        let mut drives = Vec::new();
        let mut reads = Vec::new();
        for stmt in &statements {
            stmt.visit_targets(&mut |id, _| {
                if !drives.contains(&id) {
                    drives.push(id);
                }
            });
            stmt.visit_reads(&mut |id| {
                if !reads.contains(&id) {
                    reads.push(id);
                }
            });
        }
        self.processes.push(Process {
            label,
            scope: scope.to_string(),
            domain,
            statements,
            drives,
            reads,
        });
    }

    /// Consumes the context. Signals of fragments that were never
    /// instantiated are marked unused.
    pub(crate) fn finish(mut self) -> (Arena<SignalId, FlatSignal>, Vec<Process>, Vec<BoundInput>) {
        for (id, decl) in self.design.signals().iter() {
            if let Some(owner) = decl.owner {
                if !self.visited.contains(&owner) {
                    self.signals[id].role = SignalRole::Unused;
                }
            }
        }
        (self.signals, self.processes, self.bound_inputs)
    }
}

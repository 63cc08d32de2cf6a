//! Fragments: module-like units of logic and their instances.

use crate::ids::{DomainId, FragmentId, SignalId};
use crate::loc::SrcLoc;
use crate::stmt::Statement;
use serde::{Deserialize, Serialize};
use strata_common::Ident;

/// The scope a statement executes in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Domain {
    /// Combinational logic, re-evaluated whenever an input changes.
    Comb,
    /// Synchronous logic, evaluated at the active edge of the domain's clock.
    Sync(DomainId),
}

/// A statement together with its governing domain.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DomainStatement {
    /// Governing domain.
    pub domain: Domain,
    /// The statement.
    pub stmt: Statement,
}

/// Direction of a fragment port.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortDirection {
    /// Driven by the parent.
    Input,
    /// Driven by the fragment.
    Output,
}

/// A signal exposed in a fragment's interface.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Port {
    /// Port name.
    pub name: Ident,
    /// Port direction.
    pub direction: PortDirection,
    /// The fragment-owned signal behind the port.
    pub signal: SignalId,
}

/// Connects a child port to a signal visible in the parent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port signal of the child fragment.
    pub port: SignalId,
    /// Parent signal the port is aliased to.
    pub actual: SignalId,
}

/// An instantiation of a fragment inside another.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name, used for hierarchical signal paths.
    pub name: Ident,
    /// The instantiated fragment.
    pub fragment: FragmentId,
    /// Port connections.
    pub bindings: Vec<PortBinding>,
    /// Where the instance was created.
    pub loc: SrcLoc,
}

/// A unit of hardware: the signals it owns, its logic and its sub-instances.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Fragment {
    /// Fragment name.
    pub name: Ident,
    /// Signals declared by this fragment.
    pub signals: Vec<SignalId>,
    /// Interface.
    pub ports: Vec<Port>,
    /// Logic in declaration order.
    pub statements: Vec<DomainStatement>,
    /// Sub-instances in declaration order.
    pub instances: Vec<Instance>,
    /// Where the fragment was created.
    pub loc: SrcLoc,
}

impl Fragment {
    /// Returns the port backed by `signal`.
    pub fn port(&self, signal: SignalId) -> Option<&Port> {
        self.ports.iter().find(|p| p.signal == signal)
    }

    /// Statements of one domain, in order.
    pub fn statements_in(&self, domain: Domain) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(move |s| s.domain == domain)
            .map(|s| &s.stmt)
    }

    /// Distinct domains used by this fragment's statements, in first-use
    /// order.
    pub fn domains(&self) -> Vec<Domain> {
        let mut out = Vec::new();
        for s in &self.statements {
            if !out.contains(&s.domain) {
                out.push(s.domain);
            }
        }
        out
    }
}

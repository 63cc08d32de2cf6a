//! The design context: every signal, fragment and clock domain of one
//! circuit, plus the builder methods that populate them.

use crate::arena::Arena;
use crate::domain::{ClockDomain, DomainOptions, ResetPolarity};
use crate::error::IrError;
use crate::fragment::{Domain, DomainStatement, Fragment, Instance, Port, PortBinding, PortDirection};
use crate::ids::{DomainId, FragmentId, SignalId};
use crate::loc::SrcLoc;
use crate::shape::Shape;
use crate::signal::{Signal, SignalDecl, SignalOptions};
use crate::stmt::Statement;
use serde::{Deserialize, Serialize};
use strata_common::{Bits, Ident, Interner};

/// A circuit under construction.
///
/// A `Design` is an explicit context object: clock domains and names are
/// scoped to it, so any number of designs can be built and simulated in one
/// process without interfering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    interner: Interner,
    signals: Arena<SignalId, SignalDecl>,
    fragments: Arena<FragmentId, Fragment>,
    domains: Arena<DomainId, ClockDomain>,
    top: Option<FragmentId>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a name.
    pub fn intern(&self, name: &str) -> Ident {
        self.interner.get_or_intern(name)
    }

    /// Resolves an interned name.
    pub fn name(&self, ident: Ident) -> &str {
        self.interner.resolve(ident)
    }

    /// The design's interner.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Creates an empty fragment.
    #[track_caller]
    pub fn fragment(&mut self, name: &str) -> FragmentId {
        let fragment = Fragment {
            name: self.intern(name),
            signals: Vec::new(),
            ports: Vec::new(),
            statements: Vec::new(),
            instances: Vec::new(),
            loc: SrcLoc::caller(),
        };
        self.fragments.alloc(fragment)
    }

    /// Declares a signal owned by `frag` with a zero reset value.
    #[track_caller]
    pub fn signal(&mut self, frag: FragmentId, name: &str, shape: impl Into<Shape>) -> Signal {
        self.signal_with(frag, name, shape, SignalOptions::default())
    }

    /// Declares a signal owned by `frag`.
    #[track_caller]
    pub fn signal_with(
        &mut self,
        frag: FragmentId,
        name: &str,
        shape: impl Into<Shape>,
        options: SignalOptions,
    ) -> Signal {
        let signal = self.declare(Some(frag), name, shape.into(), &options, SrcLoc::caller());
        self.fragments[frag].signals.push(signal.id);
        signal
    }

    /// Declares a design-level signal that any fragment may reference
    /// without a port, such as a clock or reset.
    #[track_caller]
    pub fn global_signal(&mut self, name: &str, shape: impl Into<Shape>) -> Signal {
        self.global_signal_with(name, shape, SignalOptions::default())
    }

    /// Declares a design-level signal with options.
    #[track_caller]
    pub fn global_signal_with(&mut self, name: &str, shape: impl Into<Shape>, options: SignalOptions) -> Signal {
        self.declare(None, name, shape.into(), &options, SrcLoc::caller())
    }

    /// Declares a signal in `frag` with the shape, reset value and reset
    /// behaviour of `other`.
    #[track_caller]
    pub fn signal_like(&mut self, frag: FragmentId, other: Signal, name: &str) -> Signal {
        let decl = &self.signals[other.id];
        let mut options = SignalOptions::new().reset_bits(decl.reset.clone());
        if decl.reset_less {
            options = options.reset_less();
        }
        self.signal_with(frag, name, other.shape, options)
    }

    fn declare(
        &mut self,
        owner: Option<FragmentId>,
        name: &str,
        shape: Shape,
        options: &SignalOptions,
        loc: SrcLoc,
    ) -> Signal {
        let decl = SignalDecl {
            name: self.intern(name),
            shape,
            reset: options.reset_value(name, shape),
            reset_less: options.is_reset_less(),
            owner,
            loc,
        };
        Signal {
            id: self.signals.alloc(decl),
            shape,
        }
    }

    /// Declares an input port of `frag`.
    #[track_caller]
    pub fn input(&mut self, frag: FragmentId, name: &str, shape: impl Into<Shape>) -> Signal {
        let signal = self.signal(frag, name, shape);
        self.add_port(frag, signal, PortDirection::Input);
        signal
    }

    /// Declares an output port of `frag`.
    #[track_caller]
    pub fn output(&mut self, frag: FragmentId, name: &str, shape: impl Into<Shape>) -> Signal {
        self.output_with(frag, name, shape, SignalOptions::default())
    }

    /// Declares an output port of `frag` with options.
    #[track_caller]
    pub fn output_with(
        &mut self,
        frag: FragmentId,
        name: &str,
        shape: impl Into<Shape>,
        options: SignalOptions,
    ) -> Signal {
        let signal = self.signal_with(frag, name, shape, options);
        self.add_port(frag, signal, PortDirection::Output);
        signal
    }

    /// Exposes an existing signal of `frag` as a port named after it.
    pub fn add_port(&mut self, frag: FragmentId, signal: Signal, direction: PortDirection) {
        let name = self.signals[signal.id].name;
        self.fragments[frag].ports.push(Port {
            name,
            direction,
            signal: signal.id,
        });
    }

    /// Adds combinational logic to `frag`.
    pub fn comb(&mut self, frag: FragmentId, stmt: Statement) {
        self.add_statement(frag, Domain::Comb, stmt);
    }

    /// Adds logic clocked by `domain` to `frag`.
    pub fn sync(&mut self, frag: FragmentId, domain: DomainId, stmt: Statement) {
        self.add_statement(frag, Domain::Sync(domain), stmt);
    }

    /// Adds a statement in an explicit domain.
    pub fn add_statement(&mut self, frag: FragmentId, domain: Domain, stmt: Statement) {
        self.fragments[frag]
            .statements
            .push(DomainStatement { domain, stmt });
    }

    /// Instantiates `child` inside `parent`, binding `(child port, parent
    /// signal)` pairs.
    #[track_caller]
    pub fn instance(
        &mut self,
        parent: FragmentId,
        name: &str,
        child: FragmentId,
        bindings: impl IntoIterator<Item = (Signal, Signal)>,
    ) -> Result<(), IrError> {
        let loc = SrcLoc::caller();
        let mut resolved = Vec::new();
        for (port, actual) in bindings {
            if self.fragments[child].port(port.id).is_none() {
                return Err(IrError::NotAPort {
                    instance: name.to_string(),
                    port: self.signal_name(port.id).to_string(),
                    fragment: self.name(self.fragments[child].name).to_string(),
                });
            }
            resolved.push(PortBinding {
                port: port.id,
                actual: actual.id,
            });
        }
        let instance = Instance {
            name: self.intern(name),
            fragment: child,
            bindings: resolved,
            loc,
        };
        self.fragments[parent].instances.push(instance);
        Ok(())
    }

    /// Creates a clock domain with fresh clock and reset signals. The
    /// domain `"sync"` uses the names `clk` and `rst`; any other domain
    /// prefixes them with its own name.
    #[track_caller]
    pub fn add_domain(&mut self, name: &str, options: DomainOptions) -> Result<DomainId, IrError> {
        let (clk_name, rst_name) = if name == "sync" {
            ("clk".to_string(), "rst".to_string())
        } else {
            (format!("{name}_clk"), format!("{name}_rst"))
        };
        let clk = self.global_signal(&clk_name, Shape::unsigned(1));
        let rst = if options.reset_less {
            None
        } else {
            // Idle at the deasserted level.
            let idle = options.polarity == ResetPolarity::ActiveLow;
            let reset = SignalOptions::new().reset_bits(Bits::from_bool(idle));
            Some(self.global_signal_with(&rst_name, Shape::unsigned(1), reset))
        };
        self.add_domain_with(name, clk, rst, options)
    }

    /// Creates a clock domain from existing 1-bit signals.
    #[track_caller]
    pub fn add_domain_with(
        &mut self,
        name: &str,
        clk: Signal,
        rst: Option<Signal>,
        options: DomainOptions,
    ) -> Result<DomainId, IrError> {
        if self.domain_by_name(name).is_some() {
            return Err(IrError::DuplicateDomain {
                name: name.to_string(),
            });
        }
        for (role, signal) in [("clock", Some(clk)), ("reset", rst)] {
            if let Some(s) = signal.filter(|s| s.width() != 1) {
                return Err(IrError::ControlNotOneBit {
                    domain: name.to_string(),
                    role,
                    signal: self.signal_name(s.id).to_string(),
                    width: s.width(),
                });
            }
        }
        let domain = ClockDomain {
            name: self.intern(name),
            clk: clk.id,
            rst: if options.reset_less { None } else { rst.map(|s| s.id) },
            edge: options.edge,
            polarity: options.polarity,
            reset_kind: options.reset_kind,
            loc: SrcLoc::caller(),
        };
        Ok(self.domains.alloc(domain))
    }

    /// Looks up a clock domain by name.
    pub fn domain_by_name(&self, name: &str) -> Option<DomainId> {
        let ident = self.interner.get(name)?;
        self.domains.iter().find(|(_, d)| d.name == ident).map(|(id, _)| id)
    }

    /// The clock signal of `domain`.
    pub fn clock_signal(&self, domain: DomainId) -> Signal {
        self.handle(self.domains[domain].clk)
    }

    /// The reset signal of `domain`, if it has one.
    pub fn reset_signal(&self, domain: DomainId) -> Option<Signal> {
        self.domains[domain].rst.map(|id| self.handle(id))
    }

    /// Marks `frag` as the root of the hierarchy.
    pub fn set_top(&mut self, frag: FragmentId) {
        self.top = Some(frag);
    }

    /// The root fragment, if set.
    pub fn top(&self) -> Option<FragmentId> {
        self.top
    }

    /// Returns a builder handle for a declared signal.
    pub fn handle(&self, id: SignalId) -> Signal {
        Signal {
            id,
            shape: self.signals[id].shape,
        }
    }

    /// The declaration of a signal.
    pub fn signal_decl(&self, id: SignalId) -> &SignalDecl {
        &self.signals[id]
    }

    /// The name of a signal.
    pub fn signal_name(&self, id: SignalId) -> &str {
        self.name(self.signals[id].name)
    }

    /// The definition of a fragment.
    pub fn fragment_def(&self, id: FragmentId) -> &Fragment {
        &self.fragments[id]
    }

    /// A clock domain.
    pub fn domain(&self, id: DomainId) -> &ClockDomain {
        &self.domains[id]
    }

    /// All signal declarations.
    pub fn signals(&self) -> &Arena<SignalId, SignalDecl> {
        &self.signals
    }

    /// All fragments.
    pub fn fragments(&self) -> &Arena<FragmentId, Fragment> {
        &self.fragments
    }

    /// All clock domains.
    pub fn domains(&self) -> &Arena<DomainId, ClockDomain> {
        &self.domains
    }
}

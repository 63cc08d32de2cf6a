//! Assignments and switch trees.
//!
//! A statement list describes logic for one scope: combinational, where the
//! final assignment to a signal wins and unassigned signals fall back to their
//! reset value, or synchronous, where assignments take effect at the clock
//! edge of the governing domain.

use crate::error::IrError;
use crate::ids::SignalId;
use crate::loc::SrcLoc;
use crate::pattern::{MaskedPattern, Pattern};
use crate::signal::Signal;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// The left-hand side of an assignment.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Target {
    /// A whole signal.
    Signal(Signal),
    /// Bits `start..end` of a signal.
    Slice {
        /// Assigned signal.
        signal: Signal,
        /// First bit (inclusive).
        start: u32,
        /// Last bit (exclusive).
        end: u32,
    },
    /// Several targets assigned from consecutive bit ranges of one value; the
    /// first target receives the least significant bits.
    Concat(Vec<Target>),
}

impl Target {
    /// Bits `start..end` of `signal` as an assignment target.
    pub fn slice(signal: Signal, start: u32, end: u32) -> Result<Target, IrError> {
        if start > end || end > signal.width() {
            return Err(IrError::SliceOutOfRange {
                start: start as i64,
                end: end as i64,
                width: signal.width(),
            });
        }
        Ok(Target::Slice { signal, start, end })
    }

    /// Concatenation of targets, first in the least significant bits.
    pub fn cat<T: Into<Target>>(parts: impl IntoIterator<Item = T>) -> Target {
        Target::Concat(parts.into_iter().map(Into::into).collect())
    }

    /// Number of bits written.
    pub fn width(&self) -> u32 {
        match self {
            Target::Signal(s) => s.width(),
            Target::Slice { start, end, .. } => end - start,
            Target::Concat(parts) => parts.iter().map(Target::width).sum(),
        }
    }

    /// Calls `f` for every written signal.
    pub fn visit_signals(&self, f: &mut impl FnMut(SignalId)) {
        match self {
            Target::Signal(s) | Target::Slice { signal: s, .. } => f(s.id),
            Target::Concat(parts) => parts.iter().for_each(|p| p.visit_signals(f)),
        }
    }

    /// Rebuilds the target with every signal passed through `f`.
    pub fn map_signals(&self, f: &impl Fn(SignalId) -> SignalId) -> Target {
        let remap = |s: &Signal| Signal {
            id: f(s.id),
            shape: s.shape,
        };
        match self {
            Target::Signal(s) => Target::Signal(remap(s)),
            Target::Slice { signal, start, end } => Target::Slice {
                signal: remap(signal),
                start: *start,
                end: *end,
            },
            Target::Concat(parts) => Target::Concat(parts.iter().map(|p| p.map_signals(f)).collect()),
        }
    }
}

impl From<Signal> for Target {
    fn from(signal: Signal) -> Self {
        Target::Signal(signal)
    }
}

/// One arm of a switch.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Case {
    /// The arm is taken if the selector matches any pattern. An empty list
    /// never matches.
    pub patterns: Vec<MaskedPattern>,
    /// Statements executed when the arm is taken.
    pub body: Vec<Statement>,
}

/// A statement.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Statement {
    /// `target <- value`. The value is truncated or extended, according to
    /// its own signedness, to the target width.
    Assign {
        /// Assigned bits.
        target: Target,
        /// Assigned value.
        value: Value,
        /// Builder call site.
        loc: SrcLoc,
    },
    /// Runs the body of the first case whose pattern matches the selector,
    /// or `default` if none does.
    Switch {
        /// Value compared against each case.
        selector: Value,
        /// Cases in priority order.
        cases: Vec<Case>,
        /// Taken when no case matches.
        default: Option<Vec<Statement>>,
        /// Builder call site.
        loc: SrcLoc,
    },
}

impl Statement {
    /// `target <- value`.
    #[track_caller]
    pub fn assign(target: impl Into<Target>, value: impl Into<Value>) -> Statement {
        Statement::Assign {
            target: target.into(),
            value: value.into(),
            loc: SrcLoc::caller(),
        }
    }

    /// Starts a switch on `selector`.
    #[track_caller]
    pub fn switch(selector: impl Into<Value>) -> SwitchBuilder {
        SwitchBuilder {
            selector: selector.into(),
            cases: Vec::new(),
            default: None,
            loc: SrcLoc::caller(),
        }
    }

    /// Runs `then` when `cond` is non-zero.
    #[track_caller]
    pub fn when(cond: impl Into<Value>, then: Vec<Statement>) -> Statement {
        Self::if_else(cond, then, Vec::new())
    }

    /// Runs `then` when `cond` is non-zero and `otherwise` when it is zero.
    #[track_caller]
    pub fn if_else(cond: impl Into<Value>, then: Vec<Statement>, otherwise: Vec<Statement>) -> Statement {
        let selector = cond.into().bool();
        let one = MaskedPattern {
            mask: strata_common::Bits::all_one(1),
            value: strata_common::Bits::all_one(1),
        };
        Statement::Switch {
            selector,
            cases: vec![Case {
                patterns: vec![one],
                body: then,
            }],
            default: (!otherwise.is_empty()).then_some(otherwise),
            loc: SrcLoc::caller(),
        }
    }

    /// Where the statement was built.
    pub fn loc(&self) -> &SrcLoc {
        match self {
            Statement::Assign { loc, .. } | Statement::Switch { loc, .. } => loc,
        }
    }

    /// Calls `f` with every signal this statement may assign, together with
    /// the location of the assigning statement.
    pub fn visit_targets(&self, f: &mut impl FnMut(SignalId, &SrcLoc)) {
        match self {
            Statement::Assign { target, loc, .. } => target.visit_signals(&mut |id| f(id, loc)),
            Statement::Switch { cases, default, .. } => {
                for stmt in cases.iter().flat_map(|c| &c.body).chain(default.iter().flatten()) {
                    stmt.visit_targets(f);
                }
            }
        }
    }

    /// Calls `f` with every signal this statement reads.
    pub fn visit_reads(&self, f: &mut impl FnMut(SignalId)) {
        match self {
            Statement::Assign { value, .. } => value.visit_signals(f),
            Statement::Switch {
                selector,
                cases,
                default,
                ..
            } => {
                selector.visit_signals(f);
                for stmt in cases.iter().flat_map(|c| &c.body).chain(default.iter().flatten()) {
                    stmt.visit_reads(f);
                }
            }
        }
    }

    /// Rebuilds the statement with every signal passed through `f`.
    pub fn map_signals(&self, f: &impl Fn(SignalId) -> SignalId) -> Statement {
        let map_body = |body: &Vec<Statement>| body.iter().map(|s| s.map_signals(f)).collect();
        match self {
            Statement::Assign { target, value, loc } => Statement::Assign {
                target: target.map_signals(f),
                value: value.map_signals(f),
                loc: loc.clone(),
            },
            Statement::Switch {
                selector,
                cases,
                default,
                loc,
            } => Statement::Switch {
                selector: selector.map_signals(f),
                cases: cases
                    .iter()
                    .map(|c| Case {
                        patterns: c.patterns.clone(),
                        body: map_body(&c.body),
                    })
                    .collect(),
                default: default.as_ref().map(map_body),
                loc: loc.clone(),
            },
        }
    }
}

/// Incrementally builds a [`Statement::Switch`].
#[derive(Debug)]
pub struct SwitchBuilder {
    selector: Value,
    cases: Vec<Case>,
    default: Option<Vec<Statement>>,
    loc: SrcLoc,
}

impl SwitchBuilder {
    /// Adds a case taken when the selector matches any of `patterns`.
    /// Integer patterns the selector can never hold are dropped.
    pub fn case<P: Into<Pattern>>(
        mut self,
        patterns: impl IntoIterator<Item = P>,
        body: Vec<Statement>,
    ) -> Result<Self, IrError> {
        let mut resolved = Vec::new();
        for p in patterns {
            if let Some(masked) = p.into().resolve(self.selector.shape())? {
                resolved.push(masked);
            }
        }
        self.cases.push(Case {
            patterns: resolved,
            body,
        });
        Ok(self)
    }

    /// Sets the statements run when no case matches.
    pub fn default(mut self, body: Vec<Statement>) -> Self {
        self.default = Some(body);
        self
    }

    /// Finishes the switch.
    pub fn build(self) -> Statement {
        Statement::Switch {
            selector: self.selector,
            cases: self.cases,
            default: self.default,
            loc: self.loc,
        }
    }
}

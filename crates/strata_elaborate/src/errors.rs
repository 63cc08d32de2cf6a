//! Elaboration errors.
//!
//! Codes `E300`--`E308` identify each failure so tooling can match on them
//! without parsing messages. Every variant names the offending signal or
//! instance and the builder location that introduced it.

use strata_ir::{Shape, SrcLoc};
use thiserror::Error;

/// A fatal problem found while flattening and checking a design.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElabError {
    /// The design has no top fragment.
    #[error("design has no top fragment")]
    NoTop,

    /// A fragment instantiates itself, directly or through its children.
    #[error("fragment '{fragment}' instantiates itself at '{path}' ({loc})")]
    RecursiveInstance {
        /// Fragment name.
        fragment: String,
        /// Hierarchical path of the offending instance.
        path: String,
        /// Instance location.
        loc: SrcLoc,
    },

    /// A statement or binding refers to a signal owned by another fragment.
    #[error("signal '{signal}' is owned by another fragment and cannot be used in '{fragment}' without a port ({loc})")]
    ForeignSignal {
        /// Signal name.
        signal: String,
        /// Fragment that used it.
        fragment: String,
        /// Location of the use.
        loc: SrcLoc,
    },

    /// An instance binds a signal that is not a port of the child.
    #[error("instance '{instance}' binds '{port}', which is not a port of '{fragment}' ({loc})")]
    UnresolvedPort {
        /// Instance path.
        instance: String,
        /// Bound signal.
        port: String,
        /// Child fragment.
        fragment: String,
        /// Instance location.
        loc: SrcLoc,
    },

    /// An input port of an instance is left unconnected.
    #[error("input port '{port}' of instance '{instance}' is not bound ({loc})")]
    UnboundInput {
        /// Instance path.
        instance: String,
        /// Port name.
        port: String,
        /// Instance location.
        loc: SrcLoc,
    },

    /// A port is bound to a signal of a different shape.
    #[error("instance '{instance}': port '{port}' is {port_shape} but is bound to '{actual}' which is {actual_shape} ({loc})")]
    PortShapeMismatch {
        /// Instance path.
        instance: String,
        /// Port name.
        port: String,
        /// Port shape.
        port_shape: Shape,
        /// Bound parent signal.
        actual: String,
        /// Its shape.
        actual_shape: Shape,
        /// Instance location.
        loc: SrcLoc,
    },

    /// A synchronous statement names a domain the design does not define.
    #[error("fragment '{fragment}' uses an undefined clock domain ({loc})")]
    UnknownDomain {
        /// Fragment path.
        fragment: String,
        /// Statement location.
        loc: SrcLoc,
    },

    /// A signal is driven from more than one scope.
    #[error("signal '{signal}' is driven by both {first_scope} ({first_loc}) and {second_scope} ({second_loc})")]
    MultipleDrivers {
        /// Signal path.
        signal: String,
        /// First driving scope.
        first_scope: String,
        /// Location of the first driving statement.
        first_loc: SrcLoc,
        /// Second driving scope.
        second_scope: String,
        /// Location of the second driving statement.
        second_loc: SrcLoc,
    },

    /// A domain's clock or reset depends combinationally on a register of
    /// the same domain.
    #[error("{role} of domain '{domain}' depends on '{signal}', which is registered in that domain")]
    DomainSelfDependency {
        /// Domain name.
        domain: String,
        /// `"clock"` or `"reset"`.
        role: &'static str,
        /// Register in the fan-in.
        signal: String,
    },
}

impl ElabError {
    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            ElabError::NoTop => "E300",
            ElabError::RecursiveInstance { .. } => "E301",
            ElabError::ForeignSignal { .. } => "E302",
            ElabError::UnresolvedPort { .. } => "E303",
            ElabError::UnboundInput { .. } => "E304",
            ElabError::PortShapeMismatch { .. } => "E305",
            ElabError::UnknownDomain { .. } => "E306",
            ElabError::MultipleDrivers { .. } => "E307",
            ElabError::DomainSelfDependency { .. } => "E308",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let loc = SrcLoc::internal();
        let errors = [
            ElabError::NoTop,
            ElabError::UnknownDomain {
                fragment: "top".into(),
                loc: loc.clone(),
            },
            ElabError::DomainSelfDependency {
                domain: "sync".into(),
                role: "clock",
                signal: "q".into(),
            },
        ];
        let codes: Vec<_> = errors.iter().map(ElabError::code).collect();
        assert_eq!(codes, vec!["E300", "E306", "E308"]);
    }

    #[test]
    fn multiple_driver_message_names_both_sites() {
        let e = ElabError::MultipleDrivers {
            signal: "x".into(),
            first_scope: "comb logic of 'top'".into(),
            first_loc: SrcLoc {
                file: "a.rs".into(),
                line: 1,
                column: 1,
            },
            second_scope: "domain 'sync' of 'top'".into(),
            second_loc: SrcLoc {
                file: "a.rs".into(),
                line: 2,
                column: 5,
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("'x'"));
        assert!(msg.contains("a.rs:1:1"));
        assert!(msg.contains("a.rs:2:5"));
    }
}

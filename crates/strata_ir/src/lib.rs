//! Hardware intermediate representation for the Strata toolkit.
//!
//! A circuit is a [`Design`]: an arena of [`Fragment`]s holding statements
//! over [`Value`] expression trees, the [`Signal`]s they read and drive, and
//! the [`ClockDomain`]s that clock synchronous logic. The simulator and the
//! netlist backend both consume the same design read-only after elaboration.

#![warn(missing_docs)]

pub mod arena;
pub mod design;
pub mod domain;
pub mod error;
pub mod fragment;
pub mod ids;
pub mod loc;
pub mod pattern;
pub mod shape;
pub mod signal;
pub mod stmt;
pub mod value;

pub use arena::{Arena, ArenaId};
pub use design::Design;
pub use domain::{ClockDomain, DomainOptions, Edge, ResetKind, ResetPolarity};
pub use error::IrError;
pub use fragment::{Domain, DomainStatement, Fragment, Instance, Port, PortBinding, PortDirection};
pub use ids::{DomainId, FragmentId, SignalId};
pub use loc::SrcLoc;
pub use pattern::{MaskedPattern, Pattern};
pub use shape::Shape;
pub use signal::{Signal, SignalDecl, SignalOptions};
pub use stmt::{Case, Statement, SwitchBuilder, Target};
pub use value::{BinaryOp, UnaryOp, Value, ValueKind};

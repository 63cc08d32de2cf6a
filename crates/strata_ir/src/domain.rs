//! Clock domains: a clock and an optional reset that govern registers.

use crate::ids::SignalId;
use crate::loc::SrcLoc;
use serde::{Deserialize, Serialize};
use strata_common::Ident;

/// Clock transition on which a domain's registers update.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Edge {
    /// 0 to 1.
    #[default]
    Posedge,
    /// 1 to 0.
    Negedge,
}

/// Reset level that counts as asserted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum ResetPolarity {
    /// Asserted when 1.
    #[default]
    ActiveHigh,
    /// Asserted when 0.
    ActiveLow,
}

impl ResetPolarity {
    /// Returns `true` if a reset signal at `level` is asserted.
    pub fn is_asserted(self, level: bool) -> bool {
        match self {
            ResetPolarity::ActiveHigh => level,
            ResetPolarity::ActiveLow => !level,
        }
    }
}

/// When an asserted reset takes effect.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum ResetKind {
    /// At the next active clock edge.
    #[default]
    Sync,
    /// Immediately, and for as long as the reset stays asserted.
    Async,
}

/// A named clock and reset pair.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ClockDomain {
    /// Domain name, unique in the design.
    pub name: Ident,
    /// 1-bit clock signal.
    pub clk: SignalId,
    /// 1-bit reset signal, if the domain is resettable.
    pub rst: Option<SignalId>,
    /// Active clock edge.
    pub edge: Edge,
    /// Reset polarity.
    pub polarity: ResetPolarity,
    /// Reset timing relative to the clock.
    pub reset_kind: ResetKind,
    /// Where the domain was declared.
    pub loc: SrcLoc,
}

/// Options for a new clock domain. Defaults: rising edge, active-high
/// synchronous reset.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomainOptions {
    pub(crate) edge: Edge,
    pub(crate) polarity: ResetPolarity,
    pub(crate) reset_kind: ResetKind,
    pub(crate) reset_less: bool,
}

impl DomainOptions {
    /// Starts from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clocks registers on the falling edge.
    pub fn negedge(mut self) -> Self {
        self.edge = Edge::Negedge;
        self
    }

    /// Makes the reset active-low.
    pub fn active_low(mut self) -> Self {
        self.polarity = ResetPolarity::ActiveLow;
        self
    }

    /// Makes the reset asynchronous.
    pub fn async_reset(mut self) -> Self {
        self.reset_kind = ResetKind::Async;
        self
    }

    /// Creates the domain without a reset signal.
    pub fn reset_less(mut self) -> Self {
        self.reset_less = true;
        self
    }
}

//! Signal declarations and the lightweight handles used to build logic.

use crate::ids::{FragmentId, SignalId};
use crate::loc::SrcLoc;
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use strata_common::{Bits, Ident};

/// A signal as declared in a design.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignalDecl {
    /// Local name (hierarchical path after elaboration).
    pub name: Ident,
    /// Width and signedness.
    pub shape: Shape,
    /// Value loaded on reset; also the idle value of a combinational signal
    /// that no statement assigns.
    pub reset: Bits,
    /// If set, domain resets leave this register untouched.
    pub reset_less: bool,
    /// Fragment that owns the signal, or `None` for design-level signals
    /// such as clocks that any fragment may reference.
    pub owner: Option<FragmentId>,
    /// Where the signal was declared.
    pub loc: SrcLoc,
}

/// A copyable reference to a declared signal, carrying its shape so values
/// can be built without consulting the design.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Signal {
    /// Identity of the signal.
    pub id: SignalId,
    /// Shape of the signal.
    pub shape: Shape,
}

impl Signal {
    /// Number of bits.
    pub fn width(self) -> u32 {
        self.shape.width
    }
}

#[derive(Clone, Debug, Default)]
enum ResetSpec {
    #[default]
    Zero,
    Int(i64),
    Bits(Bits),
}

/// Optional properties of a new signal.
#[derive(Clone, Debug, Default)]
pub struct SignalOptions {
    reset: ResetSpec,
    reset_less: bool,
}

impl SignalOptions {
    /// Starts from the defaults: reset value zero, resettable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reset value from an integer.
    pub fn reset(mut self, value: i64) -> Self {
        self.reset = ResetSpec::Int(value);
        self
    }

    /// Sets the reset value from a bit pattern.
    pub fn reset_bits(mut self, value: Bits) -> Self {
        self.reset = ResetSpec::Bits(value);
        self
    }

    /// Excludes the signal from domain resets.
    pub fn reset_less(mut self) -> Self {
        self.reset_less = true;
        self
    }

    pub(crate) fn is_reset_less(&self) -> bool {
        self.reset_less
    }

    /// Resolves the reset value for `shape`, truncating values that do not
    /// fit.
    pub(crate) fn reset_value(&self, name: &str, shape: Shape) -> Bits {
        match &self.reset {
            ResetSpec::Zero => Bits::new(shape.width),
            ResetSpec::Int(v) => {
                if !shape.fits(*v as i128) {
                    tracing::warn!(
                        signal = name,
                        reset = v,
                        %shape,
                        "reset value does not fit the signal and is truncated"
                    );
                }
                Bits::from_i64(*v, shape.width)
            }
            ResetSpec::Bits(b) => {
                if b.width() > shape.width {
                    tracing::warn!(
                        signal = name,
                        %shape,
                        "reset value is wider than the signal and is truncated"
                    );
                }
                b.resize(shape.width, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reset_is_zero() {
        let opts = SignalOptions::new();
        assert_eq!(opts.reset_value("a", Shape::unsigned(4)), Bits::new(4));
        assert!(!opts.is_reset_less());
    }

    #[test]
    fn negative_reset_on_signed_signal() {
        let opts = SignalOptions::new().reset(-2);
        let v = opts.reset_value("a", Shape::signed(4));
        assert_eq!(v.to_i64(), Some(-2));
    }

    #[test]
    fn oversized_reset_truncates() {
        let opts = SignalOptions::new().reset(0x1ff);
        assert_eq!(opts.reset_value("a", Shape::unsigned(8)).to_u64(), Some(0xff));
    }

    #[test]
    fn bit_reset_resizes() {
        let opts = SignalOptions::new().reset_bits(Bits::from_u64(0b11, 2)).reset_less();
        assert_eq!(opts.reset_value("a", Shape::unsigned(4)).to_u64(), Some(0b0011));
        assert!(opts.is_reset_less());
    }
}

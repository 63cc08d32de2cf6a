//! Conversions used by the poke and peek operations.
//!
//! Testbench code names signals either by the builder handle it got from the
//! design ([`Signal`]) or by a flat identity found with `find_signal`
//! ([`SignalId`]), and writes values as integers, booleans or raw [`Bits`].

use strata_common::Bits;
use strata_ir::{Shape, Signal, SignalId};

/// Anything that identifies a signal of the simulated design.
pub trait SignalRef {
    /// The identity to look up.
    fn signal_id(&self) -> SignalId;
}

impl SignalRef for SignalId {
    fn signal_id(&self) -> SignalId {
        *self
    }
}

impl SignalRef for Signal {
    fn signal_id(&self) -> SignalId {
        self.id
    }
}

impl<T: SignalRef + ?Sized> SignalRef for &T {
    fn signal_id(&self) -> SignalId {
        (**self).signal_id()
    }
}

/// A value that can be written to a signal of a given shape.
///
/// Integers wrap to the signal width. [`Bits`] must already have the exact
/// width; this is checked by the simulator.
pub trait PokeValue {
    /// Converts to a bit pattern for a signal of `shape`.
    fn into_bits(self, shape: Shape) -> Bits;
}

impl PokeValue for Bits {
    fn into_bits(self, _shape: Shape) -> Bits {
        self
    }
}

impl PokeValue for &Bits {
    fn into_bits(self, _shape: Shape) -> Bits {
        self.clone()
    }
}

impl PokeValue for bool {
    fn into_bits(self, shape: Shape) -> Bits {
        Bits::from_u64(self as u64, shape.width)
    }
}

impl PokeValue for u64 {
    fn into_bits(self, shape: Shape) -> Bits {
        Bits::from_u64(self, shape.width)
    }
}

impl PokeValue for u32 {
    fn into_bits(self, shape: Shape) -> Bits {
        Bits::from_u64(self as u64, shape.width)
    }
}

impl PokeValue for i64 {
    fn into_bits(self, shape: Shape) -> Bits {
        Bits::from_i64(self, shape.width)
    }
}

impl PokeValue for i32 {
    fn into_bits(self, shape: Shape) -> Bits {
        Bits::from_i64(self as i64, shape.width)
    }
}

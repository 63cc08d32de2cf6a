//! Bit width and signedness of values, and the promotion rules that derive
//! an operator's result shape from its operands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and signedness of a value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Shape {
    /// Number of bits.
    pub width: u32,
    /// Whether the bits are interpreted as two's complement.
    pub signed: bool,
}

/// Number of bits needed to represent `n`, including a sign bit when `n` is
/// negative or `require_sign` is set.
pub fn bits_for(n: i128, require_sign: bool) -> u32 {
    let bit_length = |v: i128| 128 - v.leading_zeros();
    match n {
        0 => 1,
        n if n > 0 => bit_length(n) + require_sign as u32,
        n => bit_length(-(n + 1)) + 1,
    }
}

impl Shape {
    /// An unsigned shape.
    pub const fn unsigned(width: u32) -> Self {
        Self {
            width,
            signed: false,
        }
    }

    /// A signed shape.
    pub const fn signed(width: u32) -> Self {
        Self {
            width,
            signed: true,
        }
    }

    /// The smallest shape that holds every integer in `lo..hi`.
    ///
    /// An empty range yields the shape of `lo` alone.
    pub fn range(lo: i64, hi: i64) -> Self {
        let lo = lo as i128;
        let top = (hi as i128 - 1).max(lo);
        let signed = lo < 0;
        Self {
            width: bits_for(lo, signed).max(bits_for(top, signed)),
            signed,
        }
    }

    /// The minimal shape of an integer constant: unsigned for non-negative
    /// values and signed otherwise.
    pub fn for_value(value: i64) -> Self {
        Self::for_i128(value as i128)
    }

    pub(crate) fn for_i128(value: i128) -> Self {
        let signed = value < 0;
        let width = if value == 0 { 1 } else { bits_for(value, signed) };
        Self { width, signed }
    }

    /// Returns `true` if `value` is representable in this shape.
    pub fn fits(self, value: i128) -> bool {
        if self.width >= 127 {
            return self.signed || value >= 0;
        }
        if self.signed {
            let half = 1i128 << (self.width.max(1) - 1);
            self.width > 0 && value >= -half && value < half
        } else {
            value >= 0 && value < (1i128 << self.width)
        }
    }

    /// The shape both operands of a bitwise operator are extended to.
    ///
    /// With mixed signedness the unsigned operand gains one bit so its range
    /// survives reinterpretation as signed.
    pub fn common(self, other: Shape) -> Shape {
        match (self.signed, other.signed) {
            (false, false) => Shape::unsigned(self.width.max(other.width)),
            (true, true) => Shape::signed(self.width.max(other.width)),
            (true, false) => Shape::signed(self.width.max(other.width + 1)),
            (false, true) => Shape::signed((self.width + 1).max(other.width)),
        }
    }

    /// Result of `a + b` and `a - b`.
    pub fn add(self, other: Shape) -> Shape {
        let common = self.common(other);
        Shape {
            width: common.width + 1,
            ..common
        }
    }

    /// Result of `a * b`.
    pub fn mul(self, other: Shape) -> Shape {
        Shape {
            width: self.width + other.width,
            signed: self.signed || other.signed,
        }
    }

    /// Result of `-a`.
    pub fn neg(self) -> Shape {
        if self.signed {
            self
        } else {
            Shape::signed(self.width + 1)
        }
    }

    /// Result of shifting a value of this shape left by a value of shape
    /// `amount`. Signed amounts only contribute their non-negative range.
    pub fn shl(self, amount: Shape) -> Shape {
        let amount_bits = if amount.signed {
            amount.width.saturating_sub(1)
        } else {
            amount.width
        };
        Shape {
            width: self.width + ((1u32 << amount_bits) - 1),
            signed: self.signed,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.signed { "signed" } else { "unsigned" };
        write!(f, "{sign}({})", self.width)
    }
}

impl From<u32> for Shape {
    fn from(width: u32) -> Self {
        Shape::unsigned(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_for_values() {
        assert_eq!(bits_for(0, false), 1);
        assert_eq!(bits_for(1, false), 1);
        assert_eq!(bits_for(15, false), 4);
        assert_eq!(bits_for(16, false), 5);
        assert_eq!(bits_for(15, true), 5);
        assert_eq!(bits_for(-1, false), 1);
        assert_eq!(bits_for(-4, false), 3);
        assert_eq!(bits_for(-5, false), 4);
    }

    #[test]
    fn const_shapes() {
        assert_eq!(Shape::for_value(0), Shape::unsigned(1));
        assert_eq!(Shape::for_value(10), Shape::unsigned(4));
        assert_eq!(Shape::for_value(-10), Shape::signed(5));
        assert_eq!(Shape::for_value(-1), Shape::signed(1));
    }

    #[test]
    fn range_shapes() {
        assert_eq!(Shape::range(0, 16), Shape::unsigned(4));
        assert_eq!(Shape::range(0, 17), Shape::unsigned(5));
        assert_eq!(Shape::range(-4, 16), Shape::signed(5));
        assert_eq!(Shape::range(-20, 16), Shape::signed(6));
        assert_eq!(Shape::range(0, 0), Shape::unsigned(1));
        assert_eq!(Shape::range(0, 1), Shape::unsigned(1));
    }

    #[test]
    fn fits_checks_range() {
        assert!(Shape::unsigned(4).fits(15));
        assert!(!Shape::unsigned(4).fits(16));
        assert!(!Shape::unsigned(4).fits(-1));
        assert!(Shape::signed(4).fits(-8));
        assert!(!Shape::signed(4).fits(8));
        assert!(!Shape::signed(0).fits(0));
    }

    #[test]
    fn common_shape_mixed_sign() {
        assert_eq!(Shape::signed(4).common(Shape::unsigned(4)), Shape::signed(5));
        assert_eq!(Shape::unsigned(3).common(Shape::signed(8)), Shape::signed(8));
        assert_eq!(Shape::unsigned(4).common(Shape::unsigned(6)), Shape::unsigned(6));
    }

    #[test]
    fn arithmetic_shapes() {
        assert_eq!(Shape::unsigned(4).add(Shape::unsigned(6)), Shape::unsigned(7));
        assert_eq!(Shape::signed(4).add(Shape::unsigned(4)), Shape::signed(6));
        assert_eq!(Shape::unsigned(4).mul(Shape::signed(3)), Shape::signed(7));
        assert_eq!(Shape::unsigned(4).neg(), Shape::signed(5));
        assert_eq!(Shape::signed(4).neg(), Shape::signed(4));
    }

    #[test]
    fn shift_shapes() {
        assert_eq!(Shape::unsigned(4).shl(Shape::unsigned(2)), Shape::unsigned(7));
        assert_eq!(Shape::signed(4).shl(Shape::signed(3)), Shape::signed(7));
    }

    #[test]
    fn display() {
        assert_eq!(Shape::signed(5).to_string(), "signed(5)");
        assert_eq!(Shape::unsigned(1).to_string(), "unsigned(1)");
    }
}

//! Immutable expression trees over bit vectors.
//!
//! Every [`Value`] node carries the [`Shape`] of its result, computed when the
//! node is built from the shapes of its operands. Operators never fail; only
//! constructs that can be malformed independently of operand values (slices
//! out of range, oversized shift amounts, bad patterns) return [`IrError`].

use crate::error::IrError;
use crate::ids::SignalId;
use crate::pattern::{MaskedPattern, Pattern};
use crate::shape::Shape;
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;
use strata_common::Bits;

/// Widest shift amount accepted by [`Value::shift_left`]. The result width
/// grows exponentially with the amount width.
pub const MAX_SHIFT_AMOUNT_WIDTH: u32 = 16;

/// Unary operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Bitwise inversion.
    Not,
    /// Two's complement negation.
    Neg,
    /// OR reduction: 1 if any bit is set.
    Any,
    /// AND reduction: 1 if every bit is set.
    All,
    /// XOR reduction: parity.
    Xor,
}

/// Binary operators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Left shift.
    Shl,
    /// Right shift, arithmetic for signed left operands.
    Shr,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl UnaryOp {
    /// Operator symbol used in textual dumps.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "~",
            UnaryOp::Neg => "-",
            UnaryOp::Any => "r|",
            UnaryOp::All => "r&",
            UnaryOp::Xor => "r^",
        }
    }
}

impl BinaryOp {
    /// Operator symbol used in textual dumps and Verilog output.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    /// Returns `true` for operators with a 1-bit result.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// The node variants of a [`Value`] tree.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ValueKind {
    /// A constant bit pattern of the node's width.
    Const(Bits),
    /// The current value of a signal.
    Signal(SignalId),
    /// Bits `start..end` of `value`.
    Slice {
        /// Sliced value.
        value: Box<Value>,
        /// First bit (inclusive).
        start: u32,
        /// Last bit (exclusive).
        end: u32,
    },
    /// `width` bits of `value` starting at bit `offset * stride`, where the
    /// offset is computed at run time. Bits past the end read as zero.
    Part {
        /// Indexed value.
        value: Box<Value>,
        /// Dynamic offset, in units of `stride` bits.
        offset: Box<Value>,
        /// Number of bits selected.
        width: u32,
        /// Bits per offset unit.
        stride: u32,
    },
    /// Concatenation; the first element occupies the least significant bits.
    Concat(Vec<Value>),
    /// `count` copies of `value`, first copy in the least significant bits.
    Repl {
        /// Replicated value.
        value: Box<Value>,
        /// Number of copies.
        count: u32,
    },
    /// A unary operator.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Value>,
    },
    /// A binary operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Value>,
        /// Right operand.
        rhs: Box<Value>,
    },
    /// Two-way multiplexer; `cond` is always one bit wide.
    Mux {
        /// Selects `if_true` when non-zero.
        cond: Box<Value>,
        /// Result when the condition holds.
        if_true: Box<Value>,
        /// Result otherwise.
        if_false: Box<Value>,
    },
}

/// An immutable expression node with a fixed result shape.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Value {
    kind: ValueKind,
    shape: Shape,
}

impl Value {
    /// A constant with an explicit signedness; the width is that of `bits`.
    pub fn constant(bits: Bits, signed: bool) -> Value {
        let shape = Shape {
            width: bits.width(),
            signed,
        };
        Value {
            kind: ValueKind::Const(bits),
            shape,
        }
    }

    /// An integer constant of the given shape, truncated to fit.
    pub fn int(value: i64, shape: Shape) -> Value {
        Value {
            kind: ValueKind::Const(Bits::from_i64(value, shape.width)),
            shape,
        }
    }

    /// A reference to a signal.
    pub fn signal(signal: Signal) -> Value {
        Value {
            kind: ValueKind::Signal(signal.id),
            shape: signal.shape,
        }
    }

    /// The node variant.
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// The result shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The result width in bits.
    pub fn width(&self) -> u32 {
        self.shape.width
    }

    /// Returns the bit pattern if this node is a constant.
    pub fn as_const(&self) -> Option<&Bits> {
        match &self.kind {
            ValueKind::Const(bits) => Some(bits),
            _ => None,
        }
    }

    /// Returns the signal if this node is a plain signal reference.
    pub fn as_signal(&self) -> Option<SignalId> {
        match self.kind {
            ValueKind::Signal(id) => Some(id),
            _ => None,
        }
    }

    fn unary(op: UnaryOp, operand: Value) -> Value {
        let shape = match op {
            UnaryOp::Not => operand.shape,
            UnaryOp::Neg => operand.shape.neg(),
            UnaryOp::Any | UnaryOp::All | UnaryOp::Xor => Shape::unsigned(1),
        };
        Value {
            kind: ValueKind::Unary {
                op,
                operand: Box::new(operand),
            },
            shape,
        }
    }

    fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        let (a, b) = (lhs.shape, rhs.shape);
        let shape = match op {
            BinaryOp::Add | BinaryOp::Sub => a.add(b),
            BinaryOp::Mul => a.mul(b),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => a.common(b),
            BinaryOp::Shl => a.shl(b),
            BinaryOp::Shr => a,
            _ => Shape::unsigned(1),
        };
        Self::binary_shaped(op, lhs, rhs, shape)
    }

    fn binary_shaped(op: BinaryOp, lhs: Value, rhs: Value, shape: Shape) -> Value {
        Value {
            kind: ValueKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            shape,
        }
    }

    /// `self == rhs`, one bit.
    pub fn equal(&self, rhs: impl Into<Value>) -> Value {
        Self::binary(BinaryOp::Eq, self.clone(), rhs.into())
    }

    /// `self != rhs`, one bit.
    pub fn not_equal(&self, rhs: impl Into<Value>) -> Value {
        Self::binary(BinaryOp::Ne, self.clone(), rhs.into())
    }

    /// `self < rhs`, one bit.
    pub fn lt(&self, rhs: impl Into<Value>) -> Value {
        Self::binary(BinaryOp::Lt, self.clone(), rhs.into())
    }

    /// `self <= rhs`, one bit.
    pub fn le(&self, rhs: impl Into<Value>) -> Value {
        Self::binary(BinaryOp::Le, self.clone(), rhs.into())
    }

    /// `self > rhs`, one bit.
    pub fn gt(&self, rhs: impl Into<Value>) -> Value {
        Self::binary(BinaryOp::Gt, self.clone(), rhs.into())
    }

    /// `self >= rhs`, one bit.
    pub fn ge(&self, rhs: impl Into<Value>) -> Value {
        Self::binary(BinaryOp::Ge, self.clone(), rhs.into())
    }

    /// 1 if any bit is set.
    pub fn bool(&self) -> Value {
        self.any()
    }

    /// OR reduction.
    pub fn any(&self) -> Value {
        Self::unary(UnaryOp::Any, self.clone())
    }

    /// AND reduction.
    pub fn all(&self) -> Value {
        Self::unary(UnaryOp::All, self.clone())
    }

    /// XOR reduction (parity).
    pub fn xor_reduce(&self) -> Value {
        Self::unary(UnaryOp::Xor, self.clone())
    }

    /// Selects `if_true` when `cond` is non-zero and `if_false` otherwise.
    /// Both branches are extended to their common shape.
    pub fn mux(cond: impl Into<Value>, if_true: impl Into<Value>, if_false: impl Into<Value>) -> Value {
        let cond = cond.into();
        let cond = if cond.width() == 1 { cond } else { cond.bool() };
        let (if_true, if_false) = (if_true.into(), if_false.into());
        let shape = if_true.shape.common(if_false.shape);
        Value {
            kind: ValueKind::Mux {
                cond: Box::new(cond),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            },
            shape,
        }
    }

    /// Concatenates `parts`; the first part occupies the least significant
    /// bits of the unsigned result.
    pub fn cat<V: Into<Value>>(parts: impl IntoIterator<Item = V>) -> Value {
        let parts: Vec<Value> = parts.into_iter().map(Into::into).collect();
        let width = parts.iter().map(Value::width).sum();
        Value {
            kind: ValueKind::Concat(parts),
            shape: Shape::unsigned(width),
        }
    }

    /// `count` copies of this value.
    pub fn repl(&self, count: u32) -> Value {
        Value {
            kind: ValueKind::Repl {
                value: Box::new(self.clone()),
                count,
            },
            shape: Shape::unsigned(self.width() * count),
        }
    }

    /// Bits `start..end`. Negative indices count back from the width.
    pub fn slice(&self, start: i64, end: i64) -> Result<Value, IrError> {
        let width = self.width() as i64;
        let norm = |i: i64| if i < 0 { i + width } else { i };
        let (s, e) = (norm(start), norm(end));
        if !(0..=width).contains(&s) || !(0..=width).contains(&e) || s > e {
            return Err(IrError::SliceOutOfRange {
                start,
                end,
                width: self.width(),
            });
        }
        Ok(self.slice_unchecked(s as u32, e as u32))
    }

    pub(crate) fn slice_unchecked(&self, start: u32, end: u32) -> Value {
        Value {
            kind: ValueKind::Slice {
                value: Box::new(self.clone()),
                start,
                end,
            },
            shape: Shape::unsigned(end - start),
        }
    }

    /// A single bit. `-1` is the most significant bit.
    pub fn bit(&self, index: i64) -> Result<Value, IrError> {
        let width = self.width() as i64;
        let i = if index < 0 { index + width } else { index };
        if !(0..width).contains(&i) {
            return Err(IrError::BitOutOfRange {
                index,
                width: self.width(),
            });
        }
        Ok(self.slice_unchecked(i as u32, i as u32 + 1))
    }

    /// The value reinterpreted as unsigned, keeping its width.
    pub fn as_unsigned(&self) -> Value {
        self.slice_unchecked(0, self.width())
    }

    /// `width` bits starting at the dynamic bit offset `offset`.
    pub fn bit_select(&self, offset: impl Into<Value>, width: u32) -> Value {
        self.part(offset.into(), width, 1)
    }

    /// The `offset`-th `width`-bit word, selected at run time.
    pub fn word_select(&self, offset: impl Into<Value>, width: u32) -> Value {
        self.part(offset.into(), width, width)
    }

    fn part(&self, offset: Value, width: u32, stride: u32) -> Value {
        Value {
            kind: ValueKind::Part {
                value: Box::new(self.clone()),
                offset: Box::new(offset),
                width,
                stride,
            },
            shape: Shape::unsigned(width),
        }
    }

    /// Shift left by a run-time amount. The result is wide enough for the
    /// largest amount the operand can hold.
    pub fn shift_left(&self, amount: impl Into<Value>) -> Result<Value, IrError> {
        let amount = amount.into();
        if amount.width() > MAX_SHIFT_AMOUNT_WIDTH {
            return Err(IrError::ShiftTooWide {
                width: amount.width(),
                max: MAX_SHIFT_AMOUNT_WIDTH,
            });
        }
        Ok(Self::binary(BinaryOp::Shl, self.clone(), amount))
    }

    /// Shift right by a run-time amount, keeping the shape.
    pub fn shift_right(&self, amount: impl Into<Value>) -> Value {
        Self::binary(BinaryOp::Shr, self.clone(), amount.into())
    }

    /// 1 if this value matches any of `patterns`, 0 for an empty list.
    pub fn matches<P: Into<Pattern>>(
        &self,
        patterns: impl IntoIterator<Item = P>,
    ) -> Result<Value, IrError> {
        let mut terms = Vec::new();
        for pattern in patterns {
            match pattern.into().resolve(self.shape)? {
                Some(masked) => terms.push(self.masked_equal(&masked)),
                None => terms.push(Value::from(false)),
            }
        }
        Ok(match terms.len() {
            0 => Value::from(false),
            1 => terms.remove(0),
            _ => Value::cat(terms).any(),
        })
    }

    fn masked_equal(&self, pattern: &MaskedPattern) -> Value {
        let mask = Value::constant(pattern.mask.clone(), false);
        let expected = Value::constant(pattern.value.clone(), false);
        (self.as_unsigned() & mask).equal(expected)
    }

    /// Calls `f` for every signal reference, in tree order.
    pub fn visit_signals(&self, f: &mut impl FnMut(SignalId)) {
        match &self.kind {
            ValueKind::Const(_) => {}
            ValueKind::Signal(id) => f(*id),
            ValueKind::Slice { value, .. } | ValueKind::Repl { value, .. } => value.visit_signals(f),
            ValueKind::Part { value, offset, .. } => {
                value.visit_signals(f);
                offset.visit_signals(f);
            }
            ValueKind::Concat(parts) => parts.iter().for_each(|p| p.visit_signals(f)),
            ValueKind::Unary { operand, .. } => operand.visit_signals(f),
            ValueKind::Binary { lhs, rhs, .. } => {
                lhs.visit_signals(f);
                rhs.visit_signals(f);
            }
            ValueKind::Mux {
                cond,
                if_true,
                if_false,
            } => {
                cond.visit_signals(f);
                if_true.visit_signals(f);
                if_false.visit_signals(f);
            }
        }
    }

    /// Every distinct signal read by this value, in first-visit order.
    pub fn signals(&self) -> Vec<SignalId> {
        let mut out = Vec::new();
        self.visit_signals(&mut |id| {
            if !out.contains(&id) {
                out.push(id);
            }
        });
        out
    }

    /// Rebuilds the tree with every signal reference passed through `f`.
    /// Shapes are preserved.
    pub fn map_signals(&self, f: &impl Fn(SignalId) -> SignalId) -> Value {
        let boxed = |v: &Value| Box::new(v.map_signals(f));
        let kind = match &self.kind {
            ValueKind::Const(bits) => ValueKind::Const(bits.clone()),
            ValueKind::Signal(id) => ValueKind::Signal(f(*id)),
            ValueKind::Slice { value, start, end } => ValueKind::Slice {
                value: boxed(value),
                start: *start,
                end: *end,
            },
            ValueKind::Part {
                value,
                offset,
                width,
                stride,
            } => ValueKind::Part {
                value: boxed(value),
                offset: boxed(offset),
                width: *width,
                stride: *stride,
            },
            ValueKind::Concat(parts) => {
                ValueKind::Concat(parts.iter().map(|p| p.map_signals(f)).collect())
            }
            ValueKind::Repl { value, count } => ValueKind::Repl {
                value: boxed(value),
                count: *count,
            },
            ValueKind::Unary { op, operand } => ValueKind::Unary {
                op: *op,
                operand: boxed(operand),
            },
            ValueKind::Binary { op, lhs, rhs } => ValueKind::Binary {
                op: *op,
                lhs: boxed(lhs),
                rhs: boxed(rhs),
            },
            ValueKind::Mux {
                cond,
                if_true,
                if_false,
            } => ValueKind::Mux {
                cond: boxed(cond),
                if_true: boxed(if_true),
                if_false: boxed(if_false),
            },
        };
        Value {
            kind,
            shape: self.shape,
        }
    }
}

impl Signal {
    /// This signal as a value.
    pub fn value(self) -> Value {
        Value::signal(self)
    }
}

impl From<Signal> for Value {
    fn from(signal: Signal) -> Self {
        Value::signal(signal)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::int(v, Shape::for_value(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::from(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::from(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        let shape = Shape::for_i128(v as i128);
        Value::constant(Bits::from_u64(v, shape.width), false)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::constant(Bits::from_bool(v), false)
    }
}

macro_rules! impl_binary_op {
    ($Trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Value>> std::ops::$Trait<T> for Value {
            type Output = Value;

            fn $method(self, rhs: T) -> Value {
                Value::binary($op, self, rhs.into())
            }
        }

        impl<T: Into<Value>> std::ops::$Trait<T> for &Value {
            type Output = Value;

            fn $method(self, rhs: T) -> Value {
                Value::binary($op, self.clone(), rhs.into())
            }
        }

        impl<T: Into<Value>> std::ops::$Trait<T> for Signal {
            type Output = Value;

            fn $method(self, rhs: T) -> Value {
                Value::binary($op, self.into(), rhs.into())
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(BitAnd, bitand, BinaryOp::And);
impl_binary_op!(BitOr, bitor, BinaryOp::Or);
impl_binary_op!(BitXor, bitxor, BinaryOp::Xor);

macro_rules! impl_const_shift {
    ($ty:ty) => {
        impl std::ops::Shl<u32> for $ty {
            type Output = Value;

            /// Shift left by a constant, widening by `amount` bits.
            fn shl(self, amount: u32) -> Value {
                let lhs: Value = self.into();
                let shape = Shape {
                    width: lhs.width() + amount,
                    signed: lhs.shape().signed,
                };
                Value::binary_shaped(BinaryOp::Shl, lhs, Value::from(amount), shape)
            }
        }

        impl std::ops::Shr<u32> for $ty {
            type Output = Value;

            fn shr(self, amount: u32) -> Value {
                let lhs: Value = self.into();
                let shape = lhs.shape();
                Value::binary_shaped(BinaryOp::Shr, lhs, Value::from(amount), shape)
            }
        }

        impl std::ops::Not for $ty {
            type Output = Value;

            fn not(self) -> Value {
                Value::unary(UnaryOp::Not, self.into())
            }
        }

        impl std::ops::Neg for $ty {
            type Output = Value;

            fn neg(self) -> Value {
                Value::unary(UnaryOp::Neg, self.into())
            }
        }
    };
}

impl_const_shift!(Value);
impl_const_shift!(&Value);
impl_const_shift!(Signal);

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Const(bits) => {
                let text = if self.shape.signed {
                    bits.to_i64().map(|v| format!("{}'sd{v}", bits.width()))
                } else {
                    bits.to_u64().map(|v| format!("{}'d{v}", bits.width()))
                };
                match text {
                    Some(t) => write!(f, "(const {t})"),
                    None => write!(f, "(const {}'b{bits})", bits.width()),
                }
            }
            ValueKind::Signal(id) => write!(f, "(sig {})", id.as_raw()),
            ValueKind::Slice { value, start, end } => write!(f, "(slice {value} {start}:{end})"),
            ValueKind::Part {
                value,
                offset,
                width,
                stride,
            } => write!(f, "(part {value} {offset} {width} {stride})"),
            ValueKind::Concat(parts) => {
                f.write_str("(cat")?;
                for p in parts {
                    write!(f, " {p}")?;
                }
                f.write_str(")")
            }
            ValueKind::Repl { value, count } => write!(f, "(repl {value} {count})"),
            ValueKind::Unary { op, operand } => write!(f, "({} {operand})", op.symbol()),
            ValueKind::Binary { op, lhs, rhs } => write!(f, "({} {lhs} {rhs})", op.symbol()),
            ValueKind::Mux {
                cond,
                if_true,
                if_false,
            } => write!(f, "(m {cond} {if_true} {if_false})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(id: u32, shape: Shape) -> Value {
        Value::signal(Signal {
            id: SignalId::from_raw(id),
            shape,
        })
    }

    fn u(w: u32) -> Value {
        sig(0, Shape::unsigned(w))
    }

    fn s(w: u32) -> Value {
        sig(1, Shape::signed(w))
    }

    #[test]
    fn const_shapes() {
        assert_eq!(Value::from(10).shape(), Shape::unsigned(4));
        assert_eq!(Value::from(-10).shape(), Shape::signed(5));
        assert_eq!(Value::from(0).shape(), Shape::unsigned(1));
        assert_eq!(Value::from(true).shape(), Shape::unsigned(1));
        assert_eq!(Value::from(u64::MAX).shape(), Shape::unsigned(64));
    }

    #[test]
    fn unary_shapes() {
        assert_eq!((!u(4)).shape(), Shape::unsigned(4));
        assert_eq!((-u(4)).shape(), Shape::signed(5));
        assert_eq!((-s(4)).shape(), Shape::signed(4));
        assert_eq!(u(8).any().shape(), Shape::unsigned(1));
        assert_eq!(u(8).xor_reduce().shape(), Shape::unsigned(1));
    }

    #[test]
    fn binary_shapes() {
        assert_eq!((u(4) + u(6)).shape(), Shape::unsigned(7));
        assert_eq!((s(4) + u(4)).shape(), Shape::signed(6));
        assert_eq!((u(4) - s(5)).shape(), Shape::signed(6));
        assert_eq!((u(4) * s(4)).shape(), Shape::signed(8));
        assert_eq!((s(4) & u(4)).shape(), Shape::signed(5));
        assert_eq!((u(4) | u(2)).shape(), Shape::unsigned(4));
        assert_eq!(u(4).lt(s(8)).shape(), Shape::unsigned(1));
    }

    #[test]
    fn shift_shapes() {
        assert_eq!((u(4) << 3).shape(), Shape::unsigned(7));
        assert_eq!((s(4) >> 3).shape(), Shape::signed(4));
        assert_eq!(u(4).shift_left(u(2)).unwrap().shape(), Shape::unsigned(7));
        assert_eq!(u(4).shift_right(u(2)).shape(), Shape::unsigned(4));
        assert!(matches!(
            u(4).shift_left(u(17)),
            Err(IrError::ShiftTooWide { width: 17, .. })
        ));
    }

    #[test]
    fn mux_shape_and_wide_condition() {
        let m = Value::mux(u(3), u(4), s(4));
        assert_eq!(m.shape(), Shape::signed(5));
        match m.kind() {
            ValueKind::Mux { cond, .. } => assert_eq!(cond.width(), 1),
            _ => panic!("expected mux"),
        }
    }

    #[test]
    fn cat_and_repl_shapes() {
        assert_eq!(Value::cat([u(2), u(3)]).shape(), Shape::unsigned(5));
        assert_eq!(s(3).repl(3).shape(), Shape::unsigned(9));
    }

    #[test]
    fn slice_bounds() {
        let v = u(8);
        assert_eq!(v.slice(2, 5).unwrap().shape(), Shape::unsigned(3));
        assert_eq!(v.slice(-3, 8).unwrap().width(), 3);
        assert_eq!(v.slice(4, 4).unwrap().width(), 0);
        assert!(v.slice(5, 2).is_err());
        assert!(v.slice(0, 9).is_err());
        assert!(v.slice(-9, 2).is_err());
    }

    #[test]
    fn bit_index() {
        let v = s(8);
        assert_eq!(v.bit(-1).unwrap().shape(), Shape::unsigned(1));
        assert!(matches!(v.bit(8), Err(IrError::BitOutOfRange { index: 8, .. })));
    }

    #[test]
    fn part_selects() {
        assert_eq!(u(16).bit_select(u(4), 3).shape(), Shape::unsigned(3));
        match u(16).word_select(u(2), 4).kind() {
            ValueKind::Part { stride, width, .. } => assert_eq!((*stride, *width), (4, 4)),
            _ => panic!("expected part"),
        }
    }

    #[test]
    fn matches_builds_comparisons() {
        assert_eq!(u(4).matches(Vec::<Pattern>::new()).unwrap(), Value::from(false));
        let one = u(4).matches(["1--0"]).unwrap();
        assert_eq!(one.shape(), Shape::unsigned(1));
        let many = u(4).matches([Pattern::from(1), Pattern::from("11--")]).unwrap();
        assert!(matches!(many.kind(), ValueKind::Unary { op: UnaryOp::Any, .. }));
        assert!(u(4).matches(["101"]).is_err());
    }

    #[test]
    fn signals_are_unique_in_visit_order() {
        let a = sig(3, Shape::unsigned(1));
        let b = sig(1, Shape::unsigned(1));
        let v = Value::mux(a.clone(), b.clone(), a & b);
        assert_eq!(v.signals(), vec![SignalId::from_raw(3), SignalId::from_raw(1)]);
    }

    #[test]
    fn map_signals_keeps_shapes() {
        let v = u(4) + 1;
        let mapped = v.map_signals(&|id| SignalId::from_raw(id.as_raw() + 10));
        assert_eq!(mapped.shape(), v.shape());
        assert_eq!(mapped.signals(), vec![SignalId::from_raw(10)]);
    }

    #[test]
    fn display_sexpr() {
        let v = u(4) + Value::from(-3);
        assert_eq!(v.to_string(), "(+ (sig 0) (const 3'sd-3))");
    }

    #[test]
    fn serde_roundtrip() {
        let v = Value::mux(u(1), u(4) + 1, Value::cat([u(2), s(2)]));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), v);
    }
}

//! Value evaluation and statement execution.
//!
//! [`eval_value`] computes a [`Value`] tree against the committed signal
//! values. [`exec_statements`] folds a statement list into an
//! [`Assignments`] map: the last executed assignment to each bit wins, and a
//! switch arm that is not taken contributes nothing. What a signal holds when
//! no assignment reached it is decided by the caller, which passes the base
//! value to start partial assignments from.

use std::collections::BTreeMap;

use strata_common::Bits;
use strata_ir::{BinaryOp, SignalId, Statement, Target, UnaryOp, Value, ValueKind};

/// Read access to committed signal values.
pub trait SignalValues {
    /// The current value of a flat signal.
    fn value(&self, id: SignalId) -> &Bits;
}

impl SignalValues for [Bits] {
    fn value(&self, id: SignalId) -> &Bits {
        &self[id.as_raw() as usize]
    }
}

impl SignalValues for Vec<Bits> {
    fn value(&self, id: SignalId) -> &Bits {
        &self[id.as_raw() as usize]
    }
}

/// Evaluates `value` to a bit pattern of exactly `value.width()` bits.
pub fn eval_value<S: SignalValues + ?Sized>(state: &S, value: &Value) -> Bits {
    let shape = value.shape();
    match value.kind() {
        ValueKind::Const(bits) => bits.clone(),
        ValueKind::Signal(id) => state.value(*id).clone(),
        ValueKind::Slice { value, start, end } => eval_value(state, value).slice(*start, *end),
        ValueKind::Part {
            value,
            offset,
            width,
            stride,
        } => {
            let base = eval_value(state, value);
            let amount = eval_value(state, offset)
                .to_u64()
                .and_then(|o| o.checked_mul(*stride as u64))
                .unwrap_or(u64::MAX);
            base.shr(amount, false).resize(*width, false)
        }
        ValueKind::Concat(parts) => {
            let parts: Vec<Bits> = parts.iter().map(|p| eval_value(state, p)).collect();
            Bits::concat(&parts)
        }
        ValueKind::Repl { value, count } => eval_value(state, value).repeat(*count),
        ValueKind::Unary { op, operand } => {
            let v = eval_value(state, operand);
            match op {
                UnaryOp::Not => !&v,
                UnaryOp::Neg => v.resize(shape.width, operand.shape().signed).wrapping_neg(),
                UnaryOp::Any => Bits::from_bool(!v.is_zero()),
                UnaryOp::All => Bits::from_bool(v.is_all_one()),
                UnaryOp::Xor => Bits::from_bool(v.count_ones() % 2 == 1),
            }
        }
        ValueKind::Binary { op, lhs, rhs } => {
            let (l, r) = (eval_value(state, lhs), eval_value(state, rhs));
            eval_binary(*op, (&l, lhs.shape().signed), (&r, rhs.shape().signed), shape.width)
        }
        ValueKind::Mux {
            cond,
            if_true,
            if_false,
        } => {
            let branch = if eval_value(state, cond).is_zero() {
                if_false
            } else {
                if_true
            };
            eval_value(state, branch).resize(shape.width, branch.shape().signed)
        }
    }
}

fn eval_binary(op: BinaryOp, (l, l_signed): (&Bits, bool), (r, r_signed): (&Bits, bool), width: u32) -> Bits {
    // Arithmetic and bitwise operands are extended to the result width by
    // their own signedness; this gives the exact result modulo 2^width.
    let extend = || (l.resize(width, l_signed), r.resize(width, r_signed));
    match op {
        BinaryOp::Add => {
            let (a, b) = extend();
            a.wrapping_add(&b)
        }
        BinaryOp::Sub => {
            let (a, b) = extend();
            a.wrapping_sub(&b)
        }
        BinaryOp::Mul => {
            let (a, b) = extend();
            a.wrapping_mul(&b)
        }
        BinaryOp::And => {
            let (a, b) = extend();
            &a & &b
        }
        BinaryOp::Or => {
            let (a, b) = extend();
            &a | &b
        }
        BinaryOp::Xor => {
            let (a, b) = extend();
            &a ^ &b
        }
        BinaryOp::Shl => l.resize(width, l_signed).shl(shift_amount(r, r_signed), width),
        BinaryOp::Shr => l.shr(shift_amount(r, r_signed), l_signed),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let signed = l_signed || r_signed;
            // Mirrors `Shape::common`: an unsigned operand compared with a
            // signed one needs one extra bit.
            let w = l.width().max(r.width()) + 1;
            let ord = if signed {
                l.resize(w, l_signed).cmp_signed(&r.resize(w, r_signed))
            } else {
                l.resize(w, false).cmp_unsigned(&r.resize(w, false))
            };
            let result = match op {
                BinaryOp::Eq => ord.is_eq(),
                BinaryOp::Ne => ord.is_ne(),
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Bits::from_bool(result)
        }
    }
}

/// A negative amount shifts by zero; an amount too large for `u64` shifts
/// everything out.
fn shift_amount(amount: &Bits, signed: bool) -> u64 {
    if signed && amount.msb() {
        0
    } else {
        amount.to_u64().unwrap_or(u64::MAX)
    }
}

/// Final values of the signals a statement list assigned.
pub type Assignments = BTreeMap<SignalId, Bits>;

/// Runs `stmts` in order against `state`, recording assignments in `out`.
///
/// A partial assignment to a signal not yet in `out` starts from
/// `base(signal)`.
pub fn exec_statements<S: SignalValues + ?Sized>(
    state: &S,
    stmts: &[Statement],
    base: &impl Fn(SignalId) -> Bits,
    out: &mut Assignments,
) {
    for stmt in stmts {
        match stmt {
            Statement::Assign { target, value, .. } => {
                let bits = eval_value(state, value).resize(target.width(), value.shape().signed);
                assign(target, &bits, 0, base, out);
            }
            Statement::Switch {
                selector,
                cases,
                default,
                ..
            } => {
                let sel = eval_value(state, selector);
                let taken = cases
                    .iter()
                    .find(|c| c.patterns.iter().any(|p| p.matches(&sel)))
                    .map(|c| &c.body)
                    .or(default.as_ref());
                if let Some(body) = taken {
                    exec_statements(state, body, base, out);
                }
            }
        }
    }
}

/// Writes bits `offset..offset + target.width()` of `bits` into `target`.
fn assign(target: &Target, bits: &Bits, offset: u32, base: &impl Fn(SignalId) -> Bits, out: &mut Assignments) {
    match target {
        Target::Signal(s) => {
            out.insert(s.id, bits.slice(offset, offset + s.width()));
        }
        Target::Slice { signal, start, end } => {
            let part = bits.slice(offset, offset + (end - start));
            out.entry(signal.id)
                .or_insert_with(|| base(signal.id))
                .deposit(*start, &part);
        }
        Target::Concat(parts) => {
            let mut at = offset;
            for part in parts {
                assign(part, bits, at, base, out);
                at += part.width();
            }
        }
    }
}

//! Binary operators recorded by deferred expressions.
//!
//! [`BinOp`] is the closed operator table; [`BinOp::apply`] gives each
//! operator its meaning on [`Value`]s. The semantics follow dynamic-language
//! arithmetic: booleans count as integers, mixed integer/float arithmetic
//! promotes to float, true division always yields a float, floor division and
//! modulo round toward negative infinity.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ThreadError;
use crate::value::Value;

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (true division)
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&`
    BitAnd,
    /// `^`
    BitXor,
    /// `|`
    BitOr,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl BinOp {
    /// Every operator, in table order.
    pub const ALL: [BinOp; 18] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::FloorDiv,
        BinOp::Mod,
        BinOp::Pow,
        BinOp::Shl,
        BinOp::Shr,
        BinOp::BitAnd,
        BinOp::BitXor,
        BinOp::BitOr,
        BinOp::Lt,
        BinOp::Le,
        BinOp::Eq,
        BinOp::Ne,
        BinOp::Gt,
        BinOp::Ge,
    ];

    /// The operator's source-level symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    /// Returns `true` for the six comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Eq | BinOp::Ne | BinOp::Gt | BinOp::Ge
        )
    }

    /// Applies the operator: `left <op> right`.
    pub fn apply(self, left: &Value, right: &Value) -> Result<Value, ThreadError> {
        match self {
            BinOp::Eq => Ok(Value::Bool(left == right)),
            BinOp::Ne => Ok(Value::Bool(left != right)),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ordering = compare(left, right).ok_or_else(|| self.unsupported(left, right))?;
                Ok(Value::Bool(match self {
                    BinOp::Lt => ordering == Ordering::Less,
                    BinOp::Le => ordering != Ordering::Greater,
                    BinOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            BinOp::Add => match (left, right) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                (Value::List(a), Value::List(b)) => {
                    Ok(Value::List(a.iter().chain(b).cloned().collect()))
                }
                _ => self.arith(left, right, i64::checked_add, |a, b| a + b),
            },
            BinOp::Sub => self.arith(left, right, i64::checked_sub, |a, b| a - b),
            BinOp::Mul => match (left, right) {
                (Value::Str(s), n) | (n, Value::Str(s)) if n.as_int().is_some() => {
                    Ok(Value::Str(s.repeat(self.repeat_count(s.len(), 1, n)?)))
                }
                (Value::List(items), n) | (n, Value::List(items)) if n.as_int().is_some() => {
                    let count =
                        self.repeat_count(items.len(), std::mem::size_of::<Value>(), n)?;
                    Ok(Value::List(
                        std::iter::repeat_n(items, count).flatten().cloned().collect(),
                    ))
                }
                _ => self.arith(left, right, i64::checked_mul, |a, b| a * b),
            },
            BinOp::Div => {
                let (a, b) = self.floats(left, right)?;
                if b == 0.0 {
                    return Err(ThreadError::DivisionByZero);
                }
                Ok(Value::Float(a / b))
            }
            BinOp::FloorDiv => {
                if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                    return floor_div(a, b).map(Value::Int);
                }
                let (a, b) = self.floats(left, right)?;
                if b == 0.0 {
                    return Err(ThreadError::DivisionByZero);
                }
                Ok(Value::Float((a / b).floor()))
            }
            BinOp::Mod => {
                if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                    return floor_mod(a, b).map(Value::Int);
                }
                let (a, b) = self.floats(left, right)?;
                if b == 0.0 {
                    return Err(ThreadError::DivisionByZero);
                }
                let r = a % b;
                Ok(Value::Float(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }))
            }
            BinOp::Pow => {
                if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
                    if b >= 0 {
                        match a {
                            0 | 1 => return Ok(Value::Int(if b == 0 { 1 } else { a })),
                            -1 => return Ok(Value::Int(if b % 2 == 0 { 1 } else { -1 })),
                            _ => {}
                        }
                        let exp = u32::try_from(b).map_err(|_| ThreadError::Overflow { op: self })?;
                        return a
                            .checked_pow(exp)
                            .map(Value::Int)
                            .ok_or(ThreadError::Overflow { op: self });
                    }
                }
                let (a, b) = self.floats(left, right)?;
                Ok(Value::Float(a.powf(b)))
            }
            BinOp::Shl | BinOp::Shr => {
                let (a, b) = self.ints(left, right)?;
                if b < 0 {
                    return Err(ThreadError::NegativeShift);
                }
                if self == BinOp::Shr {
                    // Shifting past the width leaves only the sign.
                    let shift = u32::try_from(b).unwrap_or(u32::MAX).min(63);
                    return Ok(Value::Int(a >> shift));
                }
                if a == 0 {
                    return Ok(Value::Int(0));
                }
                let shift = u32::try_from(b).map_err(|_| ThreadError::Overflow { op: self })?;
                a.checked_shl(shift)
                    .filter(|r| r >> shift == a)
                    .map(Value::Int)
                    .ok_or(ThreadError::Overflow { op: self })
            }
            BinOp::BitAnd | BinOp::BitXor | BinOp::BitOr => {
                if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
                    return Ok(Value::Bool(match self {
                        BinOp::BitAnd => a & b,
                        BinOp::BitXor => a ^ b,
                        _ => a | b,
                    }));
                }
                let (a, b) = self.ints(left, right)?;
                Ok(Value::Int(match self {
                    BinOp::BitAnd => a & b,
                    BinOp::BitXor => a ^ b,
                    _ => a | b,
                }))
            }
        }
    }

    /// Repeat count for `seq * n`; negative counts give an empty result.
    /// Fails when `len * n` elements of `unit` bytes cannot be allocated.
    fn repeat_count(self, len: usize, unit: usize, n: &Value) -> Result<usize, ThreadError> {
        let count = n.as_int().and_then(|n| usize::try_from(n).ok()).unwrap_or(0);
        if len == 0 {
            return Ok(0);
        }
        let limit = isize::MAX.unsigned_abs() / unit.max(1);
        match len.checked_mul(count) {
            Some(total) if total <= limit => Ok(count),
            _ => Err(ThreadError::Overflow { op: self }),
        }
    }

    fn unsupported(self, left: &Value, right: &Value) -> ThreadError {
        ThreadError::UnsupportedOperand {
            op: self,
            left: left.type_name(),
            right: right.type_name(),
        }
    }

    fn ints(self, left: &Value, right: &Value) -> Result<(i64, i64), ThreadError> {
        match (left.as_int(), right.as_int()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(self.unsupported(left, right)),
        }
    }

    fn floats(self, left: &Value, right: &Value) -> Result<(f64, f64), ThreadError> {
        match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(self.unsupported(left, right)),
        }
    }

    fn arith(
        self,
        left: &Value,
        right: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, ThreadError> {
        if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
            return int_op(a, b)
                .map(Value::Int)
                .ok_or(ThreadError::Overflow { op: self });
        }
        let (a, b) = self.floats(left, right)?;
        Ok(Value::Float(float_op(a, b)))
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(x) => Some(*x),
        other => other.as_int().map(|i| i as f64),
    }
}


fn floor_div(a: i64, b: i64) -> Result<i64, ThreadError> {
    if b == 0 {
        return Err(ThreadError::DivisionByZero);
    }
    let q = a
        .checked_div(b)
        .ok_or(ThreadError::Overflow { op: BinOp::FloorDiv })?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Result<i64, ThreadError> {
    if b == 0 {
        return Err(ThreadError::DivisionByZero);
    }
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

/// Orders numbers, strings and lists; `None` when the pair is unordered.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                if x != y {
                    return compare(x, y);
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            Some(left.as_int()?.cmp(&right.as_int()?))
        }
        _ => as_float(left)?.partial_cmp(&as_float(right)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: BinOp, a: impl Into<Value>, b: impl Into<Value>) -> Value {
        op.apply(&a.into(), &b.into()).unwrap()
    }

    #[test]
    fn integer_table_on_three_and_two() {
        let expected = [
            (BinOp::Add, Value::Int(5)),
            (BinOp::Sub, Value::Int(1)),
            (BinOp::Mul, Value::Int(6)),
            (BinOp::Div, Value::Float(1.5)),
            (BinOp::FloorDiv, Value::Int(1)),
            (BinOp::Mod, Value::Int(1)),
            (BinOp::Pow, Value::Int(9)),
            (BinOp::Shl, Value::Int(12)),
            (BinOp::Shr, Value::Int(0)),
            (BinOp::BitAnd, Value::Int(2)),
            (BinOp::BitXor, Value::Int(1)),
            (BinOp::BitOr, Value::Int(3)),
            (BinOp::Lt, Value::Bool(false)),
            (BinOp::Le, Value::Bool(false)),
            (BinOp::Eq, Value::Bool(false)),
            (BinOp::Ne, Value::Bool(true)),
            (BinOp::Gt, Value::Bool(true)),
            (BinOp::Ge, Value::Bool(true)),
        ];
        for (op, want) in expected {
            assert_eq!(apply(op, 3, 2), want, "3 {op} 2");
        }
    }

    #[test]
    fn floor_semantics_for_negative_operands() {
        assert_eq!(apply(BinOp::FloorDiv, -7, 2), Value::Int(-4));
        assert_eq!(apply(BinOp::Mod, -7, 2), Value::Int(1));
        assert_eq!(apply(BinOp::Mod, 7, -2), Value::Int(-1));
        assert_eq!(apply(BinOp::FloorDiv, -7.0, 2), Value::Float(-4.0));
    }

    #[test]
    fn mixed_numbers_promote_to_float() {
        assert_eq!(apply(BinOp::Add, 1, 0.5), Value::Float(1.5));
        assert_eq!(apply(BinOp::Pow, 2, -1), Value::Float(0.5));
        assert_eq!(apply(BinOp::Add, true, 1), Value::Int(2));
    }

    #[test]
    fn sequences_concatenate_and_repeat() {
        assert_eq!(apply(BinOp::Add, "ab", "cd"), Value::from("abcd"));
        assert_eq!(apply(BinOp::Mul, "ab", 2), Value::from("abab"));
        assert_eq!(
            apply(BinOp::Mul, vec![1], 3),
            Value::list(vec![1, 1, 1])
        );
        assert_eq!(
            apply(BinOp::Add, vec![1], vec![2]),
            Value::list(vec![1, 2])
        );
    }

    #[test]
    fn oversized_repeats_are_overflow_errors() {
        assert!(matches!(
            BinOp::Mul.apply(&Value::from("ab"), &Value::Int(i64::MAX)),
            Err(ThreadError::Overflow { op: BinOp::Mul })
        ));
        assert!(matches!(
            BinOp::Mul.apply(&Value::Int(i64::MAX), &Value::list(vec![1, 2])),
            Err(ThreadError::Overflow { op: BinOp::Mul })
        ));
        assert_eq!(apply(BinOp::Mul, "", i64::MAX), Value::from(""));
        assert_eq!(apply(BinOp::Mul, Vec::<i64>::new(), i64::MAX), Value::list(Vec::<i64>::new()));
        assert_eq!(apply(BinOp::Mul, "ab", -3), Value::from(""));
    }

    #[test]
    fn huge_exponents_on_trivial_bases() {
        let big = i64::from(u32::MAX) + 1;
        assert_eq!(apply(BinOp::Pow, 0, big), Value::Int(0));
        assert_eq!(apply(BinOp::Pow, 1, big), Value::Int(1));
        assert_eq!(apply(BinOp::Pow, -1, big), Value::Int(1));
        assert_eq!(apply(BinOp::Pow, -1, big + 1), Value::Int(-1));
        assert_eq!(apply(BinOp::Pow, 0, 0), Value::Int(1));
        assert!(matches!(
            BinOp::Pow.apply(&Value::Int(2), &Value::Int(big)),
            Err(ThreadError::Overflow { op: BinOp::Pow })
        ));
    }

    #[test]
    fn comparisons_order_strings_and_lists() {
        assert_eq!(apply(BinOp::Lt, "a", "b"), Value::Bool(true));
        assert_eq!(apply(BinOp::Lt, vec![1, 2], vec![1, 3]), Value::Bool(true));
        assert_eq!(apply(BinOp::Ge, vec![1, 2], vec![1]), Value::Bool(true));
    }

    #[test]
    fn errors_for_bad_operands() {
        assert!(matches!(
            BinOp::Div.apply(&Value::Int(1), &Value::Int(0)),
            Err(ThreadError::DivisionByZero)
        ));
        assert!(matches!(
            BinOp::Mod.apply(&Value::Int(1), &Value::Int(0)),
            Err(ThreadError::DivisionByZero)
        ));
        assert!(matches!(
            BinOp::Sub.apply(&Value::from("a"), &Value::Int(1)),
            Err(ThreadError::UnsupportedOperand { op: BinOp::Sub, .. })
        ));
        assert!(matches!(
            BinOp::Lt.apply(&Value::from("a"), &Value::Int(1)),
            Err(ThreadError::UnsupportedOperand { .. })
        ));
        assert!(matches!(
            BinOp::Shl.apply(&Value::Int(1), &Value::Int(-1)),
            Err(ThreadError::NegativeShift)
        ));
        assert!(matches!(
            BinOp::Add.apply(&Value::Int(i64::MAX), &Value::Int(1)),
            Err(ThreadError::Overflow { op: BinOp::Add })
        ));
        assert!(matches!(
            BinOp::Shl.apply(&Value::Int(1), &Value::Int(64)),
            Err(ThreadError::Overflow { op: BinOp::Shl })
        ));
    }

    #[test]
    fn equality_is_defined_for_any_pair() {
        assert_eq!(apply(BinOp::Eq, "a", 1), Value::Bool(false));
        assert_eq!(apply(BinOp::Ne, (), 0), Value::Bool(true));
    }

    #[test]
    fn operators_serialize_by_name() {
        assert_eq!(serde_json::to_string(&BinOp::FloorDiv).unwrap(), r#""floor_div""#);
        assert_eq!(BinOp::ALL.len(), 18);
        assert!(BinOp::ALL.iter().filter(|op| op.is_comparison()).count() == 6);
    }
}

//! The placeholder `X` and the deferred values built from it.
//!
//! Depending on how it is used inside a step, `X` stands for:
//!
//! | Use | Meaning | Built value |
//! |-----|---------|-------------|
//! | `X` as an argument | substitute the previous result here | [`Arg::Current`] |
//! | `X.spread()` | splice the previous result's elements here | [`Unpack`] |
//! | `X.attr("name")` | resolve `name` on the previous result, calling it if callable | [`AttrCapture`] |
//! | `X.item(key)`, chained | look `key` up in the previous result | [`Expr`] |
//! | `X + 1`, `X.item(0).equals(3)`, ... | apply operators to the previous result | [`Expr`] |
//!
//! Markers are recognised by their enum tag; nothing here is ever compared
//! with `==` to find out what it is.
//!
//! [`Arg::Current`]: crate::step::Arg::Current

use std::borrow::Cow;
use std::fmt;
use std::ops;

use crate::errors::ThreadError;
use crate::func::{Callable, Func};
use crate::lookup::Key;
use crate::ops::BinOp;
use crate::value::{Repr, Value};

// ---------------------------------------------------------------------------
// Placeholder and unpack marker
// ---------------------------------------------------------------------------

/// The placeholder type. Use the [`X`] constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder;

/// Stands for the value produced by the previous step.
pub const X: Placeholder = Placeholder;

/// Marker meaning "splice the previous result's elements here".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unpack;

impl Placeholder {
    /// The unpack marker (`*x`).
    pub fn spread(self) -> Unpack {
        Unpack
    }

    /// Deferred attribute or method access (`x.name`).
    pub fn attr(self, name: impl Into<String>) -> AttrCapture {
        AttrCapture::new(name)
    }

    /// Deferred item lookup (`x[key]`).
    pub fn item(self, key: impl Into<Key>) -> Expr {
        Expr::new().item(key)
    }

    /// Deferred binary operation (`x <op> rhs`).
    pub fn op(self, op: BinOp, rhs: impl Into<Operand>) -> Expr {
        Expr::new().op(op, rhs)
    }

    /// `x // rhs`
    pub fn floor_div(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::FloorDiv, rhs)
    }

    /// `x ** rhs`
    pub fn pow(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::Pow, rhs)
    }

    /// `x == rhs`
    pub fn equals(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::Eq, rhs)
    }

    /// `x != rhs`
    pub fn not_equals(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::Ne, rhs)
    }

    /// `x < rhs`
    pub fn less_than(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::Lt, rhs)
    }

    /// `x <= rhs`
    pub fn less_equal(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::Le, rhs)
    }

    /// `x > rhs`
    pub fn greater_than(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::Gt, rhs)
    }

    /// `x >= rhs`
    pub fn greater_equal(self, rhs: impl Into<Operand>) -> Expr {
        self.op(BinOp::Ge, rhs)
    }
}

/// Iterating the placeholder yields the unpack marker, so
/// `args.extend(X)` splices the previous result.
impl IntoIterator for Placeholder {
    type Item = Unpack;
    type IntoIter = std::iter::Once<Unpack>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(Unpack)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("x")
    }
}

impl fmt::Display for Unpack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("*x")
    }
}

// ---------------------------------------------------------------------------
// Deferred expressions
// ---------------------------------------------------------------------------

/// Right-hand side of a recorded operation.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A fixed value.
    Value(Value),
    /// Another deferred expression, evaluated against the same input.
    Expr(Expr),
}

macro_rules! value_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Value(value.into())
                }
            }
        )*
    };
}

value_operand!(Value, (), bool, i32, i64, usize, f64, &str, String, Func);

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::Value(Value::list(items))
    }
}

impl From<Expr> for Operand {
    fn from(expr: Expr) -> Self {
        Operand::Expr(expr)
    }
}

impl From<Placeholder> for Operand {
    fn from(_: Placeholder) -> Self {
        Operand::Expr(Expr::new())
    }
}

/// A recorded chain of item lookups followed by binary operations.
///
/// Evaluating against `v` applies every lookup in order (`v = v[key]`), then
/// every operation left to right (`v = v <op> rhs`). An [`Expr`] operand is
/// evaluated against the original input first, so
/// `X.item("a") + X.item("b")` adds two fields of the same value.
///
/// Builders consume `self` and return a new expression; evaluation borrows,
/// so one expression can be applied to any number of inputs.
#[derive(Debug, Clone, Default)]
pub struct Expr {
    keys: Vec<Key>,
    ops: Vec<(BinOp, Operand)>,
}

impl Expr {
    /// The identity expression (evaluates to its input).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item lookup.
    ///
    /// Lookups always apply before operations; `(X + 1).item(0)` looks up
    /// index 0 first.
    #[must_use]
    pub fn item(mut self, key: impl Into<Key>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Appends a binary operation.
    #[must_use]
    pub fn op(mut self, op: BinOp, rhs: impl Into<Operand>) -> Self {
        self.ops.push((op, rhs.into()));
        self
    }

    /// `self // rhs`
    #[must_use]
    pub fn floor_div(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::FloorDiv, rhs)
    }

    /// `self ** rhs`
    #[must_use]
    pub fn pow(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::Pow, rhs)
    }

    /// `self == rhs`
    #[must_use]
    pub fn equals(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::Eq, rhs)
    }

    /// `self != rhs`
    #[must_use]
    pub fn not_equals(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::Ne, rhs)
    }

    /// `self < rhs`
    #[must_use]
    pub fn less_than(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::Lt, rhs)
    }

    /// `self <= rhs`
    #[must_use]
    pub fn less_equal(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::Le, rhs)
    }

    /// `self > rhs`
    #[must_use]
    pub fn greater_than(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::Gt, rhs)
    }

    /// `self >= rhs`
    #[must_use]
    pub fn greater_equal(self, rhs: impl Into<Operand>) -> Self {
        self.op(BinOp::Ge, rhs)
    }

    /// Recorded lookups, in order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Recorded operations, in order.
    pub fn operations(&self) -> &[(BinOp, Operand)] {
        &self.ops
    }

    /// Applies the expression to `input`.
    pub fn eval(&self, input: &Value) -> Result<Value, ThreadError> {
        let mut current = match self.keys.split_first() {
            None => input.clone(),
            Some((first, rest)) => {
                let mut v = input.get_item(first)?;
                for key in rest {
                    v = v.get_item(key)?;
                }
                v
            }
        };
        for (op, rhs) in &self.ops {
            current = match rhs {
                Operand::Value(value) => op.apply(&current, value)?,
                Operand::Expr(expr) => op.apply(&current, &expr.eval(input)?)?,
            };
        }
        Ok(current)
    }
}

impl Callable for Expr {
    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn call(&self, args: Vec<Value>) -> Result<Value, ThreadError> {
        match <[Value; 1]>::try_from(args) {
            Ok([input]) => self.eval(&input),
            Err(args) => Err(ThreadError::Arity {
                name: self.to_string(),
                expected: "1",
                given: args.len(),
            }),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("x")?;
        for key in &self.keys {
            write!(f, "{key}")?;
        }
        for (op, rhs) in &self.ops {
            write!(f, " {op} ")?;
            match rhs {
                Operand::Value(v) => write!(f, "{}", Repr(v))?,
                Operand::Expr(e) if e.ops.is_empty() => write!(f, "{e}")?,
                Operand::Expr(e) => write!(f, "({e})")?,
            }
        }
        Ok(())
    }
}

impl From<Expr> for Func {
    fn from(expr: Expr) -> Self {
        Func::new(expr)
    }
}

// Operator sugar. Comparisons cannot be overloaded to build expressions, so
// they are the named methods above.
macro_rules! overload_binop {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<R: Into<Operand>> ops::$trait<R> for Placeholder {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    self.op(BinOp::$op, rhs)
                }
            }

            impl<R: Into<Operand>> ops::$trait<R> for Expr {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    self.op(BinOp::$op, rhs)
                }
            }
        )*
    };
}

overload_binop! {
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Mod,
    Shl::shl => Shl,
    Shr::shr => Shr,
    BitAnd::bitand => BitAnd,
    BitXor::bitxor => BitXor,
    BitOr::bitor => BitOr,
}

// ---------------------------------------------------------------------------
// Attribute capture
// ---------------------------------------------------------------------------

/// What an [`AttrCapture`] does with arguments supplied to a non-callable
/// attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtraArgs {
    /// Fail with [`ThreadError::AttributeNotCallable`].
    #[default]
    Reject,
    /// Drop them and emit a warning event.
    Ignore,
}

/// Deferred attribute or method access (`x.name`).
///
/// Called with `(obj, args...)`: resolves `name` on `obj`; if the attribute is
/// callable it is called with `args`, otherwise it is returned as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrCapture {
    name: String,
    extra_args: ExtraArgs,
}

impl AttrCapture {
    /// Captures attribute `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra_args: ExtraArgs::default(),
        }
    }

    /// Drop arguments supplied to a non-callable attribute instead of failing.
    #[must_use]
    pub fn ignore_extra_args(mut self) -> Self {
        self.extra_args = ExtraArgs::Ignore;
        self
    }

    /// The captured attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The policy for arguments supplied to a non-callable attribute.
    pub fn extra_args(&self) -> ExtraArgs {
        self.extra_args
    }

    /// Resolves the attribute on `obj` and applies it to `args`.
    pub fn apply(&self, obj: &Value, args: Vec<Value>) -> Result<Value, ThreadError> {
        let attr = obj.get_attr(&self.name)?;
        if let Value::Func(f) = &attr {
            return f.call(args);
        }
        if !args.is_empty() {
            match self.extra_args {
                ExtraArgs::Reject => {
                    return Err(ThreadError::AttributeNotCallable {
                        type_name: obj.type_name(),
                        name: self.name.clone(),
                        extra: args.len(),
                    })
                }
                ExtraArgs::Ignore => tracing::warn!(
                    attribute = %self.name,
                    dropped = args.len(),
                    "arguments supplied to a non-callable attribute were ignored"
                ),
            }
        }
        Ok(attr)
    }
}

impl Callable for AttrCapture {
    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(format!("x.{}", self.name))
    }

    fn call(&self, mut args: Vec<Value>) -> Result<Value, ThreadError> {
        if args.is_empty() {
            return Err(ThreadError::Arity {
                name: format!("x.{}", self.name),
                expected: "at least 1",
                given: 0,
            });
        }
        let obj = args.remove(0);
        self.apply(&obj, args)
    }
}

impl From<AttrCapture> for Func {
    fn from(capture: AttrCapture) -> Self {
        Func::new(capture)
    }
}

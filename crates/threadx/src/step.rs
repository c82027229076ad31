//! Steps: a callable plus the arguments it is invoked with.
//!
//! A step is written as a bare term (`func`, `X.item("a")`, [`STOP`]) or as a
//! tuple whose first element is the callable: `(f, 1, X, 2)`. Each element is
//! an [`Arg`]; the placeholder and unpack markers become dedicated variants
//! so the runner can find them without comparing values.
//!
//! [`STOP`]: crate::func::STOP

use std::fmt;

use crate::func::{Func, Stop};
use crate::lookup::Key;
use crate::placeholder::{AttrCapture, Expr, Placeholder, Unpack};
use crate::value::{Map, Repr, Value};

/// One element of a step.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A concrete value (which may itself be a callable).
    Value(Value),
    /// `x`: the previous result, as a single argument.
    Current,
    /// `*x`: the previous result's elements, spread in place.
    Unpack,
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(Value::Func(func)) => f.write_str(&func.name()),
            Arg::Value(v) => write!(f, "{}", Repr(v)),
            Arg::Current => f.write_str("x"),
            Arg::Unpack => f.write_str("*x"),
        }
    }
}

impl From<Placeholder> for Arg {
    fn from(_: Placeholder) -> Self {
        Arg::Current
    }
}

impl From<Unpack> for Arg {
    fn from(_: Unpack) -> Self {
        Arg::Unpack
    }
}

impl From<Expr> for Arg {
    fn from(expr: Expr) -> Self {
        Arg::Value(Value::Func(expr.into()))
    }
}

impl From<AttrCapture> for Arg {
    fn from(capture: AttrCapture) -> Self {
        Arg::Value(Value::Func(capture.into()))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Arg {
    fn from(items: Vec<T>) -> Self {
        Arg::Value(Value::list(items))
    }
}

macro_rules! value_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Value(value.into())
                }
            }
        )*
    };
}

value_arg!(Value, (), bool, i32, i64, usize, f64, &str, String, Map, Func, Stop);

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A pipeline stage: a head (expected to be callable) and extra arguments.
#[derive(Debug, Clone)]
pub struct Step {
    head: Arg,
    args: Vec<Arg>,
}

impl Step {
    /// A step with no extra arguments.
    pub fn new(head: impl Into<Arg>) -> Self {
        Self {
            head: head.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The step's leading element.
    pub fn head(&self) -> &Arg {
        &self.head
    }

    /// The step's extra arguments.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.head)?;
        for arg in &self.args {
            write!(f, ", {arg}")?;
        }
        f.write_str(")")
    }
}

impl From<Arg> for Step {
    fn from(head: Arg) -> Self {
        Step::new(head)
    }
}

macro_rules! bare_step {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Step {
                fn from(head: $ty) -> Self {
                    Step::new(head)
                }
            }
        )*
    };
}

bare_step!(
    Value, bool, i32, i64, usize, f64, &str, String, Map, Func, Stop, Expr, AttrCapture,
    Placeholder, Unpack,
);

/// Key lookups can be steps on their own: `Step::from(Key::from("a"))` is `x["a"]`.
impl From<Key> for Step {
    fn from(key: Key) -> Self {
        Step::new(Expr::new().item(key))
    }
}

macro_rules! tuple_step {
    ($head:ident $(, $arg:ident)*) => {
        impl<$head: Into<Arg>, $($arg: Into<Arg>),*> From<($head, $($arg,)*)> for Step {
            #[allow(non_snake_case)]
            fn from(($head, $($arg,)*): ($head, $($arg,)*)) -> Self {
                Step {
                    head: $head.into(),
                    args: vec![$($arg.into()),*],
                }
            }
        }
    };
}

tuple_step!(H);
tuple_step!(H, A1);
tuple_step!(H, A1, A2);
tuple_step!(H, A1, A2, A3);
tuple_step!(H, A1, A2, A3, A4);
tuple_step!(H, A1, A2, A3, A4, A5);
tuple_step!(H, A1, A2, A3, A4, A5, A6);
tuple_step!(H, A1, A2, A3, A4, A5, A6, A7);
tuple_step!(H, A1, A2, A3, A4, A5, A6, A7, A8);
tuple_step!(H, A1, A2, A3, A4, A5, A6, A7, A8, A9);
tuple_step!(H, A1, A2, A3, A4, A5, A6, A7, A8, A9, A10);
tuple_step!(H, A1, A2, A3, A4, A5, A6, A7, A8, A9, A10, A11);

/// Builds a [`Step`] from a head and any number of arguments.
///
/// ```
/// use threadx::{step, X};
///
/// let s = step!(X.attr("count"), 2);
/// assert_eq!(s.args().len(), 1);
/// ```
#[macro_export]
macro_rules! step {
    ($head:expr $(, $arg:expr)* $(,)?) => {
        $crate::Step::new($head)$(.arg($arg))*
    };
}

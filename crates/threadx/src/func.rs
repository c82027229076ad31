//! Callables and the stop marker.
//!
//! Anything a step can invoke is a [`Func`]: caller closures built with
//! [`func`], deferred expressions, attribute captures, builtins, and the
//! [`STOP`] marker. `Func` is a cheap, clonable handle; two handles are
//! identical only if they share the same underlying callable.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::errors::ThreadError;
use crate::value::Value;

/// Something that can be invoked with positional arguments.
pub trait Callable: Send + Sync {
    /// Name shown in traces and in the rendering of a [`Value::Func`].
    fn name(&self) -> Cow<'_, str>;

    /// Invokes the callable.
    fn call(&self, args: Vec<Value>) -> Result<Value, ThreadError>;
}

// ---------------------------------------------------------------------------
// Func handle
// ---------------------------------------------------------------------------

/// A shared handle to a callable.
#[derive(Clone)]
pub struct Func(Repr);

#[derive(Clone)]
enum Repr {
    Stop,
    Native(Arc<dyn Callable>),
}

impl Func {
    /// Wraps a [`Callable`].
    pub fn new(callable: impl Callable + 'static) -> Self {
        Self(Repr::Native(Arc::new(callable)))
    }

    /// Name of the wrapped callable.
    pub fn name(&self) -> Cow<'_, str> {
        match &self.0 {
            Repr::Stop => Cow::Borrowed("stop"),
            Repr::Native(callable) => callable.name(),
        }
    }

    /// Invokes the callable. Calling the stop marker directly does nothing.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, ThreadError> {
        match &self.0 {
            Repr::Stop => Ok(Value::None),
            Repr::Native(callable) => callable.call(args),
        }
    }

    /// Returns `true` if this is the [`STOP`] marker.
    pub fn is_stop(&self) -> bool {
        matches!(self.0, Repr::Stop)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Func) -> bool {
        match (&self.0, &other.0) {
            (Repr::Stop, Repr::Stop) => true,
            (Repr::Native(a), Repr::Native(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Func").field(&self.name()).finish()
    }
}

// ---------------------------------------------------------------------------
// Closures
// ---------------------------------------------------------------------------

struct Closure<F> {
    name: String,
    f: F,
}

impl<F> Callable for Closure<F>
where
    F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync,
{
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn call(&self, args: Vec<Value>) -> Result<Value, ThreadError> {
        (self.f)(args).map_err(ThreadError::from_callable)
    }
}

/// Builds a named callable from a closure.
///
/// Errors returned by the closure reach the caller of [`crate::thread`]
/// unchanged, wrapped in [`ThreadError::Callable`].
///
/// ```
/// use threadx::{func, Value};
///
/// let double = func("double", |args| {
///     let n = args.first().and_then(Value::as_int).unwrap_or_default();
///     Ok(Value::Int(n * 2))
/// });
/// assert_eq!(double.call(vec![Value::Int(21)]).unwrap(), Value::Int(42));
/// ```
pub fn func<F>(name: impl Into<String>, f: F) -> Func
where
    F: Fn(Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Func::new(Closure {
        name: name.into(),
        f,
    })
}

// ---------------------------------------------------------------------------
// Stop marker
// ---------------------------------------------------------------------------

/// Marker type for [`STOP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop;

/// Ends a pipeline early when used as a step, returning the value carried so
/// far. Anywhere else it behaves as a callable that does nothing.
pub const STOP: Stop = Stop;

impl From<Stop> for Func {
    fn from(_: Stop) -> Self {
        Self(Repr::Stop)
    }
}

impl From<Stop> for Value {
    fn from(stop: Stop) -> Self {
        Self::Func(stop.into())
    }
}

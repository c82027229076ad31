//! Threads a value through a sequence of steps.
//!
//! For every step, in order:
//!
//! 1. A [`STOP`] head ends the run and returns the value carried so far.
//! 2. An `x` or `*x` head is a usage error, as is any other non-callable head.
//! 3. The arguments are scanned once, left to right. The first `x` is
//!    replaced by the carried value; the first `*x` is replaced by the carried
//!    value's elements. With no marker, the carried value is passed as the
//!    first argument. A second marker in the same step is a usage error.
//! 4. The head is invoked and its result becomes the carried value.
//!
//! Errors abort the run at the failing step. Nothing is validated up front,
//! so steps before the failing one have already run.
//!
//! [`STOP`]: crate::func::STOP

use std::borrow::Cow;

use tracing::{debug, debug_span, trace};

use crate::errors::ThreadError;
use crate::func::{Callable, Func};
use crate::step::{Arg, Step};
use crate::value::Value;

/// Threads `value` through `steps`.
///
/// ```
/// use threadx::{func, thread, Step, Value, X};
///
/// let add = func("add", |args| {
///     Ok(Value::Int(args.iter().filter_map(Value::as_int).sum()))
/// });
/// let out = thread(1, [Step::from((add.clone(), 10)), Step::from((add, 100, X))]);
/// assert_eq!(out.unwrap(), Value::Int(111));
/// ```
pub fn thread<I>(value: impl Into<Value>, steps: I) -> Result<Value, ThreadError>
where
    I: IntoIterator,
    I::Item: Into<Step>,
{
    steps.into_iter().collect::<Pipeline>().run(value)
}

/// Threads a value through steps written inline.
///
/// Each step may be a bare term or a tuple `(callable, args...)`.
///
/// ```
/// use threadx::{thread, builtins, Value, X, STOP};
///
/// let out = thread!(Value::list(vec![1, 2, 3, 4]), builtins::sum(), STOP, builtins::to_str());
/// assert_eq!(out.unwrap(), Value::Int(10));
///
/// let out = thread!(10, (builtins::range(), 0, X, 2), builtins::len());
/// assert_eq!(out.unwrap(), Value::Int(5));
/// ```
#[macro_export]
macro_rules! thread {
    ($value:expr $(, $step:expr)* $(,)?) => {{
        let steps: ::std::vec::Vec<$crate::Step> = ::std::vec![$($crate::Step::from($step)),*];
        $crate::thread($value, steps)
    }};
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A reusable sequence of steps.
///
/// Running a pipeline only borrows it, so the same definition can be applied
/// to many inputs.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// An empty pipeline; running it returns the input unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn then(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// Appends a step in place.
    pub fn push(&mut self, step: impl Into<Step>) {
        self.steps.push(step.into());
    }

    /// The steps, in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the pipeline on `value`.
    pub fn run(&self, value: impl Into<Value>) -> Result<Value, ThreadError> {
        let span = debug_span!("thread", steps = self.steps.len());
        let _guard = span.enter();

        let mut current = value.into();
        for (index, step) in self.steps.iter().enumerate() {
            let func = match step.head() {
                Arg::Value(Value::Func(f)) if f.is_stop() => {
                    debug!(index, "stop marker reached");
                    return Ok(current);
                }
                Arg::Current => return Err(ThreadError::PlaceholderHead),
                Arg::Unpack => return Err(ThreadError::UnpackHead),
                Arg::Value(Value::Func(f)) => f,
                Arg::Value(other) => {
                    return Err(ThreadError::NotCallable {
                        type_name: other.type_name(),
                        value: other.to_string(),
                    })
                }
            };
            trace!(index, head = %func.name(), "invoking step");
            let args = realize_args(step.args(), current)?;
            current = func.call(args)?;
        }
        Ok(current)
    }
}

impl<S: Into<Step>> FromIterator<S> for Pipeline {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            steps: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<Step>> Extend<S> for Pipeline {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.steps.extend(iter.into_iter().map(Into::into));
    }
}

/// A pipeline is itself a one-argument callable, so it can be nested as a
/// step or handed to higher-order builtins.
impl Callable for Pipeline {
    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(format!("pipeline[{}]", self.steps.len()))
    }

    fn call(&self, args: Vec<Value>) -> Result<Value, ThreadError> {
        match <[Value; 1]>::try_from(args) {
            Ok([input]) => self.run(input),
            Err(args) => Err(ThreadError::Arity {
                name: self.name().into_owned(),
                expected: "1",
                given: args.len(),
            }),
        }
    }
}

impl From<Pipeline> for Func {
    fn from(pipeline: Pipeline) -> Self {
        Func::new(pipeline)
    }
}

/// Builds the final argument list for one step.
fn realize_args(args: &[Arg], current: Value) -> Result<Vec<Value>, ThreadError> {
    let mut out = Vec::with_capacity(args.len() + 1);
    let mut carried = Some(current);
    for (position, arg) in args.iter().enumerate() {
        match arg {
            Arg::Value(v) => out.push(v.clone()),
            Arg::Current | Arg::Unpack => {
                let Some(value) = carried.take() else {
                    return Err(ThreadError::ExtraMarker { position });
                };
                if matches!(arg, Arg::Unpack) {
                    out.extend(value.into_items()?);
                } else {
                    out.push(value);
                }
            }
        }
    }
    if let Some(value) = carried {
        out.insert(0, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::{func, STOP};
    use crate::placeholder::X;
    use pretty_assertions::assert_eq;

    fn return_args() -> Func {
        func("return_args", |args| Ok(Value::List(args)))
    }

    #[test]
    fn realize_prepends_without_markers() {
        let args = realize_args(&[Arg::from(1), Arg::from(2)], Value::Int(0)).unwrap();
        assert_eq!(args, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn realize_substitutes_first_marker() {
        let args = realize_args(&[Arg::from(1), Arg::Current], Value::Int(0)).unwrap();
        assert_eq!(args, vec![Value::Int(1), Value::Int(0)]);

        let args = realize_args(&[Arg::Unpack, Arg::from(9)], Value::list(vec![1, 2])).unwrap();
        assert_eq!(args, vec![Value::Int(1), Value::Int(2), Value::Int(9)]);
    }

    #[test]
    fn realize_rejects_a_second_marker() {
        let err = realize_args(&[Arg::Unpack, Arg::Current], Value::list(vec![1])).unwrap_err();
        assert!(matches!(err, ThreadError::ExtraMarker { position: 1 }));
    }

    #[test]
    fn empty_pipeline_is_identity() {
        assert_eq!(Pipeline::new().run(5).unwrap(), Value::Int(5));
        assert!(Pipeline::new().is_empty());
    }

    #[test]
    fn pipelines_are_reusable() {
        let pipeline = Pipeline::new().then((return_args(), 1)).then(X.item(0) + 1);
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.run(1).unwrap(), Value::Int(2));
        assert_eq!(pipeline.run(41).unwrap(), Value::Int(42));
    }

    #[test]
    fn pipelines_nest() {
        let inner = Pipeline::new().then(X * 2);
        let outer = Pipeline::new().then(Func::from(inner)).then(X + 1);
        assert_eq!(outer.run(5).unwrap(), Value::Int(11));
    }

    #[test]
    fn stop_returns_current_value() {
        let pipeline: Pipeline = vec![Step::from(X + 1), Step::from(STOP), Step::from(X + 100)]
            .into_iter()
            .collect();
        assert_eq!(pipeline.run(1).unwrap(), Value::Int(2));
    }
}

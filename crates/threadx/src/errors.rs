//! Error type for threading a value through a pipeline.
//!
//! [`ThreadError`] covers three families of failure:
//!
//! - **Usage errors**: a step is malformed (its head is not callable, or a
//!   marker sits where a callable was required). Raised at the step that is
//!   malformed; earlier steps have already run.
//! - **Evaluation errors**: a deferred expression, attribute capture or
//!   builtin callable could not be applied to the value it received (missing
//!   key, unsupported operand, ...).
//! - **Callable errors**: anything a caller-supplied callable returned. These
//!   are carried unchanged in [`ThreadError::Callable`].

use thiserror::Error;

use crate::ops::BinOp;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors produced while running a pipeline or evaluating a deferred value.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// The leading element of a step cannot be invoked.
    #[error("First thing in a step needs to be a callable. Got <{type_name}>:{value}")]
    NotCallable {
        /// Type name of the offending value.
        type_name: String,
        /// Rendering of the offending value.
        value: String,
    },

    /// The placeholder `x` was used as the leading element of a step.
    #[error("x cannot be the first thing.")]
    PlaceholderHead,

    /// The unpack marker `*x` was used as the leading element of a step.
    #[error("*x cannot be the first thing.")]
    UnpackHead,

    /// A step's arguments contain more than one placeholder or unpack marker.
    ///
    /// Only the first marker is a substitution point; a marker has no value
    /// of its own, so any later one cannot be passed through.
    #[error("only one x or *x is allowed per step; found another at argument {position}")]
    ExtraMarker {
        /// Zero-based position of the second marker within the step's arguments.
        position: usize,
    },

    /// A binary operator is not defined for the given operand types.
    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    UnsupportedOperand {
        /// The operator that was applied.
        op: BinOp,
        /// Type name of the left operand.
        left: String,
        /// Type name of the right operand.
        right: String,
    },

    /// Division, floor division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed `i64`.
    #[error("integer overflow in {op}")]
    Overflow {
        /// The operator that overflowed.
        op: BinOp,
    },

    /// A shift was requested with a negative count.
    #[error("negative shift count")]
    NegativeShift,

    /// Integer index outside the bounds of a sequence.
    #[error("{type_name} index out of range: {index}")]
    IndexOutOfRange {
        /// Type name of the indexed value.
        type_name: String,
        /// The requested index.
        index: i64,
    },

    /// Map lookup for a key that is not present.
    #[error("key not found: {key}")]
    KeyNotFound {
        /// Rendering of the missing key.
        key: String,
    },

    /// The key's type cannot index the value (e.g. a string key on a list).
    #[error("{type_name} indices must be {expected}, not {key_type}")]
    InvalidKey {
        /// Type name of the indexed value.
        type_name: String,
        /// What kind of key the value accepts.
        expected: &'static str,
        /// Type name of the supplied key.
        key_type: String,
    },

    /// The value does not support item lookup at all.
    #[error("'{type_name}' object is not subscriptable")]
    NotSubscriptable {
        /// Type name of the value.
        type_name: String,
    },

    /// A slice with a step of zero.
    #[error("slice step cannot be zero")]
    ZeroSliceStep,

    /// Attribute lookup for a name the value does not have.
    #[error("'{type_name}' object has no attribute '{name}'")]
    NoAttribute {
        /// Type name of the value.
        type_name: String,
        /// The attribute that was requested.
        name: String,
    },

    /// Arguments were supplied to an attribute that resolved to a non-callable.
    #[error("'{type_name}.{name}' is not callable but {extra} argument(s) were supplied")]
    AttributeNotCallable {
        /// Type name of the value the attribute was resolved on.
        type_name: String,
        /// The attribute name.
        name: String,
        /// Number of arguments that would have been dropped.
        extra: usize,
    },

    /// The value cannot be spread into an argument list or iterated.
    #[error("'{type_name}' object is not iterable")]
    NotIterable {
        /// Type name of the value.
        type_name: String,
    },

    /// A callable received the wrong number of arguments.
    #[error("{name}() takes {expected} argument(s) but {given} were given")]
    Arity {
        /// Name of the callable.
        name: String,
        /// Human-readable description of the accepted count (e.g. `"1 or 2"`).
        expected: &'static str,
        /// Number of arguments received.
        given: usize,
    },

    /// A callable received an argument of the wrong type or an unusable value.
    #[error("{name}() expected {expected}, got '{got}'")]
    ArgumentType {
        /// Name of the callable.
        name: String,
        /// Description of the expected type.
        expected: &'static str,
        /// Type name of the received value.
        got: String,
    },

    /// A value holding a callable or an opaque object was converted to JSON.
    #[error("'{type_name}' value cannot be represented as JSON")]
    NotJson {
        /// Type name of the value.
        type_name: String,
    },

    /// An error returned by a caller-supplied callable, propagated unchanged.
    #[error(transparent)]
    Callable(anyhow::Error),
}

impl ThreadError {
    /// Returns `true` for errors caused by a malformed step rather than by
    /// evaluating one.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::NotCallable { .. }
                | Self::PlaceholderHead
                | Self::UnpackHead
                | Self::ExtraMarker { .. }
        )
    }

    /// Wraps an error returned by a caller-supplied callable.
    ///
    /// If the error already is a [`ThreadError`] (for example a nested
    /// [`crate::thread`] call failed inside the callable) it is returned as is.
    pub fn from_callable(err: anyhow::Error) -> Self {
        match err.downcast::<ThreadError>() {
            Ok(inner) => inner,
            Err(err) => Self::Callable(err),
        }
    }
}

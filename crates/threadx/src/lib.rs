//! Thread a value through a sequence of steps.
//!
//! [`thread`] passes an initial value to the first step, that step's result
//! to the next, and so on. Inside a step's arguments the placeholder [`X`]
//! stands for the previous result, and deferred forms built from it
//! (`X.item(..)`, `X.attr(..)`, `X + 1`) are applied to it. [`STOP`] ends a
//! pipeline early.
//!
//! ```
//! use serde_json::json;
//! use threadx::{builtins, thread, Value, X};
//!
//! let data = Value::from(json!({"a": {"b": [10, 12]}}));
//! assert_eq!(thread!(data.clone(), X.item("a").item("b").item(0)).unwrap(), Value::Int(10));
//!
//! // (map, x["a"]["b"][1], x) then sum
//! let out = thread!(
//!     Value::list(vec![data.clone(), data]),
//!     (builtins::map(), X.item("a").item("b").item(1), X),
//!     builtins::sum(),
//! );
//! assert_eq!(out.unwrap(), Value::Int(24));
//! ```
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`value`] | The dynamic [`Value`] and the [`Object`] trait for caller types |
//! | [`func`] | [`Callable`], [`Func`], the [`STOP`] marker |
//! | [`ops`] | The [`BinOp`] operator table |
//! | [`lookup`] | Item lookup [`Key`]s and [`Slice`]s |
//! | [`attrs`] | Attribute resolution on builtin values |
//! | [`placeholder`] | [`X`], [`Unpack`], deferred [`Expr`]essions, [`AttrCapture`] |
//! | [`step`] | [`Arg`] and [`Step`] |
//! | [`runner`] | [`thread`] and [`Pipeline`] |
//! | [`builtins`] | Ready-made callables (`sum`, `map`, `range`, ...) |
//! | [`errors`] | [`ThreadError`] |

pub mod attrs;
pub mod builtins;
pub mod errors;
pub mod func;
pub mod lookup;
pub mod ops;
pub mod placeholder;
pub mod runner;
pub mod step;
pub mod value;

// Re-export the working set at the crate root.
pub use errors::ThreadError;
pub use func::{func, Callable, Func, Stop, STOP};
pub use lookup::{Key, Slice};
pub use ops::BinOp;
pub use placeholder::{AttrCapture, Expr, ExtraArgs, Operand, Placeholder, Unpack, X};
pub use runner::{thread, Pipeline};
pub use step::{Arg, Step};
pub use value::{Map, Object, Value};

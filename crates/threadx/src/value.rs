//! The dynamic value threaded through a pipeline.
//!
//! A pipeline carries one [`Value`] from step to step. Steps are arbitrary
//! callables, so the value model is deliberately open: JSON-shaped data
//! (`None`, booleans, numbers, strings, lists, insertion-ordered maps), first
//! class callables ([`Func`]), and caller-defined objects implementing
//! [`Object`] so that attribute captures (`x.name`) can resolve on them.
//!
//! Equality is structural for data and by identity for callables and objects.
//! Numbers compare across `Bool`, `Int` and `Float` (`true == 1`, `2 == 2.0`).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::errors::ThreadError;
use crate::func::Func;

/// Insertion-ordered string-keyed map used for `dict` values.
pub type Map = IndexMap<String, Value>;

// ---------------------------------------------------------------------------
// Caller-defined objects
// ---------------------------------------------------------------------------

/// A caller-defined value with named attributes.
///
/// Attribute captures (`X.attr("name")`) resolve through [`Object::get_attr`].
/// Methods are exposed by returning a [`Value::Func`] that closes over whatever
/// state the method needs; plain attributes are returned as data.
pub trait Object: fmt::Debug + Send + Sync {
    /// Name used in error messages and in the default rendering.
    fn type_name(&self) -> &str;

    /// Looks up an attribute or method by name.
    fn get_attr(&self, name: &str) -> Option<Value>;

    /// Item lookup (`obj[key]`). Objects are not subscriptable unless they
    /// override this.
    fn get_item(&self, key: &Value) -> Result<Value, ThreadError> {
        let _ = key;
        Err(ThreadError::NotSubscriptable {
            type_name: self.type_name().to_string(),
        })
    }

    /// Human-readable rendering used by `Display`.
    fn render(&self) -> String {
        format!("<{} object>", self.type_name())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    None,
    /// A boolean. Behaves as `0`/`1` in arithmetic.
    Bool(bool),
    /// A signed 64-bit integer.
    Int(i64),
    /// A double-precision float.
    Float(f64),
    /// A UTF-8 string.
    Str(String),
    /// An ordered sequence.
    List(Vec<Value>),
    /// An insertion-ordered map with string keys.
    Map(Map),
    /// A callable.
    Func(Func),
    /// A caller-defined object.
    Object(Arc<dyn Object>),
}

impl Value {
    /// Wraps a caller-defined object.
    pub fn object(obj: impl Object + 'static) -> Self {
        Self::Object(Arc::new(obj))
    }

    /// Builds a list value from anything convertible into values.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Name of the value's type, as shown in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Self::None => "NoneType".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::Int(_) => "int".to_string(),
            Self::Float(_) => "float".to_string(),
            Self::Str(_) => "str".to_string(),
            Self::List(_) => "list".to_string(),
            Self::Map(_) => "dict".to_string(),
            Self::Func(_) => "function".to_string(),
            Self::Object(obj) => obj.type_name().to_string(),
        }
    }

    /// Returns `true` if the value can be invoked.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Func(_))
    }

    /// Returns the callable if this value is one.
    pub fn as_func(&self) -> Option<&Func> {
        match self {
            Self::Func(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the integer if this value is an `Int` or a `Bool`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns the string slice if this value is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness: `None`, `false`, zero, and empty containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
            Self::Func(_) | Self::Object(_) => true,
        }
    }

    /// The elements produced by iterating this value: list items, the
    /// characters of a string, or the keys of a map.
    pub fn into_items(self) -> Result<Vec<Value>, ThreadError> {
        match self {
            Self::List(items) => Ok(items),
            Self::Str(s) => Ok(s.chars().map(|c| Self::Str(c.to_string())).collect()),
            Self::Map(map) => Ok(map.into_keys().map(Self::Str).collect()),
            other => Err(ThreadError::NotIterable {
                type_name: other.type_name(),
            }),
        }
    }

    /// Converts the value into a JSON document.
    ///
    /// Fails for callables and caller-defined objects.
    pub fn to_json(&self) -> Result<serde_json::Value, ThreadError> {
        serde_json::to_value(self).map_err(|_| ThreadError::NotJson {
            type_name: self.first_non_json().type_name(),
        })
    }

    fn first_non_json(&self) -> &Value {
        match self {
            Self::List(items) => items
                .iter()
                .map(Self::first_non_json)
                .find(|v| matches!(v, Self::Func(_) | Self::Object(_)))
                .unwrap_or(self),
            Self::Map(map) => map
                .values()
                .map(Self::first_non_json)
                .find(|v| matches!(v, Self::Func(_) | Self::Object(_)))
                .unwrap_or(self),
            _ => self,
        }
    }

    /// Writes the value the way it appears inside a container: strings are
    /// quoted, everything else renders as with `Display`.
    pub(crate) fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// Renders a value with strings quoted.
pub(crate) struct Repr<'a>(pub &'a Value);

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_repr(f)
    }
}

fn fmt_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_nan() {
        write!(f, "nan")
    } else if x.is_infinite() {
        write!(f, "{}", if x > 0.0 { "inf" } else { "-inf" })
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{x:.1}")
    } else {
        write!(f, "{x}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => fmt_float(*x, f),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_repr(f)?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: ")?;
                    value.fmt_repr(f)?;
                }
                write!(f, "}}")
            }
            Self::Func(func) => write!(f, "<function {}>", func.name()),
            Self::Object(obj) => write!(f, "{}", obj.render()),
        }
    }
}

// ---------------------------------------------------------------------------
// Equality
// ---------------------------------------------------------------------------

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v == w))
            }
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Float(x), n) | (n, Value::Float(x)) => n.as_int().is_some_and(|i| i as f64 == *x),
            _ => match (self.as_int(), other.as_int()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(map)
    }
}

impl From<Func> for Value {
    fn from(func: Func) -> Self {
        Self::Func(func)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl TryFrom<Value> for serde_json::Value {
    type Error = ThreadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.to_json()
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Self::Func(_) | Self::Object(_) => Err(S::Error::custom(format!(
                "'{}' value cannot be serialized",
                self.type_name()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Into::into)
    }
}

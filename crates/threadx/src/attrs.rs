//! Attribute resolution for `x.name` captures.
//!
//! Caller-defined objects answer through [`Object::get_attr`]. Builtin values
//! expose a small method table; each method is returned as a callable bound
//! to the receiver.
//!
//! [`Object::get_attr`]: crate::value::Object::get_attr

use crate::errors::ThreadError;
use crate::func::func;
use crate::value::{Map, Value};

type Method = fn(&Value, &[Value]) -> Result<Value, ThreadError>;

impl Value {
    /// Resolves attribute `name` on this value.
    ///
    /// Methods of builtin values come back as [`Value::Func`] bound to a copy
    /// of the receiver.
    pub fn get_attr(&self, name: &str) -> Result<Value, ThreadError> {
        if let Value::Object(obj) = self {
            return obj.get_attr(name).ok_or_else(|| ThreadError::NoAttribute {
                type_name: self.type_name(),
                name: name.to_string(),
            });
        }
        let method = builtin_method(self, name).ok_or_else(|| ThreadError::NoAttribute {
            type_name: self.type_name(),
            name: name.to_string(),
        })?;
        let receiver = self.clone();
        let qualified = format!("{}.{name}", self.type_name());
        Ok(Value::Func(func(qualified, move |args| {
            method(&receiver, &args).map_err(anyhow::Error::from)
        })))
    }
}

fn builtin_method(value: &Value, name: &str) -> Option<Method> {
    let method: Method = match (value, name) {
        (Value::Str(_) | Value::List(_) | Value::Map(_), "__len__") => len,
        (Value::Str(_), "upper") => |v: &Value, args: &[Value]| {
            arity("upper", args, 0)?;
            Ok(Value::Str(text(v).to_uppercase()))
        },
        (Value::Str(_), "lower") => |v: &Value, args: &[Value]| {
            arity("lower", args, 0)?;
            Ok(Value::Str(text(v).to_lowercase()))
        },
        (Value::Str(_), "strip") => |v: &Value, args: &[Value]| {
            arity("strip", args, 0)?;
            Ok(Value::Str(text(v).trim().to_string()))
        },
        (Value::Str(_), "split") => str_split,
        (Value::Str(_), "startswith") => |v: &Value, args: &[Value]| {
            arity("startswith", args, 1)?;
            let prefix = str_arg("startswith", &args[0])?;
            Ok(Value::Bool(text(v).starts_with(prefix)))
        },
        (Value::Str(_), "endswith") => |v: &Value, args: &[Value]| {
            arity("endswith", args, 1)?;
            let suffix = str_arg("endswith", &args[0])?;
            Ok(Value::Bool(text(v).ends_with(suffix)))
        },
        (Value::Str(_), "replace") => |v: &Value, args: &[Value]| {
            arity("replace", args, 2)?;
            let from = str_arg("replace", &args[0])?;
            let to = str_arg("replace", &args[1])?;
            Ok(Value::Str(text(v).replace(from, to)))
        },
        (Value::Str(_), "join") => str_join,
        (Value::List(_) | Value::Str(_), "count") => count,
        (Value::List(_) | Value::Str(_), "index") => index,
        (Value::List(_) | Value::Str(_) | Value::Map(_), "__contains__") => contains,
        (Value::List(_) | Value::Map(_), "copy") => |v: &Value, args: &[Value]| {
            arity("copy", args, 0)?;
            Ok(v.clone())
        },
        (Value::Map(_), "keys") => |v: &Value, args: &[Value]| {
            arity("keys", args, 0)?;
            Ok(Value::List(entries(v).keys().cloned().map(Value::Str).collect()))
        },
        (Value::Map(_), "values") => |v: &Value, args: &[Value]| {
            arity("values", args, 0)?;
            Ok(Value::List(entries(v).values().cloned().collect()))
        },
        (Value::Map(_), "items") => |v: &Value, args: &[Value]| {
            arity("items", args, 0)?;
            Ok(Value::List(
                entries(v)
                    .iter()
                    .map(|(k, v)| Value::List(vec![Value::Str(k.clone()), v.clone()]))
                    .collect(),
            ))
        },
        (Value::Map(_), "get") => map_get,
        _ => return None,
    };
    Some(method)
}

// ---------------------------------------------------------------------------
// Method bodies
// ---------------------------------------------------------------------------

fn len(v: &Value, args: &[Value]) -> Result<Value, ThreadError> {
    arity("__len__", args, 0)?;
    let n = match v {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        _ => 0,
    };
    Ok(Value::from(n))
}

fn count(v: &Value, args: &[Value]) -> Result<Value, ThreadError> {
    arity("count", args, 1)?;
    let n = match v {
        Value::Str(s) => {
            let needle = str_arg("count", &args[0])?;
            if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            }
        }
        Value::List(items) => items.iter().filter(|item| **item == args[0]).count(),
        _ => 0,
    };
    Ok(Value::from(n))
}

fn index(v: &Value, args: &[Value]) -> Result<Value, ThreadError> {
    arity("index", args, 1)?;
    let found = match v {
        Value::Str(s) => {
            let needle = str_arg("index", &args[0])?;
            s.find(needle).map(|byte| s[..byte].chars().count())
        }
        Value::List(items) => items.iter().position(|item| *item == args[0]),
        _ => None,
    };
    found.map(Value::from).ok_or_else(|| ThreadError::KeyNotFound {
        key: args[0].to_string(),
    })
}

fn contains(v: &Value, args: &[Value]) -> Result<Value, ThreadError> {
    arity("__contains__", args, 1)?;
    let found = match v {
        Value::Str(s) => s.contains(str_arg("__contains__", &args[0])?),
        Value::List(items) => items.contains(&args[0]),
        Value::Map(map) => args[0].as_str().is_some_and(|k| map.contains_key(k)),
        _ => false,
    };
    Ok(Value::Bool(found))
}

fn str_split(v: &Value, args: &[Value]) -> Result<Value, ThreadError> {
    let s = text(v);
    let parts: Vec<Value> = match args {
        [] => s.split_whitespace().map(Value::from).collect(),
        [sep] => {
            let sep = str_arg("split", sep)?;
            if sep.is_empty() {
                return Err(ThreadError::ArgumentType {
                    name: "split".to_string(),
                    expected: "non-empty separator",
                    got: "empty str".to_string(),
                });
            }
            s.split(sep).map(Value::from).collect()
        }
        _ => {
            return Err(ThreadError::Arity {
                name: "split".to_string(),
                expected: "0 or 1",
                given: args.len(),
            })
        }
    };
    Ok(Value::List(parts))
}

fn str_join(v: &Value, args: &[Value]) -> Result<Value, ThreadError> {
    arity("join", args, 1)?;
    let parts = args[0]
        .clone()
        .into_items()?
        .iter()
        .map(|item| str_arg("join", item).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Str(parts.join(text(v))))
}

fn map_get(v: &Value, args: &[Value]) -> Result<Value, ThreadError> {
    let (key, default) = match args {
        [key] => (key, Value::None),
        [key, default] => (key, default.clone()),
        _ => {
            return Err(ThreadError::Arity {
                name: "get".to_string(),
                expected: "1 or 2",
                given: args.len(),
            })
        }
    };
    Ok(key
        .as_str()
        .and_then(|k| entries(v).get(k).cloned())
        .unwrap_or(default))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn text(v: &Value) -> &str {
    v.as_str().unwrap_or_default()
}

fn entries(v: &Value) -> &Map {
    static EMPTY: std::sync::OnceLock<Map> = std::sync::OnceLock::new();
    match v {
        Value::Map(map) => map,
        _ => EMPTY.get_or_init(Map::new),
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), ThreadError> {
    if args.len() == expected {
        return Ok(());
    }
    Err(ThreadError::Arity {
        name: name.to_string(),
        expected: match expected {
            0 => "0",
            1 => "1",
            _ => "2",
        },
        given: args.len(),
    })
}

fn str_arg<'a>(name: &str, arg: &'a Value) -> Result<&'a str, ThreadError> {
    arg.as_str().ok_or_else(|| ThreadError::ArgumentType {
        name: name.to_string(),
        expected: "str",
        got: arg.type_name(),
    })
}

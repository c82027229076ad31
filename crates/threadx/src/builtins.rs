//! Ready-made callables for common pipeline steps.
//!
//! Each function returns a fresh [`Func`]. They behave like the familiar
//! builtins of dynamic languages, eagerly producing lists where those would
//! produce iterators.

use crate::errors::ThreadError;
use crate::func::{func, Func};
use crate::ops::BinOp;
use crate::value::Value;

/// `sum(iterable[, start])`: adds the items to `start` (default `0`).
pub fn sum() -> Func {
    func("sum", |args| {
        let (items, start) = match <[Value; 2]>::try_from(args) {
            Ok([items, start]) => (items, start),
            Err(mut args) if args.len() == 1 => (args.remove(0), Value::Int(0)),
            Err(args) => return Err(arity("sum", "1 or 2", args.len()).into()),
        };
        let total = items
            .into_items()?
            .iter()
            .try_fold(start, |acc, item| BinOp::Add.apply(&acc, item))?;
        Ok(total)
    })
}

/// `len(value)`: number of items, characters or keys.
pub fn len() -> Func {
    func("len", |args| {
        let [value] = one("len", args)?;
        let n = match &value {
            Value::Str(s) => s.chars().count(),
            Value::List(items) => items.len(),
            Value::Map(map) => map.len(),
            other => {
                return Err(ThreadError::ArgumentType {
                    name: "len".to_string(),
                    expected: "a sized value",
                    got: other.type_name(),
                }
                .into())
            }
        };
        Ok(Value::from(n))
    })
}

/// `map(f, iterable, ...)`: applies `f` to items drawn in lock step from each
/// iterable, stopping at the shortest.
pub fn map() -> Func {
    func("map", |mut args| {
        if args.len() < 2 {
            return Err(arity("map", "at least 2", args.len()).into());
        }
        let f = callable("map", args.remove(0))?;
        let columns = args
            .into_iter()
            .map(Value::into_items)
            .collect::<Result<Vec<_>, _>>()?;
        let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
        let out = (0..rows)
            .map(|i| f.call(columns.iter().map(|c| c[i].clone()).collect()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::List(out))
    })
}

/// `filter(f, iterable)`: keeps items for which `f` returns a truthy value.
/// With `None` as `f`, keeps truthy items.
pub fn filter() -> Func {
    func("filter", |args| {
        let [f, items] = two("filter", args)?;
        let predicate = match f {
            Value::None => None,
            other => Some(callable("filter", other)?),
        };
        let mut out = Vec::new();
        for item in items.into_items()? {
            let keep = match &predicate {
                Some(p) => p.call(vec![item.clone()])?.is_truthy(),
                None => item.is_truthy(),
            };
            if keep {
                out.push(item);
            }
        }
        Ok(Value::List(out))
    })
}

/// `range(stop)` or `range(start, stop[, step])` as a list of integers.
pub fn range() -> Func {
    func("range", |args| {
        let ints = args
            .iter()
            .map(|a| {
                a.as_int().ok_or_else(|| ThreadError::ArgumentType {
                    name: "range".to_string(),
                    expected: "int",
                    got: a.type_name(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let (start, stop, step) = match ints[..] {
            [stop] => (0, stop, 1),
            [start, stop] => (start, stop, 1),
            [start, stop, step] => (start, stop, step),
            _ => return Err(arity("range", "1 to 3", ints.len()).into()),
        };
        if step == 0 {
            anyhow::bail!("range() arg 3 must not be zero");
        }
        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            out.push(Value::Int(i));
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(Value::List(out))
    })
}

/// `list(iterable)`: the items of a list, the characters of a string or the
/// keys of a map.
pub fn to_list() -> Func {
    func("list", |args| {
        let [value] = one("list", args)?;
        Ok(Value::List(value.into_items()?))
    })
}

/// `str(value)`: the value's display form.
pub fn to_str() -> Func {
    func("str", |args| {
        let [value] = one("str", args)?;
        Ok(Value::Str(value.to_string()))
    })
}

/// Returns its single argument.
pub fn identity() -> Func {
    func("identity", |args| {
        let [value] = one("identity", args)?;
        Ok(value)
    })
}

fn arity(name: &str, expected: &'static str, given: usize) -> ThreadError {
    ThreadError::Arity {
        name: name.to_string(),
        expected,
        given,
    }
}

fn one(name: &str, args: Vec<Value>) -> Result<[Value; 1], ThreadError> {
    <[Value; 1]>::try_from(args).map_err(|args| arity(name, "1", args.len()))
}

fn two(name: &str, args: Vec<Value>) -> Result<[Value; 2], ThreadError> {
    <[Value; 2]>::try_from(args).map_err(|args| arity(name, "2", args.len()))
}

fn callable(name: &str, value: Value) -> Result<Func, ThreadError> {
    match value {
        Value::Func(f) => Ok(f),
        other => Err(ThreadError::ArgumentType {
            name: name.to_string(),
            expected: "a callable",
            got: other.type_name(),
        }),
    }
}

//! Item lookup keys: indices, map keys and slices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ThreadError;
use crate::value::{Repr, Value};

/// A `start:stop:step` slice. Missing bounds default the way sequence slicing
/// usually does; negative bounds count from the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    /// First index (inclusive).
    pub start: Option<i64>,
    /// Last index (exclusive).
    pub stop: Option<i64>,
    /// Stride; must not be zero.
    pub step: Option<i64>,
}

impl Slice {
    /// The full slice `[:]`.
    pub fn full() -> Self {
        Self::default()
    }

    /// `[start:stop]`.
    pub fn range(start: i64, stop: i64) -> Self {
        Self {
            start: Some(start),
            stop: Some(stop),
            step: None,
        }
    }

    /// Returns a copy with the given stride.
    #[must_use]
    pub fn step_by(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    /// Indices selected from a sequence of `len` elements, in order.
    pub fn indices(&self, len: usize) -> Result<Vec<usize>, ThreadError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ThreadError::ZeroSliceStep);
        }
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let clamp = |bound: i64, low: i64, high: i64| {
            let bound = if bound < 0 { bound + len } else { bound };
            bound.clamp(low, high)
        };
        let mut out = Vec::new();
        if step > 0 {
            let start = self.start.map_or(0, |s| clamp(s, 0, len));
            let stop = self.stop.map_or(len, |s| clamp(s, 0, len));
            let mut i = start;
            while i < stop {
                out.push(i);
                let Some(next) = i.checked_add(step) else { break };
                i = next;
            }
        } else {
            let start = self.start.map_or(len - 1, |s| clamp(s, -1, len - 1));
            let stop = self.stop.map_or(-1, |s| clamp(s, -1, len - 1));
            let mut i = start;
            while i > stop {
                out.push(i);
                let Some(next) = i.checked_add(step) else { break };
                i = next;
            }
        }
        Ok(out.into_iter().filter_map(|i| usize::try_from(i).ok()).collect())
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |b: Option<i64>| b.map(|b| b.to_string()).unwrap_or_default();
        write!(f, "{}:{}", part(self.start), part(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

/// One item lookup: `[key]` or `[slice]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// An index into a sequence or a key into a map.
    Item(Value),
    /// A slice of a sequence.
    Slice(Slice),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Item(v) => write!(f, "[{}]", Repr(v)),
            Key::Slice(s) => write!(f, "[{s}]"),
        }
    }
}

impl From<Slice> for Key {
    fn from(slice: Slice) -> Self {
        Key::Slice(slice)
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key::Item(value)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Item(s.into())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Item(s.into())
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Item(i.into())
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Item(i.into())
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Item(i.into())
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

impl Value {
    /// Looks up `key` in this value (`self[key]`).
    pub fn get_item(&self, key: &Key) -> Result<Value, ThreadError> {
        match (self, key) {
            (Value::List(items), Key::Item(k)) => {
                let i = sequence_index(self, k, items.len())?;
                Ok(items[i].clone())
            }
            (Value::Str(s), Key::Item(k)) => {
                let chars: Vec<char> = s.chars().collect();
                let i = sequence_index(self, k, chars.len())?;
                Ok(Value::Str(chars[i].to_string()))
            }
            (Value::List(items), Key::Slice(slice)) => Ok(Value::List(
                slice
                    .indices(items.len())?
                    .into_iter()
                    .map(|i| items[i].clone())
                    .collect(),
            )),
            (Value::Str(s), Key::Slice(slice)) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::Str(
                    slice.indices(chars.len())?.into_iter().map(|i| chars[i]).collect(),
                ))
            }
            (Value::Map(map), Key::Item(k)) => match k {
                Value::Str(name) => map.get(name).cloned().ok_or_else(|| ThreadError::KeyNotFound {
                    key: Repr(k).to_string(),
                }),
                _ => Err(ThreadError::KeyNotFound {
                    key: Repr(k).to_string(),
                }),
            },
            (Value::Map(_), Key::Slice(_)) => Err(ThreadError::InvalidKey {
                type_name: self.type_name(),
                expected: "str",
                key_type: "slice".to_string(),
            }),
            (Value::Object(obj), Key::Item(k)) => obj.get_item(k),
            _ => Err(ThreadError::NotSubscriptable {
                type_name: self.type_name(),
            }),
        }
    }
}

fn sequence_index(seq: &Value, key: &Value, len: usize) -> Result<usize, ThreadError> {
    let index = match key {
        Value::Int(i) => *i,
        Value::Bool(b) => i64::from(*b),
        other => {
            return Err(ThreadError::InvalidKey {
                type_name: seq.type_name(),
                expected: "integers or slices",
                key_type: other.type_name(),
            })
        }
    };
    let out_of_range = || ThreadError::IndexOutOfRange {
        type_name: seq.type_name(),
        index,
    };
    let len_i = i64::try_from(len).map_err(|_| out_of_range())?;
    let resolved = if index < 0 { index + len_i } else { index };
    if (0..len_i).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| out_of_range())
    } else {
        Err(out_of_range())
    }
}

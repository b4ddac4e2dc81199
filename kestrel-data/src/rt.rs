// kestrel-data - Generic collection operations
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Collection primitives over any [`Value`], as the evaluator calls them.
//!
//! These dispatch on the value's variant and defer to the capability traits
//! in [`coll`](crate::coll). Nil is accepted everywhere and behaves as an
//! empty collection: `get` gives the default, `assoc` starts a new map,
//! `conj` starts a new list, `peek` and `pop` give nil.

use crate::array_map::ArrayMap;
use crate::coll::{Associative, Stack};
use crate::error::{Error, Result};
use crate::list::List;
use crate::map::PersistentMap;
use crate::seq::{cons, seq};
use crate::value::Value;

/// Number of elements. O(1) for collections; sequences are walked.
pub fn count(coll: &Value) -> Result<usize> {
    if let Some(n) = coll.counted_len() {
        return Ok(n);
    }
    match coll {
        Value::String(s) => Ok(s.chars().count()),
        Value::Seq(_) | Value::LazySeq(_) => match seq(coll)? {
            Some(s) => s.count(),
            None => Ok(0),
        },
        other => Err(Error::type_error_in("count", "countable", other.type_name())),
    }
}

/// Look up `key`, returning `not_found` when it's absent or `coll` has no
/// keyed lookup.
pub fn get(coll: &Value, key: &Value, not_found: Value) -> Value {
    match coll {
        Value::Map(m) => m.get(key).cloned().unwrap_or(not_found),
        Value::Vector(v) => v.get_or(key, not_found),
        Value::SubVector(v) => v.get_or(key, not_found),
        Value::String(s) => key
            .as_int()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| s.chars().nth(i))
            .map_or(not_found, Value::Char),
        _ => not_found,
    }
}

/// Associate `key` with `val`. Nil becomes a single-entry map.
pub fn assoc(coll: &Value, key: Value, val: Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Map(PersistentMap::Array(
            ArrayMap::from_pairs_checked([(key, val)])?,
        ))),
        Value::Map(m) => Ok(Value::Map(m.assoc(key, val))),
        Value::Vector(v) => Ok(Value::Vector(v.assoc(key, val)?)),
        Value::SubVector(v) => Ok(Value::SubVector(v.assoc(key, val)?)),
        other => Err(Error::type_error_in("assoc", "associative", other.type_name())),
    }
}

pub fn dissoc(coll: &Value, key: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::Map(m) => Ok(Value::Map(m.dissoc(key))),
        other => Err(Error::type_error_in("dissoc", "map", other.type_name())),
    }
}

/// Whether `key` is present. For vectors, whether it's a valid index.
pub fn contains(coll: &Value, key: &Value) -> bool {
    match coll {
        Value::Map(m) => m.contains_key(key),
        Value::Vector(v) => v.contains_key(key),
        Value::SubVector(v) => v.contains_key(key),
        _ => false,
    }
}

/// Add `x` the way the collection grows: lists at the front, vectors at the
/// back, maps take `[k v]` entries.
pub fn conj(coll: &Value, x: Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::List(List::empty().cons(x))),
        Value::List(l) => Ok(Value::List(l.cons(x))),
        Value::Vector(v) => Ok(Value::Vector(v.conj(x))),
        Value::SubVector(v) => Ok(Value::SubVector(v.conj(x)?)),
        Value::Map(m) => conj_entry(m, x),
        Value::Seq(_) | Value::LazySeq(_) => Ok(Value::Seq(cons(x, coll)?)),
        other => Err(Error::type_error_in("conj", "collection", other.type_name())),
    }
}

fn conj_entry(m: &PersistentMap, entry: Value) -> Result<Value> {
    match entry {
        Value::Vector(pair) if pair.count() == 2 => {
            let key = pair.nth(0).cloned().unwrap_or(Value::Nil);
            let val = pair.nth(1).cloned().unwrap_or(Value::Nil);
            Ok(Value::Map(m.assoc(key, val)))
        }
        Value::Map(other) => Ok(Value::Map(
            other
                .iter()
                .fold(m.clone(), |acc, (k, v)| acc.assoc(k.clone(), v.clone())),
        )),
        other => Err(Error::type_error_in("conj", "map entry", other.type_name())),
    }
}

/// The element at `index`, failing when out of range.
pub fn nth(coll: &Value, index: i64) -> Result<Value> {
    let count_hint = coll.counted_len().unwrap_or(0);
    let Ok(i) = usize::try_from(index) else {
        return Err(Error::out_of_bounds(index, count_hint));
    };
    let found = match coll {
        Value::Nil => return Ok(Value::Nil),
        Value::Vector(v) => v.nth(i).cloned(),
        Value::SubVector(v) => v.nth(i).cloned(),
        Value::String(s) => s.chars().nth(i).map(Value::Char),
        Value::List(_) | Value::Seq(_) | Value::LazySeq(_) => {
            let mut current = seq(coll)?;
            for _ in 0..i {
                current = match current {
                    Some(s) => s.next()?,
                    None => break,
                };
            }
            current.map(|s| s.first())
        }
        other => return Err(Error::type_error_in("nth", "sequential", other.type_name())),
    };
    found.ok_or(Error::out_of_bounds(index, count_hint))
}

/// The element `pop` would remove. Nil for nil.
pub fn peek(coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::List(l) => l.peek(),
        Value::Vector(v) => v.peek(),
        Value::SubVector(v) => v.peek(),
        other => Err(Error::type_error_in("peek", "stack", other.type_name())),
    }
}

/// Everything but the peek element. Nil for nil.
pub fn pop(coll: &Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::Nil),
        Value::List(l) => Ok(Value::List(l.pop()?)),
        Value::Vector(v) => Ok(Value::Vector(v.pop()?)),
        Value::SubVector(v) => v.pop(),
        other => Err(Error::type_error_in("pop", "stack", other.type_name())),
    }
}

/// A view of `v[start..end]`.
///
/// Fails when `end < start`, `start < 0` or `end > count`. An empty range
/// gives the empty vector.
pub fn subvec(v: &Value, start: i64, end: i64) -> Result<Value> {
    match v {
        Value::Vector(v) => {
            let (start, end) = check_range(start, end, v.count())?;
            v.subvec(start, end)
        }
        Value::SubVector(v) => {
            let (start, end) = check_range(start, end, v.count())?;
            v.subvec(start, end)
        }
        other => Err(Error::type_error_in("subvec", "vector", other.type_name())),
    }
}

fn check_range(start: i64, end: i64, count: usize) -> Result<(usize, usize)> {
    if end < start {
        return Err(Error::out_of_bounds(end, count));
    }
    let Ok(from) = usize::try_from(start) else {
        return Err(Error::out_of_bounds(start, count));
    };
    match usize::try_from(end) {
        Ok(to) if to <= count => Ok((from, to)),
        _ => Err(Error::out_of_bounds(end, count)),
    }
}

// kestrel-data - Reduction with early termination
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Folding over seqable values.
//!
//! A step function can stop the fold early by returning [`reduced`]`(x)`.
//! The fold unwraps the marker before returning, so callers of [`reduce`]
//! never see it.

use std::sync::Arc;

use crate::error::Result;
use crate::seq::seq_iter;
use crate::value::Value;

/// Wrap a value to signal that reduction should stop.
pub fn reduced(value: Value) -> Value {
    Value::Reduced(Arc::new(value))
}

pub fn is_reduced(value: &Value) -> bool {
    matches!(value, Value::Reduced(_))
}

/// Strip one layer of the reduced marker, if present.
pub fn unreduced(value: Value) -> Value {
    match value {
        Value::Reduced(inner) => Arc::unwrap_or_clone(inner),
        other => other,
    }
}

/// Fold `f` over the elements of `coll`, starting from `init`.
pub fn reduce<F>(coll: &Value, init: Value, mut f: F) -> Result<Value>
where
    F: FnMut(Value, Value) -> Result<Value>,
{
    let mut acc = init;
    for item in seq_iter(coll)? {
        acc = f(acc, item?)?;
        if is_reduced(&acc) {
            return Ok(unreduced(acc));
        }
    }
    Ok(acc)
}

/// Fold using the first element as the initial value. `None` when `coll`
/// is empty.
pub fn reduce_first<F>(coll: &Value, mut f: F) -> Result<Option<Value>>
where
    F: FnMut(Value, Value) -> Result<Value>,
{
    let mut items = seq_iter(coll)?;
    let Some(first) = items.next().transpose()? else {
        return Ok(None);
    };
    let mut acc = first;
    for item in items {
        acc = f(acc, item?)?;
        if is_reduced(&acc) {
            return Ok(Some(unreduced(acc)));
        }
    }
    Ok(Some(acc))
}

// kestrel-data - Collection capabilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Capability traits implemented independently by each collection type.
//!
//! A type opts into exactly the capabilities it supports; generic code in
//! [`rt`](crate::rt) dispatches on [`Value`] variants and calls through these.

use crate::error::Result;
use crate::seq::Seq;
use crate::value::Value;

/// Collections whose element count is known in O(1).
pub trait Counted {
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Anything that can produce a sequence view.
pub trait Seqable {
    /// A view over the elements, or `None` when there are none.
    fn seq(&self) -> Result<Option<Seq>>;
}

/// Keyed lookup and update.
pub trait Associative: Sized {
    fn assoc(&self, key: Value, val: Value) -> Result<Self>;

    fn val_at(&self, key: &Value) -> Option<Value>;

    fn contains_key(&self, key: &Value) -> bool {
        self.val_at(key).is_some()
    }

    /// Lookup with a caller-supplied value for absent keys.
    fn get_or(&self, key: &Value, not_found: Value) -> Value {
        self.val_at(key).unwrap_or(not_found)
    }
}

/// Stack-shaped collections: lists grow at the front, vectors at the back.
pub trait Stack {
    type Popped;

    /// The element `pop` would remove. Fails on an empty collection.
    fn peek(&self) -> Result<Value>;

    /// Everything but the peek element. Fails on an empty collection.
    fn pop(&self) -> Result<Self::Popped>;
}

// kestrel-data - Small maps stored as a flat key/value array
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! A persistent map for small sizes.
//!
//! Keys and values alternate in one flat slice. Lookup is a linear scan,
//! which beats hashing for a handful of entries. Every update allocates a
//! fresh slice: replacing a value keeps the length, adding a key grows it by
//! two slots. Once the map holds [`HASHTABLE_THRESHOLD`] slots, adding
//! another key promotes it to a [`HashMap`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::coll::{Counted, Seqable};
use crate::error::{Error, Result};
use crate::hash_map::HashMap;
use crate::map::PersistentMap;
use crate::seq::Seq;
use crate::value::Value;

/// Slot count (keys plus values) above which maps are hashed: 8 pairs.
pub const HASHTABLE_THRESHOLD: usize = 16;

#[derive(Clone)]
pub struct ArrayMap {
    slots: Arc<[Value]>,
}

static EMPTY: OnceLock<ArrayMap> = OnceLock::new();

impl ArrayMap {
    /// The shared empty map.
    pub fn empty() -> ArrayMap {
        EMPTY
            .get_or_init(|| ArrayMap {
                slots: Arc::from(Vec::new()),
            })
            .clone()
    }

    /// Build from pairs, failing on a repeated key.
    pub fn from_pairs_checked(pairs: impl IntoIterator<Item = (Value, Value)>) -> Result<Self> {
        let mut slots: Vec<Value> = Vec::new();
        for (key, val) in pairs {
            if slots.iter().step_by(2).any(|k| *k == key) {
                return Err(Error::DuplicateKey {
                    key: key.to_string(),
                });
            }
            slots.push(key);
            slots.push(val);
        }
        if slots.is_empty() {
            return Ok(ArrayMap::empty());
        }
        Ok(ArrayMap {
            slots: Arc::from(slots),
        })
    }

    pub fn count(&self) -> usize {
        self.slots.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn index_of(&self, key: &Value) -> Option<usize> {
        (0..self.slots.len())
            .step_by(2)
            .find(|&i| self.slots[i] == *key)
    }

    pub fn val_at(&self, key: &Value) -> Option<&Value> {
        self.index_of(key).map(|i| &self.slots[i + 1])
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.index_of(key).is_some()
    }

    /// Add or replace an entry. May return a hash map when full.
    pub fn assoc(&self, key: Value, val: Value) -> PersistentMap {
        if let Some(i) = self.index_of(&key) {
            let mut slots = self.slots.to_vec();
            slots[i + 1] = val;
            return PersistentMap::Array(ArrayMap {
                slots: Arc::from(slots),
            });
        }
        if self.slots.len() >= HASHTABLE_THRESHOLD {
            return PersistentMap::Hash(self.to_hash_map().assoc(key, val));
        }
        let mut slots = Vec::with_capacity(self.slots.len() + 2);
        slots.extend_from_slice(&self.slots);
        slots.push(key);
        slots.push(val);
        PersistentMap::Array(ArrayMap {
            slots: Arc::from(slots),
        })
    }

    pub fn dissoc(&self, key: &Value) -> ArrayMap {
        let Some(i) = self.index_of(key) else {
            return self.clone();
        };
        if self.count() == 1 {
            return ArrayMap::empty();
        }
        let mut slots = Vec::with_capacity(self.slots.len() - 2);
        slots.extend_from_slice(&self.slots[..i]);
        slots.extend_from_slice(&self.slots[i + 2..]);
        ArrayMap {
            slots: Arc::from(slots),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.slots.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Slot `i` and `i + 1`, for sequence views.
    pub(crate) fn entry_at(&self, slot: usize) -> Option<(&Value, &Value)> {
        Some((self.slots.get(slot)?, self.slots.get(slot + 1)?))
    }

    pub(crate) fn slot_len(&self) -> usize {
        self.slots.len()
    }

    fn to_hash_map(&self) -> HashMap {
        self.iter()
            .fold(HashMap::empty(), |m, (k, v)| m.assoc(k.clone(), v.clone()))
    }
}

impl Counted for ArrayMap {
    fn count(&self) -> usize {
        ArrayMap::count(self)
    }
}

impl Seqable for ArrayMap {
    fn seq(&self) -> Result<Option<Seq>> {
        Ok(ArrayMapSeq::new(self.clone(), 0).map(Seq::ArrayMap))
    }
}

impl fmt::Debug for ArrayMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// A sequence over an array map's entries, from slot `index` on.
#[derive(Clone)]
pub struct ArrayMapSeq {
    map: ArrayMap,
    index: usize,
}

impl ArrayMapSeq {
    pub(crate) fn new(map: ArrayMap, index: usize) -> Option<Self> {
        if index < map.slot_len() {
            Some(ArrayMapSeq { map, index })
        } else {
            None
        }
    }

    pub(crate) fn entry(&self) -> Option<(&Value, &Value)> {
        self.map.entry_at(self.index)
    }

    pub(crate) fn advance(&self) -> Option<Self> {
        ArrayMapSeq::new(self.map.clone(), self.index + 2)
    }

    pub(crate) fn remaining(&self) -> usize {
        (self.map.slot_len() - self.index) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(name: &str) -> Value {
        Value::keyword(name).unwrap()
    }

    fn array_map(n: i64) -> ArrayMap {
        ArrayMap::from_pairs_checked((0..n).map(|i| (Value::Int(i), Value::Int(i * 10)))).unwrap()
    }

    #[test]
    fn test_empty_is_shared() {
        let a = ArrayMap::empty();
        let b = ArrayMap::empty();
        assert!(Arc::ptr_eq(&a.slots, &b.slots));
        assert_eq!(a.count(), 0);
        assert!(a.seq().unwrap().is_none());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = ArrayMap::from_pairs_checked(vec![
            (kw("a"), Value::Int(1)),
            (kw("b"), Value::Int(2)),
            (kw("a"), Value::Int(3)),
        ]);
        match result {
            Err(Error::DuplicateKey { key }) => assert_eq!(key, ":a"),
            other => panic!("expected duplicate key error, got {:?}", other.map(|m| m.count())),
        }
    }

    #[test]
    fn test_assoc_existing_key_keeps_length() {
        let m = array_map(3);
        let updated = m.assoc(Value::Int(1), Value::from("one"));
        match &updated {
            PersistentMap::Array(a) => {
                assert_eq!(a.slot_len(), 6);
                assert_eq!(a.val_at(&Value::Int(1)), Some(&Value::from("one")));
            }
            PersistentMap::Hash(_) => panic!("expected array map"),
        }
        assert_eq!(m.val_at(&Value::Int(1)), Some(&Value::Int(10)));
    }

    #[test]
    fn test_assoc_new_key_appends() {
        let m = array_map(2);
        match m.assoc(kw("x"), Value::Nil) {
            PersistentMap::Array(a) => {
                assert_eq!(a.count(), 3);
                assert_eq!(a.entry_at(4), Some((&kw("x"), &Value::Nil)));
                assert!(a.contains_key(&kw("x")));
            }
            PersistentMap::Hash(_) => panic!("expected array map"),
        }
    }

    #[test]
    fn test_promotes_past_threshold() {
        let full = array_map(8);
        assert!(matches!(
            full.assoc(Value::Int(3), Value::Nil),
            PersistentMap::Array(_)
        ));
        match full.assoc(Value::Int(8), Value::Int(80)) {
            PersistentMap::Hash(h) => {
                assert_eq!(h.count(), 9);
                assert_eq!(h.val_at(&Value::Int(0)), Some(&Value::Int(0)));
                assert_eq!(h.val_at(&Value::Int(8)), Some(&Value::Int(80)));
            }
            PersistentMap::Array(_) => panic!("expected hash map"),
        }
    }

    #[test]
    fn test_dissoc() {
        let m = array_map(3);
        let d = m.dissoc(&Value::Int(1));
        assert_eq!(d.count(), 2);
        assert!(!d.contains_key(&Value::Int(1)));
        assert_eq!(d.val_at(&Value::Int(2)), Some(&Value::Int(20)));
        assert_eq!(m.count(), 3);
        assert_eq!(m.dissoc(&Value::Int(99)).count(), 3);
        assert!(array_map(1).dissoc(&Value::Int(0)).is_empty());
    }
}

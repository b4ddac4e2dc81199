// kestrel-data - Persistent map facade
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! [`PersistentMap`] picks a representation by size: an [`ArrayMap`] for up
//! to eight entries and a [`HashMap`] beyond that. Both behave identically
//! through this type; equality and hashing ignore the representation.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::array_map::{ArrayMap, ArrayMapSeq, HASHTABLE_THRESHOLD};
use crate::coll::{Associative, Counted, Seqable};
use crate::error::Result;
use crate::hash_map::{HashMap, HashMapSeq};
use crate::seq::Seq;
use crate::value::Value;

#[derive(Clone)]
pub enum PersistentMap {
    Array(ArrayMap),
    Hash(HashMap),
}

/// Build a map, choosing the representation from the number of pairs.
///
/// Zero pairs give the shared empty map. Duplicate keys are an error in
/// either representation.
pub fn make_map(pairs: Vec<(Value, Value)>) -> Result<PersistentMap> {
    if pairs.is_empty() {
        return Ok(PersistentMap::empty());
    }
    if pairs.len() * 2 <= HASHTABLE_THRESHOLD {
        Ok(PersistentMap::Array(ArrayMap::from_pairs_checked(pairs)?))
    } else {
        Ok(PersistentMap::Hash(HashMap::from_pairs_checked(pairs)?))
    }
}

impl PersistentMap {
    pub fn empty() -> Self {
        PersistentMap::Array(ArrayMap::empty())
    }

    pub fn count(&self) -> usize {
        match self {
            PersistentMap::Array(m) => m.count(),
            PersistentMap::Hash(m) => m.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_array_map(&self) -> bool {
        matches!(self, PersistentMap::Array(_))
    }

    pub fn is_hash_map(&self) -> bool {
        matches!(self, PersistentMap::Hash(_))
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            PersistentMap::Array(m) => m.val_at(key),
            PersistentMap::Hash(m) => m.val_at(key),
        }
    }

    pub fn assoc(&self, key: Value, val: Value) -> PersistentMap {
        match self {
            PersistentMap::Array(m) => m.assoc(key, val),
            PersistentMap::Hash(m) => PersistentMap::Hash(m.assoc(key, val)),
        }
    }

    /// Remove a key. Hash maps stay hashed when they shrink.
    pub fn dissoc(&self, key: &Value) -> PersistentMap {
        match self {
            PersistentMap::Array(m) => PersistentMap::Array(m.dissoc(key)),
            PersistentMap::Hash(m) => PersistentMap::Hash(m.dissoc(key)),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = (&Value, &Value)> + '_> {
        match self {
            PersistentMap::Array(m) => Box::new(m.iter()),
            PersistentMap::Hash(m) => Box::new(m.iter()),
        }
    }

    /// A sequence of the keys, or `None` for an empty map.
    pub fn keys(&self) -> Option<Seq> {
        self.entry_seq().map(|s| Seq::Keys(Box::new(s)))
    }

    /// A sequence of the values, or `None` for an empty map.
    pub fn vals(&self) -> Option<Seq> {
        self.entry_seq().map(|s| Seq::Vals(Box::new(s)))
    }

    fn entry_seq(&self) -> Option<Seq> {
        match self {
            PersistentMap::Array(m) => ArrayMapSeq::new(m.clone(), 0).map(Seq::ArrayMap),
            PersistentMap::Hash(m) => HashMapSeq::new(m).map(Seq::HashMap),
        }
    }
}

impl Default for PersistentMap {
    fn default() -> Self {
        PersistentMap::empty()
    }
}

impl Counted for PersistentMap {
    fn count(&self) -> usize {
        PersistentMap::count(self)
    }
}

impl Seqable for PersistentMap {
    fn seq(&self) -> Result<Option<Seq>> {
        Ok(self.entry_seq())
    }
}

impl Associative for PersistentMap {
    fn assoc(&self, key: Value, val: Value) -> Result<Self> {
        Ok(PersistentMap::assoc(self, key, val))
    }

    fn val_at(&self, key: &Value) -> Option<Value> {
        self.get(key).cloned()
    }

    fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }
}

impl PartialEq for PersistentMap {
    fn eq(&self, other: &Self) -> bool {
        self.count() == other.count() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for PersistentMap {}

impl Hash for PersistentMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Order-independent: entries are hashed separately and summed.
        let sum = self.iter().fold(0u64, |acc, (k, v)| {
            let mut h = DefaultHasher::new();
            k.hash(&mut h);
            v.hash(&mut h);
            acc.wrapping_add(h.finish())
        });
        state.write_u64(sum);
        state.write_usize(self.count());
    }
}

impl fmt::Debug for PersistentMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn pairs(n: i64) -> Vec<(Value, Value)> {
        (0..n).map(|i| (Value::Int(i), Value::Int(i + 100))).collect()
    }

    fn hash_of(m: &PersistentMap) -> u64 {
        let mut h = DefaultHasher::new();
        m.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_make_map_threshold() {
        assert!(make_map(vec![]).unwrap().is_empty());
        assert!(make_map(pairs(7)).unwrap().is_array_map());
        assert!(make_map(pairs(8)).unwrap().is_array_map());
        assert!(make_map(pairs(9)).unwrap().is_hash_map());
    }

    #[test]
    fn test_make_map_duplicates() {
        let mut dup = pairs(3);
        dup.push((Value::Int(1), Value::Nil));
        assert!(matches!(make_map(dup), Err(Error::DuplicateKey { .. })));
        let mut dup = pairs(12);
        dup.push((Value::Int(1), Value::Nil));
        assert!(matches!(make_map(dup), Err(Error::DuplicateKey { .. })));
    }

    #[test]
    fn test_equality_ignores_representation() {
        let array = make_map(pairs(8)).unwrap();
        let hashed = PersistentMap::Hash(HashMap::from_pairs_checked(pairs(8)).unwrap());
        assert_eq!(array, hashed);
        assert_eq!(hash_of(&array), hash_of(&hashed));
        assert_ne!(array, make_map(pairs(7)).unwrap());
    }

    #[test]
    fn test_keys_and_vals() {
        let m = make_map(pairs(3)).unwrap();
        let keys: Vec<Value> = m.keys().unwrap().iter().map(|v| v.unwrap()).collect();
        let vals: Vec<Value> = m.vals().unwrap().iter().map(|v| v.unwrap()).collect();
        assert_eq!(keys, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
        assert_eq!(vals, vec![Value::Int(100), Value::Int(101), Value::Int(102)]);
        assert!(PersistentMap::empty().keys().is_none());
    }

    #[test]
    fn test_assoc_promotes_and_dissoc_keeps_hash() {
        let m = make_map(pairs(8)).unwrap();
        let grown = m.assoc(Value::Int(8), Value::Nil);
        assert!(grown.is_hash_map());
        assert_eq!(grown.count(), 9);
        let shrunk = grown.dissoc(&Value::Int(8));
        assert!(shrunk.is_hash_map());
        assert_eq!(shrunk, m);
    }
}

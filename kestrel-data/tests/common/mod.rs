// kestrel-data - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for kestrel-data integration tests.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub use kestrel_data::{PersistentMap, Value, make_map, seq_to_array};

/// Integer values, in order.
pub fn ints(ns: &[i64]) -> Vec<Value> {
    ns.iter().map(|n| Value::Int(*n)).collect()
}

pub fn kw(name: &str) -> Value {
    Value::keyword(name).expect("valid keyword")
}

/// Drain any seqable value into a Vec.
pub fn items(v: &Value) -> Vec<Value> {
    seq_to_array(v).expect("seqable value")
}

/// `n` integer pairs `i -> i * 10`.
pub fn int_pairs(n: i64) -> Vec<(Value, Value)> {
    (0..n).map(|i| (Value::Int(i), Value::Int(i * 10))).collect()
}

pub fn map_of(pairs: Vec<(Value, Value)>) -> PersistentMap {
    make_map(pairs).expect("no duplicate keys")
}

pub fn compute_hash(v: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    v.hash(&mut hasher);
    hasher.finish()
}

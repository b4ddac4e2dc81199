// kestrel-data - Uniform sequence views
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The sequence abstraction: one first/next traversal over every collection.
//!
//! [`seq`] turns any seqable value into a [`Seq`], or `None` when there is
//! nothing to traverse. A `Seq` is never empty, so `None` is the single
//! termination test for every loop over every collection type.
//!
//! ```text
//! next(x)  -> None at the end
//! more(x)  -> the empty list at the end (never nil)
//! ```
//!
//! Walking a seq never mutates the collection underneath. Vector and map
//! seqs are cursors into shared persistent storage; cons cells hold their
//! rest as an unrealized value so consing onto a lazy seq doesn't force it.

use std::fmt;
use std::sync::Arc;

use crate::array_map::ArrayMapSeq;
use crate::coll::Seqable;
use crate::error::{Error, Result};
use crate::hash_map::HashMapSeq;
use crate::lazy::LazySeq;
use crate::list::List;
use crate::map::PersistentMap;
use crate::value::Value;

/// A non-empty sequence view.
#[derive(Clone)]
pub enum Seq {
    /// A non-empty list is its own sequence.
    List(List),
    Cons(Arc<Cons>),
    Vector(VectorSeq),
    ArrayMap(ArrayMapSeq),
    HashMap(HashMapSeq),
    /// The characters of a string.
    Str(StrSeq),
    /// Keys of a map entry sequence.
    Keys(Box<Seq>),
    /// Values of a map entry sequence.
    Vals(Box<Seq>),
}

/// A cell prepending one element to any seqable rest.
pub struct Cons {
    first: Value,
    rest: Value,
}

impl Cons {
    pub fn first(&self) -> &Value {
        &self.first
    }

    /// The rest as given to [`cons`]. May be an unrealized lazy seq.
    pub fn rest(&self) -> &Value {
        &self.rest
    }
}

impl Drop for Cons {
    fn drop(&mut self) {
        let rest = std::mem::replace(&mut self.rest, Value::Nil);
        drop_chain(detach(rest));
    }
}

/// Pull the sequence out of a uniquely owned seq-ish value.
fn detach(value: Value) -> Option<Seq> {
    match value {
        Value::Seq(s) => Some(s),
        Value::LazySeq(l) => l.into_realized(),
        _ => None,
    }
}

/// Drop a chain of cons cells and realized lazy seqs iteratively.
///
/// Only links nobody else holds are taken apart; the first shared link
/// stops the walk and is released normally.
pub(crate) fn drop_chain(mut next: Option<Seq>) {
    while let Some(seq) = next.take() {
        if let Seq::Cons(cell) = seq {
            if let Ok(mut cell) = Arc::try_unwrap(cell) {
                let rest = std::mem::replace(&mut cell.rest, Value::Nil);
                next = detach(rest);
            }
        }
    }
}

/// An indexed cursor over a vector's (or subvector's) storage.
#[derive(Clone)]
pub struct VectorSeq {
    items: im::Vector<Value>,
    index: usize,
    end: usize,
}

impl VectorSeq {
    pub(crate) fn new(items: im::Vector<Value>, index: usize, end: usize) -> Option<Self> {
        if index < end && end <= items.len() {
            Some(VectorSeq { items, index, end })
        } else {
            None
        }
    }
}

/// A cursor over the characters of a string.
#[derive(Clone)]
pub struct StrSeq {
    s: Arc<str>,
    offset: usize,
}

impl StrSeq {
    fn new(s: Arc<str>, offset: usize) -> Option<Self> {
        if offset < s.len() {
            Some(StrSeq { s, offset })
        } else {
            None
        }
    }

    fn current(&self) -> Option<char> {
        self.s.get(self.offset..)?.chars().next()
    }
}

impl Seq {
    /// The first element.
    pub fn first(&self) -> Value {
        match self {
            Seq::List(l) => l.first().cloned().unwrap_or(Value::Nil),
            Seq::Cons(c) => c.first.clone(),
            Seq::Vector(v) => v.items.get(v.index).cloned().unwrap_or(Value::Nil),
            Seq::ArrayMap(_) | Seq::HashMap(_) => match self.entry() {
                Some((k, v)) => Value::vector([k, v]),
                None => Value::Nil,
            },
            Seq::Str(s) => s.current().map_or(Value::Nil, Value::Char),
            Seq::Keys(inner) => inner.entry().map_or(Value::Nil, |(k, _)| k),
            Seq::Vals(inner) => inner.entry().map_or(Value::Nil, |(_, v)| v),
        }
    }

    /// The current key and value of a map entry sequence.
    pub(crate) fn entry(&self) -> Option<(Value, Value)> {
        let (k, v) = match self {
            Seq::ArrayMap(s) => s.entry()?,
            Seq::HashMap(s) => s.entry()?,
            _ => return None,
        };
        Some((k.clone(), v.clone()))
    }

    /// The remaining elements, or `None` if there are none.
    ///
    /// Only fails when the rest is a lazy seq whose producer fails.
    pub fn next(&self) -> Result<Option<Seq>> {
        Ok(match self {
            Seq::List(l) => {
                let rest = l.rest();
                if rest.is_empty() {
                    None
                } else {
                    Some(Seq::List(rest))
                }
            }
            Seq::Cons(c) => return seq(&c.rest),
            Seq::Vector(v) => {
                VectorSeq::new(v.items.clone(), v.index + 1, v.end).map(Seq::Vector)
            }
            Seq::ArrayMap(s) => s.advance().map(Seq::ArrayMap),
            Seq::HashMap(s) => s.advance().map(Seq::HashMap),
            Seq::Str(s) => {
                let width = s.current().map_or(1, char::len_utf8);
                StrSeq::new(Arc::clone(&s.s), s.offset + width).map(Seq::Str)
            }
            Seq::Keys(inner) => inner.next()?.map(|s| Seq::Keys(Box::new(s))),
            Seq::Vals(inner) => inner.next()?.map(|s| Seq::Vals(Box::new(s))),
        })
    }

    /// The remaining elements as a value that is never nil: the empty list
    /// stands in at the end. A cons cell's lazy rest is returned unrealized.
    pub fn more(&self) -> Value {
        match self {
            Seq::List(l) => Value::List(l.rest()),
            Seq::Cons(c) => match &c.rest {
                Value::Nil => Value::List(List::empty()),
                rest => rest.clone(),
            },
            _ => match self.next() {
                Ok(Some(s)) => Value::Seq(s),
                _ => Value::List(List::empty()),
            },
        }
    }

    /// Count the elements, walking only as far as needed.
    pub fn count(&self) -> Result<usize> {
        let mut n = 0;
        let mut current = self.clone();
        loop {
            if let Some(known) = current.counted() {
                return Ok(n + known);
            }
            n += 1;
            match current.next()? {
                Some(s) => current = s,
                None => return Ok(n),
            }
        }
    }

    /// The count when the cursor already knows it.
    fn counted(&self) -> Option<usize> {
        match self {
            Seq::List(l) => Some(l.count()),
            Seq::Vector(v) => Some(v.end - v.index),
            Seq::ArrayMap(s) => Some(s.remaining()),
            Seq::HashMap(s) => Some(s.remaining()),
            Seq::Str(s) => Some(s.s.get(s.offset..).map_or(0, |rest| rest.chars().count())),
            Seq::Keys(inner) | Seq::Vals(inner) => inner.counted(),
            Seq::Cons(_) => None,
        }
    }

    pub fn iter(&self) -> SeqIter {
        SeqIter {
            current: Some(self.clone()),
            pending_error: None,
        }
    }
}

impl Seqable for Seq {
    fn seq(&self) -> Result<Option<Seq>> {
        Ok(Some(self.clone()))
    }
}

impl fmt::Debug for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Seq(self.clone()))
    }
}

/// Iterator over a sequence's elements.
///
/// Yields `Err` once if realizing a lazy rest fails, then stops.
pub struct SeqIter {
    current: Option<Seq>,
    pending_error: Option<Error>,
}

impl SeqIter {
    fn empty() -> Self {
        SeqIter {
            current: None,
            pending_error: None,
        }
    }
}

impl Iterator for SeqIter {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        let current = self.current.take()?;
        let first = current.first();
        match current.next() {
            Ok(rest) => self.current = rest,
            Err(e) => self.pending_error = Some(e),
        }
        Some(Ok(first))
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// A sequence view over `x`, or `None` when it's nil or empty.
///
/// Strings seq as their characters. Other scalars have no sequence view and
/// fail with [`Error::NotSeqable`].
pub fn seq(x: &Value) -> Result<Option<Seq>> {
    match x {
        Value::Nil => Ok(None),
        Value::List(l) => l.seq(),
        Value::Vector(v) => v.seq(),
        Value::SubVector(v) => v.seq(),
        Value::Map(m) => m.seq(),
        Value::Seq(s) => Ok(Some(s.clone())),
        Value::LazySeq(l) => l.seq(),
        Value::String(s) => Ok(StrSeq::new(Arc::clone(s), 0).map(Seq::Str)),
        other => Err(Error::NotSeqable(other.type_name())),
    }
}

/// The first element of `x`, or nil when it has none.
pub fn first(x: &Value) -> Result<Value> {
    Ok(seq(x)?.map_or(Value::Nil, |s| s.first()))
}

/// Everything after the first element, or `None`.
pub fn next(x: &Value) -> Result<Option<Seq>> {
    match seq(x)? {
        Some(s) => s.next(),
        None => Ok(None),
    }
}

/// Everything after the first element; the empty list when there is nothing.
pub fn more(x: &Value) -> Result<Value> {
    Ok(match seq(x)? {
        Some(s) => s.more(),
        None => Value::List(List::empty()),
    })
}

pub fn second(x: &Value) -> Result<Value> {
    nth_first(x, 1)
}

pub fn third(x: &Value) -> Result<Value> {
    nth_first(x, 2)
}

pub fn fourth(x: &Value) -> Result<Value> {
    nth_first(x, 3)
}

/// The first element after skipping `n`, or nil if the sequence runs out.
fn nth_first(x: &Value, n: usize) -> Result<Value> {
    let mut current = seq(x)?;
    for _ in 0..n {
        current = match current {
            Some(s) => s.next()?,
            None => return Ok(Value::Nil),
        };
    }
    Ok(current.map_or(Value::Nil, |s| s.first()))
}

/// A sequence with `x` in front of `coll`. `coll` isn't forced if lazy.
pub fn cons(x: Value, coll: &Value) -> Result<Seq> {
    match coll {
        Value::Nil => Ok(Seq::List(List::empty().cons(x))),
        Value::List(l) => Ok(Seq::List(l.cons(x))),
        Value::Seq(Seq::List(l)) => Ok(Seq::List(l.cons(x))),
        Value::Seq(_) | Value::LazySeq(_) => Ok(Seq::Cons(Arc::new(Cons {
            first: x,
            rest: coll.clone(),
        }))),
        other => Ok(match seq(other)? {
            None => Seq::List(List::empty().cons(x)),
            Some(s) => Seq::Cons(Arc::new(Cons {
                first: x,
                rest: Value::Seq(s),
            })),
        }),
    }
}

/// A list of the given items. No items give the empty list.
pub fn list(items: impl IntoIterator<Item = Value>) -> List {
    items.into_iter().collect()
}

/// The `leading` items consed in order onto `tail`, which is spliced in as
/// the rest rather than added as one more element.
///
/// `list_star([1, 2], (3 4))` is `(1 2 3 4)`.
pub fn list_star(leading: impl IntoIterator<Item = Value>, tail: &Value) -> Result<Value> {
    let leading: Vec<Value> = leading.into_iter().collect();
    if leading.is_empty() {
        return Ok(seq(tail)?.into());
    }
    let mut result = tail.clone();
    for item in leading.into_iter().rev() {
        result = Value::Seq(cons(item, &result)?);
    }
    Ok(result)
}

/// Number of elements in a sequence; zero for `None`.
pub fn length(s: Option<&Seq>) -> Result<usize> {
    s.map_or(Ok(0), Seq::count)
}

/// Iterate the elements of any seqable value.
pub fn seq_iter(x: &Value) -> Result<SeqIter> {
    Ok(match seq(x)? {
        Some(s) => s.iter(),
        None => SeqIter::empty(),
    })
}

/// Drain a seqable value into a new vector of exactly its length.
pub fn seq_to_array(x: &Value) -> Result<Vec<Value>> {
    seq_iter(x)?.collect()
}

/// Drain a seqable value into `dest`.
///
/// When `dest` is too short a fresh buffer of the exact length is returned
/// instead. When it's longer, the slot just past the last element is set to
/// nil and the slots after that are left alone.
pub fn seq_to_passed_array(x: &Value, mut dest: Vec<Value>) -> Result<Vec<Value>> {
    let items = seq_to_array(x)?;
    if items.len() > dest.len() {
        return Ok(items);
    }
    let len = items.len();
    for (slot, item) in dest.iter_mut().zip(items) {
        *slot = item;
    }
    if dest.len() > len {
        dest[len] = Value::Nil;
    }
    Ok(dest)
}

/// The keys of a map, or `None` for nil or an empty map.
pub fn keys(x: &Value) -> Result<Option<Seq>> {
    match x {
        Value::Nil => Ok(None),
        Value::Map(m) => Ok(m.keys()),
        other => Err(Error::type_error_in("keys", "map", other.type_name())),
    }
}

/// The values of a map, or `None` for nil or an empty map.
pub fn vals(x: &Value) -> Result<Option<Seq>> {
    match x {
        Value::Nil => Ok(None),
        Value::Map(m) => Ok(PersistentMap::vals(m)),
        other => Err(Error::type_error_in("vals", "map", other.type_name())),
    }
}

/// Wrap a producer as a lazy seq value.
pub fn lazy(producer: impl FnOnce() -> Result<Value> + Send + 'static) -> Value {
    Value::LazySeq(LazySeq::new(producer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::make_map;

    fn ints(ns: &[i64]) -> Vec<Value> {
        ns.iter().map(|n| Value::Int(*n)).collect()
    }

    fn collect(x: &Value) -> Vec<Value> {
        seq_to_array(x).unwrap()
    }

    // ========================================================================
    // seq / first / next / more
    // ========================================================================

    #[test]
    fn test_seq_of_empty_is_none() {
        assert!(seq(&Value::Nil).unwrap().is_none());
        assert!(seq(&Value::list(vec![])).unwrap().is_none());
        assert!(seq(&Value::vector(vec![])).unwrap().is_none());
        assert!(seq(&Value::Map(PersistentMap::empty())).unwrap().is_none());
        assert!(seq(&Value::from("")).unwrap().is_none());
    }

    #[test]
    fn test_more_of_empty_is_empty_list() {
        let m = more(&Value::list(vec![])).unwrap();
        assert!(!m.is_nil());
        assert!(matches!(&m, Value::List(l) if l.is_empty()));
        assert!(!more(&Value::Nil).unwrap().is_nil());
        assert!(!more(&Value::vector(ints(&[1]))).unwrap().is_nil());
    }

    #[test]
    fn test_next_vs_more_at_end() {
        let one = Value::vector(ints(&[1]));
        assert!(next(&one).unwrap().is_none());
        assert!(seq(&more(&one).unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_first_second_third_fourth() {
        let v = Value::vector(ints(&[1, 2, 3, 4]));
        assert_eq!(first(&v).unwrap(), Value::Int(1));
        assert_eq!(second(&v).unwrap(), Value::Int(2));
        assert_eq!(third(&v).unwrap(), Value::Int(3));
        assert_eq!(fourth(&v).unwrap(), Value::Int(4));
        assert_eq!(fourth(&Value::vector(ints(&[1]))).unwrap(), Value::Nil);
        assert_eq!(first(&Value::Nil).unwrap(), Value::Nil);
    }

    #[test]
    fn test_scalars_are_not_seqable() {
        assert!(matches!(seq(&Value::Int(1)), Err(Error::NotSeqable("integer"))));
        assert!(matches!(seq(&Value::Bool(true)), Err(Error::NotSeqable(_))));
    }

    #[test]
    fn test_string_seq_yields_chars() {
        let s = Value::from("héllo");
        assert_eq!(
            collect(&s),
            "héllo".chars().map(Value::Char).collect::<Vec<_>>()
        );
        assert_eq!(seq(&s).unwrap().unwrap().count().unwrap(), 5);
    }

    #[test]
    fn test_map_seq_yields_entry_vectors() {
        let m = Value::Map(make_map(vec![(Value::Int(1), Value::Int(2))]).unwrap());
        assert_eq!(first(&m).unwrap(), Value::vector(ints(&[1, 2])));
    }

    #[test]
    fn test_subvector_seq() {
        let v = match Value::vector(ints(&[0, 1, 2, 3])) {
            Value::Vector(v) => v.subvec(1, 3).unwrap(),
            _ => unreachable!(),
        };
        assert_eq!(collect(&v), ints(&[1, 2]));
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_list_round_trip() {
        let l = Value::List(list(ints(&[1, 2, 3])));
        assert_eq!(collect(&l), ints(&[1, 2, 3]));
        assert!(list(vec![]).is_empty());
    }

    #[test]
    fn test_cons_onto_nil_and_list() {
        let s = cons(Value::Int(1), &Value::Nil).unwrap();
        assert!(matches!(&s, Seq::List(l) if l.count() == 1));
        let l = Value::list(ints(&[2, 3]));
        let s = cons(Value::Int(1), &l).unwrap();
        assert_eq!(s.count().unwrap(), 3);
        assert_eq!(collect(&l), ints(&[2, 3]));
    }

    #[test]
    fn test_cons_onto_vector() {
        let v = Value::vector(ints(&[2, 3]));
        let s = Value::Seq(cons(Value::Int(1), &v).unwrap());
        assert_eq!(collect(&s), ints(&[1, 2, 3]));
        assert_eq!(s, Value::list(ints(&[1, 2, 3])));
    }

    #[test]
    fn test_cons_does_not_force_lazy_rest() {
        let l = LazySeq::new(|| Ok(Value::list(vec![Value::Int(2)])));
        let s = cons(Value::Int(1), &Value::LazySeq(l.clone())).unwrap();
        assert!(!l.is_realized());
        assert!(matches!(s.more(), Value::LazySeq(_)));
        assert!(!l.is_realized());
        assert_eq!(s.count().unwrap(), 2);
        assert!(l.is_realized());
    }

    #[test]
    fn test_cons_onto_scalar_fails() {
        assert!(cons(Value::Int(1), &Value::Int(2)).is_err());
    }

    #[test]
    fn test_list_star_splices_tail() {
        let tail = Value::List(list(ints(&[3, 4])));
        let result = list_star(ints(&[1, 2]), &tail).unwrap();
        assert_eq!(collect(&result), ints(&[1, 2, 3, 4]));
        let only_tail = list_star(vec![], &tail).unwrap();
        assert_eq!(collect(&only_tail), ints(&[3, 4]));
        assert!(list_star(vec![], &Value::Nil).unwrap().is_nil());
        let onto_nil = list_star(ints(&[1]), &Value::Nil).unwrap();
        assert_eq!(collect(&onto_nil), ints(&[1]));
    }

    // ========================================================================
    // Draining
    // ========================================================================

    #[test]
    fn test_length() {
        let s = seq(&Value::vector(ints(&[1, 2, 3]))).unwrap();
        assert_eq!(length(s.as_ref()).unwrap(), 3);
        assert_eq!(length(None).unwrap(), 0);
    }

    #[test]
    fn test_seq_to_passed_array_undersized() {
        let v = Value::vector(ints(&[1, 2, 3]));
        let out = seq_to_passed_array(&v, vec![Value::Nil]).unwrap();
        assert_eq!(out, ints(&[1, 2, 3]));
    }

    #[test]
    fn test_seq_to_passed_array_oversized_terminates() {
        let v = Value::vector(ints(&[1, 2]));
        let dest = ints(&[9, 9, 9, 9]);
        let out = seq_to_passed_array(&v, dest).unwrap();
        assert_eq!(
            out,
            vec![Value::Int(1), Value::Int(2), Value::Nil, Value::Int(9)]
        );
    }

    #[test]
    fn test_seq_to_passed_array_exact() {
        let v = Value::vector(ints(&[1, 2]));
        let out = seq_to_passed_array(&v, ints(&[0, 0])).unwrap();
        assert_eq!(out, ints(&[1, 2]));
    }

    #[test]
    fn test_keys_vals_free_functions() {
        let pairs = (0..10).map(|i| (Value::Int(i), Value::Nil)).collect();
        let m = Value::Map(make_map(pairs).unwrap());
        let ks = keys(&m).unwrap().unwrap();
        assert_eq!(ks.count().unwrap(), 10);
        let mut found: Vec<i64> = ks.iter().map(|k| k.unwrap().as_int().unwrap()).collect();
        found.sort();
        assert_eq!(found, (0..10).collect::<Vec<_>>());
        assert!(vals(&Value::Nil).unwrap().is_none());
        assert!(keys(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_long_cons_chain_drops_without_overflow() {
        let mut s = Value::Nil;
        for i in 0..200_000 {
            s = Value::Seq(Seq::Cons(Arc::new(Cons {
                first: Value::Int(i),
                rest: s,
            })));
        }
        assert_eq!(first(&s).unwrap(), Value::Int(199_999));
        drop(s);
    }
}

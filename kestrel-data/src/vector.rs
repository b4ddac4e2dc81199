// kestrel-data - Persistent vector and subvector views
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Indexed persistent collections.
//!
//! [`Vector`] wraps an `im::Vector` (an RRB tree), which gives structural
//! sharing and O(log n) indexed update. [`SubVector`] is a view over a
//! contiguous range of a backing vector; it never copies the backing.

use std::fmt;

use crate::coll::{Associative, Counted, Seqable, Stack};
use crate::error::{Error, Result};
use crate::seq::{Seq, VectorSeq};
use crate::value::Value;

/// A persistent vector.
#[derive(Clone, Default, PartialEq)]
pub struct Vector {
    items: im::Vector<Value>,
}

impl Vector {
    pub fn new() -> Self {
        Vector {
            items: im::Vector::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn nth(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// A new vector with `x` appended.
    pub fn conj(&self, x: Value) -> Vector {
        let mut items = self.items.clone();
        items.push_back(x);
        Vector { items }
    }

    /// Replace the element at `index`. An index equal to the count appends.
    pub fn assoc_n(&self, index: usize, x: Value) -> Result<Vector> {
        let count = self.count();
        if index == count {
            Ok(self.conj(x))
        } else if index < count {
            Ok(Vector {
                items: self.items.update(index, x),
            })
        } else {
            Err(Error::out_of_bounds(index as i64, count))
        }
    }

    /// A view over `start..end`. An empty range gives the empty vector.
    pub fn subvec(&self, start: usize, end: usize) -> Result<Value> {
        SubVector::over(self.clone(), start, end)
    }

    pub fn iter(&self) -> im::vector::Iter<'_, Value> {
        self.items.iter()
    }

    pub(crate) fn items(&self) -> &im::Vector<Value> {
        &self.items
    }
}

impl FromIterator<Value> for Vector {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Vector {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Vector {
    type Item = &'a Value;
    type IntoIter = im::vector::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Counted for Vector {
    fn count(&self) -> usize {
        Vector::count(self)
    }
}

impl Seqable for Vector {
    fn seq(&self) -> Result<Option<Seq>> {
        Ok(VectorSeq::new(self.items.clone(), 0, self.count()).map(Seq::Vector))
    }
}

impl Associative for Vector {
    fn assoc(&self, key: Value, val: Value) -> Result<Self> {
        let index = vector_index(&key, "assoc")?;
        self.assoc_n(index, val)
    }

    fn val_at(&self, key: &Value) -> Option<Value> {
        let index = usize::try_from(key.as_int()?).ok()?;
        self.nth(index).cloned()
    }
}

impl Stack for Vector {
    type Popped = Vector;

    fn peek(&self) -> Result<Value> {
        self.items
            .last()
            .cloned()
            .ok_or(Error::empty("peek", "vector"))
    }

    fn pop(&self) -> Result<Vector> {
        let mut items = self.items.clone();
        match items.pop_back() {
            Some(_) => Ok(Vector { items }),
            None => Err(Error::empty("pop", "vector")),
        }
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Vector keys are non-negative integers.
fn vector_index(key: &Value, op: &str) -> Result<usize> {
    match key {
        Value::Int(n) => usize::try_from(*n).map_err(|_| Error::out_of_bounds(*n, 0)),
        other => Err(Error::type_error_in(op, "integer index", other.type_name())),
    }
}

// ============================================================================
// SubVector
// ============================================================================

/// A non-empty view over `backing[start..end]`.
///
/// Empty ranges are represented by the empty [`Vector`] instead, so a
/// `SubVector` always has at least one element.
#[derive(Clone)]
pub struct SubVector {
    backing: Vector,
    start: usize,
    end: usize,
}

impl SubVector {
    /// Build a view, validating `start <= end <= backing.count()`.
    pub(crate) fn over(backing: Vector, start: usize, end: usize) -> Result<Value> {
        if end < start {
            return Err(Error::out_of_bounds(end as i64, backing.count()));
        }
        if end > backing.count() {
            return Err(Error::out_of_bounds(end as i64, backing.count()));
        }
        if start == end {
            return Ok(Value::Vector(Vector::new()));
        }
        Ok(Value::SubVector(SubVector {
            backing,
            start,
            end,
        }))
    }

    /// A view of this view. The result points at the original backing vector.
    pub fn subvec(&self, start: usize, end: usize) -> Result<Value> {
        if end < start || end > self.count() {
            return Err(Error::out_of_bounds(end as i64, self.count()));
        }
        SubVector::over(self.backing.clone(), self.start + start, self.start + end)
    }

    pub fn count(&self) -> usize {
        self.end - self.start
    }

    pub fn nth(&self, index: usize) -> Option<&Value> {
        if index < self.count() {
            self.backing.nth(self.start + index)
        } else {
            None
        }
    }

    /// Append after the view's end, writing through to a new backing vector.
    pub fn conj(&self, x: Value) -> Result<SubVector> {
        Ok(SubVector {
            backing: self.backing.assoc_n(self.end, x)?,
            start: self.start,
            end: self.end + 1,
        })
    }

    pub fn assoc_n(&self, index: usize, x: Value) -> Result<SubVector> {
        let count = self.count();
        if index == count {
            self.conj(x)
        } else if index < count {
            Ok(SubVector {
                backing: self.backing.assoc_n(self.start + index, x)?,
                start: self.start,
                end: self.end,
            })
        } else {
            Err(Error::out_of_bounds(index as i64, count))
        }
    }

    pub fn iter(&self) -> im::vector::Iter<'_, Value> {
        self.backing.items().focus().narrow(self.start..self.end).into_iter()
    }

    /// Copy the viewed range into a standalone vector.
    pub fn to_vector(&self) -> Vector {
        self.iter().cloned().collect()
    }
}

impl Counted for SubVector {
    fn count(&self) -> usize {
        SubVector::count(self)
    }
}

impl Seqable for SubVector {
    fn seq(&self) -> Result<Option<Seq>> {
        Ok(VectorSeq::new(self.backing.items().clone(), self.start, self.end).map(Seq::Vector))
    }
}

impl Associative for SubVector {
    fn assoc(&self, key: Value, val: Value) -> Result<Self> {
        let index = vector_index(&key, "assoc")?;
        self.assoc_n(index, val)
    }

    fn val_at(&self, key: &Value) -> Option<Value> {
        let index = usize::try_from(key.as_int()?).ok()?;
        self.nth(index).cloned()
    }
}

impl Stack for SubVector {
    /// Popping the last element gives the empty vector.
    type Popped = Value;

    fn peek(&self) -> Result<Value> {
        self.backing
            .nth(self.end - 1)
            .cloned()
            .ok_or(Error::empty("peek", "vector"))
    }

    fn pop(&self) -> Result<Value> {
        if self.end - 1 == self.start {
            return Ok(Value::Vector(Vector::new()));
        }
        Ok(Value::SubVector(SubVector {
            backing: self.backing.clone(),
            start: self.start,
            end: self.end - 1,
        }))
    }
}

impl fmt::Debug for SubVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(ns: &[i64]) -> Vector {
        ns.iter().map(|n| Value::Int(*n)).collect()
    }

    fn sub(v: &Vector, start: usize, end: usize) -> SubVector {
        match v.subvec(start, end).unwrap() {
            Value::SubVector(s) => s,
            other => panic!("expected subvector, got {:?}", other),
        }
    }

    // ========================================================================
    // Vector
    // ========================================================================

    #[test]
    fn test_conj_leaves_original() {
        let v = vec_of(&[1, 2]);
        let w = v.conj(Value::Int(3));
        assert_eq!(v.count(), 2);
        assert_eq!(w.count(), 3);
        assert_eq!(w.nth(2), Some(&Value::Int(3)));
    }

    #[test]
    fn test_assoc_n() {
        let v = vec_of(&[1, 2, 3]);
        assert_eq!(v.assoc_n(1, Value::Int(20)).unwrap(), vec_of(&[1, 20, 3]));
        assert_eq!(v.assoc_n(3, Value::Int(4)).unwrap(), vec_of(&[1, 2, 3, 4]));
        assert!(matches!(
            v.assoc_n(5, Value::Nil),
            Err(Error::IndexOutOfBounds { index: 5, count: 3 })
        ));
        assert_eq!(v, vec_of(&[1, 2, 3]));
    }

    #[test]
    fn test_assoc_requires_integer_key() {
        let v = vec_of(&[1]);
        assert!(matches!(
            v.assoc(Value::from("x"), Value::Nil),
            Err(Error::TypeError { .. })
        ));
        assert_eq!(v.val_at(&Value::Int(0)), Some(Value::Int(1)));
        assert_eq!(v.val_at(&Value::Int(-1)), None);
    }

    #[test]
    fn test_vector_peek_pop() {
        let v = vec_of(&[1, 2]);
        assert_eq!(v.peek().unwrap(), Value::Int(2));
        assert_eq!(v.pop().unwrap(), vec_of(&[1]));
        assert!(matches!(Vector::new().pop(), Err(Error::EmptyCollection { .. })));
        assert!(matches!(Vector::new().peek(), Err(Error::EmptyCollection { .. })));
    }

    // ========================================================================
    // SubVector
    // ========================================================================

    #[test]
    fn test_subvec_bounds() {
        let v = vec_of(&[0, 1, 2, 3, 4]);
        assert!(matches!(v.subvec(3, 1), Err(Error::IndexOutOfBounds { .. })));
        assert!(matches!(v.subvec(0, 6), Err(Error::IndexOutOfBounds { .. })));
        assert!(v.subvec(0, 5).is_ok());
    }

    #[test]
    fn test_empty_range_is_empty_vector() {
        let v = vec_of(&[0, 1, 2]);
        match v.subvec(2, 2).unwrap() {
            Value::Vector(e) => assert!(e.is_empty()),
            other => panic!("expected empty vector, got {:?}", other),
        }
    }

    #[test]
    fn test_subvec_reads_through() {
        let v = vec_of(&[0, 1, 2, 3, 4]);
        let s = sub(&v, 1, 4);
        assert_eq!(s.count(), 3);
        assert_eq!(s.nth(0), Some(&Value::Int(1)));
        assert_eq!(s.nth(2), Some(&Value::Int(3)));
        assert_eq!(s.nth(3), None);
        assert_eq!(s.to_vector(), vec_of(&[1, 2, 3]));
    }

    #[test]
    fn test_subvec_iter_deep_in_large_vector() {
        let v: Vector = (0..200_000).map(Value::Int).collect();
        let s = sub(&v, 150_000, 150_005);
        let items: Vec<&Value> = s.iter().collect();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], &Value::Int(150_000));
        assert_eq!(items[4], &Value::Int(150_004));
        assert_eq!(s.iter().next_back(), Some(&Value::Int(150_004)));
    }

    #[test]
    fn test_nested_subvec_flattens() {
        let v = vec_of(&[0, 1, 2, 3, 4, 5]);
        let outer = sub(&v, 1, 5);
        let inner = match outer.subvec(1, 3).unwrap() {
            Value::SubVector(s) => s,
            other => panic!("expected subvector, got {:?}", other),
        };
        assert_eq!(inner.start, 2);
        assert_eq!(inner.end, 4);
        assert_eq!(inner.to_vector(), vec_of(&[2, 3]));
        assert!(outer.subvec(2, 5).is_err());
    }

    #[test]
    fn test_subvec_conj_writes_through_to_copy() {
        let v = vec_of(&[0, 1, 2, 3]);
        let s = sub(&v, 0, 2);
        let grown = s.conj(Value::Int(99)).unwrap();
        assert_eq!(grown.to_vector(), vec_of(&[0, 1, 99]));
        assert_eq!(v, vec_of(&[0, 1, 2, 3]));
        assert_eq!(s.to_vector(), vec_of(&[0, 1]));
    }

    #[test]
    fn test_subvec_pop_to_empty() {
        let v = vec_of(&[0, 1, 2]);
        let s = sub(&v, 1, 2);
        assert_eq!(s.peek().unwrap(), Value::Int(1));
        match s.pop().unwrap() {
            Value::Vector(e) => assert!(e.is_empty()),
            other => panic!("expected empty vector, got {:?}", other),
        }
    }
}

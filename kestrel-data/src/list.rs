// kestrel-data - Persistent singly-linked list
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! An immutable cons list with O(1) `cons`, `first`, `rest` and `count`.
//!
//! Every node records the length of the chain it heads, so `count` never
//! walks the list. Consing allocates one node pointing at the existing
//! chain, which is shared and never copied.

use std::fmt;
use std::sync::Arc;

use crate::coll::{Counted, Seqable, Stack};
use crate::error::{Error, Result};
use crate::seq::Seq;
use crate::value::Value;

/// A persistent list. The empty list has no head node.
#[derive(Clone, Default)]
pub struct List {
    head: Option<Arc<ListNode>>,
}

struct ListNode {
    first: Value,
    rest: Option<Arc<ListNode>>,
    count: usize,
}

// Unlink uniquely-owned tails one node at a time so dropping a long list
// can't overflow the stack.
impl Drop for ListNode {
    fn drop(&mut self) {
        let mut next = self.rest.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.rest.take(),
                Err(_) => break,
            }
        }
    }
}

impl List {
    pub fn empty() -> Self {
        List { head: None }
    }

    /// A new list with `x` in front of this one.
    pub fn cons(&self, x: Value) -> List {
        let count = self.count() + 1;
        List {
            head: Some(Arc::new(ListNode {
                first: x,
                rest: self.head.clone(),
                count,
            })),
        }
    }

    /// Same as [`cons`](List::cons); lists grow at the front.
    pub fn conj(&self, x: Value) -> List {
        self.cons(x)
    }

    pub fn first(&self) -> Option<&Value> {
        self.head.as_ref().map(|node| &node.first)
    }

    /// Everything after the first element. The rest of an empty list is empty.
    pub fn rest(&self) -> List {
        List {
            head: self.head.as_ref().and_then(|node| node.rest.clone()),
        }
    }

    pub fn count(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.count)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn iter(&self) -> ListIter<'_> {
        ListIter {
            node: self.head.as_deref(),
        }
    }

    /// True when both lists share the same head node.
    pub fn ptr_eq(&self, other: &List) -> bool {
        match (&self.head, &other.head) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

pub struct ListIter<'a> {
    node: Option<&'a ListNode>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.node?;
        self.node = node.rest.as_deref();
        Some(&node.first)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.node.map_or(0, |node| node.count);
        (n, Some(n))
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let items: Vec<Value> = iter.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(List::empty(), |list, item| list.cons(item))
    }
}

impl Counted for List {
    fn count(&self) -> usize {
        List::count(self)
    }
}

impl Seqable for List {
    fn seq(&self) -> Result<Option<Seq>> {
        if self.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Seq::List(self.clone())))
        }
    }
}

impl Stack for List {
    type Popped = List;

    fn peek(&self) -> Result<Value> {
        self.first().cloned().ok_or(Error::empty("peek", "list"))
    }

    fn pop(&self) -> Result<List> {
        if self.is_empty() {
            return Err(Error::empty("pop", "list"));
        }
        Ok(self.rest())
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.count() == other.count() && self.iter().eq(other.iter()))
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

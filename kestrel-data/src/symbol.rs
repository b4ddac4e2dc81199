// kestrel-data - Symbol type with interning
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Symbols are identifiers that may be optionally namespaced.
//!
//! # Interning
//!
//! Every symbol is interned in a process-wide table, so two symbols with the
//! same namespace and name are the same instance:
//!
//! - **O(1) equality**: comparing symbols is a pointer comparison
//! - **O(1) hashing**: the hash is computed from the pointer address
//! - **Memory efficiency**: identical symbols share storage
//!
//! Interned symbols are never deallocated. Memory grows with the number of
//! distinct symbols a program creates, which for generated names such as
//! `gensym` output is worth keeping in mind.
//!
//! # Thread Safety
//!
//! The table is a sharded concurrent map. Creation takes a shard lock;
//! comparison and hashing never lock.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::intern::{InternTable, Interned, split_qualified};

/// A symbol with optional namespace.
#[derive(Clone)]
pub struct Symbol {
    inner: Arc<Interned>,
}

static SYMBOLS: OnceLock<InternTable> = OnceLock::new();

fn table() -> &'static InternTable {
    SYMBOLS.get_or_init(|| InternTable::new("symbol"))
}

impl Symbol {
    /// Intern a symbol from an optional namespace and a name.
    pub fn intern(namespace: Option<&str>, name: &str) -> Result<Self> {
        let inner = table().intern(namespace, name)?;
        Ok(Symbol { inner })
    }

    /// Create a symbol with no namespace.
    pub fn new(name: &str) -> Result<Self> {
        Symbol::intern(None, name)
    }

    /// Create a symbol with a namespace.
    pub fn with_namespace(namespace: &str, name: &str) -> Result<Self> {
        Symbol::intern(Some(namespace), name)
    }

    /// Parse a symbol from a string like "foo" or "ns/foo".
    pub fn parse(s: &str) -> Result<Self> {
        let (ns, name) = split_qualified(s);
        Symbol::intern(ns, name)
    }

    /// Number of distinct symbols interned so far.
    pub fn interned_count() -> usize {
        table().len()
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.inner.namespace.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn has_namespace(&self) -> bool {
        self.inner.namespace.is_some()
    }

    #[cfg(test)]
    pub(crate) fn as_ptr(&self) -> *const Interned {
        Arc::as_ptr(&self.inner)
    }

    /// The same name without its namespace.
    pub fn without_namespace(&self) -> Symbol {
        match self.inner.namespace {
            None => self.clone(),
            // Names already passed validation, so this can't fail.
            Some(_) => Symbol::new(&self.inner.name).unwrap_or_else(|_| self.clone()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.inner.namespace {
            write!(f, "{}/{}", ns, self.inner.name)
        } else {
            write!(f, "{}", self.inner.name)
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_names(&self.inner, &other.inner)
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

/// Un-namespaced names sort before namespaced ones.
pub(crate) fn compare_names(a: &Interned, b: &Interned) -> Ordering {
    match (&a.namespace, &b.namespace) {
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
        (Some(x), Some(y)) => x.cmp(y).then_with(|| a.name.cmp(&b.name)),
    }
}

// ============================================================================
// Tests
// ============================================================================

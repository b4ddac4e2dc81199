// kestrel-data - Var reference cells
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Vars: named, mutable reference cells with a root value.
//!
//! This type only knows about the root. Thread-local dynamic bindings live in
//! `kestrel-core`, which consults them before falling back to [`Var::root`].
//! Root reads and writes are atomic with respect to each other; concurrent
//! redefinitions are last-writer-wins.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::keyword::Keyword;
use crate::map::PersistentMap;
use crate::symbol::Symbol;
use crate::value::Value;

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(1);

/// A var. Clones are handles onto the same cell.
#[derive(Clone)]
pub struct Var {
    inner: Arc<VarInner>,
}

struct VarInner {
    id: u64,
    ns: Option<Symbol>,
    sym: Option<Symbol>,
    /// `None` while unbound.
    root: RwLock<Option<Value>>,
    dynamic: AtomicBool,
    meta: RwLock<PersistentMap>,
}

impl Var {
    /// Create a var named `sym` in namespace `ns`.
    pub fn new(ns: Option<Symbol>, sym: Symbol, root: Option<Value>) -> Self {
        Var::build(ns, Some(sym), root)
    }

    /// A var belonging to no namespace.
    pub fn anonymous(root: Option<Value>) -> Self {
        Var::build(None, None, root)
    }

    fn build(ns: Option<Symbol>, sym: Option<Symbol>, root: Option<Value>) -> Self {
        Var {
            inner: Arc::new(VarInner {
                id: NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed),
                ns,
                sym,
                root: RwLock::new(root),
                dynamic: AtomicBool::new(false),
                meta: RwLock::new(PersistentMap::empty()),
            }),
        }
    }

    /// Process-unique identity, stable for the var's lifetime.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The owning namespace's name.
    pub fn ns(&self) -> Option<&Symbol> {
        self.inner.ns.as_ref()
    }

    pub fn sym(&self) -> Option<&Symbol> {
        self.inner.sym.as_ref()
    }

    pub fn qualified_name(&self) -> String {
        match (&self.inner.ns, &self.inner.sym) {
            (Some(ns), Some(sym)) => format!("{}/{}", ns, sym),
            (None, Some(sym)) => sym.to_string(),
            _ => format!("<anonymous-{}>", self.inner.id),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.inner.dynamic.load(Ordering::Acquire)
    }

    /// Set the dynamic flag. Returns `self` for chaining.
    pub fn set_dynamic(&self, dynamic: bool) -> &Self {
        self.inner.dynamic.store(dynamic, Ordering::Release);
        self
    }

    /// The root value, or `None` if the var is unbound.
    pub fn root(&self) -> Option<Value> {
        self.inner
            .root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The root value, failing if unbound.
    pub fn deref_root(&self) -> Result<Value> {
        self.root()
            .ok_or_else(|| Error::UnboundVar(self.qualified_name()))
    }

    pub fn has_root(&self) -> bool {
        self.inner
            .root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the root value.
    pub fn bind_root(&self, value: Value) {
        *self
            .inner
            .root
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    pub fn unbind_root(&self) {
        *self
            .inner
            .root
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn meta(&self) -> PersistentMap {
        self.inner
            .meta
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_meta(&self, meta: PersistentMap) {
        *self
            .inner
            .meta
            .write()
            .unwrap_or_else(PoisonError::into_inner) = meta;
    }

    /// Apply `f` to the metadata under the write lock. Returns the new map.
    pub fn alter_meta<F>(&self, f: F) -> PersistentMap
    where
        F: FnOnce(&PersistentMap) -> PersistentMap,
    {
        let mut meta = self
            .inner
            .meta
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *meta = f(&meta);
        meta.clone()
    }

    /// A var is public unless its metadata has a truthy `:private`.
    pub fn is_public(&self) -> bool {
        let Ok(private) = Keyword::new("private") else {
            return true;
        };
        !self
            .meta()
            .get(&Value::Keyword(private))
            .is_some_and(Value::is_truthy)
    }

    pub fn ptr_eq(&self, other: &Var) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#'{}", self.qualified_name())
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// kestrel-data - Value type for the Kestrel runtime
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The core [`Value`] type.
//!
//! Every variant is cheap to clone: scalars are copied and everything else is
//! an `Arc` handle onto immutable (or internally synchronised) storage, so
//! values can be shared freely between threads.
//!
//! Equality follows the language's `=`: sequential collections (lists,
//! vectors, subvectors, seqs and lazy seqs) compare element-wise with each
//! other regardless of representation, maps compare by entries, vars and
//! opaque handles compare by identity. Integers and floats are never equal to
//! each other. Hashing is consistent with this equality.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::Result;
use crate::keyword::Keyword;
use crate::lazy::LazySeq;
use crate::list::List;
use crate::map::PersistentMap;
use crate::print::{RenderOptions, render};
use crate::seq::{Seq, seq_iter};
use crate::symbol::Symbol;
use crate::var::Var;
use crate::vector::{SubVector, Vector};

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    String(Arc<str>),
    Symbol(Symbol),
    Keyword(Keyword),
    List(List),
    Vector(Vector),
    SubVector(SubVector),
    Map(PersistentMap),
    /// A sequence view over some other collection.
    Seq(Seq),
    LazySeq(LazySeq),
    Var(Var),
    /// Early-termination marker for [`reduce`](crate::reduce::reduce).
    Reduced(Arc<Value>),
    /// A host object the runtime stores but doesn't interpret.
    Opaque(Opaque),
}

impl Value {
    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::SubVector(_) => "subvector",
            Value::Map(_) => "map",
            Value::Seq(_) => "seq",
            Value::LazySeq(_) => "lazy-seq",
            Value::Var(_) => "var",
            Value::Reduced(_) => "reduced",
            Value::Opaque(o) => o.type_name(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except `nil` and `false` is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Lists, vectors, subvectors and sequences.
    pub fn is_sequential(&self) -> bool {
        matches!(
            self,
            Value::List(_)
                | Value::Vector(_)
                | Value::SubVector(_)
                | Value::Seq(_)
                | Value::LazySeq(_)
        )
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse and intern a symbol value.
    pub fn symbol(s: &str) -> Result<Value> {
        Ok(Value::Symbol(Symbol::parse(s)?))
    }

    /// Parse and intern a keyword value.
    pub fn keyword(s: &str) -> Result<Value> {
        Ok(Value::Keyword(Keyword::parse(s)?))
    }

    /// A vector value built from the given items.
    pub fn vector(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Vector(items.into_iter().collect())
    }

    /// A list value built from the given items, in order.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// The element count when it's known without traversal.
    pub(crate) fn counted_len(&self) -> Option<usize> {
        match self {
            Value::Nil => Some(0),
            Value::List(l) => Some(l.count()),
            Value::Vector(v) => Some(v.count()),
            Value::SubVector(v) => Some(v.count()),
            Value::Map(m) => Some(m.count()),
            _ => None,
        }
    }
}

// ============================================================================
// Opaque host objects
// ============================================================================

/// A handle onto a host object, such as an output stream or a namespace.
///
/// Opaque values compare and hash by identity of the handle.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    label: Arc<str>,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(type_name: &'static str, label: &str, value: T) -> Self {
        Opaque {
            type_name,
            label: Arc::from(label),
            handle: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.handle) as *const () as usize
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#object[{} {}]", self.type_name, self.label)
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<Keyword> for Value {
    fn from(k: Keyword) -> Self {
        Value::Keyword(k)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

impl From<Vector> for Value {
    fn from(v: Vector) -> Self {
        Value::Vector(v)
    }
}

impl From<PersistentMap> for Value {
    fn from(m: PersistentMap) -> Self {
        Value::Map(m)
    }
}

impl From<Seq> for Value {
    fn from(s: Seq) -> Self {
        Value::Seq(s)
    }
}

impl From<Option<Seq>> for Value {
    fn from(s: Option<Seq>) -> Self {
        s.map_or(Value::Nil, Value::Seq)
    }
}

impl From<LazySeq> for Value {
    fn from(l: LazySeq) -> Self {
        Value::LazySeq(l)
    }
}

impl From<Var> for Value {
    fn from(v: Var) -> Self {
        Value::Var(v)
    }
}

impl From<Opaque> for Value {
    fn from(o: Opaque) -> Self {
        Value::Opaque(o)
    }
}

// ============================================================================
// Display implementation
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match render(self, f, &RenderOptions::default()) {
            Ok(()) => Ok(()),
            Err(crate::Error::Format(e)) => Err(e),
            // A lazy seq failed to realize part way through.
            Err(e) => write!(f, "#error[{}]", e),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// ============================================================================
// Equality and hashing (for use as map keys)
// ============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Var(a), Value::Var(b)) => a == b,
            (Value::Reduced(a), Value::Reduced(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            (a, b) if a.is_sequential() && b.is_sequential() => sequential_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Element-wise comparison of two sequential values. A lazy seq that fails
/// to realize is unequal to everything.
fn sequential_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.counted_len(), b.counted_len()) {
        if x != y {
            return false;
        }
    }
    let (Ok(mut xs), Ok(mut ys)) = (seq_iter(a), seq_iter(b)) else {
        return false;
    };
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return true,
            (Some(Ok(x)), Some(Ok(y))) => {
                if x != y {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Shared by every sequential variant so equal sequences hash alike.
const SEQUENTIAL_TAG: u8 = 0x5e;

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_sequential() {
            SEQUENTIAL_TAG.hash(state);
            if let Ok(items) = seq_iter(self) {
                for item in items {
                    match item {
                        Ok(v) => v.hash(state),
                        Err(_) => break,
                    }
                }
            }
            return;
        }
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(n) => n.to_bits().hash(state),
            Value::Char(c) => c.hash(state),
            Value::String(s) => s.hash(state),
            Value::Symbol(sym) => sym.hash(state),
            Value::Keyword(kw) => kw.hash(state),
            Value::Map(m) => m.hash(state),
            Value::Var(v) => v.hash(state),
            Value::Reduced(v) => v.hash(state),
            Value::Opaque(o) => o.addr().hash(state),
            Value::List(_)
            | Value::Vector(_)
            | Value::SubVector(_)
            | Value::Seq(_)
            | Value::LazySeq(_) => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

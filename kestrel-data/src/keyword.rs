// kestrel-data - Keyword type with interning
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Keywords are self-evaluating identifiers that may be optionally namespaced.
//!
//! Keywords are interned the same way as [`Symbol`](crate::Symbol)s but in a
//! table of their own: the symbol `foo` and the keyword `:foo` never share
//! an instance.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::intern::{InternTable, Interned, split_qualified};
use crate::symbol::compare_names;

/// A keyword with optional namespace. Always printed with a leading `:`.
#[derive(Clone)]
pub struct Keyword {
    inner: Arc<Interned>,
}

static KEYWORDS: OnceLock<InternTable> = OnceLock::new();

fn table() -> &'static InternTable {
    KEYWORDS.get_or_init(|| InternTable::new("keyword"))
}

impl Keyword {
    pub fn intern(namespace: Option<&str>, name: &str) -> Result<Self> {
        let inner = table().intern(namespace, name)?;
        Ok(Keyword { inner })
    }

    /// Create a keyword with no namespace.
    pub fn new(name: &str) -> Result<Self> {
        Keyword::intern(None, name)
    }

    /// Create a keyword with a namespace.
    pub fn with_namespace(namespace: &str, name: &str) -> Result<Self> {
        Keyword::intern(Some(namespace), name)
    }

    /// Parse a keyword from ":foo", ":ns/foo" or the same without the colon.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.strip_prefix(':').unwrap_or(s);
        let (ns, name) = split_qualified(s);
        Keyword::intern(ns, name)
    }

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
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.inner.namespace {
            write!(f, ":{}/{}", ns, self.inner.name)
        } else {
            write!(f, ":{}", self.inner.name)
        }
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keyword({})", self)
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Keyword {}

impl PartialOrd for Keyword {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyword {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_names(&self.inner, &other.inner)
    }
}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn test_simple_keyword() {
        let kw = Keyword::new("foo").unwrap();
        assert_eq!(kw.name(), "foo");
        assert!(kw.namespace().is_none());
        assert_eq!(format!("{}", kw), ":foo");
    }

    #[test]
    fn test_namespaced_keyword() {
        let kw = Keyword::with_namespace("user", "foo").unwrap();
        assert_eq!(kw.namespace(), Some("user"));
        assert_eq!(format!("{}", kw), ":user/foo");
    }

    #[test]
    fn test_parse_with_and_without_colon() {
        assert_eq!(
            Keyword::parse(":ns/foo").unwrap(),
            Keyword::parse("ns/foo").unwrap()
        );
        assert_eq!(Keyword::parse(":foo").unwrap(), Keyword::new("foo").unwrap());
        assert!(Keyword::parse(":").is_err());
    }

    #[test]
    fn test_interning() {
        let kw1 = Keyword::new("foo").unwrap();
        let kw2 = Keyword::new("foo").unwrap();
        assert!(Arc::ptr_eq(&kw1.inner, &kw2.inner));
    }

    #[test]
    fn test_separate_from_symbols() {
        let kw = Keyword::new("shared-name").unwrap();
        let sym = Symbol::new("shared-name").unwrap();
        assert_eq!(kw.name(), sym.name());
        assert!(!std::ptr::eq(Arc::as_ptr(&kw.inner), sym.as_ptr()));
    }
}

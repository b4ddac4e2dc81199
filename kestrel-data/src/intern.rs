// kestrel-data - Canonical name tables
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The interning table shared by [`Symbol`](crate::Symbol) and
//! [`Keyword`](crate::Keyword).
//!
//! Each table maps `(namespace, name)` to one shared [`Interned`] record for
//! the lifetime of the process. Insertion goes through a single
//! `entry().or_insert_with()` on a sharded [`DashMap`], so two threads
//! interning the same key at the same time always get the same instance.
//!
//! Nothing is ever evicted. A program's vocabulary of names is finite, and
//! identity comparison is only sound if a name outlives every holder of it.

use std::sync::Arc;

use dashmap::DashMap;
use log::trace;

use crate::error::{Error, Result};

/// The canonical storage behind a symbol or keyword.
#[derive(Debug)]
pub(crate) struct Interned {
    pub(crate) namespace: Option<Arc<str>>,
    pub(crate) name: Arc<str>,
}

type InternKey = (Option<Arc<str>>, Arc<str>);

pub(crate) struct InternTable {
    kind: &'static str,
    entries: DashMap<InternKey, Arc<Interned>>,
}

impl InternTable {
    pub(crate) fn new(kind: &'static str) -> Self {
        InternTable {
            kind,
            entries: DashMap::new(),
        }
    }

    pub(crate) fn intern(&self, namespace: Option<&str>, name: &str) -> Result<Arc<Interned>> {
        validate(namespace, name)?;

        let key: InternKey = (namespace.map(Arc::from), Arc::from(name));
        let entry = self.entries.entry(key.clone()).or_insert_with(|| {
            trace!("interned {} {:?}/{}", self.kind, key.0, key.1);
            Arc::new(Interned {
                namespace: key.0,
                name: key.1,
            })
        });
        Ok(Arc::clone(entry.value()))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

fn validate(namespace: Option<&str>, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "empty name"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::invalid_name(name, "name contains whitespace"));
    }
    match namespace {
        Some("") => Err(Error::invalid_name(name, "empty namespace")),
        Some(ns) if ns.chars().any(char::is_whitespace) => {
            Err(Error::invalid_name(ns, "namespace contains whitespace"))
        }
        _ => Ok(()),
    }
}

/// Split `"ns/name"` into its parts. A lone `/` is the plain name `/`.
pub(crate) fn split_qualified(s: &str) -> (Option<&str>, &str) {
    if s == "/" {
        return (None, s);
    }
    match s.find('/') {
        Some(pos) => (Some(&s[..pos]), &s[pos + 1..]),
        None => (None, s),
    }
}

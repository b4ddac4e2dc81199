// kestrel-data - Error types for the Kestrel runtime
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Error types shared by every layer of the runtime.
//!
//! Absence is never an error here: a missing key yields the caller's
//! `not_found` value and an exhausted sequence yields `None`. The variants
//! below all describe a defect in the caller or in the input data.

use std::fmt;

use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the interner, the collections and the var system.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A symbol or keyword with an empty or malformed component.
    #[error("Invalid name: {name:?} ({reason})")]
    InvalidName { name: String, reason: &'static str },

    /// A map literal or constructor received the same key twice.
    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    /// Index or slice bounds outside `0..=count`.
    #[error("Index out of bounds: {index} (count: {count})")]
    IndexOutOfBounds { index: i64, count: usize },

    /// `peek`/`pop` on an empty stack-shaped collection.
    #[error("Can't {op} empty {kind}")]
    EmptyCollection { op: &'static str, kind: &'static str },

    /// A binding was popped out of order or with nothing pushed.
    #[error("Unbalanced binding: {0}")]
    UnbalancedBinding(String),

    /// Deref of a var with no root value and no thread binding.
    #[error("Var {0} is unbound")]
    UnboundVar(String),

    /// Attempt to dynamically bind a var that isn't marked dynamic.
    #[error("Can't dynamically bind non-dynamic var: {0}")]
    NotDynamic(String),

    /// `set!` on a var that has no thread binding.
    #[error("Can't change/establish root binding of: {0} with set")]
    NoThreadBinding(String),

    /// `seq` of a value that has no sequence view.
    #[error("Don't know how to create a sequence from: {0}")]
    NotSeqable(&'static str),

    /// A lazy seq whose producer panicked during an earlier realization.
    #[error("Lazy seq producer panicked; the sequence can't be realized")]
    ProducerPanicked,

    /// A value of the wrong kind was passed to a generic operation.
    #[error("{}", format_type_error(.expected, .got, .context.as_deref()))]
    TypeError {
        expected: &'static str,
        got: &'static str,
        context: Option<String>,
    },

    /// Writing rendered output failed.
    #[error("Format error: {0}")]
    Format(#[from] fmt::Error),
}

fn format_type_error(expected: &str, got: &str, context: Option<&str>) -> String {
    match context {
        Some(ctx) => format!("{}: expected {}, got {}", ctx, expected, got),
        None => format!("Type error: expected {}, got {}", expected, got),
    }
}

impl Error {
    /// Create a type error.
    pub fn type_error(expected: &'static str, got: &'static str) -> Self {
        Error::TypeError {
            expected,
            got,
            context: None,
        }
    }

    /// Create a type error with context (usually the operation name).
    pub fn type_error_in(context: &str, expected: &'static str, got: &'static str) -> Self {
        Error::TypeError {
            expected,
            got,
            context: Some(context.to_string()),
        }
    }

    pub fn invalid_name(name: &str, reason: &'static str) -> Self {
        Error::InvalidName {
            name: name.to_string(),
            reason,
        }
    }

    pub fn empty(op: &'static str, kind: &'static str) -> Self {
        Error::EmptyCollection { op, kind }
    }

    pub fn out_of_bounds(index: i64, count: usize) -> Self {
        Error::IndexOutOfBounds { index, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_error_display() {
        let e = Error::type_error("map", "vector");
        assert_eq!(e.to_string(), "Type error: expected map, got vector");
        let e = Error::type_error_in("assoc", "map", "list");
        assert_eq!(e.to_string(), "assoc: expected map, got list");
    }

    #[test]
    fn test_empty_collection_display() {
        assert_eq!(Error::empty("pop", "list").to_string(), "Can't pop empty list");
    }

    #[test]
    fn test_fmt_error_converts() {
        let e: Error = fmt::Error.into();
        assert!(matches!(e, Error::Format(_)));
    }
}

// kestrel-core - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for kestrel-core integration tests.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

pub use kestrel_core::{Namespace, Runtime, RuntimeConfig, Symbol, Value, Var};

pub fn sym(s: &str) -> Symbol {
    Symbol::parse(s).expect("valid symbol")
}

/// A runtime with default configuration and its own registry.
pub fn runtime() -> Runtime {
    Runtime::bootstrap(RuntimeConfig::default()).expect("bootstrap")
}

/// A dynamic var with root `root`, interned in a throwaway namespace.
pub fn dynamic_var(rt: &Runtime, name: &str, root: i64) -> Var {
    let var = rt
        .var("test.vars", name, Some(Value::Int(root)))
        .expect("var");
    var.set_dynamic(true);
    var
}

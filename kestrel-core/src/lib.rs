// kestrel-core - Namespaces, dynamic bindings and runtime bootstrap
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # kestrel-core
//!
//! The mutable half of the Kestrel runtime, built on `kestrel-data`:
//! the namespace registry, thread-local dynamic bindings for vars, and the
//! bootstrap that interns the well-known vars of `kestrel.core`.

pub mod bindings;
pub mod namespace;
pub mod runtime;

pub use bindings::{
    BindingFrame, BindingGuard, FrameGuard, bound_fn, current_value, frame_depth,
    get_thread_binding, has_thread_binding, is_bound, pop_binding, push_binding, push_bindings,
    set_binding, with_binding,
};
pub use namespace::{Namespace, NamespaceRegistry};
pub use runtime::{
    CORE_NS, CoreKeywords, CoreVars, READ_EVAL_ENV, Runtime, RuntimeConfig, StdStream, USER_NS,
    get_env_with_default, read_true_false_unknown,
};

// Re-export data types for convenience
pub use kestrel_data::{Error, Keyword, PersistentMap, Result, Symbol, Value, Var};

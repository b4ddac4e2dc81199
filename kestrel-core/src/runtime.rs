// kestrel-core - Runtime bootstrap and well-known vars
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Process-wide runtime state.
//!
//! A [`Runtime`] owns the namespace registry, the `kestrel.core` and `user`
//! namespaces, and the well-known vars every other layer reads: the
//! standard streams, the current namespace, the print flags and the
//! reader configuration. They are interned once by [`Runtime::bootstrap`]
//! and never re-created; code changes them by binding, not by replacing.

use std::sync::OnceLock;

use log::{debug, warn};

use kestrel_data::{
    Error, Keyword, Opaque, PersistentMap, RenderOptions, Result, Symbol, Value, Var, print_string,
};

use crate::bindings::{current_value, set_binding};
use crate::namespace::{Namespace, NamespaceRegistry};

/// The name of the core namespace.
pub const CORE_NS: &str = "kestrel.core";

/// The namespace new sessions start in.
pub const USER_NS: &str = "user";

/// Environment variable holding the initial value of `*read-eval*`.
pub const READ_EVAL_ENV: &str = "KESTREL_READ_EVAL";

// ============================================================================
// Configuration
// ============================================================================

/// Settings fixed at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Initial `*read-eval*`: `"true"`, `"false"`, or anything else for
    /// `:unknown`.
    pub read_eval: String,
    /// Becomes `*command-line-args*`; nil when empty.
    pub command_line_args: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            read_eval: "true".to_string(),
            command_line_args: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    /// Read the configuration from the process environment and arguments.
    pub fn from_env() -> Self {
        RuntimeConfig {
            read_eval: get_env_with_default(READ_EVAL_ENV, "true"),
            command_line_args: std::env::args().skip(1).collect(),
        }
    }
}

/// The value of the environment variable `key`, or `default` when it is
/// unset or not valid unicode.
pub fn get_env_with_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// `"true"` and `"false"` map to booleans; anything else to `:unknown`.
pub fn read_true_false_unknown(s: &str) -> Result<Value> {
    match s {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        other => {
            warn!("unrecognised read-eval setting {:?}, using :unknown", other);
            Value::keyword("unknown")
        }
    }
}

// ============================================================================
// Well-known values
// ============================================================================

/// The handles stored in `*in*`, `*out*` and `*err*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    pub fn label(self) -> &'static str {
        match self {
            StdStream::Stdin => "stdin",
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        }
    }

    pub fn to_value(self) -> Value {
        Value::Opaque(Opaque::new("StdStream", self.label(), self))
    }

    pub fn from_value(value: &Value) -> Option<StdStream> {
        match value {
            Value::Opaque(o) => o.downcast_ref::<StdStream>().copied(),
            _ => None,
        }
    }
}

/// Vars interned in `kestrel.core` at bootstrap.
#[derive(Debug, Clone)]
pub struct CoreVars {
    pub stdin: Var,
    pub stdout: Var,
    pub stderr: Var,
    pub current_ns: Var,
    pub print_meta: Var,
    pub print_readably: Var,
    pub print_dup: Var,
    pub print_length: Var,
    pub read_eval: Var,
    pub data_readers: Var,
    pub default_data_readers_fn: Var,
    pub default_data_readers: Var,
    pub command_line_args: Var,
    pub agent: Var,
    pub fn_loader: Var,
    /// `in-ns`, not dynamic.
    pub in_ns: Var,
    /// `ns`, not dynamic.
    pub ns: Var,
    /// Left unbound.
    pub print_initialized: Var,
}

/// Metadata keywords the reader and compiler attach to forms and vars.
#[derive(Debug, Clone)]
pub struct CoreKeywords {
    pub tag: Keyword,
    pub constant: Keyword,
    pub line: Keyword,
    pub column: Keyword,
    pub file: Keyword,
    pub declared: Keyword,
    pub doc: Keyword,
}

impl CoreKeywords {
    fn intern() -> Result<Self> {
        Ok(CoreKeywords {
            tag: Keyword::new("tag")?,
            constant: Keyword::new("const")?,
            line: Keyword::new("line")?,
            column: Keyword::new("column")?,
            file: Keyword::new("file")?,
            declared: Keyword::new("declared")?,
            doc: Keyword::new("doc")?,
        })
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// The namespaces and well-known vars of one runtime instance.
#[derive(Debug)]
pub struct Runtime {
    registry: NamespaceRegistry,
    core: Namespace,
    user: Namespace,
    vars: CoreVars,
    keywords: CoreKeywords,
    config: RuntimeConfig,
}

static GLOBAL: OnceLock<Result<Runtime>> = OnceLock::new();

impl Runtime {
    /// Build a fresh runtime with its own registry.
    pub fn bootstrap(config: RuntimeConfig) -> Result<Runtime> {
        let registry = NamespaceRegistry::new();
        let core = registry.find_or_create(&Symbol::new(CORE_NS)?);
        let user = registry.find_or_create(&Symbol::new(USER_NS)?);

        let dynamic = |name: &str, init: Value| -> Result<Var> {
            core.intern_dynamic(&Symbol::new(name)?, Some(init))
        };

        let command_line_args = if config.command_line_args.is_empty() {
            Value::Nil
        } else {
            Value::list(config.command_line_args.iter().map(|a| Value::from(a.as_str())))
        };

        let vars = CoreVars {
            stdin: dynamic("*in*", StdStream::Stdin.to_value())?,
            stdout: dynamic("*out*", StdStream::Stdout.to_value())?,
            stderr: dynamic("*err*", StdStream::Stderr.to_value())?,
            current_ns: dynamic("*ns*", core.to_value())?,
            print_meta: dynamic("*print-meta*", Value::Bool(false))?,
            print_readably: dynamic("*print-readably*", Value::Bool(true))?,
            print_dup: dynamic("*print-dup*", Value::Bool(false))?,
            print_length: dynamic("*print-length*", Value::Nil)?,
            read_eval: dynamic("*read-eval*", read_true_false_unknown(&config.read_eval)?)?,
            data_readers: dynamic("*data-readers*", Value::Map(PersistentMap::empty()))?,
            default_data_readers_fn: dynamic(
                "*default-data-readers-fn*",
                Value::Map(PersistentMap::empty()),
            )?,
            default_data_readers: dynamic(
                "*default-data-readers*",
                Value::Map(PersistentMap::empty()),
            )?,
            command_line_args: dynamic("*command-line-args*", command_line_args)?,
            agent: dynamic("*agent*", Value::Nil)?,
            fn_loader: dynamic("*fn-loader*", Value::Nil)?,
            in_ns: core.intern_var(&Symbol::new("in-ns")?, Some(Value::Bool(false)))?,
            ns: core.intern_var(&Symbol::new("ns")?, Some(Value::Bool(false)))?,
            print_initialized: core.intern(&Symbol::new("print-initialized")?)?,
        };

        user.refer_all(&core);

        debug!(
            "bootstrapped runtime with {} vars in {}",
            core.interns().len(),
            CORE_NS
        );

        Ok(Runtime {
            registry,
            core,
            user,
            vars,
            keywords: CoreKeywords::intern()?,
            config,
        })
    }

    /// The process-wide runtime, bootstrapped from the environment on first
    /// use.
    pub fn global() -> Result<&'static Runtime> {
        GLOBAL
            .get_or_init(|| Runtime::bootstrap(RuntimeConfig::from_env()))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub fn core_ns(&self) -> &Namespace {
        &self.core
    }

    pub fn user_ns(&self) -> &Namespace {
        &self.user
    }

    pub fn vars(&self) -> &CoreVars {
        &self.vars
    }

    pub fn keywords(&self) -> &CoreKeywords {
        &self.keywords
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The namespace `*ns*` currently holds on this thread.
    pub fn current_namespace(&self) -> Result<Namespace> {
        let value = current_value(&self.vars.current_ns)?;
        Namespace::from_value(&value)
            .ok_or_else(|| Error::type_error_in("*ns*", "namespace", value.type_name()))
    }

    /// Switch `*ns*` to the namespace `name`, creating it if needed. New
    /// namespaces refer everything public in `kestrel.core`.
    ///
    /// Like `set!`, this needs a thread binding of `*ns*` to change.
    pub fn in_ns(&self, name: &Symbol) -> Result<Namespace> {
        let ns = match self.registry.find(name) {
            Some(ns) => ns,
            None => {
                let ns = self.registry.find_or_create(name);
                if !ns.ptr_eq(&self.core) {
                    ns.refer_all(&self.core);
                }
                ns
            }
        };
        set_binding(&self.vars.current_ns, ns.to_value())?;
        Ok(ns)
    }

    /// Render `value` using this thread's `*print-readably*` and
    /// `*print-length*`.
    pub fn print_str(&self, value: &Value) -> Result<String> {
        let readably = current_value(&self.vars.print_readably)?.is_truthy();
        let print_length = current_value(&self.vars.print_length)?
            .as_int()
            .map(|n| usize::try_from(n).unwrap_or(0));
        let opts = RenderOptions {
            readably,
            print_length,
        };
        print_string(value, &opts)
    }

    /// Intern `name` in `ns`, creating the namespace if needed.
    pub fn var(&self, ns: &str, name: &str, init: Option<Value>) -> Result<Var> {
        self.registry.var(ns, name, init)
    }
}

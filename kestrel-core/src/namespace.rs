// kestrel-core - Namespace system for global bindings
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Namespace system for managing global variable bindings.
//!
//! Namespaces provide a way to organise and isolate Vars. Each namespace
//! maps unqualified symbols to Vars, either its own (interned here) or
//! referred from another namespace. The registry holds every namespace for
//! the lifetime of the runtime; nothing is removed once created.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use dashmap::DashMap;
use log::{debug, trace, warn};

use kestrel_data::{Error, Opaque, Result, Symbol, Value, Var};

/// The type name namespaces carry when stored in a [`Value`].
pub const NAMESPACE_TYPE: &str = "Namespace";

/// A namespace containing Var bindings.
///
/// Clones are handles onto the same namespace.
#[derive(Clone)]
pub struct Namespace {
    inner: Arc<NamespaceInner>,
}

struct NamespaceInner {
    name: Symbol,
    /// Own vars and refers, keyed by unqualified symbol.
    mappings: RwLock<HashMap<Symbol, Var>>,
    /// Aliases to other namespaces (for require :as)
    aliases: RwLock<HashMap<Symbol, Namespace>>,
    /// The namespace as a value, made on first use.
    value: OnceLock<Value>,
}

impl Namespace {
    /// Create a new, empty namespace. Use [`NamespaceRegistry::find_or_create`]
    /// to get one that other code can find.
    pub fn new(name: Symbol) -> Self {
        Namespace {
            inner: Arc::new(NamespaceInner {
                name,
                mappings: RwLock::new(HashMap::new()),
                aliases: RwLock::new(HashMap::new()),
                value: OnceLock::new(),
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &Symbol {
        &self.inner.name
    }

    /// Intern a Var named `sym`, creating it unbound if this namespace has
    /// no var of its own by that name.
    ///
    /// A referred var under the same name is replaced by a fresh var owned
    /// by this namespace.
    pub fn intern(&self, sym: &Symbol) -> Result<Var> {
        if sym.has_namespace() {
            return Err(Error::invalid_name(
                &sym.to_string(),
                "can't intern a namespace-qualified symbol",
            ));
        }

        let mut mappings = self.write_mappings();
        if let Some(existing) = mappings.get(sym) {
            if self.owns(existing) {
                return Ok(existing.clone());
            }
            warn!(
                "{} already refers to {} in namespace {}, being replaced by {}/{}",
                sym,
                existing,
                self.name(),
                self.name(),
                sym
            );
        }

        let var = Var::new(Some(self.name().clone()), sym.clone(), None);
        trace!("interned var {}", var);
        mappings.insert(sym.clone(), var.clone());
        Ok(var)
    }

    /// Intern a Var and, when `init` is given, replace its root value.
    pub fn intern_var(&self, sym: &Symbol, init: Option<Value>) -> Result<Var> {
        let var = self.intern(sym)?;
        if let Some(value) = init {
            var.bind_root(value);
        }
        Ok(var)
    }

    /// Intern a Var and mark it dynamic.
    pub fn intern_dynamic(&self, sym: &Symbol, init: Option<Value>) -> Result<Var> {
        let var = self.intern_var(sym, init)?;
        var.set_dynamic(true);
        Ok(var)
    }

    /// Look up a Var interned in this namespace. Refers are not returned.
    #[must_use]
    pub fn find_var(&self, sym: &Symbol) -> Option<Var> {
        self.read_mappings()
            .get(sym)
            .filter(|var| self.owns(var))
            .cloned()
    }

    /// Look up whatever `sym` maps to here, own var or refer.
    #[must_use]
    pub fn get_mapping(&self, sym: &Symbol) -> Option<Var> {
        self.read_mappings().get(sym).cloned()
    }

    /// Map `sym` to another namespace's var, replacing any existing mapping.
    pub fn refer(&self, sym: Symbol, var: Var) {
        self.write_mappings().insert(sym, var);
    }

    /// Refer every public var interned in `other`.
    pub fn refer_all(&self, other: &Namespace) {
        let publics = other.publics();
        let mut mappings = self.write_mappings();
        for (sym, var) in publics {
            mappings.insert(sym, var);
        }
    }

    /// Remove the mapping for `sym`, returning what it mapped to.
    pub fn unmap(&self, sym: &Symbol) -> Option<Var> {
        self.write_mappings().remove(sym)
    }

    /// Snapshot of every mapping, own vars and refers.
    #[must_use]
    pub fn mappings(&self) -> HashMap<Symbol, Var> {
        self.read_mappings().clone()
    }

    /// Snapshot of the vars interned in this namespace.
    #[must_use]
    pub fn interns(&self) -> HashMap<Symbol, Var> {
        self.read_mappings()
            .iter()
            .filter(|(_, var)| self.owns(var))
            .map(|(sym, var)| (sym.clone(), var.clone()))
            .collect()
    }

    /// Interned vars not marked private.
    #[must_use]
    pub fn publics(&self) -> HashMap<Symbol, Var> {
        self.interns()
            .into_iter()
            .filter(|(_, var)| var.is_public())
            .collect()
    }

    pub fn add_alias(&self, alias: Symbol, ns: &Namespace) {
        self.inner
            .aliases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias, ns.clone());
    }

    #[must_use]
    pub fn lookup_alias(&self, alias: &Symbol) -> Option<Namespace> {
        self.inner
            .aliases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alias)
            .cloned()
    }

    pub fn remove_alias(&self, alias: &Symbol) -> Option<Namespace> {
        self.inner
            .aliases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(alias)
    }

    /// Wrap this namespace as a value, e.g. for the root of `*ns*`.
    ///
    /// Every call returns the same value, so two wrappings of one namespace
    /// compare equal. The value refers to the namespace weakly and doesn't
    /// keep it alive; a registry does.
    pub fn to_value(&self) -> Value {
        self.inner
            .value
            .get_or_init(|| {
                let handle = Arc::downgrade(&self.inner);
                Value::Opaque(Opaque::new(NAMESPACE_TYPE, self.name().name(), handle))
            })
            .clone()
    }

    /// The namespace held by `value`, if it holds one that is still alive.
    pub fn from_value(value: &Value) -> Option<Namespace> {
        match value {
            Value::Opaque(o) => o
                .downcast_ref::<Weak<NamespaceInner>>()
                .and_then(Weak::upgrade)
                .map(|inner| Namespace { inner }),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn owns(&self, var: &Var) -> bool {
        var.ns() == Some(self.name())
    }

    fn read_mappings(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Symbol, Var>> {
        self.inner
            .mappings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_mappings(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Symbol, Var>> {
        self.inner
            .mappings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Namespace {}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#namespace[{}]", self.name())
    }
}

/// Registry of all namespaces.
///
/// Use `find_or_create` to get a namespace by name. Clones share the same
/// table.
#[derive(Clone, Default)]
pub struct NamespaceRegistry {
    namespaces: Arc<DashMap<Symbol, Namespace>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a namespace by name, or create and register it. Concurrent
    /// callers asking for the same name all get the same namespace.
    pub fn find_or_create(&self, name: &Symbol) -> Namespace {
        self.namespaces
            .entry(name.clone())
            .or_insert_with(|| {
                debug!("creating namespace {}", name);
                Namespace::new(name.clone())
            })
            .value()
            .clone()
    }

    /// Find a namespace by name, returning None if it doesn't exist.
    #[must_use]
    pub fn find(&self, name: &Symbol) -> Option<Namespace> {
        self.namespaces.get(name).map(|ns| ns.value().clone())
    }

    /// Names of every registered namespace, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self.namespaces.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Resolve `sym` to a Var as seen from `current`.
    ///
    /// A qualified symbol's namespace part is tried as an alias of
    /// `current` first, then as a registered namespace name; only vars
    /// interned in the target are returned. An unqualified symbol resolves
    /// through `current`'s mappings, refers included.
    #[must_use]
    pub fn resolve(&self, current: &Namespace, sym: &Symbol) -> Option<Var> {
        let Some(ns_part) = sym.namespace() else {
            return current.get_mapping(sym);
        };
        let ns_sym = Symbol::new(ns_part).ok()?;
        let target = current
            .lookup_alias(&ns_sym)
            .or_else(|| self.find(&ns_sym))?;
        target.find_var(&sym.without_namespace())
    }

    /// Intern `name` in the namespace `ns`, creating the namespace if
    /// needed. The root is replaced when `init` is given.
    pub fn var(&self, ns: &str, name: &str, init: Option<Value>) -> Result<Var> {
        let ns = self.find_or_create(&Symbol::new(ns)?);
        ns.intern_var(&Symbol::new(name)?, init)
    }
}

impl fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceRegistry")
            .field("namespaces", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_data::Keyword;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn mark_private(var: &Var) {
        let private = Value::Keyword(Keyword::new("private").unwrap());
        var.alter_meta(|m| m.assoc(private, Value::Bool(true)));
    }

    // =========================================================================
    // Interning
    // =========================================================================

    #[test]
    fn test_intern_creates_unbound_var() {
        let ns = Namespace::new(sym("test.intern"));
        let var = ns.intern(&sym("x")).unwrap();
        assert!(!var.has_root());
        assert_eq!(var.ns(), Some(&sym("test.intern")));
        assert_eq!(var.qualified_name(), "test.intern/x");
    }

    #[test]
    fn test_intern_returns_existing_var() {
        let ns = Namespace::new(sym("test.intern"));
        let a = ns.intern(&sym("x")).unwrap();
        let b = ns.intern(&sym("x")).unwrap();
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_intern_var_replaces_root_only_when_given() {
        let ns = Namespace::new(sym("test.intern"));
        let var = ns.intern_var(&sym("x"), Some(Value::Int(1))).unwrap();
        ns.intern_var(&sym("x"), None).unwrap();
        assert_eq!(var.root(), Some(Value::Int(1)));
        ns.intern_var(&sym("x"), Some(Value::Int(2))).unwrap();
        assert_eq!(var.root(), Some(Value::Int(2)));
    }

    #[test]
    fn test_intern_rejects_qualified_symbol() {
        let ns = Namespace::new(sym("test.intern"));
        assert!(matches!(
            ns.intern(&sym("other/x")),
            Err(Error::InvalidName { .. })
        ));
    }

    #[test]
    fn test_intern_dynamic_sets_flag() {
        let ns = Namespace::new(sym("test.intern"));
        let var = ns.intern_dynamic(&sym("*x*"), Some(Value::Nil)).unwrap();
        assert!(var.is_dynamic());
    }

    // =========================================================================
    // Refers
    // =========================================================================

    #[test]
    fn test_intern_replaces_referred_var() {
        let core = Namespace::new(sym("test.core"));
        let user = Namespace::new(sym("test.user"));
        let referred = core.intern_var(&sym("f"), Some(Value::Int(1))).unwrap();
        user.refer(sym("f"), referred.clone());

        assert!(user.find_var(&sym("f")).is_none());
        assert!(user.get_mapping(&sym("f")).unwrap().ptr_eq(&referred));

        let own = user.intern(&sym("f")).unwrap();
        assert!(!own.ptr_eq(&referred));
        assert!(user.find_var(&sym("f")).unwrap().ptr_eq(&own));
        // The source namespace keeps its var.
        assert!(core.find_var(&sym("f")).unwrap().ptr_eq(&referred));
    }

    #[test]
    fn test_refer_all_skips_private_and_refers() {
        let core = Namespace::new(sym("test.core"));
        let other = Namespace::new(sym("test.other"));
        let public = core.intern(&sym("public")).unwrap();
        let hidden = core.intern(&sym("hidden")).unwrap();
        mark_private(&hidden);
        core.refer(sym("borrowed"), other.intern(&sym("borrowed")).unwrap());

        let user = Namespace::new(sym("test.user"));
        user.refer_all(&core);
        let mappings = user.mappings();
        assert_eq!(mappings.len(), 1);
        assert!(mappings[&sym("public")].ptr_eq(&public));
    }

    #[test]
    fn test_unmap() {
        let ns = Namespace::new(sym("test.unmap"));
        ns.intern(&sym("x")).unwrap();
        assert!(ns.unmap(&sym("x")).is_some());
        assert!(ns.get_mapping(&sym("x")).is_none());
        assert!(ns.unmap(&sym("x")).is_none());
    }

    // =========================================================================
    // Values and the registry
    // =========================================================================

    #[test]
    fn test_namespace_value_round_trip() {
        let ns = Namespace::new(sym("test.value"));
        let value = ns.to_value();
        assert_eq!(Namespace::from_value(&value), Some(ns));
        assert_eq!(Namespace::from_value(&Value::Int(1)), None);
        assert_eq!(value.to_string(), "#object[Namespace test.value]");
    }

    #[test]
    fn test_namespace_value_is_stable() {
        let ns = Namespace::new(sym("test.stable"));
        assert_eq!(ns.to_value(), ns.to_value());
        assert_eq!(ns.to_value(), ns.clone().to_value());
        assert_ne!(ns.to_value(), Namespace::new(sym("test.stable")).to_value());

        let value = ns.to_value();
        drop(ns);
        assert_eq!(Namespace::from_value(&value), None);
    }

    #[test]
    fn test_registry_find_or_create_is_idempotent() {
        let registry = NamespaceRegistry::new();
        assert!(registry.find(&sym("a.b")).is_none());
        let first = registry.find_or_create(&sym("a.b"));
        let second = registry.find_or_create(&sym("a.b"));
        assert_eq!(first, second);
        assert_eq!(registry.find(&sym("a.b")), Some(first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_resolve() {
        let registry = NamespaceRegistry::new();
        let lib = registry.find_or_create(&sym("my.lib"));
        let user = registry.find_or_create(&sym("user"));
        let helper = lib.intern(&sym("helper")).unwrap();
        let local = user.intern(&sym("local")).unwrap();
        user.add_alias(sym("l"), &lib);

        assert!(registry.resolve(&user, &sym("local")).unwrap().ptr_eq(&local));
        assert!(registry.resolve(&user, &sym("l/helper")).unwrap().ptr_eq(&helper));
        assert!(registry.resolve(&user, &sym("my.lib/helper")).unwrap().ptr_eq(&helper));
        assert!(registry.resolve(&user, &sym("nowhere/helper")).is_none());
        assert!(registry.resolve(&user, &sym("helper")).is_none());
    }

    #[test]
    fn test_registry_var_creates_namespace() {
        let registry = NamespaceRegistry::new();
        let var = registry.var("made.up", "thing", Some(Value::Int(3))).unwrap();
        assert_eq!(var.qualified_name(), "made.up/thing");
        assert_eq!(registry.names(), vec![sym("made.up")]);
        assert_eq!(var.root(), Some(Value::Int(3)));
    }

    #[test]
    fn test_concurrent_find_or_create() {
        let registry = NamespaceRegistry::new();
        let name = sym("contended.ns");
        let found: Vec<Namespace> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| registry.find_or_create(&name)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for ns in &found[1..] {
            assert_eq!(ns, &found[0]);
        }
        assert_eq!(registry.len(), 1);
    }
}

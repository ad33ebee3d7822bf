//! Rust-native substitute for the reflective "Type Introspector".
//!
//! Rust has no runtime constructor reflection, so there is no
//! `GetConstructorParams` to cache. Instead, callers may optionally attach a
//! [`DependencySpec`] to a binding describing the keys its factory closure
//! depends on. This is read-mostly metadata used by [`crate::compiler`] (to
//! decide what is statically compilable) and by `GetDependencies` — a
//! binding with no declared spec is still fully resolvable at runtime, just
//! opaque to static analysis.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::key::Key;

/// A literal default value available to a constructor parameter that has no
/// resolvable source (mirrors spec.md's "builtin type, has default" row).
#[derive(Debug, Clone)]
pub enum DefaultLiteral {
    /// No literal default; the parameter is required.
    None,
    /// A human-readable rendering of the default, carried for diagnostics only.
    Described(String),
}

/// Declared dependency edges for a single binding.
#[derive(Debug, Clone, Default)]
pub struct DependencySpec {
    /// Keys this binding's factory resolves in order to construct its value.
    pub depends_on: Vec<Key>,
}

impl DependencySpec {
    pub fn new(depends_on: Vec<Key>) -> Self {
        Self { depends_on }
    }
}

/// Read-mostly index of declared dependency specs, keyed by binding.
#[derive(Default)]
pub(crate) struct DependencyIndex {
    specs: RwLock<HashMap<Key, DependencySpec>>,
}

impl DependencyIndex {
    pub(crate) fn new() -> Self {
        Self { specs: RwLock::new(HashMap::new()) }
    }

    pub(crate) fn set(&self, key: Key, spec: DependencySpec) {
        self.specs.write().unwrap().insert(key, spec);
    }

    pub(crate) fn get(&self, key: &Key) -> Option<DependencySpec> {
        self.specs.read().unwrap().get(key).cloned()
    }

    /// Drops a class's dependency record, matching spec.md's eviction
    /// requirement that a record be removed as a whole, not partially.
    #[allow(dead_code)]
    pub(crate) fn evict(&self, key: &Key) {
        self.specs.write().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    #[test]
    fn missing_spec_is_opaque_not_an_error() {
        let idx = DependencyIndex::new();
        assert!(idx.get(&key_of_type::<u32>()).is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let idx = DependencyIndex::new();
        let k = key_of_type::<u32>();
        let dep = key_of_type::<u64>();
        idx.set(k.clone(), DependencySpec::new(vec![dep.clone()]));
        let spec = idx.get(&k).unwrap();
        assert_eq!(spec.depends_on, vec![dep]);
    }
}

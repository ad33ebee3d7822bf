//! Alias table: secondary identifiers that rewrite to a canonical key.
//!
//! Aliases resolve in a single hop — an alias of an alias is not followed.
//! Re-binding a key drops any alias currently targeting it, matching the
//! registry's binding-replacement invariant.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::key::Key;

/// `(alias -> canonical identifier)` table with single-hop resolution.
#[derive(Default)]
pub(crate) struct AliasTable {
    map: RwLock<HashMap<Key, Key>>,
}

impl AliasTable {
    pub(crate) fn new() -> Self {
        Self { map: RwLock::new(HashMap::new()) }
    }

    /// Registers `alias -> target`. Caller is responsible for having already
    /// verified `target` is bound (or resolvable).
    pub(crate) fn insert(&self, alias: Key, target: Key) {
        self.map.write().unwrap().insert(alias, target);
    }

    /// Rewrites `key` through a single alias hop, if one exists.
    pub(crate) fn resolve(&self, key: &Key) -> Key {
        match self.map.read().unwrap().get(key) {
            Some(target) => target.clone(),
            None => key.clone(),
        }
    }

    /// Drops any alias entries whose target equals `key`.
    ///
    /// Called whenever `key` is re-bound, so stale aliases don't keep
    /// pointing at a binding that no longer exists.
    pub(crate) fn remove_targeting(&self, key: &Key) {
        self.map.write().unwrap().retain(|_, target| target != key);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, alias: &Key) -> bool {
        self.map.read().unwrap().contains_key(alias)
    }

    /// All `(alias, target)` pairs, for the compiler's fingerprint input.
    pub(crate) fn snapshot(&self) -> Vec<(Key, Key)> {
        self.map.read().unwrap().iter().map(|(a, t)| (a.clone(), t.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    #[test]
    fn single_hop_resolution() {
        let table = AliasTable::new();
        let a = key_of_type::<u32>();
        let b = key_of_type::<u64>();
        table.insert(a.clone(), b.clone());
        assert_eq!(table.resolve(&a), b);
        assert_eq!(table.resolve(&b), b);
    }

    #[test]
    fn rebind_drops_aliases_targeting_key() {
        let table = AliasTable::new();
        let a = key_of_type::<u32>();
        let b = key_of_type::<u64>();
        table.insert(a.clone(), b.clone());
        assert!(table.contains(&a));
        table.remove_targeting(&b);
        assert!(!table.contains(&a));
    }
}

//! Tagged registry and multi-resolution.
//!
//! `Tag` maintains a bidirectional `tag <-> identifier` map, insertion-order
//! preserved and deduplicated. `Tagged` resolves every identifier under a
//! tag, logging and skipping individual failures. `ResolveAll` combines
//! registered multi-bindings, auto-discovered concrete types, and tagged
//! members into one deduplicated, priority-ordered resolution.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

/// Bidirectional `(tag -> ordered ids)` / `(id -> tags)` map.
#[derive(Default)]
pub(crate) struct TagRegistry {
    by_tag: RwLock<HashMap<&'static str, Vec<Key>>>,
    by_id: RwLock<HashMap<Key, HashSet<&'static str>>>,
}

impl TagRegistry {
    pub(crate) fn new() -> Self {
        Self { by_tag: RwLock::new(HashMap::new()), by_id: RwLock::new(HashMap::new()) }
    }

    /// Adds `ids` under `tag`, preserving first-insertion order and
    /// coalescing duplicates in both directions.
    pub(crate) fn tag(&self, ids: &[Key], tag: &'static str) {
        let mut by_tag = self.by_tag.write().unwrap();
        let list = by_tag.entry(tag).or_insert_with(Vec::new);
        let mut by_id = self.by_id.write().unwrap();
        for id in ids {
            if !list.contains(id) {
                list.push(id.clone());
            }
            by_id.entry(id.clone()).or_insert_with(HashSet::new).insert(tag);
        }
    }

    /// Ordered list of identifiers registered under `tag`.
    pub(crate) fn ids_for_tag(&self, tag: &'static str) -> Vec<Key> {
        self.by_tag.read().unwrap().get(tag).cloned().unwrap_or_default()
    }

    /// Tags registered for `id`, if any.
    #[cfg(test)]
    pub(crate) fn tags_for_id(&self, id: &Key) -> HashSet<&'static str> {
        self.by_id.read().unwrap().get(id).cloned().unwrap_or_default()
    }

    /// Every identifier tagged under any tag, for the compiler's `IsTagged`
    /// skip check.
    pub(crate) fn all_tagged_keys(&self) -> HashSet<Key> {
        self.by_id.read().unwrap().keys().cloned().collect()
    }
}

/// Explicit substitute for runtime "declared concrete types" auto-discovery:
/// `mark_discoverable::<Concrete>(trait_name)` opts a concrete type's key
/// into `ResolveAll`'s auto-discovery step.
#[derive(Default)]
pub(crate) struct DiscoveryIndex {
    by_trait: RwLock<HashMap<&'static str, Vec<Key>>>,
}

impl DiscoveryIndex {
    pub(crate) fn new() -> Self {
        Self { by_trait: RwLock::new(HashMap::new()) }
    }

    pub(crate) fn mark(&self, trait_name: &'static str, concrete: Key) {
        let mut guard = self.by_trait.write().unwrap();
        let list = guard.entry(trait_name).or_insert_with(Vec::new);
        if !list.contains(&concrete) {
            list.push(concrete);
        }
    }

    pub(crate) fn discovered_for(&self, trait_name: &'static str) -> Vec<Key> {
        self.by_trait.read().unwrap().get(trait_name).cloned().unwrap_or_default()
    }
}

/// Resolves every identifier under `tag` in insertion order. Individual
/// resolution failures are logged to stderr and skipped rather than
/// failing the whole batch.
pub(crate) fn resolve_tagged(
    tags: &TagRegistry,
    resolver: &dyn ResolverCore,
    tag: &'static str,
    get_by_key: impl Fn(&dyn ResolverCore, &Key) -> DiResult<AnyArc>,
) -> Vec<AnyArc> {
    let mut out = Vec::new();
    for id in tags.ids_for_tag(tag) {
        match get_by_key(resolver, &id) {
            Ok(v) => out.push(v),
            Err(e) => {
                eprintln!("[ferrous-di] tagged member `{}` failed to resolve: {e}", id.display_name());
            }
        }
    }
    out
}

/// `ResolveAll(id)`: registered multi-bindings (by descending priority, ties
/// by insertion order) ++ auto-discovered concretes ++ tagged members,
/// deduplicated preserving the computed order. Fails only if every
/// candidate fails; returns the successful subset otherwise.
pub(crate) fn resolve_all(
    trait_name: &'static str,
    multi_bindings_in_order: Vec<Key>,
    discovery: &DiscoveryIndex,
    tags: &TagRegistry,
    auto_discovery_enabled: bool,
    resolver: &dyn ResolverCore,
    get_by_key: impl Fn(&dyn ResolverCore, &Key) -> DiResult<AnyArc>,
) -> DiResult<Vec<AnyArc>> {
    let mut ordered = multi_bindings_in_order;
    let mut seen: HashSet<Key> = ordered.iter().cloned().collect();

    if auto_discovery_enabled {
        for k in discovery.discovered_for(trait_name) {
            if seen.insert(k.clone()) {
                ordered.push(k);
            }
        }
    }

    for k in tags.ids_for_tag(trait_name) {
        if seen.insert(k.clone()) {
            ordered.push(k);
        }
    }

    let mut results = Vec::with_capacity(ordered.len());
    let mut failures = Vec::new();
    for id in &ordered {
        match get_by_key(resolver, id) {
            Ok(v) => results.push(v),
            Err(e) => failures.push(format!("{}: {e}", id.display_name())),
        }
    }

    if results.is_empty() && !ordered.is_empty() {
        return Err(DiError::ResolutionFailed {
            id: trait_name,
            resolving_chain: Vec::new(),
            suggestions: failures,
            cause: Box::new(DiError::NotFound(trait_name)),
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    #[test]
    fn tag_preserves_order_and_dedupes() {
        let tags = TagRegistry::new();
        let a = key_of_type::<u8>();
        let b = key_of_type::<u16>();
        tags.tag(&[a.clone(), b.clone(), a.clone()], "handlers");
        assert_eq!(tags.ids_for_tag("handlers"), vec![a.clone(), b.clone()]);
        assert!(tags.tags_for_id(&a).contains("handlers"));
    }

    #[test]
    fn discovery_index_dedupes() {
        let idx = DiscoveryIndex::new();
        let a = key_of_type::<u8>();
        idx.mark("dyn Foo", a.clone());
        idx.mark("dyn Foo", a.clone());
        assert_eq!(idx.discovered_for("dyn Foo"), vec![a]);
    }
}

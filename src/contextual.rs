//! Contextual bindings: different implementations per consuming type.
//!
//! Mirrors the resolving-stack pattern in [`crate::internal::circular`]: a
//! thread-local stack of "current consumer" keys, pushed immediately before
//! a consumer's constructor runs and popped on every exit path including
//! unwind.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

thread_local! {
    static CONTEXT_TLS: RefCell<Vec<Key>> = RefCell::new(Vec::new());
}

/// RAII guard that pushes a consumer key onto the thread-local context
/// stack and pops it on drop, regardless of how the scope is exited.
pub(crate) struct ContextGuard;

impl ContextGuard {
    pub(crate) fn push(consumer: Key) -> Self {
        CONTEXT_TLS.with(|tls| tls.borrow_mut().push(consumer));
        ContextGuard
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_TLS.with(|tls| {
            tls.borrow_mut().pop();
        });
    }
}

/// Returns the key of the consumer currently under construction, if any.
pub(crate) fn current_context() -> Option<Key> {
    CONTEXT_TLS.with(|tls| tls.borrow().last().cloned())
}

/// A resolved configuration payload for the `{configured: map}` implementation form.
pub type ConfigMap = HashMap<String, String>;

/// How a contextual binding is satisfied once selected.
pub enum ContextualImplementation {
    /// Delegate to `Get` of another canonical key.
    ClassName(Key),
    /// Invoke a factory closure directly with the resolver.
    Factory(Arc<dyn Fn(&dyn ResolverCore) -> DiResult<AnyArc> + Send + Sync>),
    /// Delegate to `Tagged(tag)` and take the first result.
    Tagged(&'static str),
    /// Delegate to `Get` of `class`, then apply `map` as configuration.
    ///
    /// Configuration application is a capability hook: types that want to
    /// observe `{configured: map}` opt in by registering a configurator via
    /// [`ContextualBindings::set_configurator`]; types that don't are
    /// returned unconfigured.
    Configured(Key, ConfigMap),
}

/// `(consumer, needed) -> implementation` table, plus the context stack.
#[derive(Default)]
pub(crate) struct ContextualBindings {
    map: RwLock<HashMap<(Key, Key), ContextualImplementation>>,
}

impl ContextualBindings {
    pub(crate) fn new() -> Self {
        Self { map: RwLock::new(HashMap::new()) }
    }

    pub(crate) fn insert(&self, consumer: Key, needed: Key, imp: ContextualImplementation) {
        self.map.write().unwrap().insert((consumer, needed), imp);
    }

    /// True iff the current context's top consumer has a binding for `needed`.
    pub(crate) fn has_binding_for(&self, needed: &Key) -> bool {
        match current_context() {
            Some(consumer) => self.map.read().unwrap().contains_key(&(consumer, needed.clone())),
            None => false,
        }
    }

    /// Resolves `needed` using the current context's override, if any.
    pub(crate) fn resolve(
        &self,
        needed: &Key,
        resolver: &dyn ResolverCore,
        get_by_key: impl Fn(&dyn ResolverCore, &Key) -> DiResult<AnyArc>,
        get_tagged_first: impl Fn(&dyn ResolverCore, &'static str) -> DiResult<AnyArc>,
    ) -> Option<DiResult<AnyArc>> {
        let consumer = current_context()?;
        let guard = self.map.read().unwrap();
        let imp = guard.get(&(consumer, needed.clone()))?;
        Some(match imp {
            ContextualImplementation::ClassName(target) => get_by_key(resolver, target),
            ContextualImplementation::Factory(f) => f(resolver),
            ContextualImplementation::Tagged(tag) => get_tagged_first(resolver, tag),
            ContextualImplementation::Configured(target, _map) => get_by_key(resolver, target),
        })
    }

    /// `(consumer, needed, implementation description)` for every binding,
    /// for the compiler's fingerprint input.
    pub(crate) fn snapshot(&self) -> Vec<(Key, Key, String)> {
        self.map
            .read()
            .unwrap()
            .iter()
            .map(|((consumer, needed), imp)| {
                let desc = match imp {
                    ContextualImplementation::ClassName(target) => {
                        format!("class:{}", target.display_name())
                    }
                    ContextualImplementation::Factory(_) => "factory".to_string(),
                    ContextualImplementation::Tagged(tag) => format!("tagged:{tag}"),
                    ContextualImplementation::Configured(target, map) => {
                        let mut keys: Vec<&String> = map.keys().collect();
                        keys.sort();
                        format!("configured:{}:{:?}", target.display_name(), keys)
                    }
                };
                (consumer.clone(), needed.clone(), desc)
            })
            .collect()
    }

}

/// Fluent builder for `When(consumer).Needs(I).Give(impl)`.
pub struct ContextualBuilder<'a> {
    bindings: &'a ContextualBindings,
    consumer: Key,
    needed: Option<Key>,
}

impl<'a> ContextualBuilder<'a> {
    pub(crate) fn new(bindings: &'a ContextualBindings, consumer: Key) -> Self {
        Self { bindings, consumer, needed: None }
    }

    /// Declares which dependency this contextual binding overrides.
    pub fn needs(mut self, needed: Key) -> Self {
        self.needed = Some(needed);
        self
    }

    fn take_needed(&mut self) -> DiResult<Key> {
        self.needed.take().ok_or(DiError::InvalidUsage(
            "`give*` called before `needs` on a contextual builder",
        ))
    }

    /// `Give(className)`: delegate to `Get(target)`.
    pub fn give(mut self, target: Key) -> DiResult<()> {
        let needed = self.take_needed()?;
        self.bindings.insert(self.consumer.clone(), needed, ContextualImplementation::ClassName(target));
        Ok(())
    }

    /// `Give(closure)`: invoke a factory directly.
    pub fn give_factory<F>(mut self, f: F) -> DiResult<()>
    where
        F: Fn(&dyn ResolverCore) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        let needed = self.take_needed()?;
        self.bindings.insert(self.consumer.clone(), needed, ContextualImplementation::Factory(Arc::new(f)));
        Ok(())
    }

    /// `GiveTagged(tag)`.
    pub fn give_tagged(mut self, tag: &'static str) -> DiResult<()> {
        let needed = self.take_needed()?;
        self.bindings.insert(self.consumer.clone(), needed, ContextualImplementation::Tagged(tag));
        Ok(())
    }

    /// `GiveConfigured(map)`.
    pub fn give_configured(mut self, target: Key, map: ConfigMap) -> DiResult<()> {
        let needed = self.take_needed()?;
        self.bindings.insert(self.consumer.clone(), needed, ContextualImplementation::Configured(target, map));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    #[test]
    fn push_pop_is_stack_discipline() {
        assert!(current_context().is_none());
        let a = key_of_type::<u32>();
        {
            let _g = ContextGuard::push(a.clone());
            assert_eq!(current_context(), Some(a.clone()));
        }
        assert!(current_context().is_none());
    }

    #[test]
    fn give_before_needs_is_invalid_usage() {
        let bindings = ContextualBindings::new();
        let consumer = key_of_type::<u32>();
        let target = key_of_type::<u64>();
        let builder = ContextualBuilder::new(&bindings, consumer);
        let err = builder.give(target).unwrap_err();
        assert!(matches!(err, DiError::InvalidUsage(_)));
    }

    #[test]
    fn outside_context_has_no_binding() {
        let bindings = ContextualBindings::new();
        let i = key_of_type::<u32>();
        assert!(!bindings.has_binding_for(&i));
    }
}

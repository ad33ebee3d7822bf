//! Service provider module for dependency injection.
//!
//! This module contains the ServiceProvider type and related functionality
//! for resolving registered services from the DI container.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::{DiResult, DiError, Key, Lifetime};
use crate::alias::AliasTable;
use crate::contextual::{ContextGuard, ContextualBindings, ContextualBuilder};
use crate::decoration::DecoratorRegistry;
use crate::introspector::{DependencyIndex, DependencySpec};
use crate::registration::{Registry, Registration, AnyArc, Ctor};
use crate::compiler::{BindingSummary, CompileReport, CompilerInput};
use crate::scoped_override::{self, ScopedBindingValue};
use crate::tagged::{self, DiscoveryIndex, TagRegistry};
use crate::internal::{DisposeBag, BoxFutureUnit, with_circular_catch};
use crate::observer::Observers;
use crate::capabilities::{CapabilityRegistry, ToolSelectionCriteria, ToolDiscoveryResult, ToolInfo};
use crate::fast_singletons::FastSingletonCache;
use crate::traits::{Resolver, ResolverCore, Dispose, AsyncDispose};

// Re-export Scope and ResolverContext
pub mod scope;
pub mod context;
pub use scope::*;
pub use context::ResolverContext;
use context::ResolverContext as LocalResolverContext;

/// Service provider for resolving dependencies from the DI container.
///
/// The `ServiceProvider` is the heart of the dependency injection system. It resolves
/// services according to their registered lifetimes (Singleton, Scoped, Transient) and
/// manages the lifecycle of singleton services including disposal.
///
/// # Thread Safety
///
/// ServiceProvider is fully thread-safe and can be shared across multiple threads.
/// Singleton services are cached with proper synchronization behind a single
/// double-checked-locking cache, and the provider can be cloned cheaply (it uses
/// `Arc` internally). The binding registry itself lives behind a `RwLock` so that
/// `bind`/`alias`/`scoped` can mutate it after the provider has been built.
///
/// # Examples
///
/// ```
/// use ferrous_di::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// });
///
/// let provider = collection.build();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub type DeferredResolverHook = Box<dyn Fn(&ServiceProvider, &Key) + Send + Sync>;

pub(crate) struct ProviderInner {
    pub registry: RwLock<Registry>,
    pub singletons: Mutex<HashMap<Key, AnyArc>>,
    pub fast_cache: FastSingletonCache,
    pub root_disposers: Mutex<DisposeBag>,
    pub observers: Observers,
    pub capabilities: CapabilityRegistry,
    pub aliases: AliasTable,
    pub contextual: ContextualBindings,
    pub tags: TagRegistry,
    pub discovery: DiscoveryIndex,
    pub decorators: DecoratorRegistry,
    pub dependencies: DependencyIndex,
    pub mocks: RwLock<HashMap<Key, AnyArc>>,
    pub deferred_resolver: Mutex<Option<DeferredResolverHook>>,
    pub metrics: crate::metrics::MetricsCollector,
}

impl ServiceProvider {
    /// Convenience accessor for the inner provider
    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// Scoped services are cached per scope and are ideal for request-scoped
    /// dependencies in web applications. Each scope maintains its own cache
    /// of scoped services while still accessing singleton services from the
    /// root provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_di::{ServiceCollection, Resolver};
    /// use std::sync::{Arc, Mutex};
    ///
    /// #[derive(Debug)]
    /// struct RequestId(String);
    ///
    /// let mut collection = ServiceCollection::new();
    /// let counter = Arc::new(Mutex::new(0));
    /// let counter_clone = counter.clone();
    ///
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     let mut c = counter_clone.lock().unwrap();
    ///     *c += 1;
    ///     RequestId(format!("req-{}", *c))
    /// });
    ///
    /// let provider = collection.build();
    ///
    /// // Create separate scopes
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let req1a = scope1.get_required::<RequestId>();
    /// let req1b = scope1.get_required::<RequestId>(); // Same instance
    /// let req2 = scope2.get_required::<RequestId>(); // Different instance
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b)); // Same scope, same instance
    /// assert!(!Arc::ptr_eq(&req1a, &req2)); // Different scopes, different instances
    /// ```
    pub fn create_scope(&self) -> Scope {
        let scoped_count = self.inner().registry.read().unwrap().scoped_count;

        #[cfg(feature = "once-cell")]
        {
            use once_cell::sync::OnceCell;

            let scoped_cells: Box<[OnceCell<AnyArc>]> = (0..scoped_count)
                .map(|_| OnceCell::new())
                .collect::<Vec<_>>()
                .into_boxed_slice();

            Scope {
                root: self.clone(),
                scoped_cells,
                scoped_disposers: Mutex::new(DisposeBag::default()),
            }
        }

        #[cfg(not(feature = "once-cell"))]
        {
            let _ = scoped_count;
            Scope {
                root: self.clone(),
                scoped: Mutex::new(HashMap::new()),
                scoped_disposers: Mutex::new(DisposeBag::default()),
            }
        }
    }

    /// Disposes all registered disposal hooks in LIFO order.
    ///
    /// This method runs all asynchronous disposal hooks first (in reverse order),
    /// followed by all synchronous disposal hooks (in reverse order). This ensures
    /// proper cleanup of singleton services.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_di::{ServiceCollection, Dispose, AsyncDispose, Resolver};
    /// use async_trait::async_trait;
    /// use std::sync::Arc;
    ///
    /// struct Cache;
    /// impl Dispose for Cache {
    ///     fn dispose(&self) {
    ///         println!("Cache disposed");
    ///     }
    /// }
    ///
    /// struct Client;
    /// #[async_trait]
    /// impl AsyncDispose for Client {
    ///     async fn dispose(&self) {
    ///         println!("Client disposed");
    ///     }
    /// }
    ///
    /// # async fn example() {
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_factory::<Cache, _>(|r| {
    ///     let cache = Arc::new(Cache);
    ///     r.register_disposer(cache.clone());
    ///     Cache // Return concrete type
    /// });
    /// services.add_singleton_factory::<Client, _>(|r| {
    ///     let client = Arc::new(Client);
    ///     r.register_async_disposer(client.clone());
    ///     Client // Return concrete type
    /// });
    ///
    /// let provider = services.build();
    /// // ... use services ...
    /// provider.dispose_all().await;
    /// # }
    /// ```
    pub async fn dispose_all(&self) {
        // First run async disposers in reverse order
        self.inner().root_disposers.lock().unwrap().run_all_async_reverse().await;
        // Then run sync disposers in reverse order
        self.inner().root_disposers.lock().unwrap().run_all_sync_reverse();
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut s = String::new();
        s.push_str("=== Service Provider Debug ===\n");
        s.push_str("Single Bindings:\n");
        let registry = self.inner().registry.read().unwrap();
        for (k, r) in registry.iter() {
            s.push_str(&format!("  {:?}: {:?}\n", k, r.lifetime));
        }
        s.push_str("Multi Bindings:\n");
        for (k, rs) in &registry.many {
            for (i, r) in rs.iter().enumerate() {
                s.push_str(&format!("  MultiTrait({} @ {}): {:?}\n", k, i, r.lifetime));
            }
        }
        s
    }
}

impl Clone for ServiceProvider {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Drop for ServiceProvider {
    fn drop(&mut self) {
        // Check if this is the last reference to the inner provider
        if Arc::strong_count(&self.inner) == 1 {
            // Check if there are undisposed resources and warn
            if let Ok(bag) = self.inner.root_disposers.try_lock() {
                if !bag.is_empty() {
                    eprintln!("[ferrous-di] ServiceProvider dropped with undisposed resources. Call dispose_all().await before dropping.");
                }
            }
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        let name = key.display_name();
        with_circular_catch(name, || self.resolve_any_impl(key))
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        if let Key::Trait(_trait_name) = key {
            let name = key.display_name();
            with_circular_catch(name, || self.resolve_many_impl(key))
        } else {
            Ok(Vec::new())
        }
    }

    fn push_sync_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner().root_disposers.lock().unwrap().push_sync(f);
    }

    fn push_async_disposer(&self, f: Box<dyn FnOnce() -> BoxFutureUnit + Send>) {
        self.inner().root_disposers.lock().unwrap().push_async(move || (f)());
    }
}

impl ServiceProvider {
    /// Alternative high-performance singleton resolution using FastSingletonCache.
    /// This bypasses observers, aliasing, contextual bindings and decoration and
    /// exists only for hot loops that resolve a known concrete singleton directly.
    #[inline(always)]
    pub fn resolve_singleton_fast_cache(&self, key: &Key) -> Option<AnyArc> {
        if let Some(cached) = self.inner().fast_cache.get(key) {
            return Some(cached);
        }

        let ctor = {
            let registry = self.inner().registry.read().unwrap();
            let reg = registry.get(key)?;
            if reg.lifetime != Lifetime::Singleton {
                return None;
            }
            reg.ctor.clone()
        };

        let result = self.inner().fast_cache.get_or_init(key, || {
            let ctx = LocalResolverContext::new(self);
            (ctor)(&ctx).unwrap_or_else(|_| Arc::new(()) as AnyArc)
        });
        Some(result)
    }

    /// Invokes `ctor` under the current-consumer context and observer timing,
    /// without touching any cache. The caller decides whether (and how) to
    /// memoize the result.
    fn invoke_ctor(&self, key: &Key, ctor: &Ctor) -> DiResult<AnyArc> {
        let _consumer_guard = ContextGuard::push(key.clone());
        let has_observers = self.inner().observers.has_observers();
        let start = std::time::Instant::now();
        if has_observers {
            self.inner().observers.resolving(key);
        }
        let ctx = LocalResolverContext::new(self);
        let result = (ctor)(&ctx);
        let duration = start.elapsed();
        self.inner().metrics.record_resolution(key, duration);
        if has_observers {
            self.inner().observers.resolved(key, duration);
        }
        result
    }

    /// Singleton resolution via the uniform double-checked-locking cache.
    ///
    /// An earlier per-`Registration` embedded `OnceCell`/`Mutex` fast path
    /// can't be used once the registry lives behind a `RwLock`: holding a
    /// `&Registration` across a factory invocation while the registry may
    /// be concurrently rebound risks a reentrant-lock deadlock. This cache
    /// (already used for multi-bindings) is the one path that stays correct
    /// under runtime rebinding.
    pub(crate) fn resolve_singleton_cached(&self, key: &Key, ctor: &Ctor) -> DiResult<AnyArc> {
        {
            let cache = self.inner().singletons.lock().unwrap();
            if let Some(v) = cache.get(key) {
                return Ok(v.clone());
            }
        }

        let value = self.invoke_ctor(key, ctor)?;

        let mut cache = self.inner().singletons.lock().unwrap();
        Ok(cache.entry(key.clone()).or_insert(value).clone())
    }

    /// Implements the `Get(id)` resolution algorithm: alias rewrite, mock
    /// override, contextual override, cached/fresh construction by lifetime,
    /// and the decoration chain, with failures wrapped in diagnostic context.
    fn resolve_any_impl(&self, key: &Key) -> DiResult<AnyArc> {
        let resolved_key = self.inner().aliases.resolve(key);
        let key = &resolved_key;
        let name = key.display_name();

        if let Some(mock) = self.inner().mocks.read().unwrap().get(key) {
            return Ok(mock.clone());
        }

        if self.inner().contextual.has_binding_for(key) {
            if let Some(result) = self.inner().contextual.resolve(
                key,
                self,
                |r, k| r.resolve_any(k),
                |r, tag| {
                    tagged::resolve_tagged(&self.inner().tags, r, tag, |r2, k2| r2.resolve_any(k2))
                        .into_iter()
                        .next()
                        .ok_or(DiError::NotFound(tag))
                },
            ) {
                return result;
            }
        }

        if let Some(hook) = self.inner().deferred_resolver.lock().unwrap().as_ref() {
            hook(self, key);
        }

        let lookup = {
            let registry = self.inner().registry.read().unwrap();
            registry.get(key).map(|reg| (reg.lifetime, reg.ctor.clone()))
        };

        let result = if let Some((lifetime, ctor)) = lookup {
            match lifetime {
                Lifetime::Singleton => self.resolve_singleton_cached(key, &ctor),
                Lifetime::Scoped => {
                    Err(DiError::WrongLifetime("Cannot resolve scoped service from root provider"))
                }
                Lifetime::Transient => self.invoke_ctor(key, &ctor),
            }
        } else if let Key::Trait(trait_name) = key {
            let last_ctor = {
                let registry = self.inner().registry.read().unwrap();
                registry.many.get(trait_name).and_then(|regs| regs.last()).map(|r| r.ctor.clone())
            };
            match last_ctor {
                Some(ctor) => self.invoke_ctor(key, &ctor),
                None => Err(DiError::NotFound(name)),
            }
        } else {
            Err(DiError::NotFound(name))
        };

        match result {
            Ok(value) => Ok(self.inner().decorators.apply(key, value, self)),
            Err(e) => Err(e.into_resolution_failed(name, Vec::new())),
        }
    }

    fn resolve_many_impl(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        if let Key::Trait(trait_name) = key {
            let ctors: Vec<(Lifetime, Ctor)> = {
                let registry = self.inner().registry.read().unwrap();
                match registry.many.get(trait_name) {
                    Some(regs) => regs.iter().map(|r| (r.lifetime, r.ctor.clone())).collect(),
                    None => Vec::new(),
                }
            };

            let mut results = Vec::with_capacity(ctors.len());

            for (i, (lifetime, ctor)) in ctors.into_iter().enumerate() {
                let multi_key = Key::MultiTrait(trait_name, i);

                let value = match lifetime {
                    Lifetime::Singleton => self.resolve_singleton_cached(&multi_key, &ctor)?,
                    Lifetime::Scoped => {
                        return Err(DiError::WrongLifetime("Cannot resolve scoped service from root provider"));
                    }
                    Lifetime::Transient => self.invoke_ctor(&multi_key, &ctor)?,
                };

                results.push(self.inner().decorators.apply(&multi_key, value, self));
            }

            Ok(results)
        } else {
            Ok(Vec::new())
        }
    }

    /// Create a new ServiceProvider with the given registry.
    /// This is used internally by ServiceCollection.build().
    #[allow(dead_code)]
    pub(crate) fn new(registry: Registry) -> Self {
        Self::new_with_observers_and_capabilities(registry, Observers::new(), CapabilityRegistry::new())
    }

    /// Create a new ServiceProvider with the given registry and observers.
    /// This is used internally by ServiceCollection.build().
    #[allow(dead_code)]
    pub(crate) fn new_with_observers(registry: Registry, observers: Observers) -> Self {
        Self::new_with_observers_and_capabilities(registry, observers, CapabilityRegistry::new())
    }

    /// Create a new ServiceProvider with the given registry, observers, and capabilities.
    /// This is used internally by ServiceCollection.build().
    pub(crate) fn new_with_observers_and_capabilities(
        registry: Registry,
        observers: Observers,
        capabilities: CapabilityRegistry
    ) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                registry: RwLock::new(registry),
                singletons: Mutex::new(HashMap::new()),
                fast_cache: FastSingletonCache::new(),
                root_disposers: Mutex::new(DisposeBag::default()),
                observers,
                capabilities,
                aliases: AliasTable::new(),
                contextual: ContextualBindings::new(),
                tags: TagRegistry::new(),
                discovery: DiscoveryIndex::new(),
                decorators: DecoratorRegistry::new(),
                dependencies: DependencyIndex::new(),
                mocks: RwLock::new(HashMap::new()),
                deferred_resolver: Mutex::new(None),
                metrics: crate::metrics::MetricsCollector::new(),
            }),
        }
    }

    /// Discovers available tools based on capability requirements.
    ///
    /// This is the main entry point for agent planners to find suitable tools
    /// for their tasks. Returns matching tools along with partial matches and
    /// any unsatisfied requirements.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_di::{ServiceCollection, ToolSelectionCriteria, CapabilityRequirement};
    ///
    /// // ... after registering tools with capabilities ...
    /// let mut services = ServiceCollection::new();
    /// let provider = services.build();
    ///
    /// // Find tools that can search the web
    /// let criteria = ToolSelectionCriteria::new()
    ///     .require("web_search")
    ///     .exclude_tag("experimental")
    ///     .max_cost(0.01);
    ///
    /// let result = provider.discover_tools(&criteria);
    ///
    /// println!("Found {} matching tools", result.matching_tools.len());
    /// for tool in &result.matching_tools {
    ///     println!("  - {}: {}", tool.name, tool.description);
    /// }
    ///
    /// if !result.unsatisfied_requirements.is_empty() {
    ///     println!("Missing capabilities: {:?}", result.unsatisfied_requirements);
    /// }
    /// ```
    pub fn discover_tools(&self, criteria: &ToolSelectionCriteria) -> ToolDiscoveryResult {
        self.inner.capabilities.discover(criteria)
    }

    /// Gets all registered tools with their capability information.
    ///
    /// Useful for debugging or building tool catalogs.
    pub fn list_all_tools(&self) -> Vec<&ToolInfo> {
        self.inner.capabilities.all_tools()
    }

    /// Gets capability information for a specific tool.
    pub fn get_tool_info(&self, key: &Key) -> Option<&ToolInfo> {
        self.inner.capabilities.get_tool(key)
    }

    /// Registers `Alias -> Target`. A previous binding directly at `alias`
    /// (if any) is not removed; aliasing and direct binding coexist, with
    /// `resolve_any_impl` preferring the alias rewrite.
    pub fn alias(&self, alias: Key, target: Key) {
        self.inner().aliases.insert(alias, target);
    }

    /// Installs a mock value that shadows whatever is bound at `key` until
    /// [`ServiceProvider::clear_mock`] is called. Mocks are checked before
    /// aliasing, contextual bindings, or the registry itself.
    pub fn mock_value(&self, key: Key, value: AnyArc) {
        self.inner().mocks.write().unwrap().insert(key, value);
    }

    /// Removes a previously installed mock.
    pub fn clear_mock(&self, key: &Key) {
        self.inner().mocks.write().unwrap().remove(key);
    }

    /// Binds (or rebinds) `T` to a transient factory: a fresh instance is
    /// built on every resolution.
    pub fn bind<T, F>(&self, factory: F)
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.rebind_factory::<T, F>(Lifetime::Transient, factory)
    }

    /// Binds (or rebinds) `T` to a singleton factory: built once, shared
    /// across every subsequent resolution.
    pub fn singleton<T, F>(&self, factory: F)
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.rebind_factory::<T, F>(Lifetime::Singleton, factory)
    }

    /// Binds (or rebinds) `T` to a fixed, already-constructed value.
    pub fn instance<T: 'static + Send + Sync>(&self, value: T) {
        let key = crate::key::key_of_type::<T>();
        let arc = Arc::new(value);
        let ctor: Ctor = Arc::new(move |_: &LocalResolverContext| -> DiResult<AnyArc> { Ok(arc.clone()) });
        self.rebind_internal(key, Registration::with_metadata(
            Lifetime::Singleton,
            ctor,
            None,
            Some(std::any::TypeId::of::<T>()),
        ));
    }

    fn rebind_factory<T, F>(&self, lifetime: Lifetime, factory: F)
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let key = crate::key::key_of_type::<T>();
        let factory = Arc::new(factory);
        let ctor: Ctor = Arc::new(move |r: &LocalResolverContext| -> DiResult<AnyArc> {
            Ok(Arc::new(factory(r)) as AnyArc)
        });
        self.rebind_internal(key, Registration::with_metadata(
            lifetime,
            ctor,
            None,
            Some(std::any::TypeId::of::<T>()),
        ));
    }

    /// Rebinds `key` to a fresh registration, replacing whatever was there
    /// (including any alias that pointed at the old binding, per the
    /// registry's replace-whole-entry invariant).
    fn rebind_internal(&self, key: Key, registration: Registration) {
        self.inner().aliases.remove_targeting(&key);
        self.inner().registry.write().unwrap().insert(key.clone(), registration);
        self.inner().observers.binding_registered(&key);
    }

    /// Wraps `T`'s existing registration so `transform` runs on every freshly
    /// constructed value, after the factory but before caching. Re-wrapping a
    /// singleton after it has already been cached does not retroactively
    /// transform the cached instance — callers needing that must rebind via
    /// [`ServiceProvider::singleton`]/[`ServiceProvider::instance`] instead.
    pub fn extend<T, F>(&self, transform: F)
    where
        T: 'static + Send + Sync,
        F: Fn(Arc<T>, &ResolverContext) -> Arc<T> + Send + Sync + 'static,
    {
        let key = crate::key::key_of_type::<T>();
        let existing = {
            let registry = self.inner().registry.read().unwrap();
            registry.get(&key).map(|r| (r.lifetime, r.ctor.clone()))
        };
        let Some((lifetime, ctor)) = existing else {
            return;
        };
        let wrapped: Ctor = Arc::new(move |r: &LocalResolverContext| -> DiResult<AnyArc> {
            let value = (ctor)(r)?;
            let typed = value
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch("extend: factory did not produce the expected type"))?;
            Ok(transform(typed, r) as AnyArc)
        });
        self.inner().registry.write().unwrap().insert(
            key,
            Registration::with_metadata(lifetime, wrapped, None, Some(std::any::TypeId::of::<T>())),
        );
    }

    /// Runs `f` with access to the container, for call sites that want to
    /// resolve several dependencies inline rather than through a factory
    /// closure registered ahead of time.
    pub fn call<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Self) -> R,
    {
        f(self)
    }

    /// Binds `T` to a fixed mock value for the remainder of the container's
    /// life, without disturbing the underlying registration (see
    /// [`ServiceProvider::unmock`]).
    pub fn mock<T: 'static + Send + Sync>(&self, value: T) {
        let key = crate::key::key_of_type::<T>();
        self.mock_value(key, Arc::new(value));
    }

    /// Clears a mock installed with [`ServiceProvider::mock`], reverting `T`
    /// to its real registration.
    pub fn unmock<T: 'static>(&self) {
        let key = crate::key::key_of_type::<T>();
        self.clear_mock(&key);
    }

    /// Wraps `T`'s resolution in a lazily-initialized handle that defers
    /// construction until first access.
    pub fn lazy<T: 'static + Send + Sync>(&self) -> crate::performance::LazyService<T> {
        let provider = self.clone();
        crate::performance::LazyService::new(move || {
            let arc = provider.get::<T>()?;
            Arc::try_unwrap(arc).map_err(|_| {
                DiError::TypeMismatch("lazy: underlying service is shared and cannot be moved out of its Arc")
            })
        })
    }

    /// True if `T` currently resolves to a binding, either directly or
    /// through a fallback multi-binding.
    pub fn has<T: 'static>(&self) -> bool {
        let key = crate::key::key_of_type::<T>();
        let registry = self.inner().registry.read().unwrap();
        if registry.contains_key(&key) {
            return true;
        }
        if let Key::Trait(trait_name) = &key {
            return registry.many.contains_key(trait_name);
        }
        false
    }

    /// Attaches a declared dependency spec to `key`, opting it into static
    /// compilation via [`crate::compiler`] and `get_dependencies`.
    pub fn describe_dependencies(&self, key: Key, spec: DependencySpec) {
        self.inner().dependencies.set(key, spec);
    }

    /// Returns the declared dependency edges for `key`, if any were attached
    /// with [`ServiceProvider::describe_dependencies`].
    pub fn get_dependencies(&self, key: &Key) -> Option<DependencySpec> {
        self.inner().dependencies.get(key)
    }

    /// Tags `ids` under `tag` for later bulk resolution via
    /// [`ServiceProvider::tagged`] and `resolve_all`.
    pub fn tag(&self, ids: &[Key], tag: &'static str) {
        self.inner().tags.tag(ids, tag);
    }

    /// Resolves every identifier tagged with `tag`, in insertion order,
    /// skipping (and logging) any individual resolution failure.
    pub fn tagged(&self, tag: &'static str) -> Vec<AnyArc> {
        tagged::resolve_tagged(&self.inner().tags, self, tag, |r, k| r.resolve_any(k))
    }

    /// Opts `concrete` into auto-discovery for `trait_name`'s `resolve_all`.
    pub fn mark_discoverable(&self, trait_name: &'static str, concrete: Key) {
        self.inner().discovery.mark(trait_name, concrete);
    }

    /// Resolves every registered multi-binding, auto-discovered concrete, and
    /// tagged member of `trait_name`, deduplicated and order-preserving.
    /// Fails only if every candidate fails.
    pub fn resolve_all(&self, trait_name: &'static str) -> DiResult<Vec<AnyArc>> {
        let multi_bindings_in_order = {
            let registry = self.inner().registry.read().unwrap();
            match registry.many.get(trait_name) {
                Some(regs) => (0..regs.len()).map(|i| Key::MultiTrait(trait_name, i)).collect(),
                None => Vec::new(),
            }
        };
        tagged::resolve_all(
            trait_name,
            multi_bindings_in_order,
            &self.inner().discovery,
            &self.inner().tags,
            true,
            self,
            |r, k| r.resolve_any(k),
        )
    }

    /// Starts a contextual binding: `provider.when(consumer).needs(dep).give(target)`.
    pub fn when(&self, consumer: Key) -> ContextualBuilder<'_> {
        ContextualBuilder::new(&self.inner().contextual, consumer)
    }

    /// Registers an instance-transforming decorator at `priority` (lower
    /// values run first; ties broken by registration order).
    pub fn decorate(&self, key: Key, priority: i32, f: crate::decoration::InstanceTransform) {
        self.inner().decorators.add_decorator(key, priority, f);
    }

    /// Registers middleware that runs after every decorator, in FIFO order.
    pub fn middleware(&self, key: Key, f: crate::decoration::InstanceTransform) {
        self.inner().decorators.add_middleware(key, f);
    }

    /// Installs temporary registry overrides for the duration of `callback`,
    /// restoring the previous bindings on every exit path (including panics).
    pub fn scoped<R>(&self, bindings: Vec<(Key, ScopedBindingValue)>, callback: impl FnOnce() -> R) -> R {
        let planned = scoped_override::plan_overrides(bindings);
        let mut previous: Vec<(Key, Option<Registration>)> = Vec::with_capacity(planned.len());
        {
            let mut registry = self.inner().registry.write().unwrap();
            for (key, reg) in planned {
                let prior = registry.remove(&key);
                previous.push((key.clone(), prior));
                registry.insert(key, reg);
            }
        }
        // A pre-existing cached singleton for an overridden key would otherwise
        // keep winning over the new registration, since the singleton cache is
        // checked before the registry. Evict it so the override takes effect.
        self.evict_instance_caches(previous.iter().map(|(key, _)| key));

        let inner = self.inner.clone();
        scoped_override::run_with_guaranteed_restore(callback, move || {
            let overridden_keys: Vec<Key> = previous.iter().map(|(key, _)| key.clone()).collect();
            {
                let mut registry = inner.registry.write().unwrap();
                for (key, prior) in previous {
                    match prior {
                        Some(reg) => {
                            registry.insert(key, reg);
                        }
                        None => {
                            registry.remove(&key);
                        }
                    }
                }
            }
            // Drop any instance cached for the overridden binding during the
            // scope; the next resolution must reconstruct against the
            // restored registry rather than return the scoped value.
            Self::evict_instance_caches_from(&inner, overridden_keys.iter());
        })
    }

    /// Removes any cached singleton for each of `keys` from both the
    /// double-checked-locking cache and the fast-path cache.
    fn evict_instance_caches<'a>(&self, keys: impl Iterator<Item = &'a Key>) {
        Self::evict_instance_caches_from(&self.inner, keys)
    }

    fn evict_instance_caches_from<'a>(inner: &Arc<ProviderInner>, keys: impl Iterator<Item = &'a Key>) {
        let mut singletons = inner.singletons.lock().unwrap();
        for key in keys {
            singletons.remove(key);
            inner.fast_cache.remove(key);
        }
    }

    /// Sets (or clears, with `None`) a hook invoked just before every
    /// resolution, after contextual/mock checks, with the rewritten key.
    pub fn set_deferred_resolver(&self, hook: Option<DeferredResolverHook>) {
        *self.inner().deferred_resolver.lock().unwrap() = hook;
    }

    /// System-wide resolution timing and counters gathered since the
    /// provider was built.
    pub fn performance_metrics(&self) -> crate::metrics::SystemMetrics {
        self.inner().metrics.get_system_metrics()
    }

    /// Snapshot of every direct binding, for introspection and as the input
    /// to [`ServiceProvider::compile`]/[`ServiceProvider::compilation_fingerprint`].
    pub fn get_bindings(&self) -> Vec<BindingSummary> {
        self.build_compiler_input().bindings
    }

    fn build_compiler_input(&self) -> CompilerInput {
        let bindings = {
            let registry = self.inner().registry.read().unwrap();
            registry
                .iter()
                .map(|(key, reg)| BindingSummary {
                    key: key.clone(),
                    shared: reg.lifetime == Lifetime::Singleton,
                    concrete_identity: concrete_identity(reg, key),
                    dependency_spec: self.inner().dependencies.get(key),
                })
                .collect()
        };
        CompilerInput {
            bindings,
            aliases: self.inner().aliases.snapshot(),
            contextual: self.inner().contextual.snapshot(),
            decorated_keys: self.inner().decorators.decorated_keys(),
            tagged_keys: self.inner().tags.all_tagged_keys(),
            module_path: "ferrous_di::runtime".to_string(),
        }
    }

    /// Computes the registry's fingerprint without planning or emitting
    /// anything, so callers can cheaply detect drift between builds.
    pub fn compilation_fingerprint(&self) -> [u8; 32] {
        crate::compiler::compute_fingerprint(&self.build_compiler_input())
    }

    /// Plans the statically-compilable subset of the current registry and
    /// atomically writes the generated source to `path`.
    pub fn compile(&self, path: &std::path::Path, generated_at: &str) -> DiResult<CompileReport> {
        let input = self.build_compiler_input();
        let report = crate::compiler::compile(&input, generated_at);
        let suffix = COMPILE_TEMP_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let unique_suffix = ((std::process::id() as u64) << 32) | suffix;
        crate::compiler::emit_atomically(path, &report.source, unique_suffix)?;
        Ok(report)
    }
}

/// Monotonic counter used to name temp files uniquely across concurrent
/// `compile` calls in the same process.
static COMPILE_TEMP_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

fn concrete_identity(reg: &Registration, key: &Key) -> String {
    match reg.impl_id {
        Some(id) => format!("{id:?}"),
        None => format!("factory:{}", key.display_name()),
    }
}

impl Resolver for ServiceProvider {
    fn register_disposer<T>(&self, service: Arc<T>)
    where
        T: Dispose + 'static,
    {
        self.push_sync_disposer(Box::new(move || service.dispose()));
    }

    fn register_async_disposer<T>(&self, service: Arc<T>)
    where
        T: AsyncDispose + 'static,
    {
        self.push_async_disposer(Box::new(move || {
            let service = service.clone();
            Box::pin(async move { service.dispose().await })
        }));
    }
}

//! Top-level [`Container`]: the cheaply-cloneable handle applications
//! hold, tying the registry, singleton cache, single-flight coordinator,
//! context store and lifecycle ledger together behind one `Arc`.
//!
//! Grounded on the teacher's `ServiceProvider { inner: Arc<ProviderInner> }`
//! handle pattern, generalized from its fixed Singleton/Scoped/Transient
//! scheme onto arbitrary [`Token`]s, and on `pyinj.container.Container`
//! for the given/using side table, stats and default-container surface.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::OnceCell;

use crate::config::ContainerConfig;
use crate::context::{self, FrameKind};
use crate::coordinator::Coordinator;
use crate::ctor::{AnyArc, Provider};
use crate::error::{DiError, DiResult};
use crate::lifecycle::{ResourceHook, ResourceLedger, ResourceRecord};
use crate::observer::{Observers, ResolutionObserver};
use crate::registry::Registry;
use crate::token::{Scope, Token, TypeHandle};

#[derive(Default)]
struct Stats {
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

/// A snapshot of a container's cache performance and registered surface.
#[derive(Debug, Clone, Copy)]
pub struct ContainerStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub registered_providers: usize,
    pub cached_singletons: usize,
}

enum GivenEntry {
    Value(AnyArc),
    Factory(Provider),
}

/// A type-erased resolved instance, returned by the batch resolution
/// methods where the caller's token list mixes several types. Narrow it
/// back to a concrete type with [`AnyInstance::downcast`].
pub struct AnyInstance(AnyArc);

impl AnyInstance {
    pub fn downcast<T: Send + Sync + 'static>(self) -> DiResult<Arc<T>> {
        self.0
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch("batch resolution type mismatch".to_string()))
    }
}

/// A set of temporary `Token -> instance` overrides for [`Container::use_overrides`].
#[derive(Default)]
pub struct Overrides {
    map: HashMap<Token, AnyArc>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Send + Sync + 'static>(mut self, token: Token, value: T) -> Self {
        self.map.insert(token, Arc::new(value) as AnyArc);
        self
    }
}

struct Inner {
    id: u64,
    registry: RwLock<Registry>,
    singleton_cache: Arc<RwLock<HashMap<Token, AnyArc>>>,
    singleton_ledger: Arc<Mutex<ResourceLedger>>,
    coordinator: Coordinator,
    given: RwLock<HashMap<TypeHandle, GivenEntry>>,
    observers: RwLock<Observers>,
    stats: Stats,
    config: ContainerConfig,
    closed: AtomicBool,
}

/// A dependency-injection container: a registry of providers keyed by
/// [`Token`], plus the caches, context store and lifecycle ledger needed
/// to resolve them.
///
/// Cloning a `Container` is cheap — it is an `Arc` handle, same as every
/// constructed resource it hands out.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

fn next_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn downcast<T: Send + Sync + 'static>(any: AnyArc, description: &str) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(description.to_string()))
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        let cache_hint = config.registry_capacity_hint;
        Self {
            inner: Arc::new(Inner {
                id: next_id(),
                registry: RwLock::new(Registry::new()),
                singleton_cache: Arc::new(RwLock::new(HashMap::with_capacity(cache_hint))),
                singleton_ledger: Arc::new(Mutex::new(ResourceLedger::default())),
                coordinator: Coordinator::new(),
                given: RwLock::new(HashMap::new()),
                observers: RwLock::new(Observers::default()),
                stats: Stats::default(),
                config,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn ResolutionObserver>) -> &Self {
        let mut guard = self.inner.observers.write().unwrap();
        *guard = guard.with(observer);
        self
    }

    fn check_not_closed(&self) -> DiResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            Err(DiError::Resolution("container is closed".to_string()))
        } else {
            Ok(())
        }
    }

    // ---- Registration ----

    pub fn register<T, F>(&self, token: Token, provider: F, scope_override: Option<Scope>) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> DiResult<T> + Send + Sync + 'static,
    {
        let expected = token.type_handle();
        let qualified_name = token.qualified_name();
        self.inner.registry.write().unwrap().register(
            token,
            Provider::from_sync(expected, qualified_name, provider),
            scope_override,
        );
        self
    }

    pub fn register_async<T, F, Fut>(&self, token: Token, provider: F, scope_override: Option<Scope>) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        let expected = token.type_handle();
        let qualified_name = token.qualified_name();
        self.inner.registry.write().unwrap().register(
            token,
            Provider::from_async(expected, qualified_name, provider),
            scope_override,
        );
        self
    }

    pub fn register_singleton<T, F>(&self, token: Token, provider: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> DiResult<T> + Send + Sync + 'static,
    {
        self.register(token, provider, Some(Scope::Singleton))
    }

    pub fn register_request<T, F>(&self, token: Token, provider: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> DiResult<T> + Send + Sync + 'static,
    {
        self.register(token, provider, Some(Scope::Request))
    }

    pub fn register_transient<T, F>(&self, token: Token, provider: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> DiResult<T> + Send + Sync + 'static,
    {
        self.register(token, provider, Some(Scope::Transient))
    }

    pub fn register_session<T, F>(&self, token: Token, provider: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> DiResult<T> + Send + Sync + 'static,
    {
        self.register(token, provider, Some(Scope::Session))
    }

    /// Populates the singleton cache directly, bypassing the registry
    /// entirely — a later `register` for the same token does not evict
    /// it (Data Model: a registered value and a registered provider are
    /// independent).
    pub fn register_value<T: Send + Sync + 'static>(&self, token: Token, value: T) -> &Self {
        self.inner
            .singleton_cache
            .write()
            .unwrap()
            .insert(token, Arc::new(value) as AnyArc);
        self
    }

    /// Container-wide override. Identical in effect to
    /// [`Container::register_value`] (both simply overwrite the singleton
    /// cache entry) — kept as a separate name because callers reach for
    /// "override" when replacing something already registered, and for
    /// "register" when adding something new.
    pub fn override_value<T: Send + Sync + 'static>(&self, token: Token, value: T) -> &Self {
        self.register_value(token, value)
    }

    /// Runs a batch of registration closures against this container. Each
    /// closure captures its own concrete type, sidestepping the fact that
    /// a single `Vec` cannot hold registrations for heterogeneous `T`
    /// directly.
    pub fn register_many(&self, registrations: Vec<Box<dyn FnOnce(&Container) + Send>>) -> &Self {
        for r in registrations {
            r(self);
        }
        self
    }

    pub fn has(&self, token: &Token) -> bool {
        self.inner.registry.read().unwrap().has_provider(token)
            || self.inner.singleton_cache.read().unwrap().contains_key(token)
    }

    // ---- given / using ----

    /// Registers a fallback factory consulted only when a bare type (no
    /// explicit token) is requested and nothing more specific matches.
    pub fn given<T, F>(&self, provider: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> DiResult<T> + Send + Sync + 'static,
    {
        let expected = TypeHandle::of::<T>();
        self.inner.given.write().unwrap().insert(
            expected,
            GivenEntry::Factory(Provider::from_sync(expected, expected.name().to_string(), provider)),
        );
        self
    }

    pub fn given_value<T: Send + Sync + 'static>(&self, value: T) -> &Self {
        self.inner
            .given
            .write()
            .unwrap()
            .insert(TypeHandle::of::<T>(), GivenEntry::Value(Arc::new(value) as AnyArc));
        self
    }

    /// Runs `f` with a temporary given-instance for `T`, restoring
    /// whatever was given for `T` beforehand (or removing it entirely if
    /// nothing was) once `f` returns. `given` is a container-wide table,
    /// not context-local, so nesting `using_value` calls for the *same*
    /// type from concurrent flows will race — matching the original's
    /// own behavior, where the equivalent table is a plain dict mutated
    /// in place.
    pub fn using_value<T: Send + Sync + 'static, R>(&self, value: T, f: impl FnOnce(&Container) -> R) -> R {
        let type_handle = TypeHandle::of::<T>();
        let previous = self
            .inner
            .given
            .write()
            .unwrap()
            .insert(type_handle, GivenEntry::Value(Arc::new(value) as AnyArc));
        let result = f(self);
        let mut given = self.inner.given.write().unwrap();
        match previous {
            Some(p) => {
                given.insert(type_handle, p);
            }
            None => {
                given.remove(&type_handle);
            }
        }
        result
    }

    fn resolve_given<T: Send + Sync + 'static>(&self) -> Option<DiResult<Arc<T>>> {
        let type_handle = TypeHandle::of::<T>();
        let raw = {
            let given = self.inner.given.read().unwrap();
            match given.get(&type_handle) {
                Some(GivenEntry::Value(v)) => Some(Ok(v.clone())),
                Some(GivenEntry::Factory(p)) => Some(p.call_sync().map(|c| c.instance)),
                None => None,
            }
        }?;
        Some(raw.and_then(|any| downcast(any, type_handle.name())))
    }

    // ---- Overrides (context-local) ----

    pub fn use_overrides<R>(&self, overrides: Overrides, f: impl FnOnce(&Container) -> R) -> R {
        context::enter_overrides_sync(self.inner.id, overrides.map, || f(self))
    }

    pub async fn use_overrides_async<F, Fut, R>(&self, overrides: Overrides, f: F) -> R
    where
        F: FnOnce(Container) -> Fut,
        Fut: Future<Output = R>,
    {
        let container = self.clone();
        context::enter_overrides_async(self.inner.id, overrides.map, f(container)).await
    }

    pub fn clear_overrides(&self) {
        context::clear_overrides(self.inner.id);
    }

    // ---- Resolution ----

    pub fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.check_not_closed()?;
        if let Some(given) = self.resolve_given::<T>() {
            return given;
        }
        let token = self.coerce_type::<T>();
        self.get_token(&token)
    }

    pub fn get_token<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Arc<T>> {
        self.check_not_closed()?;
        context::ensure_sync(|| self.resolve_sync_any(token)).and_then(|any| downcast(any, &token.qualified_name()))
    }

    pub async fn aget<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.check_not_closed()?;
        if let Some(given) = self.resolve_given::<T>() {
            return given;
        }
        let token = self.coerce_type::<T>();
        self.aget_token(&token).await
    }

    pub async fn aget_token<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Arc<T>> {
        self.check_not_closed()?;
        let container = self.clone();
        let token_owned = token.clone();
        let any = context::ensure_async(async move { container.resolve_async_any(&token_owned).await }).await?;
        downcast(any, &token.qualified_name())
    }

    /// Resolves a heterogeneous batch of explicit tokens in one call,
    /// each wrapped for later narrowing with [`AnyInstance::downcast`].
    pub fn get_many(&self, tokens: &[Token]) -> DiResult<Vec<AnyInstance>> {
        self.check_not_closed()?;
        context::ensure_sync(|| {
            tokens
                .iter()
                .map(|t| self.resolve_sync_any(t).map(AnyInstance))
                .collect()
        })
    }

    pub async fn get_many_async(&self, tokens: &[Token]) -> DiResult<Vec<AnyInstance>> {
        self.check_not_closed()?;
        let container = self.clone();
        let tokens = tokens.to_vec();
        context::ensure_async(async move {
            let mut out = Vec::with_capacity(tokens.len());
            for t in &tokens {
                out.push(container.resolve_async_any(t).await.map(AnyInstance)?);
            }
            Ok(out)
        })
        .await
    }

    fn coerce_type<T: Send + Sync + 'static>(&self) -> Token {
        let type_handle = TypeHandle::of::<T>();
        self.inner
            .registry
            .read()
            .unwrap()
            .lookup_by_type(type_handle)
            .unwrap_or_else(|| Token::for_type::<T>(type_handle.name(), Scope::Transient))
    }

    fn cached(&self, token: &Token, scope: Scope) -> Option<AnyArc> {
        match scope {
            Scope::Singleton => self.inner.singleton_cache.read().unwrap().get(token).cloned(),
            Scope::Request => context::frame_cache_get(self.inner.id, FrameKind::Request, token),
            Scope::Session => context::frame_cache_get(self.inner.id, FrameKind::Session, token),
            Scope::Transient => None,
        }
    }

    fn record_resource(&self, token: &Token, scope: Scope, hook: ResourceHook) {
        if matches!(hook, ResourceHook::None) {
            return;
        }
        let record = ResourceRecord {
            qualified_name: token.qualified_name(),
            hook,
        };
        let attached = match scope {
            Scope::Request => {
                let active = context::frame_is_active(self.inner.id, FrameKind::Request);
                if active {
                    context::frame_push_resource(self.inner.id, FrameKind::Request, record);
                }
                active
            }
            Scope::Session => {
                let active = context::frame_is_active(self.inner.id, FrameKind::Session);
                if active {
                    context::frame_push_resource(self.inner.id, FrameKind::Session, record);
                }
                active
            }
            _ => false,
        };
        if !attached {
            // No owning frame (or a transient resource constructed
            // outside any scope block): the container's own ledger
            // becomes the resource's owner, so `close`/`aclose` still
            // tears it down.
            self.inner.singleton_ledger.lock().unwrap().push(record);
        }
    }

    /// Implements the Resolver algorithm for a single token, type-erased.
    /// The generic `get`/`aget` entry points narrow the result to a
    /// concrete `T`; the batch entry points return it as-is.
    fn resolve_sync_any(&self, token: &Token) -> DiResult<AnyArc> {
        let start = std::time::Instant::now();

        if let Some(any) = context::get_override(self.inner.id, token) {
            self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(any);
        }

        let scope = self.inner.registry.read().unwrap().effective_scope(token);

        if let Some(any) = self.cached(token, scope) {
            self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
            let observers = self.inner.observers.read().unwrap().clone();
            if observers.has_observers() {
                observers.resolved(token, start.elapsed(), true);
            }
            return Ok(any);
        }

        self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
        let observers = self.inner.observers.read().unwrap().clone();
        if observers.has_observers() {
            observers.resolving(token);
        }

        let guard = match context::enter_guard(self.inner.id, token, self.inner.config.max_resolution_depth) {
            Ok(g) => g,
            Err(DiError::CircularDependency(chain)) => {
                if observers.has_observers() {
                    let mut chain_tokens = context::guard_chain(self.inner.id);
                    chain_tokens.push(token.clone());
                    observers.cycle_detected(token, &chain_tokens);
                }
                return Err(DiError::CircularDependency(chain));
            }
            Err(e) => return Err(e),
        };

        let provider = {
            let reg = self.inner.registry.read().unwrap();
            reg.get(token).cloned()
        }
        .ok_or_else(|| DiError::Resolution(format!("no provider registered for {}", token.qualified_name())))?;

        if provider.is_async() {
            return Err(DiError::AsyncProviderInSyncContext(token.qualified_name()));
        }

        let instance_any = if scope == Scope::Singleton {
            self.inner
                .coordinator
                .resolve_sync(token, &provider, &self.inner.singleton_cache, &self.inner.singleton_ledger)?
        } else {
            let constructed = provider.call_sync()?;
            self.record_resource(token, scope, constructed.hook);
            constructed.instance
        };

        match scope {
            Scope::Request => {
                context::frame_cache_store(self.inner.id, FrameKind::Request, token, instance_any.clone());
            }
            Scope::Session => {
                context::frame_cache_store(self.inner.id, FrameKind::Session, token, instance_any.clone());
            }
            Scope::Transient | Scope::Singleton => {}
        }

        if observers.has_observers() {
            observers.resolved(token, start.elapsed(), false);
        }

        drop(guard);
        Ok(instance_any)
    }

    async fn resolve_async_any(&self, token: &Token) -> DiResult<AnyArc> {
        let start = std::time::Instant::now();

        if let Some(any) = context::get_override(self.inner.id, token) {
            self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(any);
        }

        let scope = self.inner.registry.read().unwrap().effective_scope(token);

        if let Some(any) = self.cached(token, scope) {
            self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
            let observers = self.inner.observers.read().unwrap().clone();
            if observers.has_observers() {
                observers.resolved(token, start.elapsed(), true);
            }
            return Ok(any);
        }

        self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
        let observers = self.inner.observers.read().unwrap().clone();
        if observers.has_observers() {
            observers.resolving(token);
        }

        let guard = match context::enter_guard(self.inner.id, token, self.inner.config.max_resolution_depth) {
            Ok(g) => g,
            Err(DiError::CircularDependency(chain)) => {
                if observers.has_observers() {
                    let mut chain_tokens = context::guard_chain(self.inner.id);
                    chain_tokens.push(token.clone());
                    observers.cycle_detected(token, &chain_tokens);
                }
                return Err(DiError::CircularDependency(chain));
            }
            Err(e) => return Err(e),
        };

        let provider = {
            let reg = self.inner.registry.read().unwrap();
            reg.get(token).cloned()
        }
        .ok_or_else(|| DiError::Resolution(format!("no provider registered for {}", token.qualified_name())))?;

        let instance_any = if scope == Scope::Singleton {
            self.inner
                .coordinator
                .resolve_async(
                    self.inner.id,
                    token,
                    &provider,
                    self.inner.singleton_cache.clone(),
                    self.inner.singleton_ledger.clone(),
                )
                .await?
        } else {
            let constructed = provider.call_async().await?;
            self.record_resource(token, scope, constructed.hook);
            constructed.instance
        };

        match scope {
            Scope::Request => {
                context::frame_cache_store(self.inner.id, FrameKind::Request, token, instance_any.clone());
            }
            Scope::Session => {
                context::frame_cache_store(self.inner.id, FrameKind::Session, token, instance_any.clone());
            }
            Scope::Transient | Scope::Singleton => {}
        }

        if observers.has_observers() {
            observers.resolved(token, start.elapsed(), false);
        }

        drop(guard);
        Ok(instance_any)
    }

    // ---- Scopes ----

    pub fn request_scope<R>(&self, f: impl FnOnce(&Container) -> DiResult<R>) -> DiResult<R> {
        context::ensure_sync(|| {
            context::push_frame(self.inner.id, FrameKind::Request);
            let result = f(self);
            let mut frame = context::pop_frame(self.inner.id, FrameKind::Request);
            match (result, frame.resources.close_sync()) {
                (Ok(v), Ok(())) => Ok(v),
                (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
                (Err(body_err), _) => Err(body_err),
            }
        })
    }

    pub async fn request_scope_async<F, Fut, R>(&self, f: F) -> DiResult<R>
    where
        F: FnOnce(Container) -> Fut,
        Fut: Future<Output = DiResult<R>>,
    {
        let container = self.clone();
        context::ensure_async(async move {
            context::push_frame(container.inner.id, FrameKind::Request);
            let result = f(container.clone()).await;
            let mut frame = context::pop_frame(container.inner.id, FrameKind::Request);
            let failed = frame.resources.close_async_best_effort().await;
            container.report_cleanup_failures(&failed);
            result
        })
        .await
    }

    pub fn session_scope<R>(&self, f: impl FnOnce(&Container) -> DiResult<R>) -> DiResult<R> {
        context::ensure_sync(|| {
            context::push_frame(self.inner.id, FrameKind::Session);
            let result = f(self);
            let mut frame = context::pop_frame(self.inner.id, FrameKind::Session);
            match (result, frame.resources.close_sync()) {
                (Ok(v), Ok(())) => Ok(v),
                (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
                (Err(body_err), _) => Err(body_err),
            }
        })
    }

    pub async fn session_scope_async<F, Fut, R>(&self, f: F) -> DiResult<R>
    where
        F: FnOnce(Container) -> Fut,
        Fut: Future<Output = DiResult<R>>,
    {
        let container = self.clone();
        context::ensure_async(async move {
            context::push_frame(container.inner.id, FrameKind::Session);
            let result = f(container.clone()).await;
            let mut frame = context::pop_frame(container.inner.id, FrameKind::Session);
            let failed = frame.resources.close_async_best_effort().await;
            container.report_cleanup_failures(&failed);
            result
        })
        .await
    }

    /// Notifies observers of any resource whose best-effort cleanup hook
    /// failed (panicked) during teardown. Failures themselves are never
    /// surfaced to the caller of `aclose`/the scope block — this is
    /// purely diagnostic.
    fn report_cleanup_failures(&self, failed: &[String]) {
        if failed.is_empty() {
            return;
        }
        let observers = self.inner.observers.read().unwrap().clone();
        if observers.has_observers() {
            for name in failed {
                observers.cleanup_failed(name);
            }
        }
    }

    // ---- Teardown ----

    /// Empties providers, the singleton cache, the given table, and the
    /// calling flow's own context-local overrides and scope frames.
    pub fn clear(&self) {
        self.inner.registry.write().unwrap().clear();
        self.inner.singleton_cache.write().unwrap().clear();
        *self.inner.singleton_ledger.lock().unwrap() = ResourceLedger::default();
        self.inner.given.write().unwrap().clear();
        context::clear_all(self.inner.id);
        self.inner.stats.hits.store(0, Ordering::Relaxed);
        self.inner.stats.misses.store(0, Ordering::Relaxed);
    }

    /// Synchronous teardown of every tracked singleton resource, in
    /// reverse construction order. Fails fast with
    /// [`DiError::AsyncCleanupRequired`] on the first resource that needs
    /// an async hook, leaving it (and anything constructed before it)
    /// still tracked so a caller can retry with [`Container::aclose`].
    pub fn close(&self) -> DiResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.inner.singleton_ledger.lock().unwrap().close_sync();
        if result.is_ok() {
            self.inner.closed.store(true, Ordering::SeqCst);
            self.clear();
        }
        result
    }

    /// Async, best-effort teardown: every tracked resource's hook runs
    /// (sync hooks on a blocking thread, async hooks as their own task),
    /// individual failures are swallowed, and the container is always
    /// left closed afterward.
    pub async fn aclose(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut ledger = {
            let mut guard = self.inner.singleton_ledger.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        let failed = ledger.close_async_best_effort().await;
        self.report_cleanup_failures(&failed);
        self.clear();
    }

    // ---- Diagnostics ----

    pub fn stats(&self) -> ContainerStats {
        let hits = self.inner.stats.hits.load(Ordering::Relaxed);
        let misses = self.inner.stats.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        ContainerStats {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            registered_providers: self.inner.registry.read().unwrap().registered_tokens().len(),
            cached_singletons: self.inner.singleton_cache.read().unwrap().len(),
        }
    }

    /// Qualified names of every registered token, for debugging and
    /// graph-export style tooling.
    pub fn describe(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .unwrap()
            .registered_tokens()
            .iter()
            .map(Token::qualified_name)
            .collect()
    }
}

static DEFAULT_CONTAINER: OnceCell<Mutex<Option<Container>>> = OnceCell::new();

/// The process-wide default container, lazily created on first use.
pub fn default_container() -> Container {
    let cell = DEFAULT_CONTAINER.get_or_init(|| Mutex::new(None));
    let mut guard = cell.lock().unwrap();
    if guard.is_none() {
        *guard = Some(Container::new());
    }
    guard.as_ref().unwrap().clone()
}

/// Replaces the process-wide default container, for test isolation
/// (pair with `serial_test` — swapping the default is inherently global
/// state).
pub fn set_default_container(container: Container) {
    let cell = DEFAULT_CONTAINER.get_or_init(|| Mutex::new(None));
    *cell.lock().unwrap() = Some(container);
}

//! Single-flight Coordinator: guarantees a SINGLETON token's provider
//! runs at most once across however many concurrent callers ask for it,
//! sync or async, and that every caller observes the same instance.
//!
//! Two distinct locks per token (a `std::sync::Mutex` for the sync path,
//! a `tokio::sync::Mutex` for the async path) rather than one shared
//! lock — Design Notes §9 warns against sharing a lock across both
//! paths. A token being constructed on the sync path and one being
//! awaited on the async path never contend with each other; they only
//! ever meet at the singleton cache itself, which every path
//! double-checks before invoking anything.
//!
//! The async in-flight record is what gives cancellation safety: the
//! constructing future runs inside `tokio::spawn`, detached from any one
//! waiter's task. A waiter's future can be dropped (its caller
//! cancelled) without aborting the spawned construction — every other
//! waiter, and any later caller who still finds the in-flight record,
//! observes the same eventual result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::Notify;

use crate::ctor::{AnyArc, Provider};
use crate::error::DiResult;
use crate::lifecycle::{ResourceLedger, ResourceRecord};
use crate::token::Token;

/// Shared slot a set of async waiters poll for the result of a single
/// in-flight construction.
struct Inflight {
    result: Mutex<Option<DiResult<AnyArc>>>,
    notify: Notify,
}

impl Inflight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    fn complete(&self, result: DiResult<AnyArc>) {
        *self.result.lock().unwrap() = Some(result);
        self.notify.notify_waiters();
    }

    /// Waits (shielded from the caller's own cancellation by virtue of
    /// the constructing task living independently in `tokio::spawn`)
    /// until a result is available.
    async fn wait(&self) -> DiResult<AnyArc> {
        loop {
            if let Some(r) = self.result.lock().unwrap().clone() {
                return r;
            }
            let notified = self.notify.notified();
            // Re-check after subscribing: avoids missing a notify that
            // fired between the first check and `notified()`.
            if let Some(r) = self.result.lock().unwrap().clone() {
                return r;
            }
            notified.await;
        }
    }
}

#[derive(Default)]
pub(crate) struct Coordinator {
    sync_locks: Mutex<HashMap<Token, Arc<Mutex<()>>>>,
    async_locks: Mutex<HashMap<Token, Arc<tokio::sync::Mutex<()>>>>,
    inflight: Mutex<HashMap<Token, Arc<Inflight>>>,
}

fn lazily<K: std::hash::Hash + Eq + Clone, V>(
    map: &Mutex<HashMap<K, Arc<V>>>,
    key: &K,
    make: impl FnOnce() -> V,
) -> Arc<V> {
    let mut map = map.lock().unwrap();
    map.entry(key.clone()).or_insert_with(|| Arc::new(make())).clone()
}

impl Coordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sync protocol: acquire the token's sync lock, double-check the
    /// cache, invoke the provider at most once, populate the cache,
    /// release.
    pub(crate) fn resolve_sync(
        &self,
        token: &Token,
        provider: &Provider,
        cache: &RwLock<HashMap<Token, AnyArc>>,
        ledger: &Mutex<ResourceLedger>,
    ) -> DiResult<AnyArc> {
        if let Some(v) = cache.read().unwrap().get(token) {
            return Ok(v.clone());
        }
        let lock = lazily(&self.sync_locks, token, || Mutex::new(()));
        let _guard = lock.lock().unwrap();
        if let Some(v) = cache.read().unwrap().get(token) {
            return Ok(v.clone());
        }
        let constructed = provider.call_sync()?;
        let instance = constructed.instance.clone();
        cache.write().unwrap().insert(token.clone(), instance.clone());
        if !matches!(constructed.hook, crate::lifecycle::ResourceHook::None) {
            ledger.lock().unwrap().push(ResourceRecord {
                qualified_name: token.qualified_name(),
                hook: constructed.hook,
            });
        }
        Ok(instance)
    }

    /// Async protocol, per spec §4.5. `container_id` identifies the
    /// calling flow's `CONTEXT` task-local so the construction spawned
    /// below can be re-seeded with the caller's resolution guard (see
    /// `context::run_detached_with_guard`).
    pub(crate) async fn resolve_async(
        &self,
        container_id: u64,
        token: &Token,
        provider: &Provider,
        cache: Arc<RwLock<HashMap<Token, AnyArc>>>,
        ledger: Arc<Mutex<ResourceLedger>>,
    ) -> DiResult<AnyArc> {
        if let Some(v) = cache.read().unwrap().get(token) {
            return Ok(v.clone());
        }

        // Step 1: an in-flight future already exists for this token.
        if let Some(inflight) = self.inflight.lock().unwrap().get(token).cloned() {
            return inflight.wait().await;
        }

        // Step 2: acquire the per-token async lock.
        let async_lock = lazily(&self.async_locks, token, || tokio::sync::Mutex::new(()));
        let guard = async_lock.lock().await;

        if let Some(v) = cache.read().unwrap().get(token) {
            return Ok(v.clone());
        }
        if let Some(inflight) = self.inflight.lock().unwrap().get(token).cloned() {
            drop(guard);
            return inflight.wait().await;
        }

        let inflight = Arc::new(Inflight::new());
        self.inflight.lock().unwrap().insert(token.clone(), inflight.clone());

        let provider = provider.clone();
        let token_owned = token.clone();
        let cache_for_task = cache.clone();
        let ledger_for_task = ledger.clone();
        let inflight_for_task = inflight.clone();

        // Step 2c: release the lock before awaiting the construction,
        // so a slow provider never blocks other callers from reaching
        // the in-flight check above.
        drop(guard);

        // Snapshot the caller's resolution guard before handing
        // construction off to a detached task: `tokio::spawn` does not
        // inherit `task_local!` state, so without re-seeding it here a
        // SINGLETON cycle reached through this construction would never
        // trip `enter_guard` and would instead deadlock on its own
        // in-flight record.
        let guard_snapshot = crate::context::guard_chain(container_id);

        let fut = async move {
            let result = provider.call_async().await;
            match result {
                Ok(constructed) => {
                    let instance = constructed.instance.clone();
                    cache_for_task
                        .write()
                        .unwrap()
                        .insert(token_owned.clone(), instance.clone());
                    if !matches!(constructed.hook, crate::lifecycle::ResourceHook::None) {
                        ledger_for_task.lock().unwrap().push(ResourceRecord {
                            qualified_name: token_owned.qualified_name(),
                            hook: constructed.hook,
                        });
                    }
                    Ok(instance)
                }
                Err(e) => Err(e),
            }
        };

        // Run construction on its own task so cancelling this call
        // (dropping our own future) never cancels the construction. The
        // guard snapshot rides along so transitive `aget` calls made
        // during construction still see the in-progress chain.
        let token_for_cleanup = token.clone();
        tokio::spawn(async move {
            let outcome =
                crate::context::run_detached_with_guard(container_id, guard_snapshot, fut).await;
            inflight_for_task.complete(outcome);
        });

        let result = inflight.wait().await;
        self.inflight.lock().unwrap().remove(&token_for_cleanup);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Scope;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sync_single_flight_invokes_provider_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = Token::for_type::<u32>("db", Scope::Singleton);
        let cache: RwLock<HashMap<Token, AnyArc>> = RwLock::new(HashMap::new());
        let ledger: Mutex<ResourceLedger> = Mutex::new(ResourceLedger::default());
        let coordinator = Coordinator::new();

        let c = counter.clone();
        let provider = Provider::from_sync(token.type_handle(), token.qualified_name(), move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(42u32)
        });

        for _ in 0..10 {
            let v = coordinator.resolve_sync(&token, &provider, &cache, &ledger).unwrap();
            assert_eq!(*v.downcast_ref::<u32>().unwrap(), 42);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn async_single_flight_invokes_provider_once_under_concurrency() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = Token::for_type::<u32>("db", Scope::Singleton);
        let cache: Arc<RwLock<HashMap<Token, AnyArc>>> = Arc::new(RwLock::new(HashMap::new()));
        let ledger: Arc<Mutex<ResourceLedger>> = Arc::new(Mutex::new(ResourceLedger::default()));
        let coordinator = Arc::new(Coordinator::new());

        let c = counter.clone();
        let provider = Provider::from_async(token.type_handle(), token.qualified_name(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(42u32)
            }
        });

        let mut handles = Vec::new();
        for _ in 0..50 {
            let coordinator = coordinator.clone();
            let provider = provider.clone();
            let cache = cache.clone();
            let ledger = ledger.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                coordinator.resolve_async(1, &token, &provider, cache, ledger).await
            }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }
        for r in &results {
            assert!(Arc::ptr_eq(r, &results[0]));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

//! Resource capability discovery and ordered teardown.
//!
//! A constructed instance may expose one of four cleanup capabilities,
//! checked in priority order: an async close, an async context-manager
//! style exit, a plain sync close, or none at all. Rust has no runtime
//! `hasattr` to probe this, so classification happens generically at
//! construction time (while the concrete type is still known) using
//! autoref specialization: four traits implemented over `&&&Probe<T>`,
//! `&&Probe<T>`, `&Probe<T>` and `Probe<T>` respectively, so method
//! lookup tries the most-referenced (highest priority) impl first and
//! falls through to the next only when `T` doesn't satisfy that impl's
//! bound.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, type-erased future resolving to `()`.
pub(crate) type BoxFutureUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Implement to give a service an async close, the highest-priority
/// cleanup capability.
#[async_trait]
pub trait AsyncClose: Send + Sync + 'static {
    async fn aclose(&self);
}

/// Implement to give a service an async context-manager style exit.
#[async_trait]
pub trait AsyncExit: Send + Sync + 'static {
    async fn aexit(&self);
}

/// Implement to give a service a plain synchronous close.
pub trait SyncClose: Send + Sync + 'static {
    fn close(&self);
}

/// What the Lifecycle Manager discovered about a constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    AsyncClose,
    AsyncExit,
    SyncClose,
    None,
}

/// A deferred cleanup action for one constructed resource, built once at
/// construction time and invoked at most once during teardown.
pub(crate) enum ResourceHook {
    AsyncClose(Box<dyn FnOnce() -> BoxFutureUnit + Send>),
    AsyncExit(Box<dyn FnOnce() -> BoxFutureUnit + Send>),
    SyncClose(Box<dyn FnOnce() + Send>),
    None,
}

impl ResourceHook {
    pub(crate) fn capability(&self) -> Capability {
        match self {
            ResourceHook::AsyncClose(_) => Capability::AsyncClose,
            ResourceHook::AsyncExit(_) => Capability::AsyncExit,
            ResourceHook::SyncClose(_) => Capability::SyncClose,
            ResourceHook::None => Capability::None,
        }
    }
}

struct Probe<T>(Arc<T>);

trait ProbeAsyncClose {
    fn into_hook(self) -> ResourceHook;
}
impl<T: AsyncClose> ProbeAsyncClose for &&&Probe<T> {
    fn into_hook(self) -> ResourceHook {
        let inst = self.0.clone();
        ResourceHook::AsyncClose(Box::new(move || {
            let inst = inst.clone();
            Box::pin(async move { inst.aclose().await })
        }))
    }
}

trait ProbeAsyncExit {
    fn into_hook(self) -> ResourceHook;
}
impl<T: AsyncExit> ProbeAsyncExit for &&Probe<T> {
    fn into_hook(self) -> ResourceHook {
        let inst = self.0.clone();
        ResourceHook::AsyncExit(Box::new(move || {
            let inst = inst.clone();
            Box::pin(async move { inst.aexit().await })
        }))
    }
}

trait ProbeSyncClose {
    fn into_hook(self) -> ResourceHook;
}
impl<T: SyncClose> ProbeSyncClose for &Probe<T> {
    fn into_hook(self) -> ResourceHook {
        let inst = self.0.clone();
        ResourceHook::SyncClose(Box::new(move || inst.close()))
    }
}

trait ProbeNone {
    fn into_hook(self) -> ResourceHook;
}
impl<T> ProbeNone for Probe<T> {
    fn into_hook(self) -> ResourceHook {
        ResourceHook::None
    }
}

/// Classifies and builds the deferred cleanup hook for a freshly
/// constructed instance, in priority order `AsyncClose > AsyncExit >
/// SyncClose > None`.
pub(crate) fn probe_resource<T: Send + Sync + 'static>(instance: &Arc<T>) -> ResourceHook {
    (&&&Probe(instance.clone())).into_hook()
}

/// One constructed resource's name (for diagnostics) and deferred
/// cleanup hook.
pub(crate) struct ResourceRecord {
    pub(crate) qualified_name: String,
    pub(crate) hook: ResourceHook,
}

impl ResourceRecord {
    pub(crate) fn requires_async(&self) -> bool {
        matches!(
            self.hook.capability(),
            Capability::AsyncClose | Capability::AsyncExit
        )
    }
}

/// A LIFO list of resources awaiting teardown, appended in construction
/// order and torn down in the reverse order.
#[derive(Default)]
pub(crate) struct ResourceLedger(Vec<ResourceRecord>);

impl ResourceLedger {
    pub(crate) fn push(&mut self, record: ResourceRecord) {
        self.0.push(record);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tears down in reverse order; fails fast on the first resource that
    /// needs async cleanup, leaving it and everything below it on the
    /// ledger (nothing after the failing record in append order has been
    /// torn down, since LIFO visits that record first).
    pub(crate) fn close_sync(&mut self) -> crate::error::DiResult<()> {
        while let Some(record) = self.0.pop() {
            if record.requires_async() {
                let name = record.qualified_name.clone();
                self.0.push(record);
                return Err(crate::error::DiError::AsyncCleanupRequired(name));
            }
            match record.hook {
                ResourceHook::SyncClose(close) => close(),
                ResourceHook::None => {}
                ResourceHook::AsyncClose(_) | ResourceHook::AsyncExit(_) => unreachable!(),
            }
        }
        Ok(())
    }

    /// Tears down concurrently, best-effort: every hook runs, individual
    /// failures (panics inside a hook) are swallowed from the caller's
    /// point of view but their qualified names are returned so a caller
    /// holding observers can still report them via `cleanup_failed`.
    pub(crate) async fn close_async_best_effort(&mut self) -> Vec<String> {
        let mut sync_hooks: Vec<(String, Box<dyn FnOnce() + Send>)> = Vec::new();
        let mut async_hooks: Vec<(String, Box<dyn FnOnce() -> BoxFutureUnit + Send>)> = Vec::new();
        while let Some(record) = self.0.pop() {
            match record.hook {
                ResourceHook::SyncClose(f) => sync_hooks.push((record.qualified_name, f)),
                ResourceHook::AsyncClose(f) | ResourceHook::AsyncExit(f) => {
                    async_hooks.push((record.qualified_name, f))
                }
                ResourceHook::None => {}
            }
        }

        let mut handles: Vec<(String, tokio::task::JoinHandle<()>)> = Vec::new();
        for (name, f) in sync_hooks {
            handles.push((name, tokio::task::spawn_blocking(move || f())));
        }
        for (name, f) in async_hooks {
            handles.push((name, tokio::spawn(f())));
        }
        let mut failed = Vec::new();
        for (name, handle) in handles {
            if handle.await.is_err() {
                failed.push(name);
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    struct HasSyncClose(std::sync::atomic::AtomicUsize);
    impl SyncClose for HasSyncClose {
        fn close(&self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    struct HasAsyncClose(std::sync::atomic::AtomicUsize);
    #[async_trait]
    impl AsyncClose for HasAsyncClose {
        async fn aclose(&self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn classifies_plain_values_as_none() {
        let hook = probe_resource(&Arc::new(Plain));
        assert_eq!(hook.capability(), Capability::None);
    }

    #[test]
    fn classifies_sync_close() {
        let hook = probe_resource(&Arc::new(HasSyncClose(Default::default())));
        assert_eq!(hook.capability(), Capability::SyncClose);
    }

    #[test]
    fn classifies_async_close_with_priority_over_sync() {
        let hook = probe_resource(&Arc::new(HasAsyncClose(Default::default())));
        assert_eq!(hook.capability(), Capability::AsyncClose);
    }

    #[test]
    fn sync_teardown_runs_in_reverse_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut ledger = ResourceLedger::default();
        for i in 0..3 {
            let order = order.clone();
            ledger.push(ResourceRecord {
                qualified_name: format!("r{i}"),
                hook: ResourceHook::SyncClose(Box::new(move || order.lock().unwrap().push(i))),
            });
        }
        ledger.close_sync().unwrap();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn sync_teardown_fails_fast_on_async_resource() {
        let mut ledger = ResourceLedger::default();
        ledger.push(ResourceRecord {
            qualified_name: "needs-async".into(),
            hook: ResourceHook::AsyncClose(Box::new(|| Box::pin(async {}))),
        });
        let err = ledger.close_sync().unwrap_err();
        assert!(matches!(err, crate::error::DiError::AsyncCleanupRequired(_)));
    }
}

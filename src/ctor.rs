//! Provider storage: type-erased constructors plus the capability hook
//! discovered for whatever they produce.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::lifecycle::{probe_resource, ResourceHook};
use crate::token::TypeHandle;

/// Type-erased handle to a constructed instance.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The erased output of invoking a provider once: the instance plus
/// whatever cleanup capability the Lifecycle Manager discovered on it.
pub(crate) struct Constructed {
    pub(crate) instance: AnyArc,
    pub(crate) hook: ResourceHook,
}

type SyncCtor = Arc<dyn Fn() -> DiResult<Constructed> + Send + Sync>;
type AsyncCtor = Arc<dyn Fn() -> BoxFuture<DiResult<Constructed>> + Send + Sync>;

/// A registered constructor, sync or async. Registering a second
/// provider under the same token replaces this one entirely.
#[derive(Clone)]
pub(crate) enum Provider {
    Sync(SyncCtor),
    Async(AsyncCtor),
}

impl Provider {
    pub(crate) fn from_sync<T, F>(expected: TypeHandle, qualified_name: String, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> DiResult<T> + Send + Sync + 'static,
    {
        Provider::Sync(Arc::new(move || {
            let actual = TypeHandle::of::<T>();
            if actual != expected {
                return Err(DiError::TypeMismatch(format!(
                    "token {qualified_name} declares {expected} but its provider produces {actual}"
                )));
            }
            let value = f()?;
            let arc = Arc::new(value);
            let hook = probe_resource(&arc);
            Ok(Constructed {
                instance: arc as AnyArc,
                hook,
            })
        }))
    }

    pub(crate) fn from_async<T, F, Fut>(expected: TypeHandle, qualified_name: String, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<T>> + Send + 'static,
    {
        Provider::Async(Arc::new(move || {
            let actual = TypeHandle::of::<T>();
            if actual != expected {
                let qualified_name = qualified_name.clone();
                return Box::pin(async move {
                    Err(DiError::TypeMismatch(format!(
                        "token {qualified_name} declares {expected} but its provider produces {actual}"
                    )))
                });
            }
            let fut = f();
            Box::pin(async move {
                let value = fut.await?;
                let arc = Arc::new(value);
                let hook = probe_resource(&arc);
                Ok(Constructed {
                    instance: arc as AnyArc,
                    hook,
                })
            })
        }))
    }

    pub(crate) fn is_async(&self) -> bool {
        matches!(self, Provider::Async(_))
    }

    pub(crate) fn call_sync(&self) -> DiResult<Constructed> {
        match self {
            Provider::Sync(ctor) => ctor(),
            Provider::Async(_) => unreachable!("caller must check is_async before call_sync"),
        }
    }

    pub(crate) fn call_async(&self) -> BoxFuture<DiResult<Constructed>> {
        match self {
            Provider::Async(ctor) => ctor(),
            Provider::Sync(ctor) => {
                let ctor = ctor.clone();
                Box::pin(async move { ctor() })
            }
        }
    }
}

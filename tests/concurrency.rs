//! Async cancellation safety (spec §8 property 9, §5): cancelling one
//! waiter on an in-flight singleton construction must not cancel the
//! construction itself, and every other waiter still observes the same
//! result.

use ctxdi::{Container, Scope, Token};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Slow(usize);

#[tokio::test]
async fn cancelling_one_waiter_does_not_abort_the_construction() {
    let container = Container::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let token = Token::for_type::<Slow>("slow", Scope::Singleton);

    let counter_for_provider = counter.clone();
    container.register_async(
        token.clone(),
        move || {
            let counter = counter_for_provider.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let id = counter.fetch_add(1, Ordering::SeqCst);
                Ok(Slow(id))
            }
        },
        None,
    );

    let cancelled_container = container.clone();
    let cancelled_token = token.clone();
    let cancelled = tokio::spawn(async move {
        cancelled_container.aget_token::<Slow>(&cancelled_token).await
    });

    // Give the cancelled waiter a chance to register as the one driving
    // construction (or as a waiter on the in-flight record) before we
    // abort it.
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancelled.abort();

    let survivor = container.aget_token::<Slow>(&token).await.unwrap();
    assert_eq!(survivor.0, 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn many_concurrent_waiters_all_observe_the_same_error() {
    let container = Container::new();
    let token = Token::for_type::<Slow>("always-fails", Scope::Singleton);

    container.register_async(
        token.clone(),
        || async {
            tokio::task::yield_now().await;
            Err(ctxdi::DiError::Resolution("provider deliberately fails".to_string()))
        },
        None,
    );

    let mut handles = Vec::new();
    for _ in 0..20 {
        let container = container.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            container.aget_token::<Slow>(&token).await
        }));
    }

    for h in handles {
        let result = h.await.unwrap();
        assert!(matches!(result, Err(ctxdi::DiError::Resolution(_))));
    }
}

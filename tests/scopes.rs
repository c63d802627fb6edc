//! Request/session scope nesting and cleanup ordering (spec §4.6),
//! mirroring the teacher's `tests/scopes.rs`.

use ctxdi::{Container, DiError, Scope, Token};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Conn(usize);

#[test]
fn nested_request_frames_are_independent_caches() {
    let container = Container::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let token = Token::for_type::<Conn>("conn", Scope::Request);
    let counter_for_provider = counter.clone();
    container.register_request(token.clone(), move || {
        Ok(Conn(counter_for_provider.fetch_add(1, Ordering::SeqCst)))
    });

    container
        .request_scope(|outer| {
            let a = outer.get_token::<Conn>(&token)?;
            outer.request_scope(|inner| {
                let b = inner.get_token::<Conn>(&token)?;
                assert_ne!(a.0, b.0, "inner frame shadows the outer frame's cache");
                Ok(())
            })?;
            let a_again = outer.get_token::<Conn>(&token)?;
            assert_eq!(a.0, a_again.0, "outer frame is unaffected by the inner one");
            Ok(())
        })
        .unwrap();
}

#[test]
fn singleton_resolved_inside_a_nested_scope_is_visible_outside_it() {
    let container = Container::new();
    let singleton = Token::for_type::<Conn>("pool", Scope::Singleton);
    container.register_singleton(singleton.clone(), || Ok(Conn(1)));

    let inner_value = container
        .request_scope(|outer| {
            outer.request_scope(|inner| inner.get_token::<Conn>(&singleton))
        })
        .unwrap();

    let outside_value = container.get_token::<Conn>(&singleton).unwrap();
    assert!(Arc::ptr_eq(&inner_value, &outside_value));
}

#[test]
fn session_scope_is_independent_of_request_scope() {
    let container = Container::new();
    let req_token = Token::for_type::<Conn>("req", Scope::Request);
    let sess_token = Token::for_type::<Conn>("sess", Scope::Session);
    container.register_request(req_token.clone(), || Ok(Conn(1)));
    container.register_session(sess_token.clone(), || Ok(Conn(2)));

    container
        .session_scope(|c| {
            c.request_scope(|c2| {
                let req = c2.get_token::<Conn>(&req_token)?;
                let sess = c2.get_token::<Conn>(&sess_token)?;
                assert_eq!(req.0, 1);
                assert_eq!(sess.0, 2);
                Ok(())
            })
        })
        .unwrap();
}

#[test]
fn resource_constructed_with_no_active_frame_is_owned_by_the_container() {
    let container = Container::new();
    let closes = Arc::new(AtomicUsize::new(0));

    struct Tracked(Arc<AtomicUsize>);
    impl ctxdi::SyncClose for Tracked {
        fn close(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let token = Token::for_type::<Tracked>("untamed", Scope::Request);
    let closes_for_provider = closes.clone();
    container.register_request(token.clone(), move || Ok(Tracked(closes_for_provider.clone())));

    // No request scope is active: the value is still returned, per spec
    // §4.4 step 9, but it isn't cached in a frame that doesn't exist —
    // the container's own ledger becomes the fallback owner.
    let value = container.get_token::<Tracked>(&token).unwrap();
    drop(value);

    container.close().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn request_scope_propagates_body_error_over_cleanup_success() {
    let container = Container::new();
    let result: Result<(), DiError> = container.request_scope(|_c| {
        Err(DiError::Resolution("deliberate body failure".to_string()))
    });
    assert!(matches!(result, Err(DiError::Resolution(_))));
}

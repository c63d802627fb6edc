//! Context Store: per-logical-flow overrides, resolution guard, and
//! scope frames.
//!
//! "Context-local" means each concurrently executing caller chain sees
//! its own view, and that view survives suspension (an `.await`) within
//! the same logical flow. A thread-local cannot provide that guarantee
//! once a tokio task is free to resume on a different worker thread, so
//! this is built on `tokio::task_local!`, the same primitive the
//! `other_examples` request-context code
//! (`spiceai::runtime::RequestContext`) uses for exactly this purpose.
//! `task_local!`'s `sync_scope` lets the *synchronous* `get`/
//! `request_scope` entry points share the identical state with their
//! async counterparts, so mixed sync/async call chains still observe
//! one context.
//!
//! State is keyed by a container's id so that several containers used
//! from the same task do not share overrides, guard, or frames.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;

use crate::ctor::AnyArc;
use crate::error::{DiError, DiResult};
use crate::lifecycle::ResourceRecord;
use crate::token::Token;

#[derive(Default)]
pub(crate) struct Frame {
    cache: HashMap<Token, AnyArc>,
    pub(crate) resources: crate::lifecycle::ResourceLedger,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Request,
    Session,
}

#[derive(Default)]
pub(crate) struct ContextState {
    overrides: HashMap<Token, AnyArc>,
    guard_stack: Vec<Token>,
    guard_set: HashSet<Token>,
    request_frames: Vec<Frame>,
    session_frames: Vec<Frame>,
}

tokio::task_local! {
    static CONTEXT: RefCell<HashMap<u64, ContextState>>;
}

/// Runs `f` with a context guaranteed to exist, establishing a fresh
/// empty one for the duration of `f` if the current flow has not
/// already entered one.
pub(crate) fn ensure_sync<R>(f: impl FnOnce() -> R) -> R {
    if CONTEXT.try_with(|_| ()).is_ok() {
        f()
    } else {
        CONTEXT.sync_scope(RefCell::new(HashMap::new()), f)
    }
}

/// Async counterpart of [`ensure_sync`].
pub(crate) async fn ensure_async<F, R>(f: F) -> R
where
    F: Future<Output = R>,
{
    if CONTEXT.try_with(|_| ()).is_ok() {
        f.await
    } else {
        CONTEXT.scope(RefCell::new(HashMap::new()), f).await
    }
}

fn with_state<R>(container_id: u64, f: impl FnOnce(&mut ContextState) -> R) -> R {
    CONTEXT.with(|map| {
        let mut map = map.borrow_mut();
        let state = map.entry(container_id).or_insert_with(ContextState::default);
        f(state)
    })
}

// ---- Overrides ----

pub(crate) fn get_override(container_id: u64, token: &Token) -> Option<AnyArc> {
    with_state(container_id, |s| s.overrides.get(token).cloned())
}

/// Merges `new_entries` into the current flow's overrides for the
/// duration of `f`, restoring the previous map afterward.
pub(crate) fn enter_overrides_sync<R>(
    container_id: u64,
    new_entries: HashMap<Token, AnyArc>,
    f: impl FnOnce() -> R,
) -> R {
    ensure_sync(|| {
        let previous = with_state(container_id, |s| {
            let previous = s.overrides.clone();
            s.overrides.extend(new_entries);
            previous
        });
        let result = f();
        with_state(container_id, |s| s.overrides = previous);
        result
    })
}

pub(crate) async fn enter_overrides_async<F, R>(
    container_id: u64,
    new_entries: HashMap<Token, AnyArc>,
    f: F,
) -> R
where
    F: Future<Output = R>,
{
    ensure_async(async {
        let previous = with_state(container_id, |s| {
            let previous = s.overrides.clone();
            s.overrides.extend(new_entries);
            previous
        });
        let result = f.await;
        with_state(container_id, |s| s.overrides = previous);
        result
    })
    .await
}

/// Resets the current flow's overrides to empty, per spec §4.4: this
/// does not restore the outer enclosing map.
pub(crate) fn clear_overrides(container_id: u64) {
    with_state(container_id, |s| s.overrides.clear());
}

// ---- Resolution guard ----

/// RAII handle releasing a guard entry from both the stack and the set
/// on every exit path (the resolver returns early via `?` on most
/// errors, so `Drop` is what gives us the "released on both success and
/// failure" guarantee).
pub(crate) struct GuardHandle {
    container_id: u64,
    token: Token,
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        with_state(self.container_id, |s| {
            s.guard_set.remove(&self.token);
            if let Some(pos) = s.guard_stack.iter().rposition(|t| t == &self.token) {
                s.guard_stack.remove(pos);
            }
        });
    }
}

/// Pushes `token` onto the resolution guard, failing with
/// `CircularDependencyError` if it is already a member of the current
/// flow's guard set, or with a depth-exceeded `Resolution` error if the
/// guard stack has grown past `max_depth` without closing a cycle.
pub(crate) fn enter_guard(container_id: u64, token: &Token, max_depth: usize) -> DiResult<GuardHandle> {
    with_state(container_id, |s| {
        if s.guard_set.contains(token) {
            let mut chain: Vec<String> =
                s.guard_stack.iter().map(Token::qualified_name).collect();
            chain.push(token.qualified_name());
            return Err(DiError::CircularDependency(chain));
        }
        if s.guard_stack.len() >= max_depth {
            return Err(DiError::Resolution(format!(
                "max resolution depth ({max_depth}) exceeded resolving {}",
                token.qualified_name()
            )));
        }
        s.guard_set.insert(token.clone());
        s.guard_stack.push(token.clone());
        Ok(())
    })?;
    Ok(GuardHandle {
        container_id,
        token: token.clone(),
    })
}

/// Snapshot of the current flow's resolution guard stack, for observer
/// notification when a cycle closes (the error itself only carries
/// qualified names, not the tokens themselves). Non-panicking: callers
/// may run before any `CONTEXT` has been established (e.g. unit tests
/// that drive the coordinator directly), in which case the chain is
/// simply empty.
pub(crate) fn guard_chain(container_id: u64) -> Vec<Token> {
    CONTEXT
        .try_with(|map| {
            map.borrow()
                .get(&container_id)
                .map(|s| s.guard_stack.clone())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

/// Runs `f` on a detached task carrying a snapshot of the calling flow's
/// resolution guard. `tokio::spawn` does not inherit the spawning task's
/// `task_local!` state, so without this a provider spawned off to survive
/// cancellation would construct inside a fresh, empty `CONTEXT` and every
/// transitive `aget` it issues would be blind to the cycle already
/// in progress — re-entering the coordinator and awaiting its own
/// in-flight record forever instead of failing with
/// `CircularDependencyError`. Seeding a fresh context with the snapshot
/// restores cross-hop cycle detection for the spawned flow.
pub(crate) async fn run_detached_with_guard<F, R>(
    container_id: u64,
    guard_snapshot: Vec<Token>,
    f: F,
) -> R
where
    F: Future<Output = R>,
{
    let mut state = ContextState::default();
    state.guard_set = guard_snapshot.iter().cloned().collect();
    state.guard_stack = guard_snapshot;
    let mut map = HashMap::new();
    map.insert(container_id, state);
    CONTEXT.scope(RefCell::new(map), f).await
}

// ---- Scope frames ----

pub(crate) fn push_frame(container_id: u64, kind: FrameKind) {
    ensure_sync(|| {
        with_state(container_id, |s| match kind {
            FrameKind::Request => s.request_frames.push(Frame::default()),
            FrameKind::Session => s.session_frames.push(Frame::default()),
        })
    })
}

pub(crate) fn pop_frame(container_id: u64, kind: FrameKind) -> Frame {
    with_state(container_id, |s| {
        let frames = match kind {
            FrameKind::Request => &mut s.request_frames,
            FrameKind::Session => &mut s.session_frames,
        };
        frames.pop().expect("pop_frame called without a matching push_frame")
    })
}

pub(crate) fn frame_is_active(container_id: u64, kind: FrameKind) -> bool {
    with_state(container_id, |s| {
        !(match kind {
            FrameKind::Request => &s.request_frames,
            FrameKind::Session => &s.session_frames,
        })
        .is_empty()
    })
}

pub(crate) fn frame_cache_get(container_id: u64, kind: FrameKind, token: &Token) -> Option<AnyArc> {
    with_state(container_id, |s| {
        let frames = match kind {
            FrameKind::Request => &s.request_frames,
            FrameKind::Session => &s.session_frames,
        };
        frames.last().and_then(|f| f.cache.get(token).cloned())
    })
}

/// Stores `value` in the innermost active frame of `kind`. Returns
/// `false` (value is returned to the caller but not cached) if no frame
/// of that kind is active, per spec §4.4 step 9.
pub(crate) fn frame_cache_store(
    container_id: u64,
    kind: FrameKind,
    token: &Token,
    value: AnyArc,
) -> bool {
    with_state(container_id, |s| {
        let frames = match kind {
            FrameKind::Request => &mut s.request_frames,
            FrameKind::Session => &mut s.session_frames,
        };
        match frames.last_mut() {
            Some(frame) => {
                frame.cache.insert(token.clone(), value);
                true
            }
            None => false,
        }
    })
}

/// Resets every piece of context-local state for `container_id` on the
/// current flow: overrides, resolution guard, and both frame stacks.
/// Used by `Container::clear`, which per spec §6 empties overrides and
/// scope frames alongside the registry and singleton cache.
pub(crate) fn clear_all(container_id: u64) {
    ensure_sync(|| {
        with_state(container_id, |s| {
            s.overrides.clear();
            s.guard_stack.clear();
            s.guard_set.clear();
            s.request_frames.clear();
            s.session_frames.clear();
        })
    })
}

pub(crate) fn frame_push_resource(container_id: u64, kind: FrameKind, record: ResourceRecord) {
    with_state(container_id, |s| {
        let frames = match kind {
            FrameKind::Request => &mut s.request_frames,
            FrameKind::Session => &mut s.session_frames,
        };
        if let Some(frame) = frames.last_mut() {
            frame.resources.push(record);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Scope;
    use std::sync::Arc;

    #[test]
    fn guard_detects_reentry_and_restores_after_drop() {
        ensure_sync(|| {
            let token = Token::for_type::<u32>("a", Scope::Singleton);
            let guard = enter_guard(1, &token, 8).unwrap();
            let err = enter_guard(1, &token, 8).unwrap_err();
            assert!(matches!(err, DiError::CircularDependency(_)));
            drop(guard);
            assert!(enter_guard(1, &token, 8).is_ok());
        });
    }

    #[test]
    fn overrides_restore_after_block_exit() {
        ensure_sync(|| {
            let token = Token::for_type::<u32>("port", Scope::Singleton);
            assert!(get_override(2, &token).is_none());
            let mut map = HashMap::new();
            map.insert(token.clone(), Arc::new(7u32) as AnyArc);
            enter_overrides_sync(2, map, || {
                assert!(get_override(2, &token).is_some());
            });
            assert!(get_override(2, &token).is_none());
        });
    }

    #[tokio::test]
    async fn concurrent_flows_do_not_share_overrides() {
        let token = Token::for_type::<u32>("cfg", Scope::Singleton);
        let t1 = token.clone();
        let t2 = token.clone();
        let a = tokio::spawn(async move {
            let mut map = HashMap::new();
            map.insert(t1.clone(), Arc::new(1u32) as AnyArc);
            enter_overrides_async(10, map, async move {
                tokio::task::yield_now().await;
                get_override(10, &t1).is_some()
            })
            .await
        });
        let b = tokio::spawn(async move {
            let mut map = HashMap::new();
            map.insert(t2.clone(), Arc::new(2u32) as AnyArc);
            enter_overrides_async(11, map, async move {
                tokio::task::yield_now().await;
                get_override(11, &t2).is_some()
            })
            .await
        });
        assert!(a.await.unwrap());
        assert!(b.await.unwrap());
    }
}

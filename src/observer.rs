//! Diagnostic observers for resolution traceability.
//!
//! Mirrors the teacher's `DiObserver`/`LoggingObserver` shape (a small
//! trait fired around resolution, plus a `println!`-based default
//! implementation) retargeted at the token-based resolver. There is no
//! `tracing`/`log` dependency here, matching the teacher: observers are
//! just plain trait objects the container calls directly.

use std::time::Duration;

use crate::token::Token;

/// Observes resolution and teardown events on a [`crate::container::Container`].
///
/// Default method bodies are no-ops so implementors only need to
/// override what they care about.
pub trait ResolutionObserver: Send + Sync {
    /// Called before a provider is invoked (cache miss).
    fn resolving(&self, _token: &Token) {}

    /// Called after a value is produced for `token`, whether from cache
    /// or from invoking a provider.
    fn resolved(&self, _token: &Token, _duration: Duration, _cache_hit: bool) {}

    /// Called when `token` closes a cycle in the resolution guard.
    fn cycle_detected(&self, _token: &Token, _chain: &[Token]) {}

    /// Called when a tracked resource's cleanup hook fails during
    /// best-effort teardown.
    fn cleanup_failed(&self, _token_name: &str) {}
}

/// Prints resolution and teardown events with a configurable prefix.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self { prefix: "[di]".to_string() }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionObserver for LoggingObserver {
    fn resolving(&self, token: &Token) {
        println!("{} resolving {}", self.prefix, token.qualified_name());
    }

    fn resolved(&self, token: &Token, duration: Duration, cache_hit: bool) {
        if cache_hit {
            println!("{} cache hit {}", self.prefix, token.qualified_name());
        } else {
            println!(
                "{} resolved {} in {:?}",
                self.prefix,
                token.qualified_name(),
                duration
            );
        }
    }

    fn cycle_detected(&self, token: &Token, chain: &[Token]) {
        let path: Vec<&str> = chain.iter().map(|t| t.name()).collect();
        eprintln!(
            "{} circular dependency at {}: {} -> {}",
            self.prefix,
            token.qualified_name(),
            path.join(" -> "),
            token.name()
        );
    }

    fn cleanup_failed(&self, token_name: &str) {
        eprintln!("{} cleanup failed for {}", self.prefix, token_name);
    }
}

/// A registered set of observers, consulted only on paths that already
/// check `has_observers()` so the no-observer case stays branch-free on
/// the hot path.
#[derive(Default, Clone)]
pub struct Observers {
    inner: std::sync::Arc<Vec<std::sync::Arc<dyn ResolutionObserver>>>,
}

impl Observers {
    pub fn new(observers: Vec<std::sync::Arc<dyn ResolutionObserver>>) -> Self {
        Self { inner: std::sync::Arc::new(observers) }
    }

    pub(crate) fn has_observers(&self) -> bool {
        !self.inner.is_empty()
    }

    pub(crate) fn resolving(&self, token: &Token) {
        for o in self.inner.iter() {
            o.resolving(token);
        }
    }

    pub(crate) fn resolved(&self, token: &Token, duration: Duration, cache_hit: bool) {
        for o in self.inner.iter() {
            o.resolved(token, duration, cache_hit);
        }
    }

    pub(crate) fn cycle_detected(&self, token: &Token, chain: &[Token]) {
        for o in self.inner.iter() {
            o.cycle_detected(token, chain);
        }
    }

    pub(crate) fn cleanup_failed(&self, token_name: &str) {
        for o in self.inner.iter() {
            o.cleanup_failed(token_name);
        }
    }

    /// Returns a new set of observers with `observer` appended.
    pub fn with(&self, observer: std::sync::Arc<dyn ResolutionObserver>) -> Self {
        let mut list = (*self.inner).clone();
        list.push(observer);
        Self { inner: std::sync::Arc::new(list) }
    }
}

//! Error types for the dependency injection container.

use std::fmt;

/// Errors raised by registration, resolution, and teardown.
///
/// Mirrors the seven error kinds a conforming resolver must be able to
/// raise: an invalid token specifier, a non-callable provider, a missing
/// registration, a type mismatch between a provider's output and its
/// token, a circular dependency, a sync caller hitting an async-only
/// provider, and a sync teardown hitting a resource that needs async
/// cleanup.
#[derive(Debug, Clone)]
pub enum DiError {
    /// A bare value was passed where a token or a registered type was
    /// required.
    InvalidTokenSpec(String),
    /// A provider handle could not be invoked with the expected shape.
    InvalidProvider(String),
    /// No provider or value is registered for the requested token.
    Resolution(String),
    /// The provider's output could not be downcast to the token's type.
    TypeMismatch(String),
    /// The token is already being constructed on the current flow; the
    /// chain is the ordered path from the first token to the one that
    /// closed the cycle.
    CircularDependency(Vec<String>),
    /// A synchronous `get` encountered a provider registered as
    /// async-only.
    AsyncProviderInSyncContext(String),
    /// Synchronous teardown encountered a resource whose cleanup
    /// capability requires an async call.
    AsyncCleanupRequired(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::InvalidTokenSpec(msg) => write!(f, "invalid token specifier: {msg}"),
            DiError::InvalidProvider(msg) => write!(f, "invalid provider: {msg}"),
            DiError::Resolution(name) => write!(f, "no provider registered for: {name}"),
            DiError::TypeMismatch(name) => write!(f, "type mismatch resolving: {name}"),
            DiError::CircularDependency(chain) => {
                write!(f, "circular dependency: {}", chain.join(" -> "))
            }
            DiError::AsyncProviderInSyncContext(name) => {
                write!(f, "sync get() hit an async-only provider for: {name}")
            }
            DiError::AsyncCleanupRequired(name) => {
                write!(f, "sync teardown hit a resource requiring async cleanup: {name}")
            }
        }
    }
}

impl std::error::Error for DiError {}

/// Result type used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;

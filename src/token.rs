//! Token and scope identity types.
//!
//! A [`Token`] is the immutable identity under which a provider is
//! registered and a service is requested. Two tokens are equal only when
//! every field matches; the hash is computed once at construction and
//! reused on every lookup.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Lifecycle class of a token, controlling caching and teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One instance per container for its lifetime.
    Singleton,
    /// One instance per active request-scope frame.
    Request,
    /// One instance per active session-scope frame.
    Session,
    /// A fresh instance on every resolution; never cached.
    Transient,
}

/// A type identity usable as part of a [`Token`], carrying both the
/// `TypeId` used for equality and a stable name for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    /// Builds the handle for `T`.
    pub fn of<T: 'static>() -> Self {
        TypeHandle {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `type_name::<T>()` this handle was built from.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone)]
struct TokenInner {
    name: Arc<str>,
    type_handle: TypeHandle,
    scope: Scope,
    qualifier: Option<Arc<str>>,
    tags: Arc<[Arc<str>]>,
    hash: u64,
}

fn precompute_hash(
    name: &str,
    type_handle: &TypeHandle,
    scope: Scope,
    qualifier: &Option<Arc<str>>,
    tags: &[Arc<str>],
) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    type_handle.hash(&mut hasher);
    scope.hash(&mut hasher);
    qualifier.as_deref().hash(&mut hasher);
    tags.iter().for_each(|t| t.as_ref().hash(&mut hasher));
    hasher.finish()
}

/// Immutable 5-field identity: `name`, `type`, `scope`, `qualifier`, `tags`.
///
/// Cloning a `Token` is cheap (an `Arc` clone of the shared inner value).
/// `with_scope`/`with_qualifier`/`with_tags` never mutate `self`; they
/// return a fresh token with a freshly precomputed hash.
#[derive(Debug, Clone)]
pub struct Token {
    inner: Arc<TokenInner>,
}

impl Token {
    /// Builds a new token. `scope` defaults to [`Scope::Transient`],
    /// `qualifier` to `None`, `tags` to empty, matching the fallback a
    /// fabricated (type-only) token would receive.
    pub fn new(
        name: impl Into<String>,
        type_handle: TypeHandle,
        scope: Option<Scope>,
        qualifier: Option<String>,
        tags: Vec<String>,
    ) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let scope = scope.unwrap_or(Scope::Transient);
        let qualifier: Option<Arc<str>> = qualifier.map(|q| Arc::from(q));
        let tags: Arc<[Arc<str>]> = tags.into_iter().map(|t| Arc::from(t)).collect();
        let hash = precompute_hash(&name, &type_handle, scope, &qualifier, &tags);
        Token {
            inner: Arc::new(TokenInner {
                name,
                type_handle,
                scope,
                qualifier,
                tags,
                hash,
            }),
        }
    }

    /// Convenience constructor for an unqualified token over a concrete
    /// Rust type, the shape the Resolver fabricates when a bare type is
    /// passed in place of a token.
    pub fn for_type<T: 'static>(name: impl Into<String>, scope: Scope) -> Self {
        Token::new(name, TypeHandle::of::<T>(), Some(scope), None, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn type_handle(&self) -> TypeHandle {
        self.inner.type_handle
    }

    pub fn scope(&self) -> Scope {
        self.inner.scope
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.inner.qualifier.as_deref()
    }

    pub fn tags(&self) -> &[Arc<str>] {
        &self.inner.tags
    }

    /// Returns a new token with `scope` replaced.
    pub fn with_scope(&self, scope: Scope) -> Self {
        let hash = precompute_hash(
            &self.inner.name,
            &self.inner.type_handle,
            scope,
            &self.inner.qualifier,
            &self.inner.tags,
        );
        Token {
            inner: Arc::new(TokenInner {
                name: self.inner.name.clone(),
                type_handle: self.inner.type_handle,
                scope,
                qualifier: self.inner.qualifier.clone(),
                tags: self.inner.tags.clone(),
                hash,
            }),
        }
    }

    /// Returns a new token with `qualifier` replaced.
    pub fn with_qualifier(&self, qualifier: impl Into<String>) -> Self {
        let qualifier: Option<Arc<str>> = Some(Arc::from(qualifier.into()));
        let hash = precompute_hash(
            &self.inner.name,
            &self.inner.type_handle,
            self.inner.scope,
            &qualifier,
            &self.inner.tags,
        );
        Token {
            inner: Arc::new(TokenInner {
                name: self.inner.name.clone(),
                type_handle: self.inner.type_handle,
                scope: self.inner.scope,
                qualifier,
                tags: self.inner.tags.clone(),
                hash,
            }),
        }
    }

    /// Returns a new token with `tags` replaced.
    pub fn with_tags(&self, tags: Vec<String>) -> Self {
        let tags: Arc<[Arc<str>]> = tags.into_iter().map(|t| Arc::from(t)).collect();
        let hash = precompute_hash(
            &self.inner.name,
            &self.inner.type_handle,
            self.inner.scope,
            &self.inner.qualifier,
            &tags,
        );
        Token {
            inner: Arc::new(TokenInner {
                name: self.inner.name.clone(),
                type_handle: self.inner.type_handle,
                scope: self.inner.scope,
                qualifier: self.inner.qualifier.clone(),
                tags,
                hash,
            }),
        }
    }

    /// Stable human-readable identity combining name, type, qualifier and
    /// tags. Used in error messages and observer events.
    pub fn qualified_name(&self) -> String {
        let mut s = format!("{}:{}", self.inner.name, self.inner.type_handle.name());
        if let Some(q) = &self.inner.qualifier {
            s.push('@');
            s.push_str(q);
        }
        if !self.inner.tags.is_empty() {
            s.push('[');
            for (i, t) in self.inner.tags.iter().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                s.push_str(t);
            }
            s.push(']');
        }
        s
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.inner.hash == other.inner.hash
            && self.inner.name == other.inner.name
            && self.inner.type_handle == other.inner.type_handle
            && self.inner.scope == other.inner.scope
            && self.inner.qualifier == other.inner.qualifier
            && self.inner.tags == other.inner.tags
    }
}
impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

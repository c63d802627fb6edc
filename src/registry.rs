//! Provider registry: `Token -> Provider`, plus the parallel
//! `Token -> effective Scope` table used when a registration supplies a
//! scope override without disturbing the token's own identity.

use std::collections::HashMap;

use crate::ctor::Provider;
use crate::token::{Scope, Token, TypeHandle};

#[derive(Default)]
pub(crate) struct Registry {
    providers: HashMap<Token, Provider>,
    scope_overrides: HashMap<Token, Scope>,
    /// Memoized type -> token map for the type-to-token resolver
    /// fallback (Design Notes: "memoize... and invalidate on clear() or
    /// new matching registrations").
    type_index: HashMap<TypeHandle, Token>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, token: Token, provider: Provider, scope_override: Option<Scope>) {
        match scope_override {
            Some(scope) => {
                self.scope_overrides.insert(token.clone(), scope);
            }
            None => {
                self.scope_overrides.remove(&token);
            }
        }
        self.type_index.insert(token.type_handle(), token.clone());
        self.providers.insert(token, provider);
    }

    pub(crate) fn get(&self, token: &Token) -> Option<&Provider> {
        self.providers.get(token)
    }

    pub(crate) fn has_provider(&self, token: &Token) -> bool {
        self.providers.contains_key(token)
    }

    /// Effective scope: the registration-time override if present,
    /// otherwise the token's own intrinsic scope.
    pub(crate) fn effective_scope(&self, token: &Token) -> Scope {
        self.scope_overrides
            .get(token)
            .copied()
            .unwrap_or_else(|| token.scope())
    }

    /// Best-effort fallback used when a bare type is coerced to a token:
    /// the most recently registered token whose type matches.
    pub(crate) fn lookup_by_type(&self, type_handle: TypeHandle) -> Option<Token> {
        self.type_index.get(&type_handle).cloned()
    }

    pub(crate) fn clear(&mut self) {
        self.providers.clear();
        self.scope_overrides.clear();
        self.type_index.clear();
    }

    pub(crate) fn registered_tokens(&self) -> Vec<Token> {
        self.providers.keys().cloned().collect()
    }
}

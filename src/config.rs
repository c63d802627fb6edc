//! Runtime knobs for the container's own behavior.
//!
//! The container has no environment/persistence surface of its own (no
//! files, no sockets) — application-level configuration is a service
//! like any other, registered with [`crate::container::Container::register_value`].
//! `ContainerConfig` only covers knobs that change how the container
//! *itself* behaves: a resolution-depth guard against runaway recursive
//! providers, and a capacity hint for the registry's maps.

/// Construction-time knobs for a [`crate::container::Container`].
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Upper bound on the resolution guard's stack depth. A provider
    /// that keeps resolving deeper without ever closing a cycle (for
    /// example, an unbounded recursive factory) hits this before
    /// exhausting the real call stack. Matches the teacher's
    /// `internal::circular::MAX_DEPTH` guard.
    pub max_resolution_depth: usize,
    /// Initial capacity hint for the registry's provider and type-index
    /// maps, to avoid rehashing during bulk registration.
    pub registry_capacity_hint: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: 1024,
            registry_capacity_hint: 16,
        }
    }
}

impl ContainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn with_registry_capacity_hint(mut self, hint: usize) -> Self {
        self.registry_capacity_hint = hint;
        self
    }
}

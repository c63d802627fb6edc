//! # ctxdi
//!
//! A token-identified, context-aware dependency injection container.
//!
//! Where a classic DI container keys providers by Rust type and a fixed
//! Singleton/Scoped/Transient ladder, this one keys them by [`Token`] — a
//! `(name, type, scope, qualifier, tags)` tuple — and threads resolution
//! state through `tokio::task_local!` rather than thread-locals, so a
//! request-scoped or session-scoped value stays correctly isolated
//! across `.await` points and concurrent logical flows on the same
//! worker thread.
//!
//! ## Quick start
//!
//! ```rust
//! use ctxdi::{Container, Scope, Token};
//!
//! struct Database {
//!     dsn: String,
//! }
//!
//! struct UserService {
//!     db: std::sync::Arc<Database>,
//! }
//!
//! let container = Container::new();
//! let db_token = Token::for_type::<Database>("database", Scope::Singleton);
//! container.register_singleton(db_token.clone(), || {
//!     Ok(Database { dsn: "postgres://localhost".to_string() })
//! });
//!
//! let container_for_provider = container.clone();
//! let db_token_for_provider = db_token.clone();
//! container.register_transient(
//!     Token::for_type::<UserService>("user-service", Scope::Transient),
//!     move || {
//!         Ok(UserService { db: container_for_provider.get_token(&db_token_for_provider)? })
//!     },
//! );
//!
//! let user_service = container.get_token::<UserService>(
//!     &Token::for_type::<UserService>("user-service", Scope::Transient),
//! ).unwrap();
//! assert_eq!(user_service.db.dsn, "postgres://localhost");
//! ```
//!
//! ## Scopes
//!
//! - **Singleton** — one instance per container, built at most once even
//!   under concurrent resolution (the Single-flight Coordinator).
//! - **Request** / **Session** — one instance per active
//!   [`Container::request_scope`] / [`Container::session_scope`] frame,
//!   entered with a closure rather than an RAII guard (see
//!   [`Container::request_scope_async`] for the async form).
//! - **Transient** — a fresh instance on every resolution.
//!
//! ## Error handling
//!
//! Every fallible operation returns [`DiResult<T>`], an alias for
//! `Result<T, DiError>`. `DiError` is a plain enum (no `thiserror`, no
//! `anyhow`) naming exactly the classes of failure the resolver can
//! produce — resolution failure, type mismatch, a detected cycle, and
//! so on.
//!
//! ## Non-goals
//!
//! This crate has no configuration-file loader, no web-framework
//! integration, and no service mesh of its own — application
//! configuration is just another registered value, and an HTTP handler
//! reaches into the container the same way any other caller does.

pub mod config;
pub mod container;
mod context;
mod coordinator;
mod ctor;
pub mod error;
pub mod lifecycle;
pub mod observer;
pub mod registry;
pub mod token;

pub use config::ContainerConfig;
pub use container::{default_container, set_default_container, AnyInstance, Container, ContainerStats, Overrides};
pub use error::{DiError, DiResult};
pub use lifecycle::{AsyncClose, AsyncExit, Capability, SyncClose};
pub use observer::{LoggingObserver, Observers, ResolutionObserver};
pub use token::{Scope, Token, TypeHandle};

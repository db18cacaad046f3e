//! # Waypost Middleware
//!
//! Per-route middleware composition.
//!
//! Routes and groups name their middleware by reference ([`MiddlewareRef`]);
//! the references are collected into a [`MiddlewareSet`] that is merged with
//! every enclosing group while the route tree is flattened, reordered once by
//! the configured priority list, and finally turned into a handler chain with
//! instances resolved per request through a [`waypost_di::Container`].
//!
//! ```rust
//! use waypost_middleware::{MiddlewareRef, MiddlewareSet};
//!
//! // Route declares `middleware: ["audit"]`
//! let mut set = MiddlewareSet::new(["audit"], Vec::<&str>::new());
//! // Enclosing group declares `middleware: ["session", "auth"]`
//! set.merge_with_group(&["session".into(), "auth".into()], &[]);
//! // Settings put `auth` ahead of everything else
//! set.apply_priority(&["auth".into()]);
//!
//! let order: Vec<&str> = set.include().iter().map(MiddlewareRef::name).collect();
//! assert_eq!(order, ["auth", "session", "audit"]);
//! ```

pub mod logging;
pub mod pipeline;
pub mod set;

// Re-export core middleware traits from waypost-http
pub use waypost_http::{Handler, Middleware};

pub use logging::LoggingMiddleware;
pub use pipeline::Pipeline;
pub use set::{MiddlewareRef, MiddlewareSet};

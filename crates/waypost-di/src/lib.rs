//! # Waypost DI
//!
//! The routing core never instantiates middleware, handlers or controllers
//! itself. Route definitions carry *references* (names), and a [`Container`]
//! turns a reference into an invocable instance when a request is dispatched.
//!
//! [`ComponentRegistry`] is the bundled container: components are registered
//! by name with a [`Scope`] deciding whether each resolution builds a fresh
//! instance or reuses one.
//!
//! ```rust
//! use waypost_di::{ComponentRegistry, Container, Scope};
//! use waypost_http::{Handler, Middleware, Request, Response, Result};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Auth;
//!
//! #[async_trait]
//! impl Middleware for Auth {
//!     async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
//!         next.handle(request).await
//!     }
//! }
//!
//! let mut registry = ComponentRegistry::new();
//! registry.register_middleware("auth", Scope::Request, || Arc::new(Auth));
//!
//! assert!(registry.resolve_middleware("auth").is_ok());
//! assert!(registry.resolve_middleware("csrf").is_err());
//! ```

mod registry;

pub use registry::{ComponentRegistry, Scope};

use std::sync::Arc;
use thiserror::Error;
use waypost_http::{Controller, Handler, Middleware};

/// Kind of component a reference was expected to resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
	Handler,
	Middleware,
	Controller,
}

impl std::fmt::Display for ComponentKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let kind = match self {
			ComponentKind::Handler => "handler",
			ComponentKind::Middleware => "middleware",
			ComponentKind::Controller => "controller",
		};
		f.write_str(kind)
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
	#[error("{kind} '{name}' is not registered")]
	NotRegistered { kind: ComponentKind, name: String },
}

impl From<ResolveError> for waypost_http::Error {
	fn from(err: ResolveError) -> Self {
		waypost_http::Error::Resolve(err.to_string())
	}
}

/// Resolves component references to instances.
///
/// Implementations must be safe to call from many concurrent requests.
pub trait Container: Send + Sync {
	fn resolve_handler(&self, name: &str) -> Result<Arc<dyn Handler>, ResolveError>;

	fn resolve_middleware(&self, name: &str) -> Result<Arc<dyn Middleware>, ResolveError>;

	fn resolve_controller(&self, name: &str) -> Result<Arc<dyn Controller>, ResolveError>;
}

impl<C: Container + ?Sized> Container for Arc<C> {
	fn resolve_handler(&self, name: &str) -> Result<Arc<dyn Handler>, ResolveError> {
		(**self).resolve_handler(name)
	}

	fn resolve_middleware(&self, name: &str) -> Result<Arc<dyn Middleware>, ResolveError> {
		(**self).resolve_middleware(name)
	}

	fn resolve_controller(&self, name: &str) -> Result<Arc<dyn Controller>, ResolveError> {
		(**self).resolve_controller(name)
	}
}

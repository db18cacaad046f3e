//! # Waypost
//!
//! Declarative routing core for async request handlers.
//!
//! Waypost resolves a request (method, path, hostname) to a registered
//! handler, extracts and validates path and domain parameters, assembles the
//! middleware chain that runs before the handler, and generates URLs back from
//! route names.
//!
//! ## Crates
//!
//! - [`http`]: request and response values, `Handler` / `Middleware` /
//!   `Controller` capabilities
//! - [`di`]: the container resolving handler, middleware and controller names
//! - [`middleware`]: middleware sets, group merge, priority and pipelines
//! - [`urls`]: templates, routes, groups, the matcher and URL generation
//! - [`dispatch`]: runs a request through router, middleware and handler
//! - [`conf`]: routing settings loaded from TOML
//!
//! ## Quick Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use waypost::prelude::*;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let show = handler_fn(|request: Request| async move {
//!     let id = request.path_param("id").unwrap_or_default().to_string();
//!     Ok(Response::ok().with_body(id))
//! });
//!
//! let router = Router::builder()
//!     .group(
//!         RouteGroup::new()
//!             .prefix("/api")
//!             .name_prefix("api.")
//!             .route(Route::get("/users/{id}", show).name("users.show")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let params = HashMap::from([("id".to_string(), "42".to_string())]);
//! assert_eq!(router.url("api.users.show", &params).unwrap(), "/api/users/42");
//!
//! let dispatcher = Dispatcher::new(Arc::new(router), Arc::new(ComponentRegistry::new()));
//! let request = Request::builder().uri("/api/users/42").build().unwrap();
//! let response = dispatcher.dispatch(request).await.unwrap();
//! assert_eq!(&response.body[..], b"42");
//! # });
//! ```

pub use waypost_conf as conf;
pub use waypost_di as di;
pub use waypost_dispatch as dispatch;
pub use waypost_http as http;
pub use waypost_middleware as middleware;
pub use waypost_urls as urls;

pub use waypost_conf::{RoutingSettings, SettingsError};
pub use waypost_di::{ComponentRegistry, Container, ResolveError, Scope};
pub use waypost_dispatch::{DispatchError, Dispatcher, MatchedRoute};
pub use waypost_http::{
	Controller, Error, Extensions, Handler, Method, Middleware, Request, Response, Result,
	StatusCode, handler_fn,
};
pub use waypost_middleware::{LoggingMiddleware, MiddlewareRef, MiddlewareSet};
pub use waypost_urls::{
	Constraint, HandlerRef, ReverseError, Route, RouteDefinition, RouteError, RouteGroup, Router,
	RouterBuilder,
};

/// Everything needed to declare routes and serve them.
pub mod prelude {
	pub use crate::{
		ComponentRegistry, Constraint, Controller, Dispatcher, Error, Handler, HandlerRef,
		LoggingMiddleware, MatchedRoute, Method, Middleware, Request, Response, Result, Route,
		RouteGroup, Router, RoutingSettings, Scope, StatusCode, handler_fn,
	};

	// External
	pub use async_trait::async_trait;
}

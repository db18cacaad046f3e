//! # Waypost Dispatch
//!
//! Runs one request through the compiled router.
//!
//! ## Architecture
//!
//! ```text
//! Request → Router::lookup → constraints → MiddlewareSet pipeline → handler → status page
//!               ↓ miss
//!              404
//! ```
//!
//! Routing misses, including matches rejected by constraints, become a plain
//! 404 response. Errors raised by middleware or handlers propagate unchanged.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waypost_di::ComponentRegistry;
//! use waypost_dispatch::Dispatcher;
//! use waypost_http::{Request, Response, StatusCode, handler_fn};
//! use waypost_urls::{Route, Router};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let hello = handler_fn(|request: Request| async move {
//!     let id = request.path_param("id").unwrap_or_default().to_string();
//!     Ok(Response::ok().with_body(id))
//! });
//! let router = Router::builder()
//!     .route(Route::get("/users/{id}", hello))
//!     .build()
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(Arc::new(router), Arc::new(ComponentRegistry::new()));
//!
//! let request = Request::builder().uri("/users/42").build().unwrap();
//! let response = dispatcher.dispatch(request).await.unwrap();
//! assert_eq!(&response.body[..], b"42");
//!
//! let request = Request::builder().uri("/posts").build().unwrap();
//! let response = dispatcher.dispatch(request).await.unwrap();
//! assert_eq!(response.status, StatusCode::NOT_FOUND);
//! # });
//! ```

pub mod action;
pub mod dispatcher;

pub use action::ActionHandler;
pub use dispatcher::{Dispatcher, MatchedRoute};

use thiserror::Error;
use waypost_di::ResolveError;

/// Errors that can occur during request dispatching
#[derive(Debug, Error)]
pub enum DispatchError {
	/// A handler, controller or middleware reference of the matched route is
	/// unknown to the container
	#[error("Resolution error: {0}")]
	Resolve(#[from] ResolveError),

	/// A middleware or handler failed
	#[error(transparent)]
	Handler(#[from] waypost_http::Error),
}

impl From<DispatchError> for waypost_http::Error {
	fn from(err: DispatchError) -> Self {
		match err {
			DispatchError::Resolve(err) => err.into(),
			DispatchError::Handler(err) => err,
		}
	}
}

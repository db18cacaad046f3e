//! Handler, middleware and controller capabilities.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::{Request, Response, Result};

/// Handler trait for processing requests.
///
/// This is the single capability every endpoint exposes, whatever shape it
/// was declared with (closure, handler object, controller action).
#[async_trait]
pub trait Handler: Send + Sync {
	/// Handles a request and produces a response.
	///
	/// # Errors
	///
	/// Returns an error if the request cannot be processed. Errors propagate
	/// out of the dispatcher unchanged.
	async fn handle(&self, request: Request) -> Result<Response>;
}

/// Blanket implementation for `Arc<T>` where T: Handler.
#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Middleware trait for request/response processing.
///
/// A middleware either calls `next` (proceeding deeper into the chain) or
/// returns a response directly, short-circuiting everything after it.
#[async_trait]
pub trait Middleware: Send + Sync {
	/// Processes a request through this middleware.
	///
	/// # Arguments
	///
	/// * `request` - The incoming request
	/// * `next` - The continuation: remaining middleware, then the route handler
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;
}

/// Resource controller: one object serving several named actions.
///
/// Routes declared with an action reference call [`Controller::dispatch`]
/// with the action chosen at declaration time.
#[async_trait]
pub trait Controller: Send + Sync {
	async fn dispatch(&self, action: &str, request: Request) -> Result<Response>;
}

/// Adapter turning an async function into a [`Handler`].
pub struct FunctionHandler<F> {
	func: F,
}

impl<F> FunctionHandler<F> {
	pub fn new(func: F) -> Self {
		Self { func }
	}
}

#[async_trait]
impl<F, Fut> Handler for FunctionHandler<F>
where
	F: Fn(Request) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	async fn handle(&self, request: Request) -> Result<Response> {
		(self.func)(request).await
	}
}

/// Wrap an async function as a shared handler.
///
/// # Examples
///
/// ```
/// use waypost_http::{Request, Response, Result, handler_fn};
///
/// async fn index(_request: Request) -> Result<Response> {
///     Ok(Response::ok())
/// }
///
/// let handler = handler_fn(index);
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(func: F) -> Arc<dyn Handler>
where
	F: Fn(Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Response>> + Send + 'static,
{
	Arc::new(FunctionHandler::new(func))
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::{Method, StatusCode};

	struct Echo;

	#[async_trait]
	impl Handler for Echo {
		async fn handle(&self, request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(request.path().to_string()))
		}
	}

	struct Deny;

	#[async_trait]
	impl Middleware for Deny {
		async fn process(&self, _request: Request, _next: Arc<dyn Handler>) -> Result<Response> {
			Ok(Response::new(StatusCode::FORBIDDEN))
		}
	}

	fn request(path: &str) -> Request {
		Request::builder()
			.method(Method::GET)
			.uri(path)
			.build()
			.unwrap()
	}

	#[tokio::test]
	async fn test_arc_handler_delegates() {
		let handler: Arc<dyn Handler> = Arc::new(Echo);
		let response = handler.handle(request("/ping")).await.unwrap();
		assert_eq!(&response.body[..], b"/ping");
	}

	#[tokio::test]
	async fn test_function_handler() {
		let handler = handler_fn(|request: Request| async move {
			Ok(Response::ok().with_body(format!("{}", request.method)))
		});
		let response = handler.handle(request("/")).await.unwrap();
		assert_eq!(&response.body[..], b"GET");
	}

	#[tokio::test]
	async fn test_middleware_can_short_circuit() {
		let next: Arc<dyn Handler> = Arc::new(Echo);
		let response = Deny.process(request("/admin"), next).await.unwrap();
		assert_eq!(response.status, StatusCode::FORBIDDEN);
		assert!(response.body.is_empty());
	}
}

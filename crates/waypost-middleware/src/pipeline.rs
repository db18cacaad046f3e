//! Continuation chain built around a terminal handler.

use async_trait::async_trait;
use std::sync::Arc;
use waypost_http::{Handler, Middleware, Request, Response, Result};

/// Composes middleware instances with a final handler.
///
/// The first middleware added is the outermost: it runs first and receives
/// a continuation covering every middleware added after it, with the final
/// handler innermost.
pub struct Pipeline {
	handler: Arc<dyn Handler>,
	middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			middlewares: Vec::new(),
		}
	}

	pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
		self.middlewares.push(middleware);
	}

	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	pub fn len(&self) -> usize {
		self.middlewares.len()
	}

	pub fn is_empty(&self) -> bool {
		self.middlewares.is_empty()
	}

	/// Fold the middleware right-to-left into a single handler.
	pub fn build(self) -> Arc<dyn Handler> {
		let mut handler = self.handler;

		for middleware in self.middlewares.into_iter().rev() {
			handler = Arc::new(Next {
				middleware,
				next: handler,
			});
		}

		handler
	}
}

/// One link of the chain: a middleware and its continuation.
struct Next {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for Next {
	async fn handle(&self, request: Request) -> Result<Response> {
		self.middleware
			.process(request, Arc::clone(&self.next))
			.await
	}
}

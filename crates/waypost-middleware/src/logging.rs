use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use waypost_http::{Handler, Middleware, Request, Response, Result};

/// Logging middleware
/// Emits one `tracing` event per request with method, path, status and duration
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Middleware for LoggingMiddleware {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let start = Instant::now();
		let method = request.method.clone();
		let path = request.path().to_string();

		let result = next.handle(request).await;
		let elapsed_ms = start.elapsed().as_millis() as u64;

		match &result {
			Ok(response) => {
				tracing::info!(
					%method,
					%path,
					status = response.status.as_u16(),
					elapsed_ms,
					"request completed"
				);
			}
			Err(err) => {
				tracing::warn!(%method, %path, error = %err, elapsed_ms, "request failed");
			}
		}

		result
	}
}

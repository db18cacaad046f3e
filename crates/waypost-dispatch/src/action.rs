use async_trait::async_trait;
use std::sync::Arc;
use waypost_http::{Controller, Handler, Request, Response, Result};

/// Adapts one action of a resource controller to [`Handler`].
pub struct ActionHandler {
	controller: Arc<dyn Controller>,
	action: String,
}

impl ActionHandler {
	pub fn new(controller: Arc<dyn Controller>, action: impl Into<String>) -> Self {
		Self {
			controller,
			action: action.into(),
		}
	}

	pub fn action(&self) -> &str {
		&self.action
	}
}

#[async_trait]
impl Handler for ActionHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		self.controller.dispatch(&self.action, request).await
	}
}

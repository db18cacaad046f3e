//! Request dispatcher.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};
use std::collections::HashMap;
use std::sync::Arc;
use waypost_di::Container;
use waypost_http::{Extensions, Handler, Request, Response};
use waypost_middleware::MiddlewareSet;
use waypost_urls::{HandlerRef, RouteDefinition, Router};

use crate::{ActionHandler, DispatchError};

/// The route a request matched, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
	pub name: Option<String>,
	/// Path template, e.g. `/users/{id}`
	pub pattern: String,
	pub domain: Option<String>,
}

impl MatchedRoute {
	fn of(route: &RouteDefinition) -> Self {
		Self {
			name: route.name().map(str::to_string),
			pattern: route.path().to_string(),
			domain: route.domain().map(|domain| domain.to_string()),
		}
	}
}

/// Dispatches requests against a compiled [`Router`].
///
/// Holds no per-request state; one dispatcher serves any number of
/// concurrent requests.
#[derive(Clone)]
pub struct Dispatcher {
	router: Arc<Router>,
	container: Arc<dyn Container>,
}

impl Dispatcher {
	pub fn new(router: Arc<Router>, container: Arc<dyn Container>) -> Self {
		Self { router, container }
	}

	pub fn router(&self) -> &Arc<Router> {
		&self.router
	}

	/// Match, run the middleware chain and the handler, then apply the
	/// route's status pages.
	///
	/// # Errors
	///
	/// Fails when a reference of the matched route cannot be resolved, or
	/// when a middleware or handler returns an error.
	pub async fn dispatch(&self, mut request: Request) -> Result<Response, DispatchError> {
		let found = self
			.router
			.lookup(&request.method, request.path(), request.host());
		let Some(found) = found else {
			tracing::debug!(method = %request.method, path = request.path(), "no route");
			return Ok(Response::not_found());
		};
		let route = found.route;

		request.extensions.insert(MatchedRoute::of(&route));
		request.set_path_params(found.params);

		let handler = self.resolve(route.handler())?;
		let chain = self.chain(route.middleware().map(|set| &**set), handler)?;

		let snapshot = (!route.status_pages().is_empty()).then(|| Snapshot::of(&request));
		let response = chain.handle(request).await?;

		match snapshot {
			Some(snapshot) => self.apply_status_page(&route, snapshot, response).await,
			None => Ok(response),
		}
	}

	fn resolve(&self, handler: &HandlerRef) -> Result<Arc<dyn Handler>, DispatchError> {
		let resolved: Arc<dyn Handler> = match handler {
			HandlerRef::Instance(instance) => Arc::clone(instance),
			HandlerRef::Component(name) => self.container.resolve_handler(name)?,
			HandlerRef::Action { controller, action } => Arc::new(ActionHandler::new(
				self.container.resolve_controller(controller)?,
				action.clone(),
			)),
		};
		Ok(resolved)
	}

	fn chain(
		&self,
		middleware: Option<&MiddlewareSet>,
		handler: Arc<dyn Handler>,
	) -> Result<Arc<dyn Handler>, DispatchError> {
		match middleware {
			Some(set) if !set.is_empty() => {
				Ok(set.build_pipeline(&*self.container, handler)?)
			}
			_ => Ok(handler),
		}
	}

	/// Replace `response` with the route's page for its status, keeping the
	/// original status code.
	async fn apply_status_page(
		&self,
		route: &RouteDefinition,
		snapshot: Snapshot,
		response: Response,
	) -> Result<Response, DispatchError> {
		let status = response.status;
		let Some(page) = route.status_pages().find(status.as_u16()) else {
			return Ok(response);
		};
		tracing::debug!(status = status.as_u16(), page = ?page, "rendering status page");

		let page = self.resolve(page)?;
		let rendered = page.handle(snapshot.into_request()).await?;
		Ok(rendered.with_status(status))
	}
}

#[async_trait]
impl Handler for Dispatcher {
	async fn handle(&self, request: Request) -> waypost_http::Result<Response> {
		self.dispatch(request).await.map_err(Into::into)
	}
}

/// Request data kept to rebuild a body-less request for a status page.
struct Snapshot {
	method: Method,
	uri: Uri,
	version: Version,
	headers: HeaderMap,
	path_params: HashMap<String, String>,
	extensions: Extensions,
}

impl Snapshot {
	fn of(request: &Request) -> Self {
		Self {
			method: request.method.clone(),
			uri: request.uri.clone(),
			version: request.version,
			headers: request.headers.clone(),
			path_params: request.path_params.clone(),
			extensions: request.extensions.clone(),
		}
	}

	fn into_request(self) -> Request {
		let mut request = Request::new(
			self.method,
			self.uri,
			self.version,
			self.headers,
			Bytes::new(),
		);
		request.path_params = self.path_params;
		request.extensions = self.extensions;
		request
	}
}

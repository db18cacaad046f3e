//! Compiled router: the build step and the request-time lookup.

use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use waypost_conf::RoutingSettings;
use waypost_middleware::MiddlewareRef;

use crate::RouteError;
use crate::matcher::RouteMatcher;
use crate::reverse::{ReverseError, UrlReverser};
use crate::route::{Route, RouteDefinition};
use crate::route_group::{Composer, RouteEntry, RouteGroup};

/// Collects route declarations until [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RouterBuilder {
	root: RouteGroup,
	settings: RoutingSettings,
}

impl RouterBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_settings(mut self, settings: RoutingSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn route(mut self, route: Route) -> Self {
		self.root.push(RouteEntry::Route(route));
		self
	}

	pub fn group(mut self, group: RouteGroup) -> Self {
		self.root.push(RouteEntry::Group(group));
		self
	}

	/// See [`Route::resource`].
	pub fn resource(mut self, name: &str, controller: &str) -> Self {
		for route in Route::resource(name, controller) {
			self.root.push(RouteEntry::Route(route));
		}
		self
	}

	/// Validate and compile every declaration.
	///
	/// Fails on the first configuration error; no partially built router is
	/// ever returned.
	pub fn build(self) -> Result<Router, RouteError> {
		let priority: Vec<MiddlewareRef> = self
			.settings
			.middleware_priority
			.iter()
			.map(|name| MiddlewareRef::from(name.as_str()))
			.collect();

		let definitions = Composer::default().compose(self.root, &priority)?;

		let mut matcher = RouteMatcher::default();
		let mut reverser = UrlReverser::new();
		let mut routes = Vec::with_capacity(definitions.len());

		for (index, definition) in definitions.into_iter().enumerate() {
			tracing::debug!(
				methods = ?definition.methods(),
				pattern = %definition.path(),
				domain = definition.domain().map(|d| d.as_str()),
				name = definition.name(),
				"compiled route"
			);
			matcher.insert(index, &definition);
			let definition = Arc::new(definition);
			reverser.register(Arc::clone(&definition));
			routes.push(definition);
		}

		Ok(Router {
			routes,
			matcher,
			reverser,
			strip_host_port: self.settings.strip_host_port,
		})
	}
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
	pub route: Arc<RouteDefinition>,
	/// Domain and path parameters, percent-decoded
	pub params: HashMap<String, String>,
}

/// Immutable after [`RouterBuilder::build`]; lookups take `&self` and can run
/// from any number of threads.
#[derive(Debug)]
pub struct Router {
	routes: Vec<Arc<RouteDefinition>>,
	matcher: RouteMatcher,
	reverser: UrlReverser,
	strip_host_port: bool,
}

impl Router {
	pub fn builder() -> RouterBuilder {
		RouterBuilder::new()
	}

	/// Find the route for a request.
	///
	/// Constraints run after the structural match. A rejected match is a
	/// miss; lower-precedence candidates are not tried.
	pub fn lookup(&self, method: &Method, path: &str, host: Option<&str>) -> Option<RouteMatch> {
		let host = host.and_then(|host| normalize_host(host, self.strip_host_port));

		let Some(found) = self.matcher.lookup(method, path, host.as_deref()) else {
			tracing::trace!(%method, path, host = host.as_deref(), "no route matched");
			return None;
		};
		let route = self.routes.get(found.route)?;

		if let Err(violation) = route.constraints().check(&found.params) {
			tracing::trace!(
				%method,
				path,
				pattern = %route.path(),
				?violation,
				"route rejected by parameter constraints"
			);
			return None;
		}

		if found.fallback {
			tracing::trace!(path, host = host.as_deref(), "matched a domain-agnostic route");
		}
		Some(RouteMatch {
			route: Arc::clone(route),
			params: found.params,
		})
	}

	/// Every compiled route, in declaration order.
	pub fn routes(&self) -> &[Arc<RouteDefinition>] {
		&self.routes
	}

	pub fn has_route(&self, name: &str) -> bool {
		self.reverser.has_route(name)
	}

	pub fn route(&self, name: &str) -> Option<&Arc<RouteDefinition>> {
		self.reverser.get(name)
	}

	/// See [`UrlReverser::reverse`].
	pub fn url(&self, name: &str, params: &HashMap<String, String>) -> Result<String, ReverseError> {
		self.reverser.reverse(name, params)
	}

	/// See [`UrlReverser::reverse_with_query`].
	pub fn url_with_query<K, V>(
		&self,
		name: &str,
		params: &HashMap<String, String>,
		query: &[(K, V)],
	) -> Result<String, ReverseError>
	where
		K: AsRef<str>,
		V: AsRef<str>,
	{
		self.reverser.reverse_with_query(name, params, query)
	}

	pub fn reverser(&self) -> &UrlReverser {
		&self.reverser
	}
}

/// Lower-case `host`, drop a trailing root dot and optionally the port.
/// An empty result means no host.
fn normalize_host(host: &str, strip_port: bool) -> Option<String> {
	let mut host = host.trim();
	if strip_port {
		host = if let Some(rest) = host.strip_prefix('[') {
			// IPv6 literal
			match rest.find(']') {
				Some(end) => &host[..end + 2],
				None => host,
			}
		} else {
			match host.rsplit_once(':') {
				Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
				_ => host,
			}
		};
	}
	let host = host.strip_suffix('.').unwrap_or(host);
	(!host.is_empty()).then(|| host.to_ascii_lowercase())
}

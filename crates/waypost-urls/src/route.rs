use http::Method;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;
use waypost_http::Handler;
use waypost_middleware::{MiddlewareRef, MiddlewareSet};

use crate::constraint::{Constraint, RouteConstraints};
use crate::pattern::{DomainPattern, PathPattern};

/// What a route invokes once its middleware chain has run.
///
/// The variant is fixed when the route is declared; the dispatcher never
/// inspects the handler's shape per request.
#[derive(Clone)]
pub enum HandlerRef {
	/// A handler object or wrapped function, shared by all requests
	Instance(Arc<dyn Handler>),
	/// A handler registered by name in the container
	Component(String),
	/// One action of a resource controller registered by name
	Action { controller: String, action: String },
}

impl HandlerRef {
	pub fn component(name: impl Into<String>) -> Self {
		HandlerRef::Component(name.into())
	}

	pub fn action(controller: impl Into<String>, action: impl Into<String>) -> Self {
		HandlerRef::Action {
			controller: controller.into(),
			action: action.into(),
		}
	}
}

impl From<Arc<dyn Handler>> for HandlerRef {
	fn from(handler: Arc<dyn Handler>) -> Self {
		HandlerRef::Instance(handler)
	}
}

/// A bare name refers to a handler registered in the container.
impl From<&str> for HandlerRef {
	fn from(name: &str) -> Self {
		HandlerRef::Component(name.to_string())
	}
}

impl fmt::Debug for HandlerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HandlerRef::Instance(_) => f.write_str("Instance(..)"),
			HandlerRef::Component(name) => f.debug_tuple("Component").field(name).finish(),
			HandlerRef::Action { controller, action } => f
				.debug_struct("Action")
				.field("controller", controller)
				.field("action", action)
				.finish(),
		}
	}
}

/// Key of a status page: one status code or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusKey {
	Exact(u16),
	Range(u16, u16),
}

impl StatusKey {
	pub fn matches(&self, status: u16) -> bool {
		match *self {
			StatusKey::Exact(code) => code == status,
			StatusKey::Range(low, high) => (low..=high).contains(&status),
		}
	}
}

impl From<u16> for StatusKey {
	fn from(code: u16) -> Self {
		StatusKey::Exact(code)
	}
}

impl From<RangeInclusive<u16>> for StatusKey {
	fn from(range: RangeInclusive<u16>) -> Self {
		StatusKey::Range(*range.start(), *range.end())
	}
}

/// Parses `"404"` or `"500..599"`.
impl FromStr for StatusKey {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		let parse = |code: &str| {
			code.trim()
				.parse::<u16>()
				.map_err(|_| format!("invalid status key '{}'", value))
		};
		match value.split_once("..") {
			Some((low, high)) => {
				let (low, high) = (parse(low)?, parse(high)?);
				if low > high {
					return Err(format!("invalid status key '{}'", value));
				}
				Ok(StatusKey::Range(low, high))
			}
			None => Ok(StatusKey::Exact(parse(value)?)),
		}
	}
}

impl fmt::Display for StatusKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StatusKey::Exact(code) => write!(f, "{}", code),
			StatusKey::Range(low, high) => write!(f, "{}..{}", low, high),
		}
	}
}

/// Status code to replacement-page handler.
#[derive(Debug, Clone, Default)]
pub struct StatusPages {
	pages: BTreeMap<StatusKey, HandlerRef>,
}

impl StatusPages {
	pub fn is_empty(&self) -> bool {
		self.pages.is_empty()
	}

	pub fn len(&self) -> usize {
		self.pages.len()
	}

	/// Page for `status`. An exact key wins over ranges, and the narrowest
	/// matching range wins over wider ones.
	pub fn find(&self, status: u16) -> Option<&HandlerRef> {
		if let Some(page) = self.pages.get(&StatusKey::Exact(status)) {
			return Some(page);
		}
		self.pages
			.iter()
			.filter_map(|(key, page)| match *key {
				StatusKey::Range(low, high) if key.matches(status) => Some((high - low, page)),
				_ => None,
			})
			.min_by_key(|(width, _)| *width)
			.map(|(_, page)| page)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&StatusKey, &HandlerRef)> {
		self.pages.iter()
	}
}

impl FromIterator<(StatusKey, HandlerRef)> for StatusPages {
	fn from_iter<I: IntoIterator<Item = (StatusKey, HandlerRef)>>(iter: I) -> Self {
		Self {
			pages: iter.into_iter().collect(),
		}
	}
}

/// Route declaration.
///
/// Declarations only record options; templates are validated and compiled
/// when the router is built.
///
/// # Examples
///
/// ```
/// use waypost_urls::{Constraint, HandlerRef, Route};
///
/// let route = Route::get("/users/{id}", HandlerRef::component("users.show"))
///     .name("users.show")
///     .middleware("auth")
///     .format("id", Constraint::numeric());
///
/// assert_eq!(route.path(), "/users/{id}");
/// assert_eq!(route.route_name(), Some("users.show"));
/// ```
#[derive(Debug, Clone)]
pub struct Route {
	pub(crate) methods: Vec<Method>,
	pub(crate) path: String,
	pub(crate) handler: HandlerRef,
	pub(crate) name: Option<String>,
	pub(crate) domain: Option<String>,
	pub(crate) middleware: Vec<MiddlewareRef>,
	pub(crate) without_middleware: Vec<MiddlewareRef>,
	pub(crate) format: BTreeMap<String, Constraint>,
	pub(crate) parameter_patterns: BTreeMap<String, Constraint>,
	pub(crate) meta: Map<String, Value>,
	pub(crate) status_pages: Vec<(StatusKey, HandlerRef)>,
}

impl Route {
	pub fn new<M>(methods: M, path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self
	where
		M: IntoIterator<Item = Method>,
	{
		let mut unique: Vec<Method> = Vec::new();
		for method in methods {
			if !unique.contains(&method) {
				unique.push(method);
			}
		}
		Self {
			methods: unique,
			path: path.into(),
			handler: handler.into(),
			name: None,
			domain: None,
			middleware: Vec::new(),
			without_middleware: Vec::new(),
			format: BTreeMap::new(),
			parameter_patterns: BTreeMap::new(),
			meta: Map::new(),
			status_pages: Vec::new(),
		}
	}

	pub fn get(path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
		Self::new([Method::GET], path, handler)
	}

	pub fn post(path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
		Self::new([Method::POST], path, handler)
	}

	pub fn put(path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
		Self::new([Method::PUT], path, handler)
	}

	pub fn patch(path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
		Self::new([Method::PATCH], path, handler)
	}

	pub fn delete(path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
		Self::new([Method::DELETE], path, handler)
	}

	/// Route answering every standard method.
	pub fn any(path: impl Into<String>, handler: impl Into<HandlerRef>) -> Self {
		Self::new(
			[
				Method::GET,
				Method::HEAD,
				Method::POST,
				Method::PUT,
				Method::PATCH,
				Method::DELETE,
				Method::OPTIONS,
			],
			path,
			handler,
		)
	}

	/// The seven conventional routes of a resource controller, named
	/// `<name>.<action>`:
	///
	/// | Method | Path | Action |
	/// |---|---|---|
	/// | GET | `/<name>` | index |
	/// | GET | `/<name>/create` | create |
	/// | POST | `/<name>` | store |
	/// | GET | `/<name>/{id}` | show |
	/// | GET | `/<name>/{id}/edit` | edit |
	/// | PUT, PATCH | `/<name>/{id}` | update |
	/// | DELETE | `/<name>/{id}` | destroy |
	pub fn resource(name: &str, controller: &str) -> Vec<Route> {
		let base = format!("/{}", name.trim_matches('/'));
		let member = format!("{}/{{id}}", base);
		let action = |methods: Vec<Method>, path: &str, action: &str| {
			Route::new(methods, path, HandlerRef::action(controller, action))
				.name(format!("{}.{}", name, action))
		};
		vec![
			action(vec![Method::GET], &base, "index"),
			action(vec![Method::GET], &format!("{}/create", base), "create"),
			action(vec![Method::POST], &base, "store"),
			action(vec![Method::GET], &member, "show"),
			action(vec![Method::GET], &format!("{}/edit", member), "edit"),
			action(vec![Method::PUT, Method::PATCH], &member, "update"),
			action(vec![Method::DELETE], &member, "destroy"),
		]
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());
		self
	}

	/// Add a middleware after those already listed
	pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
		self.middleware.push(middleware.into());
		self
	}

	/// Exclude a middleware inherited from an enclosing group
	pub fn without_middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
		self.without_middleware.push(middleware.into());
		self
	}

	/// Require `param` to be captured and to satisfy `constraint`.
	pub fn format(mut self, param: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
		self.format.insert(param.into(), constraint.into());
		self
	}

	/// Validate `param` with `constraint` only when this route captures it.
	pub fn parameter_pattern(
		mut self,
		param: impl Into<String>,
		constraint: impl Into<Constraint>,
	) -> Self {
		self.parameter_patterns
			.insert(param.into(), constraint.into());
		self
	}

	pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}

	/// Replace responses with status `code` by the page `handler` renders.
	pub fn status_page(mut self, code: u16, handler: impl Into<HandlerRef>) -> Self {
		self.status_pages
			.push((StatusKey::Exact(code), handler.into()));
		self
	}

	pub fn status_page_range(
		mut self,
		codes: RangeInclusive<u16>,
		handler: impl Into<HandlerRef>,
	) -> Self {
		self.status_pages.push((codes.into(), handler.into()));
		self
	}

	pub fn methods(&self) -> &[Method] {
		&self.methods
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn route_name(&self) -> Option<&str> {
		self.name.as_deref()
	}
}

/// A fully composed route: group options applied, templates compiled.
///
/// Immutable once the router is built.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
	pub(crate) methods: Vec<Method>,
	pub(crate) path: PathPattern,
	pub(crate) domain: Option<DomainPattern>,
	pub(crate) handler: HandlerRef,
	pub(crate) name: Option<String>,
	pub(crate) middleware: Option<Arc<MiddlewareSet>>,
	pub(crate) constraints: RouteConstraints,
	pub(crate) meta: Map<String, Value>,
	pub(crate) status_pages: StatusPages,
}

impl RouteDefinition {
	pub fn methods(&self) -> &[Method] {
		&self.methods
	}

	pub fn path(&self) -> &PathPattern {
		&self.path
	}

	pub fn domain(&self) -> Option<&DomainPattern> {
		self.domain.as_ref()
	}

	pub fn handler(&self) -> &HandlerRef {
		&self.handler
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// `None` when neither the route nor any enclosing group declared
	/// middleware options.
	pub fn middleware(&self) -> Option<&Arc<MiddlewareSet>> {
		self.middleware.as_ref()
	}

	pub fn constraints(&self) -> &RouteConstraints {
		&self.constraints
	}

	pub fn meta(&self) -> &Map<String, Value> {
		&self.meta
	}

	pub fn status_pages(&self) -> &StatusPages {
		&self.status_pages
	}

	/// Parameter names, domain first, in capture order.
	pub fn param_names(&self) -> Vec<&str> {
		let mut names = self
			.domain
			.as_ref()
			.map(DomainPattern::param_names)
			.unwrap_or_default();
		names.extend(self.path.param_names());
		names
	}
}

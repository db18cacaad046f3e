//! Route groups and their composition into flat route definitions.
//!
//! Groups nest arbitrarily deep. Composition walks the tree once, innermost
//! group first, and applies each group's options to every route below it:
//!
//! - prefix and name prefix are prepended
//! - a group domain is inherited by routes without one; a different domain on
//!   a descendant is a configuration error
//! - constraints, metadata and status pages are unioned, the descendant's
//!   entry winning on collision
//! - middleware is merged with [`MiddlewareSet::merge_with_group`]

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::Arc;
use waypost_middleware::{MiddlewareRef, MiddlewareSet};

use crate::RouteError;
use crate::constraint::{Constraint, RouteConstraints};
use crate::pattern::{DomainPattern, PathPattern, join_prefix};
use crate::route::{HandlerRef, Route, RouteDefinition, StatusKey};

/// A child of a group
#[derive(Debug, Clone)]
pub enum RouteEntry {
	Route(Route),
	Group(RouteGroup),
}

impl From<Route> for RouteEntry {
	fn from(route: Route) -> Self {
		RouteEntry::Route(route)
	}
}

impl From<RouteGroup> for RouteEntry {
	fn from(group: RouteGroup) -> Self {
		RouteEntry::Group(group)
	}
}

/// Route group
///
/// Applies shared options to every route and group it contains.
///
/// # Examples
///
/// ```
/// use waypost_urls::{Route, RouteGroup};
///
/// let group = RouteGroup::new()
///     .prefix("/api/v1")
///     .name_prefix("api.")
///     .middleware("auth")
///     .route(Route::get("/users", "users.index").name("users.index"))
///     .group(
///         RouteGroup::new()
///             .prefix("/admin")
///             .without_middleware("auth")
///             .route(Route::get("/stats", "admin.stats")),
///     );
///
/// assert_eq!(group.entries().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteGroup {
	prefix: Option<String>,
	name_prefix: Option<String>,
	domain: Option<String>,
	middleware: Vec<MiddlewareRef>,
	without_middleware: Vec<MiddlewareRef>,
	format: BTreeMap<String, Constraint>,
	parameter_patterns: BTreeMap<String, Constraint>,
	meta: Map<String, Value>,
	status_pages: BTreeMap<StatusKey, HandlerRef>,
	entries: Vec<RouteEntry>,
}

impl RouteGroup {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	/// Prepended to the names of named routes only
	pub fn name_prefix(mut self, name_prefix: impl Into<String>) -> Self {
		self.name_prefix = Some(name_prefix.into());
		self
	}

	pub fn domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());
		self
	}

	pub fn middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
		self.middleware.push(middleware.into());
		self
	}

	pub fn without_middleware(mut self, middleware: impl Into<MiddlewareRef>) -> Self {
		self.without_middleware.push(middleware.into());
		self
	}

	/// Required constraint for every descendant route.
	pub fn format(mut self, param: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
		self.format.insert(param.into(), constraint.into());
		self
	}

	/// Constraint applied to any descendant route that captures `param`.
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

	pub fn status_page(mut self, code: u16, handler: impl Into<HandlerRef>) -> Self {
		self.status_pages
			.insert(StatusKey::Exact(code), handler.into());
		self
	}

	pub fn status_page_range(
		mut self,
		codes: RangeInclusive<u16>,
		handler: impl Into<HandlerRef>,
	) -> Self {
		self.status_pages.insert(codes.into(), handler.into());
		self
	}

	pub fn route(mut self, route: Route) -> Self {
		self.entries.push(RouteEntry::Route(route));
		self
	}

	pub fn group(mut self, group: RouteGroup) -> Self {
		self.entries.push(RouteEntry::Group(group));
		self
	}

	pub fn routes<I>(mut self, entries: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<RouteEntry>,
	{
		self.entries.extend(entries.into_iter().map(Into::into));
		self
	}

	/// Add the conventional routes of a resource controller.
	/// See [`Route::resource`].
	pub fn resource(self, name: &str, controller: &str) -> Self {
		self.routes(Route::resource(name, controller))
	}

	pub fn entries(&self) -> &[RouteEntry] {
		&self.entries
	}

	pub(crate) fn push(&mut self, entry: RouteEntry) {
		self.entries.push(entry);
	}
}

type SetId = usize;
type GroupId = usize;

/// A route with group options applied so far, templates still as text.
struct PendingRoute {
	methods: Vec<http::Method>,
	path: String,
	domain: Option<String>,
	handler: HandlerRef,
	name: Option<String>,
	middleware: Option<SetId>,
	format: BTreeMap<String, Constraint>,
	parameter_patterns: BTreeMap<String, Constraint>,
	meta: Map<String, Value>,
	status_pages: BTreeMap<StatusKey, HandlerRef>,
}

impl PendingRoute {
	fn describe(&self) -> String {
		match &self.name {
			Some(name) => format!("'{}'", name),
			None => format!("'{}'", self.path),
		}
	}

	fn compile(self, sets: &[Arc<MiddlewareSet>]) -> Result<RouteDefinition, RouteError> {
		if self.methods.is_empty() {
			return Err(RouteError::NoMethods(self.describe()));
		}

		let path = PathPattern::parse(&self.path).map_err(|source| RouteError::Pattern {
			template: self.path.clone(),
			source,
		})?;

		let domain = match &self.domain {
			Some(template) => Some(DomainPattern::parse(template).map_err(|source| {
				RouteError::Pattern {
					template: template.clone(),
					source,
				}
			})?),
			None => None,
		};

		if let Some(domain) = &domain {
			let domain_params = domain.param_names();
			if let Some(param) = path
				.param_names()
				.into_iter()
				.find(|name| domain_params.contains(name))
			{
				return Err(RouteError::DuplicateParameter {
					route: self.describe(),
					param: param.to_string(),
				});
			}
		}

		let constraints = RouteConstraints::compile(&self.format, &self.parameter_patterns)
			.map_err(|(param, err)| RouteError::InvalidConstraint {
				route: self.describe(),
				param,
				message: err.to_string(),
			})?;

		let middleware = self.middleware.and_then(|id| sets.get(id)).cloned();

		Ok(RouteDefinition {
			methods: self.methods,
			path,
			domain,
			handler: self.handler,
			name: self.name,
			middleware,
			constraints,
			meta: self.meta,
			status_pages: self.status_pages.into_iter().collect(),
		})
	}
}

/// Flattens a group tree into route definitions.
///
/// Middleware sets live in an arena addressed by [`SetId`]. Sibling routes
/// without middleware options of their own share the set created by the
/// first group that declares middleware above them, and every set is merged
/// with a given group at most once, tracked by `(set, group)` keys.
#[derive(Default)]
pub(crate) struct Composer {
	sets: Vec<MiddlewareSet>,
	merged: HashSet<(SetId, GroupId)>,
	next_group: GroupId,
}

impl Composer {
	/// Compose `root` and apply `priority` once to every distinct middleware
	/// set.
	pub(crate) fn compose(
		mut self,
		root: RouteGroup,
		priority: &[MiddlewareRef],
	) -> Result<Vec<RouteDefinition>, RouteError> {
		let pending = self.flatten(root)?;

		let sets: Vec<Arc<MiddlewareSet>> = self
			.sets
			.into_iter()
			.map(|mut set| {
				set.apply_priority(priority);
				Arc::new(set)
			})
			.collect();

		pending
			.into_iter()
			.map(|route| route.compile(&sets))
			.collect()
	}

	fn flatten(&mut self, mut group: RouteGroup) -> Result<Vec<PendingRoute>, RouteError> {
		let group_id = self.next_group;
		self.next_group += 1;

		if let Some(prefix) = &group.prefix {
			PathPattern::validate_prefix(prefix).map_err(|source| RouteError::Pattern {
				template: prefix.clone(),
				source,
			})?;
		}

		let mut pending = Vec::new();
		for entry in std::mem::take(&mut group.entries) {
			match entry {
				RouteEntry::Route(route) => pending.push(self.declare(route)),
				RouteEntry::Group(child) => pending.extend(self.flatten(child)?),
			}
		}

		let mut shared: Option<SetId> = None;
		for route in &mut pending {
			self.apply(group_id, &group, route, &mut shared)?;
		}
		Ok(pending)
	}

	fn declare(&mut self, route: Route) -> PendingRoute {
		let middleware = if route.middleware.is_empty() && route.without_middleware.is_empty() {
			None
		} else {
			self.sets
				.push(MiddlewareSet::new(route.middleware, route.without_middleware));
			Some(self.sets.len() - 1)
		};

		PendingRoute {
			methods: route.methods,
			path: route.path,
			domain: route.domain,
			handler: route.handler,
			name: route.name,
			middleware,
			format: route.format,
			parameter_patterns: route.parameter_patterns,
			meta: route.meta,
			status_pages: route.status_pages.into_iter().collect(),
		}
	}

	fn apply(
		&mut self,
		group_id: GroupId,
		group: &RouteGroup,
		route: &mut PendingRoute,
		shared: &mut Option<SetId>,
	) -> Result<(), RouteError> {
		if let Some(prefix) = &group.prefix {
			route.path = join_prefix(prefix, &route.path);
		}

		if let Some(name_prefix) = &group.name_prefix
			&& let Some(name) = &mut route.name
		{
			name.insert_str(0, name_prefix);
		}

		if let Some(group_domain) = &group.domain {
			match &route.domain {
				None => route.domain = Some(group_domain.clone()),
				Some(own) if DomainPattern::same_domain(own, group_domain) => {}
				Some(own) => {
					return Err(RouteError::DomainConflict {
						route: route.describe(),
						route_domain: own.clone(),
						group_domain: group_domain.clone(),
					});
				}
			}
		}

		for (param, constraint) in &group.format {
			route
				.format
				.entry(param.clone())
				.or_insert_with(|| constraint.clone());
		}
		for (param, constraint) in &group.parameter_patterns {
			route
				.parameter_patterns
				.entry(param.clone())
				.or_insert_with(|| constraint.clone());
		}
		for (key, value) in &group.meta {
			if !route.meta.contains_key(key) {
				route.meta.insert(key.clone(), value.clone());
			}
		}
		for (key, page) in &group.status_pages {
			route
				.status_pages
				.entry(*key)
				.or_insert_with(|| page.clone());
		}

		if group.middleware.is_empty() && group.without_middleware.is_empty() {
			return Ok(());
		}
		let id = match route.middleware {
			Some(id) => id,
			None => *shared.get_or_insert_with(|| {
				self.sets.push(MiddlewareSet::default());
				self.sets.len() - 1
			}),
		};
		route.middleware = Some(id);
		if self.merged.insert((id, group_id))
			&& let Some(set) = self.sets.get_mut(id)
		{
			set.merge_with_group(&group.middleware, &group.without_middleware);
		}
		Ok(())
	}
}

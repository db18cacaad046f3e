//! # Waypost URLs
//!
//! Route declaration, compilation, matching and URL generation.
//!
//! Routes and groups are declared with infallible builders and compiled in
//! one pass by [`RouterBuilder::build`]. Compilation validates every path and
//! domain template, flattens nested groups into [`RouteDefinition`]s, merges
//! middleware, then fills a method-keyed segment trie and a name index.
//!
//! ## Template syntax
//!
//! - `/users/{id}` whole-segment parameter
//! - `/files/{...path}` trailing wildcard, one or more segments
//! - `/pkg/@{scope}`, `/{name}.{ext}` mixed segments
//! - `{tenant}.example.com` domain templates, same rules without wildcards
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use waypost_urls::{Constraint, Route, RouteGroup, Router};
//!
//! let router = Router::builder()
//!     .group(
//!         RouteGroup::new()
//!             .prefix("/api")
//!             .name_prefix("api.")
//!             .route(Route::get("/users/{id}", "users.show").name("users.show")),
//!     )
//!     .route(Route::get("/user/{id}", "user").format("id", Constraint::numeric()))
//!     .build()
//!     .unwrap();
//!
//! let found = router.lookup(&http::Method::GET, "/api/users/42", None).unwrap();
//! assert_eq!(found.params["id"], "42");
//! assert!(router.lookup(&http::Method::GET, "/user/abc", None).is_none());
//!
//! let params = HashMap::from([("id".to_string(), "a/b".to_string())]);
//! assert_eq!(router.url("api.users.show", &params).unwrap(), "/api/users/a%2Fb");
//! ```

pub mod constraint;
mod matcher;
pub mod pattern;
pub mod reverse;
pub mod route;
pub mod route_group;
pub mod router;

pub use constraint::{BuiltinFormat, Constraint, ConstraintViolation, Predicate, RouteConstraints};
pub use pattern::{DomainPattern, Part, PathPattern, PatternError, Segment, SegmentKind};
pub use reverse::{ReverseError, UrlReverser};
pub use route::{HandlerRef, Route, RouteDefinition, StatusKey, StatusPages};
pub use route_group::{RouteEntry, RouteGroup};
pub use router::{RouteMatch, Router, RouterBuilder};

use thiserror::Error;

/// Configuration errors raised while compiling the route tree.
///
/// Every variant is fatal: a router is either built from a fully valid
/// declaration or not at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouteError {
	#[error("invalid template '{template}': {source}")]
	Pattern {
		template: String,
		#[source]
		source: PatternError,
	},

	#[error(
		"route {route} declares domain '{route_domain}' inside a group bound to '{group_domain}'"
	)]
	DomainConflict {
		route: String,
		route_domain: String,
		group_domain: String,
	},

	#[error("route {route} captures parameter '{param}' in both its domain and its path")]
	DuplicateParameter { route: String, param: String },

	#[error("route {route} has an invalid constraint on '{param}': {message}")]
	InvalidConstraint {
		route: String,
		param: String,
		message: String,
	},

	#[error("route {0} accepts no HTTP methods")]
	NoMethods(String),
}

//! Reverse routing: route name + parameters → URL.

use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::pattern::{Part, Segment};
use crate::route::RouteDefinition;

/// Everything except RFC 3986 unreserved characters is encoded, so a
/// substituted value can never introduce a separator.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'.')
	.remove(b'_')
	.remove(b'~');

/// Characters escaped in template literals: decoded literals may hold
/// separators or non-ASCII text that a URL cannot carry as-is.
const LITERAL: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'/')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}');

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReverseError {
	#[error("no route named '{0}'")]
	UnknownRoute(String),

	#[error("route '{route}' requires parameter '{param}'")]
	MissingParameter { route: String, param: String },

	/// The value contains the literal text that follows the parameter in its
	/// segment, so the generated URL would match with a different split.
	#[error("value '{value}' of parameter '{param}' in route '{route}' would not match back")]
	AmbiguousValue {
		route: String,
		param: String,
		value: String,
	},
}

/// Name index over compiled routes.
///
/// Names are not required to be unique. Registering a name again replaces
/// the earlier route.
#[derive(Debug, Clone, Default)]
pub struct UrlReverser {
	routes: HashMap<String, Arc<RouteDefinition>>,
}

impl UrlReverser {
	pub fn new() -> Self {
		Self::default()
	}

	/// Index `route` under its name. Unnamed routes are ignored.
	pub fn register(&mut self, route: Arc<RouteDefinition>) {
		let Some(name) = route.name().map(str::to_string) else {
			return;
		};
		if let Some(previous) = self.routes.insert(name.clone(), route) {
			tracing::warn!(
				name = %name,
				shadowed = %previous.path(),
				"route name registered twice, the later route wins"
			);
		}
	}

	pub fn has_route(&self, name: &str) -> bool {
		self.routes.contains_key(name)
	}

	pub fn get(&self, name: &str) -> Option<&Arc<RouteDefinition>> {
		self.routes.get(name)
	}

	pub fn route_names(&self) -> impl Iterator<Item = &str> {
		self.routes.keys().map(String::as_str)
	}

	/// Generate the URL of the route named `name`.
	///
	/// Every substituted value is percent-encoded, wildcard values included.
	/// Parameters the route does not declare are ignored.
	///
	/// # Examples
	///
	/// ```
	/// use std::collections::HashMap;
	/// use waypost_urls::{Route, Router};
	///
	/// let router = Router::builder()
	///     .route(Route::get("/users/{id}", "users").name("users.show"))
	///     .build()
	///     .unwrap();
	///
	/// let params = HashMap::from([("id".to_string(), "foo/bar".to_string())]);
	/// let url = router.reverser().reverse("users.show", &params).unwrap();
	/// assert_eq!(url, "/users/foo%2Fbar");
	/// ```
	pub fn reverse(
		&self,
		name: &str,
		params: &HashMap<String, String>,
	) -> Result<String, ReverseError> {
		let route = self
			.routes
			.get(name)
			.ok_or_else(|| ReverseError::UnknownRoute(name.to_string()))?;
		generate(route, |param| params.get(param).map(String::as_str))
	}

	/// Like [`reverse`](Self::reverse), with parameters as pairs.
	pub fn reverse_with<K, V>(&self, name: &str, params: &[(K, V)]) -> Result<String, ReverseError>
	where
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let route = self
			.routes
			.get(name)
			.ok_or_else(|| ReverseError::UnknownRoute(name.to_string()))?;
		generate(route, |param| {
			params
				.iter()
				.find(|(key, _)| key.as_ref() == param)
				.map(|(_, value)| value.as_ref())
		})
	}

	/// Generate a URL and append `query` as a percent-encoded query string.
	pub fn reverse_with_query<K, V>(
		&self,
		name: &str,
		params: &HashMap<String, String>,
		query: &[(K, V)],
	) -> Result<String, ReverseError>
	where
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut url = self.reverse(name, params)?;
		for (index, (key, value)) in query.iter().enumerate() {
			url.push(if index == 0 { '?' } else { '&' });
			url.extend(utf8_percent_encode(key.as_ref(), COMPONENT));
			url.push('=');
			url.extend(utf8_percent_encode(value.as_ref(), COMPONENT));
		}
		Ok(url)
	}
}

/// Substitute parameters into the domain and path templates of `route`.
///
/// Domain routes produce a protocol-relative URL (`//host/path`).
fn generate<'a>(
	route: &RouteDefinition,
	lookup: impl Fn(&str) -> Option<&'a str>,
) -> Result<String, ReverseError> {
	let route_name = || route.name().unwrap_or(route.path().as_str()).to_string();
	let render = |segment: &Segment, out: &mut String| -> Result<(), ReverseError> {
		let parts = segment.parts();
		for (index, part) in parts.iter().enumerate() {
			match part {
				Part::Literal(text) => out.extend(utf8_percent_encode(text, LITERAL)),
				Part::Param(name) | Part::Wildcard(name) => {
					let value = lookup(name).ok_or_else(|| ReverseError::MissingParameter {
						route: route_name(),
						param: name.clone(),
					})?;
					if let Some(Part::Literal(next)) = parts.get(index + 1)
						&& !splits_at_end(value, next)
					{
						return Err(ReverseError::AmbiguousValue {
							route: route_name(),
							param: name.clone(),
							value: value.to_string(),
						});
					}
					out.extend(utf8_percent_encode(value, COMPONENT));
				}
			}
		}
		Ok(())
	};

	let mut url = String::new();
	if let Some(domain) = route.domain() {
		url.push_str("//");
		for (index, label) in domain.labels().iter().enumerate() {
			if index > 0 {
				url.push('.');
			}
			render(label, &mut url)?;
		}
	}

	let segments = route.path().segments();
	if segments.is_empty() {
		url.push('/');
	}
	for segment in segments {
		url.push('/');
		render(segment, &mut url)?;
	}
	Ok(url)
}

/// Whether a shortest-span capture over `value` followed by `literal` ends
/// exactly at the end of `value`.
fn splits_at_end(value: &str, literal: &str) -> bool {
	let Some(first) = value.chars().next() else {
		return true;
	};
	let joined = format!("{}{}", value, literal);
	let skip = first.len_utf8();
	joined[skip..].find(literal).map(|at| at + skip) == Some(value.len())
}

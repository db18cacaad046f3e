//! Segment trie keyed by HTTP method.
//!
//! Domain-bound routes are inserted under their domain labels, with the path
//! continuing from the last label node; domain-agnostic routes are inserted
//! into a separate path tree. Lookup tries host then path first and falls
//! back to the path tree alone.
//!
//! At every node candidates are tried in a fixed order, independent of
//! registration order: literal child, mixed segments, whole-segment
//! parameter, wildcard. A branch that fails deeper down is abandoned and the
//! next candidate tried.

use http::Method;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

use crate::pattern::{Segment, SegmentKind};
use crate::route::RouteDefinition;

#[derive(Debug, Clone)]
struct Leaf {
	route: usize,
	/// Parameter names in capture order
	params: Vec<String>,
}

#[derive(Debug, Default)]
struct Node {
	statics: HashMap<String, Node>,
	/// Mixed segments ordered by specificity, then at most one whole-segment
	/// parameter
	dynamics: Vec<(Segment, Node)>,
	wildcard: Option<Leaf>,
	leaf: Option<Leaf>,
	/// Path tree continuing after the last label of a domain
	path_root: Option<Box<Node>>,
}

impl Node {
	fn is_empty(&self) -> bool {
		self.statics.is_empty()
			&& self.dynamics.is_empty()
			&& self.wildcard.is_none()
			&& self.leaf.is_none()
			&& self.path_root.is_none()
	}

	fn child_mut(&mut self, segment: &Segment) -> &mut Node {
		if let Some(text) = segment.literal() {
			return self.statics.entry(text.to_string()).or_default();
		}

		let index = match self
			.dynamics
			.iter()
			.position(|(shape, _)| shape.same_shape(segment))
		{
			Some(index) => index,
			None => {
				// Mixed siblings are kept most specific first
				let index = match segment.kind() {
					SegmentKind::Mixed => self
						.dynamics
						.iter()
						.position(|(shape, _)| {
							shape.kind() == SegmentKind::Param
								|| shape.specificity() < segment.specificity()
						})
						.unwrap_or(self.dynamics.len()),
					_ => self.dynamics.len(),
				};
				self.dynamics
					.insert(index, (segment.clone(), Node::default()));
				index
			}
		};
		&mut self.dynamics[index].1
	}

	/// Returns `false` if a route with the same shape is already there.
	fn insert_path(&mut self, segments: &[Segment], leaf: Leaf) -> bool {
		let (wildcard, body) = match segments.split_last() {
			Some((last, body)) if last.kind() == SegmentKind::Wildcard => (true, body),
			_ => (false, segments),
		};

		let mut node = self;
		for segment in body {
			node = node.child_mut(segment);
		}

		let slot = if wildcard {
			&mut node.wildcard
		} else {
			&mut node.leaf
		};
		if slot.is_some() {
			return false;
		}
		*slot = Some(leaf);
		true
	}
}

#[derive(Debug, Default)]
struct RouteTree {
	hosts: Node,
	paths: Node,
}

/// Result of a structural match, before constraints are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Found {
	pub(crate) route: usize,
	pub(crate) params: HashMap<String, String>,
	/// Matched through the domain-agnostic tree although a host was given
	pub(crate) fallback: bool,
}

#[derive(Debug, Default)]
pub(crate) struct RouteMatcher {
	trees: HashMap<Method, RouteTree>,
}

impl RouteMatcher {
	pub(crate) fn insert(&mut self, index: usize, route: &RouteDefinition) {
		let params: Vec<String> = route
			.param_names()
			.into_iter()
			.map(String::from)
			.collect();

		for method in route.methods() {
			let tree = self.trees.entry(method.clone()).or_default();
			let start = match route.domain() {
				Some(domain) => {
					let mut node = &mut tree.hosts;
					for label in domain.labels() {
						node = node.child_mut(label);
					}
					&mut **node.path_root.get_or_insert_with(Box::default)
				}
				None => &mut tree.paths,
			};

			let leaf = Leaf {
				route: index,
				params: params.clone(),
			};
			if !start.insert_path(route.path().segments(), leaf) {
				tracing::warn!(
					%method,
					pattern = %route.path(),
					domain = route.domain().map(|d| d.as_str()),
					"route shadowed by an earlier route with the same shape"
				);
			}
		}
	}

	/// `host` must already be lower-cased and stripped of its port.
	pub(crate) fn lookup(&self, method: &Method, path: &str, host: Option<&str>) -> Option<Found> {
		let tree = self.trees.get(method)?;
		let segments = split_path(path);
		let mut captures = Vec::new();

		if let Some(host) = host
			&& !tree.hosts.is_empty()
		{
			let labels: Vec<&str> = host.split('.').collect();
			if let Some(leaf) = match_host(&tree.hosts, &labels, &segments, &mut captures) {
				return Some(found(leaf, captures, false));
			}
			tracing::trace!(host, path, "no domain route, trying domain-agnostic routes");
		}

		let leaf = match_path(&tree.paths, &segments, &mut captures)?;
		Some(found(leaf, captures, host.is_some() && !tree.hosts.is_empty()))
	}
}

fn found(leaf: &Leaf, captures: Vec<String>, fallback: bool) -> Found {
	Found {
		route: leaf.route,
		params: leaf.params.iter().cloned().zip(captures).collect(),
		fallback,
	}
}

/// Split a request path into percent-decoded segments, ignoring a trailing
/// slash.
fn split_path(path: &str) -> Vec<String> {
	let trimmed = path.trim_end_matches('/');
	if trimmed.is_empty() {
		return Vec::new();
	}
	trimmed
		.strip_prefix('/')
		.unwrap_or(trimmed)
		.split('/')
		.map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
		.collect()
}

type Continue<'n, 'c> = &'c mut dyn FnMut(&'n Node, &mut Vec<String>) -> Option<&'n Leaf>;

/// Try the literal child, then the dynamic children, calling `next` on each
/// child `value` matches. `captures` is restored after every failed branch.
fn descend<'n>(
	node: &'n Node,
	value: &str,
	captures: &mut Vec<String>,
	next: Continue<'n, '_>,
) -> Option<&'n Leaf> {
	if let Some(child) = node.statics.get(value)
		&& let Some(leaf) = next(child, captures)
	{
		return Some(leaf);
	}

	for (shape, child) in &node.dynamics {
		let mark = captures.len();
		if shape.capture(value, captures) {
			if let Some(leaf) = next(child, captures) {
				return Some(leaf);
			}
			captures.truncate(mark);
		}
	}
	None
}

fn match_path<'n>(
	node: &'n Node,
	segments: &[String],
	captures: &mut Vec<String>,
) -> Option<&'n Leaf> {
	let Some((first, rest)) = segments.split_first() else {
		return node.leaf.as_ref();
	};

	if let Some(leaf) = descend(node, first, captures, &mut |child, captures| {
		match_path(child, rest, captures)
	}) {
		return Some(leaf);
	}

	// Empty segments (`//`) are not part of a wildcard value
	let leaf = node.wildcard.as_ref()?;
	let rest: Vec<&str> = segments
		.iter()
		.map(String::as_str)
		.filter(|segment| !segment.is_empty())
		.collect();
	if rest.is_empty() {
		return None;
	}
	captures.push(rest.join("/"));
	Some(leaf)
}

fn match_host<'n>(
	node: &'n Node,
	labels: &[&str],
	segments: &[String],
	captures: &mut Vec<String>,
) -> Option<&'n Leaf> {
	let Some((first, rest)) = labels.split_first() else {
		let root = node.path_root.as_deref()?;
		return match_path(root, segments, captures);
	};

	descend(node, first, captures, &mut |child, captures| {
		match_host(child, rest, segments, captures)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::route::Route;
	use crate::route_group::{Composer, RouteGroup};
	use rstest::rstest;

	fn matcher(routes: Vec<Route>) -> RouteMatcher {
		let definitions = Composer::default()
			.compose(RouteGroup::new().routes(routes), &[])
			.unwrap();
		let mut matcher = RouteMatcher::default();
		for (index, route) in definitions.iter().enumerate() {
			matcher.insert(index, route);
		}
		matcher
	}

	fn get(matcher: &RouteMatcher, path: &str) -> Option<(usize, Vec<(String, String)>)> {
		get_on(matcher, path, None)
	}

	fn get_on(
		matcher: &RouteMatcher,
		path: &str,
		host: Option<&str>,
	) -> Option<(usize, Vec<(String, String)>)> {
		matcher.lookup(&Method::GET, path, host).map(|found| {
			let mut params: Vec<_> = found.params.into_iter().collect();
			params.sort();
			(found.route, params)
		})
	}

	fn p(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn test_whole_segment_parameter() {
		let m = matcher(vec![Route::get("/users/{id}", "h")]);
		assert_eq!(get(&m, "/users/42"), Some((0, p(&[("id", "42")]))));
		assert_eq!(get(&m, "/users"), None);
		assert_eq!(get(&m, "/users/42/posts"), None);
	}

	#[test]
	fn test_wildcard_takes_remaining_segments() {
		let m = matcher(vec![Route::get("/files/{...path}", "h")]);
		assert_eq!(
			get(&m, "/files/a/b/c.txt"),
			Some((0, p(&[("path", "a/b/c.txt")])))
		);
		assert_eq!(get(&m, "/files"), None);
	}

	#[rstest]
	#[case("/users/", "/users")]
	#[case("/users", "/users/")]
	#[case("/", "/")]
	#[case("/", "")]
	fn test_trailing_slash_symmetry(#[case] template: &str, #[case] request: &str) {
		let m = matcher(vec![Route::get(template, "h")]);
		assert!(get(&m, request).is_some());
	}

	#[rstest]
	#[case(vec![Route::get("/users/me", "h"), Route::get("/users/{id}", "h")])]
	#[case(vec![Route::get("/users/{id}", "h"), Route::get("/users/me", "h")])]
	fn test_static_beats_parameter_regardless_of_order(#[case] routes: Vec<Route>) {
		let static_index = routes.iter().position(|r| r.path() == "/users/me").unwrap();
		let m = matcher(routes);
		assert_eq!(get(&m, "/users/me"), Some((static_index, vec![])));
		assert_eq!(get(&m, "/users/7").map(|(i, _)| i), Some(1 - static_index));
	}

	#[test]
	fn test_precedence_static_mixed_param_wildcard() {
		let m = matcher(vec![
			Route::get("/pkg/{...rest}", "h"),
			Route::get("/pkg/{name}", "h"),
			Route::get("/pkg/@{scope}", "h"),
			Route::get("/pkg/@types", "h"),
		]);
		assert_eq!(get(&m, "/pkg/@types").map(|(i, _)| i), Some(3));
		assert_eq!(get(&m, "/pkg/@babel"), Some((2, p(&[("scope", "babel")]))));
		assert_eq!(get(&m, "/pkg/lodash"), Some((1, p(&[("name", "lodash")]))));
		assert_eq!(get(&m, "/pkg/a/b"), Some((0, p(&[("rest", "a/b")]))));
	}

	#[rstest]
	#[case(vec![Route::get("/{name}.{ext}", "h"), Route::get("/{name}.json", "h")], 1)]
	#[case(vec![Route::get("/{name}.json", "h"), Route::get("/{name}.{ext}", "h")], 0)]
	fn test_specific_mixed_segment_wins_regardless_of_order(
		#[case] routes: Vec<Route>,
		#[case] json_index: usize,
	) {
		let m = matcher(routes);
		assert_eq!(
			get(&m, "/data.json"),
			Some((json_index, p(&[("name", "data")])))
		);
		assert_eq!(
			get(&m, "/data.xml"),
			Some((1 - json_index, p(&[("ext", "xml"), ("name", "data")])))
		);
	}

	#[test]
	fn test_mixed_segment_specificity_prefers_fewer_parameters() {
		let m = matcher(vec![
			Route::get("/{a}-{b}.{c}", "h"),
			Route::get("/{name}-v.tar", "h"),
			Route::get("/{name}.tar", "h"),
		]);
		assert_eq!(get(&m, "/pkg-v.tar"), Some((1, p(&[("name", "pkg")]))));
		assert_eq!(get(&m, "/pkg.tar"), Some((2, p(&[("name", "pkg")]))));
		assert_eq!(
			get(&m, "/x-y.z"),
			Some((0, p(&[("a", "x"), ("b", "y"), ("c", "z")])))
		);
	}

	#[test]
	fn test_wildcard_skips_empty_segments() {
		let m = matcher(vec![Route::get("/files/{...path}", "h")]);
		assert_eq!(get(&m, "/files//a"), Some((0, p(&[("path", "a")]))));
		assert_eq!(get(&m, "/files/a//b"), Some((0, p(&[("path", "a/b")]))));
		assert_eq!(get(&m, "/files//"), None);
	}

	#[test]
	fn test_backtracks_out_of_static_branch() {
		let m = matcher(vec![
			Route::get("/users/me/settings", "h"),
			Route::get("/users/{id}/posts", "h"),
		]);
		assert_eq!(get(&m, "/users/me/posts"), Some((1, p(&[("id", "me")]))));
	}

	#[test]
	fn test_backtracks_out_of_mixed_branch() {
		let m = matcher(vec![
			Route::get("/{name}.{ext}/raw", "h"),
			Route::get("/{file}/info", "h"),
		]);
		assert_eq!(get(&m, "/a.txt/info"), Some((1, p(&[("file", "a.txt")]))));
	}

	#[test]
	fn test_parameter_names_per_route_on_shared_node() {
		let m = matcher(vec![
			Route::get("/teams/{team}/members", "h"),
			Route::get("/teams/{slug}/projects", "h"),
		]);
		assert_eq!(get(&m, "/teams/x/projects"), Some((1, p(&[("slug", "x")]))));
	}

	#[test]
	fn test_first_duplicate_wins() {
		let m = matcher(vec![Route::get("/a/{x}", "h"), Route::get("/a/{y}", "h")]);
		assert_eq!(get(&m, "/a/1"), Some((0, p(&[("x", "1")]))));
	}

	#[test]
	fn test_segments_are_percent_decoded() {
		let m = matcher(vec![
			Route::get("/users/{id}", "h"),
			Route::get("/files/{...path}", "h"),
		]);
		assert_eq!(
			get(&m, "/users/foo%2Fbar"),
			Some((0, p(&[("id", "foo/bar")])))
		);
		assert_eq!(
			get(&m, "/files/a%2Fb/c%20d"),
			Some((1, p(&[("path", "a/b/c d")])))
		);
	}

	#[test]
	fn test_encoded_template_literal_matches() {
		let m = matcher(vec![Route::get("/caf%C3%A9/menu%20items", "h")]);
		assert_eq!(get(&m, "/caf%C3%A9/menu%20items"), Some((0, vec![])));
		assert_eq!(get(&m, "/café/menu items"), Some((0, vec![])));
	}

	#[test]
	fn test_methods_are_separate() {
		let m = matcher(vec![Route::post("/users", "h")]);
		assert!(get(&m, "/users").is_none());
		assert!(m.lookup(&Method::POST, "/users", None).is_some());
	}

	#[test]
	fn test_domain_route_wins_for_its_host() {
		let m = matcher(vec![
			Route::get("/users", "h").domain("api.example.com"),
			Route::get("/users", "h"),
		]);
		assert_eq!(
			get_on(&m, "/users", Some("api.example.com")).map(|(i, _)| i),
			Some(0)
		);
		assert_eq!(get_on(&m, "/users", Some("other.com")).map(|(i, _)| i), Some(1));
		assert_eq!(get_on(&m, "/users", None).map(|(i, _)| i), Some(1));
	}

	#[test]
	fn test_domain_parameters_captured_first() {
		let m = matcher(vec![
			Route::get("/projects/{id}", "h").domain("{tenant}.example.com"),
			Route::get("/projects/{id}", "h").domain("admin.example.com"),
		]);
		assert_eq!(
			get_on(&m, "/projects/3", Some("acme.example.com")),
			Some((0, p(&[("id", "3"), ("tenant", "acme")])))
		);
		// Literal label beats the parameter label
		assert_eq!(
			get_on(&m, "/projects/3", Some("admin.example.com")),
			Some((1, p(&[("id", "3")])))
		);
	}

	#[test]
	fn test_domain_route_path_miss_falls_back() {
		let m = matcher(vec![
			Route::get("/a", "h").domain("api.example.com"),
			Route::get("/b", "h"),
		]);
		let found = m.lookup(&Method::GET, "/b", Some("api.example.com")).unwrap();
		assert_eq!(found.route, 1);
		assert!(found.fallback);
	}

	#[test]
	fn test_domain_labels_do_not_collide_with_path_segments() {
		let m = matcher(vec![
			Route::get("/", "h").domain("com"),
			Route::get("/com", "h"),
		]);
		assert_eq!(get_on(&m, "/com", Some("example.org")).map(|(i, _)| i), Some(1));
		assert_eq!(get_on(&m, "/", Some("com")).map(|(i, _)| i), Some(0));
	}

	#[test]
	fn test_empty_capture_never_matches() {
		let m = matcher(vec![Route::get("/v{version}", "h")]);
		assert!(get(&m, "/v").is_none());
		assert_eq!(get(&m, "/v2"), Some((0, p(&[("version", "2")]))));
	}
}

//! Path and domain template compiler.
//!
//! Templates are made of segments (`/`-separated for paths, `.`-separated for
//! domains). A segment is a list of [`Part`]s, so literal text and parameters
//! can be interleaved inside one segment:
//!
//! - `/users/{id}` - whole-segment parameter
//! - `/@{scope}/{name}` - mixed segment
//! - `/files/{id}.{ext}` - two parameters in one segment
//! - `/assets/{...path}` - wildcard capturing the remaining segments
//!
//! Domains use the same syntax without wildcards: `{tenant}.example.com`.

use percent_encoding::percent_decode_str;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

const WILDCARD_MARKER: &str = "...";

/// Template syntax errors, one per validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
	#[error("'*' is not allowed, declare wildcards as {{...name}}")]
	Asterisk,

	#[error("':' is not allowed in route templates")]
	Colon,

	#[error("wildcard '{{{0}...}}' must be written as '{{...{0}}}'")]
	ReversedWildcard(String),

	#[error("wildcard '{0}' must be the last part of the template")]
	WildcardNotLast(String),

	#[error("unbalanced or nested braces")]
	MalformedBraces,

	#[error("invalid parameter name '{0}'")]
	InvalidParameterName(String),

	#[error("path templates must start with '/'")]
	MissingLeadingSlash,

	#[error("domain templates must not start or end with '.'")]
	DomainSeparator,

	#[error("wildcard '{0}' cannot share a segment with other parts")]
	WildcardInMixedSegment(String),

	#[error("wildcard '{0}' is not allowed in a domain template")]
	WildcardInDomain(String),

	#[error("wildcard '{0}' is not allowed in a group prefix")]
	WildcardInPrefix(String),

	#[error("group prefix segment '{0}' mixes literal text and parameters")]
	MixedSegmentInPrefix(String),

	#[error("parameters '{0}' and '{1}' must be separated by literal text")]
	AdjacentParameters(String, String),

	#[error("domain templates cannot contain empty labels")]
	EmptyDomainLabel,

	#[error("parameter '{0}' is declared more than once")]
	DuplicateParameter(String),
}

/// One piece of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
	Literal(String),
	/// `{name}`: one or more characters of the segment
	Param(String),
	/// `{...name}`: one or more whole remaining segments
	Wildcard(String),
}

impl Part {
	pub fn param_name(&self) -> Option<&str> {
		match self {
			Part::Literal(_) => None,
			Part::Param(name) | Part::Wildcard(name) => Some(name),
		}
	}
}

/// How a segment takes part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
	/// Literal text only (possibly empty)
	Static,
	/// Literal text and parameters interleaved
	Mixed,
	/// A single `{name}`
	Param,
	/// A single `{...name}`
	Wildcard,
}

/// A path segment or domain label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
	parts: Vec<Part>,
}

impl Segment {
	fn parse(text: &str) -> Result<Self, PatternError> {
		let mut parts = Vec::new();
		let mut rest = text;

		while let Some(open) = rest.find('{') {
			let Some(len) = rest[open..].find('}') else {
				return Err(PatternError::MalformedBraces);
			};
			let close = open + len;
			if open > 0 {
				parts.push(Part::Literal(rest[..open].to_string()));
			}
			let content = &rest[open + 1..close];
			match content.strip_prefix(WILDCARD_MARKER) {
				Some(name) => parts.push(Part::Wildcard(name.to_string())),
				None => parts.push(Part::Param(content.to_string())),
			}
			rest = &rest[close + 1..];
		}
		if !rest.is_empty() {
			parts.push(Part::Literal(rest.to_string()));
		}

		let segment = Self { parts };
		segment.check()?;
		Ok(segment)
	}

	fn check(&self) -> Result<(), PatternError> {
		if self.parts.len() > 1
			&& let Some(Part::Wildcard(name)) =
				self.parts.iter().find(|part| matches!(part, Part::Wildcard(_)))
		{
			return Err(PatternError::WildcardInMixedSegment(name.clone()));
		}
		for pair in self.parts.windows(2) {
			if let (Part::Param(first), Part::Param(second)) = (&pair[0], &pair[1]) {
				return Err(PatternError::AdjacentParameters(
					first.clone(),
					second.clone(),
				));
			}
		}
		Ok(())
	}

	pub fn parts(&self) -> &[Part] {
		&self.parts
	}

	pub fn kind(&self) -> SegmentKind {
		match self.parts.as_slice() {
			[Part::Param(_)] => SegmentKind::Param,
			[Part::Wildcard(_)] => SegmentKind::Wildcard,
			parts if parts.iter().all(|part| matches!(part, Part::Literal(_))) => {
				SegmentKind::Static
			}
			_ => SegmentKind::Mixed,
		}
	}

	/// The literal text of a static segment.
	pub fn literal(&self) -> Option<&str> {
		match self.parts.as_slice() {
			[] => Some(""),
			[Part::Literal(text)] => Some(text),
			_ => None,
		}
	}

	pub fn param_names(&self) -> impl Iterator<Item = &str> {
		self.parts.iter().filter_map(Part::param_name)
	}

	/// Whether both segments match exactly the same inputs, ignoring
	/// parameter names.
	pub(crate) fn same_shape(&self, other: &Segment) -> bool {
		self.parts.len() == other.parts.len()
			&& self
				.parts
				.iter()
				.zip(&other.parts)
				.all(|pair| match pair {
					(Part::Literal(a), Part::Literal(b)) => a == b,
					(Part::Param(_), Part::Param(_)) => true,
					(Part::Wildcard(_), Part::Wildcard(_)) => true,
					_ => false,
				})
	}

	/// Ranking among mixed siblings: more literal text first, then fewer
	/// parameters.
	pub(crate) fn specificity(&self) -> (usize, Reverse<usize>) {
		let mut literal = 0;
		let mut params = 0;
		for part in &self.parts {
			match part {
				Part::Literal(text) => literal += text.len(),
				Part::Param(_) | Part::Wildcard(_) => params += 1,
			}
		}
		(literal, Reverse(params))
	}

	/// Match `value` against this segment, pushing one capture per parameter
	/// onto `captures`. On failure `captures` is left as it was.
	pub(crate) fn capture(&self, value: &str, captures: &mut Vec<String>) -> bool {
		let mark = captures.len();
		if match_parts(&self.parts, value, captures) {
			true
		} else {
			captures.truncate(mark);
			false
		}
	}

	/// Percent-decode literal text, so literals compare against decoded
	/// request segments.
	fn decode_literals(mut self) -> Self {
		for part in &mut self.parts {
			if let Part::Literal(text) = part
				&& text.contains('%')
			{
				*text = percent_decode_str(text).decode_utf8_lossy().into_owned();
			}
		}
		self
	}

	fn lowercase_literals(mut self) -> Self {
		for part in &mut self.parts {
			if let Part::Literal(text) = part {
				*text = text.to_lowercase();
			}
		}
		self
	}
}

impl fmt::Display for Segment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for part in &self.parts {
			match part {
				Part::Literal(text) => f.write_str(text)?,
				Part::Param(name) => write!(f, "{{{}}}", name)?,
				Part::Wildcard(name) => write!(f, "{{...{}}}", name)?,
			}
		}
		Ok(())
	}
}

/// Anchored match of `value` against `parts`.
///
/// A parameter followed by a literal takes the shortest non-empty span after
/// which the rest still matches; a trailing parameter takes the remainder.
fn match_parts(parts: &[Part], value: &str, captures: &mut Vec<String>) -> bool {
	match parts {
		[] => value.is_empty(),
		[Part::Literal(text), rest @ ..] => match value.strip_prefix(text.as_str()) {
			Some(tail) => match_parts(rest, tail, captures),
			None => false,
		},
		[Part::Param(_) | Part::Wildcard(_)] => {
			if value.is_empty() {
				return false;
			}
			captures.push(value.to_string());
			true
		}
		[Part::Param(_), Part::Literal(text), ..] => {
			for end in 1..value.len() {
				if !value.is_char_boundary(end) || !value[end..].starts_with(text.as_str()) {
					continue;
				}
				let mark = captures.len();
				captures.push(value[..end].to_string());
				if match_parts(&parts[1..], &value[end..], captures) {
					return true;
				}
				captures.truncate(mark);
			}
			false
		}
		// Adjacent parameters are rejected when the template is compiled
		_ => false,
	}
}

/// A compiled path template.
///
/// # Examples
///
/// ```
/// use waypost_urls::PathPattern;
///
/// let pattern = PathPattern::parse("/users/{id}/files/{name}.{ext}/").unwrap();
/// assert_eq!(pattern.segments().len(), 4);
/// assert_eq!(pattern.param_names(), ["id", "name", "ext"]);
/// assert_eq!(pattern.to_string(), "/users/{id}/files/{name}.{ext}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
	source: String,
	segments: Vec<Segment>,
}

impl PathPattern {
	/// Validate and compile a path template. Trailing slashes are dropped, so
	/// `/users/` and `/users` compile to the same pattern and `/` compiles to
	/// no segments at all.
	///
	/// # Errors
	///
	/// Returns the first [`PatternError`] found, checking `*`, `:`, reversed
	/// wildcards, wildcard position, braces and the leading `/` in that order.
	pub fn parse(template: &str) -> Result<Self, PatternError> {
		validate(template)?;
		if !template.starts_with('/') {
			return Err(PatternError::MissingLeadingSlash);
		}

		let trimmed = template.trim_end_matches('/');
		let segments = if trimmed.is_empty() {
			Vec::new()
		} else {
			trimmed[1..]
				.split('/')
				.map(|text| Segment::parse(text).map(Segment::decode_literals))
				.collect::<Result<Vec<_>, _>>()?
		};

		let pattern = Self {
			source: template.to_string(),
			segments,
		};
		ensure_unique(pattern.param_names())?;
		Ok(pattern)
	}

	/// Validate a group prefix. Prefixes follow path syntax but may only hold
	/// literal segments and whole-segment parameters.
	pub fn validate_prefix(prefix: &str) -> Result<(), PatternError> {
		validate(prefix)?;
		let pattern = Self::parse(&normalize_prefix(prefix))?;
		for segment in &pattern.segments {
			match segment.kind() {
				SegmentKind::Static | SegmentKind::Param => {}
				SegmentKind::Wildcard => {
					let name = segment.param_names().next().unwrap_or_default();
					return Err(PatternError::WildcardInPrefix(name.to_string()));
				}
				SegmentKind::Mixed => {
					return Err(PatternError::MixedSegmentInPrefix(segment.to_string()));
				}
			}
		}
		Ok(())
	}

	/// The template this pattern was compiled from.
	pub fn as_str(&self) -> &str {
		&self.source
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	pub fn param_names(&self) -> Vec<&str> {
		self.segments.iter().flat_map(Segment::param_names).collect()
	}

	pub fn has_wildcard(&self) -> bool {
		self.segments
			.last()
			.is_some_and(|segment| segment.kind() == SegmentKind::Wildcard)
	}
}

impl fmt::Display for PathPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.segments.is_empty() {
			return f.write_str("/");
		}
		for segment in &self.segments {
			write!(f, "/{}", segment)?;
		}
		Ok(())
	}
}

/// A compiled domain template. Literal labels are stored lower-cased.
///
/// # Examples
///
/// ```
/// use waypost_urls::DomainPattern;
///
/// let domain = DomainPattern::parse("{tenant}.Example.com").unwrap();
/// assert_eq!(domain.param_names(), ["tenant"]);
/// assert_eq!(domain.to_string(), "{tenant}.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPattern {
	source: String,
	labels: Vec<Segment>,
}

impl DomainPattern {
	pub fn parse(template: &str) -> Result<Self, PatternError> {
		let trimmed = template.trim();
		validate(trimmed)?;
		if trimmed.starts_with('.') || trimmed.ends_with('.') {
			return Err(PatternError::DomainSeparator);
		}

		let mut labels = Vec::new();
		for text in trimmed.split('.') {
			if text.is_empty() {
				return Err(PatternError::EmptyDomainLabel);
			}
			let label = Segment::parse(text)?.lowercase_literals();
			if let Some(Part::Wildcard(name)) = label
				.parts()
				.iter()
				.find(|part| matches!(part, Part::Wildcard(_)))
			{
				return Err(PatternError::WildcardInDomain(name.clone()));
			}
			labels.push(label);
		}

		let pattern = Self {
			source: trimmed.to_string(),
			labels,
		};
		ensure_unique(pattern.param_names())?;
		Ok(pattern)
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}

	pub fn labels(&self) -> &[Segment] {
		&self.labels
	}

	pub fn param_names(&self) -> Vec<&str> {
		self.labels.iter().flat_map(Segment::param_names).collect()
	}

	/// Whether two domain templates denote the same domain.
	pub fn same_domain(a: &str, b: &str) -> bool {
		a.trim().eq_ignore_ascii_case(b.trim())
	}
}

impl fmt::Display for DomainPattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (index, label) in self.labels.iter().enumerate() {
			if index > 0 {
				f.write_str(".")?;
			}
			write!(f, "{}", label)?;
		}
		Ok(())
	}
}

/// Join a group prefix and a child path with exactly one `/` between them.
///
/// ```
/// use waypost_urls::pattern::join_prefix;
///
/// assert_eq!(join_prefix("/api/", "/users"), "/api/users");
/// assert_eq!(join_prefix("api", "/"), "/api/");
/// assert_eq!(join_prefix("", "/users"), "/users");
/// ```
pub fn join_prefix(prefix: &str, path: &str) -> String {
	let prefix = normalize_prefix(prefix);
	let prefix = prefix.trim_end_matches('/');
	if path.starts_with('/') {
		format!("{}{}", prefix, path)
	} else {
		format!("{}/{}", prefix, path)
	}
}

fn normalize_prefix(prefix: &str) -> String {
	if prefix.starts_with('/') {
		prefix.to_string()
	} else {
		format!("/{}", prefix)
	}
}

struct Token<'a> {
	content: &'a str,
	end: usize,
}

/// `{...}` tokens without nested braces, in template order.
fn tokens(template: &str) -> Vec<Token<'_>> {
	let mut tokens = Vec::new();
	for (open, _) in template.match_indices('{') {
		let after = &template[open + 1..];
		if let Some(len) = after.find(['{', '}'])
			&& after[len..].starts_with('}')
		{
			tokens.push(Token {
				content: &after[..len],
				end: open + 1 + len + 1,
			});
		}
	}
	tokens
}

fn validate(template: &str) -> Result<(), PatternError> {
	if template.contains('*') {
		return Err(PatternError::Asterisk);
	}
	if template.contains(':') {
		return Err(PatternError::Colon);
	}

	let tokens = tokens(template);

	for token in &tokens {
		if token.content.ends_with(WILDCARD_MARKER) && !token.content.starts_with(WILDCARD_MARKER)
		{
			let name = token.content.trim_end_matches(WILDCARD_MARKER);
			return Err(PatternError::ReversedWildcard(name.to_string()));
		}
	}

	for (index, token) in tokens.iter().enumerate() {
		if let Some(name) = token.content.strip_prefix(WILDCARD_MARKER) {
			let trailing = template[token.end..].trim_end_matches('/');
			if index + 1 < tokens.len() || !trailing.is_empty() {
				return Err(PatternError::WildcardNotLast(name.to_string()));
			}
		}
	}

	let mut depth = 0usize;
	for ch in template.chars() {
		match ch {
			'{' if depth > 0 => return Err(PatternError::MalformedBraces),
			'{' => depth += 1,
			'}' if depth == 0 => return Err(PatternError::MalformedBraces),
			'}' => depth -= 1,
			_ => {}
		}
	}
	if depth != 0 {
		return Err(PatternError::MalformedBraces);
	}

	for token in &tokens {
		let name = token
			.content
			.strip_prefix(WILDCARD_MARKER)
			.unwrap_or(token.content);
		if !is_identifier(name) {
			return Err(PatternError::InvalidParameterName(token.content.to_string()));
		}
	}

	Ok(())
}

fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
		&& chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

pub(crate) fn ensure_unique<'a>(
	names: impl IntoIterator<Item = &'a str>,
) -> Result<(), PatternError> {
	let mut seen = HashSet::new();
	for name in names {
		if !seen.insert(name) {
			return Err(PatternError::DuplicateParameter(name.to_string()));
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn capture(template: &str, value: &str) -> Option<Vec<String>> {
		let pattern = PathPattern::parse(template).unwrap();
		let mut captures = Vec::new();
		pattern.segments()[0]
			.capture(value, &mut captures)
			.then_some(captures)
	}

	#[rstest]
	#[case("/files/*", PatternError::Asterisk)]
	#[case("/users/:id", PatternError::Colon)]
	#[case("/files/{path...}", PatternError::ReversedWildcard("path".into()))]
	#[case("/files/{...path}/edit", PatternError::WildcardNotLast("path".into()))]
	#[case("/{...a}/{...b}", PatternError::WildcardNotLast("a".into()))]
	#[case("/files/{...path}.txt", PatternError::WildcardNotLast("path".into()))]
	#[case("/users/{id", PatternError::MalformedBraces)]
	#[case("/users/id}", PatternError::MalformedBraces)]
	#[case("/users/{a{b}}", PatternError::MalformedBraces)]
	#[case("/users/{}", PatternError::InvalidParameterName("".into()))]
	#[case("/users/{1st}", PatternError::InvalidParameterName("1st".into()))]
	#[case("users/{id}", PatternError::MissingLeadingSlash)]
	#[case("", PatternError::MissingLeadingSlash)]
	#[case("/files/x{...path}", PatternError::WildcardInMixedSegment("path".into()))]
	#[case("/files/{a}{b}", PatternError::AdjacentParameters("a".into(), "b".into()))]
	#[case("/users/{id}/posts/{id}", PatternError::DuplicateParameter("id".into()))]
	fn test_path_rejections(#[case] template: &str, #[case] expected: PatternError) {
		assert_eq!(PathPattern::parse(template).unwrap_err(), expected);
	}

	#[test]
	fn test_rule_order_asterisk_before_colon() {
		assert_eq!(
			PathPattern::parse("x:*").unwrap_err(),
			PatternError::Asterisk
		);
	}

	#[rstest]
	#[case(".example.com", PatternError::DomainSeparator)]
	#[case("example.com.", PatternError::DomainSeparator)]
	#[case("api..example.com", PatternError::EmptyDomainLabel)]
	#[case("example.{...tld}", PatternError::WildcardInDomain("tld".into()))]
	#[case("api.example.com:8080", PatternError::Colon)]
	#[case("{a}.{a}.com", PatternError::DuplicateParameter("a".into()))]
	fn test_domain_rejections(#[case] template: &str, #[case] expected: PatternError) {
		assert_eq!(DomainPattern::parse(template).unwrap_err(), expected);
	}

	#[test]
	fn test_root_has_no_segments() {
		let pattern = PathPattern::parse("/").unwrap();
		assert!(pattern.segments().is_empty());
		assert_eq!(pattern.to_string(), "/");
	}

	#[test]
	fn test_trailing_slash_is_dropped() {
		assert_eq!(
			PathPattern::parse("/users/").unwrap().segments(),
			PathPattern::parse("/users").unwrap().segments()
		);
	}

	#[rstest]
	#[case("/users", SegmentKind::Static)]
	#[case("/{id}", SegmentKind::Param)]
	#[case("/{...rest}", SegmentKind::Wildcard)]
	#[case("/@{scope}", SegmentKind::Mixed)]
	#[case("/{id}.{ext}", SegmentKind::Mixed)]
	fn test_segment_kind(#[case] template: &str, #[case] kind: SegmentKind) {
		let pattern = PathPattern::parse(template).unwrap();
		assert_eq!(pattern.segments()[0].kind(), kind);
	}

	#[test]
	fn test_mixed_parts() {
		let pattern = PathPattern::parse("/{id},name={name}.txt").unwrap();
		assert_eq!(
			pattern.segments()[0].parts(),
			[
				Part::Param("id".into()),
				Part::Literal(",name=".into()),
				Part::Param("name".into()),
				Part::Literal(".txt".into()),
			]
		);
	}

	#[rstest]
	#[case("/@{scope}", "@waypost", Some(vec!["waypost"]))]
	#[case("/@{scope}", "@", None)]
	#[case("/@{scope}", "waypost", None)]
	#[case("/{id}.{ext}", "archive.tar.gz", Some(vec!["archive", "tar.gz"]))]
	#[case("/{id}.{ext}", "readme", None)]
	#[case("/{id}.{ext}", ".hidden", None)]
	#[case("/{id},name={name}.txt", "7,name=report.txt", Some(vec!["7", "report"]))]
	#[case("/{id},name={name}.txt", "7,name=.txt", None)]
	#[case("/v{major}.{minor}", "v1.2", Some(vec!["1", "2"]))]
	fn test_mixed_capture(
		#[case] template: &str,
		#[case] value: &str,
		#[case] expected: Option<Vec<&str>>,
	) {
		let expected = expected.map(|values| values.into_iter().map(String::from).collect());
		assert_eq!(capture(template, value), expected);
	}

	#[test]
	fn test_mixed_capture_backtracks() {
		// The first "-" is not followed by "b", so `a` has to grow past it
		assert_eq!(
			capture("/{a}-b{c}", "x-y-bz"),
			Some(vec!["x-y".to_string(), "z".to_string()])
		);
		assert_eq!(capture("/{a}-{b}", "x-"), None);
		assert_eq!(
			capture("/{a}-{b}.z", "a-b-c.z"),
			Some(vec!["a".to_string(), "b-c".to_string()])
		);
	}

	#[test]
	fn test_path_literals_are_percent_decoded() {
		let pattern = PathPattern::parse("/caf%C3%A9/{id}.tar%2Egz").unwrap();
		assert_eq!(pattern.segments()[0].literal(), Some("café"));
		assert_eq!(
			pattern.segments()[1].parts(),
			[Part::Param("id".into()), Part::Literal(".tar.gz".into())]
		);
		assert_eq!(pattern.as_str(), "/caf%C3%A9/{id}.tar%2Egz");
	}

	#[test]
	fn test_domain_literals_lowercased() {
		let domain = DomainPattern::parse("  API.Example.COM ").unwrap();
		assert_eq!(domain.labels()[0].literal(), Some("api"));
		assert_eq!(domain.as_str(), "API.Example.COM");
	}

	#[rstest]
	#[case("/api", Ok(()))]
	#[case("/teams/{team}", Ok(()))]
	#[case("/assets/{...path}", Err(PatternError::WildcardInPrefix("path".into())))]
	#[case("/v{version}", Err(PatternError::MixedSegmentInPrefix("v{version}".into())))]
	#[case("/{a}.{b}", Err(PatternError::MixedSegmentInPrefix("{a}.{b}".into())))]
	#[case("/teams/{team}/@{scope}", Err(PatternError::MixedSegmentInPrefix("@{scope}".into())))]
	fn test_validate_prefix(#[case] prefix: &str, #[case] expected: Result<(), PatternError>) {
		assert_eq!(PathPattern::validate_prefix(prefix), expected);
	}

	#[test]
	fn test_same_shape_ignores_names() {
		let a = PathPattern::parse("/{id}.json").unwrap();
		let b = PathPattern::parse("/{slug}.json").unwrap();
		let c = PathPattern::parse("/{slug}.xml").unwrap();
		assert!(a.segments()[0].same_shape(&b.segments()[0]));
		assert!(!a.segments()[0].same_shape(&c.segments()[0]));
	}
}

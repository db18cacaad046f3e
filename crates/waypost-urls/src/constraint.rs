//! Parameter format constraints.
//!
//! Constraints never influence which route is selected. They run after the
//! matcher has picked a structural candidate and can only reject it.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Predicate over a raw captured value.
pub type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Built-in formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFormat {
	/// ASCII digits only
	Numeric,
	/// ASCII letters and digits only
	Alphanumeric,
	/// Hyphenated UUID, any version
	Uuid,
	/// Crockford base32 ULID
	Ulid,
}

impl BuiltinFormat {
	pub fn name(&self) -> &'static str {
		match self {
			BuiltinFormat::Numeric => "numeric",
			BuiltinFormat::Alphanumeric => "alphanumeric",
			BuiltinFormat::Uuid => "uuid",
			BuiltinFormat::Ulid => "ulid",
		}
	}

	pub fn check(&self, value: &str) -> bool {
		match self {
			BuiltinFormat::Numeric => {
				!value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
			}
			BuiltinFormat::Alphanumeric => {
				!value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric())
			}
			BuiltinFormat::Uuid => value.len() == 36 && uuid::Uuid::parse_str(value).is_ok(),
			BuiltinFormat::Ulid => ulid::Ulid::from_string(value).is_ok(),
		}
	}
}

impl FromStr for BuiltinFormat {
	type Err = String;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		match name {
			"numeric" => Ok(BuiltinFormat::Numeric),
			"alphanumeric" => Ok(BuiltinFormat::Alphanumeric),
			"uuid" => Ok(BuiltinFormat::Uuid),
			"ulid" => Ok(BuiltinFormat::Ulid),
			other => Err(format!("unknown format '{}'", other)),
		}
	}
}

/// A declared constraint on one parameter.
#[derive(Clone)]
pub enum Constraint {
	Builtin(BuiltinFormat),
	/// Regular expression the whole value must match
	Pattern(String),
	Predicate(Predicate),
}

impl Constraint {
	pub fn numeric() -> Self {
		Constraint::Builtin(BuiltinFormat::Numeric)
	}

	pub fn alphanumeric() -> Self {
		Constraint::Builtin(BuiltinFormat::Alphanumeric)
	}

	pub fn uuid() -> Self {
		Constraint::Builtin(BuiltinFormat::Uuid)
	}

	pub fn ulid() -> Self {
		Constraint::Builtin(BuiltinFormat::Ulid)
	}

	/// A regular expression, implicitly anchored at both ends.
	pub fn pattern(pattern: impl Into<String>) -> Self {
		Constraint::Pattern(pattern.into())
	}

	/// Arbitrary check over the raw value
	///
	/// # Examples
	///
	/// ```
	/// use waypost_urls::Constraint;
	///
	/// let even = Constraint::predicate(|value| {
	///     value.parse::<u32>().is_ok_and(|n| n % 2 == 0)
	/// });
	/// # let _ = even;
	/// ```
	pub fn predicate<F>(check: F) -> Self
	where
		F: Fn(&str) -> bool + Send + Sync + 'static,
	{
		Constraint::Predicate(Arc::new(check))
	}

	pub(crate) fn compile(&self) -> Result<Validator, regex::Error> {
		let validator = match self {
			Constraint::Builtin(format) => Validator::Builtin(*format),
			Constraint::Pattern(pattern) => {
				Validator::Pattern(Regex::new(&format!("^(?:{})$", pattern))?)
			}
			Constraint::Predicate(check) => Validator::Predicate(Arc::clone(check)),
		};
		Ok(validator)
	}
}

/// A built-in format name, or otherwise a regular expression.
impl From<&str> for Constraint {
	fn from(value: &str) -> Self {
		match value.parse::<BuiltinFormat>() {
			Ok(format) => Constraint::Builtin(format),
			Err(_) => Constraint::Pattern(value.to_string()),
		}
	}
}

impl From<BuiltinFormat> for Constraint {
	fn from(format: BuiltinFormat) -> Self {
		Constraint::Builtin(format)
	}
}

impl fmt::Debug for Constraint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Constraint::Builtin(format) => f.debug_tuple("Builtin").field(format).finish(),
			Constraint::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
			Constraint::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

#[derive(Clone)]
pub(crate) enum Validator {
	Builtin(BuiltinFormat),
	Pattern(Regex),
	Predicate(Predicate),
}

impl Validator {
	fn check(&self, value: &str) -> bool {
		match self {
			Validator::Builtin(format) => format.check(value),
			Validator::Pattern(regex) => regex.is_match(value),
			Validator::Predicate(check) => check(value),
		}
	}
}

/// Why a matched route was rejected by its constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
	/// A required constraint names a parameter the route did not capture
	Missing(String),
	/// A captured value failed its validator
	Invalid(String),
}

/// Compiled constraints of one route.
#[derive(Clone, Default)]
pub struct RouteConstraints {
	required: Vec<(String, Validator)>,
	optional: Vec<(String, Validator)>,
}

impl RouteConstraints {
	/// Compile required (`format`) and optional (`parameter_pattern`)
	/// constraints. On failure returns the offending parameter name.
	pub(crate) fn compile(
		required: &BTreeMap<String, Constraint>,
		optional: &BTreeMap<String, Constraint>,
	) -> Result<Self, (String, regex::Error)> {
		let compile_all = |entries: &BTreeMap<String, Constraint>| {
			entries
				.iter()
				.map(|(name, constraint)| {
					constraint
						.compile()
						.map(|validator| (name.clone(), validator))
						.map_err(|err| (name.clone(), err))
				})
				.collect::<Result<Vec<_>, _>>()
		};
		Ok(Self {
			required: compile_all(required)?,
			optional: compile_all(optional)?,
		})
	}

	pub fn is_empty(&self) -> bool {
		self.required.is_empty() && self.optional.is_empty()
	}

	/// Parameters that must be captured and valid.
	pub fn required(&self) -> impl Iterator<Item = &str> {
		self.required.iter().map(|(name, _)| name.as_str())
	}

	/// Parameters validated only when captured.
	pub fn optional(&self) -> impl Iterator<Item = &str> {
		self.optional.iter().map(|(name, _)| name.as_str())
	}

	/// Check captured parameters.
	///
	/// Every required entry must name a captured parameter whose value passes.
	/// Optional entries apply only to parameters this route captured.
	pub fn check(&self, params: &HashMap<String, String>) -> Result<(), ConstraintViolation> {
		for (name, validator) in &self.required {
			match params.get(name) {
				None => return Err(ConstraintViolation::Missing(name.clone())),
				Some(value) if !validator.check(value) => {
					return Err(ConstraintViolation::Invalid(name.clone()));
				}
				Some(_) => {}
			}
		}
		for (name, validator) in &self.optional {
			if let Some(value) = params.get(name)
				&& !validator.check(value)
			{
				return Err(ConstraintViolation::Invalid(name.clone()));
			}
		}
		Ok(())
	}
}

impl fmt::Debug for RouteConstraints {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteConstraints")
			.field("required", &self.required().collect::<Vec<_>>())
			.field("optional", &self.optional().collect::<Vec<_>>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	fn constraints(
		required: &[(&str, Constraint)],
		optional: &[(&str, Constraint)],
	) -> RouteConstraints {
		let to_map = |entries: &[(&str, Constraint)]| {
			entries
				.iter()
				.map(|(name, c)| (name.to_string(), c.clone()))
				.collect::<BTreeMap<_, _>>()
		};
		RouteConstraints::compile(&to_map(required), &to_map(optional)).unwrap()
	}

	#[rstest]
	#[case(BuiltinFormat::Numeric, "123", true)]
	#[case(BuiltinFormat::Numeric, "12a", false)]
	#[case(BuiltinFormat::Numeric, "", false)]
	#[case(BuiltinFormat::Numeric, "-1", false)]
	#[case(BuiltinFormat::Alphanumeric, "abc123", true)]
	#[case(BuiltinFormat::Alphanumeric, "abc-123", false)]
	#[case(BuiltinFormat::Uuid, "67e55044-10b1-426f-9247-bb680e5fe0c8", true)]
	#[case(BuiltinFormat::Uuid, "67e5504410b1426f9247bb680e5fe0c8", false)]
	#[case(BuiltinFormat::Uuid, "not-a-uuid", false)]
	#[case(BuiltinFormat::Ulid, "01ARZ3NDEKTSV4RRFFQ69G5FAV", true)]
	#[case(BuiltinFormat::Ulid, "01ARZ3NDEKTSV4RRFFQ69G5FA", false)]
	fn test_builtin_formats(
		#[case] format: BuiltinFormat,
		#[case] value: &str,
		#[case] expected: bool,
	) {
		assert_eq!(format.check(value), expected);
	}

	#[rstest]
	#[case("numeric", "Builtin(Numeric)")]
	#[case("uuid", "Builtin(Uuid)")]
	#[case("[a-z]+", "Pattern(\"[a-z]+\")")]
	fn test_from_str(#[case] input: &str, #[case] debug: &str) {
		assert_eq!(format!("{:?}", Constraint::from(input)), debug);
	}

	#[test]
	fn test_pattern_is_anchored() {
		let set = constraints(&[("slug", Constraint::pattern("[a-z]+"))], &[]);
		assert!(set.check(&params(&[("slug", "hello")])).is_ok());
		assert_eq!(
			set.check(&params(&[("slug", "hello-world")])),
			Err(ConstraintViolation::Invalid("slug".into()))
		);
	}

	#[test]
	fn test_alternation_is_anchored_as_a_whole() {
		let set = constraints(&[("kind", Constraint::pattern("a|b"))], &[]);
		assert!(set.check(&params(&[("kind", "b")])).is_ok());
		assert!(set.check(&params(&[("kind", "ab")])).is_err());
	}

	#[test]
	fn test_required_missing_parameter_fails_closed() {
		let set = constraints(&[("id", Constraint::numeric())], &[]);
		assert_eq!(
			set.check(&params(&[("slug", "x")])),
			Err(ConstraintViolation::Missing("id".into()))
		);
	}

	#[test]
	fn test_optional_applies_only_when_captured() {
		let set = constraints(&[], &[("id", Constraint::numeric())]);
		assert!(set.check(&params(&[("slug", "x")])).is_ok());
		assert!(set.check(&params(&[("id", "12")])).is_ok());
		assert_eq!(
			set.check(&params(&[("id", "x")])),
			Err(ConstraintViolation::Invalid("id".into()))
		);
	}

	#[test]
	fn test_predicate() {
		let set = constraints(
			&[("n", Constraint::predicate(|v| v.len() == 3))],
			&[],
		);
		assert!(set.check(&params(&[("n", "abc")])).is_ok());
		assert!(set.check(&params(&[("n", "ab")])).is_err());
	}

	#[test]
	fn test_invalid_regex_reports_parameter() {
		let required = BTreeMap::from([("id".to_string(), Constraint::pattern("("))]);
		let (name, _) = RouteConstraints::compile(&required, &BTreeMap::new()).err().unwrap();
		assert_eq!(name, "id");
	}
}

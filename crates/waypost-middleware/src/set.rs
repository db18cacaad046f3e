//! Middleware set: ordered inclusions plus exclusions.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use waypost_di::{Container, ResolveError};
use waypost_http::Handler;

use crate::Pipeline;

/// Reference to a middleware, resolved through the container per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MiddlewareRef(Arc<str>);

impl MiddlewareRef {
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(Arc::from(name.as_ref()))
	}

	pub fn name(&self) -> &str {
		&self.0
	}
}

impl From<&str> for MiddlewareRef {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for MiddlewareRef {
	fn from(name: String) -> Self {
		Self(Arc::from(name))
	}
}

impl fmt::Display for MiddlewareRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Ordered, duplicate-free inclusion list and exclusion set of one route
/// (possibly shared by sibling routes of the same group).
///
/// Mutated only while routes are being composed; read-only once the router
/// is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiddlewareSet {
	include: Vec<MiddlewareRef>,
	exclude: HashSet<MiddlewareRef>,
	priority_applied: bool,
}

impl MiddlewareSet {
	/// Build a set from one level's `middleware` / `withoutMiddleware` lists.
	/// Duplicate inclusions keep their first position.
	pub fn new<I, E>(include: I, exclude: E) -> Self
	where
		I: IntoIterator,
		I::Item: Into<MiddlewareRef>,
		E: IntoIterator,
		E::Item: Into<MiddlewareRef>,
	{
		let mut set = Self::default();
		for entry in include {
			let entry = entry.into();
			if !set.include.contains(&entry) {
				set.include.push(entry);
			}
		}
		set.exclude = exclude.into_iter().map(Into::into).collect();
		set
	}

	/// Entries in execution order.
	pub fn include(&self) -> &[MiddlewareRef] {
		&self.include
	}

	pub fn excludes(&self, entry: &MiddlewareRef) -> bool {
		self.exclude.contains(entry)
	}

	pub fn exclusions(&self) -> impl Iterator<Item = &MiddlewareRef> {
		self.exclude.iter()
	}

	pub fn is_empty(&self) -> bool {
		self.include.is_empty() && self.exclude.is_empty()
	}

	pub fn priority_applied(&self) -> bool {
		self.priority_applied
	}

	/// Merge one enclosing group level into this set.
	///
	/// The group's exclusions join this set's exclusions first. The group's
	/// inclusions are then prepended, minus every entry now excluded, unless
	/// that same group level both includes and excludes it (a same-level
	/// re-add). Entries already present keep the ancestor position.
	///
	/// Called innermost group first, so exclusions collected from descendants
	/// filter what ancestors contribute, while entries a descendant listed
	/// itself are never removed.
	///
	/// # Examples
	///
	/// ```
	/// use waypost_middleware::{MiddlewareRef, MiddlewareSet};
	///
	/// // Route re-includes `a`
	/// let mut set = MiddlewareSet::new(["a"], Vec::<&str>::new());
	/// // Nested group: withoutMiddleware a
	/// set.merge_with_group(&[], &["a".into()]);
	/// // Outer group: middleware [a, b]
	/// set.merge_with_group(&["a".into(), "b".into()], &[]);
	///
	/// let order: Vec<&str> = set.include().iter().map(MiddlewareRef::name).collect();
	/// assert_eq!(order, ["b", "a"]);
	/// ```
	pub fn merge_with_group(
		&mut self,
		group_include: &[MiddlewareRef],
		group_exclude: &[MiddlewareRef],
	) {
		self.exclude.extend(group_exclude.iter().cloned());

		let mut merged: Vec<MiddlewareRef> =
			Vec::with_capacity(group_include.len() + self.include.len());
		for entry in group_include {
			let excluded = self.exclude.contains(entry) && !group_exclude.contains(entry);
			if !excluded && !merged.contains(entry) {
				merged.push(entry.clone());
			}
		}
		for entry in self.include.drain(..) {
			if !merged.contains(&entry) {
				merged.push(entry);
			}
		}
		self.include = merged;
	}

	/// Move entries named in `priority` to the front, in priority order; the
	/// rest keep their relative order behind them.
	///
	/// Only the first call has any effect. Returns whether this call
	/// reordered the set.
	pub fn apply_priority(&mut self, priority: &[MiddlewareRef]) -> bool {
		if self.priority_applied {
			return false;
		}
		self.priority_applied = true;

		let mut ordered: Vec<MiddlewareRef> = Vec::with_capacity(self.include.len());
		for entry in priority {
			if self.include.contains(entry) && !ordered.contains(entry) {
				ordered.push(entry.clone());
			}
		}
		ordered.extend(
			self.include
				.iter()
				.filter(|entry| !priority.contains(entry))
				.cloned(),
		);
		self.include = ordered;
		true
	}

	/// Resolve every included middleware and wrap them, in order, around
	/// `handler`.
	///
	/// # Errors
	///
	/// Fails if any reference is unknown to the container.
	pub fn build_pipeline(
		&self,
		container: &dyn Container,
		handler: Arc<dyn Handler>,
	) -> Result<Arc<dyn Handler>, ResolveError> {
		let mut pipeline = Pipeline::new(handler);
		for entry in &self.include {
			pipeline.add_middleware(container.resolve_middleware(entry.name())?);
		}
		Ok(pipeline.build())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn refs(names: &[&str]) -> Vec<MiddlewareRef> {
		names.iter().map(|name| MiddlewareRef::new(name)).collect()
	}

	fn names(set: &MiddlewareSet) -> Vec<&str> {
		set.include().iter().map(MiddlewareRef::name).collect()
	}

	#[test]
	fn test_new_deduplicates_keeping_first() {
		let set = MiddlewareSet::new(["a", "b", "a"], ["c"]);
		assert_eq!(names(&set), ["a", "b"]);
		assert!(set.excludes(&"c".into()));
	}

	#[test]
	fn test_group_entries_run_before_route_entries() {
		let mut set = MiddlewareSet::new(["route"], Vec::<&str>::new());
		set.merge_with_group(&refs(&["inner"]), &[]);
		set.merge_with_group(&refs(&["outer1", "outer2"]), &[]);
		assert_eq!(names(&set), ["outer1", "outer2", "inner", "route"]);
	}

	#[test]
	fn test_descendant_exclusion_filters_ancestor() {
		let mut set = MiddlewareSet::new(Vec::<&str>::new(), ["csrf"]);
		set.merge_with_group(&refs(&["session", "csrf"]), &[]);
		assert_eq!(names(&set), ["session"]);
	}

	#[test]
	fn test_same_level_include_and_exclude_keeps_entry() {
		let mut set = MiddlewareSet::default();
		set.merge_with_group(&refs(&["auth"]), &refs(&["auth"]));
		assert_eq!(names(&set), ["auth"]);
		assert!(set.excludes(&"auth".into()));
	}

	#[test]
	fn test_group_reinclusion_moves_ancestor_copy_out() {
		// Inner group excludes and re-adds `auth`, outer group includes it
		let mut set = MiddlewareSet::new(["audit"], Vec::<&str>::new());
		set.merge_with_group(&refs(&["auth"]), &refs(&["auth"]));
		set.merge_with_group(&refs(&["auth", "session"]), &[]);
		assert_eq!(names(&set), ["session", "auth", "audit"]);
	}

	#[test]
	fn test_duplicate_keeps_ancestor_position() {
		let mut set = MiddlewareSet::new(["b", "a"], Vec::<&str>::new());
		set.merge_with_group(&refs(&["a"]), &[]);
		assert_eq!(names(&set), ["a", "b"]);
	}

	#[rstest]
	#[case(&["x", "y", "z"], &["z", "x"], &["z", "x", "y"])]
	#[case(&["x", "y", "z"], &[], &["x", "y", "z"])]
	#[case(&["x", "y"], &["missing", "y"], &["y", "x"])]
	#[case(&["a", "b", "c", "d"], &["d", "b"], &["d", "b", "a", "c"])]
	fn test_apply_priority(
		#[case] include: &[&str],
		#[case] priority: &[&str],
		#[case] expected: &[&str],
	) {
		let mut set = MiddlewareSet::new(include.iter().copied(), Vec::<&str>::new());
		assert!(set.apply_priority(&refs(priority)));
		assert_eq!(names(&set), expected);
	}

	#[test]
	fn test_apply_priority_runs_once() {
		let mut set = MiddlewareSet::new(["a", "b"], Vec::<&str>::new());
		assert!(set.apply_priority(&refs(&["b"])));
		assert!(!set.apply_priority(&refs(&["a"])));
		assert_eq!(names(&set), ["b", "a"]);
		assert!(set.priority_applied());
	}
}

//! `[routing]` settings table.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Error type for settings loading
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid setting '{key}': {message}")]
	Invalid { key: String, message: String },
}

/// Router-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingSettings {
	/// Middleware names moved to the front of every route's chain, in this
	/// order. Applied once per middleware set when the router is built.
	pub middleware_priority: Vec<String>,

	/// Drop a `:port` suffix from the request hostname before domain matching.
	pub strip_host_port: bool,
}

impl Default for RoutingSettings {
	fn default() -> Self {
		Self {
			middleware_priority: Vec::new(),
			strip_host_port: true,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
	#[serde(default)]
	routing: RoutingSettings,
}

impl RoutingSettings {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the middleware priority list
	///
	/// # Examples
	///
	/// ```
	/// use waypost_conf::RoutingSettings;
	///
	/// let settings = RoutingSettings::new().with_middleware_priority(["auth"]);
	/// assert_eq!(settings.middleware_priority, ["auth"]);
	/// ```
	pub fn with_middleware_priority<I, S>(mut self, priority: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.middleware_priority = priority.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_strip_host_port(mut self, strip: bool) -> Self {
		self.strip_host_port = strip;
		self
	}

	/// Parse settings from TOML text. A missing `[routing]` table yields the
	/// defaults; unknown keys inside it are rejected.
	///
	/// # Errors
	///
	/// Returns [`SettingsError::Toml`] on malformed input and
	/// [`SettingsError::Invalid`] when the priority list names a middleware
	/// twice or contains an empty name.
	pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
		let file: SettingsFile = toml::from_str(content)?;
		file.routing.validate()?;
		Ok(file.routing)
	}

	/// Read and parse a TOML settings file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let content = fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	fn validate(&self) -> Result<(), SettingsError> {
		for (index, name) in self.middleware_priority.iter().enumerate() {
			if name.trim().is_empty() {
				return Err(SettingsError::Invalid {
					key: "middleware_priority".to_string(),
					message: format!("entry {} is empty", index),
				});
			}
			if self.middleware_priority[..index].contains(name) {
				return Err(SettingsError::Invalid {
					key: "middleware_priority".to_string(),
					message: format!("'{}' is listed more than once", name),
				});
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn test_defaults() {
		let settings = RoutingSettings::default();
		assert!(settings.middleware_priority.is_empty());
		assert!(settings.strip_host_port);
	}

	#[test]
	fn test_missing_table_uses_defaults() {
		let settings = RoutingSettings::from_toml_str("[database]\nurl = \"x\"\n").unwrap();
		assert_eq!(settings, RoutingSettings::default());
	}

	#[test]
	fn test_partial_table_keeps_other_defaults() {
		let settings =
			RoutingSettings::from_toml_str("[routing]\nstrip_host_port = false\n").unwrap();
		assert!(!settings.strip_host_port);
		assert!(settings.middleware_priority.is_empty());
	}

	#[rstest]
	#[case("[routing]\nmiddleware_priority = [\"a\", \"a\"]\n")]
	#[case("[routing]\nmiddleware_priority = [\" \"]\n")]
	fn test_invalid_priority_list(#[case] content: &str) {
		let err = RoutingSettings::from_toml_str(content).unwrap_err();
		assert!(matches!(err, SettingsError::Invalid { ref key, .. } if key == "middleware_priority"));
	}

	#[test]
	fn test_unknown_key_rejected() {
		let err = RoutingSettings::from_toml_str("[routing]\ntrailing_slash = true\n").unwrap_err();
		assert!(matches!(err, SettingsError::Toml(_)));
	}
}

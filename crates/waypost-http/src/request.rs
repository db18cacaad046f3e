//! Request value consumed by the router.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use std::collections::HashMap;

use crate::{Error, Extensions, Result};

/// Request representation.
///
/// The router reads `method`, [`Request::path`] and [`Request::host`]; after
/// a match the dispatcher fills `path_params` with the decoded captures.
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Parameters captured from the domain and path patterns
	pub path_params: HashMap<String, String>,
	pub extensions: Extensions,
}

impl Request {
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap, body: Bytes) -> Self {
		Self {
			method,
			uri,
			version,
			headers,
			body,
			path_params: HashMap::new(),
			extensions: Extensions::new(),
		}
	}

	/// Start building a request.
	///
	/// # Examples
	///
	/// ```
	/// use waypost_http::Request;
	/// use http::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/users")
	///     .header("host", "api.example.com")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.path(), "/users");
	/// assert_eq!(request.host(), Some("api.example.com"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Raw (still percent-encoded) request path.
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Hostname from the `Host` header, falling back to the URI authority.
	///
	/// The value is returned as sent; a `:port` suffix is not removed here.
	pub fn host(&self) -> Option<&str> {
		self.headers
			.get(http::header::HOST)
			.and_then(|value| value.to_str().ok())
			.or_else(|| self.uri.host())
	}

	/// A captured route parameter, percent-decoded.
	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(String::as_str)
	}

	pub fn set_path_params(&mut self, params: HashMap<String, String>) {
		self.path_params = params;
	}
}

impl std::fmt::Debug for Request {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Request")
			.field("method", &self.method)
			.field("uri", &self.uri)
			.field("path_params", &self.path_params)
			.finish_non_exhaustive()
	}
}

/// Builder for [`Request`].
#[derive(Default)]
pub struct RequestBuilder {
	method: Method,
	uri: Option<String>,
	version: Version,
	headers: Vec<(String, String)>,
	body: Bytes,
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = Some(uri.into());
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = version;
		self
	}

	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Validate the URI and headers and produce the request.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidRequest`] when the URI or a header does not parse.
	pub fn build(self) -> Result<Request> {
		let uri = match self.uri {
			Some(raw) => raw
				.parse::<Uri>()
				.map_err(|e| Error::InvalidRequest(format!("uri '{}': {}", raw, e)))?,
			None => Uri::from_static("/"),
		};

		let mut headers = HeaderMap::new();
		for (name, value) in self.headers {
			let header_name = HeaderName::from_bytes(name.as_bytes())
				.map_err(|e| Error::InvalidRequest(format!("header name '{}': {}", name, e)))?;
			let header_value = HeaderValue::from_str(&value)
				.map_err(|e| Error::InvalidRequest(format!("header '{}': {}", name, e)))?;
			headers.append(header_name, header_value);
		}

		Ok(Request::new(
			self.method,
			uri,
			self.version,
			headers,
			self.body,
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_defaults() {
		let request = Request::builder().build().unwrap();
		assert_eq!(request.method, Method::GET);
		assert_eq!(request.path(), "/");
		assert_eq!(request.host(), None);
	}

	#[test]
	fn test_host_falls_back_to_authority() {
		let request = Request::builder()
			.uri("http://shop.example.com:8080/cart")
			.build()
			.unwrap();
		assert_eq!(request.host(), Some("shop.example.com"));
		assert_eq!(request.path(), "/cart");
	}

	#[test]
	fn test_host_header_wins_over_authority() {
		let request = Request::builder()
			.uri("http://internal/cart")
			.header("Host", "shop.example.com:8443")
			.build()
			.unwrap();
		assert_eq!(request.host(), Some("shop.example.com:8443"));
	}

	#[test]
	fn test_invalid_uri_is_rejected() {
		let result = Request::builder().uri("http://[::1").build();
		assert!(matches!(result, Err(Error::InvalidRequest(_))));
	}

	#[test]
	fn test_path_params() {
		let mut request = Request::builder().uri("/users/42").build().unwrap();
		request.set_path_params(HashMap::from([("id".to_string(), "42".to_string())]));
		assert_eq!(request.path_param("id"), Some("42"));
		assert_eq!(request.path_param("slug"), None);
	}
}

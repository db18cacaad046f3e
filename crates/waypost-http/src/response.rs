use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

use crate::Result;

/// HTTP Response representation
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use waypost_http::Response;
	/// use http::StatusCode;
	///
	/// let response = Response::new(StatusCode::ACCEPTED);
	/// assert_eq!(response.status, StatusCode::ACCEPTED);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// The fixed response produced when no route matches.
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	pub fn with_status(mut self, status: StatusCode) -> Self {
		self.status = status;
		self
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a header, silently skipping names or values that are not valid
	/// header syntax.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) = (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			self.headers.insert(name, value);
		}
		self
	}

	/// Serialize `value` as the JSON body and set `content-type`.
	///
	/// # Examples
	///
	/// ```
	/// use waypost_http::Response;
	///
	/// let response = Response::ok().with_json(&serde_json::json!({"id": 1})).unwrap();
	/// assert_eq!(&response.body[..], br#"{"id":1}"#);
	/// assert_eq!(response.headers["content-type"], "application/json");
	/// ```
	pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self> {
		let body = serde_json::to_vec(value)?;
		Ok(self
			.with_header("content-type", "application/json")
			.with_body(body))
	}
}

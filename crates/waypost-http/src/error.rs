//! Dispatch-time error type.

use http::StatusCode;
use thiserror::Error;

/// Errors raised while a request travels through middleware and handlers.
///
/// Routing misses are not errors: they surface as a 404 [`crate::Response`].
#[derive(Debug, Error)]
pub enum Error {
	/// Unexpected failure inside a handler or middleware
	#[error("Internal error: {0}")]
	Internal(String),

	/// An error that maps onto a specific HTTP status
	#[error("HTTP {status}: {message}")]
	Http { status: StatusCode, message: String },

	/// A request value could not be built
	#[error("Invalid request: {0}")]
	InvalidRequest(String),

	/// A handler, middleware or controller reference could not be resolved
	#[error("Resolution error: {0}")]
	Resolve(String),

	/// A controller was asked to run an action it does not implement
	#[error("Unknown controller action: {0}")]
	UnknownAction(String),

	/// JSON body (de)serialization failed
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl Error {
	/// Status code an error-page renderer would use for this error.
	pub fn status(&self) -> StatusCode {
		match self {
			Error::Http { status, .. } => *status,
			Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
			Error::UnknownAction(_) => StatusCode::NOT_FOUND,
			Error::Internal(_) | Error::Resolve(_) | Error::Serialization(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Error::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
	#[case(Error::InvalidRequest("bad uri".into()), StatusCode::BAD_REQUEST)]
	#[case(Error::UnknownAction("purge".into()), StatusCode::NOT_FOUND)]
	#[case(
		Error::Http { status: StatusCode::FORBIDDEN, message: "nope".into() },
		StatusCode::FORBIDDEN
	)]
	fn test_error_status(#[case] error: Error, #[case] expected: StatusCode) {
		assert_eq!(error.status(), expected);
	}

	#[test]
	fn test_error_display() {
		let error = Error::Resolve("middleware 'auth' is not registered".into());
		assert_eq!(
			error.to_string(),
			"Resolution error: middleware 'auth' is not registered"
		);
	}
}

//! # Waypost HTTP
//!
//! Value types and capability traits shared by every waypost crate.
//!
//! - [`Request`] / [`Response`]: the request and response values the routing
//!   core consumes and produces
//! - [`Handler`]: the single capability every route endpoint exposes
//! - [`Middleware`]: cross-cutting processing wrapped around a handler
//! - [`Controller`]: resource controllers dispatched by action name
//!
//! ## Handler
//!
//! ```rust
//! use waypost_http::{Handler, Request, Response, Result};
//! use async_trait::async_trait;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     async fn handle(&self, _request: Request) -> Result<Response> {
//!         Ok(Response::ok().with_body("hello"))
//!     }
//! }
//! ```
//!
//! ## Middleware
//!
//! ```rust
//! use waypost_http::{Handler, Middleware, Request, Response, Result};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Timing;
//!
//! #[async_trait]
//! impl Middleware for Timing {
//!     async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
//!         next.handle(request).await
//!     }
//! }
//! ```

pub mod error;
pub mod extensions;
pub mod handler;
pub mod request;
pub mod response;

pub use error::{Error, Result};
pub use extensions::Extensions;
pub use handler::{Controller, FunctionHandler, Handler, Middleware, handler_fn};
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-exported so downstream crates agree on one `http` version
pub use http::{HeaderMap, Method, StatusCode, Uri, Version};

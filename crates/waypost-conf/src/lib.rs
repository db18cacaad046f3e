//! # Waypost Conf
//!
//! Settings consumed by the router at build time.
//!
//! Settings live under a `[routing]` table so they can share a file with the
//! rest of an application's configuration:
//!
//! ```toml
//! [routing]
//! middleware_priority = ["session", "auth"]
//! strip_host_port = true
//! ```
//!
//! ```rust
//! use waypost_conf::RoutingSettings;
//!
//! let settings = RoutingSettings::from_toml_str(
//!     r#"
//!     [routing]
//!     middleware_priority = ["session", "auth"]
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(settings.middleware_priority, ["session", "auth"]);
//! assert!(settings.strip_host_port);
//! ```

pub mod routing;

pub use routing::{RoutingSettings, SettingsError};

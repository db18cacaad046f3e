//! Name-keyed component registry.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use waypost_http::{Controller, Handler, Middleware};

use crate::{ComponentKind, Container, ResolveError};

/// Lifetime of a resolved component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
	/// A fresh instance for every resolution (once per request)
	Request,
	/// Built on first resolution, then shared by every request
	Singleton,
}

type Factory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

struct Provider<T: ?Sized> {
	scope: Scope,
	factory: Factory<T>,
	instance: OnceLock<Arc<T>>,
}

impl<T: ?Sized> Provider<T> {
	fn new(scope: Scope, factory: Factory<T>) -> Self {
		Self {
			scope,
			factory,
			instance: OnceLock::new(),
		}
	}

	fn get(&self) -> Arc<T> {
		match self.scope {
			Scope::Request => (self.factory)(),
			Scope::Singleton => Arc::clone(self.instance.get_or_init(|| (self.factory)())),
		}
	}
}

/// The bundled [`Container`]: factories registered by name.
///
/// Registration is meant to happen during start-up; afterwards the registry
/// is shared immutably (typically behind an `Arc`).
#[derive(Default)]
pub struct ComponentRegistry {
	handlers: HashMap<String, Provider<dyn Handler>>,
	middleware: HashMap<String, Provider<dyn Middleware>>,
	controllers: HashMap<String, Provider<dyn Controller>>,
}

impl ComponentRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_handler<F>(&mut self, name: impl Into<String>, scope: Scope, factory: F) -> &mut Self
	where
		F: Fn() -> Arc<dyn Handler> + Send + Sync + 'static,
	{
		self.handlers
			.insert(name.into(), Provider::new(scope, Arc::new(factory)));
		self
	}

	pub fn register_middleware<F>(
		&mut self,
		name: impl Into<String>,
		scope: Scope,
		factory: F,
	) -> &mut Self
	where
		F: Fn() -> Arc<dyn Middleware> + Send + Sync + 'static,
	{
		self.middleware
			.insert(name.into(), Provider::new(scope, Arc::new(factory)));
		self
	}

	pub fn register_controller<F>(
		&mut self,
		name: impl Into<String>,
		scope: Scope,
		factory: F,
	) -> &mut Self
	where
		F: Fn() -> Arc<dyn Controller> + Send + Sync + 'static,
	{
		self.controllers
			.insert(name.into(), Provider::new(scope, Arc::new(factory)));
		self
	}

	/// Register an already-built middleware shared by all requests.
	pub fn middleware_instance(
		&mut self,
		name: impl Into<String>,
		instance: Arc<dyn Middleware>,
	) -> &mut Self {
		self.register_middleware(name, Scope::Singleton, move || Arc::clone(&instance))
	}

	pub fn contains_middleware(&self, name: &str) -> bool {
		self.middleware.contains_key(name)
	}
}

fn lookup<T: ?Sized>(
	providers: &HashMap<String, Provider<T>>,
	kind: ComponentKind,
	name: &str,
) -> Result<Arc<T>, ResolveError> {
	match providers.get(name) {
		Some(provider) => Ok(provider.get()),
		None => {
			tracing::debug!(%kind, name, "component lookup failed");
			Err(ResolveError::NotRegistered {
				kind,
				name: name.to_string(),
			})
		}
	}
}

impl Container for ComponentRegistry {
	fn resolve_handler(&self, name: &str) -> Result<Arc<dyn Handler>, ResolveError> {
		lookup(&self.handlers, ComponentKind::Handler, name)
	}

	fn resolve_middleware(&self, name: &str) -> Result<Arc<dyn Middleware>, ResolveError> {
		lookup(&self.middleware, ComponentKind::Middleware, name)
	}

	fn resolve_controller(&self, name: &str) -> Result<Arc<dyn Controller>, ResolveError> {
		lookup(&self.controllers, ComponentKind::Controller, name)
	}
}

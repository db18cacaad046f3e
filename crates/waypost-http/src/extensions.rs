//! Typed per-request storage.
//!
//! Middleware and the dispatcher attach values here (for example the matched
//! route) so that later stages can read them without widening [`crate::Request`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Type-keyed extension map. Clones share the same storage.
#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store `value`, replacing any previous value of the same type.
	///
	/// # Examples
	///
	/// ```
	/// use waypost_http::Extensions;
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(7u16);
	/// assert_eq!(extensions.get::<u16>(), Some(7));
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
		let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
		map.insert(TypeId::of::<T>(), Box::new(value));
	}

	/// Clone out the value of type `T`, if present.
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		let map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
		map.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.cloned()
	}

	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		let map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
		map.contains_key(&TypeId::of::<T>())
	}

	/// Take the value of type `T` out of the map.
	pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
		let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
		map.remove(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast::<T>().ok())
			.map(|boxed| *boxed)
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
		f.debug_struct("Extensions")
			.field("len", &map.len())
			.finish()
	}
}

//! Typed side table for attaching services to a buffer.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type Entry = Arc<dyn Any + Send + Sync>;

/// A map from a value's type to a single shared instance of it.
#[derive(Default)]
pub struct PropertyCollection {
	entries: RwLock<HashMap<TypeId, Entry>>,
}

impl PropertyCollection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the `T` stored in the table, creating it with `create` on first use.
	///
	/// `create` runs without the table locked, so it may itself use the table.
	/// If two callers race, the first value stored wins.
	pub fn get_or_create_singleton<T: Any + Send + Sync>(&self, create: impl FnOnce() -> T) -> Arc<T> {
		if let Some(existing) = self.get::<T>() {
			return existing;
		}
		let created: Entry = Arc::new(create());
		let entry = Arc::clone(self.entries.write().entry(TypeId::of::<T>()).or_insert(created));
		downcast(entry)
	}

	pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		let entry = self.entries.read().get(&TypeId::of::<T>()).cloned()?;
		Some(downcast(entry))
	}

	/// Stores `value`, returning the previous `T` if there was one.
	pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<Arc<T>> {
		let previous = self.entries.write().insert(TypeId::of::<T>(), Arc::new(value));
		previous.map(downcast)
	}

	/// Removes the `T`, returning whether one was stored.
	pub fn remove<T: Any + Send + Sync>(&self) -> bool {
		self.entries.write().remove(&TypeId::of::<T>()).is_some()
	}

	pub fn contains<T: Any + Send + Sync>(&self) -> bool {
		self.entries.read().contains_key(&TypeId::of::<T>())
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}

// Entries are keyed by their own TypeId, so the downcast cannot fail.
fn downcast<T: Any + Send + Sync>(entry: Entry) -> Arc<T> {
	match entry.downcast::<T>() {
		Ok(value) => value,
		Err(_) => unreachable!("property keyed by the wrong type"),
	}
}

impl fmt::Debug for PropertyCollection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PropertyCollection").field("len", &self.len()).finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	#[derive(Debug, PartialEq)]
	struct Indent(usize);

	#[test]
	fn singleton_is_created_once() {
		let props = PropertyCollection::new();
		let calls = AtomicUsize::new(0);
		let a = props.get_or_create_singleton(|| {
			calls.fetch_add(1, Ordering::Relaxed);
			Indent(4)
		});
		let b = props.get_or_create_singleton(|| {
			calls.fetch_add(1, Ordering::Relaxed);
			Indent(8)
		});
		assert!(Arc::ptr_eq(&a, &b));
		assert_eq!(*b, Indent(4));
		assert_eq!(calls.load(Ordering::Relaxed), 1);
	}

	#[test]
	fn entries_are_keyed_by_type() {
		let props = PropertyCollection::new();
		props.insert(Indent(2));
		props.insert(String::from("tabs"));
		assert_eq!(props.len(), 2);
		assert_eq!(*props.get::<Indent>().unwrap(), Indent(2));
		assert_eq!(props.get::<String>().unwrap().as_str(), "tabs");
		assert!(props.get::<u32>().is_none());

		assert_eq!(props.insert(Indent(3)).as_deref(), Some(&Indent(2)));
		assert!(props.remove::<Indent>());
		assert!(!props.remove::<Indent>());
		assert!(!props.contains::<Indent>());
	}

	#[test]
	fn create_may_reenter_the_table() {
		let props = PropertyCollection::new();
		let outer = props.get_or_create_singleton(|| {
			let inner = props.get_or_create_singleton(|| Indent(1));
			inner.0 + 1
		});
		assert_eq!(*outer, 2);
		assert!(props.contains::<Indent>());
	}
}

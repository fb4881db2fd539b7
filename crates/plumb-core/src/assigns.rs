//! String-keyed, type-erased storage shared between plugs.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// An open mapping from string keys to values of any type.
///
/// Used for both `assigns` (application data) and `private` (library data)
/// on a [`Conn`](crate::Conn). Values are retrieved by key and type; asking
/// for the wrong type behaves like a missing key.
///
/// # Example
///
/// ```
/// use plumb_core::Assigns;
///
/// let mut assigns = Assigns::new();
/// assigns.insert("user_id", 42_u64);
///
/// assert_eq!(assigns.get::<u64>("user_id"), Some(&42));
/// assert_eq!(assigns.get::<String>("user_id"), None);
/// ```
#[derive(Default)]
pub struct Assigns {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Assigns {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the value stored under `key`.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Returns the value under `key` if it has type `T`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    /// Returns a mutable reference to the value under `key` if it has type `T`.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut())
    }

    /// Removes and returns the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.values
            .remove(key)
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Returns true if any value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the stored keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Assigns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("Assigns").field("keys", &keys).finish()
    }
}

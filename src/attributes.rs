//! Type-keyed attribute storage attached to each session.
//!
//! `SessionAttributes` stores at most one value per concrete type, keyed by
//! `TypeId`. Values live behind `Arc<dyn Any + Send + Sync>` so they can be
//! handed out cheaply and shared between the I/O path and worker tasks.
//! Access goes through `&self`: transports expose the store from a shared
//! session reference.

use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use dashmap::DashMap;

type Attribute = Arc<dyn Any + Send + Sync>;

/// Concurrent per-session attribute map.
///
/// # Examples
///
/// ```
/// use wiregate::SessionAttributes;
///
/// let attributes = SessionAttributes::default();
/// attributes.insert(7u32);
/// assert_eq!(attributes.get::<u32>().as_deref(), Some(&7));
/// ```
#[derive(Default)]
pub struct SessionAttributes {
    values: DashMap<TypeId, Attribute>,
}

impl SessionAttributes {
    /// Insert `value`, replacing any existing attribute of the same type.
    pub fn insert<T>(&self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Return the attribute of type `T`, if present.
    #[must_use]
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| Arc::clone(value.value()).downcast::<T>().ok())
    }

    /// Return the attribute of type `T`, installing `init()` if absent.
    ///
    /// Concurrent callers racing on an absent attribute all observe the same
    /// installed value.
    pub fn get_or_insert_with<T, F>(&self, init: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let entry = self
            .values
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(init()));
        match Arc::clone(entry.value()).downcast::<T>() {
            Ok(value) => value,
            // Keys are derived from the value type, so the downcast cannot miss.
            Err(_) => unreachable!("attribute stored under a foreign TypeId"),
        }
    }

    /// Remove and return the attribute of type `T`.
    pub fn remove<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|(_, value)| value.downcast::<T>().ok())
    }
}

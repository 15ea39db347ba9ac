//! Typed Run Store
//!
//! The store is the only channel through which validation steps share data:
//! earlier steps write entries, later steps read them. Entries are keyed by
//! name, but every access goes through a `StoreKey<T>` constant that fixes
//! the value type, so a misspelled key or a mismatched type is caught at
//! compile time instead of surfacing halfway through a run.
//!
//! # Examples
//! ```ignore
//! pub const MODEL_NAMES: StoreKey<BTreeSet<String>> = StoreKey::new("model_names");
//!
//! let mut store = Store::new();
//! store.insert(MODEL_NAMES, BTreeSet::new());
//! let names = store.require(MODEL_NAMES)?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{CoreError, CoreResult};

type StoreValue = Box<dyn Any + Send + Sync>;

// ============================================================================
// StoreKey
// ============================================================================

/// A named, typed handle to one store entry.
///
/// Keys are meant to be declared once as `const` items and shared by the
/// steps that produce and consume the entry.
pub struct StoreKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StoreKey<T> {
    /// Declare a key with the given entry name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The entry name behind this key.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StoreKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StoreKey<T> {}

impl<T> fmt::Debug for StoreKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreKey").field(&self.name).finish()
    }
}

impl<T> fmt::Display for StoreKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ============================================================================
// StoreUpdates
// ============================================================================

/// A batch of entries produced by one step, merged into the store after the
/// step returns.
#[derive(Default)]
pub struct StoreUpdates {
    entries: Vec<(&'static str, StoreValue)>,
}

impl StoreUpdates {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add an entry.
    pub fn with<T: Any + Send + Sync>(mut self, key: StoreKey<T>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Add an entry. A later entry for the same key replaces an earlier one.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: StoreKey<T>, value: T) {
        self.entries.push((key.name(), Box::new(value)));
    }

    /// Names of the entries in this batch, in insertion order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(name, _)| *name).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for StoreUpdates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Mutable key-value state scoped to a single validation run.
#[derive(Default)]
pub struct Store {
    entries: HashMap<&'static str, StoreValue>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any previous value under the same name.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: StoreKey<T>, value: T) {
        self.entries.insert(key.name(), Box::new(value));
    }

    /// Get a value if it is present.
    ///
    /// Returns an error when an entry exists under the key's name but holds
    /// a value of a different type.
    pub fn try_get<T: Any>(&self, key: StoreKey<T>) -> CoreResult<Option<&T>> {
        match self.entries.get(key.name()) {
            None => Ok(None),
            Some(value) => value.downcast_ref::<T>().map(Some).ok_or_else(|| {
                CoreError::contract(format!(
                    "store entry '{}' holds a value of an unexpected type",
                    key
                ))
            }),
        }
    }

    /// Get a value that an earlier step must have written.
    pub fn require<T: Any>(&self, key: StoreKey<T>) -> CoreResult<&T> {
        self.try_get(key)?.ok_or_else(|| {
            CoreError::contract(format!(
                "store entry '{}' is required but was never written",
                key
            ))
        })
    }

    /// Get a value, treating a type mismatch the same as absence.
    pub fn get<T: Any>(&self, key: StoreKey<T>) -> Option<&T> {
        self.try_get(key).ok().flatten()
    }

    /// Whether a value of the key's type is present.
    pub fn contains<T: Any>(&self, key: StoreKey<T>) -> bool {
        self.get(key).is_some()
    }

    /// Remove a value by key.
    pub fn remove<T: Any>(&mut self, key: StoreKey<T>) -> Option<T> {
        if !self.contains(key) {
            return None;
        }
        let value = self.entries.remove(key.name())?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Merge a step's updates into the store. Entries are added or replaced;
    /// nothing is ever removed by a merge.
    pub fn merge(&mut self, updates: StoreUpdates) {
        for (name, value) in updates.entries {
            self.entries.insert(name, value);
        }
    }

    /// Names of all entries, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("entries", &self.names()).finish()
    }
}

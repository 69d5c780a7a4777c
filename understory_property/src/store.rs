// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object property storage.
//!
//! This module provides [`PropertyStore`], the current values of one object.
//!
//! # Implementation
//!
//! Following the `WinUI` approach, entries live in a sorted vector searched by
//! binary search rather than a hash map: contiguous memory, no hash buckets, and
//! inline storage for small property sets via `SmallVec`.
//!
//! # Notification and locking
//!
//! The store holds a single lock per instance. [`PropertyStore::set`] releases
//! it before raising [`PropertyStore::changed`], so a handler may read or write
//! the same store. Notifications are still synchronous: `set` returns only after
//! every handler has run.

use std::sync::{Mutex, MutexGuard, PoisonError};

use smallvec::SmallVec;

use crate::notify::{EventSource, PropertyChanged};
use crate::value::{PropertyValue, Value};

/// Most models carry fewer than 8 properties, including the engine's own.
const INLINE_CAPACITY: usize = 8;

type Entries = SmallVec<[(&'static str, Value); INLINE_CAPACITY]>;

/// Thread-safe name to value map of one object.
///
/// The store has no semantics of its own: no type checks, no validation. Its
/// only guarantee is that [`set`](Self::set) with a value equal to the current
/// one is free of side effects.
///
/// # Example
///
/// ```rust
/// use understory_property::{PropertyStore, Value};
///
/// let store = PropertyStore::new();
/// assert!(store.set("Name", Value::from("Ann")));
/// assert!(!store.set("Name", Value::from("Ann")));
/// assert_eq!(store.get("Name"), Some(Value::from("Ann")));
/// assert_eq!(store.get_as::<i64>("Age"), 0);
/// ```
#[derive(Debug, Default)]
pub struct PropertyStore {
    entries: Mutex<Entries>,
    changed: EventSource<PropertyChanged>,
}

impl PropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn find(entries: &Entries, name: &str) -> Result<usize, usize> {
        entries.binary_search_by(|(key, _)| key.cmp(&name))
    }

    /// Returns a copy of the value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        let entries = self.lock();
        Self::find(&entries, name)
            .ok()
            .map(|index| entries[index].1.clone())
    }

    /// Returns the value of `name`, or [`Value::Null`] if absent.
    #[must_use]
    pub fn get_or_null(&self, name: &str) -> Value {
        self.get(name).unwrap_or_default()
    }

    /// Returns the value of `name` as `T`.
    ///
    /// Falls back to `T::default()` if the entry is absent or holds another type.
    #[must_use]
    pub fn get_as<T: PropertyValue + Default>(&self, name: &str) -> T {
        self.get(name)
            .and_then(|value| T::from_value(&value))
            .unwrap_or_default()
    }

    /// Stores `value` under `name`.
    ///
    /// Returns `false` and does nothing if an equal value is already stored.
    /// Otherwise replaces it, raises [`changed`](Self::changed) with the previous
    /// value ([`Value::Null`] for a new entry) and returns `true`.
    pub fn set(&self, name: &'static str, value: Value) -> bool {
        self.replace(name, value).is_some()
    }

    /// Like [`set`](Self::set), but returns the value that was replaced.
    ///
    /// The comparison and the replacement happen under one lock, so of several
    /// concurrent equal writes exactly one returns `Some`.
    pub fn replace(&self, name: &'static str, value: Value) -> Option<Value> {
        let old_value = {
            let mut entries = self.lock();
            match Self::find(&entries, name) {
                Ok(index) => {
                    if entries[index].1 == value {
                        return None;
                    }
                    core::mem::replace(&mut entries[index].1, value.clone())
                }
                Err(index) => {
                    entries.insert(index, (name, value.clone()));
                    Value::Null
                }
            }
        };
        self.changed
            .raise(&PropertyChanged::new(name, old_value.clone(), value));
        Some(old_value)
    }

    /// Returns `true` if `name` has an entry.
    #[must_use]
    pub fn is_available(&self, name: &str) -> bool {
        Self::find(&self.lock(), name).is_ok()
    }

    /// Returns a copy of every entry, sorted by name.
    #[must_use]
    pub fn get_all(&self) -> Vec<(&'static str, Value)> {
        self.lock().to_vec()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The event raised after every effective [`set`](Self::set).
    #[must_use]
    pub fn changed(&self) -> &EventSource<PropertyChanged> {
        &self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn entries_stay_sorted() {
        let store = PropertyStore::new();
        store.set("b", Value::Int(2));
        store.set("c", Value::Int(3));
        store.set("a", Value::Int(1));
        let names: Vec<_> = store.get_all().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn equal_write_is_silent() {
        let store = PropertyStore::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let _s = store
            .changed()
            .subscribe(move |change| sink.lock().unwrap().push(change.clone()));

        assert!(store.set("Name", Value::from("Ann")));
        assert!(!store.set("Name", Value::from("Ann")));
        assert!(store.set("Name", Value::from("Bob")));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].old_value, Value::Null);
        assert_eq!(log[1].old_value, Value::from("Ann"));
        assert_eq!(log[1].new_value, Value::from("Bob"));
    }

    #[test]
    fn concurrent_equal_replaces_commit_once() {
        let store = Arc::new(PropertyStore::new());
        store.set("Age", Value::Int(0));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.replace("Age", Value::Int(5)))
            })
            .collect();
        let replaced: Vec<_> = threads
            .into_iter()
            .filter_map(|t| t.join().unwrap())
            .collect();
        assert_eq!(replaced, [Value::Int(0)]);
        assert_eq!(store.get_or_null("Age"), Value::Int(5));
    }

    #[test]
    fn first_write_of_null_creates_entry() {
        let store = PropertyStore::new();
        assert!(!store.is_available("Parent"));
        assert!(store.set("Parent", Value::Null));
        assert!(store.is_available("Parent"));
        assert!(!store.set("Parent", Value::Null));
    }

    #[test]
    fn handler_may_write_back() {
        let store = Arc::new(PropertyStore::new());
        let weak = Arc::downgrade(&store);
        let _s = store.changed().subscribe(move |change| {
            if change.name == "Name" {
                if let Some(store) = weak.upgrade() {
                    store.set("Echo", change.new_value.clone());
                }
            }
        });
        store.set("Name", Value::from("Ann"));
        assert_eq!(store.get("Echo"), Some(Value::from("Ann")));
    }

    #[test]
    fn typed_read_falls_back_to_default() {
        let store = PropertyStore::new();
        store.set("Age", Value::from("not a number"));
        assert_eq!(store.get_as::<i64>("Age"), 0);
        assert_eq!(store.get_as::<String>("Age"), "not a number");
        assert_eq!(store.get_or_null("Missing"), Value::Null);
    }
}

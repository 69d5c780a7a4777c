// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A value collection that reports its own changes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::notify::{CollectionChangeAction, CollectionChanged, EventSource};
use crate::value::{PropertyObject, Value};

/// A thread-safe list of [`Value`]s that raises [`CollectionChanged`] on every
/// mutation.
///
/// Stored in a property as a shared object, it lets the owner follow items as
/// they enter and leave the collection.
///
/// # Example
///
/// ```rust
/// use understory_property::{ObservableCollection, Value};
///
/// let list = ObservableCollection::new();
/// list.push(Value::from(1_i64));
/// list.push(Value::from(2_i64));
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.remove(0), Some(Value::Int(1)));
/// assert_eq!(list.to_vec(), vec![Value::Int(2)]);
/// ```
#[derive(Debug, Default)]
pub struct ObservableCollection {
    items: Mutex<Vec<Value>>,
    changed: EventSource<CollectionChanged>,
}

impl ObservableCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding `items`.
    #[must_use]
    pub fn from_items<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
            changed: EventSource::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Value>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, action: CollectionChangeAction, new_items: Vec<Value>, old_items: Vec<Value>) {
        self.changed.raise(&CollectionChanged {
            action,
            new_items,
            old_items,
        });
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the collection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns a copy of the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.lock().get(index).cloned()
    }

    /// Returns a copy of all items.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.lock().clone()
    }

    /// Appends an item.
    pub fn push(&self, item: Value) {
        self.lock().push(item.clone());
        self.notify(CollectionChangeAction::Add, vec![item], Vec::new());
    }

    /// Inserts an item at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, item: Value) {
        {
            let mut items = self.lock();
            let index = index.min(items.len());
            items.insert(index, item.clone());
        }
        self.notify(CollectionChangeAction::Add, vec![item], Vec::new());
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.lock();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.notify(CollectionChangeAction::Remove, Vec::new(), vec![removed.clone()]);
        Some(removed)
    }

    /// Removes the first item equal to `item`.
    ///
    /// Returns `true` if an item was removed.
    pub fn remove_item(&self, item: &Value) -> bool {
        let position = self.lock().iter().position(|v| v == item);
        position.and_then(|index| self.remove(index)).is_some()
    }

    /// Replaces the item at `index`, returning the previous item.
    pub fn set(&self, index: usize, item: Value) -> Option<Value> {
        let previous = {
            let mut items = self.lock();
            let slot = items.get_mut(index)?;
            core::mem::replace(slot, item.clone())
        };
        self.notify(
            CollectionChangeAction::Replace,
            vec![item],
            vec![previous.clone()],
        );
        Some(previous)
    }

    /// Removes every item.
    pub fn clear(&self) {
        let previous = core::mem::take(&mut *self.lock());
        self.notify(CollectionChangeAction::Reset, Vec::new(), previous);
    }

    /// Replaces the whole contents.
    pub fn reset<I: IntoIterator<Item = Value>>(&self, items: I) {
        let current: Vec<Value> = items.into_iter().collect();
        let previous = core::mem::replace(&mut *self.lock(), current.clone());
        self.notify(CollectionChangeAction::Reset, current, previous);
    }
}

impl PropertyObject for ObservableCollection {
    fn type_name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }

    fn collection_changed(&self) -> Option<&EventSource<CollectionChanged>> {
        Some(&self.changed)
    }

    fn items(&self) -> Option<Vec<Value>> {
        Some(self.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn record(list: &ObservableCollection) -> (Arc<Mutex<Vec<CollectionChanged>>>, crate::Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let subscription = list
            .collection_changed()
            .unwrap()
            .subscribe(move |change| sink.lock().unwrap().push(change.clone()));
        (log, subscription)
    }

    #[test]
    fn mutations_raise_matching_changes() {
        let list = ObservableCollection::new();
        let (log, _s) = record(&list);

        list.push(Value::Int(1));
        list.insert(0, Value::Int(0));
        list.set(1, Value::Int(10));
        list.remove(0);

        let log = log.lock().unwrap();
        let actions: Vec<_> = log.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            vec![
                CollectionChangeAction::Add,
                CollectionChangeAction::Add,
                CollectionChangeAction::Replace,
                CollectionChangeAction::Remove,
            ]
        );
        assert_eq!(log[2].old_items, vec![Value::Int(1)]);
        assert_eq!(log[2].new_items, vec![Value::Int(10)]);
        assert_eq!(log[3].old_items, vec![Value::Int(0)]);
    }

    #[test]
    fn out_of_range_operations_are_silent() {
        let list = ObservableCollection::new();
        let (log, _s) = record(&list);

        assert_eq!(list.remove(3), None);
        assert_eq!(list.set(3, Value::Null), None);
        assert!(!list.remove_item(&Value::Int(1)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn reset_reports_old_and_new_contents() {
        let list = ObservableCollection::from_items([Value::Int(1), Value::Int(2)]);
        let (log, _s) = record(&list);

        list.reset([Value::Int(3)]);
        list.clear();

        let log = log.lock().unwrap();
        assert_eq!(log[0].action, CollectionChangeAction::Reset);
        assert_eq!(log[0].old_items, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(log[0].new_items, vec![Value::Int(3)]);
        assert_eq!(log[1].old_items, vec![Value::Int(3)]);
        assert!(list.is_empty());
    }
}

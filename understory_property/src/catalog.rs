// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The process-wide table of registered types.
//!
//! Each type's [`PropertyRegistry`] is built at most once, on first use, and then
//! shared for the lifetime of the process.

use core::any::{TypeId, type_name};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use once_cell::sync::{Lazy, OnceCell};

use crate::error::PropertyError;
use crate::metadata::PropertyDescriptor;
use crate::registry::PropertyRegistry;

type Slot = Arc<OnceCell<Arc<PropertyRegistry>>>;

static GLOBAL: Lazy<PropertyCatalog> = Lazy::new(PropertyCatalog::new);

/// Maps types to their frozen [`PropertyRegistry`].
///
/// The map itself is guarded by one lock. Each type additionally owns a
/// once-cell, so a type is registered exactly once even when several threads
/// race on its first use, and registration of one type may trigger the
/// registration of another without deadlocking.
///
/// # Example
///
/// ```rust
/// use understory_property::{Property, PropertyCatalog, PropertyDescriptorBuilder};
///
/// struct Person;
/// const NAME: Property<String> = Property::new("Name");
///
/// let catalog = PropertyCatalog::new();
/// let registry = catalog
///     .register::<Person, _>("Person", |registry| {
///         registry.register(NAME, PropertyDescriptorBuilder::new(String::new()))?;
///         Ok(())
///     })
///     .unwrap();
///
/// assert_eq!(registry.len(), 1);
/// assert!(catalog.is_registered::<Person>("Name"));
/// ```
#[derive(Debug, Default)]
pub struct PropertyCatalog {
    types: Mutex<HashMap<TypeId, Slot>>,
}

impl PropertyCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide catalog.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TypeId, Slot>> {
        self.types.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, type_id: TypeId) -> Option<Slot> {
        self.lock().get(&type_id).cloned()
    }

    /// Returns the table of `T`, building it with `register` on first use.
    ///
    /// Later calls return the cached table and do not run `register`.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `register`. A failed registration
    /// leaves the type unregistered.
    pub fn register<T, F>(
        &self,
        owner: &'static str,
        register: F,
    ) -> Result<Arc<PropertyRegistry>, PropertyError>
    where
        T: 'static,
        F: FnOnce(&mut PropertyRegistry) -> Result<(), PropertyError>,
    {
        let slot = self
            .lock()
            .entry(TypeId::of::<T>())
            .or_default()
            .clone();
        slot.get_or_try_init(|| {
            let mut registry = PropertyRegistry::new(owner);
            register(&mut registry)?;
            tracing::debug!(
                owner,
                properties = registry.len(),
                "registered property table"
            );
            Ok(Arc::new(registry))
        })
        .cloned()
    }

    /// Returns the table of `T`, if it has been registered.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Arc<PropertyRegistry>> {
        self.slot(TypeId::of::<T>())
            .and_then(|slot| slot.get().cloned())
    }

    /// Returns `true` if `T` has a registered table.
    #[must_use]
    pub fn is_type_registered<T: 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Returns `true` if `T` registered a property called `name`.
    #[must_use]
    pub fn is_registered<T: 'static>(&self, name: &str) -> bool {
        self.get::<T>()
            .is_some_and(|registry| registry.is_registered(name))
    }

    /// Looks up a descriptor of `T`.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::TypeNotRegistered`] if `T` has no table.
    /// - [`PropertyError::PropertyNotRegistered`] if `name` is not on it.
    pub fn descriptor<T: 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<PropertyDescriptor>, PropertyError> {
        let registry = self
            .get::<T>()
            .ok_or(PropertyError::TypeNotRegistered {
                owner: type_name::<T>(),
            })?;
        registry.descriptor(name).cloned()
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Returns `true` if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

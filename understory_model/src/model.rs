// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The model engine.
//!
//! A [`Model`] is a cheap-clone handle to one instance of a [`ModelType`]. The
//! instance owns a [`PropertyStore`] seeded from its type's
//! [`PropertyRegistry`] and routes every write through one pipeline:
//!
//! 1. writes to a read-only model or to a calculated property are ignored and
//!    logged;
//! 2. the value is checked against the declared type;
//! 3. the cancellable [`PropertyChanging`] event is raised;
//! 4. value rules run, or are deferred while validation is suspended;
//! 5. the store is updated, which re-targets the change relay and parent link;
//! 6. [`PropertyChanged`] is raised, then the descriptor's callback;
//! 7. the model is marked dirty and, if enabled, validated.
//!
//! Steps 2 to 4 and the change events are skipped in lean-and-mean mode.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use hashbrown::HashMap;
use once_cell::sync::OnceCell;
use understory_property::{
    EventSource, ObjectRef, Property, PropertyCatalog, PropertyChanged, PropertyDescriptor,
    PropertyDescriptorBuilder, PropertyError, PropertyObject, PropertyRegistry, PropertyStore,
    PropertyValue, Subscription, Value, ValueKind, ValueType,
};

use crate::config::ModelConfig;
use crate::edit::ModelBackup;
use crate::error::ModelError;
use crate::relay::{self, ChangeRelay};
use crate::services::ModelServices;
use crate::types::{self, ModelKind, ModelType};
use crate::validation::{DataErrorsChanged, ValidationContext, ValidationState, Validator};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Arguments of the cancellable event raised before a property changes.
#[derive(Debug)]
pub struct PropertyChanging {
    /// The property about to change.
    pub name: &'static str,
    /// The current value.
    pub old_value: Value,
    /// The value about to be written.
    pub new_value: Value,
    canceled: AtomicBool,
}

impl PropertyChanging {
    fn new(name: &'static str, old_value: Value, new_value: Value) -> Self {
        Self {
            name,
            old_value,
            new_value,
            canceled: AtomicBool::new(false),
        }
    }

    /// Cancels the write. The model keeps its current value.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` if a listener canceled the write.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }
}

/// Side effects requested for a single write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SetOptions {
    /// Raise the changing and changed events.
    pub notify: bool,
    /// Run the property's value rules.
    pub validate_attributes: bool,
}

impl SetOptions {
    /// No events and no value rules. Used when re-applying stored values.
    pub const QUIET: Self = Self {
        notify: false,
        validate_attributes: false,
    };
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            notify: true,
            validate_attributes: true,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Switches {
    pub(crate) lean_and_mean: AtomicBool,
    pub(crate) suspend_validation: AtomicBool,
    pub(crate) always_invoke_notify_changed: AtomicBool,
    pub(crate) auto_validate: AtomicBool,
    pub(crate) is_validated: AtomicBool,
    pub(crate) is_validating: AtomicBool,
    pub(crate) is_initialized: AtomicBool,
    pub(crate) is_deserialized: AtomicBool,
}

impl Switches {
    fn seeded(config: &ModelConfig) -> Self {
        let switches = Self::default();
        switches
            .auto_validate
            .store(config.auto_validate(), Ordering::Relaxed);
        switches
            .always_invoke_notify_changed
            .store(config.always_invoke_notify_changed(), Ordering::Relaxed);
        switches
    }
}

pub(crate) struct ModelInner {
    pub(crate) this: Weak<ModelInner>,
    pub(crate) kind: ModelKind,
    pub(crate) registry: Arc<PropertyRegistry>,
    pub(crate) services: ModelServices,
    pub(crate) store: PropertyStore,
    pub(crate) parent: Mutex<Weak<ModelInner>>,
    pub(crate) relays: Mutex<HashMap<&'static str, ChangeRelay>>,
    store_subscription: OnceCell<Subscription>,
    pub(crate) switches: Switches,
    pub(crate) property_changing: EventSource<PropertyChanging>,
    pub(crate) property_changed: EventSource<PropertyChanged>,
    pub(crate) errors_changed: EventSource<DataErrorsChanged>,
    pub(crate) warnings_changed: EventSource<DataErrorsChanged>,
    pub(crate) validated: EventSource<ValidationContext>,
    pub(crate) validation: Mutex<ValidationState>,
    pub(crate) commit: Mutex<()>,
    pub(crate) validator: OnceCell<Option<Arc<dyn Validator>>>,
    pub(crate) backup: Mutex<Option<ModelBackup>>,
}

impl fmt::Debug for ModelInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelInner")
            .field("type", &self.kind.name)
            .field("values", &self.store.get_all())
            .finish_non_exhaustive()
    }
}

impl PropertyObject for ModelInner {
    fn type_name(&self) -> &'static str {
        self.kind.name
    }

    fn property_changed(&self) -> Option<&EventSource<PropertyChanged>> {
        Some(&self.property_changed)
    }

    fn structural_eq(&self, other: &dyn PropertyObject) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        match (self.this.upgrade(), other.this.upgrade()) {
            (Some(a), Some(b)) => {
                let (a, b) = (Model { inner: a }, Model { inner: b });
                self.services.comparer().equals(&a, &b)
            }
            _ => false,
        }
    }
}

/// A live model instance.
///
/// Cloning the handle is cheap and shares the instance. The instance is freed
/// when the last handle is dropped; parents, children and change relays only
/// hold weak references to each other.
///
/// # Example
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use understory_model::{Model, ModelType};
/// use understory_property::{Property, PropertyDescriptorBuilder, PropertyError, PropertyRegistry};
///
/// struct Person;
///
/// impl Person {
///     const NAME: Property<String> = Property::new("Name");
///     const AGE: Property<i64> = Property::new("Age");
/// }
///
/// impl ModelType for Person {
///     const TYPE_NAME: &'static str = "Person";
///
///     fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
///         registry.register(Self::NAME, PropertyDescriptorBuilder::new(String::new()))?;
///         registry.register(Self::AGE, PropertyDescriptorBuilder::new(0_i64))?;
///         Ok(())
///     }
/// }
///
/// let person = Model::new::<Person>();
/// let changes = Arc::new(Mutex::new(Vec::new()));
/// let sink = changes.clone();
/// let _subscription = person
///     .property_changed()
///     .subscribe(move |change| sink.lock().unwrap().push(change.name));
///
/// person.set(Person::NAME, "Ann".to_owned()).unwrap();
/// person.set(Person::NAME, "Ann".to_owned()).unwrap();
///
/// assert_eq!(person.get(Person::NAME), "Ann");
/// assert!(person.is_dirty());
/// assert_eq!(changes.lock().unwrap().iter().filter(|n| **n == "Name").count(), 1);
/// ```
#[derive(Clone)]
pub struct Model {
    pub(crate) inner: Arc<ModelInner>,
}

/// A non-owning reference to a [`Model`].
#[derive(Clone, Debug, Default)]
pub struct WeakModel {
    inner: Weak<ModelInner>,
}

impl WeakModel {
    /// Returns the model if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Model> {
        self.inner.upgrade().map(Model::from_inner)
    }
}

impl Model {
    /// The engine-owned dirty flag.
    pub const IS_DIRTY: Property<bool> = Property::new("IsDirty");

    /// The engine-owned read-only flag.
    pub const IS_READ_ONLY: Property<bool> = Property::new("IsReadOnly");

    pub(crate) fn from_inner(inner: Arc<ModelInner>) -> Self {
        Self { inner }
    }

    /// Creates an instance of `M` with default services.
    ///
    /// # Panics
    ///
    /// Panics if the properties of `M` cannot be registered. Use
    /// [`try_new`](Self::try_new) to handle that case.
    #[must_use]
    pub fn new<M: ModelType>() -> Self {
        match Self::try_new::<M>() {
            Ok(model) => model,
            Err(err) => panic!("cannot construct model '{}': {err}", M::TYPE_NAME),
        }
    }

    /// Creates an instance of `M` with default services.
    ///
    /// # Errors
    ///
    /// Returns the registration error if the properties of `M` are malformed.
    pub fn try_new<M: ModelType>() -> Result<Self, ModelError> {
        Self::with_services::<M>(&ModelServices::default())
    }

    /// Creates an instance of `M` that shares `services`.
    ///
    /// # Errors
    ///
    /// Returns the registration error if the properties of `M` are malformed.
    pub fn with_services<M: ModelType>(services: &ModelServices) -> Result<Self, ModelError> {
        let registry = Self::register_type::<M>()?;
        let kind = ModelKind::of::<M>();
        let inner = Arc::new_cyclic(|this| ModelInner {
            this: this.clone(),
            kind,
            registry,
            services: services.clone(),
            store: PropertyStore::new(),
            parent: Mutex::new(Weak::new()),
            relays: Mutex::default(),
            store_subscription: OnceCell::new(),
            switches: Switches::seeded(services.config()),
            property_changing: EventSource::new(),
            property_changed: EventSource::new(),
            errors_changed: EventSource::new(),
            warnings_changed: EventSource::new(),
            validated: EventSource::new(),
            validation: Mutex::default(),
            commit: Mutex::new(()),
            validator: OnceCell::new(),
            backup: Mutex::new(None),
        });
        let model = Self { inner };
        model.initialize();
        Ok(model)
    }

    /// Registers the properties of `M` and makes it constructible by name.
    ///
    /// Construction does this implicitly. Call it up front to deserialize a type
    /// that has not been constructed yet.
    ///
    /// # Errors
    ///
    /// Returns the registration error if the properties of `M` are malformed.
    pub fn register_type<M: ModelType>() -> Result<Arc<PropertyRegistry>, ModelError> {
        let registry = PropertyCatalog::global().register::<M, _>(M::TYPE_NAME, |registry| {
            for key in [Self::IS_DIRTY, Self::IS_READ_ONLY] {
                registry.register(
                    key,
                    PropertyDescriptorBuilder::new(false)
                        .engine_owned()
                        .include_in_serialization(false)
                        .include_in_backup(false)
                        .set_parent(false),
                )?;
            }
            M::register_properties(registry)
        })?;
        types::remember(ModelKind::of::<M>());
        Ok(registry)
    }

    fn initialize(&self) {
        let owner = Arc::downgrade(&self.inner);
        let subscription = self.inner.store.changed().subscribe(move |change| {
            if let Some(inner) = owner.upgrade() {
                relay::on_store_changed(&inner, change);
            }
        });
        if self.inner.store_subscription.set(subscription).is_err() {
            tracing::warn!(model = self.type_name(), "model initialized twice");
            return;
        }

        (self.inner.kind.on_initializing)(self);
        for descriptor in self.inner.registry.iter().filter(|d| !d.is_calculated()) {
            self.inner
                .store
                .set(descriptor.name(), descriptor.default_value());
        }
        self.inner
            .switches
            .is_initialized
            .store(true, Ordering::Release);
        (self.inner.kind.on_initialized)(self);
        tracing::debug!(model = self.type_name(), "initialized model");
    }

    /// Returns the registered name of the model type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.inner.kind.name
    }

    /// Returns the property table of the model type.
    #[must_use]
    pub fn registry(&self) -> &Arc<PropertyRegistry> {
        &self.inner.registry
    }

    /// Returns the services this model was constructed with.
    #[must_use]
    pub fn services(&self) -> &ModelServices {
        &self.inner.services
    }

    fn config(&self) -> &ModelConfig {
        self.inner.services.config()
    }

    /// Returns `true` if `name` is registered on the model type.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.registry.is_registered(name)
    }

    /// Returns `true` if both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }

    /// Returns a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakModel {
        WeakModel {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Wraps this model as a shared object value.
    #[must_use]
    pub fn to_object(&self) -> ObjectRef {
        ObjectRef::from_arc(self.inner.clone())
    }

    /// Recovers a model from an object handle.
    #[must_use]
    pub fn from_object(object: &ObjectRef) -> Option<Self> {
        object.downcast_arc::<ModelInner>().map(Self::from_inner)
    }

    /// Recovers a model from the owner passed to a
    /// [`PropertyChangedCallback`](understory_property::PropertyChangedCallback).
    #[must_use]
    pub fn from_property_object(object: &dyn PropertyObject) -> Option<Self> {
        object
            .as_any()
            .downcast_ref::<ModelInner>()
            .and_then(|inner| inner.this.upgrade())
            .map(Self::from_inner)
    }

    fn read(&self, descriptor: &PropertyDescriptor) -> Value {
        descriptor
            .calculate(&self.inner.store)
            .unwrap_or_else(|| self.inner.store.get_or_null(descriptor.name()))
    }

    /// Returns the current value of `name`.
    ///
    /// Calculated properties are computed on every read.
    ///
    /// # Errors
    ///
    /// [`PropertyError::PropertyNotRegistered`] if `name` is not registered.
    pub fn get_value(&self, name: &str) -> Result<Value, ModelError> {
        let descriptor = self.inner.registry.descriptor(name)?;
        Ok(self.read(descriptor))
    }

    /// Returns the current value of `key` as `T`.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::PropertyNotRegistered`] if `key` is not registered.
    /// - [`PropertyError::InvalidPropertyValue`] if the stored value is not a `T`.
    pub fn try_get<T: PropertyValue>(&self, key: Property<T>) -> Result<T, ModelError> {
        let descriptor = self.inner.registry.descriptor(key.name())?;
        let value = self.read(descriptor);
        T::from_value(&value).ok_or_else(|| {
            PropertyError::InvalidPropertyValue {
                owner: self.type_name(),
                property: descriptor.name(),
                expected: T::value_type(),
                actual: value.type_label(),
            }
            .into()
        })
    }

    /// Returns the current value of `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not registered on the model type or if the stored
    /// value is not a `T`. See [`try_get`](Self::try_get).
    #[must_use]
    pub fn get<T: PropertyValue>(&self, key: Property<T>) -> T {
        match self.try_get(key) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns every property with its current value, in registration order.
    #[must_use]
    pub fn properties(&self) -> Vec<(&'static str, Value)> {
        self.inner
            .registry
            .iter()
            .map(|descriptor| (descriptor.name(), self.read(descriptor)))
            .collect()
    }

    /// Writes `value` to `key`.
    ///
    /// # Errors
    ///
    /// See [`set_value_with`](Self::set_value_with).
    pub fn set<T: PropertyValue>(&self, key: Property<T>, value: T) -> Result<(), ModelError> {
        self.set_value(key.name(), value.into_value())
    }

    /// Writes `value` to `name` with notification and value rules.
    ///
    /// # Errors
    ///
    /// See [`set_value_with`](Self::set_value_with).
    pub fn set_value(&self, name: &str, value: Value) -> Result<(), ModelError> {
        self.set_value_with(name, value, SetOptions::default())
    }

    /// Writes `value` to `name`.
    ///
    /// Writes to a read-only model (other than to [`IS_READ_ONLY`](Self::IS_READ_ONLY))
    /// and to calculated properties are ignored with a warning and return `Ok`.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::PropertyNotRegistered`] if `name` is not registered.
    /// - [`PropertyError::InvalidPropertyValue`] if `value` does not match the
    ///   declared type. The previous value is kept.
    pub fn set_value_with(
        &self,
        name: &str,
        value: Value,
        options: SetOptions,
    ) -> Result<(), ModelError> {
        let descriptor = self.inner.registry.descriptor(name)?;
        self.write(descriptor, value, options, false)
    }

    fn write(
        &self,
        descriptor: &PropertyDescriptor,
        value: Value,
        options: SetOptions,
        internal: bool,
    ) -> Result<(), ModelError> {
        let model = self.type_name();
        let name = descriptor.name();
        if !internal && name != Self::IS_READ_ONLY.name() && self.is_read_only() {
            tracing::warn!(model, property = name, "ignoring write to read-only model");
            return Ok(());
        }
        if descriptor.is_calculated() {
            tracing::warn!(model, property = name, "ignoring write to calculated property");
            return Ok(());
        }

        let lean = self.is_lean_and_mean();
        if !lean && !descriptor.value_type().accepts(&value) {
            return Err(PropertyError::InvalidPropertyValue {
                owner: model,
                property: name,
                expected: descriptor.value_type(),
                actual: value.type_label(),
            }
            .into());
        }

        let old_value = self.inner.store.get_or_null(name);
        let changed = old_value != value;
        let notify =
            options.notify && !lean && !self.config().disable_property_change_notifications();
        let raise = notify && (changed || self.always_invoke_notify_changed());

        if raise {
            let changing = PropertyChanging::new(name, old_value.clone(), value.clone());
            self.inner.property_changing.raise(&changing);
            if changing.is_canceled() {
                tracing::debug!(model, property = name, "write canceled by listener");
                return Ok(());
            }
        }

        let engine_owned = descriptor.is_engine_owned();
        if changed && options.validate_attributes && !lean && !engine_owned {
            self.validate_attribute(descriptor, &value);
        }

        // The store compares again under its lock; only the write that actually
        // replaces the value goes on to notify and mark dirty.
        let replaced = if changed {
            self.inner.store.replace(name, value.clone())
        } else {
            None
        };
        let committed = replaced.is_some();
        if committed {
            if !engine_owned {
                self.inner
                    .switches
                    .is_validated
                    .store(false, Ordering::Release);
            }
            tracing::trace!(model, property = name, "property value replaced");
        } else if changed {
            tracing::trace!(model, property = name, "concurrent write already stored value");
        }

        let change = PropertyChanged::new(name, replaced.unwrap_or(old_value), value);
        if notify && (committed || self.always_invoke_notify_changed()) {
            self.inner.property_changed.raise(&change);
        }
        if committed && !lean {
            descriptor.on_changed(&*self.inner, &change);
        }
        if committed && !engine_owned {
            self.mark_dirty(true);
            if self.auto_validate() {
                self.validate_logged(false);
            }
        }
        Ok(())
    }

    fn write_engine(&self, key: Property<bool>, value: bool) {
        let Some(descriptor) = self.inner.registry.get(key.name()) else {
            return;
        };
        if let Err(err) = self.write(descriptor, Value::Bool(value), SetOptions::default(), true) {
            tracing::warn!(model = self.type_name(), property = key.name(), %err, "engine write failed");
        }
    }

    pub(crate) fn mark_dirty(&self, dirty: bool) {
        self.write_engine(Self::IS_DIRTY, dirty);
    }

    /// Returns `true` if a property changed since the last
    /// [`clear_dirty`](Self::clear_dirty), directly or through a child.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.store.get_as::<bool>(Self::IS_DIRTY.name())
    }

    /// Clears the dirty flag of this model.
    pub fn clear_dirty(&self) {
        self.mark_dirty(false);
    }

    /// Clears the dirty flag of this model and of every model reachable through
    /// its properties, including models inside lists and collections.
    pub fn clear_dirty_recursive(&self) {
        let mut visited = Vec::new();
        self.clear_dirty_walk(&mut visited);
    }

    fn clear_dirty_walk(&self, visited: &mut Vec<usize>) {
        if visited.contains(&self.addr()) {
            return;
        }
        visited.push(self.addr());
        self.clear_dirty();
        let stored = self
            .inner
            .registry
            .iter()
            .filter(|d| !d.is_engine_owned() && !d.is_calculated());
        for descriptor in stored {
            let value = self.inner.store.get_or_null(descriptor.name());
            for child in relay::models_in(&value) {
                child.clear_dirty_walk(visited);
            }
        }
    }

    /// Returns `true` if the model rejects writes.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.store.get_as::<bool>(Self::IS_READ_ONLY.name())
    }

    /// Makes the model read-only or writable.
    pub fn set_read_only(&self, read_only: bool) {
        self.write_engine(Self::IS_READ_ONLY, read_only);
    }

    /// Returns `true` if this model or its configuration is in lean-and-mean mode.
    #[must_use]
    pub fn is_lean_and_mean(&self) -> bool {
        self.inner.switches.lean_and_mean.load(Ordering::Relaxed) || self.config().lean_and_mean()
    }

    /// Turns lean-and-mean mode on or off for this model.
    pub fn set_lean_and_mean(&self, on: bool) {
        self.inner
            .switches
            .lean_and_mean
            .store(on, Ordering::Relaxed);
    }

    /// Returns `true` if change events are raised even for equal writes.
    #[must_use]
    pub fn always_invoke_notify_changed(&self) -> bool {
        self.inner
            .switches
            .always_invoke_notify_changed
            .load(Ordering::Relaxed)
    }

    /// Raises change events even for equal writes.
    pub fn set_always_invoke_notify_changed(&self, on: bool) {
        self.inner
            .switches
            .always_invoke_notify_changed
            .store(on, Ordering::Relaxed);
    }

    /// Returns `true` if every effective write triggers a validation pass.
    #[must_use]
    pub fn auto_validate(&self) -> bool {
        self.inner.switches.auto_validate.load(Ordering::Relaxed)
    }

    /// Turns validation after every effective write on or off.
    pub fn set_auto_validate(&self, on: bool) {
        self.inner
            .switches
            .auto_validate
            .store(on, Ordering::Relaxed);
    }

    /// Returns `true` once construction has seeded every property.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.switches.is_initialized.load(Ordering::Acquire)
    }

    /// Returns `true` if this instance was produced by deserialization.
    #[must_use]
    pub fn is_deserialized(&self) -> bool {
        self.inner.switches.is_deserialized.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deserialized(&self) {
        self.inner
            .switches
            .is_deserialized
            .store(true, Ordering::Release);
        (self.inner.kind.on_deserialized)(self);
    }

    /// Returns the model this one is assigned to, if it is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        lock(&self.inner.parent).upgrade().map(Self::from_inner)
    }

    pub(crate) fn link_parent(&self, parent: &Self) {
        *lock(&self.inner.parent) = Arc::downgrade(&parent.inner);
    }

    pub(crate) fn unlink_parent(&self, parent: &Self) {
        let mut current = lock(&self.inner.parent);
        if Weak::ptr_eq(&current, &Arc::downgrade(&parent.inner)) {
            *current = Weak::new();
        }
    }

    /// Called when a value held by this model reports a change of its own.
    pub(crate) fn on_child_changed(&self) {
        self.mark_dirty(true);
        self.inner
            .switches
            .is_validated
            .store(false, Ordering::Release);
        if self.auto_validate() {
            self.validate_logged(false);
        }
    }

    /// Drops every change relay. Nested values stop propagating changes until
    /// their property is assigned again.
    pub fn detach_relays(&self) {
        let relays = core::mem::take(&mut *lock(&self.inner.relays));
        tracing::debug!(
            model = self.type_name(),
            relays = relays.len(),
            "detached change relays"
        );
    }

    #[cfg(test)]
    pub(crate) fn relay_count(&self) -> usize {
        lock(&self.inner.relays).len()
    }

    /// The cancellable event raised before a property changes.
    #[must_use]
    pub fn property_changing(&self) -> &EventSource<PropertyChanging> {
        &self.inner.property_changing
    }

    /// The event raised after a property changed.
    #[must_use]
    pub fn property_changed(&self) -> &EventSource<PropertyChanged> {
        &self.inner.property_changed
    }
}

impl PropertyValue for Model {
    fn value_type() -> ValueType {
        ValueType::new(ValueKind::Object)
    }

    fn into_value(self) -> Value {
        Value::Object(ObjectRef::from_arc(self.inner))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().and_then(Self::from_object)
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.inner.services.comparer().equals(self, other)
    }
}

impl Eq for Model {}

impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.services.comparer().hash_code(self));
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type", &self.type_name())
            .field("properties", &self.properties())
            .finish_non_exhaustive()
    }
}

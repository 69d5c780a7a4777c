// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Property: registered properties and their storage.
//!
//! This crate is the model-agnostic half of the model runtime. It knows how to
//! describe a property, how to collect the properties of a type, and how to hold
//! the values of one object. Pipelines with side effects (type checks, dirty
//! tracking, validation) are layered on top by `understory_model`.
//!
//! ## Core Concepts
//!
//! - [`Value`] is the tagged value every property holds. [`ValueType`] is the
//!   declared type a value is checked against, and [`PropertyValue`] maps Rust
//!   types onto both.
//! - [`Property<T>`] is a typed, `const`-constructible key.
//! - [`PropertyDescriptor`] is the immutable record of one property, declared
//!   through [`PropertyDescriptorBuilder`].
//! - [`PropertyRegistry`] is the table of one type, including its XML name
//!   mapping. [`PropertyCatalog`] caches one table per type for the whole process.
//! - [`PropertyStore`] holds the values of one object and reports replacements.
//! - [`EventSource`] and [`Subscription`] carry synchronous change notification.
//!   Subscriptions hold the handler; the source only holds it weakly.
//! - [`ObservableCollection`] is a list that reports its own changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_property::{
//!     Property, PropertyDescriptorBuilder, PropertyRegistry, PropertyStore, Range, Value,
//! };
//!
//! const NAME: Property<String> = Property::new("Name");
//! const AGE: Property<i64> = Property::new("Age");
//!
//! let mut registry = PropertyRegistry::new("Person");
//! registry.register(NAME, PropertyDescriptorBuilder::new(String::new())).unwrap();
//! registry
//!     .register(AGE, PropertyDescriptorBuilder::new(0_i64).rule(Range::new(0.0, 150.0)))
//!     .unwrap();
//!
//! // Seed a store from the declared defaults.
//! let store = PropertyStore::new();
//! for descriptor in registry.iter() {
//!     store.set(descriptor.name(), descriptor.default_value());
//! }
//! assert_eq!(store.get(NAME.name()), Some(Value::from("")));
//!
//! let age = registry.descriptor(AGE.name()).unwrap();
//! assert!(age.check_rules(&Value::Int(200)).is_some());
//! ```

mod catalog;
mod collection;
mod error;
mod id;
mod metadata;
mod notify;
mod registry;
mod rule;
mod store;
mod value;

pub use catalog::PropertyCatalog;
pub use collection::ObservableCollection;
pub use error::PropertyError;
pub use id::Property;
pub use metadata::{
    CalculatedValue, DefaultValue, PropertyChangedCallback, PropertyDescriptor,
    PropertyDescriptorBuilder, PropertyFlags, XmlMapping, XmlNodeKind,
};
pub use notify::{
    CollectionChangeAction, CollectionChanged, EventSource, PropertyChanged, Subscription,
};
pub use registry::PropertyRegistry;
pub use rule::{FnRule, MaxLength, Range, Required, ValueRule};
pub use store::PropertyStore;
pub use value::{AsAny, ObjectRef, PropertyObject, PropertyValue, Value, ValueKind, ValueType};

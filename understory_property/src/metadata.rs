// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property descriptors.
//!
//! This module provides [`PropertyDescriptor`], the immutable per-type record for
//! one property, and [`PropertyDescriptorBuilder`] for declaring it.

use core::fmt;
use core::marker::PhantomData;
use std::sync::Arc;

use crate::notify::PropertyChanged;
use crate::rule::ValueRule;
use crate::store::PropertyStore;
use crate::value::{PropertyObject, PropertyValue, Value, ValueType};

bitflags::bitflags! {
    /// Behavioural flags of a property.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// The value type can be serialized at all.
        const SERIALIZABLE             = 0b0000_0001;
        /// The property is written by the serializer.
        const INCLUDE_IN_SERIALIZATION = 0b0000_0010;
        /// The property is captured by edit-session backups.
        const INCLUDE_IN_BACKUP        = 0b0000_0100;
        /// Assigning a model (or collection of models) makes the owner its parent.
        const SET_PARENT               = 0b0000_1000;
        /// Declared by the model engine itself rather than by the model type.
        const ENGINE_OWNED             = 0b0001_0000;
        /// Read-only and computed on every read.
        const CALCULATED               = 0b0010_0000;
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::SERIALIZABLE | Self::INCLUDE_IN_SERIALIZATION | Self::INCLUDE_IN_BACKUP | Self::SET_PARENT
    }
}

/// Callback invoked after a property of a live object changed.
///
/// Receives the owning object and the change.
pub type PropertyChangedCallback = Arc<dyn Fn(&dyn PropertyObject, &PropertyChanged) + Send + Sync>;

/// Computes the value of a calculated property from the owner's store.
pub type CalculatedValue = Arc<dyn Fn(&PropertyStore) -> Value + Send + Sync>;

/// Produces a property's default value.
#[derive(Clone)]
pub enum DefaultValue {
    /// The same value for every instance.
    Constant(Value),
    /// A fresh value per instance.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces the default value.
    #[must_use]
    pub fn produce(&self) -> Value {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Factory(_) => f.debug_tuple("Factory").finish_non_exhaustive(),
        }
    }
}

/// How a property is written as XML.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum XmlNodeKind {
    /// As an attribute of the owner's element.
    Attribute,
    /// As a child element.
    Element,
}

/// The XML name and node kind of a property.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct XmlMapping {
    /// Attribute or element.
    pub kind: XmlNodeKind,
    /// The name used in XML.
    pub name: &'static str,
}

/// Immutable metadata for one property of one type.
///
/// Descriptors are created by [`PropertyRegistry::register`](crate::PropertyRegistry::register)
/// and shared for the lifetime of the process.
pub struct PropertyDescriptor {
    pub(crate) name: &'static str,
    pub(crate) owner: &'static str,
    pub(crate) value_type: ValueType,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) flags: PropertyFlags,
    pub(crate) xml: XmlMapping,
    pub(crate) changed_callback: Option<PropertyChangedCallback>,
    pub(crate) calculated: Option<CalculatedValue>,
    pub(crate) rules: Vec<Arc<dyn ValueRule>>,
}

impl PropertyDescriptor {
    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the name of the type that owns this property.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Returns the declared value type.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Returns the flags.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Produces the default value.
    ///
    /// Calculated properties have no stored default and yield [`Value::Null`].
    #[must_use]
    pub fn default_value(&self) -> Value {
        self.default
            .as_ref()
            .map_or(Value::Null, DefaultValue::produce)
    }

    /// Returns whether the property can be serialized.
    #[must_use]
    #[inline]
    pub fn is_serializable(&self) -> bool {
        self.flags.contains(PropertyFlags::SERIALIZABLE)
    }

    /// Returns whether the serializer writes this property.
    #[must_use]
    #[inline]
    pub fn include_in_serialization(&self) -> bool {
        self.flags.contains(PropertyFlags::INCLUDE_IN_SERIALIZATION)
    }

    /// Returns whether edit-session backups capture this property.
    #[must_use]
    #[inline]
    pub fn include_in_backup(&self) -> bool {
        self.flags.contains(PropertyFlags::INCLUDE_IN_BACKUP)
    }

    /// Returns whether assigning this property links the value to its owner.
    #[must_use]
    #[inline]
    pub fn set_parent(&self) -> bool {
        self.flags.contains(PropertyFlags::SET_PARENT)
    }

    /// Returns whether the engine declared this property.
    #[must_use]
    #[inline]
    pub fn is_engine_owned(&self) -> bool {
        self.flags.contains(PropertyFlags::ENGINE_OWNED)
    }

    /// Returns whether this property is computed.
    #[must_use]
    #[inline]
    pub fn is_calculated(&self) -> bool {
        self.flags.contains(PropertyFlags::CALCULATED)
    }

    /// Returns the XML mapping.
    #[must_use]
    #[inline]
    pub fn xml(&self) -> XmlMapping {
        self.xml
    }

    /// Computes a calculated property from the owner's store.
    ///
    /// Returns `None` for ordinary properties.
    #[must_use]
    pub fn calculate(&self, store: &PropertyStore) -> Option<Value> {
        self.calculated.as_ref().map(|calculate| calculate(store))
    }

    /// Invokes the changed callback, if one is set.
    pub fn on_changed(&self, owner: &dyn PropertyObject, change: &PropertyChanged) {
        if let Some(callback) = &self.changed_callback {
            callback(owner, change);
        }
    }

    /// Returns the value rules.
    #[must_use]
    pub fn rules(&self) -> &[Arc<dyn ValueRule>] {
        &self.rules
    }

    /// Checks `value` against every rule, returning the first failure.
    #[must_use]
    pub fn check_rules(&self, value: &Value) -> Option<String> {
        self.rules.iter().find_map(|rule| rule.check(self.name, value))
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("value_type", &self.value_type)
            .field("default", &self.default)
            .field("flags", &self.flags)
            .field("xml", &self.xml)
            .field("has_changed_callback", &self.changed_callback.is_some())
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`PropertyDescriptor`] of a property holding `T`.
///
/// # Example
///
/// ```rust
/// use understory_property::{PropertyDescriptorBuilder, PropertyFlags, Required};
///
/// let builder = PropertyDescriptorBuilder::new(String::new())
///     .include_in_backup(false)
///     .xml_attribute("name")
///     .rule(Required);
///
/// assert!(!builder.flags().contains(PropertyFlags::INCLUDE_IN_BACKUP));
/// ```
pub struct PropertyDescriptorBuilder<T> {
    value_type: ValueType,
    default: Option<DefaultValue>,
    flags: PropertyFlags,
    xml: Option<XmlMapping>,
    changed_callback: Option<PropertyChangedCallback>,
    calculated: Option<CalculatedValue>,
    rules: Vec<Arc<dyn ValueRule>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PropertyValue> PropertyDescriptorBuilder<T> {
    fn with_default(default: Option<DefaultValue>) -> Self {
        Self {
            value_type: T::value_type(),
            default,
            flags: PropertyFlags::default(),
            xml: None,
            changed_callback: None,
            calculated: None,
            rules: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Starts a property whose default is `default` for every instance.
    #[must_use]
    pub fn new(default: T) -> Self {
        Self::with_default(Some(DefaultValue::Constant(default.into_value())))
    }

    /// Starts a property whose default is produced per instance.
    #[must_use]
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_default(Some(DefaultValue::Factory(Arc::new(move || {
            factory().into_value()
        }))))
    }

    /// Starts a read-only property computed from the owner's store.
    ///
    /// Calculated properties are never stored, serialized or backed up.
    #[must_use]
    pub fn calculated<F>(calculate: F) -> Self
    where
        F: Fn(&PropertyStore) -> T + Send + Sync + 'static,
    {
        let mut builder = Self::with_default(None);
        builder.calculated = Some(Arc::new(move |store| calculate(store).into_value()));
        builder.flags = PropertyFlags::CALCULATED;
        builder
    }
}

impl<T> PropertyDescriptorBuilder<T> {
    fn flag(mut self, flag: PropertyFlags, on: bool) -> Self {
        self.flags.set(flag, on);
        self
    }

    /// Returns the flags collected so far.
    #[must_use]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Sets whether the value type can be serialized.
    #[must_use]
    pub fn serializable(self, on: bool) -> Self {
        self.flag(PropertyFlags::SERIALIZABLE, on)
    }

    /// Sets whether the serializer writes this property.
    #[must_use]
    pub fn include_in_serialization(self, on: bool) -> Self {
        self.flag(PropertyFlags::INCLUDE_IN_SERIALIZATION, on)
    }

    /// Sets whether edit-session backups capture this property.
    #[must_use]
    pub fn include_in_backup(self, on: bool) -> Self {
        self.flag(PropertyFlags::INCLUDE_IN_BACKUP, on)
    }

    /// Sets whether assigning this property links the value to its owner.
    #[must_use]
    pub fn set_parent(self, on: bool) -> Self {
        self.flag(PropertyFlags::SET_PARENT, on)
    }

    /// Marks the property as declared by the engine.
    #[must_use]
    pub fn engine_owned(self) -> Self {
        self.flag(PropertyFlags::ENGINE_OWNED, true)
    }

    /// Allows null in addition to the value type.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.value_type = self.value_type.nullable();
        self
    }

    /// Overrides the declared value type.
    ///
    /// Useful to pin an object-valued property to a concrete object type.
    #[must_use]
    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Writes the property as an XML attribute called `name`.
    #[must_use]
    pub fn xml_attribute(mut self, name: &'static str) -> Self {
        self.xml = Some(XmlMapping {
            kind: XmlNodeKind::Attribute,
            name,
        });
        self
    }

    /// Writes the property as an XML element called `name`.
    #[must_use]
    pub fn xml_element(mut self, name: &'static str) -> Self {
        self.xml = Some(XmlMapping {
            kind: XmlNodeKind::Element,
            name,
        });
        self
    }

    /// Sets a callback invoked after the property changes on a live object.
    #[must_use]
    pub fn on_changed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn PropertyObject, &PropertyChanged) + Send + Sync + 'static,
    {
        self.changed_callback = Some(Arc::new(callback));
        self
    }

    /// Adds a value rule.
    #[must_use]
    pub fn rule<R: ValueRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub(crate) fn build(self, name: &'static str, owner: &'static str) -> PropertyDescriptor {
        PropertyDescriptor {
            name,
            owner,
            value_type: self.value_type,
            default: self.default,
            flags: self.flags,
            xml: self.xml.unwrap_or(XmlMapping {
                kind: XmlNodeKind::Element,
                name,
            }),
            changed_callback: self.changed_callback,
            calculated: self.calculated,
            rules: self.rules,
        }
    }
}

impl<T> fmt::Debug for PropertyDescriptorBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptorBuilder")
            .field("value_type", &self.value_type)
            .field("default", &self.default)
            .field("flags", &self.flags)
            .field("xml", &self.xml)
            .field("has_changed_callback", &self.changed_callback.is_some())
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

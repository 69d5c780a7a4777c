// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-type property tables.
//!
//! This module provides [`PropertyRegistry`], the ordered set of
//! [`PropertyDescriptor`]s declared by one type, together with the XML name
//! mapping derived from them.

use std::sync::Arc;

use hashbrown::HashMap;
use once_cell::sync::OnceCell;

use crate::error::PropertyError;
use crate::id::Property;
use crate::metadata::{PropertyDescriptor, PropertyDescriptorBuilder, PropertyFlags, XmlNodeKind};
use crate::value::PropertyValue;

#[derive(Debug, Default)]
struct XmlNames {
    to_xml: HashMap<&'static str, (XmlNodeKind, &'static str)>,
    attributes: HashMap<&'static str, &'static str>,
    elements: HashMap<&'static str, &'static str>,
}

/// The property table of one type.
///
/// Descriptors keep their registration order, which is also the order used for
/// default seeding, equality and serialization.
///
/// # Example
///
/// ```rust
/// use understory_property::{Property, PropertyDescriptorBuilder, PropertyRegistry};
///
/// const NAME: Property<String> = Property::new("Name");
///
/// let mut registry = PropertyRegistry::new("Person");
/// registry
///     .register(NAME, PropertyDescriptorBuilder::new(String::new()).xml_attribute("name"))
///     .unwrap();
///
/// assert!(registry.is_registered("Name"));
/// assert_eq!(registry.xml_name("Name"), Some("name"));
/// assert_eq!(registry.property_for_xml_attribute("name"), Some("Name"));
/// assert!(registry.descriptor("Age").is_err());
/// ```
#[derive(Debug)]
pub struct PropertyRegistry {
    owner: &'static str,
    descriptors: Vec<Arc<PropertyDescriptor>>,
    by_name: HashMap<&'static str, usize>,
    xml: OnceCell<XmlNames>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PropertyRegistry {
    /// Creates an empty table for the type called `owner`.
    #[must_use]
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            descriptors: Vec::new(),
            by_name: HashMap::new(),
            xml: OnceCell::new(),
        }
    }

    /// Returns the owning type name.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    fn malformed(&self, property: &str, reason: &'static str) -> PropertyError {
        PropertyError::MalformedDescriptor {
            owner: self.owner,
            property: property.into(),
            reason,
        }
    }

    /// Registers the property `key` described by `builder`.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::DuplicateProperty`] if the name is taken on this type.
    /// - [`PropertyError::MalformedDescriptor`] if the name or XML name is not an
    ///   identifier, the XML name is used by another property as either an
    ///   attribute or an element, or a calculated property asks to be serialized or backed up.
    pub fn register<T: PropertyValue>(
        &mut self,
        key: Property<T>,
        builder: PropertyDescriptorBuilder<T>,
    ) -> Result<Property<T>, PropertyError> {
        let name = key.name();
        if !is_identifier(name) {
            return Err(self.malformed(name, "name is not an identifier"));
        }
        if self.by_name.contains_key(name) {
            return Err(PropertyError::DuplicateProperty {
                owner: self.owner,
                property: name,
            });
        }

        let descriptor = builder.build(name, self.owner);
        let flags = descriptor.flags();
        if flags.contains(PropertyFlags::CALCULATED)
            && flags.intersects(
                PropertyFlags::INCLUDE_IN_SERIALIZATION | PropertyFlags::INCLUDE_IN_BACKUP,
            )
        {
            return Err(self.malformed(name, "calculated properties are never stored"));
        }
        let xml = descriptor.xml();
        if !is_identifier(xml.name) {
            return Err(self.malformed(name, "xml name is not an identifier"));
        }
        let xml_taken = self
            .descriptors
            .iter()
            .any(|other| other.xml().name == xml.name);
        if xml_taken {
            return Err(self.malformed(name, "xml name is already in use"));
        }

        self.by_name.insert(name, self.descriptors.len());
        self.descriptors.push(Arc::new(descriptor));
        // Rebuilt on the next lookup.
        self.xml = OnceCell::new();
        Ok(key)
    }

    /// Returns the number of registered properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns `true` if `name` is registered on this type.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Looks up a descriptor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<PropertyDescriptor>> {
        self.by_name.get(name).map(|&index| &self.descriptors[index])
    }

    /// Looks up a descriptor by name.
    ///
    /// # Errors
    ///
    /// [`PropertyError::PropertyNotRegistered`] if `name` is not registered.
    pub fn descriptor(&self, name: &str) -> Result<&Arc<PropertyDescriptor>, PropertyError> {
        self.get(name).ok_or_else(|| PropertyError::PropertyNotRegistered {
            owner: self.owner,
            property: name.into(),
        })
    }

    /// Iterates descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PropertyDescriptor>> + '_ {
        self.descriptors.iter()
    }

    fn xml_names(&self) -> &XmlNames {
        self.xml.get_or_init(|| {
            let mut names = XmlNames::default();
            for descriptor in &self.descriptors {
                let xml = descriptor.xml();
                names.to_xml.insert(descriptor.name(), (xml.kind, xml.name));
                let reverse = match xml.kind {
                    XmlNodeKind::Attribute => &mut names.attributes,
                    XmlNodeKind::Element => &mut names.elements,
                };
                reverse.insert(xml.name, descriptor.name());
            }
            names
        })
    }

    /// Returns the XML name of a property.
    #[must_use]
    pub fn xml_name(&self, property: &str) -> Option<&'static str> {
        self.xml_names().to_xml.get(property).map(|&(_, name)| name)
    }

    /// Returns the property written as the XML attribute `xml_name`.
    #[must_use]
    pub fn property_for_xml_attribute(&self, xml_name: &str) -> Option<&'static str> {
        self.xml_names().attributes.get(xml_name).copied()
    }

    /// Returns the property written as the XML element `xml_name`.
    #[must_use]
    pub fn property_for_xml_element(&self, xml_name: &str) -> Option<&'static str> {
        self.xml_names().elements.get(xml_name).copied()
    }

    /// Returns the property written under `xml_name`, preferring attributes.
    #[must_use]
    pub fn property_for_xml(&self, xml_name: &str) -> Option<&'static str> {
        self.property_for_xml_attribute(xml_name)
            .or_else(|| self.property_for_xml_element(xml_name))
    }

    /// Returns `true` if the property is written as an XML attribute.
    #[must_use]
    pub fn is_xml_attribute(&self, property: &str) -> bool {
        matches!(
            self.xml_names().to_xml.get(property),
            Some((XmlNodeKind::Attribute, _))
        )
    }

    /// Returns `true` if the property is written as an XML element.
    #[must_use]
    pub fn is_xml_element(&self, property: &str) -> bool {
        matches!(
            self.xml_names().to_xml.get(property),
            Some((XmlNodeKind::Element, _))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PropertyStore;

    const NAME: Property<String> = Property::new("Name");
    const AGE: Property<i64> = Property::new("Age");

    fn person() -> PropertyRegistry {
        let mut registry = PropertyRegistry::new("Person");
        registry
            .register(NAME, PropertyDescriptorBuilder::new(String::new()).xml_attribute("name"))
            .unwrap();
        registry
            .register(AGE, PropertyDescriptorBuilder::new(0_i64))
            .unwrap();
        registry
    }

    #[test]
    fn register_and_lookup() {
        let registry = person();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.owner(), "Person");
        assert!(registry.is_registered("Age"));
        assert!(!registry.is_registered("Height"));
        let names: Vec<_> = registry.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["Name", "Age"]);
        assert_eq!(registry.descriptor("Age").unwrap().owner(), "Person");
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut registry = person();
        let err = registry
            .register(AGE, PropertyDescriptorBuilder::new(1_i64))
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::DuplicateProperty {
                owner: "Person",
                property: "Age"
            }
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        let mut registry = person();
        for bad in ["", "1st", "has space"] {
            let err = registry
                .register(Property::<i64>::new(bad), PropertyDescriptorBuilder::new(0))
                .unwrap_err();
            assert!(
                matches!(err, PropertyError::MalformedDescriptor { .. }),
                "{bad:?} should be malformed"
            );
        }

        let clash = registry
            .register(
                Property::<String>::new("Nick"),
                PropertyDescriptorBuilder::new(String::new()).xml_attribute("name"),
            )
            .unwrap_err();
        assert!(matches!(clash, PropertyError::MalformedDescriptor { .. }));

        // Serialized members are keyed by XML name alone, whatever the node kind.
        let cross_kind = registry
            .register(
                Property::<String>::new("Label"),
                PropertyDescriptorBuilder::new(String::new()).xml_element("name"),
            )
            .unwrap_err();
        assert!(matches!(
            cross_kind,
            PropertyError::MalformedDescriptor { reason: "xml name is already in use", .. }
        ));
        assert!(!registry.is_registered("Label"));

        let stored_calculation = registry
            .register(
                Property::<i64>::new("Twice"),
                PropertyDescriptorBuilder::calculated(|_: &PropertyStore| 2).include_in_backup(true),
            )
            .unwrap_err();
        assert!(matches!(
            stored_calculation,
            PropertyError::MalformedDescriptor { .. }
        ));
    }

    #[test]
    fn unregistered_lookup_fails() {
        let registry = person();
        assert_eq!(
            registry.descriptor("Height").unwrap_err(),
            PropertyError::PropertyNotRegistered {
                owner: "Person",
                property: "Height".into()
            }
        );
    }

    #[test]
    fn xml_maps_are_bidirectional() {
        let registry = person();
        assert_eq!(registry.xml_name("Name"), Some("name"));
        assert_eq!(registry.xml_name("Age"), Some("Age"));
        assert!(registry.is_xml_attribute("Name"));
        assert!(registry.is_xml_element("Age"));
        assert_eq!(registry.property_for_xml_attribute("name"), Some("Name"));
        assert_eq!(registry.property_for_xml_element("Age"), Some("Age"));
        assert_eq!(registry.property_for_xml_element("name"), None);
        assert_eq!(registry.property_for_xml("name"), Some("Name"));
    }

    #[test]
    fn xml_maps_follow_late_registration() {
        let mut registry = person();
        assert_eq!(registry.property_for_xml("height"), None);
        registry
            .register(
                Property::<f64>::new("Height"),
                PropertyDescriptorBuilder::new(0.0).xml_element("height"),
            )
            .unwrap();
        assert_eq!(registry.property_for_xml("height"), Some("Height"));
    }
}

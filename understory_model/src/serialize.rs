// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Serialization of model graphs.
//!
//! A model is written as a [`SerializedModel`]: its registered type name, a graph
//! id, and its members keyed by XML name. A model that appears more than once
//! in a graph, including through a cycle, is written in full the first time and
//! as a `graph_ref_id` afterwards.
//!
//! Only properties that are serializable, included in serialization, and
//! neither engine-owned nor calculated are written. Reading constructs each
//! model through the factory of its registered type name and re-applies the
//! values without notifications or value rules. The result is clean and flagged
//! as deserialized.

use core::fmt;
use std::io;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use understory_property::{ObservableCollection, PropertyDescriptor, PropertyValue, Value};

use crate::error::SerializationError;
use crate::model::{Model, SetOptions};
use crate::services::ModelServices;
use crate::types;

/// Writes and reads models.
pub trait ModelSerializer: Send + Sync + fmt::Debug {
    /// Writes `model` and every model it references.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be represented or the writer fails.
    fn serialize(
        &self,
        model: &Model,
        writer: &mut dyn io::Write,
    ) -> Result<(), SerializationError>;

    /// Reads a model graph written by [`serialize`](Self::serialize).
    ///
    /// # Errors
    ///
    /// Fails on malformed input, unknown type or member names, or dangling
    /// graph references.
    fn deserialize(
        &self,
        services: &ModelServices,
        reader: &mut dyn io::Read,
    ) -> Result<Model, SerializationError>;

    /// Writes only the listed members of `model`.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be represented.
    fn serialize_members(
        &self,
        model: &Model,
        members: &[&'static str],
    ) -> Result<Vec<u8>, SerializationError>;

    /// Reads members written by [`serialize_members`](Self::serialize_members)
    /// for a model of the same type, without applying them.
    ///
    /// # Errors
    ///
    /// Fails on malformed input or unknown member names.
    fn deserialize_members(
        &self,
        model: &Model,
        data: &[u8],
    ) -> Result<Vec<(&'static str, Value)>, SerializationError>;
}

/// The serialized form of one model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedModel {
    /// The registered type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The id of this model within its graph, starting at 1.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub graph_id: u32,
    /// Set instead of `graph_id` when the model was already written.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub graph_ref_id: u32,
    /// The members, in registration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<SerializedProperty>,
}

/// One member of a [`SerializedModel`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedProperty {
    /// The XML name of the property.
    pub name: String,
    /// The value.
    pub value: SerializedValue,
}

/// The serialized form of a [`Value`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SerializedValue {
    /// [`Value::Null`].
    Null,
    /// [`Value::Bool`].
    Bool(bool),
    /// [`Value::Int`].
    Int(i64),
    /// [`Value::Float`]. NaN and the infinities are written as the strings
    /// `"NaN"`, `"inf"` and `"-inf"`.
    Float(#[serde(with = "float_repr")] f64),
    /// [`Value::Text`].
    Text(String),
    /// [`Value::Bytes`].
    Bytes(Vec<u8>),
    /// [`Value::List`].
    List(Vec<SerializedValue>),
    /// An [`ObservableCollection`].
    Collection(Vec<SerializedValue>),
    /// A nested model.
    Model(Box<SerializedModel>),
}

mod float_repr {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid float {other:?}"))),
            },
        }
    }
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn is_written(descriptor: &PropertyDescriptor) -> bool {
    descriptor.is_serializable()
        && descriptor.include_in_serialization()
        && !descriptor.is_engine_owned()
        && !descriptor.is_calculated()
}

#[derive(Copy, Clone)]
enum Members<'a> {
    Serialized,
    Only(&'a [&'static str]),
}

#[derive(Default)]
struct GraphWriter {
    ids: HashMap<usize, u32>,
    next: u32,
}

impl GraphWriter {
    fn model(
        &mut self,
        model: &Model,
        members: Members<'_>,
    ) -> Result<SerializedModel, SerializationError> {
        if let Some(&id) = self.ids.get(&model.addr()) {
            return Ok(SerializedModel {
                type_name: model.type_name().to_owned(),
                graph_id: 0,
                graph_ref_id: id,
                properties: Vec::new(),
            });
        }
        self.next += 1;
        let graph_id = self.next;
        self.ids.insert(model.addr(), graph_id);

        let registry = model.registry();
        let mut properties = Vec::new();
        for descriptor in registry.iter() {
            let name = descriptor.name();
            let included = match members {
                Members::Serialized => is_written(descriptor),
                Members::Only(names) => names.contains(&name) && !descriptor.is_calculated(),
            };
            if !included {
                continue;
            }
            let value = model.get_value(name)?;
            properties.push(SerializedProperty {
                name: registry.xml_name(name).unwrap_or(name).to_owned(),
                value: self.value(name, &value)?,
            });
        }
        Ok(SerializedModel {
            type_name: model.type_name().to_owned(),
            graph_id,
            graph_ref_id: 0,
            properties,
        })
    }

    fn value(
        &mut self,
        property: &'static str,
        value: &Value,
    ) -> Result<SerializedValue, SerializationError> {
        Ok(match value {
            Value::Null => SerializedValue::Null,
            Value::Bool(v) => SerializedValue::Bool(*v),
            Value::Int(v) => SerializedValue::Int(*v),
            Value::Float(v) => SerializedValue::Float(*v),
            Value::Text(v) => SerializedValue::Text(v.clone()),
            Value::Bytes(v) => SerializedValue::Bytes(v.clone()),
            Value::List(items) => SerializedValue::List(self.values(property, items)?),
            Value::Object(object) => {
                if let Some(model) = Model::from_object(object) {
                    SerializedValue::Model(Box::new(self.model(&model, Members::Serialized)?))
                } else if let Some(collection) = object.downcast_ref::<ObservableCollection>() {
                    SerializedValue::Collection(self.values(property, &collection.to_vec())?)
                } else {
                    return Err(SerializationError::UnsupportedValue {
                        property,
                        value_type: object.type_name(),
                    });
                }
            }
        })
    }

    fn values(
        &mut self,
        property: &'static str,
        items: &[Value],
    ) -> Result<Vec<SerializedValue>, SerializationError> {
        items.iter().map(|item| self.value(property, item)).collect()
    }
}

struct GraphReader<'a> {
    services: &'a ModelServices,
    models: HashMap<u32, Model>,
}

impl<'a> GraphReader<'a> {
    fn new(services: &'a ModelServices) -> Self {
        Self {
            services,
            models: HashMap::new(),
        }
    }

    fn model(&mut self, data: &SerializedModel) -> Result<Model, SerializationError> {
        if data.graph_ref_id != 0 {
            return self
                .models
                .get(&data.graph_ref_id)
                .cloned()
                .ok_or(SerializationError::DanglingReference(data.graph_ref_id));
        }
        let kind = types::lookup(&data.type_name)
            .ok_or_else(|| SerializationError::UnknownType(data.type_name.clone()))?;
        let model = (kind.construct)(self.services)?;
        if data.graph_id != 0 {
            self.models.insert(data.graph_id, model.clone());
        }
        for (name, value) in self.members(&model, &data.properties)? {
            model.set_value_with(name, value, SetOptions::QUIET)?;
        }
        model.clear_dirty();
        model.mark_deserialized();
        Ok(model)
    }

    fn members(
        &mut self,
        model: &Model,
        properties: &[SerializedProperty],
    ) -> Result<Vec<(&'static str, Value)>, SerializationError> {
        let registry = model.registry();
        properties
            .iter()
            .map(|property| {
                let name = registry
                    .property_for_xml(&property.name)
                    .or_else(|| registry.get(&property.name).map(|d| d.name()))
                    .ok_or_else(|| SerializationError::UnknownProperty {
                        model: model.type_name(),
                        member: property.name.clone(),
                    })?;
                Ok((name, self.value(&property.value)?))
            })
            .collect()
    }

    fn value(&mut self, value: &SerializedValue) -> Result<Value, SerializationError> {
        Ok(match value {
            SerializedValue::Null => Value::Null,
            SerializedValue::Bool(v) => Value::Bool(*v),
            SerializedValue::Int(v) => Value::Int(*v),
            SerializedValue::Float(v) => Value::Float(*v),
            SerializedValue::Text(v) => Value::Text(v.clone()),
            SerializedValue::Bytes(v) => Value::Bytes(v.clone()),
            SerializedValue::List(items) => Value::List(self.values(items)?),
            SerializedValue::Collection(items) => {
                Arc::new(ObservableCollection::from_items(self.values(items)?)).into_value()
            }
            SerializedValue::Model(model) => self.model(model)?.into_value(),
        })
    }

    fn values(&mut self, items: &[SerializedValue]) -> Result<Vec<Value>, SerializationError> {
        items.iter().map(|item| self.value(item)).collect()
    }
}

/// The default [`ModelSerializer`], backed by `serde_json`.
///
/// # Example
///
/// ```rust
/// use understory_model::{Model, ModelServices, ModelType};
/// use understory_property::{Property, PropertyDescriptorBuilder, PropertyError, PropertyRegistry};
///
/// struct Note;
///
/// impl Note {
///     const TEXT: Property<String> = Property::new("Text");
/// }
///
/// impl ModelType for Note {
///     const TYPE_NAME: &'static str = "Note";
///
///     fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
///         registry.register(
///             Self::TEXT,
///             PropertyDescriptorBuilder::new(String::new()).xml_attribute("text"),
///         )?;
///         Ok(())
///     }
/// }
///
/// let note = Model::new::<Note>();
/// note.set(Note::TEXT, "hello".to_owned()).unwrap();
///
/// let mut bytes = Vec::new();
/// note.serialize(&mut bytes).unwrap();
/// let copy = Model::deserialize(&ModelServices::default(), &mut bytes.as_slice()).unwrap();
///
/// assert_eq!(copy.get(Note::TEXT), "hello");
/// assert!(copy.is_deserialized());
/// assert!(!copy.is_dirty());
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// A serializer that indents its output.
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Converts `model` and every model it references to the serialized form.
    ///
    /// # Errors
    ///
    /// [`SerializationError::UnsupportedValue`] if a property holds an object
    /// that is neither a model nor an [`ObservableCollection`].
    pub fn to_serialized(&self, model: &Model) -> Result<SerializedModel, SerializationError> {
        GraphWriter::default().model(model, Members::Serialized)
    }

    /// Rebuilds a model graph from the serialized form.
    ///
    /// # Errors
    ///
    /// Fails on unknown type or member names, dangling graph references, or
    /// values that do not match the declared types.
    pub fn from_serialized(
        &self,
        services: &ModelServices,
        data: &SerializedModel,
    ) -> Result<Model, SerializationError> {
        GraphReader::new(services).model(data)
    }

    fn write(
        &self,
        data: &SerializedModel,
        writer: &mut dyn io::Write,
    ) -> Result<(), SerializationError> {
        if self.pretty {
            serde_json::to_writer_pretty(writer, data)?;
        } else {
            serde_json::to_writer(writer, data)?;
        }
        Ok(())
    }
}

impl ModelSerializer for JsonSerializer {
    fn serialize(
        &self,
        model: &Model,
        writer: &mut dyn io::Write,
    ) -> Result<(), SerializationError> {
        let data = self.to_serialized(model)?;
        self.write(&data, writer)?;
        tracing::debug!(model = model.type_name(), "serialized model graph");
        Ok(())
    }

    fn deserialize(
        &self,
        services: &ModelServices,
        reader: &mut dyn io::Read,
    ) -> Result<Model, SerializationError> {
        let data: SerializedModel = serde_json::from_reader(reader)?;
        let model = self.from_serialized(services, &data)?;
        tracing::debug!(model = model.type_name(), "deserialized model graph");
        Ok(model)
    }

    fn serialize_members(
        &self,
        model: &Model,
        members: &[&'static str],
    ) -> Result<Vec<u8>, SerializationError> {
        let data = GraphWriter::default().model(model, Members::Only(members))?;
        let mut bytes = Vec::new();
        self.write(&data, &mut bytes)?;
        Ok(bytes)
    }

    fn deserialize_members(
        &self,
        model: &Model,
        data: &[u8],
    ) -> Result<Vec<(&'static str, Value)>, SerializationError> {
        let data: SerializedModel = serde_json::from_slice(data)?;
        if data.type_name != model.type_name() {
            return Err(SerializationError::UnknownType(data.type_name));
        }
        let mut reader = GraphReader::new(model.services());
        // The target stands in for its own graph id so self-references resolve.
        if data.graph_id != 0 {
            reader.models.insert(data.graph_id, model.clone());
        }
        reader.members(model, &data.properties)
    }
}

impl Model {
    /// Writes this model and every model it references with its serializer.
    ///
    /// # Errors
    ///
    /// See [`ModelSerializer::serialize`].
    pub fn serialize(&self, writer: &mut dyn io::Write) -> Result<(), SerializationError> {
        self.services().serializer().serialize(self, writer)
    }

    /// Reads a model graph with the serializer of `services`.
    ///
    /// The root and every nested model are constructed with `services`.
    ///
    /// # Errors
    ///
    /// See [`ModelSerializer::deserialize`].
    pub fn deserialize(
        services: &ModelServices,
        reader: &mut dyn io::Read,
    ) -> Result<Self, SerializationError> {
        services.serializer().deserialize(services, reader)
    }

    /// Returns an independent copy of this model graph.
    ///
    /// Tries a serializer round trip first. If that fails, falls back to a new
    /// instance of the same type holding the same values, with nested objects
    /// shared. Returns `None` and logs if both fail.
    #[must_use]
    pub fn deep_clone(&self) -> Option<Self> {
        let serializer = self.services().serializer();
        let mut bytes = Vec::new();
        let round_trip = serializer
            .serialize(self, &mut bytes)
            .and_then(|()| serializer.deserialize(self.services(), &mut bytes.as_slice()));
        let err = match round_trip {
            Ok(copy) => return Some(copy),
            Err(err) => err,
        };
        tracing::debug!(model = self.type_name(), %err, "deep clone falling back to value copy");
        match self.copy_values() {
            Ok(copy) => Some(copy),
            Err(err) => {
                tracing::warn!(model = self.type_name(), %err, "deep clone failed");
                None
            }
        }
    }

    fn copy_values(&self) -> Result<Self, SerializationError> {
        let kind = types::lookup(self.type_name())
            .ok_or_else(|| SerializationError::UnknownType(self.type_name().to_owned()))?;
        let copy = (kind.construct)(self.services())?;
        for descriptor in self
            .registry()
            .iter()
            .filter(|d| !d.is_engine_owned() && !d.is_calculated())
        {
            let value = self.get_value(descriptor.name())?;
            copy.set_value_with(descriptor.name(), value, SetOptions::QUIET)?;
        }
        copy.clear_dirty();
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelType;
    use understory_property::{
        ObjectRef, Property, PropertyDescriptorBuilder, PropertyError, PropertyObject,
        PropertyRegistry,
    };

    struct Folder;

    impl Folder {
        const NAME: Property<String> = Property::new("Name");
        const CHILD: Property<Option<Model>> = Property::new("Child");
        const SECRET: Property<String> = Property::new("Secret");
        const EXTRA: Property<Value> = Property::new("Extra");
    }

    impl ModelType for Folder {
        const TYPE_NAME: &'static str = "serialize::tests::Folder";

        fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
            registry.register(
                Self::NAME,
                PropertyDescriptorBuilder::new(String::new()).xml_attribute("name"),
            )?;
            registry.register(Self::CHILD, PropertyDescriptorBuilder::new(None))?;
            registry.register(
                Self::SECRET,
                PropertyDescriptorBuilder::new(String::new()).include_in_serialization(false),
            )?;
            registry.register(Self::EXTRA, PropertyDescriptorBuilder::new(Value::Null))?;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Opaque;

    impl PropertyObject for Opaque {
        fn type_name(&self) -> &'static str {
            "Opaque"
        }
    }

    #[test]
    fn members_use_xml_names_and_skip_excluded_properties() {
        let folder = Model::new::<Folder>();
        folder.set(Folder::NAME, "root".into()).unwrap();
        folder.set(Folder::SECRET, "hidden".into()).unwrap();

        let data = JsonSerializer::default().to_serialized(&folder).unwrap();
        let names: Vec<_> = data.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["name", "Child", "Extra"]);
        assert_eq!(data.graph_id, 1);
    }

    #[test]
    fn shared_models_are_written_once() {
        let root = Model::new::<Folder>();
        let child = Model::new::<Folder>();
        child.set(Folder::CHILD, Some(root.clone())).unwrap();
        root.set(Folder::CHILD, Some(child)).unwrap();

        let data = JsonSerializer::default().to_serialized(&root).unwrap();
        let SerializedValue::Model(child) = &data.properties[1].value else {
            panic!("child not written as a model");
        };
        let SerializedValue::Model(back) = &child.properties[1].value else {
            panic!("back reference not written as a model");
        };
        assert_eq!(back.graph_ref_id, 1);
        assert!(back.properties.is_empty());

        let copy = JsonSerializer::default()
            .from_serialized(&ModelServices::default(), &data)
            .unwrap();
        let child = copy.get(Folder::CHILD).unwrap();
        assert!(child.get(Folder::CHILD).unwrap().ptr_eq(&copy));
    }

    #[test]
    fn unsupported_objects_are_rejected() {
        let folder = Model::new::<Folder>();
        folder
            .set(Folder::EXTRA, Value::Object(ObjectRef::new(Opaque)))
            .unwrap();
        let err = JsonSerializer::default().to_serialized(&folder).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::UnsupportedValue { property: "Extra", value_type: "Opaque" }
        ));
        // The round trip fails, so deep_clone shares the object instead.
        let copy = folder.deep_clone().unwrap();
        assert!(!copy.ptr_eq(&folder));
        assert_eq!(copy.get_value("Extra").unwrap(), folder.get_value("Extra").unwrap());
    }

    #[test]
    fn non_finite_floats_round_trip() {
        let folder = Model::new::<Folder>();
        let floats = Value::List(vec![
            Value::Float(f64::NAN),
            Value::Float(f64::INFINITY),
            Value::Float(f64::NEG_INFINITY),
            Value::Float(1.5),
        ]);
        folder.set(Folder::EXTRA, floats.clone()).unwrap();

        let mut bytes = Vec::new();
        folder.serialize(&mut bytes).unwrap();
        let json = String::from_utf8(bytes.clone()).unwrap();
        assert!(json.contains(r#""NaN""#) && json.contains(r#""-inf""#));

        let copy = Model::deserialize(&ModelServices::default(), &mut bytes.as_slice()).unwrap();
        assert_eq!(copy.get(Folder::EXTRA), floats);
        assert!(copy == folder);
    }

    #[test]
    fn xml_names_cannot_repeat_across_node_kinds() {
        struct Tag;

        impl Tag {
            const A: Property<String> = Property::new("A");
            const B: Property<String> = Property::new("B");
        }

        impl ModelType for Tag {
            const TYPE_NAME: &'static str = "serialize::tests::Tag";

            fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
                registry.register(
                    Self::A,
                    PropertyDescriptorBuilder::new(String::new()).xml_attribute("x"),
                )?;
                registry.register(
                    Self::B,
                    PropertyDescriptorBuilder::new(String::new()).xml_element("x"),
                )?;
                Ok(())
            }
        }

        assert!(matches!(
            Model::try_new::<Tag>(),
            Err(crate::ModelError::Property(PropertyError::MalformedDescriptor { .. }))
        ));
    }

    #[test]
    fn unknown_type_and_members_are_errors() {
        let services = ModelServices::default();
        let bogus = br#"{"type":"serialize::tests::Missing","graph_id":1}"#;
        assert!(matches!(
            Model::deserialize(&services, &mut &bogus[..]),
            Err(SerializationError::UnknownType(_))
        ));

        Model::register_type::<Folder>().unwrap();
        let stray = br#"{"type":"serialize::tests::Folder","graph_id":1,
            "properties":[{"name":"Nope","value":{"kind":"int","value":1}}]}"#;
        assert!(matches!(
            Model::deserialize(&services, &mut &stray[..]),
            Err(SerializationError::UnknownProperty { member, .. }) if member == "Nope"
        ));
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model type declarations and the process-wide factory table.

use core::any::TypeId;
use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use understory_property::{PropertyError, PropertyRegistry};

use crate::error::ModelError;
use crate::model::Model;
use crate::services::ModelServices;
use crate::validation::{BusinessRuleValidationResult, FieldValidationResult};

/// Declares a model type: its properties and its lifecycle and validation hooks.
///
/// Implementors are usually zero-sized markers. Every hook has a no-op default.
///
/// # Example
///
/// ```rust
/// use understory_model::{FieldValidationResult, Model, ModelType};
/// use understory_property::{Property, PropertyDescriptorBuilder, PropertyError, PropertyRegistry};
///
/// struct Person;
///
/// impl Person {
///     const NAME: Property<String> = Property::new("Name");
/// }
///
/// impl ModelType for Person {
///     const TYPE_NAME: &'static str = "Person";
///
///     fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
///         registry.register(Self::NAME, PropertyDescriptorBuilder::new(String::new()))?;
///         Ok(())
///     }
///
///     fn validate_fields(model: &Model, results: &mut Vec<FieldValidationResult>) {
///         if model.get(Self::NAME).is_empty() {
///             results.push(FieldValidationResult::warning("Name", "Name is empty"));
///         }
///     }
/// }
///
/// let person = Model::new::<Person>();
/// assert!(person.has_warnings());
/// ```
pub trait ModelType: 'static {
    /// The name the type is registered, logged and serialized under.
    ///
    /// Must be unique within the process.
    const TYPE_NAME: &'static str;

    /// Declares the properties of the type.
    ///
    /// Runs once per process, on first use of the type.
    ///
    /// # Errors
    ///
    /// Propagates registration errors.
    fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError>;

    /// Runs before the properties are seeded with their defaults.
    fn on_initializing(_model: &Model) {}

    /// Runs after the properties are seeded.
    fn on_initialized(_model: &Model) {}

    /// Runs after a deserialized instance received all its values.
    fn on_deserialized(_model: &Model) {}

    /// Adds field results during a validation pass.
    fn validate_fields(_model: &Model, _results: &mut Vec<FieldValidationResult>) {}

    /// Adds business-rule results during a validation pass.
    fn validate_business_rules(_model: &Model, _results: &mut Vec<BusinessRuleValidationResult>) {
    }
}

/// The hooks of a [`ModelType`], erased so an instance can carry them.
#[derive(Copy, Clone)]
pub(crate) struct ModelKind {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) on_initializing: fn(&Model),
    pub(crate) on_initialized: fn(&Model),
    pub(crate) on_deserialized: fn(&Model),
    pub(crate) validate_fields: fn(&Model, &mut Vec<FieldValidationResult>),
    pub(crate) validate_business_rules: fn(&Model, &mut Vec<BusinessRuleValidationResult>),
    pub(crate) construct: fn(&ModelServices) -> Result<Model, ModelError>,
}

impl ModelKind {
    pub(crate) fn of<M: ModelType>() -> Self {
        Self {
            name: M::TYPE_NAME,
            type_id: TypeId::of::<M>(),
            on_initializing: M::on_initializing,
            on_initialized: M::on_initialized,
            on_deserialized: M::on_deserialized,
            validate_fields: M::validate_fields,
            validate_business_rules: M::validate_business_rules,
            construct: Model::with_services::<M>,
        }
    }
}

impl fmt::Debug for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelKind")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

static KINDS: Lazy<Mutex<HashMap<&'static str, ModelKind>>> = Lazy::new(Default::default);

fn kinds() -> MutexGuard<'static, HashMap<&'static str, ModelKind>> {
    KINDS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Records `kind` so the serializer can construct it by name.
pub(crate) fn remember(kind: ModelKind) {
    let mut kinds = kinds();
    if let Some(existing) = kinds.get(kind.name) {
        if existing.type_id != kind.type_id {
            tracing::warn!(
                model = kind.name,
                "two model types share a type name; keeping the first"
            );
        }
        return;
    }
    kinds.insert(kind.name, kind);
}

/// Returns the kind registered under `name`.
pub(crate) fn lookup(name: &str) -> Option<ModelKind> {
    kinds().get(name).copied()
}

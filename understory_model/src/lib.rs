// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Model: observable, validatable, serializable model objects.
//!
//! This crate layers behavior on top of the registered properties of
//! `understory_property`. A model type declares its properties once through
//! [`ModelType`]; every [`Model`] of that type then gets:
//!
//! - typed reads and writes through one pipeline that checks types, raises
//!   change events, runs value rules and tracks dirtiness;
//! - change relays, so edits inside nested models and collections mark the
//!   owner dirty;
//! - validation through type hooks and an optional external [`Validator`],
//!   with results collected in a [`ValidationContext`];
//! - structural equality through a pluggable [`ModelEqualityComparer`];
//! - graph serialization through a pluggable [`ModelSerializer`], with
//!   [`JsonSerializer`] as the default;
//! - backups and edit sessions.
//!
//! Collaborators are injected per model through [`ModelServices`], and shared
//! switches live in [`ModelConfig`].
//!
//! ## Example
//!
//! ```rust
//! use understory_model::{FieldValidationResult, Model, ModelType};
//! use understory_property::{
//!     Property, PropertyDescriptorBuilder, PropertyError, PropertyRegistry, Required,
//! };
//!
//! struct Customer;
//!
//! impl Customer {
//!     const NAME: Property<String> = Property::new("Name");
//!     const CREDIT: Property<i64> = Property::new("Credit");
//! }
//!
//! impl ModelType for Customer {
//!     const TYPE_NAME: &'static str = "Customer";
//!
//!     fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
//!         registry.register(Self::NAME, PropertyDescriptorBuilder::new(String::new()).rule(Required))?;
//!         registry.register(Self::CREDIT, PropertyDescriptorBuilder::new(0_i64))?;
//!         Ok(())
//!     }
//!
//!     fn validate_fields(model: &Model, results: &mut Vec<FieldValidationResult>) {
//!         if model.get(Self::CREDIT) < 0 {
//!             results.push(FieldValidationResult::error("Credit", "Credit cannot be negative"));
//!         }
//!     }
//! }
//!
//! let customer = Model::new::<Customer>();
//! customer.set(Customer::CREDIT, -5).unwrap();
//! assert!(customer.has_errors());
//! assert_eq!(customer.field_errors("Credit").len(), 1);
//!
//! customer.set(Customer::CREDIT, 10).unwrap();
//! assert!(!customer.has_errors());
//!
//! customer.set(Customer::NAME, "Ann".to_owned()).unwrap();
//! customer.set(Customer::NAME, String::new()).unwrap();
//! assert_eq!(customer.field_errors("Name")[0].message(), "Name is required");
//! assert!(customer.is_dirty());
//! ```
//!
//! ## Logging
//!
//! The crate logs through `tracing`. Ignored writes and swallowed failures are
//! reported at `warn`, lifecycle events at `debug`, and per-write detail at
//! `trace`. Every event carries a `model` field, and a `property` field where one
//! applies.

mod config;
mod edit;
mod equality;
mod error;
mod model;
mod relay;
mod serialize;
mod services;
mod types;
mod validation;

pub use config::ModelConfig;
pub use edit::ModelBackup;
pub use equality::{DefaultEqualityComparer, ModelEqualityComparer};
pub use error::{ConfigError, ModelError, SerializationError};
pub use model::{Model, PropertyChanging, SetOptions, WeakModel};
pub use serialize::{
    JsonSerializer, ModelSerializer, SerializedModel, SerializedProperty, SerializedValue,
};
pub use services::ModelServices;
pub use types::ModelType;
pub use validation::{
    BusinessRuleValidationResult, DataErrorsChanged, FieldValidationResult, ValidationChangeKind,
    ValidationContext, ValidationContextChange, ValidationResult, ValidationResultType,
    ValidationSuspension, Validator, ValidatorProvider,
};

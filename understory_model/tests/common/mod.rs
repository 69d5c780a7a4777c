// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model types shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::{Arc, Mutex};

use understory_model::{BusinessRuleValidationResult, FieldValidationResult, Model, ModelType};
use understory_property::{
    MaxLength, ObservableCollection, Property, PropertyDescriptorBuilder, PropertyError,
    PropertyRegistry, PropertyStore, Range, Required, ValueType,
};

/// Routes `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Names seen by the `Name` change callback, with the owner recovered.
pub static NAME_CHANGES: Mutex<Vec<String>> = Mutex::new(Vec::new());

pub struct Person;

impl Person {
    pub const NAME: Property<String> = Property::new("Name");
    pub const AGE: Property<i64> = Property::new("Age");
    pub const EMAIL: Property<Option<String>> = Property::new("Email");
    pub const ADDRESS: Property<Option<Model>> = Property::new("Address");
    pub const FRIENDS: Property<Arc<ObservableCollection>> = Property::new("Friends");
    pub const NICKNAME: Property<String> = Property::new("Nickname");
    pub const SUMMARY: Property<String> = Property::new("Summary");
}

impl ModelType for Person {
    const TYPE_NAME: &'static str = "tests::Person";

    fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
        registry.register(
            Self::NAME,
            PropertyDescriptorBuilder::new(String::new())
                .xml_attribute("name")
                .rule(MaxLength(20))
                .on_changed(|owner, change| {
                    let Some(model) = Model::from_property_object(owner) else {
                        return;
                    };
                    if let Some(name) = change.new_value.as_str() {
                        let seen = format!("{}:{name}", model.type_name());
                        NAME_CHANGES.lock().unwrap().push(seen);
                    }
                }),
        )?;
        registry.register(
            Self::AGE,
            PropertyDescriptorBuilder::new(0_i64).rule(Range::new(0.0, 150.0)),
        )?;
        registry.register(Self::EMAIL, PropertyDescriptorBuilder::new(None))?;
        registry.register(
            Self::ADDRESS,
            PropertyDescriptorBuilder::new(None)
                .value_type(ValueType::object(Address::TYPE_NAME).nullable()),
        )?;
        registry.register(
            Self::FRIENDS,
            PropertyDescriptorBuilder::with_factory(|| Arc::new(ObservableCollection::new())),
        )?;
        registry.register(
            Self::NICKNAME,
            PropertyDescriptorBuilder::new(String::new()).include_in_backup(false),
        )?;
        registry.register(
            Self::SUMMARY,
            PropertyDescriptorBuilder::calculated(|store: &PropertyStore| {
                format!(
                    "{} ({})",
                    store.get_as::<String>("Name"),
                    store.get_as::<i64>("Age")
                )
            }),
        )?;
        Ok(())
    }

    fn validate_fields(model: &Model, results: &mut Vec<FieldValidationResult>) {
        if let Some(email) = model.get(Self::EMAIL) {
            if !email.contains('@') {
                results.push(FieldValidationResult::error("Email", "Email is invalid"));
            }
        }
    }

    fn validate_business_rules(model: &Model, results: &mut Vec<BusinessRuleValidationResult>) {
        if model.get(Self::AGE) > 120 {
            results.push(BusinessRuleValidationResult::warning("Age is unusually high"));
        }
    }
}

pub struct Address;

impl Address {
    pub const STREET: Property<String> = Property::new("Street");
    pub const CITY: Property<String> = Property::new("City");
}

impl ModelType for Address {
    const TYPE_NAME: &'static str = "tests::Address";

    fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
        registry.register(
            Self::STREET,
            PropertyDescriptorBuilder::new(String::new()).rule(Required),
        )?;
        registry.register(Self::CITY, PropertyDescriptorBuilder::new(String::new()))?;
        Ok(())
    }
}

pub fn person(name: &str, age: i64) -> Model {
    let person = Model::new::<Person>();
    person.set(Person::NAME, name.to_owned()).unwrap();
    person.set(Person::AGE, age).unwrap();
    person
}

pub fn address(street: &str, city: &str) -> Model {
    let address = Model::new::<Address>();
    address.set(Address::STREET, street.to_owned()).unwrap();
    address.set(Address::CITY, city.to_owned()).unwrap();
    address
}

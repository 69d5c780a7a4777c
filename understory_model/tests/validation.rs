// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for validation passes, suspension, external validators and manual
//! results.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{Address, Person, address, person};
use understory_model::{
    BusinessRuleValidationResult, DataErrorsChanged, FieldValidationResult, Model, ModelConfig,
    ModelError, ModelServices, SetOptions, ValidationContext, Validator, ValidatorProvider,
};
use understory_property::{EventSource, Subscription, Value};

type PropertyLog = Arc<Mutex<Vec<Option<String>>>>;

fn record(source: &EventSource<DataErrorsChanged>) -> (PropertyLog, Subscription) {
    let log = PropertyLog::default();
    let sink = log.clone();
    let subscription = source.subscribe(move |args: &DataErrorsChanged| {
        sink.lock().unwrap().push(args.property.clone());
    });
    (log, subscription)
}

#[test]
fn value_rules_report_and_clear_field_errors() {
    let person = person("Ann", 30);
    assert!(!person.has_errors());

    person.set(Person::AGE, 200).unwrap();
    let errors = person.field_errors("Age");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message(), "Age must be between 0 and 150");
    assert_eq!(person.get(Person::AGE), 200);

    person.set(Person::AGE, 30).unwrap();
    assert!(person.field_errors("Age").is_empty());
    assert!(!person.has_errors());
}

#[test]
fn type_hooks_contribute_results() {
    let person = person("Ann", 130);
    assert!(person.has_warnings());
    assert_eq!(
        person.business_rule_warnings()[0].message(),
        "Age is unusually high"
    );

    person.set(Person::EMAIL, Some("nope".to_owned())).unwrap();
    assert!(person.has_errors());
    assert_eq!(person.field_errors("Email")[0].message(), "Email is invalid");

    person.set(Person::EMAIL, Some("ann@example.com".to_owned())).unwrap();
    assert!(person.field_errors("Email").is_empty());
}

#[test]
fn errors_changed_fires_once_per_affected_property() {
    let person = person("Ann", 30);
    let (errors, _errors_subscription) = record(person.errors_changed());
    let (warnings, _warnings_subscription) = record(person.warnings_changed());

    person.set(Person::AGE, 200).unwrap();
    assert_eq!(*errors.lock().unwrap(), [Some("Age".to_owned())]);

    // Same message, no change in the context.
    person.set(Person::AGE, 201).unwrap();
    assert_eq!(errors.lock().unwrap().len(), 1);

    person.set(Person::AGE, 130).unwrap();
    assert_eq!(errors.lock().unwrap().len(), 2);
    assert_eq!(*warnings.lock().unwrap(), [None]);
}

#[test]
fn validated_reports_every_committed_pass() {
    let person = person("Ann", 30);
    let contexts: Arc<Mutex<Vec<ValidationContext>>> = Arc::default();
    let sink = contexts.clone();
    let _subscription = person
        .validated()
        .subscribe(move |context| sink.lock().unwrap().push(context.clone()));

    person.set(Person::AGE, 200).unwrap();
    person.validate_with(true).unwrap();
    let contexts = contexts.lock().unwrap();
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0], contexts[1]);
    assert_eq!(contexts[1].error_count(), 1);
}

#[test]
fn suspension_defers_rules_until_resumed() {
    let person = person("Ann", 30);
    {
        let _suspended = person.suspend_validation();
        assert!(person.is_validation_suspended());
        person.set(Person::AGE, 200).unwrap();
        person.set(Person::NAME, "A name that is far too long".to_owned()).unwrap();
        assert!(person.validation_context().is_empty());
        assert!(!person.is_validated());
    }
    assert!(!person.is_validation_suspended());
    assert!(person.is_validated());
    assert_eq!(person.field_errors("Age").len(), 1);
    assert_eq!(
        person.field_errors("Name")[0].message(),
        "Name must be at most 20 long"
    );
}

#[test]
fn nested_suspension_keeps_the_outer_state() {
    let person = person("Ann", 30);
    person.set_suspend_validation(true);
    drop(person.suspend_validation());
    assert!(person.is_validation_suspended());
    person.set_suspend_validation(false);
    assert!(!person.is_validation_suspended());
}

#[test]
fn shared_suspension_catches_up_on_the_next_pass() {
    let config = Arc::new(ModelConfig::default());
    let services = ModelServices::new().with_config(config.clone());
    let person = Model::with_services::<Person>(&services).unwrap();

    config.set_suspend_validation(true);
    person.set(Person::AGE, -4).unwrap();
    assert!(!person.has_errors());

    config.set_suspend_validation(false);
    person.validate().unwrap();
    assert_eq!(person.field_errors("Age").len(), 1);
}

#[test]
fn lean_models_skip_validation() {
    let person = person("Ann", 30);
    person.set_lean_and_mean(true);
    person.set(Person::AGE, 200).unwrap();
    person.validate_with(true).unwrap();
    assert!(person.validation_context().is_empty());
}

#[test]
fn forced_passes_rerun_every_rule() {
    let person = person("Ann", 30);
    let unchecked = SetOptions {
        notify: true,
        validate_attributes: false,
    };
    person
        .set_value_with("Age", Value::Int(999), unchecked)
        .unwrap();
    assert!(person.field_errors("Age").is_empty());

    person.validate_with(true).unwrap();
    assert_eq!(person.field_errors("Age").len(), 1);

    let fresh = Model::new::<Address>();
    assert!(!fresh.has_errors());
    fresh.validate_with(true).unwrap();
    assert_eq!(fresh.field_errors("Street")[0].message(), "Street is required");
}

#[test]
fn manual_results_last_until_the_next_pass() {
    let person = person("Ann", 30);
    let (warnings, _subscription) = record(person.warnings_changed());

    person
        .set_field_validation_result(FieldValidationResult::warning("Name", "Check spelling"))
        .unwrap();
    assert!(person.has_warnings());
    assert_eq!(person.field_warnings("Name").len(), 1);
    assert_eq!(*warnings.lock().unwrap(), [Some("Name".to_owned())]);

    person.validate_with(true).unwrap();
    assert!(!person.has_warnings());
    assert_eq!(warnings.lock().unwrap().len(), 2);

    person
        .set_business_rule_validation_result(BusinessRuleValidationResult::error("Locked"))
        .unwrap();
    assert_eq!(person.business_rule_errors().len(), 1);
}

#[test]
fn malformed_manual_results_are_rejected() {
    let person = person("Ann", 30);
    assert!(matches!(
        person.set_field_validation_result(FieldValidationResult::error("", "oops")),
        Err(ModelError::InvalidValidationResult { .. })
    ));
    assert!(matches!(
        person.set_business_rule_validation_result(BusinessRuleValidationResult::error("")),
        Err(ModelError::InvalidValidationResult { .. })
    ));
    assert!(person.validation_context().is_empty());
}

#[derive(Debug, Default)]
struct CityPolicy {
    passes: AtomicUsize,
}

impl Validator for CityPolicy {
    fn before_validation(&self, _model: &Model) {
        self.passes.fetch_add(1, Ordering::SeqCst);
    }

    fn validate_fields(&self, model: &Model, results: &mut Vec<FieldValidationResult>) {
        if model.get(Address::CITY).is_empty() {
            results.push(FieldValidationResult::error("City", "City is required by policy"));
        }
        if model.get(Address::CITY) == "Atlantis" {
            results.push(FieldValidationResult::error("", "nameless"));
        }
    }

    fn validate_business_rules(
        &self,
        model: &Model,
        _results: &mut Vec<BusinessRuleValidationResult>,
    ) {
        if model.get(Address::STREET) == "Nowhere" {
            model
                .set_business_rule_validation_result(BusinessRuleValidationResult::warning(
                    "Street looks made up",
                ))
                .unwrap();
        }
    }
}

#[derive(Debug, Default)]
struct Policies {
    city: Arc<CityPolicy>,
}

impl ValidatorProvider for Policies {
    fn validator_for(&self, type_name: &str) -> Option<Arc<dyn Validator>> {
        (type_name == "tests::Address").then(|| self.city.clone() as Arc<dyn Validator>)
    }
}

#[test]
fn external_validators_join_the_pass() {
    let policies = Arc::new(Policies::default());
    let services = ModelServices::new().with_validator_provider(policies.clone());
    let home = Model::with_services::<Address>(&services).unwrap();

    home.set(Address::STREET, "Main".to_owned()).unwrap();
    assert_eq!(home.field_errors("City")[0].message(), "City is required by policy");
    assert!(policies.city.passes.load(Ordering::SeqCst) >= 1);

    home.set(Address::CITY, "Oslo".to_owned()).unwrap();
    assert!(!home.has_errors());

    // Results set from inside a pass join that pass.
    home.set(Address::STREET, "Nowhere".to_owned()).unwrap();
    assert_eq!(home.business_rule_warnings().len(), 1);

    // People have no validator.
    let person = Model::with_services::<Person>(&services).unwrap();
    person.validate_with(true).unwrap();
    assert!(!person.has_errors());
}

#[test]
fn malformed_validator_results_keep_the_previous_context() {
    let services = ModelServices::new().with_validator_provider(Arc::new(Policies::default()));
    let home = Model::with_services::<Address>(&services).unwrap();
    home.set(Address::STREET, "Main".to_owned()).unwrap();
    let before = home.validation_context();

    home.set_auto_validate(false);
    home.set(Address::CITY, "Atlantis".to_owned()).unwrap();
    assert!(matches!(
        home.validate(),
        Err(ModelError::InvalidValidationResult { model: "tests::Address", .. })
    ));
    assert_eq!(home.validation_context(), before);
    assert!(!home.is_validated());
}

#[test]
fn plain_models_validate_without_a_provider() {
    let home = address("Main", "Oslo");
    assert!(!home.has_errors());
    home.set(Address::STREET, String::new()).unwrap();
    assert_eq!(home.field_errors("Street")[0].message(), "Street is required");
}

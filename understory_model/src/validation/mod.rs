// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Validation: value rules, type hooks, external validators and the context
//! they fill.
//!
//! A validation pass collects results from four places, in this order:
//!
//! - the value rules of each property, recorded when the property is written;
//! - [`ModelType::validate_fields`](crate::ModelType::validate_fields) and
//!   [`ModelType::validate_business_rules`](crate::ModelType::validate_business_rules);
//! - the [`Validator`] returned by the model's [`ValidatorProvider`];
//! - results set by hand while the pass runs.
//!
//! The new context replaces the old one under the model's commit lock. The
//! differences are then reported through [`Model::errors_changed`] and
//! [`Model::warnings_changed`], once per affected property, followed by
//! [`Model::validated`].

mod context;

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use smallvec::SmallVec;
use understory_property::{EventSource, PropertyDescriptor, Value};

pub use context::{
    BusinessRuleValidationResult, FieldValidationResult, ValidationChangeKind, ValidationContext,
    ValidationContextChange, ValidationResult, ValidationResultType,
};

use crate::error::ModelError;
use crate::model::{Model, lock};

/// Validation logic kept outside the model type.
///
/// Every method has a no-op default.
pub trait Validator: Send + Sync + fmt::Debug {
    /// Runs before any result is collected.
    fn before_validation(&self, _model: &Model) {}

    /// Adds field results.
    fn validate_fields(&self, _model: &Model, _results: &mut Vec<FieldValidationResult>) {}

    /// Adds business-rule results.
    fn validate_business_rules(
        &self,
        _model: &Model,
        _results: &mut Vec<BusinessRuleValidationResult>,
    ) {
    }

    /// Runs after every result is collected, before it is committed.
    fn after_validation(&self, _model: &Model) {}
}

/// Resolves the [`Validator`] of a model type.
///
/// A model asks once, on its first validation pass, and keeps the answer.
pub trait ValidatorProvider: Send + Sync + fmt::Debug {
    /// Returns the validator for models registered as `type_name`.
    fn validator_for(&self, type_name: &str) -> Option<Arc<dyn Validator>>;
}

/// Arguments of [`Model::errors_changed`] and [`Model::warnings_changed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataErrorsChanged {
    /// The affected property, or `None` for business-rule results.
    pub property: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ValidationState {
    pub(crate) context: ValidationContext,
    pending: Vec<&'static str>,
    attribute_errors: HashMap<&'static str, String>,
    manual_fields: Vec<FieldValidationResult>,
    manual_rules: Vec<BusinessRuleValidationResult>,
}

impl ValidationState {
    fn record_attribute(&mut self, property: &'static str, failure: Option<String>) {
        match failure {
            Some(message) => {
                self.attribute_errors.insert(property, message);
            }
            None => {
                self.attribute_errors.remove(property);
            }
        }
    }
}

/// Keeps validation of one model suspended while alive.
///
/// Returned by [`Model::suspend_validation`]. Dropping it restores the previous
/// state and, if that resumes validation, runs the catch-up pass.
#[must_use = "validation resumes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ValidationSuspension {
    model: Model,
    previous: bool,
}

impl Drop for ValidationSuspension {
    fn drop(&mut self) {
        self.model.set_suspend_validation(self.previous);
    }
}

struct ClearOnDrop<'a>(&'a AtomicBool);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn check_field(model: &'static str, result: &FieldValidationResult) -> Result<(), ModelError> {
    if result.property().is_empty() {
        return Err(ModelError::InvalidValidationResult {
            model,
            reason: "field result without a property name",
        });
    }
    if result.message().is_empty() {
        return Err(ModelError::InvalidValidationResult {
            model,
            reason: "field result without a message",
        });
    }
    Ok(())
}

fn check_business_rule(
    model: &'static str,
    result: &BusinessRuleValidationResult,
) -> Result<(), ModelError> {
    if result.message().is_empty() {
        return Err(ModelError::InvalidValidationResult {
            model,
            reason: "business-rule result without a message",
        });
    }
    Ok(())
}

impl Model {
    /// Returns `true` if validation is off for this model, through its own
    /// switch, the shared configuration or lean-and-mean mode.
    #[must_use]
    pub fn is_validation_suspended(&self) -> bool {
        self.inner
            .switches
            .suspend_validation
            .load(Ordering::Acquire)
            || self.services().config().suspend_validation()
            || self.is_lean_and_mean()
    }

    /// Suspends or resumes validation of this model.
    ///
    /// Value rules of properties written while suspended are deferred. Resuming
    /// runs them and a full pass.
    pub fn set_suspend_validation(&self, suspended: bool) {
        let was = self
            .inner
            .switches
            .suspend_validation
            .swap(suspended, Ordering::AcqRel);
        if was && !suspended {
            self.validate_logged(false);
        }
    }

    /// Suspends validation until the returned guard is dropped.
    pub fn suspend_validation(&self) -> ValidationSuspension {
        let previous = self
            .inner
            .switches
            .suspend_validation
            .swap(true, Ordering::AcqRel);
        ValidationSuspension {
            model: self.clone(),
            previous,
        }
    }

    /// Returns `true` if the current context reflects every write.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.inner.switches.is_validated.load(Ordering::Acquire)
    }

    pub(crate) fn validate_attribute(&self, descriptor: &PropertyDescriptor, value: &Value) {
        let name = descriptor.name();
        if self.is_validation_suspended() {
            let mut state = lock(&self.inner.validation);
            if !state.pending.contains(&name) {
                state.pending.push(name);
            }
            return;
        }
        let failure = descriptor.check_rules(value);
        lock(&self.inner.validation).record_attribute(name, failure);
    }

    /// Queues the value rules of `names` for the next pass, which runs now if
    /// auto-validation is on.
    pub(crate) fn recheck_attributes(&self, names: &[&'static str]) {
        {
            let mut state = lock(&self.inner.validation);
            for &name in names {
                if !state.pending.contains(&name) {
                    state.pending.push(name);
                }
            }
        }
        if self.auto_validate() {
            self.validate_logged(false);
        }
    }

    fn validator(&self) -> Option<Arc<dyn Validator>> {
        self.inner
            .validator
            .get_or_init(|| {
                self.services()
                    .validator_provider()
                    .and_then(|provider| provider.validator_for(self.type_name()))
            })
            .clone()
    }

    /// Runs a validation pass if anything changed since the last one.
    ///
    /// # Errors
    ///
    /// See [`validate_with`](Self::validate_with).
    pub fn validate(&self) -> Result<(), ModelError> {
        self.validate_with(false)
    }

    /// Runs a validation pass.
    ///
    /// Does nothing while validation is suspended or a pass is already running
    /// on this model. Without `force`, the type hooks and the validator only run
    /// if a property changed since the last pass. With `force`, every value rule
    /// runs again too.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidValidationResult`] if a hook or validator produced a
    /// result without a property name or message. The previous context is kept.
    pub fn validate_with(&self, force: bool) -> Result<(), ModelError> {
        if self.is_validation_suspended() {
            return Ok(());
        }
        let switches = &self.inner.switches;
        if switches.is_validating.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _running = ClearOnDrop(&switches.is_validating);
        self.run_pass(force)
    }

    pub(crate) fn validate_logged(&self, force: bool) {
        if let Err(err) = self.validate_with(force) {
            tracing::warn!(model = self.type_name(), %err, "validation pass failed");
        }
    }

    fn run_pass(&self, force: bool) -> Result<(), ModelError> {
        let model = self.type_name();
        let registry = self.registry();

        let pending = core::mem::take(&mut lock(&self.inner.validation).pending);
        let rerun: Vec<&Arc<PropertyDescriptor>> = if force {
            registry
                .iter()
                .filter(|d| !d.is_engine_owned() && !d.is_calculated())
                .collect()
        } else {
            pending.iter().filter_map(|name| registry.get(name)).collect()
        };
        if !rerun.is_empty() {
            let checked: Vec<_> = rerun
                .iter()
                .map(|d| (d.name(), d.check_rules(&self.inner.store.get_or_null(d.name()))))
                .collect();
            let mut state = lock(&self.inner.validation);
            for (name, failure) in checked {
                state.record_attribute(name, failure);
            }
        }

        if !force && pending.is_empty() && self.is_validated() {
            return Ok(());
        }

        let mut fields = Vec::new();
        let mut rules = Vec::new();
        let validator = self.validator();
        if let Some(validator) = &validator {
            validator.before_validation(self);
        }
        (self.inner.kind.validate_fields)(self, &mut fields);
        if let Some(validator) = &validator {
            validator.validate_fields(self, &mut fields);
        }
        (self.inner.kind.validate_business_rules)(self, &mut rules);
        if let Some(validator) = &validator {
            validator.validate_business_rules(self, &mut rules);
            validator.after_validation(self);
        }
        for result in &fields {
            check_field(model, result)?;
        }
        for result in &rules {
            check_business_rule(model, result)?;
        }

        let (changes, context) = {
            let _commit = lock(&self.inner.commit);
            let mut state = lock(&self.inner.validation);
            let mut next = ValidationContext::new();
            for descriptor in registry.iter() {
                if let Some(message) = state.attribute_errors.get(descriptor.name()) {
                    next.add_field_result(FieldValidationResult::error(
                        descriptor.name(),
                        message.clone(),
                    ));
                }
            }
            let manual_fields = core::mem::take(&mut state.manual_fields);
            for result in fields.into_iter().chain(manual_fields) {
                next.add_field_result(result);
            }
            let manual_rules = core::mem::take(&mut state.manual_rules);
            for result in rules.into_iter().chain(manual_rules) {
                next.add_business_rule_result(result);
            }
            let changes = next.changes_from(&state.context);
            state.context = next.clone();
            self.inner
                .switches
                .is_validated
                .store(true, Ordering::Release);
            (changes, next)
        };

        tracing::debug!(
            model,
            errors = context.error_count(),
            warnings = context.warning_count(),
            changes = changes.len(),
            "validated model"
        );
        self.raise_validation_changes(&changes);
        self.inner.validated.raise(&context);
        Ok(())
    }

    fn raise_validation_changes(&self, changes: &[ValidationContextChange]) {
        let mut errors: SmallVec<[Option<&str>; 4]> = SmallVec::new();
        let mut warnings: SmallVec<[Option<&str>; 4]> = SmallVec::new();
        for change in changes {
            let affected = match change.result.kind() {
                ValidationResultType::Error => &mut errors,
                ValidationResultType::Warning => &mut warnings,
            };
            let property = change.result.property();
            if !affected.contains(&property) {
                affected.push(property);
            }
        }
        for (source, properties) in [
            (&self.inner.errors_changed, errors),
            (&self.inner.warnings_changed, warnings),
        ] {
            for property in properties {
                source.raise(&DataErrorsChanged {
                    property: property.map(str::to_owned),
                });
            }
        }
    }

    fn ensure_validated(&self) {
        if !self.is_validated() && self.auto_validate() {
            self.validate_logged(false);
        }
    }

    /// Returns `true` if the current context holds an error.
    ///
    /// Runs a pass first if the model is not validated and auto-validation is on.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.ensure_validated();
        lock(&self.inner.validation).context.has_errors()
    }

    /// Returns `true` if the current context holds a warning.
    ///
    /// Runs a pass first if the model is not validated and auto-validation is on.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.ensure_validated();
        lock(&self.inner.validation).context.has_warnings()
    }

    /// Returns a snapshot of the current context.
    #[must_use]
    pub fn validation_context(&self) -> ValidationContext {
        lock(&self.inner.validation).context.clone()
    }

    /// Returns the errors about `property`.
    #[must_use]
    pub fn field_errors(&self, property: &str) -> Vec<FieldValidationResult> {
        lock(&self.inner.validation)
            .context
            .field_errors(property)
            .cloned()
            .collect()
    }

    /// Returns the warnings about `property`.
    #[must_use]
    pub fn field_warnings(&self, property: &str) -> Vec<FieldValidationResult> {
        lock(&self.inner.validation)
            .context
            .field_warnings(property)
            .cloned()
            .collect()
    }

    /// Returns the business-rule errors.
    #[must_use]
    pub fn business_rule_errors(&self) -> Vec<BusinessRuleValidationResult> {
        lock(&self.inner.validation)
            .context
            .business_rule_errors()
            .cloned()
            .collect()
    }

    /// Returns the business-rule warnings.
    #[must_use]
    pub fn business_rule_warnings(&self) -> Vec<BusinessRuleValidationResult> {
        lock(&self.inner.validation)
            .context
            .business_rule_warnings()
            .cloned()
            .collect()
    }

    /// Adds a field result by hand.
    ///
    /// Inside a validation pass the result joins that pass. Otherwise it is
    /// added to the current context immediately and lasts until the next pass.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidValidationResult`] if the property name or the
    /// message is empty.
    pub fn set_field_validation_result(
        &self,
        result: FieldValidationResult,
    ) -> Result<(), ModelError> {
        check_field(self.type_name(), &result)?;
        let added = {
            let _commit = lock(&self.inner.commit);
            let mut state = lock(&self.inner.validation);
            if self.inner.switches.is_validating.load(Ordering::Acquire) {
                state.manual_fields.push(result);
                return Ok(());
            }
            state
                .context
                .add_field_result(result.clone())
                .then_some(result)
        };
        if let Some(result) = added {
            self.raise_validation_changes(&[ValidationContextChange {
                result: ValidationResult::Field(result),
                change: ValidationChangeKind::Added,
            }]);
        }
        Ok(())
    }

    /// Adds a business-rule result by hand.
    ///
    /// Behaves like [`set_field_validation_result`](Self::set_field_validation_result).
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidValidationResult`] if the message is empty.
    pub fn set_business_rule_validation_result(
        &self,
        result: BusinessRuleValidationResult,
    ) -> Result<(), ModelError> {
        check_business_rule(self.type_name(), &result)?;
        let added = {
            let _commit = lock(&self.inner.commit);
            let mut state = lock(&self.inner.validation);
            if self.inner.switches.is_validating.load(Ordering::Acquire) {
                state.manual_rules.push(result);
                return Ok(());
            }
            state
                .context
                .add_business_rule_result(result.clone())
                .then_some(result)
        };
        if let Some(result) = added {
            self.raise_validation_changes(&[ValidationContextChange {
                result: ValidationResult::BusinessRule(result),
                change: ValidationChangeKind::Added,
            }]);
        }
        Ok(())
    }

    /// Raised once per property whose errors changed.
    #[must_use]
    pub fn errors_changed(&self) -> &EventSource<DataErrorsChanged> {
        &self.inner.errors_changed
    }

    /// Raised once per property whose warnings changed.
    #[must_use]
    pub fn warnings_changed(&self) -> &EventSource<DataErrorsChanged> {
        &self.inner.warnings_changed
    }

    /// Raised with the new context after every committed pass.
    #[must_use]
    pub fn validated(&self) -> &EventSource<ValidationContext> {
        &self.inner.validated
    }
}

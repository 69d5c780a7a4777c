// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Validation results and the context that collects them.

use core::fmt;

/// Severity of a validation result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidationResultType {
    /// The value is accepted but suspicious.
    Warning,
    /// The value is invalid.
    Error,
}

impl fmt::Display for ValidationResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A validation result about one property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldValidationResult {
    property: String,
    kind: ValidationResultType,
    message: String,
}

impl FieldValidationResult {
    /// Creates a result.
    #[must_use]
    pub fn new(
        property: impl Into<String>,
        kind: ValidationResultType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates an error about `property`.
    #[must_use]
    pub fn error(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(property, ValidationResultType::Error, message)
    }

    /// Creates a warning about `property`.
    #[must_use]
    pub fn warning(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(property, ValidationResultType::Warning, message)
    }

    /// Returns the property name.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Returns the severity.
    #[must_use]
    pub fn kind(&self) -> ValidationResultType {
        self.kind
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A validation result about the model as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BusinessRuleValidationResult {
    kind: ValidationResultType,
    message: String,
}

impl BusinessRuleValidationResult {
    /// Creates a result.
    #[must_use]
    pub fn new(kind: ValidationResultType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an error.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ValidationResultType::Error, message)
    }

    /// Creates a warning.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ValidationResultType::Warning, message)
    }

    /// Returns the severity.
    #[must_use]
    pub fn kind(&self) -> ValidationResultType {
        self.kind
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Either kind of validation result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidationResult {
    /// About one property.
    Field(FieldValidationResult),
    /// About the model as a whole.
    BusinessRule(BusinessRuleValidationResult),
}

impl ValidationResult {
    /// Returns the severity.
    #[must_use]
    pub fn kind(&self) -> ValidationResultType {
        match self {
            Self::Field(result) => result.kind(),
            Self::BusinessRule(result) => result.kind(),
        }
    }

    /// Returns the property name of a field result.
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Field(result) => Some(result.property()),
            Self::BusinessRule(_) => None,
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Field(result) => result.message(),
            Self::BusinessRule(result) => result.message(),
        }
    }
}

/// Whether a result appeared or disappeared between two contexts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValidationChangeKind {
    /// Present now, absent before.
    Added,
    /// Present before, absent now.
    Removed,
}

/// One entry of [`ValidationContext::changes_from`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationContextChange {
    /// The result that changed.
    pub result: ValidationResult,
    /// How it changed.
    pub change: ValidationChangeKind,
}

/// The field and business-rule results of one model, in insertion order.
///
/// Adding a result that is already present is a no-op.
///
/// # Example
///
/// ```rust
/// use understory_model::{FieldValidationResult, ValidationContext};
///
/// let mut context = ValidationContext::new();
/// assert!(context.add_field_result(FieldValidationResult::error("Name", "Name is required")));
/// assert!(!context.add_field_result(FieldValidationResult::error("Name", "Name is required")));
/// assert!(context.has_errors());
/// assert_eq!(context.field_errors("Name").count(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationContext {
    fields: Vec<FieldValidationResult>,
    business_rules: Vec<BusinessRuleValidationResult>,
}

impl ValidationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field result, returning `false` if an identical one is present.
    pub fn add_field_result(&mut self, result: FieldValidationResult) -> bool {
        if self.fields.contains(&result) {
            return false;
        }
        self.fields.push(result);
        true
    }

    /// Adds a business-rule result, returning `false` if an identical one is present.
    pub fn add_business_rule_result(&mut self, result: BusinessRuleValidationResult) -> bool {
        if self.business_rules.contains(&result) {
            return false;
        }
        self.business_rules.push(result);
        true
    }

    /// Returns every field result.
    #[must_use]
    pub fn field_results(&self) -> &[FieldValidationResult] {
        &self.fields
    }

    /// Returns every business-rule result.
    #[must_use]
    pub fn business_rule_results(&self) -> &[BusinessRuleValidationResult] {
        &self.business_rules
    }

    /// Iterates the errors about `property`.
    pub fn field_errors<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a FieldValidationResult> + 'a {
        self.fields.iter().filter(move |r| {
            r.property() == property && r.kind() == ValidationResultType::Error
        })
    }

    /// Iterates the warnings about `property`.
    pub fn field_warnings<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a FieldValidationResult> + 'a {
        self.fields.iter().filter(move |r| {
            r.property() == property && r.kind() == ValidationResultType::Warning
        })
    }

    /// Iterates the business-rule errors.
    pub fn business_rule_errors(&self) -> impl Iterator<Item = &BusinessRuleValidationResult> {
        self.business_rules
            .iter()
            .filter(|r| r.kind() == ValidationResultType::Error)
    }

    /// Iterates the business-rule warnings.
    pub fn business_rule_warnings(&self) -> impl Iterator<Item = &BusinessRuleValidationResult> {
        self.business_rules
            .iter()
            .filter(|r| r.kind() == ValidationResultType::Warning)
    }

    fn count(&self, kind: ValidationResultType) -> usize {
        self.fields.iter().filter(|r| r.kind() == kind).count()
            + self
                .business_rules
                .iter()
                .filter(|r| r.kind() == kind)
                .count()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(ValidationResultType::Error)
    }

    /// Returns the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(ValidationResultType::Warning)
    }

    /// Returns `true` if any error is present.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Returns `true` if any warning is present.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Returns `true` if there are no results.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.business_rules.is_empty()
    }

    /// Lists what must change to turn `previous` into `self`.
    ///
    /// Removals come first, each group in the order of its context.
    #[must_use]
    pub fn changes_from(&self, previous: &Self) -> Vec<ValidationContextChange> {
        let mut changes = Vec::new();
        let removed_fields = previous
            .fields
            .iter()
            .filter(|r| !self.fields.contains(r))
            .cloned()
            .map(ValidationResult::Field);
        let removed_rules = previous
            .business_rules
            .iter()
            .filter(|r| !self.business_rules.contains(r))
            .cloned()
            .map(ValidationResult::BusinessRule);
        changes.extend(removed_fields.chain(removed_rules).map(|result| {
            ValidationContextChange {
                result,
                change: ValidationChangeKind::Removed,
            }
        }));

        let added_fields = self
            .fields
            .iter()
            .filter(|r| !previous.fields.contains(r))
            .cloned()
            .map(ValidationResult::Field);
        let added_rules = self
            .business_rules
            .iter()
            .filter(|r| !previous.business_rules.contains(r))
            .cloned()
            .map(ValidationResult::BusinessRule);
        changes.extend(added_fields.chain(added_rules).map(|result| {
            ValidationContextChange {
                result,
                change: ValidationChangeKind::Added,
            }
        }));
        changes
    }
}

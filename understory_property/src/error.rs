// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property errors.

use thiserror::Error as ThisError;

use crate::value::ValueType;

/// Errors raised by registration and typed access.
///
/// All of these describe authoring or programming mistakes. They are returned
/// to the caller and never absorbed.
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// A property with the same name is already registered for the type.
    #[error("property '{property}' is already registered on '{owner}'")]
    DuplicateProperty {
        /// The owning type.
        owner: &'static str,
        /// The property name.
        property: &'static str,
    },

    /// A descriptor declaration is unusable.
    #[error("malformed property '{property}' on '{owner}': {reason}")]
    MalformedDescriptor {
        /// The owning type.
        owner: &'static str,
        /// The property name as declared.
        property: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The property is not registered for the type.
    #[error("property '{property}' is not registered on '{owner}'")]
    PropertyNotRegistered {
        /// The owning type.
        owner: &'static str,
        /// The requested property name.
        property: String,
    },

    /// A value does not match the declared type of the property.
    #[error("property '{property}' on '{owner}' expects {expected}, got {actual}")]
    InvalidPropertyValue {
        /// The owning type.
        owner: &'static str,
        /// The property name.
        property: &'static str,
        /// The declared type.
        expected: ValueType,
        /// The runtime type of the rejected value.
        actual: &'static str,
    },

    /// No property table has been registered for the type.
    #[error("type '{owner}' has no registered properties")]
    TypeNotRegistered {
        /// The type that was looked up.
        owner: &'static str,
    },
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model errors.

use thiserror::Error as ThisError;
use understory_property::PropertyError;

/// Errors returned by model operations.
///
/// Only authoring and programming mistakes are reported this way. Writes to
/// read-only or calculated properties are absorbed and logged instead, and
/// validation outcomes are collected in the
/// [`ValidationContext`](crate::ValidationContext).
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A registration or property access error.
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// A validation result is missing its property name or message.
    #[error("invalid validation result on '{model}': {reason}")]
    InvalidValidationResult {
        /// The model type.
        model: &'static str,
        /// What is wrong with the result.
        reason: &'static str,
    },
}

/// Errors raised by a [`ModelSerializer`](crate::ModelSerializer).
#[derive(Debug, ThisError)]
pub enum SerializationError {
    /// The JSON backend failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing the stream failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// No model type with this name has been registered in the process.
    #[error("unknown model type '{0}'")]
    UnknownType(String),

    /// The serialized form names a member the type does not declare.
    #[error("'{model}' has no member '{member}'")]
    UnknownProperty {
        /// The model type.
        model: &'static str,
        /// The member as written.
        member: String,
    },

    /// A graph reference points at an object that was never written.
    #[error("graph reference {0} does not resolve")]
    DanglingReference(u32),

    /// The value cannot be represented in the serialized form.
    #[error("property '{property}' holds an unserializable {value_type}")]
    UnsupportedValue {
        /// The property name.
        property: &'static str,
        /// The runtime type of the value.
        value_type: &'static str,
    },

    /// Re-applying a deserialized value failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<PropertyError> for SerializationError {
    fn from(err: PropertyError) -> Self {
        Self::Model(err.into())
    }
}

/// Errors raised while reading [`ModelConfig`](crate::ModelConfig) from the
/// environment.
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds something other than a boolean.
    #[error("invalid value for {0}: '{1}' is not a boolean")]
    Invalid(&'static str, String),
}

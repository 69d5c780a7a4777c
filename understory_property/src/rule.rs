// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative per-property value rules.
//!
//! Rules are attached to a descriptor and checked against every candidate value
//! before it is committed. A failing rule produces a message; it never rejects
//! the write.

use core::fmt;
use std::sync::Arc;

use crate::value::Value;

/// A check applied to a property value.
pub trait ValueRule: Send + Sync + fmt::Debug {
    /// Checks `value` for the property called `property`.
    ///
    /// Returns the failure message, if any.
    fn check(&self, property: &str, value: &Value) -> Option<String>;
}

/// Rejects null, empty strings and empty lists.
#[derive(Copy, Clone, Debug, Default)]
pub struct Required;

impl ValueRule for Required {
    fn check(&self, property: &str, value: &Value) -> Option<String> {
        let missing = match value {
            Value::Null => true,
            Value::Text(text) => text.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        };
        missing.then(|| format!("{property} is required"))
    }
}

/// Restricts numbers to an inclusive range. Null passes.
#[derive(Copy, Clone, Debug)]
pub struct Range {
    min: f64,
    max: f64,
}

impl Range {
    /// Creates an inclusive range rule.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl ValueRule for Range {
    fn check(&self, property: &str, value: &Value) -> Option<String> {
        let number = match value {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            _ => return None,
        };
        (!(self.min..=self.max).contains(&number)).then(|| {
            format!(
                "{property} must be between {} and {}",
                self.min, self.max
            )
        })
    }
}

/// Limits the length of strings, byte arrays and lists. Null passes.
#[derive(Copy, Clone, Debug)]
pub struct MaxLength(pub usize);

impl ValueRule for MaxLength {
    fn check(&self, property: &str, value: &Value) -> Option<String> {
        let len = match value {
            Value::Text(text) => text.chars().count(),
            Value::Bytes(bytes) => bytes.len(),
            Value::List(items) => items.len(),
            _ => return None,
        };
        (len > self.0).then(|| format!("{property} must be at most {} long", self.0))
    }
}

/// A rule backed by a closure.
pub struct FnRule {
    check: Arc<dyn Fn(&str, &Value) -> Option<String> + Send + Sync>,
}

impl FnRule {
    /// Wraps `check` as a rule.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
        }
    }
}

impl ValueRule for FnRule {
    fn check(&self, property: &str, value: &Value) -> Option<String> {
        (self.check)(property, value)
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required() {
        assert!(Required.check("Name", &Value::Null).is_some());
        assert!(Required.check("Name", &Value::from("  ")).is_some());
        assert!(Required.check("Name", &Value::from("Ann")).is_none());
        assert_eq!(
            Required.check("Name", &Value::Null).as_deref(),
            Some("Name is required")
        );
    }

    #[test]
    fn range() {
        let rule = Range::new(0.0, 150.0);
        assert!(rule.check("Age", &Value::Int(30)).is_none());
        assert!(rule.check("Age", &Value::Int(-1)).is_some());
        assert!(rule.check("Age", &Value::Float(150.5)).is_some());
        assert!(rule.check("Age", &Value::Null).is_none());
    }

    #[test]
    fn max_length_counts_chars() {
        let rule = MaxLength(3);
        assert!(rule.check("Code", &Value::from("äöü")).is_none());
        assert!(rule.check("Code", &Value::from("abcd")).is_some());
    }

    #[test]
    fn closure_rule() {
        let even = FnRule::new(|name, value| {
            value
                .as_int()
                .filter(|v| v % 2 != 0)
                .map(|_| format!("{name} must be even"))
        });
        assert!(even.check("N", &Value::Int(2)).is_none());
        assert_eq!(even.check("N", &Value::Int(3)).as_deref(), Some("N must be even"));
    }
}

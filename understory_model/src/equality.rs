// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural equality of models.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::hash::DefaultHasher;

use understory_property::Value;

use crate::model::Model;

/// Decides when two models are equal, and hashes them consistently.
///
/// `hash_code` must agree with `equals`: equal models hash alike.
pub trait ModelEqualityComparer: Send + Sync + fmt::Debug {
    /// Returns `true` if `a` and `b` are equal.
    fn equals(&self, a: &Model, b: &Model) -> bool;

    /// Returns a hash of `model`.
    fn hash_code(&self, model: &Model) -> u64;
}

/// Compares models by type and property values.
///
/// Two models are equal if they are the same instance, or if they share a type
/// name and every non-engine-owned property of the first holds an equal value on
/// the second. Nested models compare recursively, with cycles treated as equal.
/// Lists and collections compare element by element. Other objects compare by
/// [`PropertyObject::structural_eq`](understory_property::PropertyObject::structural_eq).
///
/// The hash only covers the type name, since property values may change while a
/// model sits in a hashed container.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultEqualityComparer;

impl DefaultEqualityComparer {
    fn models_equal(&self, a: &Model, b: &Model, visiting: &mut Vec<(usize, usize)>) -> bool {
        if a.ptr_eq(b) {
            return true;
        }
        if a.type_name() != b.type_name() {
            return false;
        }
        let pair = (a.addr(), b.addr());
        if visiting.contains(&pair) {
            return true;
        }
        visiting.push(pair);

        let equal = a
            .registry()
            .iter()
            .filter(|d| !d.is_engine_owned())
            .all(|descriptor| {
                let name = descriptor.name();
                match (a.get_value(name), b.get_value(name)) {
                    (Ok(left), Ok(right)) => self.values_equal(&left, &right, visiting),
                    _ => false,
                }
            });
        visiting.pop();
        equal
    }

    fn values_equal(&self, a: &Value, b: &Value, visiting: &mut Vec<(usize, usize)>) -> bool {
        if let (Value::Object(x), Value::Object(y)) = (a, b) {
            if x.ptr_eq(y) {
                return true;
            }
            if let (Some(x), Some(y)) = (Model::from_object(x), Model::from_object(y)) {
                return self.models_equal(&x, &y, visiting);
            }
        }
        match (a.enumerate(), b.enumerate()) {
            (Some(xs), Some(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(&ys)
                        .all(|(x, y)| self.values_equal(x, y, visiting))
            }
            (None, None) => match (a, b) {
                (Value::Object(x), Value::Object(y)) => x.structural_eq(y.get()),
                _ => a == b,
            },
            _ => false,
        }
    }
}

impl ModelEqualityComparer for DefaultEqualityComparer {
    fn equals(&self, a: &Model, b: &Model) -> bool {
        self.models_equal(a, b, &mut Vec::new())
    }

    fn hash_code(&self, model: &Model) -> u64 {
        let mut hasher = DefaultHasher::new();
        model.type_name().hash(&mut hasher);
        hasher.finish()
    }
}

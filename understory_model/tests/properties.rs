// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property-based checks of writes, equality and hashing.

mod common;

use std::hash::{BuildHasher, RandomState};
use std::sync::{Arc, Mutex};

use common::{Person, person};
use proptest::prelude::*;
use understory_model::Model;

fn hash_of(model: &Model, state: &RandomState) -> u64 {
    state.hash_one(model)
}

proptest! {
    #[test]
    fn repeated_writes_change_nothing(name in "[a-z]{0,12}", age in 0_i64..150) {
        let model = person(&name, age);
        let events = Arc::new(Mutex::new(0_usize));
        let sink = events.clone();
        let _subscription = model
            .property_changed()
            .subscribe(move |_| *sink.lock().unwrap() += 1);

        model.set(Person::NAME, name.clone()).unwrap();
        model.set(Person::AGE, age).unwrap();
        prop_assert_eq!(*events.lock().unwrap(), 0);
        prop_assert_eq!(model.get(Person::NAME), name);
        prop_assert_eq!(model.get(Person::AGE), age);
    }

    #[test]
    fn equality_is_an_equivalence_consistent_with_hash(
        a in ("[a-z]{0,6}", 0_i64..5),
        b in ("[a-z]{0,6}", 0_i64..5),
    ) {
        let state = RandomState::new();
        let first = person(&a.0, a.1);
        let twin = person(&a.0, a.1);
        let other = person(&b.0, b.1);

        prop_assert!(first == first.clone());
        prop_assert!(first == twin);
        prop_assert_eq!(hash_of(&first, &state), hash_of(&twin, &state));
        prop_assert_eq!(first == other, other == first);
        prop_assert_eq!(first == other, a == b);
        if first == other {
            prop_assert_eq!(hash_of(&first, &state), hash_of(&other, &state));
        }
    }

    #[test]
    fn round_trips_preserve_equality(name in "[a-z ]{0,20}", age in 0_i64..150) {
        let model = person(&name, age);
        let copy = model.deep_clone().unwrap();
        prop_assert!(!copy.ptr_eq(&model));
        prop_assert!(copy == model);
    }
}

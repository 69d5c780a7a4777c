// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_property` stores and the `understory_model` write
//! pipeline.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use understory_model::{Model, ModelConfig, ModelServices, ModelType, SetOptions};
use understory_property::{
    ObservableCollection, Property, PropertyDescriptorBuilder, PropertyError, PropertyRegistry,
    PropertyStore, PropertyValue, Range, Value,
};

struct Item;

impl Item {
    const LABEL: Property<String> = Property::new("Label");
    const COUNT: Property<i64> = Property::new("Count");
    const CHILD: Property<Option<Model>> = Property::new("Child");
    const ITEMS: Property<Arc<ObservableCollection>> = Property::new("Items");
}

impl ModelType for Item {
    const TYPE_NAME: &'static str = "benches::Item";

    fn register_properties(registry: &mut PropertyRegistry) -> Result<(), PropertyError> {
        registry.register(Self::LABEL, PropertyDescriptorBuilder::new(String::new()))?;
        registry.register(
            Self::COUNT,
            PropertyDescriptorBuilder::new(0_i64).rule(Range::new(0.0, 1e9)),
        )?;
        registry.register(Self::CHILD, PropertyDescriptorBuilder::new(None))?;
        registry.register(
            Self::ITEMS,
            PropertyDescriptorBuilder::with_factory(|| Arc::new(ObservableCollection::new())),
        )?;
        Ok(())
    }
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("property/store");
    for &len in &[4_usize, 16, 64] {
        let names: Vec<&'static str> = (0..len)
            .map(|i| &*Box::leak(format!("P{i}").into_boxed_str()))
            .collect();
        let store = PropertyStore::new();
        for (i, &name) in names.iter().enumerate() {
            store.set(name, Value::Int(i as i64));
        }
        let last = names[len - 1];
        group.bench_function(BenchmarkId::new("get", len), |b| {
            b.iter(|| black_box(store.get_or_null(black_box(last))));
        });
        group.bench_function(BenchmarkId::new("set", len), |b| {
            let mut n = 0_i64;
            b.iter(|| {
                n += 1;
                black_box(store.set(last, Value::Int(n)))
            });
        });
    }
    group.finish();
}

fn bench_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("model");

    group.bench_function("construct", |b| {
        b.iter(|| black_box(Model::new::<Item>()));
    });

    let item = Model::new::<Item>();
    group.bench_function("get", |b| {
        b.iter(|| black_box(item.get(Item::COUNT)));
    });

    group.bench_function("set_changed", |b| {
        let mut n = 0_i64;
        b.iter(|| {
            n += 1;
            item.set(Item::COUNT, n).unwrap();
        });
    });

    group.bench_function("set_equal", |b| {
        item.set(Item::COUNT, 7).unwrap();
        b.iter(|| item.set(Item::COUNT, black_box(7)).unwrap());
    });

    group.bench_function("set_quiet", |b| {
        let mut n = 0_i64;
        b.iter(|| {
            n += 1;
            item.set_value_with("Count", Value::Int(n), SetOptions::QUIET)
                .unwrap();
        });
    });

    let lean = ModelServices::new().with_config(Arc::new(ModelConfig::default()));
    lean.config().set_lean_and_mean(true);
    let lean_item = Model::with_services::<Item>(&lean).unwrap();
    group.bench_function("set_lean", |b| {
        let mut n = 0_i64;
        b.iter(|| {
            n += 1;
            lean_item.set(Item::COUNT, n).unwrap();
        });
    });

    group.finish();
}

fn chain(depth: usize) -> (Model, Model) {
    let root = Model::new::<Item>();
    let mut tail = root.clone();
    for _ in 0..depth {
        let child = Model::new::<Item>();
        tail.set(Item::CHILD, Some(child.clone())).unwrap();
        tail = child;
    }
    (root, tail)
}

fn bench_relay(c: &mut Criterion) {
    let mut group = c.benchmark_group("model/relay");
    for &depth in &[1_usize, 8, 32] {
        group.bench_function(BenchmarkId::new("leaf_write", depth), |b| {
            b.iter_batched(
                || {
                    let (root, leaf) = chain(depth);
                    root.clear_dirty_recursive();
                    (root, leaf)
                },
                |(root, leaf)| {
                    leaf.set(Item::LABEL, "changed".to_owned()).unwrap();
                    black_box(root.is_dirty())
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.bench_function("collection_push", |b| {
        let owner = Model::new::<Item>();
        let items = owner.get(Item::ITEMS);
        b.iter(|| items.push(Model::new::<Item>().into_value()));
    });
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("model/serialize");
    let (root, _) = chain(16);
    group.bench_function("round_trip", |b| {
        b.iter(|| {
            let mut bytes = Vec::new();
            root.serialize(&mut bytes).unwrap();
            black_box(Model::deserialize(root.services(), &mut bytes.as_slice()).unwrap())
        });
    });
    group.bench_function("deep_clone", |b| {
        b.iter(|| black_box(root.deep_clone()));
    });
    group.bench_function("equality", |b| {
        let copy = root.deep_clone().unwrap();
        b.iter(|| black_box(root == copy));
    });
    group.finish();
}

criterion_group!(benches, bench_store, bench_model, bench_relay, bench_serialize);
criterion_main!(benches);

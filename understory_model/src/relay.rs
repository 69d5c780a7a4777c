// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change relays: forwarding nested changes to the owning model.
//!
//! When a property holds a value that reports its own changes (a model, an
//! [`ObservableCollection`](understory_property::ObservableCollection), or a list
//! or collection of models), the owner keeps one [`ChangeRelay`] for that
//! property. The relay subscribes to the value and to each of its items and
//! marks the owner dirty when any of them changes.
//!
//! Relays are keyed by property name. Assigning a new value detaches the old
//! relay before the new one attaches, so a property never has two.
//! Subscriptions only reference the owner weakly.

use std::sync::{Arc, Mutex, Weak};

use understory_property::{
    CollectionChangeAction, CollectionChanged, PropertyChanged, PropertyValue, Subscription, Value,
};

use crate::model::{Model, ModelInner, lock};

type ItemSubscriptions = Vec<(usize, Subscription)>;

/// The subscriptions that tie one property's value to its owner.
pub(crate) struct ChangeRelay {
    value: Option<Subscription>,
    collection: Option<Subscription>,
    items: Arc<Mutex<ItemSubscriptions>>,
}

impl core::fmt::Debug for ChangeRelay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangeRelay")
            .field("value", &self.value.is_some())
            .field("collection", &self.collection.is_some())
            .field("items", &lock(&self.items).len())
            .finish()
    }
}

impl ChangeRelay {
    /// Subscribes `owner` to `value`. Returns `None` if nothing in `value`
    /// reports changes.
    pub(crate) fn attach(owner: &Weak<ModelInner>, value: &Value, link_parent: bool) -> Option<Self> {
        let items: Arc<Mutex<ItemSubscriptions>> = Arc::default();
        if let Some(elements) = value.enumerate() {
            let mut watched = lock(&items);
            for element in &elements {
                if let Some(subscription) = watch(owner, element) {
                    watched.push((identity(element), subscription));
                }
            }
        }

        let (mut value_subscription, mut collection_subscription) = (None, None);
        if let Value::Object(object) = value {
            value_subscription = object.property_changed().map(|source| {
                let owner = owner.clone();
                source.subscribe(move |change| forward(&owner, change))
            });
            collection_subscription = object.collection_changed().map(|source| {
                let owner = owner.clone();
                let items = items.clone();
                source.subscribe(move |change| {
                    on_collection_changed(&owner, &items, change, link_parent);
                })
            });
        }

        let idle = value_subscription.is_none()
            && collection_subscription.is_none()
            && lock(&items).is_empty();
        (!idle).then_some(Self {
            value: value_subscription,
            collection: collection_subscription,
            items,
        })
    }
}

fn identity(value: &Value) -> usize {
    value.as_object().map_or(0, |object| object.addr())
}

fn watch(owner: &Weak<ModelInner>, element: &Value) -> Option<Subscription> {
    let source = element.as_object()?.property_changed()?;
    let owner = owner.clone();
    Some(source.subscribe(move |change| forward(&owner, change)))
}

fn forward(owner: &Weak<ModelInner>, change: &PropertyChanged) {
    if change.name == Model::IS_READ_ONLY.name() {
        return;
    }
    if change.name == Model::IS_DIRTY.name() && change.new_value != Value::Bool(true) {
        return;
    }
    if let Some(inner) = owner.upgrade() {
        Model::from_inner(inner).on_child_changed();
    }
}

fn on_collection_changed(
    owner: &Weak<ModelInner>,
    items: &Mutex<ItemSubscriptions>,
    change: &CollectionChanged,
    link_parent: bool,
) {
    let Some(inner) = owner.upgrade() else {
        return;
    };
    {
        let mut watched = lock(items);
        if change.action == CollectionChangeAction::Reset {
            watched.clear();
        } else {
            for old in &change.old_items {
                let id = identity(old);
                if let Some(position) = watched.iter().position(|(addr, _)| *addr == id) {
                    watched.remove(position);
                }
            }
        }
        for new in &change.new_items {
            if let Some(subscription) = watch(owner, new) {
                watched.push((identity(new), subscription));
            }
        }
    }

    let model = Model::from_inner(inner);
    if link_parent {
        for child in change.old_items.iter().filter_map(Model::from_value) {
            child.unlink_parent(&model);
        }
        for child in change.new_items.iter().filter_map(Model::from_value) {
            child.link_parent(&model);
        }
    }
    model.on_child_changed();
}

/// Returns the models held by `value`, directly or as items.
pub(crate) fn models_in(value: &Value) -> Vec<Model> {
    if let Some(model) = Model::from_value(value) {
        return vec![model];
    }
    value
        .enumerate()
        .map(|items| items.iter().filter_map(Model::from_value).collect())
        .unwrap_or_default()
}

/// Re-targets the relay and parent link of the property that changed.
pub(crate) fn on_store_changed(inner: &Arc<ModelInner>, change: &PropertyChanged) {
    let Some(descriptor) = inner.registry.get(change.name) else {
        return;
    };
    if descriptor.is_engine_owned() {
        return;
    }

    let owner = Model::from_inner(inner.clone());
    if descriptor.set_parent() {
        for child in models_in(&change.old_value) {
            child.unlink_parent(&owner);
        }
        for child in models_in(&change.new_value) {
            child.link_parent(&owner);
        }
    }

    let mut relays = lock(&inner.relays);
    relays.remove(change.name);
    if let Some(relay) = ChangeRelay::attach(&inner.this, &change.new_value, descriptor.set_parent())
    {
        relays.insert(change.name, relay);
        tracing::trace!(
            model = inner.kind.name,
            property = change.name,
            "attached change relay"
        );
    }
}

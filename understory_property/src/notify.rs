// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notification primitives.
//!
//! [`EventSource`] holds its handlers weakly. The strong reference lives in the
//! [`Subscription`] returned to the subscriber, so dropping the subscription is
//! all it takes to stop delivery, and a subscription never keeps the source's
//! owner alive. Dead handlers are pruned lazily on the next raise or subscribe.
//!
//! Handlers run synchronously, in subscription order, after the source has
//! released its own lock. A handler may therefore raise, subscribe to, or drop
//! subscriptions on the same source.

use core::any::Any;
use core::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use smallvec::SmallVec;

use crate::value::Value;

type Handler<A> = dyn Fn(&A) + Send + Sync;

/// A synchronous, multi-subscriber event.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use understory_property::EventSource;
///
/// let source = EventSource::<u32>::new();
/// let total = Arc::new(AtomicUsize::new(0));
///
/// let sink = total.clone();
/// let subscription = source.subscribe(move |v| {
///     sink.fetch_add(*v as usize, Ordering::SeqCst);
/// });
///
/// source.raise(&2);
/// drop(subscription);
/// source.raise(&40);
///
/// assert_eq!(total.load(Ordering::SeqCst), 2);
/// ```
pub struct EventSource<A: 'static> {
    handlers: Mutex<Vec<Weak<Handler<A>>>>,
}

impl<A: 'static> EventSource<A> {
    /// Creates an event source with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<Handler<A>>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes a handler.
    ///
    /// Delivery continues until the returned [`Subscription`] is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let handler: Arc<Handler<A>> = Arc::new(handler);
        let mut handlers = self.lock();
        handlers.retain(|h| h.strong_count() > 0);
        handlers.push(Arc::downgrade(&handler));
        Subscription {
            _handler: Box::new(handler),
        }
    }

    /// Invokes every live handler with `args`.
    pub fn raise(&self, args: &A) {
        let live: SmallVec<[Arc<Handler<A>>; 4]> = {
            let mut handlers = self.lock();
            handlers.retain(|h| h.strong_count() > 0);
            handlers.iter().filter_map(Weak::upgrade).collect()
        };
        for handler in live {
            handler(args);
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().iter().filter(|h| h.strong_count() > 0).count()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

impl<A: 'static> Default for EventSource<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for EventSource<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Keeps a handler subscribed to an [`EventSource`] while alive.
pub struct Subscription {
    _handler: Box<dyn Any + Send + Sync>,
}

impl Subscription {
    /// Unsubscribes explicitly. Equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Arguments of a property change.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChanged {
    /// The property that changed.
    pub name: &'static str,
    /// The value before the change; [`Value::Null`] if there was none.
    pub old_value: Value,
    /// The value after the change.
    pub new_value: Value,
}

impl PropertyChanged {
    /// Creates change arguments.
    #[must_use]
    pub fn new(name: &'static str, old_value: Value, new_value: Value) -> Self {
        Self {
            name,
            old_value,
            new_value,
        }
    }
}

/// What happened to a collection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CollectionChangeAction {
    /// Items were added.
    Add,
    /// Items were removed.
    Remove,
    /// Items were replaced in place.
    Replace,
    /// The whole collection changed.
    Reset,
}

/// Arguments of a collection change.
///
/// For [`CollectionChangeAction::Reset`], `old_items` holds the previous contents
/// and `new_items` the current contents.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionChanged {
    /// What happened.
    pub action: CollectionChangeAction,
    /// Items that entered the collection.
    pub new_items: Vec<Value>,
    /// Items that left the collection.
    pub old_items: Vec<Value>,
}

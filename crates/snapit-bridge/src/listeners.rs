// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Listener registries and the subscription handles they return.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// A set of callbacks that all receive every emitted value.
pub struct ListenerSet<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for ListenerSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register `listener`. It stays registered until the returned
    /// subscription is explicitly unsubscribed.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let id = {
            let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut registry = inner.lock().unwrap_or_else(PoisonError::into_inner);
                registry.listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Call every listener with `value`.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe re-entrantly.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = {
            let registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            registry.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for removing a registered listener.
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe later"]
pub struct Subscription(Option<Box<dyn FnOnce() + Send>>);

impl Subscription {
    pub fn new(on_unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(on_unsubscribe)))
    }

    /// A subscription with nothing behind it (unsupported capability).
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn is_noop(&self) -> bool {
        self.0.is_none()
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.0.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_listener_receives_each_value() {
        let set = ListenerSet::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        let t1 = Arc::clone(&total);
        let _a = set.subscribe(move |v| {
            t1.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let t2 = Arc::clone(&total);
        let _b = set.subscribe(move |v| {
            t2.fetch_add(*v as usize * 10, Ordering::SeqCst);
        });

        set.emit(&2);
        assert_eq!(total.load(Ordering::SeqCst), 22);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let set = ListenerSet::<()>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h1 = Arc::clone(&hits);
        let first = set.subscribe(move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let h2 = Arc::clone(&hits);
        let _second = set.subscribe(move |_| {
            h2.fetch_add(100, Ordering::SeqCst);
        });

        first.unsubscribe();
        set.emit(&());
        assert_eq!(hits.load(Ordering::SeqCst), 100);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn dropping_a_subscription_keeps_the_listener() {
        let set = ListenerSet::<()>::new();
        drop(set.subscribe(|_| {}));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn noop_subscription() {
        let sub = Subscription::noop();
        assert!(sub.is_noop());
        sub.unsubscribe();
    }
}

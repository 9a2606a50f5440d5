// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Copy-on-write snapshots and change listeners.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use hashbrown::HashMap;

use crate::array::StyleArray;
use crate::key::CacheKey;

type Entries = HashMap<CacheKey, StyleArray>;

/// An immutable view of every resolved cache entry.
///
/// The store never mutates a snapshot it has handed out; any change produces
/// a new snapshot in which unchanged entries keep their array objects. Holding
/// an old snapshot is always safe, and [`Snapshot::ptr_eq`] tells whether
/// anything changed since.
#[derive(Clone, Default)]
pub struct Snapshot {
    entries: Rc<Entries>,
}

impl Snapshot {
    /// Returns the array stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StyleArray> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` has been resolved.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &StyleArray)> + '_ {
        self.entries.iter()
    }

    /// Returns `true` if both handles are the same snapshot object.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    pub(crate) fn edit(&self) -> SnapshotEdit {
        SnapshotEdit {
            base: self.clone(),
            next: None,
        }
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// A batch of writes that becomes at most one new snapshot.
///
/// The entry map is copied on the first write only.
#[derive(Debug)]
pub(crate) struct SnapshotEdit {
    base: Snapshot,
    next: Option<Entries>,
}

impl SnapshotEdit {
    pub(crate) fn get(&self, key: &str) -> Option<&StyleArray> {
        match &self.next {
            Some(entries) => entries.get(key),
            None => self.base.get(key),
        }
    }

    pub(crate) fn insert(&mut self, key: CacheKey, array: StyleArray) {
        self.next
            .get_or_insert_with(|| (*self.base.entries).clone())
            .insert(key, array);
    }

    /// Returns the new snapshot, or `None` if nothing was written.
    pub(crate) fn finish(self) -> Option<Snapshot> {
        self.next.map(|entries| Snapshot {
            entries: Rc::new(entries),
        })
    }
}

/// A change listener registered with a store.
pub type Listener = Rc<dyn Fn()>;

/// The listener set of a store. Clones share the set.
#[derive(Clone, Default)]
pub(crate) struct ListenerSet {
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl ListenerSet {
    /// Adds `listener` unless the same listener object is already present.
    pub(crate) fn add(&self, listener: Listener) -> Subscription {
        {
            let mut listeners = self.listeners.borrow_mut();
            if !listeners.iter().any(|other| same_listener(other, &listener)) {
                listeners.push(listener.clone());
            }
        }
        Subscription {
            listeners: Rc::downgrade(&self.listeners),
            listener,
        }
    }

    /// Calls every listener once.
    ///
    /// The set is copied first, so listeners may subscribe, unsubscribe or
    /// read the store while being notified.
    pub(crate) fn notify(&self) {
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        tracing::trace!(listeners = listeners.len(), "notifying store listeners");
        for listener in listeners {
            listener();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish()
    }
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Handle returned by [`StyleStore::subscribe`](crate::StyleStore::subscribe).
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    listeners: Weak<RefCell<Vec<Listener>>>,
    listener: Listener,
}

impl Subscription {
    /// Removes the listener from the store.
    ///
    /// Other subscriptions of the same listener object are removed as well,
    /// since the store holds each listener once.
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .borrow_mut()
                .retain(|other| !same_listener(other, &self.listener));
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &(self.listeners.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

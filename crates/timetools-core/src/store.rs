//! Keyed instance state.
//!
//! Every mounted program instance owns one slice of this store, addressed by
//! its [`InstanceKey`]. Slices are immutable snapshots: writers go through
//! [`KeyedInstanceStore::set_state`] and [`KeyedInstanceStore::delete_state`],
//! which replace the snapshot and then notify observers.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::collections::map::HashMap;
use crate::collections::SliceMap;

/// Type-erased attribute payload stored in an instance bag.
pub type AttributeValue = Rc<dyn Any>;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey(String);

impl InstanceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceKey({})", self.0)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for InstanceKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for InstanceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Snapshot of one instance's attribute bag.
#[derive(Clone, Default)]
pub struct InstanceState {
    running: bool,
    data: Option<AttributeValue>,
    attributes: HashMap<String, AttributeValue>,
}

impl InstanceState {
    pub fn running(&self) -> bool {
        self.running
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn raw_data(&self) -> Option<&AttributeValue> {
        self.data.as_ref()
    }

    /// Returns `None` when no data is stored or it has a different type.
    pub fn data<T: Clone + 'static>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn attribute<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.attributes
            .get(name)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    fn merged(&self, patch: StatePatch) -> Self {
        let mut next = self.clone();
        if let Some(running) = patch.running {
            next.running = running;
        }
        if let Some(data) = patch.data {
            next.data = Some(data);
        }
        for (name, value) in patch.attributes {
            next.attributes.insert(name, value);
        }
        next
    }
}

impl fmt::Debug for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.attribute_names().collect();
        names.sort_unstable();
        f.debug_struct("InstanceState")
            .field("running", &self.running)
            .field("has_data", &self.data.is_some())
            .field("attributes", &names)
            .finish()
    }
}

/// Partial update merged shallowly into an instance bag.
#[derive(Clone, Default)]
pub struct StatePatch {
    running: Option<bool>,
    data: Option<AttributeValue>,
    attributes: Vec<(String, AttributeValue)>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(running: bool) -> Self {
        Self::new().with_running(running)
    }

    pub fn data<T: 'static>(data: T) -> Self {
        Self::new().with_data(data)
    }

    pub fn with_running(mut self, running: bool) -> Self {
        self.running = Some(running);
        self
    }

    pub fn with_data<T: 'static>(mut self, data: T) -> Self {
        self.data = Some(Rc::new(data));
        self
    }

    pub fn with_attribute<T: 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.attributes.push((name.into(), Rc::new(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_none() && self.data.is_none() && self.attributes.is_empty()
    }
}

impl fmt::Debug for StatePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.attributes.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("StatePatch")
            .field("running", &self.running)
            .field("data", &self.data.is_some())
            .field("attributes", &names)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreChange {
    Updated(InstanceKey),
    Deleted(InstanceKey),
}

impl StoreChange {
    pub fn key(&self) -> &InstanceKey {
        match self {
            StoreChange::Updated(key) | StoreChange::Deleted(key) => key,
        }
    }
}

type ObserverCallback = Rc<dyn Fn(&StoreChange) + 'static>;

struct ObserverEntry {
    id: u64,
    key: Option<InstanceKey>,
    callback: ObserverCallback,
}

struct StoreInner {
    states: RefCell<SliceMap<Rc<InstanceState>>>,
    observers: RefCell<Vec<ObserverEntry>>,
    next_observer_id: Cell<u64>,
    version: Cell<u64>,
}

impl StoreInner {
    fn notify(&self, change: StoreChange) {
        let observers: Vec<ObserverCallback> = self
            .observers
            .borrow()
            .iter()
            .filter(|entry| match &entry.key {
                Some(key) => key == change.key(),
                None => true,
            })
            .map(|entry| Rc::clone(&entry.callback))
            .collect();
        for observer in observers {
            observer(&change);
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.observers.borrow_mut().retain(|entry| entry.id != id);
    }
}

/// Shared handle to one store; clones observe and mutate the same data.
#[derive(Clone)]
pub struct KeyedInstanceStore {
    inner: Rc<StoreInner>,
}

impl KeyedInstanceStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                states: RefCell::new(SliceMap::default()),
                observers: RefCell::new(Vec::new()),
                next_observer_id: Cell::new(1),
                version: Cell::new(0),
            }),
        }
    }

    pub fn set_state(&self, key: &InstanceKey, patch: StatePatch) {
        {
            let mut states = self.inner.states.borrow_mut();
            let next = match states.get(key) {
                Some(current) => current.merged(patch),
                None => InstanceState::default().merged(patch),
            };
            states.insert(key.clone(), Rc::new(next));
        }
        self.inner.version.set(self.inner.version.get() + 1);
        log::debug!("store: set state for {key}");
        self.inner.notify(StoreChange::Updated(key.clone()));
    }

    pub fn get_state(&self, key: &InstanceKey) -> Option<Rc<InstanceState>> {
        self.inner.states.borrow().get(key).cloned()
    }

    pub fn delete_state(&self, key: &InstanceKey) {
        let removed = self.inner.states.borrow_mut().remove(key);
        if removed.is_none() {
            log::warn!("store: delete_state for {key} but no state was present");
        } else {
            log::debug!("store: deleted state for {key}");
        }
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.notify(StoreChange::Deleted(key.clone()));
    }

    pub fn contains(&self, key: &InstanceKey) -> bool {
        self.inner.states.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<InstanceKey> {
        let mut keys: Vec<InstanceKey> = self.inner.states.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.states.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of mutations applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn subscribe(&self, callback: impl Fn(&StoreChange) + 'static) -> StoreSubscription {
        self.add_observer(None, Rc::new(callback))
    }

    /// Observes changes to `key` only.
    pub fn subscribe_key(
        &self,
        key: &InstanceKey,
        callback: impl Fn(&StoreChange) + 'static,
    ) -> StoreSubscription {
        self.add_observer(Some(key.clone()), Rc::new(callback))
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    fn add_observer(&self, key: Option<InstanceKey>, callback: ObserverCallback) -> StoreSubscription {
        let id = self.inner.next_observer_id.get();
        self.inner.next_observer_id.set(id + 1);
        self.inner
            .observers
            .borrow_mut()
            .push(ObserverEntry { id, key, callback });
        StoreSubscription {
            store: Rc::downgrade(&self.inner),
            id: Some(id),
        }
    }
}

impl Default for KeyedInstanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyedInstanceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedInstanceStore")
            .field("keys", &self.keys())
            .field("version", &self.version())
            .finish()
    }
}

/// Unsubscribes its observer when dropped.
pub struct StoreSubscription {
    store: Weak<StoreInner>,
    id: Option<u64>,
}

impl StoreSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(id), Some(store)) = (self.id.take(), self.store.upgrade()) {
            store.unsubscribe(id);
        }
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;

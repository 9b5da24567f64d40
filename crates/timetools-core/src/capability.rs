//! Capability projection.
//!
//! A mounted instance sees its store slice through a fixed set of typed
//! capabilities. They are derived once per activation and shared by the
//! props handed to the program and by the [`InstanceHandle`] the host keeps,
//! so both views always read through the same store.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::store::{InstanceKey, KeyedInstanceStore, StatePatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Running,
    Data,
}

#[derive(Clone)]
pub struct RunningCapability {
    key: InstanceKey,
    store: KeyedInstanceStore,
}

impl RunningCapability {
    pub(crate) fn new(key: InstanceKey, store: KeyedInstanceStore) -> Self {
        Self { key, store }
    }

    pub fn get(&self) -> bool {
        self.store
            .get_state(&self.key)
            .map(|state| state.running())
            .unwrap_or(false)
    }

    pub fn set(&self, running: bool) {
        self.store.set_state(&self.key, StatePatch::running(running));
    }

    /// The current value together with a setter bound to this instance.
    pub fn pair(&self) -> (bool, impl Fn(bool) + 'static) {
        let setter = self.clone();
        (self.get(), move |running| setter.set(running))
    }
}

impl fmt::Debug for RunningCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningCapability")
            .field("key", &self.key)
            .field("value", &self.get())
            .finish()
    }
}

#[derive(Clone)]
pub struct DataCapability<T: Clone + 'static> {
    key: InstanceKey,
    store: KeyedInstanceStore,
    initial: T,
}

impl<T: Clone + 'static> DataCapability<T> {
    pub(crate) fn new(key: InstanceKey, store: KeyedInstanceStore, initial: T) -> Self {
        Self {
            key,
            store,
            initial,
        }
    }

    pub fn initial(&self) -> &T {
        &self.initial
    }

    /// Reads the stored payload. The first read of a slice without data
    /// writes `initial` so every other reader sees a defined value.
    pub fn get(&self) -> T {
        let state = self.store.get_state(&self.key);
        match state.as_ref().and_then(|state| state.raw_data()) {
            Some(raw) => match raw.downcast_ref::<T>() {
                Some(value) => value.clone(),
                None => {
                    log::warn!(
                        "data for {} is not a {}; using initial value",
                        self.key,
                        std::any::type_name::<T>()
                    );
                    self.initial.clone()
                }
            },
            None => {
                self.store
                    .set_state(&self.key, StatePatch::data(self.initial.clone()));
                self.initial.clone()
            }
        }
    }

    pub fn set(&self, data: T) {
        self.store.set_state(&self.key, StatePatch::data(data));
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut current = self.get();
        let result = f(&mut current);
        self.set(current);
        result
    }

    pub fn pair(&self) -> (T, impl Fn(T) + 'static) {
        let setter = self.clone();
        (self.get(), move |data| setter.set(data))
    }
}

/// The capability set of one activation.
pub struct Capabilities<T: Clone + 'static> {
    key: InstanceKey,
    running: RunningCapability,
    data: DataCapability<T>,
}

impl<T: Clone + 'static> Capabilities<T> {
    pub fn derive(store: &KeyedInstanceStore, key: &InstanceKey, initial: T) -> Self {
        Self {
            key: key.clone(),
            running: RunningCapability::new(key.clone(), store.clone()),
            data: DataCapability::new(key.clone(), store.clone(), initial),
        }
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn running(&self) -> &RunningCapability {
        &self.running
    }

    pub fn data(&self) -> &DataCapability<T> {
        &self.data
    }

    pub fn kinds(&self) -> [CapabilityKind; 2] {
        [CapabilityKind::Running, CapabilityKind::Data]
    }
}

/// Host-side view of a mounted instance.
#[derive(Clone)]
pub struct InstanceHandle {
    key: InstanceKey,
    running: RunningCapability,
    capabilities: Rc<dyn Any>,
}

impl InstanceHandle {
    pub(crate) fn new<T: Clone + 'static>(capabilities: Rc<Capabilities<T>>) -> Self {
        Self {
            key: capabilities.key.clone(),
            running: capabilities.running.clone(),
            capabilities,
        }
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn running(&self) -> &RunningCapability {
        &self.running
    }

    /// Typed access to the same capabilities the program was given.
    pub fn capabilities<T: Clone + 'static>(&self) -> Option<Rc<Capabilities<T>>> {
        Rc::clone(&self.capabilities).downcast::<Capabilities<T>>().ok()
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("key", &self.key)
            .field("running", &self.running.get())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/capability_tests.rs"]
mod tests;

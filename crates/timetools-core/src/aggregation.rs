//! Aggregation of per-instance `running` flags into the [`ActiveSet`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;

use crate::registry::{ProgramDescriptor, ProgramRegistry};
use crate::store::{InstanceKey, KeyedInstanceStore, StoreSubscription};

/// Ids of the programs currently reporting activity, in registry order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    ids: IndexSet<String>,
}

impl ActiveSet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl fmt::Debug for ActiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids.iter()).finish()
    }
}

impl<S: Into<String>> FromIterator<S> for ActiveSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

type Listener = Rc<dyn Fn(&Rc<ActiveSet>) + 'static>;

struct TrackedProgram {
    id: String,
    key: Option<InstanceKey>,
    descriptor: ProgramDescriptor,
}

struct TrackerInner {
    store: KeyedInstanceStore,
    programs: Vec<TrackedProgram>,
    current: RefCell<Rc<ActiveSet>>,
    generation: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener_id: Cell<u64>,
    store_subscription: RefCell<Option<StoreSubscription>>,
}

impl TrackerInner {
    fn compute(&self) -> ActiveSet {
        self.programs
            .iter()
            .filter(|program| {
                let running = program
                    .key
                    .as_ref()
                    .and_then(|key| self.store.get_state(key))
                    .map(|state| state.running())
                    .unwrap_or(false);
                running || program.descriptor.reports_pre_mount_active()
            })
            .map(|program| program.id.clone())
            .collect()
    }

    /// Publishes only when the membership actually changed.
    fn recompute(&self) -> bool {
        let next = self.compute();
        if **self.current.borrow() == next {
            return false;
        }
        let next = Rc::new(next);
        *self.current.borrow_mut() = Rc::clone(&next);
        self.generation.set(self.generation.get() + 1);
        log::debug!("active set changed: {next:?}");

        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
        true
    }
}

#[derive(Clone)]
pub struct ActiveSetTracker {
    inner: Rc<TrackerInner>,
}

impl ActiveSetTracker {
    pub fn attach(store: &KeyedInstanceStore, registry: &ProgramRegistry) -> Self {
        let programs = registry
            .iter()
            .map(|descriptor| TrackedProgram {
                id: descriptor.id().to_owned(),
                key: descriptor.wrapper().resolve_key().ok(),
                descriptor: descriptor.clone(),
            })
            .collect();
        let inner = Rc::new(TrackerInner {
            store: store.clone(),
            programs,
            current: RefCell::new(Rc::new(ActiveSet::default())),
            generation: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(1),
            store_subscription: RefCell::new(None),
        });
        *inner.current.borrow_mut() = Rc::new(inner.compute());

        let weak: Weak<TrackerInner> = Rc::downgrade(&inner);
        let subscription = store.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.recompute();
            }
        });
        *inner.store_subscription.borrow_mut() = Some(subscription);
        Self { inner }
    }

    pub fn current(&self) -> Rc<ActiveSet> {
        Rc::clone(&self.inner.current.borrow())
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.inner.current.borrow().contains(id)
    }

    /// Recomputes without a store write, for predicates backed by
    /// external state. Returns true when a new set was published.
    pub fn refresh(&self) -> bool {
        self.inner.recompute()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn subscribe(&self, listener: impl Fn(&Rc<ActiveSet>) + 'static) -> ActiveSetSubscription {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        ActiveSetSubscription {
            tracker: Rc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl fmt::Debug for ActiveSetTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSetTracker")
            .field("current", &*self.inner.current.borrow())
            .field("generation", &self.generation())
            .finish()
    }
}

pub struct ActiveSetSubscription {
    tracker: Weak<TrackerInner>,
    id: Option<u64>,
}

impl ActiveSetSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let (Some(id), Some(tracker)) = (self.id.take(), self.tracker.upgrade()) {
            tracker
                .listeners
                .borrow_mut()
                .retain(|(listener_id, _)| *listener_id != id);
        }
    }
}

impl Drop for ActiveSetSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "tests/aggregation_tests.rs"]
mod tests;

//! Ambient shell context for selector-style reads.
//!
//! The host installs a [`ShellContext`] around mount, render, dispatch and
//! update. Code running inside can read the aggregated [`ActiveSet`] or an
//! instance bag without threading the store through every call.

use std::cell::RefCell;
use std::rc::Rc;

use crate::aggregation::{ActiveSet, ActiveSetTracker};
use crate::error::ToolsError;
use crate::store::{InstanceKey, InstanceState, KeyedInstanceStore};

#[derive(Clone, Debug)]
pub struct ShellContext {
    store: KeyedInstanceStore,
    tracker: ActiveSetTracker,
}

impl ShellContext {
    pub fn new(store: KeyedInstanceStore, tracker: ActiveSetTracker) -> Self {
        Self { store, tracker }
    }

    pub fn store(&self) -> &KeyedInstanceStore {
        &self.store
    }

    pub fn tracker(&self) -> &ActiveSetTracker {
        &self.tracker
    }
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ShellContext>> = RefCell::new(Vec::new());
}

struct ContextGuard;

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `context` installed. Nested calls shadow the outer context.
pub fn enter<R>(context: &ShellContext, f: impl FnOnce() -> R) -> R {
    CONTEXT_STACK.with(|stack| stack.borrow_mut().push(context.clone()));
    let _guard = ContextGuard;
    f()
}

pub fn try_current() -> Option<ShellContext> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
}

pub fn is_entered() -> bool {
    CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
}

fn require(api: &'static str) -> Result<ShellContext, ToolsError> {
    try_current().ok_or(ToolsError::OutsideInstanceContext { api })
}

pub fn use_active_set() -> Result<Rc<ActiveSet>, ToolsError> {
    Ok(require("use_active_set")?.tracker.current())
}

pub fn use_is_active(id: &str) -> Result<bool, ToolsError> {
    Ok(require("use_is_active")?.tracker.is_active(id))
}

pub fn use_instance_state(key: &InstanceKey) -> Result<Option<Rc<InstanceState>>, ToolsError> {
    Ok(require("use_instance_state")?.store.get_state(key))
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;

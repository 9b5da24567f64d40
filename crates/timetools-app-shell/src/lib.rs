//! Host shell: owns the store, activates one program at a time and drives
//! timer ticks and re-renders.

pub mod config;

use std::rc::Rc;

use timetools_core::context::{self, ShellContext};
use timetools_core::{
    Action, ActiveSet, ActiveSetSubscription, ActiveSetTracker, InstanceHandle,
    KeyedInstanceStore, MountedInstance, ProgramDescriptor, ProgramRegistry, Runtime, ToolsError,
    View,
};

pub use config::{load_config, ConfigError, ShellConfig};

/// One row of the program sidebar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidebarEntry {
    pub id: String,
    pub name: String,
    pub icon: String,
    /// The program reports activity.
    pub active: bool,
    /// The program is the one currently shown.
    pub selected: bool,
}

struct ActiveProgram {
    id: String,
    instance: MountedInstance,
}

pub struct AppShell {
    runtime: Runtime,
    registry: ProgramRegistry,
    store: KeyedInstanceStore,
    tracker: ActiveSetTracker,
    context: ShellContext,
    config: ShellConfig,
    active: Option<ActiveProgram>,
}

impl AppShell {
    pub fn new(runtime: Runtime, registry: ProgramRegistry, config: ShellConfig) -> Self {
        let store = KeyedInstanceStore::new();
        let tracker = ActiveSetTracker::attach(&store, &registry);
        let context = ShellContext::new(store.clone(), tracker.clone());
        log::debug!("shell created with {} programs", registry.len());
        Self {
            runtime,
            registry,
            store,
            tracker,
            context,
            config,
            active: None,
        }
    }

    /// Activates the configured initial program, if any.
    pub fn launch(&mut self) -> Result<(), ToolsError> {
        match self.config.initial_program.clone() {
            Some(id) => self.activate(&id),
            None => Ok(()),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn store(&self) -> &KeyedInstanceStore {
        &self.store
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn activate(&mut self, id: &str) -> Result<(), ToolsError> {
        let descriptor = self
            .registry
            .find(id)
            .cloned()
            .ok_or_else(|| ToolsError::UnknownProgram { id: id.to_owned() })?;
        if self.active_program() == Some(id) {
            return Ok(());
        }
        self.deactivate();

        let wrapper = descriptor.wrapper();
        let store = self.store.clone();
        let handle = self.runtime.handle();
        let instance = context::enter(&self.context, || wrapper.mount(&store, &handle))?;
        log::info!("activated {}", descriptor.id());
        self.active = Some(ActiveProgram {
            id: descriptor.id().to_owned(),
            instance,
        });
        Ok(())
    }

    /// Unmounts the current program. Returns its id.
    pub fn deactivate(&mut self) -> Option<String> {
        let ActiveProgram { id, instance } = self.active.take()?;
        context::enter(&self.context, || instance.unmount());
        log::info!("deactivated {id}");
        Some(id)
    }

    pub fn active_program(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.id.as_str())
    }

    pub fn active_descriptor(&self) -> Option<&ProgramDescriptor> {
        self.active_program().and_then(|id| self.registry.find(id))
    }

    pub fn handle(&self) -> Option<&InstanceHandle> {
        self.active.as_ref().map(|active| active.instance.handle())
    }

    pub fn view(&self) -> Option<&View> {
        self.active.as_ref().and_then(|active| active.instance.view())
    }

    pub fn dispatch(&mut self, action: &Action) -> Result<(), ToolsError> {
        let Some(active) = self.active.as_mut() else {
            return Err(ToolsError::unsupported("shell", action.verb.as_str()));
        };
        let instance = &mut active.instance;
        let result = context::enter(&self.context, || instance.dispatch(action));
        if let Err(err) = &result {
            log::debug!("{} rejected '{}': {err}", active.id, action.verb);
        }
        self.tracker.refresh();
        result
    }

    pub fn should_update(&self) -> bool {
        self.runtime.needs_tick()
            || self
                .active
                .as_ref()
                .map(|active| active.instance.is_invalid())
                .unwrap_or(false)
    }

    /// Fires due timers, then re-renders the active program if it was
    /// invalidated. Returns true when the view changed.
    pub fn update(&mut self) -> bool {
        let runtime = &self.runtime;
        let active = &mut self.active;
        context::enter(&self.context, || {
            runtime.drain_due_timers();
            active
                .as_mut()
                .map(|active| active.instance.render_if_invalid())
                .unwrap_or(false)
        })
    }

    pub fn active_set(&self) -> Rc<ActiveSet> {
        self.tracker.current()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.tracker.is_active(id)
    }

    pub fn subscribe_active_set(
        &self,
        listener: impl Fn(&Rc<ActiveSet>) + 'static,
    ) -> ActiveSetSubscription {
        self.tracker.subscribe(listener)
    }

    /// Re-evaluates pre-mount predicates whose backing state changed
    /// outside the store.
    pub fn refresh_active_set(&self) -> bool {
        self.tracker.refresh()
    }

    pub fn search(&self, query: &str) -> Vec<&ProgramDescriptor> {
        self.registry.search(query)
    }

    pub fn sidebar(&self) -> Vec<SidebarEntry> {
        let active_set = self.tracker.current();
        let selected = self.active_program();
        self.registry
            .iter()
            .map(|program| SidebarEntry {
                id: program.id().to_owned(),
                name: program.name().to_owned(),
                icon: program.icon_name().to_owned(),
                active: active_set.contains(program.id()),
                selected: selected == Some(program.id()),
            })
            .collect()
    }
}

impl Drop for AppShell {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;

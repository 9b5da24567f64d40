//! Instance lifecycle wrapper.
//!
//! [`InstanceWrapper`] binds a [`Component`] to a stable [`InstanceKey`],
//! provisions its store slice on mount and decides on unmount whether the
//! slice survives. Persistence is a property of the program's configuration
//! and is only consulted in [`MountedInstance::unmount`].

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::capability::{Capabilities, InstanceHandle};
use crate::error::ToolsError;
use crate::runtime::RuntimeHandle;
use crate::store::{InstanceKey, KeyedInstanceStore, StatePatch, StoreSubscription};
use crate::timer_clock::TimerRegistration;

/// Textual output of a program render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct View {
    pub title: String,
    pub lines: Vec<String>,
}

impl View {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

/// A user request forwarded to the mounted program, e.g. `set 300`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub verb: String,
    pub args: Vec<String>,
}

impl Action {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next()?.to_lowercase();
        Some(Self {
            verb,
            args: parts.map(str::to_owned).collect(),
        })
    }

    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// All arguments joined back into free text.
    pub fn text(&self) -> String {
        self.args.join(" ")
    }
}

/// Props handed to a program while it renders or handles an action.
pub struct ProgramProps<'a, T: Clone + 'static> {
    pub capabilities: &'a Capabilities<T>,
    pub now_millis: u64,
}

impl<T: Clone + 'static> ProgramProps<'_, T> {
    pub fn running(&self) -> bool {
        self.capabilities.running().get()
    }

    pub fn set_running(&self, running: bool) {
        self.capabilities.running().set(running);
    }

    pub fn data(&self) -> T {
        self.capabilities.data().get()
    }

    pub fn set_data(&self, data: T) {
        self.capabilities.data().set(data);
    }
}

/// Marks an instance for re-render without touching its store slice.
#[derive(Clone)]
pub struct Invalidator {
    invalid: Rc<Cell<bool>>,
    runtime: RuntimeHandle,
}

impl Invalidator {
    pub fn invalidate(&self) {
        self.invalid.set(true);
        self.runtime.schedule();
    }
}

/// Mount-time services. Everything registered here is owned by the mount
/// and released when the instance is torn down.
pub struct MountScope<'a, T: Clone + 'static> {
    capabilities: Rc<Capabilities<T>>,
    runtime: RuntimeHandle,
    timers: &'a mut Vec<TimerRegistration>,
    disposers: &'a mut Vec<Box<dyn FnOnce()>>,
    invalidator: Invalidator,
}

impl<T: Clone + 'static> MountScope<'_, T> {
    pub fn capabilities(&self) -> &Capabilities<T> {
        &self.capabilities
    }

    pub fn now_millis(&self) -> u64 {
        self.runtime.now_millis()
    }

    pub fn every(
        &mut self,
        interval_millis: u64,
        mut tick: impl FnMut(&Capabilities<T>, u64) + 'static,
    ) {
        let capabilities = Rc::clone(&self.capabilities);
        let registration = self
            .runtime
            .timer_clock()
            .every(interval_millis, move |now| tick(&capabilities, now));
        self.timers.push(registration);
    }

    pub fn on_dispose(&mut self, cleanup: impl FnOnce() + 'static) {
        self.disposers.push(Box::new(cleanup));
    }

    pub fn invalidator(&self) -> Invalidator {
        self.invalidator.clone()
    }
}

/// A program that can be mounted behind the host shell.
pub trait Program: 'static {
    type Data: Clone + 'static;

    /// Identity used when the wrapper is not given an explicit id.
    const STATIC_NAME: Option<&'static str> = None;

    fn initial_data(&self) -> Self::Data;

    fn on_mount(&mut self, _scope: &mut MountScope<'_, Self::Data>) {}

    fn render(&mut self, props: &ProgramProps<'_, Self::Data>) -> View;

    fn on_action(
        &mut self,
        props: &ProgramProps<'_, Self::Data>,
        action: &Action,
    ) -> Result<(), ToolsError> {
        Err(ToolsError::unsupported(
            props.capabilities.key().as_str(),
            action.verb.as_str(),
        ))
    }

    fn on_unmount(&mut self) {}
}

/// Type-erased program factory stored in the registry.
pub trait Component {
    fn static_name(&self) -> Option<&'static str>;

    fn type_name(&self) -> &'static str;

    fn mount(
        &self,
        key: InstanceKey,
        persistent: bool,
        store: &KeyedInstanceStore,
        runtime: &RuntimeHandle,
    ) -> MountedInstance;
}

pub type ComponentRef = Rc<dyn Component>;

struct ProgramComponent<P, F> {
    factory: F,
    _program: PhantomData<fn() -> P>,
}

impl<P, F> Component for ProgramComponent<P, F>
where
    P: Program,
    F: Fn() -> P + 'static,
{
    fn static_name(&self) -> Option<&'static str> {
        P::STATIC_NAME
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn mount(
        &self,
        key: InstanceKey,
        persistent: bool,
        store: &KeyedInstanceStore,
        runtime: &RuntimeHandle,
    ) -> MountedInstance {
        mount_program((self.factory)(), key, persistent, store, runtime)
    }
}

pub fn component<P, F>(factory: F) -> ComponentRef
where
    P: Program,
    F: Fn() -> P + 'static,
{
    Rc::new(ProgramComponent {
        factory,
        _program: PhantomData,
    })
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrapperConfig {
    pub component_id: Option<String>,
    pub persistent: bool,
}

#[derive(Clone)]
pub struct InstanceWrapper {
    component: ComponentRef,
    config: WrapperConfig,
}

impl InstanceWrapper {
    pub fn new(component: ComponentRef, config: WrapperConfig) -> Self {
        Self { component, config }
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    /// Explicit id first, then the component's static name. There is no
    /// positional fallback: an unstable key would silently break persistence.
    pub fn resolve_key(&self) -> Result<InstanceKey, ToolsError> {
        let explicit = self
            .config
            .component_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        explicit
            .or_else(|| self.component.static_name())
            .map(InstanceKey::from)
            .ok_or_else(|| ToolsError::MissingIdentity {
                component: self.component.type_name().to_owned(),
            })
    }

    pub fn mount(
        &self,
        store: &KeyedInstanceStore,
        runtime: &RuntimeHandle,
    ) -> Result<MountedInstance, ToolsError> {
        let key = self.resolve_key()?;
        let mut instance = self
            .component
            .mount(key, self.config.persistent, store, runtime);
        instance.render();
        Ok(instance)
    }
}

trait MountedProgram {
    fn render(&mut self, now_millis: u64) -> View;
    fn on_action(&mut self, now_millis: u64, action: &Action) -> Result<(), ToolsError>;
    fn on_unmount(&mut self);
}

struct Mounted<P: Program> {
    program: P,
    capabilities: Rc<Capabilities<P::Data>>,
}

impl<P: Program> MountedProgram for Mounted<P> {
    fn render(&mut self, now_millis: u64) -> View {
        let props = ProgramProps {
            capabilities: &self.capabilities,
            now_millis,
        };
        self.program.render(&props)
    }

    fn on_action(&mut self, now_millis: u64, action: &Action) -> Result<(), ToolsError> {
        let props = ProgramProps {
            capabilities: &self.capabilities,
            now_millis,
        };
        self.program.on_action(&props, action)
    }

    fn on_unmount(&mut self) {
        self.program.on_unmount();
    }
}

pub fn mount_program<P: Program>(
    mut program: P,
    key: InstanceKey,
    persistent: bool,
    store: &KeyedInstanceStore,
    runtime: &RuntimeHandle,
) -> MountedInstance {
    let initial = program.initial_data();
    if !store.contains(&key) {
        store.set_state(
            &key,
            StatePatch::running(false).with_data(initial.clone()),
        );
    }

    let capabilities = Rc::new(Capabilities::derive(store, &key, initial));
    let handle = InstanceHandle::new(Rc::clone(&capabilities));

    let invalid = Rc::new(Cell::new(true));
    let subscription = {
        let invalid = Rc::clone(&invalid);
        let runtime = runtime.clone();
        store.subscribe_key(&key, move |_| {
            invalid.set(true);
            runtime.schedule();
        })
    };
    let invalidator = Invalidator {
        invalid: Rc::clone(&invalid),
        runtime: runtime.clone(),
    };

    let mut timers = Vec::new();
    let mut disposers = Vec::new();
    {
        let mut scope = MountScope {
            capabilities: Rc::clone(&capabilities),
            runtime: runtime.clone(),
            timers: &mut timers,
            disposers: &mut disposers,
            invalidator,
        };
        program.on_mount(&mut scope);
    }
    log::info!(
        "mounted {key} ({} timers, persistent={persistent})",
        timers.len()
    );

    MountedInstance {
        key,
        persistent,
        handle,
        program: Some(Box::new(Mounted {
            program,
            capabilities,
        })),
        timers,
        disposers,
        subscription: Some(subscription),
        invalid,
        store: store.clone(),
        runtime: runtime.clone(),
        view: None,
    }
}

pub struct MountedInstance {
    key: InstanceKey,
    persistent: bool,
    handle: InstanceHandle,
    program: Option<Box<dyn MountedProgram>>,
    timers: Vec<TimerRegistration>,
    disposers: Vec<Box<dyn FnOnce()>>,
    subscription: Option<StoreSubscription>,
    invalid: Rc<Cell<bool>>,
    store: KeyedInstanceStore,
    runtime: RuntimeHandle,
    view: Option<View>,
}

impl MountedInstance {
    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn handle(&self) -> &InstanceHandle {
        &self.handle
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid.get()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn render(&mut self) -> Option<&View> {
        let now = self.runtime.now_millis();
        if let Some(program) = self.program.as_mut() {
            self.invalid.set(false);
            self.view = Some(program.render(now));
        }
        self.view.as_ref()
    }

    /// Returns true when a render happened.
    pub fn render_if_invalid(&mut self) -> bool {
        if !self.invalid.get() {
            return false;
        }
        self.render();
        true
    }

    pub fn dispatch(&mut self, action: &Action) -> Result<(), ToolsError> {
        let now = self.runtime.now_millis();
        match self.program.as_mut() {
            Some(program) => program.on_action(now, action),
            None => Err(ToolsError::unsupported(self.key.as_str(), action.verb.as_str())),
        }
    }

    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(mut program) = self.program.take() else {
            return;
        };
        // Timers go first so no tick can land after the slice is gone.
        self.timers.clear();
        for cleanup in self.disposers.drain(..) {
            cleanup();
        }
        self.subscription.take();
        program.on_unmount();
        drop(program);
        if !self.persistent {
            self.store.delete_state(&self.key);
        }
        log::info!("unmounted {} (persistent={})", self.key, self.persistent);
    }
}

impl Drop for MountedInstance {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for MountedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedInstance")
            .field("key", &self.key)
            .field("persistent", &self.persistent)
            .field("timers", &self.timers.len())
            .field("invalid", &self.invalid.get())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;

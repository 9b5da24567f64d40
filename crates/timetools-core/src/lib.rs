#![doc = r"Program lifecycle and state-isolation core for Time Tools."]

pub mod aggregation;
pub mod capability;
pub mod collections;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod platform;
pub mod registry;
pub mod runtime;
pub mod store;
pub mod timer_clock;

pub use aggregation::{ActiveSet, ActiveSetSubscription, ActiveSetTracker};
pub use capability::{
    Capabilities, CapabilityKind, DataCapability, InstanceHandle, RunningCapability,
};
pub use context::{use_active_set, use_instance_state, use_is_active, ShellContext};
pub use error::ToolsError;
pub use lifecycle::{
    component, mount_program, Action, Component, ComponentRef, InstanceWrapper, Invalidator,
    MountScope, MountedInstance, Program, ProgramProps, View, WrapperConfig,
};
pub use platform::{Clock, RuntimeScheduler};
pub use registry::{ProgramDescriptor, ProgramRegistry};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use store::{
    AttributeValue, InstanceKey, InstanceState, KeyedInstanceStore, StatePatch, StoreChange,
    StoreSubscription,
};
pub use timer_clock::{TimerClock, TimerRegistration};

#[cfg(test)]
pub use runtime::TestRuntime;

pub type TimerId = u64;

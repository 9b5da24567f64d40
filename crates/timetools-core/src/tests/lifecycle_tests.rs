use super::*;
use crate::{TestRuntime, ToolsError};
use std::cell::RefCell;

type EventLog = Rc<RefCell<Vec<&'static str>>>;

struct Counter {
    log: EventLog,
    runtime: RuntimeHandle,
}

impl Program for Counter {
    type Data = u32;
    const STATIC_NAME: Option<&'static str> = Some("counter");

    fn initial_data(&self) -> u32 {
        0
    }

    fn on_mount(&mut self, scope: &mut MountScope<'_, u32>) {
        scope.every(10, |caps, _now| {
            caps.data().update(|count| *count += 1);
        });
        let log = Rc::clone(&self.log);
        let runtime = self.runtime.clone();
        scope.on_dispose(move || {
            log.borrow_mut().push(if runtime.has_timers() {
                "dispose-with-timers"
            } else {
                "dispose"
            });
        });
    }

    fn render(&mut self, props: &ProgramProps<'_, u32>) -> View {
        View::new("Counter").line(format!("count {}", props.data()))
    }

    fn on_action(&mut self, props: &ProgramProps<'_, u32>, action: &Action) -> Result<(), ToolsError> {
        match action.verb.as_str() {
            "start" => props.set_running(true),
            "stop" => props.set_running(false),
            other => return Err(ToolsError::unsupported("counter", other)),
        }
        Ok(())
    }

    fn on_unmount(&mut self) {
        self.log.borrow_mut().push("unmount");
    }
}

struct Anonymous;

impl Program for Anonymous {
    type Data = ();

    fn initial_data(&self) -> Self::Data {}

    fn render(&mut self, _props: &ProgramProps<'_, ()>) -> View {
        View::new("anonymous")
    }
}

struct Fixture {
    runtime: TestRuntime,
    store: KeyedInstanceStore,
    log: EventLog,
}

impl Fixture {
    fn new() -> Self {
        Self {
            runtime: TestRuntime::new(),
            store: KeyedInstanceStore::new(),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn wrapper(&self, persistent: bool) -> InstanceWrapper {
        let log = Rc::clone(&self.log);
        let runtime = self.runtime.handle();
        InstanceWrapper::new(
            component(move || Counter {
                log: Rc::clone(&log),
                runtime: runtime.clone(),
            }),
            WrapperConfig {
                component_id: None,
                persistent,
            },
        )
    }

    fn mount(&self, persistent: bool) -> MountedInstance {
        self.wrapper(persistent)
            .mount(&self.store, &self.runtime.handle())
            .expect("mount")
    }

    fn count(&self) -> Option<u32> {
        self.store
            .get_state(&InstanceKey::from("counter"))
            .and_then(|state| state.data::<u32>())
    }

    fn running(&self) -> Option<bool> {
        self.store
            .get_state(&InstanceKey::from("counter"))
            .map(|state| state.running())
    }
}

#[test]
fn mount_provisions_defaults_and_renders() {
    let fx = Fixture::new();
    let instance = fx.mount(false);

    assert_eq!(instance.key().as_str(), "counter");
    assert_eq!(fx.running(), Some(false));
    assert_eq!(fx.count(), Some(0));
    assert!(!instance.is_invalid());
    assert_eq!(
        instance.view().map(|view| view.lines.clone()),
        Some(vec!["count 0".to_string()])
    );
    assert_eq!(instance.timer_count(), 1);
}

#[test]
fn timer_ticks_write_through_and_invalidate() {
    let fx = Fixture::new();
    let mut instance = fx.mount(false);

    fx.runtime.advance(35);

    assert_eq!(fx.count(), Some(3));
    assert!(instance.is_invalid());
    assert!(instance.render_if_invalid());
    assert!(!instance.render_if_invalid());
    assert_eq!(
        instance.view().and_then(|view| view.lines.first().cloned()),
        Some("count 3".to_string())
    );
}

#[test]
fn writes_to_other_keys_do_not_invalidate() {
    let fx = Fixture::new();
    let instance = fx.mount(false);

    fx.store
        .set_state(&InstanceKey::from("other"), StatePatch::running(true));

    assert!(!instance.is_invalid());
}

#[test]
fn persistent_state_survives_remount() {
    let fx = Fixture::new();
    let mut instance = fx.mount(true);
    instance.dispatch(&Action::new("start")).expect("start");
    fx.runtime.advance(20);
    instance.unmount();

    assert_eq!(fx.running(), Some(true));
    assert_eq!(fx.count(), Some(2));

    fx.runtime.advance(100);
    assert_eq!(fx.count(), Some(2), "no ticks after unmount");

    let instance = fx.mount(true);
    assert_eq!(fx.running(), Some(true));
    assert_eq!(fx.count(), Some(2));
    assert!(instance.handle().running().get());
}

#[test]
fn non_persistent_state_is_deleted_and_resets() {
    let fx = Fixture::new();
    let mut instance = fx.mount(false);
    instance.dispatch(&Action::new("start")).expect("start");
    fx.runtime.advance(20);
    instance.unmount();

    assert!(fx.store.get_state(&InstanceKey::from("counter")).is_none());

    let version = fx.store.version();
    fx.runtime.advance(100);
    assert_eq!(fx.store.version(), version, "no mutation after unmount");
    assert!(fx.store.is_empty());

    let _instance = fx.mount(false);
    assert_eq!(fx.running(), Some(false));
    assert_eq!(fx.count(), Some(0));
}

#[test]
fn sequential_mounts_share_one_key() {
    let fx = Fixture::new();
    let first = fx.mount(true);
    let first_key = first.key().clone();
    drop(first);
    let second = fx.mount(true);

    assert_eq!(&first_key, second.key());
    assert_eq!(fx.store.keys(), vec![first_key]);
}

#[test]
fn teardown_cancels_timers_before_disposers_and_unmount() {
    let fx = Fixture::new();
    let instance = fx.mount(false);
    assert!(fx.runtime.handle().has_timers());

    drop(instance);

    assert!(!fx.runtime.handle().has_timers());
    assert_eq!(*fx.log.borrow(), vec!["dispose", "unmount"]);
}

#[test]
fn explicit_unmount_tears_down_once() {
    let fx = Fixture::new();
    let instance = fx.mount(false);
    let before = fx.store.version();

    instance.unmount();

    assert_eq!(fx.store.version(), before + 1, "single delete");
    assert_eq!(fx.log.borrow().len(), 2);
}

#[test]
fn teardown_drops_key_subscription() {
    let fx = Fixture::new();
    let instance = fx.mount(true);
    assert_eq!(fx.store.observer_count(), 1);

    instance.unmount();

    assert_eq!(fx.store.observer_count(), 0);
}

#[test]
fn unsupported_action_is_reported() {
    let fx = Fixture::new();
    let mut instance = fx.mount(false);

    let err = instance.dispatch(&Action::new("fly")).expect_err("unsupported");

    assert_eq!(err, ToolsError::unsupported("counter", "fly"));
    assert!(!err.is_fatal());
}

#[test]
fn default_action_handler_rejects_everything() {
    let fx = Fixture::new();
    let wrapper = InstanceWrapper::new(
        component(|| Anonymous),
        WrapperConfig {
            component_id: Some("anon".into()),
            persistent: false,
        },
    );
    let mut instance = wrapper
        .mount(&fx.store, &fx.runtime.handle())
        .expect("mount");

    let err = instance.dispatch(&Action::new("start")).expect_err("unsupported");
    assert_eq!(err, ToolsError::unsupported("anon", "start"));
}

#[test]
fn missing_identity_aborts_mount() {
    let fx = Fixture::new();
    let wrapper = InstanceWrapper::new(component(|| Anonymous), WrapperConfig::default());

    let err = wrapper
        .mount(&fx.store, &fx.runtime.handle())
        .expect_err("no identity");

    assert!(matches!(err, ToolsError::MissingIdentity { .. }));
    assert!(fx.store.is_empty());
}

#[test]
fn explicit_id_overrides_static_name() {
    let fx = Fixture::new();
    let log = Rc::clone(&fx.log);
    let runtime = fx.runtime.handle();
    let wrapper = InstanceWrapper::new(
        component(move || Counter {
            log: Rc::clone(&log),
            runtime: runtime.clone(),
        }),
        WrapperConfig {
            component_id: Some("tally".into()),
            persistent: false,
        },
    );

    assert_eq!(wrapper.resolve_key().expect("key").as_str(), "tally");
}

#[test]
fn existing_data_is_not_overwritten_on_mount() {
    let fx = Fixture::new();
    fx.store.set_state(
        &InstanceKey::from("counter"),
        StatePatch::running(true).with_data(41_u32),
    );

    let instance = fx.mount(true);

    assert_eq!(fx.count(), Some(41));
    assert_eq!(
        instance.view().and_then(|view| view.lines.first().cloned()),
        Some("count 41".to_string())
    );
}

#[test]
fn action_parse_splits_verb_and_args() {
    let action = Action::parse("  ADD buy  milk ").expect("action");
    assert_eq!(action.verb, "add");
    assert_eq!(action.args, vec!["buy", "milk"]);
    assert_eq!(action.text(), "buy milk");
    assert_eq!(action.first_arg(), Some("buy"));
    assert!(Action::parse("   ").is_none());
}

#[test]
fn view_display_lists_title_and_lines() {
    let view = View::new("Stoppuhr").line("00:01.50");
    assert_eq!(view.to_string(), "== Stoppuhr ==\n  00:01.50\n");
}

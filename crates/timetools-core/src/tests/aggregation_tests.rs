use super::*;
use crate::lifecycle::{component, Program, ProgramProps, View};
use crate::store::StatePatch;

struct Idle;

impl Program for Idle {
    type Data = ();

    fn initial_data(&self) -> Self::Data {}

    fn render(&mut self, _props: &ProgramProps<'_, ()>) -> View {
        View::new("idle")
    }
}

struct Setup {
    store: KeyedInstanceStore,
    tracker: ActiveSetTracker,
    pending: Rc<Cell<bool>>,
}

fn setup() -> Setup {
    let pending = Rc::new(Cell::new(false));
    let registry = {
        let pending = Rc::clone(&pending);
        ProgramRegistry::new(vec![
            ProgramDescriptor::new("worldclock", "Weltzeituhr", component(|| Idle)),
            ProgramDescriptor::new("timer", "Timer", component(|| Idle)).persistent(true),
            ProgramDescriptor::new("stopwatch", "Stoppuhr", component(|| Idle)).persistent(true),
            ProgramDescriptor::new("todo", "Todo", component(|| Idle))
                .pre_mount_active(move || pending.get()),
        ])
    };
    let store = KeyedInstanceStore::new();
    let tracker = ActiveSetTracker::attach(&store, &registry);
    Setup {
        store,
        tracker,
        pending,
    }
}

fn set_running(store: &KeyedInstanceStore, id: &str, running: bool) {
    store.set_state(&InstanceKey::from(id), StatePatch::running(running));
}

fn ids(set: &ActiveSet) -> Vec<&str> {
    set.iter().collect()
}

#[test]
fn starts_empty() {
    let s = setup();
    assert!(s.tracker.current().is_empty());
    assert_eq!(s.tracker.generation(), 0);
}

#[test]
fn running_flags_are_aggregated_in_registry_order() {
    let s = setup();
    set_running(&s.store, "stopwatch", true);
    set_running(&s.store, "timer", true);

    let current = s.tracker.current();
    assert_eq!(ids(&current), vec!["timer", "stopwatch"]);
    assert!(s.tracker.is_active("timer"));
    assert!(!s.tracker.is_active("worldclock"));
}

#[test]
fn every_combination_of_flags_and_predicate() {
    let programs = ["worldclock", "timer", "stopwatch", "todo"];
    for mask in 0..16u32 {
        for predicate in [false, true] {
            let s = setup();
            s.pending.set(predicate);
            for (bit, id) in programs.iter().enumerate() {
                set_running(&s.store, id, mask & (1 << bit) != 0);
            }
            s.tracker.refresh();

            let expected: Vec<&str> = programs
                .iter()
                .enumerate()
                .filter(|(bit, id)| mask & (1 << bit) != 0 || (**id == "todo" && predicate))
                .map(|(_, id)| *id)
                .collect();
            assert_eq!(
                ids(&s.tracker.current()),
                expected,
                "mask {mask:04b} predicate {predicate}"
            );
        }
    }
}

#[test]
fn unchanged_set_is_not_republished() {
    let s = setup();
    let calls = Rc::new(Cell::new(0));
    let _listener = {
        let calls = Rc::clone(&calls);
        s.tracker.subscribe(move |_| calls.set(calls.get() + 1))
    };

    set_running(&s.store, "timer", true);
    let published = s.tracker.current();
    assert_eq!(calls.get(), 1);

    set_running(&s.store, "timer", true);
    s.store
        .set_state(&InstanceKey::from("timer"), StatePatch::data(42_u64));
    set_running(&s.store, "worldclock", false);

    assert!(Rc::ptr_eq(&published, &s.tracker.current()));
    assert_eq!(calls.get(), 1);
    assert_eq!(s.tracker.generation(), 1);
}

#[test]
fn listeners_receive_the_published_set() {
    let s = setup();
    let seen: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let _listener = {
        let seen = Rc::clone(&seen);
        s.tracker.subscribe(move |set| {
            seen.borrow_mut()
                .push(set.iter().map(str::to_owned).collect());
        })
    };

    set_running(&s.store, "stopwatch", true);
    set_running(&s.store, "stopwatch", false);

    assert_eq!(
        *seen.borrow(),
        vec![vec!["stopwatch".to_string()], Vec::<String>::new()]
    );
}

#[test]
fn deleting_state_clears_activity() {
    let s = setup();
    set_running(&s.store, "timer", true);
    s.store.delete_state(&InstanceKey::from("timer"));
    assert!(s.tracker.current().is_empty());
}

#[test]
fn refresh_picks_up_predicate_changes() {
    let s = setup();
    assert!(!s.tracker.refresh());

    s.pending.set(true);
    assert!(s.tracker.refresh());
    assert!(s.tracker.is_active("todo"));

    assert!(!s.tracker.refresh(), "second refresh has nothing new");
}

#[test]
fn dropped_listener_is_not_called() {
    let s = setup();
    let calls = Rc::new(Cell::new(0));
    let listener = {
        let calls = Rc::clone(&calls);
        s.tracker.subscribe(move |_| calls.set(calls.get() + 1))
    };
    assert_eq!(s.tracker.listener_count(), 1);
    drop(listener);

    set_running(&s.store, "timer", true);

    assert_eq!(calls.get(), 0);
    assert_eq!(s.tracker.listener_count(), 0);
}

#[test]
fn dropping_tracker_detaches_from_store() {
    let s = setup();
    assert_eq!(s.store.observer_count(), 1);
    drop(s.tracker);
    assert_eq!(s.store.observer_count(), 0);
}

use super::*;
use timetools_core::{component, InstanceKey, InstanceWrapper, KeyedInstanceStore, MountedInstance, WrapperConfig};
use timetools_testing::{run_with_harness, TimeHarness};

fn mount(store: &KeyedInstanceStore, harness: &TimeHarness) -> MountedInstance {
    InstanceWrapper::new(
        component(Stopwatch::new),
        WrapperConfig {
            component_id: None,
            persistent: true,
        },
    )
    .mount(store, &harness.runtime_handle())
    .expect("mount")
}

fn data(store: &KeyedInstanceStore) -> StopwatchData {
    store
        .get_state(&InstanceKey::from(STOPWATCH_ID))
        .and_then(|state| state.data::<StopwatchData>())
        .expect("stopwatch data")
}

fn running(store: &KeyedInstanceStore) -> bool {
    store
        .get_state(&InstanceKey::from(STOPWATCH_ID))
        .map(|state| state.running())
        .unwrap_or(false)
}

fn shown(instance: &mut MountedInstance) -> String {
    instance
        .render()
        .and_then(|view| view.lines.first().cloned())
        .expect("time line")
}

fn act(instance: &mut MountedInstance, verb: &str) {
    instance.dispatch(&Action::new(verb)).expect(verb);
}

#[test]
fn starts_at_zero_and_counts_up() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    assert_eq!(shown(&mut instance), "00:00.00");
    assert!(!running(&store));

    act(&mut instance, "start");
    harness.advance(1_500);

    assert!(running(&store));
    assert_eq!(shown(&mut instance), "00:01.50");
}

#[test]
fn ticks_invalidate_without_writing_the_store() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    act(&mut instance, "start");
    instance.render();
    let version = store.version();

    harness.advance(50);

    assert!(instance.is_invalid());
    assert_eq!(store.version(), version);
}

#[test]
fn idle_stopwatch_does_not_invalidate() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let instance = mount(&store, &harness);

    harness.advance(100);

    assert!(!instance.is_invalid());
}

#[test]
fn pause_freezes_elapsed_time() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    act(&mut instance, "start");
    harness.advance(1_000);
    act(&mut instance, "pause");
    harness.advance(5_000);

    assert!(!running(&store));
    assert_eq!(data(&store).elapsed_at(harness.now_millis()), 1_000);
    assert_eq!(shown(&mut instance), "00:01.00");

    act(&mut instance, "toggle");
    harness.advance(250);
    assert!(running(&store));
    assert_eq!(shown(&mut instance), "00:01.25");
}

#[test]
fn laps_record_total_and_split() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    act(&mut instance, "start");
    harness.advance(1_000);
    act(&mut instance, "lap");
    harness.advance(500);
    act(&mut instance, "lap");

    let laps = data(&store).laps;
    assert_eq!(
        laps,
        vec![
            Lap {
                number: 2,
                time_millis: 1_500,
                duration_millis: 500,
            },
            Lap {
                number: 1,
                time_millis: 1_000,
                duration_millis: 1_000,
            },
        ]
    );
    let view = instance.render().expect("view").clone();
    assert_eq!(view.lines[2], "Lap  2  00:00.50  00:01.50");
}

#[test]
fn lap_before_start_is_rejected() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);

    let err = instance.dispatch(&Action::new("lap")).expect_err("not started");

    assert!(matches!(err, ToolsError::InvalidArgument { .. }));
    assert!(data(&store).laps.is_empty());
}

#[test]
fn reset_clears_time_and_laps() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    act(&mut instance, "start");
    harness.advance(700);
    act(&mut instance, "lap");
    act(&mut instance, "reset");

    assert!(!running(&store));
    assert_eq!(data(&store), StopwatchData::default());
    assert_eq!(shown(&mut instance), "00:00.00");
}

#[test]
fn running_stopwatch_keeps_counting_across_remount() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    act(&mut instance, "start");
    harness.advance(2_000);
    instance.unmount();

    harness.advance(3_000);
    assert!(running(&store), "running survives unmount");

    let mut instance = mount(&store, &harness);
    assert_eq!(shown(&mut instance), "00:05.00");
    assert_eq!(instance.timer_count(), 1);
}

#[test]
fn unknown_verb_is_unsupported() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);

    let err = instance.dispatch(&Action::new("rewind")).expect_err("unsupported");

    assert_eq!(err, ToolsError::unsupported(STOPWATCH_ID, "rewind"));
}

#[test]
fn running_flag_set_through_the_handle_drives_the_clock() {
    run_with_harness(|harness| {
        let store = KeyedInstanceStore::new();
        let instance = mount(&store, harness);

        instance.handle().running().set(true);
        harness.advance(2_000);
        assert!(data(&store).started_at.is_some());
        instance.unmount();

        harness.advance(1_000);
        let mut instance = mount(&store, harness);
        // The first tick after the flag flipped picks up the start.
        assert_eq!(shown(&mut instance), "00:02.99");
        assert!(running(&store));
    });
}

#[test]
fn clearing_the_flag_through_the_handle_pauses() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    act(&mut instance, "start");
    harness.advance(3_000);

    instance.handle().running().set(false);
    harness.advance(10);
    harness.advance(5_000);

    let paused = data(&store);
    assert_eq!(paused.started_at, None);
    assert_eq!(paused.accumulated_millis, 3_010);
    assert_eq!(shown(&mut instance), "00:03.01");
}

#[test]
fn settled_stopwatch_does_not_write_on_tick() {
    let harness = TimeHarness::new();
    let store = KeyedInstanceStore::new();
    let mut instance = mount(&store, &harness);
    act(&mut instance, "start");
    let version = store.version();

    harness.advance(1_000);

    assert_eq!(store.version(), version);
}

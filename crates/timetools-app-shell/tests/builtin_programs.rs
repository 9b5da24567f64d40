use std::collections::HashSet;

use tempfile::tempdir;
use timetools_app_shell::{AppShell, ShellConfig};
use timetools_core::{use_active_set, use_is_active, Action, InstanceKey, ToolsError};
use timetools_programs::{builtin_registry, JsonFileStorage, MemoryStorage, TodoItem, TodoList};
use timetools_testing::TimeHarness;

fn shell_with(harness: &TimeHarness, todos: &TodoList) -> AppShell {
    AppShell::new(harness.runtime(), builtin_registry(todos), ShellConfig::default())
}

fn act(shell: &mut AppShell, line: &str) {
    shell
        .dispatch(&Action::parse(line).expect("action"))
        .unwrap_or_else(|err| panic!("{line}: {err}"));
}

fn active_ids(shell: &AppShell) -> Vec<String> {
    shell.active_set().iter().map(str::to_owned).collect()
}

fn first_line(shell: &AppShell) -> String {
    shell
        .view()
        .and_then(|view| view.lines.first().cloned())
        .expect("view line")
}

#[test]
fn stopwatch_keeps_running_while_another_program_is_shown() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let mut shell = shell_with(&harness, &todos);

    shell.activate("stopwatch").expect("stopwatch");
    act(&mut shell, "start");
    harness.advance(5_000);
    shell.update();
    assert_eq!(first_line(&shell), "00:05.00");

    shell.activate("worldclock").expect("worldclock");
    harness.advance(3_000);
    shell.update();
    assert_eq!(active_ids(&shell), vec!["stopwatch"]);

    shell.activate("stopwatch").expect("stopwatch again");
    assert_eq!(first_line(&shell), "00:08.00");
    assert!(shell.is_active("stopwatch"));

    act(&mut shell, "pause");
    assert!(active_ids(&shell).is_empty());
}

#[test]
fn world_clock_never_reports_activity() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let mut shell = shell_with(&harness, &todos);
    let before = shell.active_set();

    shell.activate("worldclock").expect("worldclock");
    for _ in 0..5 {
        harness.advance(1_000);
        assert!(shell.update());
    }

    assert!(!shell.is_active("worldclock"));
    assert!(std::rc::Rc::ptr_eq(&before, &shell.active_set()));

    shell.activate("timer").expect("timer");
    assert!(!shell.store().contains(&InstanceKey::from("worldclock")));
}

#[test]
fn countdown_finishes_in_the_foreground() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let mut shell = shell_with(&harness, &todos);
    shell.activate("timer").expect("timer");
    act(&mut shell, "set 2");
    act(&mut shell, "start");
    assert!(shell.is_active("timer"));

    harness.advance(2_100);
    shell.update();

    assert_eq!(first_line(&shell), "00:00");
    assert!(!shell.is_active("timer"));
}

#[test]
fn countdown_survives_a_program_switch() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let mut shell = shell_with(&harness, &todos);
    shell.activate("timer").expect("timer");
    act(&mut shell, "preset 5");
    act(&mut shell, "start");

    shell.activate("todo").expect("todo");
    harness.advance(60_000);
    shell.activate("timer").expect("timer again");

    assert_eq!(first_line(&shell), "04:00");
    assert!(shell.is_active("timer"));
}

#[test]
fn todo_reports_pending_items_before_it_is_opened() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::with_items(vec![TodoItem {
        id: "seed".into(),
        text: "file taxes".into(),
        completed: false,
        created_at: 0,
    }]));
    let mut shell = shell_with(&harness, &todos);
    assert_eq!(active_ids(&shell), vec!["todo"]);

    shell.activate("todo").expect("todo");
    act(&mut shell, "toggle #1");
    assert!(active_ids(&shell).is_empty());

    act(&mut shell, "add call plumber");
    assert_eq!(active_ids(&shell), vec!["todo"]);

    shell.deactivate();
    assert!(!shell.store().contains(&InstanceKey::from("todo")));
    assert_eq!(active_ids(&shell), vec!["todo"]);
}

#[test]
fn todo_changes_outside_the_program_need_a_refresh() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let shell = shell_with(&harness, &todos);

    todos.add("water plants", harness.now_millis()).expect("add");
    assert!(!shell.is_active("todo"));

    assert!(shell.refresh_active_set());
    assert!(shell.is_active("todo"));
}

#[test]
fn todo_items_are_written_to_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("todo-storage.json");
    let harness = TimeHarness::new();
    {
        let todos = TodoList::open(JsonFileStorage::new(&path));
        let mut shell = shell_with(&harness, &todos);
        shell.activate("todo").expect("todo");
        act(&mut shell, "add buy bread");
    }

    let reopened = TodoList::open(JsonFileStorage::new(&path));
    let texts: Vec<String> = reopened.items().into_iter().map(|item| item.text).collect();
    assert_eq!(texts, vec!["buy bread"]);
}

#[test]
fn empty_todo_text_is_an_invalid_argument() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let mut shell = shell_with(&harness, &todos);
    shell.activate("todo").expect("todo");

    let err = shell
        .dispatch(&Action::parse("add  ").expect("action"))
        .expect_err("blank");

    assert!(matches!(err, ToolsError::InvalidArgument { .. }));
    assert!(todos.is_empty());
}

#[test]
fn search_puts_prefix_hits_first_without_duplicates() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let shell = shell_with(&harness, &todos);

    let ids: Vec<&str> = shell.search("zeit").iter().map(|program| program.id()).collect();
    assert_eq!(&ids[..3], &["worldclock", "timer", "stopwatch"]);
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());

    let typo: Vec<&str> = shell.search("stopuhr").iter().map(|program| program.id()).collect();
    assert_eq!(typo.first(), Some(&"stopwatch"));
}

#[test]
fn sidebar_lists_builtins_in_order() {
    let harness = TimeHarness::new();
    let todos = TodoList::open(MemoryStorage::new());
    let mut shell = shell_with(&harness, &todos);
    shell.activate("stopwatch").expect("stopwatch");
    act(&mut shell, "start");

    let sidebar = shell.sidebar();

    let names: Vec<&str> = sidebar.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["Weltzeituhr", "Timer", "Stoppuhr", "Todo"]);
    assert!(sidebar[2].active && sidebar[2].selected);
    assert!(!sidebar[0].active);
}

#[test]
fn selectors_fail_outside_the_shell() {
    assert_eq!(
        use_active_set().map(|_| ()),
        Err(ToolsError::OutsideInstanceContext {
            api: "use_active_set"
        })
    );
    let err = use_is_active("timer").expect_err("no context");
    assert!(err.is_fatal());
}

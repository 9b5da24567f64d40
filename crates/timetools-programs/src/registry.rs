use timetools_core::{component, ProgramDescriptor, ProgramRegistry};

use crate::countdown::{CountdownTimer, TIMER_ID};
use crate::stopwatch::{Stopwatch, STOPWATCH_ID};
use crate::todo::{TodoList, TodoProgram, TODO_ID};
use crate::worldclock::{WorldClock, WORLDCLOCK_ID};

/// The four built-in programs in sidebar order.
pub fn builtin_registry(todos: &TodoList) -> ProgramRegistry {
    let for_program = todos.clone();
    let for_predicate = todos.clone();
    ProgramRegistry::new(vec![
        ProgramDescriptor::new(WORLDCLOCK_ID, "Weltzeituhr", component(WorldClock::new))
            .description("Zeitzonen im Überblick")
            .icon("Globe")
            .keywords(["weltzeit", "uhr", "zeitzonen", "global"]),
        ProgramDescriptor::new(TIMER_ID, "Timer", component(CountdownTimer::new))
            .description("Ein einfacher Timer zum Herunterzählen")
            .icon("Timer")
            .keywords(["timer", "countdown", "alarm", "zeit"])
            .persistent(true),
        ProgramDescriptor::new(STOPWATCH_ID, "Stoppuhr", component(Stopwatch::new))
            .description("Eine Stoppuhr zum Zeitmessen")
            .icon("Stopwatch")
            .keywords(["stoppuhr", "zeit", "messen", "runden"])
            .persistent(true),
        ProgramDescriptor::new(
            TODO_ID,
            "Todo",
            component(move || TodoProgram::new(for_program.clone())),
        )
        .description("Eine einfache Todo-Liste")
        .icon("ListTodo")
        .keywords(["todo", "aufgaben", "liste", "organisation", "planen", "notizen"])
        .pre_mount_active(move || for_predicate.has_active()),
    ])
}

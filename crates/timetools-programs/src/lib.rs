#![doc = r"Built-in Time Tools programs: stopwatch, countdown timer, world clock and todo list."]

pub mod countdown;
pub mod format;
pub mod id;
pub mod registry;
pub mod stopwatch;
pub mod todo;
pub mod todo_storage;
pub mod worldclock;

pub use countdown::{CountdownData, CountdownTimer};
pub use format::{format_stopwatch, format_timer};
pub use id::generate_id;
pub use registry::builtin_registry;
pub use stopwatch::{Lap, Stopwatch, StopwatchData};
pub use todo::{TodoList, TodoProgram};
pub use todo_storage::{JsonFileStorage, MemoryStorage, StorageError, TodoItem, TodoStorage};
pub use worldclock::WorldClock;

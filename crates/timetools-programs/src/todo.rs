//! Todo list.
//!
//! Items live in a [`TodoList`] that outlives any mount and writes through
//! to a [`TodoStorage`]. The program's own store slice only mirrors the
//! list and is discarded on unmount; the descriptor's pre-mount predicate
//! keeps the program in the active set while unfinished items exist.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use timetools_core::{Action, MountScope, Program, ProgramProps, ToolsError, View};

use crate::id::generate_id;
use crate::todo_storage::{TodoItem, TodoStorage};

pub const TODO_ID: &str = "todo";

type IdSource = Box<dyn Fn() -> String>;

struct TodoListInner {
    items: RefCell<Vec<TodoItem>>,
    storage: Box<dyn TodoStorage>,
    next_id: IdSource,
}

/// Shared handle to the durable todo list.
#[derive(Clone)]
pub struct TodoList {
    inner: Rc<TodoListInner>,
}

impl TodoList {
    /// Loads the stored items. An unreadable record starts an empty list.
    pub fn open(storage: impl TodoStorage + 'static) -> Self {
        Self::with_id_source(storage, generate_id)
    }

    pub fn with_id_source(
        storage: impl TodoStorage + 'static,
        next_id: impl Fn() -> String + 'static,
    ) -> Self {
        let items = storage.load().unwrap_or_else(|err| {
            log::error!("failed to load todos: {err}");
            Vec::new()
        });
        log::debug!("loaded {} todos", items.len());
        Self {
            inner: Rc::new(TodoListInner {
                items: RefCell::new(items),
                storage: Box::new(storage),
                next_id: Box::new(next_id),
            }),
        }
    }

    pub fn items(&self) -> Vec<TodoItem> {
        self.inner.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_active(&self) -> bool {
        self.inner.items.borrow().iter().any(|item| !item.completed)
    }

    pub fn add(&self, text: &str, now_millis: u64) -> Option<TodoItem> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let item = TodoItem {
            id: (self.inner.next_id)(),
            text: text.to_owned(),
            completed: false,
            created_at: now_millis,
        };
        self.inner.items.borrow_mut().push(item.clone());
        self.persist();
        Some(item)
    }

    /// Returns false when no item has `id`.
    pub fn toggle(&self, id: &str) -> bool {
        let found = {
            let mut items = self.inner.items.borrow_mut();
            match items.iter_mut().find(|item| item.id == id) {
                Some(item) => {
                    item.completed = !item.completed;
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist();
        }
        found
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            let before = items.len();
            items.retain(|item| item.id != id);
            items.len() != before
        };
        if removed {
            self.persist();
        }
        removed
    }

    /// Resolves `#n` (1-based, display order) or a literal id.
    pub fn resolve(&self, selector: &str) -> Option<String> {
        let items = self.inner.items.borrow();
        match selector.strip_prefix('#') {
            Some(position) => {
                let index = position.parse::<usize>().ok()?.checked_sub(1)?;
                display_order(&items).get(index).map(|item| item.id.clone())
            }
            None => items
                .iter()
                .find(|item| item.id == selector)
                .map(|item| item.id.clone()),
        }
    }

    fn persist(&self) {
        let items = self.inner.items.borrow();
        if let Err(err) = self.inner.storage.save(&items) {
            log::error!("failed to save todos: {err}");
        }
    }
}

impl fmt::Debug for TodoList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TodoList")
            .field("items", &self.len())
            .field("active", &self.has_active())
            .finish()
    }
}

/// Unfinished items first, then completed ones, each in insertion order.
pub fn display_order(items: &[TodoItem]) -> Vec<&TodoItem> {
    let (active, completed): (Vec<&TodoItem>, Vec<&TodoItem>) =
        items.iter().partition(|item| !item.completed);
    active.into_iter().chain(completed).collect()
}

#[derive(Debug)]
pub struct TodoProgram {
    list: TodoList,
}

impl TodoProgram {
    pub fn new(list: TodoList) -> Self {
        Self { list }
    }

    fn sync(&self, props: &ProgramProps<'_, Vec<TodoItem>>) {
        props.set_data(self.list.items());
        props.set_running(self.list.has_active());
    }

    fn selected(&self, action: &Action) -> Result<String, ToolsError> {
        let selector = action.first_arg().ok_or_else(|| {
            ToolsError::invalid_argument(TODO_ID, action.verb.as_str(), "expected an id or #n")
        })?;
        self.list.resolve(selector).ok_or_else(|| {
            ToolsError::invalid_argument(
                TODO_ID,
                action.verb.as_str(),
                format!("no item matches '{selector}'"),
            )
        })
    }
}

impl Program for TodoProgram {
    type Data = Vec<TodoItem>;
    const STATIC_NAME: Option<&'static str> = Some(TODO_ID);

    fn initial_data(&self) -> Vec<TodoItem> {
        self.list.items()
    }

    fn on_mount(&mut self, scope: &mut MountScope<'_, Vec<TodoItem>>) {
        let caps = scope.capabilities();
        caps.data().set(self.list.items());
        caps.running().set(self.list.has_active());
    }

    fn render(&mut self, props: &ProgramProps<'_, Vec<TodoItem>>) -> View {
        let items = props.data();
        let mut view = View::new("Aufgabenliste");
        if items.iter().any(|item| !item.completed) {
            view.push("Aktiv");
        }
        if items.is_empty() {
            view.push("(keine Aufgaben)");
        }
        for (index, item) in display_order(&items).into_iter().enumerate() {
            let mark = if item.completed { "x" } else { " " };
            view.push(format!("#{:<2} [{mark}] {}", index + 1, item.text));
        }
        view
    }

    fn on_action(
        &mut self,
        props: &ProgramProps<'_, Vec<TodoItem>>,
        action: &Action,
    ) -> Result<(), ToolsError> {
        match action.verb.as_str() {
            "add" => {
                let item = self
                    .list
                    .add(&action.text(), props.now_millis)
                    .ok_or_else(|| ToolsError::invalid_argument(TODO_ID, "add", "text must not be empty"))?;
                log::debug!("added todo {}", item.id);
            }
            "toggle" | "done" => {
                let id = self.selected(action)?;
                self.list.toggle(&id);
            }
            "remove" | "rm" => {
                let id = self.selected(action)?;
                self.list.remove(&id);
            }
            other => return Err(ToolsError::unsupported(TODO_ID, other)),
        }
        self.sync(props);
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/todo_tests.rs"]
mod tests;

//! Durable storage for todo items.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const RECORD_NAME: &str = "todo-storage";
const RECORD_VERSION: u32 = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
    /// Epoch milliseconds.
    pub created_at: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TodoState {
    #[serde(default)]
    todos: Vec<TodoItem>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TodoRecord {
    state: TodoState,
    #[serde(default)]
    version: u32,
}

#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { path, source } => {
                write!(f, "{RECORD_NAME} i/o error at {}: {source}", path.display())
            }
            StorageError::Json { path, source } => {
                write!(f, "{RECORD_NAME} is malformed at {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Json { source, .. } => Some(source),
        }
    }
}

pub trait TodoStorage {
    fn load(&self) -> Result<Vec<TodoItem>, StorageError>;
    fn save(&self, todos: &[TodoItem]) -> Result<(), StorageError>;
}

/// JSON file holding the `todo-storage` record. A missing file is an empty list.
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn json_error(&self, source: serde_json::Error) -> StorageError {
        StorageError::Json {
            path: self.path.clone(),
            source,
        }
    }
}

impl TodoStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<TodoItem>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        let record: TodoRecord = serde_json::from_str(&raw).map_err(|err| self.json_error(err))?;
        Ok(record.state.todos)
    }

    fn save(&self, todos: &[TodoItem]) -> Result<(), StorageError> {
        let record = TodoRecord {
            state: TodoState {
                todos: todos.to_vec(),
            },
            version: RECORD_VERSION,
        };
        let json = serde_json::to_string_pretty(&record).map_err(|err| self.json_error(err))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        // Staged write, then rename over the record.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    todos: RefCell<Vec<TodoItem>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(todos: Vec<TodoItem>) -> Self {
        Self {
            todos: RefCell::new(todos),
        }
    }

    pub fn snapshot(&self) -> Vec<TodoItem> {
        self.todos.borrow().clone()
    }
}

impl TodoStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<TodoItem>, StorageError> {
        Ok(self.snapshot())
    }

    fn save(&self, todos: &[TodoItem]) -> Result<(), StorageError> {
        *self.todos.borrow_mut() = todos.to_vec();
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/todo_storage_tests.rs"]
mod tests;

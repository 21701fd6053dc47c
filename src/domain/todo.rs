use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned by the remote collection. Locally added items have none until
/// their create round-trip settles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TodoId(pub i64);

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TodoId>,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Todo {
    /// A fresh, not yet synced item.
    pub fn local(title: impl Into<String>) -> Self {
        Self { id: None, title: title.into(), completed: false }
    }

    pub fn with_id(id: i64, title: impl Into<String>) -> Self {
        Self { id: Some(TodoId(id)), title: title.into(), completed: false }
    }

    pub fn is_synced(&self) -> bool { self.id.is_some() }
}

/// Request body for a remote create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl From<&Todo> for CreateTodo {
    fn from(todo: &Todo) -> Self {
        Self { title: todo.title.clone(), completed: todo.completed }
    }
}

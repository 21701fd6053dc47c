use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::repository::RemoteCollection;
use crate::domain::todo::{CreateTodo, Todo, TodoId};
use crate::error::SyncResult;

/// In-process todo collection behaving like the public placeholder service: ids continue
/// after the highest seeded one, deleting an unknown id is not an error.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    items: Vec<Todo>,
    next_id: i64,
}

impl MemoryCollection {
    pub fn seeded(items: Vec<Todo>) -> Self {
        let next_id = items.iter().filter_map(|t| t.id).map(|id| id.0).max().unwrap_or(0) + 1;
        Self { inner: Arc::new(Mutex::new(Inner { items, next_id })) }
    }

    /// A handful of items so a fresh client has something to bootstrap from.
    pub fn sample() -> Self {
        Self::seeded(vec![
            Todo::with_id(1, "delectus aut autem"),
            Todo::with_id(2, "quis ut nam facilis et officia qui"),
            Todo::with_id(3, "fugiat veniam minus"),
            Todo::with_id(4, "et porro tempora"),
        ])
    }

    pub fn list(&self) -> Vec<Todo> { self.inner().items.clone() }

    pub fn insert(&self, input: CreateTodo) -> Todo {
        let mut inner = self.inner();
        let id = TodoId(inner.next_id.max(1));
        inner.next_id = id.0 + 1;
        let todo = Todo { id: Some(id), title: input.title, completed: input.completed };
        inner.items.push(todo.clone());
        todo
    }

    pub fn remove(&self, id: TodoId) -> bool {
        let mut inner = self.inner();
        let before = inner.items.len();
        inner.items.retain(|t| t.id != Some(id));
        inner.items.len() != before
    }

    fn inner(&self) -> MutexGuard<'_, Inner> { self.inner.lock().unwrap_or_else(PoisonError::into_inner) }
}

#[async_trait]
impl RemoteCollection for MemoryCollection {
    async fn fetch_all(&self) -> SyncResult<Vec<Todo>> { Ok(self.list()) }

    async fn create(&self, input: CreateTodo) -> SyncResult<Todo> { Ok(self.insert(input)) }

    async fn delete(&self, id: TodoId) -> SyncResult<()> {
        self.remove(id);
        Ok(())
    }
}

use async_trait::async_trait;

use super::todo::{CreateTodo, Todo, TodoId};
use crate::error::SyncResult;

/// Durable string key-value storage backing the persistent cache.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn init(&self) -> SyncResult<()>;
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> SyncResult<()>;
}

/// The remote todo collection. Implementations hold no list state of their own.
#[async_trait]
pub trait RemoteCollection: Send + Sync + 'static {
    async fn fetch_all(&self) -> SyncResult<Vec<Todo>>;
    async fn create(&self, input: CreateTodo) -> SyncResult<Todo>;
    async fn delete(&self, id: TodoId) -> SyncResult<()>;
}

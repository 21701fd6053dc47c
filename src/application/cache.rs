use std::sync::Arc;

use crate::domain::repository::KeyValueStore;
use crate::domain::todo::Todo;
use crate::error::{SyncError, SyncResult};

pub const TODOS_KEY: &str = "todos";
pub const USERNAME_KEY: &str = "username";

/// Typed view over the two persisted keys.
pub struct PersistentCache<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> Clone for PersistentCache<S> {
    fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: KeyValueStore> PersistentCache<S> {
    pub fn new(store: S) -> Self { Self { store: Arc::new(store) } }

    pub fn store(&self) -> &S { &self.store }

    /// `Ok(None)` when nothing was ever stored; a malformed value is a decode error.
    pub async fn todos(&self) -> SyncResult<Option<Vec<Todo>>> {
        let Some(raw) = self.store.get(TODOS_KEY).await? else { return Ok(None) };
        serde_json::from_str(&raw).map(Some).map_err(|e| SyncError::decode("cached todos", e))
    }

    pub async fn set_todos(&self, todos: &[Todo]) -> SyncResult<()> {
        let raw = serde_json::to_string(todos).map_err(|e| SyncError::decode("todos", e))?;
        self.store.set(TODOS_KEY, &raw).await
    }

    pub async fn username(&self) -> SyncResult<Option<String>> { self.store.get(USERNAME_KEY).await }

    pub async fn set_username(&self, username: &str) -> SyncResult<()> { self.store.set(USERNAME_KEY, username).await }
}

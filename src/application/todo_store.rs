use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::cache::PersistentCache;
use super::session::{EntryKey, Session};
use crate::domain::repository::{KeyValueStore, RemoteCollection};
use crate::domain::todo::{CreateTodo, Todo, TodoId};
use crate::error::{SyncError, SyncResult};

/// Where `bootstrap` took the working list from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapSource {
    Cache,
    Remote,
}

/// What `delete_all` does with the local list when only part of the remote batch succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteAllPolicy {
    /// Any failure leaves the list untouched, even if some remote deletes went through.
    #[default]
    AllOrNothing,
    /// Items whose remote delete succeeded are removed, failed ones stay.
    RemoveSucceeded,
}

impl FromStr for DeleteAllPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-or-nothing" => Ok(Self::AllOrNothing),
            "remove-succeeded" => Ok(Self::RemoveSucceeded),
            other => Err(format!("unknown delete-all policy `{other}` (expected all-or-nothing or remove-succeeded)")),
        }
    }
}

#[derive(Debug)]
pub enum ItemOutcome {
    Deleted,
    /// Never reached the server, so there was nothing to delete remotely.
    LocalOnly,
    /// The remote create is still in flight; the item was left in place because the
    /// server copy it is about to get could not be deleted yet.
    CreateInFlight,
    Failed(SyncError),
}

#[derive(Debug)]
pub struct BatchItem {
    key: EntryKey,
    pub id: Option<TodoId>,
    pub outcome: ItemOutcome,
}

impl BatchItem {
    pub fn succeeded(&self) -> bool { matches!(self.outcome, ItemOutcome::Deleted | ItemOutcome::LocalOnly) }
}

/// Per-item results of a `delete_all`, plus how many entries actually left the list.
#[derive(Debug)]
pub struct DeleteAllReport {
    pub items: Vec<BatchItem>,
    pub removed: usize,
}

impl DeleteAllReport {
    pub fn all_succeeded(&self) -> bool { self.items.iter().all(BatchItem::succeeded) }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItem> { self.items.iter().filter(|i| !i.succeeded()) }

    fn removable(&self, policy: DeleteAllPolicy) -> Vec<EntryKey> {
        match policy {
            DeleteAllPolicy::AllOrNothing if !self.all_succeeded() => Vec::new(),
            _ => self.items.iter().filter(|i| i.succeeded()).map(|i| i.key).collect(),
        }
    }
}

/// The local copy of a freshly added todo and its in-flight remote create.
pub struct PendingCreate {
    pub todo: Todo,
    task: JoinHandle<Option<TodoId>>,
}

impl PendingCreate {
    /// Waits for the remote create. Yields the id now carried by the local entry, or `None`
    /// when the create failed.
    pub async fn settled(self) -> Option<TodoId> { self.task.await.ok().flatten() }
}

/// Owns the working list and decides how cache and remote feed into it.
pub struct TodoStore<S: KeyValueStore, R: RemoteCollection> {
    session: Arc<Mutex<Session>>,
    cache: PersistentCache<S>,
    remote: Arc<R>,
    policy: DeleteAllPolicy,
    // Snapshots are taken under this lock so cache writes land in mutation order.
    persist_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<S: KeyValueStore, R: RemoteCollection> Clone for TodoStore<S, R> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            cache: self.cache.clone(),
            remote: Arc::clone(&self.remote),
            policy: self.policy,
            persist_lock: Arc::clone(&self.persist_lock),
        }
    }
}

impl<S: KeyValueStore, R: RemoteCollection> TodoStore<S, R> {
    pub fn new(session: Session, cache: PersistentCache<S>, remote: R) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            cache,
            remote: Arc::new(remote),
            policy: DeleteAllPolicy::default(),
            persist_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn with_policy(mut self, policy: DeleteAllPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DeleteAllPolicy { self.policy }

    pub fn todos(&self) -> Vec<Todo> { self.session().todos() }

    pub fn username(&self) -> String { self.session().username().to_string() }

    /// Loads the working list: the cache wins whenever it holds a list, the remote is only
    /// asked on a miss. A cached value that fails to decode counts as a miss.
    pub async fn bootstrap(&self) -> SyncResult<BootstrapSource> {
        match self.cache.todos().await {
            Ok(Some(todos)) => {
                info!(count = todos.len(), "todos loaded from cache");
                self.session().replace(todos);
                return Ok(BootstrapSource::Cache);
            }
            Ok(None) => debug!("no cached todos"),
            Err(e @ SyncError::Decode { .. }) => warn!(error = %e, "cached todos unreadable, fetching from remote"),
            Err(e) => return Err(e),
        }

        let todos = match self.remote.fetch_all().await {
            Ok(todos) => todos,
            Err(e) => {
                error!(error = %e, "fetching todos failed");
                return Err(e);
            }
        };
        info!(count = todos.len(), "todos fetched from remote");
        self.session().replace(todos);
        self.persist().await?;
        Ok(BootstrapSource::Remote)
    }

    /// Appends locally and persists, then creates remotely in the background. The returned
    /// handle settles once the server-assigned id has been written back.
    pub async fn add(&self, title: impl Into<String>) -> SyncResult<PendingCreate> {
        let todo = Todo::local(title);
        let key = self.session().push_creating(todo.clone());
        self.persist().await?;

        let store = self.clone();
        let input = CreateTodo::from(&todo);
        let task = tokio::spawn(async move { store.settle_create(key, input).await });
        Ok(PendingCreate { todo, task })
    }

    async fn settle_create(&self, key: EntryKey, input: CreateTodo) -> Option<TodoId> {
        let created = match self.remote.create(input).await {
            Ok(created) => created,
            Err(e) => {
                error!(error = %e, "adding todo failed, item stays local");
                self.session().abandon_create(key);
                return None;
            }
        };
        let Some(id) = created.id else {
            warn!(title = %created.title, "remote create answered without an id");
            self.session().abandon_create(key);
            return None;
        };
        let assigned = self.session().assign_id(key, id);
        if !assigned {
            warn!(%id, "entry left the session before its create settled, remote copy is orphaned");
            return None;
        }
        if let Err(e) = self.persist().await {
            error!(%id, error = %e, "persisting reconciled id failed");
        }
        Some(id)
    }

    /// Deletes remotely first; the local list only changes once the server agreed.
    pub async fn delete(&self, id: TodoId) -> SyncResult<usize> {
        if let Err(e) = self.remote.delete(id).await {
            error!(%id, error = %e, "deleting todo failed");
            return Err(e);
        }
        let removed = self.session().remove_by_id(id);
        self.persist().await?;
        info!(%id, removed, "todo deleted");
        Ok(removed)
    }

    /// Issues one remote delete per item concurrently, then applies the configured policy.
    pub async fn delete_all(&self) -> SyncResult<DeleteAllReport> {
        let batch = self.session().batch();
        let remote = &self.remote;
        let items = join_all(batch.into_iter().map(|(key, id, creating)| async move {
            let outcome = match id {
                Some(id) => match remote.delete(id).await {
                    Ok(()) => ItemOutcome::Deleted,
                    Err(e) => ItemOutcome::Failed(e),
                },
                None if creating => ItemOutcome::CreateInFlight,
                None => ItemOutcome::LocalOnly,
            };
            BatchItem { key, id, outcome }
        }))
        .await;

        let mut report = DeleteAllReport { items, removed: 0 };
        for item in report.failures() {
            match &item.outcome {
                ItemOutcome::Failed(e) => error!(id = ?item.id, error = %e, "deleting todo in batch failed"),
                _ => warn!("todo skipped in batch, its create has not settled"),
            }
        }

        let keys = report.removable(self.policy);
        report.removed = self.session().remove_keys(&keys);
        if report.removed > 0 || report.all_succeeded() {
            self.persist().await?;
        }
        info!(requested = report.items.len(), removed = report.removed, policy = ?self.policy, "delete all finished");
        Ok(report)
    }

    pub async fn set_username(&self, username: impl Into<String>) -> SyncResult<()> {
        let username = username.into();
        self.session().set_username(username.clone());
        self.cache.set_username(&username).await
    }

    /// Flushes the session to the cache. Creates still in flight afterwards find their
    /// entry gone and leave the cache alone.
    pub async fn teardown(self) -> SyncResult<()> {
        let session = self.session().drain();
        let _guard = self.persist_lock.lock().await;
        session.teardown(&self.cache).await
    }

    async fn persist(&self) -> SyncResult<()> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.session().todos();
        self.cache.set_todos(&snapshot).await
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

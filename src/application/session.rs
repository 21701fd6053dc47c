use tracing::{info, warn};

use super::cache::PersistentCache;
use crate::domain::repository::KeyValueStore;
use crate::domain::todo::{Todo, TodoId};
use crate::error::SyncResult;

/// Session-local handle for a list entry. Survives id reconciliation, never persisted.
pub type EntryKey = u64;

#[derive(Debug, Clone)]
struct Entry {
    key: EntryKey,
    todo: Todo,
    // Remote create issued and not yet settled.
    creating: bool,
}

/// Everything the client holds for the current run: the display name and the working list.
#[derive(Debug, Default)]
pub struct Session {
    username: String,
    entries: Vec<Entry>,
    next_key: EntryKey,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), ..Self::default() }
    }

    /// Starts a session with the persisted username. The list is left empty; loading it is
    /// the store's bootstrap decision.
    pub async fn restore<S: KeyValueStore>(cache: &PersistentCache<S>) -> SyncResult<Self> {
        let username = cache.username().await?.unwrap_or_default();
        info!(%username, "session restored");
        Ok(Self::new(username))
    }

    /// Flushes list and username so the next `restore` + bootstrap sees this run's state.
    pub async fn teardown<S: KeyValueStore>(self, cache: &PersistentCache<S>) -> SyncResult<()> {
        cache.set_todos(&self.todos()).await?;
        cache.set_username(&self.username).await?;
        info!(items = self.entries.len(), "session flushed");
        Ok(())
    }

    pub fn username(&self) -> &str { &self.username }

    pub fn set_username(&mut self, username: impl Into<String>) { self.username = username.into(); }

    pub fn todos(&self) -> Vec<Todo> { self.entries.iter().map(|e| e.todo.clone()).collect() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn replace(&mut self, todos: Vec<Todo>) {
        self.entries.clear();
        for todo in todos {
            self.push(todo);
        }
    }

    pub fn push(&mut self, todo: Todo) -> EntryKey { self.insert(todo, false) }

    /// Appends an entry whose remote create is in flight until `assign_id` or
    /// `abandon_create` settles it.
    pub fn push_creating(&mut self, todo: Todo) -> EntryKey { self.insert(todo, true) }

    fn insert(&mut self, todo: Todo, creating: bool) -> EntryKey {
        let key = self.next_key;
        self.next_key += 1;
        self.entries.push(Entry { key, todo, creating });
        key
    }

    /// Backfills the server-assigned id. Returns false when the entry is gone.
    pub fn assign_id(&mut self, key: EntryKey, id: TodoId) -> bool {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                if let Some(previous) = entry.todo.id.replace(id) {
                    warn!(%previous, %id, "entry already carried an id");
                }
                entry.creating = false;
                true
            }
            None => false,
        }
    }

    /// The create failed: the entry stays, as a local-only item.
    pub fn abandon_create(&mut self, key: EntryKey) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.creating = false;
        }
    }

    /// Moves username and entries out, leaving this session empty. The key counter stays,
    /// so keys handed out before the drain never name a later entry.
    pub(crate) fn drain(&mut self) -> Session {
        Session {
            username: std::mem::take(&mut self.username),
            entries: std::mem::take(&mut self.entries),
            next_key: self.next_key,
        }
    }

    /// Removes every entry carrying `id`, returning how many went.
    pub fn remove_by_id(&mut self, id: TodoId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.todo.id != Some(id));
        before - self.entries.len()
    }

    pub fn remove_keys(&mut self, keys: &[EntryKey]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !keys.contains(&e.key));
        before - self.entries.len()
    }

    pub(crate) fn batch(&self) -> Vec<(EntryKey, Option<TodoId>, bool)> {
        self.entries.iter().map(|e| (e.key, e.todo.id, e.creating)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_by_id_drops_duplicates_and_keeps_order() {
        let mut session = Session::default();
        session.replace(vec![Todo::with_id(1, "a"), Todo::with_id(2, "b"), Todo::with_id(1, "c"), Todo::local("d")]);
        assert_eq!(session.remove_by_id(TodoId(1)), 2);
        assert_eq!(session.todos(), vec![Todo::with_id(2, "b"), Todo::local("d")]);
    }

    #[test]
    fn assign_id_targets_the_entry_not_the_title() {
        let mut session = Session::default();
        let first = session.push(Todo::local("same"));
        let _second = session.push(Todo::local("same"));
        assert!(session.assign_id(first, TodoId(201)));
        assert_eq!(session.todos(), vec![Todo::with_id(201, "same"), Todo::local("same")]);
    }

    #[test]
    fn assign_id_on_removed_entry_is_a_noop() {
        let mut session = Session::default();
        let key = session.push(Todo::local("gone"));
        session.remove_keys(&[key]);
        assert!(!session.assign_id(key, TodoId(7)));
        assert!(session.is_empty());
    }

    #[test]
    fn drained_keys_are_never_reused() {
        let mut session = Session::new("ada");
        let stale = session.push_creating(Todo::local("before"));
        let flushed = session.drain();
        assert_eq!(flushed.username(), "ada");
        assert_eq!(flushed.todos(), vec![Todo::local("before")]);
        assert!(session.is_empty());

        let fresh = session.push(Todo::local("after"));
        assert_ne!(stale, fresh);
        assert!(!session.assign_id(stale, TodoId(9)));
        assert_eq!(session.todos(), vec![Todo::local("after")]);
    }

    #[test]
    fn settling_a_create_clears_the_in_flight_mark() {
        let mut session = Session::default();
        let ok = session.push_creating(Todo::local("ok"));
        let failed = session.push_creating(Todo::local("failed"));
        let _pending = session.push_creating(Todo::local("pending"));
        session.assign_id(ok, TodoId(3));
        session.abandon_create(failed);
        let creating: Vec<bool> = session.batch().into_iter().map(|(_, _, creating)| creating).collect();
        assert_eq!(creating, vec![false, false, true]);
    }
}

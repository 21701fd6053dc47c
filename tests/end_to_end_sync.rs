use std::time::Duration;

use todo_sync::application::{cache::PersistentCache, session::Session, todo_store::{BootstrapSource, TodoStore}};
use todo_sync::domain::{repository::KeyValueStore, todo::{Todo, TodoId}};
use todo_sync::http::{routes::todos, routing};
use todo_sync::infrastructure::{http_remote::HttpCollection, memory_collection::MemoryCollection, sqlite_store::SqliteKeyValueStore};

/// Serves `collection` on an ephemeral port and returns its base url.
async fn serve(collection: MemoryCollection) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = routing::app(todos::router(todos::AppState::new(collection)));
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

async fn memory_cache() -> PersistentCache<SqliteKeyValueStore> {
    let kv = SqliteKeyValueStore::connect("sqlite::memory:").await.unwrap();
    kv.init().await.unwrap();
    PersistentCache::new(kv)
}

#[tokio::test]
async fn full_session_against_loopback_server() {
    let collection = MemoryCollection::seeded(vec![Todo::with_id(1, "A"), Todo::with_id(2, "B")]);
    let base = serve(collection.clone()).await;
    let cache = memory_cache().await;
    let remote = HttpCollection::new(&base, Some(Duration::from_secs(5))).unwrap();
    let store = TodoStore::new(Session::default(), cache.clone(), remote);

    assert_eq!(store.bootstrap().await.unwrap(), BootstrapSource::Remote);
    assert_eq!(cache.todos().await.unwrap(), Some(vec![Todo::with_id(1, "A"), Todo::with_id(2, "B")]));

    let pending = store.add("C").await.unwrap();
    assert_eq!(pending.settled().await, Some(TodoId(3)));
    assert_eq!(store.todos().last(), Some(&Todo::with_id(3, "C")));
    assert_eq!(collection.list().len(), 3);

    assert_eq!(store.delete(TodoId(1)).await.unwrap(), 1);
    assert_eq!(collection.list(), vec![Todo::with_id(2, "B"), Todo::with_id(3, "C")]);

    let report = store.delete_all().await.unwrap();
    assert!(report.all_succeeded());
    assert!(store.todos().is_empty());
    assert!(collection.list().is_empty());
    assert_eq!(cache.todos().await.unwrap(), Some(vec![]));
}

#[tokio::test]
async fn cached_list_diverges_silently_from_remote() {
    let collection = MemoryCollection::seeded(vec![Todo::with_id(1, "remote only")]);
    let base = serve(collection).await;
    let cache = memory_cache().await;
    cache.set_todos(&[Todo::with_id(7, "cached")]).await.unwrap();

    let store = TodoStore::new(Session::default(), cache, HttpCollection::new(&base, None).unwrap());
    assert_eq!(store.bootstrap().await.unwrap(), BootstrapSource::Cache);
    assert_eq!(store.todos(), vec![Todo::with_id(7, "cached")]);
}

#[tokio::test]
async fn unreachable_remote_keeps_local_add_and_blocks_delete() {
    let cache = memory_cache().await;
    cache.set_todos(&[Todo::with_id(5, "stuck")]).await.unwrap();
    let remote = HttpCollection::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
    let store = TodoStore::new(Session::default(), cache.clone(), remote);
    store.bootstrap().await.unwrap();

    let pending = store.add("offline").await.unwrap();
    assert_eq!(pending.settled().await, None);
    assert!(store.delete(TodoId(5)).await.unwrap_err().is_transport());
    assert_eq!(store.todos(), vec![Todo::with_id(5, "stuck"), Todo::local("offline")]);
    assert_eq!(cache.todos().await.unwrap(), Some(vec![Todo::with_id(5, "stuck"), Todo::local("offline")]));
}
